//! End-to-end runs of the `foresight` binary against temporary CSV files.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};

use chrono::{Duration, NaiveDate};

fn write_prices(dir: &Path, name: &str, days: usize, daily_step: f64) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "date,close").unwrap();
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    for i in 0..days {
        let close = 100.0 + daily_step * i as f64 + (i as f64 * 0.4).sin();
        writeln!(file, "{},{close:.4}", start + Duration::days(i as i64)).unwrap();
    }
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_foresight"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn recommend_prints_an_action() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_prices(dir.path(), "up.csv", 400, 0.2);
    let out = run(&[
        "recommend",
        "--csv",
        csv.to_str().unwrap(),
        "--seed",
        "7",
        "--sentiment",
        "0.8",
        "--pe",
        "0",
        "--roe",
        "25",
        "--margin",
        "30",
        "--debt-to-equity",
        "0",
        "--json",
    ]);
    let v = json(&out);
    assert_eq!(v["action"], "StrongBuy");
    assert!(v["confidence"].as_f64().unwrap() > 0.6);
}

#[test]
fn simulate_reports_bands_for_the_horizon() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_prices(dir.path(), "p.csv", 120, 0.05);
    let out = run(&[
        "simulate",
        "--csv",
        csv.to_str().unwrap(),
        "--horizon",
        "12",
        "--paths",
        "50",
        "--seed",
        "1",
        "--json",
    ]);
    let v = json(&out);
    assert_eq!(v["seed"], 1);
    assert_eq!(v["path_count"], 50);
    assert_eq!(v["bands"]["p50"].as_array().unwrap().len(), 12);
}

#[test]
fn forecast_lists_every_model() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_prices(dir.path(), "p.csv", 200, 0.1);
    let out = run(&["forecast", "--csv", csv.to_str().unwrap(), "--horizon", "5", "--json"]);
    let v = json(&out);
    let names: Vec<&str> = v["models"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["model"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["reservoir", "boosted_trees", "svr", "attention"]);
}

#[test]
fn analyze_uses_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_prices(dir.path(), "p.csv", 150, 0.1);
    let config = dir.path().join("foresight.toml");
    std::fs::write(&config, "horizon = 9\nseed = 5\n\n[ensemble]\nparallel = false\n").unwrap();
    let out = run(&[
        "analyze",
        "--config",
        config.to_str().unwrap(),
        "--csv",
        csv.to_str().unwrap(),
        "--headline-scores",
        "0.5,-0.4,0.0",
        "--json",
    ]);
    let v = json(&out);
    assert_eq!(v["horizon"], 9);
    assert_eq!(v["seed"], 5);
    assert_eq!(v["summary"]["sentiment"]["positive"], 1);
    assert_eq!(v["summary"]["sentiment"]["negative"], 1);
}

#[test]
fn compare_builds_correlation_and_movers() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_prices(dir.path(), "a.csv", 60, 0.3);
    let b = write_prices(dir.path(), "b.csv", 60, -0.3);
    let out = run(&[
        "compare",
        "--series",
        &format!("AAA={}", a.display()),
        "--series",
        &format!("BBB={}", b.display()),
        "--top",
        "1",
        "--json",
    ]);
    let v = json(&out);
    assert_eq!(v["correlation"]["symbols"].as_array().unwrap().len(), 2);
    assert_eq!(v["movers"]["gainers"].as_array().unwrap().len(), 1);
    assert!(v["fundamentals"].is_null());
}

#[test]
fn short_history_fails_with_message() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_prices(dir.path(), "short.csv", 5, 0.1);
    let out = run(&["recommend", "--csv", csv.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("too short"));
}

#[test]
fn out_of_range_sentiment_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_prices(dir.path(), "p.csv", 60, 0.1);
    let out = run(&["recommend", "--csv", csv.to_str().unwrap(), "--sentiment", "2"]);
    assert!(!out.status.success());
}
