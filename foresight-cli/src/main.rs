//! Foresight CLI: forecast and recommend from CSV price histories.
//!
//! Commands:
//! - `simulate`: Monte Carlo percentile bands around the trend projection
//! - `forecast`: per-model ensemble paths with fitted/fallback status
//! - `recommend`: composite score and action for one symbol
//! - `analyze`: the full report: projection, ensemble, indicators, summary
//! - `compare`: return correlation, movers and fundamentals across symbols

mod csv_source;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use foresight_core::analytics::{top_movers, CorrelationMatrix, FundamentalComparison, Movers};
use foresight_core::domain::{PriceSeries, Recommendation};
use foresight_core::ensemble::ForecastResult;
use foresight_core::pipeline::{Analysis, Forecaster};
use foresight_core::provider::{PriceHistoryProvider, StaticMarketData};
use foresight_core::simulation::PercentileBands;
use foresight_core::{AnalysisConfig, FundamentalRatios, ModelStatus, SentimentSummary};

use csv_source::CsvPriceProvider;

#[derive(Parser)]
#[command(
    name = "foresight",
    about = "Foresight CLI: price forecasting and buy/sell recommendations"
)]
struct Cli {
    /// Analysis config (TOML). Flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the price history comes from and how far ahead to look.
#[derive(Args)]
struct SeriesArgs {
    /// CSV file with `date,close` columns.
    #[arg(long)]
    csv: PathBuf,

    /// Symbol label used in output.
    #[arg(long, default_value = "TICKER")]
    symbol: String,

    /// Forecast horizon in days.
    #[arg(long)]
    horizon: Option<usize>,

    /// Master seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    /// Print JSON instead of a summary.
    #[arg(long, default_value_t = false)]
    json: bool,
}

/// Fundamental ratios (percent units) and sentiment.
#[derive(Args)]
struct InputArgs {
    /// TOML file with pe / roe / profit_margin / debt_to_equity / beta.
    #[arg(long)]
    fundamentals: Option<PathBuf>,

    #[arg(long, allow_hyphen_values = true)]
    pe: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    roe: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    margin: Option<f64>,

    #[arg(long)]
    debt_to_equity: Option<f64>,

    #[arg(long)]
    beta: Option<f64>,

    /// Aggregate sentiment in [-1, 1].
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    sentiment: f64,
}

#[derive(Subcommand)]
enum Commands {
    /// Monte Carlo percentile bands around the trend projection.
    Simulate {
        #[command(flatten)]
        series: SeriesArgs,

        /// Number of simulated paths.
        #[arg(long)]
        paths: Option<usize>,
    },
    /// Per-model ensemble forecast.
    Forecast {
        #[command(flatten)]
        series: SeriesArgs,
    },
    /// Composite score and action for one symbol.
    Recommend {
        #[command(flatten)]
        series: SeriesArgs,

        #[command(flatten)]
        inputs: InputArgs,
    },
    /// Full report for one symbol.
    Analyze {
        #[command(flatten)]
        series: SeriesArgs,

        #[command(flatten)]
        inputs: InputArgs,

        /// Per-headline sentiment scores, comma separated. Replaces --sentiment.
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        headline_scores: Vec<f64>,
    },
    /// Correlation, movers and fundamentals across several symbols.
    Compare {
        /// `SYMBOL=path.csv`, repeated.
        #[arg(long = "series", required = true, value_parser = parse_symbol_path)]
        series: Vec<(String, PathBuf)>,

        /// TOML file with one table of ratios per symbol.
        #[arg(long)]
        fundamentals: Option<PathBuf>,

        /// How many gainers and losers to list.
        #[arg(long, default_value_t = 3)]
        top: usize,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate { series, paths } => run_simulate(config, series, paths),
        Commands::Forecast { series } => run_forecast(config, series),
        Commands::Recommend { series, inputs } => run_recommend(config, series, inputs),
        Commands::Analyze {
            series,
            inputs,
            headline_scores,
        } => run_analyze(config, series, inputs, headline_scores),
        Commands::Compare {
            series,
            fundamentals,
            top,
            json,
        } => run_compare(config, series, fundamentals, top, json),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "foresight=debug" } else { "foresight=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => Ok(AnalysisConfig::from_file(path)?),
        None => Ok(AnalysisConfig::default()),
    }
}

fn parse_symbol_path(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((symbol, path)) if !symbol.is_empty() && !path.is_empty() => {
            Ok((symbol.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected SYMBOL=path, got '{s}'")),
    }
}

/// Apply per-command overrides and build the forecaster.
fn build_forecaster(mut config: AnalysisConfig, args: &SeriesArgs) -> Result<Forecaster> {
    if let Some(h) = args.horizon {
        config.horizon = h;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    Ok(Forecaster::new(config)?)
}

fn load_series(forecaster: &Forecaster, args: &SeriesArgs) -> Result<PriceSeries> {
    let provider = CsvPriceProvider::new().with_file(&args.symbol, &args.csv);
    let config = forecaster.config();
    let series = provider
        .price_history(&args.symbol, config.lookback_days, config.interval)
        .with_context(|| format!("loading {}", args.csv.display()))?;
    info!(symbol = %args.symbol, points = series.len(), "history loaded");
    Ok(series)
}

fn load_fundamentals(inputs: &InputArgs) -> Result<FundamentalRatios> {
    let mut ratios = match &inputs.fundamentals {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str::<FundamentalRatios>(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => FundamentalRatios::default(),
    };
    ratios.pe = inputs.pe.or(ratios.pe);
    ratios.roe = inputs.roe.or(ratios.roe);
    ratios.profit_margin = inputs.margin.or(ratios.profit_margin);
    ratios.debt_to_equity = inputs.debt_to_equity.or(ratios.debt_to_equity);
    ratios.beta = inputs.beta.or(ratios.beta);
    Ok(ratios)
}

fn check_sentiment(s: f64) -> Result<()> {
    if !(-1.0..=1.0).contains(&s) {
        bail!("sentiment must lie in [-1, 1], got {s}");
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── simulate ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SimulationReport<'a> {
    symbol: &'a str,
    start_price: f64,
    horizon: usize,
    path_count: usize,
    seed: u64,
    bands: PercentileBands,
}

fn run_simulate(config: AnalysisConfig, args: SeriesArgs, paths: Option<usize>) -> Result<()> {
    let forecaster = build_forecaster(config, &args)?;
    let series = load_series(&forecaster, &args)?;
    let cfg = forecaster.config();
    let path_count = paths.unwrap_or(cfg.path_count);
    if path_count == 0 {
        bail!("--paths must be at least 1");
    }

    let bundle = forecaster.simulate(&series, cfg.horizon, path_count, cfg.seed)?;
    let report = SimulationReport {
        symbol: &args.symbol,
        start_price: bundle.start_price(),
        horizon: bundle.horizon(),
        path_count: bundle.path_count(),
        seed: bundle.seed(),
        bands: bundle.bands(),
    };

    if args.json {
        return print_json(&report);
    }

    println!();
    println!("=== Simulation: {} ===", report.symbol);
    println!("Start price:    {:.2}", report.start_price);
    println!("Paths:          {} (seed {})", report.path_count, report.seed);
    println!();
    println!("{:>5} {:>12} {:>12} {:>12}", "Day", "P5", "P50", "P95");
    println!("{}", "-".repeat(44));
    for t in 0..report.horizon {
        println!(
            "{:>5} {:>12.2} {:>12.2} {:>12.2}",
            t + 1,
            report.bands.p5[t],
            report.bands.p50[t],
            report.bands.p95[t]
        );
    }
    println!();
    Ok(())
}

// ── forecast ─────────────────────────────────────────────────────────

fn run_forecast(config: AnalysisConfig, args: SeriesArgs) -> Result<()> {
    let forecaster = build_forecaster(config, &args)?;
    let series = load_series(&forecaster, &args)?;
    let result = forecaster.ensemble_forecast(&series, forecaster.config().horizon)?;

    if args.json {
        return print_json(&result);
    }
    println!();
    println!("=== Ensemble forecast: {} ===", args.symbol);
    print_ensemble(&result);
    println!();
    Ok(())
}

fn print_ensemble(result: &ForecastResult) {
    println!("Last close:     {:.2}", result.last_price);
    println!("Horizon:        {} days", result.horizon);
    println!();
    println!("{:<15} {:>12} {:>9}  Status", "Model", "End price", "Change");
    println!("{}", "-".repeat(52));
    for m in result.iter() {
        let end = m.path.last().copied().unwrap_or(result.last_price);
        let change = (end - result.last_price) / result.last_price * 100.0;
        let status = match &m.status {
            ModelStatus::Fitted => "fitted".to_string(),
            ModelStatus::Fallback { reason } => format!("fallback ({reason})"),
            ModelStatus::Unavailable => "unavailable".to_string(),
        };
        println!("{:<15} {:>12.2} {:>8.2}%  {}", m.model, end, change, status);
    }
    if let Some(end) = result.consensus().and_then(|c| c.last().copied()) {
        println!("{:<15} {:>12.2}", "consensus", end);
    }
}

// ── recommend ────────────────────────────────────────────────────────

fn run_recommend(config: AnalysisConfig, args: SeriesArgs, inputs: InputArgs) -> Result<()> {
    check_sentiment(inputs.sentiment)?;
    let forecaster = build_forecaster(config, &args)?;
    let ratios = load_fundamentals(&inputs)?;

    let prices = CsvPriceProvider::new().with_file(&args.symbol, &args.csv);
    let context = StaticMarketData::new()
        .with_sentiment(&args.symbol, inputs.sentiment)
        .with_fundamentals(&args.symbol, ratios);
    let rec = forecaster
        .recommend_symbol(&args.symbol, &prices, &context, &context)
        .with_context(|| format!("recommending {}", args.symbol))?;

    if args.json {
        return print_json(&rec);
    }
    println!();
    println!("=== Recommendation: {} ===", args.symbol);
    print_recommendation(&rec);
    println!();
    Ok(())
}

fn print_recommendation(rec: &Recommendation) {
    let b = rec.breakdown();
    println!("Action:         {}", rec.action());
    println!("Composite:      {:+.3}", rec.composite());
    println!("Confidence:     {:.1}%", rec.confidence() * 100.0);
    for signal in [b.forecast, b.fundamental, b.sentiment] {
        let note = if signal.available { "" } else { " (missing, neutral)" };
        println!(
            "  {:<13} {:+.3}{note}",
            format!("{}:", signal.source.as_str()),
            signal.value
        );
    }
}

// ── analyze ──────────────────────────────────────────────────────────

fn run_analyze(
    config: AnalysisConfig,
    args: SeriesArgs,
    inputs: InputArgs,
    headline_scores: Vec<f64>,
) -> Result<()> {
    check_sentiment(inputs.sentiment)?;
    let forecaster = build_forecaster(config, &args)?;
    let series = load_series(&forecaster, &args)?;
    let ratios = load_fundamentals(&inputs)?;
    let sentiment = if headline_scores.is_empty() {
        SentimentSummary::from_scores(&[inputs.sentiment])
    } else {
        SentimentSummary::from_scores(&headline_scores)
    };

    let analysis = forecaster.analyze(&series, &ratios, sentiment)?;
    if args.json {
        return print_json(&analysis);
    }
    print_analysis(&args.symbol, &analysis);
    Ok(())
}

fn print_analysis(symbol: &str, a: &Analysis) {
    let s = &a.summary;
    let t = &a.technicals;

    println!();
    println!("=== Analysis: {symbol} ===");
    println!("Last close:     {:.2} ({})", a.last_price, a.last_date);
    println!("Seed:           {}", a.seed);
    println!();
    println!("--- History ---");
    println!("Total change:   {:+.2}%", s.total_change_pct);
    println!("Avg daily:      {:+.3}%", s.avg_daily_return_pct);
    println!("Volatility:     {:.3}% ({} risk)", s.volatility_pct, s.risk);
    println!("Best / worst:   {:+.2}% / {:+.2}%", s.best_day_pct, s.worst_day_pct);
    println!("Trend:          {}", s.trend);
    println!(
        "Sentiment:      {:+.3} {} ({} pos / {} neg / {} neutral)",
        s.sentiment.score, s.tone, s.sentiment.positive, s.sentiment.negative, s.sentiment.neutral
    );
    println!();
    println!("--- Technicals ---");
    println!("RSI(14):        {:.1}", t.rsi);
    println!(
        "Bollinger:      {:.2} / {:.2} / {:.2}",
        t.bollinger_lower, t.bollinger_middle, t.bollinger_upper
    );
    println!("MACD:           {:.3} (signal {:.3})", t.macd, t.macd_signal);
    println!();
    println!("--- Projection ({} days) ---", a.horizon);
    let last = a.horizon.checked_sub(1);
    match last {
        Some(i) => {
            println!("Trend ({:?}):   {:.2}", a.trend.flexibility, a.trend.prices[i]);
            println!(
                "Median:         {:.2}  [P5 {:.2}, P95 {:.2}]",
                a.lines.median[i], a.bands.p5[i], a.bands.p95[i]
            );
            println!("Sentiment adj.: {:.2}", a.lines.sentiment_adjusted[i]);
        }
        None => println!("(zero horizon)"),
    }
    if a.volatility.is_insufficient_data() {
        println!("WARNING: volatility unavailable (insufficient history)");
    }
    if !a.trend.fitted {
        println!("WARNING: trend fit failed, projection is flat");
    }
    println!();
    println!("--- Ensemble ---");
    print_ensemble(&a.ensemble);
    println!();
    println!("--- Recommendation ---");
    print_recommendation(&a.recommendation);
    println!();
}

// ── compare ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ComparisonReport {
    correlation: Option<CorrelationMatrix>,
    movers: Movers,
    fundamentals: Option<FundamentalComparison>,
}

fn run_compare(
    config: AnalysisConfig,
    series: Vec<(String, PathBuf)>,
    fundamentals: Option<PathBuf>,
    top: usize,
    json: bool,
) -> Result<()> {
    config.validate()?;
    let provider = series
        .iter()
        .fold(CsvPriceProvider::new(), |p, (symbol, path)| p.with_file(symbol, path));

    let mut universe = Vec::with_capacity(series.len());
    for (symbol, _) in &series {
        let s = provider
            .price_history(symbol, config.lookback_days, config.interval)
            .with_context(|| format!("loading {symbol}"))?;
        universe.push((symbol.clone(), s));
    }

    let fundamentals = match fundamentals {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let table: BTreeMap<String, FundamentalRatios> = toml::from_str(&text)
                .with_context(|| format!("parsing {}", path.display()))?;
            FundamentalComparison::build(table.into_iter().collect())
        }
        None => None,
    };

    let report = ComparisonReport {
        correlation: CorrelationMatrix::build(&universe),
        movers: top_movers(&universe, top),
        fundamentals,
    };

    if json {
        return print_json(&report);
    }

    println!();
    println!("=== Comparison ===");
    if let Some(m) = &report.correlation {
        println!();
        println!("--- Return correlation ---");
        print!("{:<8}", "");
        for s in &m.symbols {
            print!("{s:>9}");
        }
        println!();
        for (i, row) in m.values.iter().enumerate() {
            print!("{:<8}", m.symbols[i]);
            for v in row {
                match v {
                    Some(c) => print!("{c:>9.3}"),
                    None => print!("{:>9}", "-"),
                }
            }
            println!();
        }
    }
    println!();
    println!("--- Movers ---");
    for m in &report.movers.gainers {
        println!("  up    {:<8} {:>10.2} {:+.2}%", m.symbol, m.price, m.change_pct);
    }
    for m in &report.movers.losers {
        println!("  down  {:<8} {:>10.2} {:+.2}%", m.symbol, m.price, m.change_pct);
    }
    if let Some(f) = &report.fundamentals {
        let show = |o: &Option<String>| o.clone().unwrap_or_else(|| "-".to_string());
        println!();
        println!("--- Fundamentals ---");
        println!("Highest ROE:    {}", show(&f.highest_roe));
        println!("Highest margin: {}", show(&f.highest_margin));
        println!("Lowest debt:    {}", show(&f.lowest_debt));
        println!("Strongest:      {}", show(&f.strongest_overall));
    }
    println!();
    Ok(())
}
