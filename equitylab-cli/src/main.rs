//! EquityLab CLI: ingestion, feature build, quality gate and snapshot commands.
//!
//! Commands:
//! - `ingest` fetch daily bars from Yahoo Finance into `raw.equity_prices`
//! - `import-csv` load daily bars from CSV files into `raw.equity_prices`
//! - `build` rebuild `core.fct_prices_daily` from the raw table
//! - `features` compute and upsert `core.feat_equity_daily`
//! - `run` ingest, build and features in sequence
//! - `check` run the data-quality gate (exit 0 pass, 1 blocking failure, 2 fatal)
//! - `snapshot` print latest prices, latest features and a ticker's history
//! - `status` list warehouse tables with their metadata

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use equitylab_core::config::parse_tickers;
use equitylab_core::dashboard::DashboardData;
use equitylab_core::data::{
    build_prices_daily, ingest_prices, CsvImport, DataProvider, IngestSummary, StdoutProgress,
    Warehouse, YahooProvider,
};
use equitylab_core::features::build_features;
use equitylab_core::quality::run_checks;
use equitylab_core::{PipelineConfig, PipelineError};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "equitylab", about = "EquityLab: daily equity prices, features and quality checks")]
struct Cli {
    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Warehouse directory (overrides config and EQUITYLAB_WAREHOUSE).
    #[arg(long, global = true)]
    warehouse: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch daily bars from Yahoo Finance into raw.equity_prices.
    Ingest {
        /// Tickers (e.g. SPY AAPL). Defaults to the configured list.
        tickers: Vec<String>,

        #[command(flatten)]
        range: DateRange,
    },
    /// Load daily bars from CSV files into raw.equity_prices.
    ImportCsv {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Only import these tickers (comma separated). Defaults to every ticker in the files.
        #[arg(long)]
        tickers: Option<String>,

        #[command(flatten)]
        range: DateRange,
    },
    /// Rebuild core.fct_prices_daily from raw.equity_prices.
    Build,
    /// Compute features and upsert them into core.feat_equity_daily.
    Features,
    /// Ingest, build and compute features in one go.
    Run {
        tickers: Vec<String>,

        #[command(flatten)]
        range: DateRange,
    },
    /// Run the data-quality checks.
    Check {
        /// Evaluate freshness as of this date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        today: Option<String>,
    },
    /// Print the latest snapshot and, optionally, one ticker's history.
    Snapshot {
        #[arg(long)]
        ticker: Option<String>,

        /// History rows to show for --ticker.
        #[arg(long, default_value_t = 20)]
        tail: usize,
    },
    /// List warehouse tables.
    Status,
}

#[derive(clap::Args)]
struct DateRange {
    /// Start date (YYYY-MM-DD). Defaults to end minus --days.
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<String>,

    /// Calendar days of history. Defaults to the configured lookback.
    #[arg(long)]
    days: Option<i64>,
}

impl DateRange {
    fn resolve(&self, config: &PipelineConfig) -> Result<(NaiveDate, NaiveDate)> {
        let end = parse_date(self.end.as_deref())?.unwrap_or_else(today);
        let days = self.days.unwrap_or(config.lookback_days);
        let start = match parse_date(self.start.as_deref())? {
            Some(start) => start,
            None => chrono::Duration::try_days(days)
                .and_then(|span| end.checked_sub_signed(span))
                .with_context(|| format!("--days {days} is out of range"))?,
        };
        if start > end {
            anyhow::bail!("start date {start} is after end date {end}");
        }
        Ok((start, end))
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn parse_date(s: Option<&str>) -> Result<Option<NaiveDate>> {
    s.map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'")))
        .transpose()
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = exit_code(&err);
            if code == 1 {
                eprintln!("{err}");
            } else {
                eprintln!("error: {err:#}");
            }
            ExitCode::from(code)
        }
    }
}

/// 1 for a blocking quality failure, 2 for anything else.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|e| e.downcast_ref::<PipelineError>())
        .map_or(2, PipelineError::exit_code)
}

fn run(cli: Cli) -> Result<()> {
    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.warehouse {
        config.warehouse_dir = dir;
    }
    let warehouse = Warehouse::new(&config.warehouse_dir);
    log::debug!("warehouse at {}", warehouse.root().display());

    match cli.command {
        Commands::Ingest { tickers, range } => {
            let (start, end) = range.resolve(&config)?;
            let tickers = pick_tickers(tickers, &config);
            let provider = YahooProvider::new()?;
            run_ingest(&provider, &warehouse, &tickers, start, end)
        }
        Commands::ImportCsv {
            paths,
            tickers,
            range,
        } => {
            let provider = CsvImport::new(paths);
            let tickers = match tickers {
                Some(list) => parse_tickers(&list),
                None => provider.symbols()?,
            };
            let (start, end) = match (&range.start, &range.days) {
                // No explicit window: take the files whole
                (None, None) => (NaiveDate::MIN, parse_date(range.end.as_deref())?.unwrap_or(NaiveDate::MAX)),
                _ => range.resolve(&config)?,
            };
            run_ingest(&provider, &warehouse, &tickers, start, end)
        }
        Commands::Build => run_build(&warehouse),
        Commands::Features => run_features(&warehouse),
        Commands::Run { tickers, range } => {
            let (start, end) = range.resolve(&config)?;
            let tickers = pick_tickers(tickers, &config);
            let provider = YahooProvider::new()?;
            run_ingest(&provider, &warehouse, &tickers, start, end)?;
            run_build(&warehouse)?;
            run_features(&warehouse)
        }
        Commands::Check { today: as_of } => {
            let as_of = parse_date(as_of.as_deref())?.unwrap_or_else(today);
            let report = run_checks(&warehouse, as_of, &config)?;
            println!("{report}");
            report.into_result()?;
            Ok(())
        }
        Commands::Snapshot { ticker, tail } => run_snapshot(&warehouse, ticker.as_deref(), tail),
        Commands::Status => run_status(&warehouse),
    }
}

fn pick_tickers(cli: Vec<String>, config: &PipelineConfig) -> Vec<String> {
    if cli.is_empty() {
        config.tickers.clone()
    } else {
        cli.iter().map(|t| t.trim().to_uppercase()).collect()
    }
}

fn run_ingest(
    provider: &dyn DataProvider,
    warehouse: &Warehouse,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<()> {
    if tickers.is_empty() {
        anyhow::bail!("no tickers to ingest");
    }
    let summary = ingest_prices(provider, warehouse, tickers, start, end, &StdoutProgress)?;
    print_ingest_summary(&summary);
    Ok(())
}

fn print_ingest_summary(summary: &IngestSummary) {
    println!();
    println!(
        "Rows: {} fetched, {} inserted, {} updated ({} in table)",
        summary.rows_fetched, summary.rows_inserted, summary.rows_updated, summary.table_rows
    );
    if !summary.all_succeeded() {
        eprintln!("{} of {} tickers failed:", summary.failed, summary.total);
    }
    for (ticker, err) in &summary.errors {
        eprintln!("Error for {ticker}: {err}");
    }
}

fn run_build(warehouse: &Warehouse) -> Result<()> {
    let summary = build_prices_daily(warehouse)?;
    println!(
        "Built core.fct_prices_daily: {} rows across {} tickers",
        summary.rows, summary.symbols
    );
    Ok(())
}

fn run_features(warehouse: &Warehouse) -> Result<()> {
    let summary = build_features(warehouse)?;
    println!(
        "Features: {} rows across {} tickers ({} inserted, {} updated)",
        summary.rows, summary.tickers, summary.inserted, summary.updated
    );
    Ok(())
}

fn fmt_opt(v: Option<f64>, precision: usize) -> String {
    v.map_or_else(|| "-".to_string(), |x| format!("{x:.precision$}"))
}

fn run_snapshot(warehouse: &Warehouse, ticker: Option<&str>, tail: usize) -> Result<()> {
    let data = DashboardData::load(warehouse)?;

    println!("Latest date in warehouse: {}", data.latest_date);
    println!();
    println!("Latest prices & returns");
    println!("{:<12} {:<8} {:>12} {:>10}", "Date", "Ticker", "Close", "Ret 1d");
    println!("{}", "-".repeat(45));
    for p in &data.latest_prices {
        println!(
            "{:<12} {:<8} {:>12.4} {:>10}",
            p.date.to_string(),
            p.ticker,
            p.close,
            fmt_opt(p.ret_1d, 5)
        );
    }

    println!();
    if data.features_available {
        println!("Latest features");
    } else {
        println!("Latest features (table not found)");
    }
    println!(
        "{:<12} {:<8} {:>8} {:>12} {:>10}",
        "Date", "Ticker", "RSI 14", "Mom 10d", "Vol 21d"
    );
    println!("{}", "-".repeat(54));
    for f in &data.latest_features {
        println!(
            "{:<12} {:<8} {:>8} {:>12} {:>10}",
            f.date.to_string(),
            f.ticker,
            fmt_opt(f.rsi_14, 2),
            fmt_opt(f.momentum_10d, 5),
            fmt_opt(f.vol_21d, 5)
        );
    }

    let Some(ticker) = ticker else {
        println!();
        println!("Tickers: {}", data.tickers.join(", "));
        return Ok(());
    };
    let ticker = ticker.to_uppercase();
    let history = data.ticker_history(&ticker);
    if history.is_empty() {
        anyhow::bail!("ticker {ticker} not found (available: {})", data.tickers.join(", "));
    }

    println!();
    println!("History: {ticker} (last {} of {} rows)", tail.min(history.len()), history.len());
    println!(
        "{:<12} {:>12} {:>10} {:>8} {:>12} {:>10}",
        "Date", "Close", "Ret 1d", "RSI 14", "Mom 10d", "Vol 21d"
    );
    println!("{}", "-".repeat(69));
    for h in &history[history.len().saturating_sub(tail)..] {
        println!(
            "{:<12} {:>12.4} {:>10} {:>8} {:>12} {:>10}",
            h.date.to_string(),
            h.close,
            fmt_opt(h.ret_1d, 5),
            fmt_opt(h.rsi_14, 2),
            fmt_opt(h.momentum_10d, 5),
            fmt_opt(h.vol_21d, 5)
        );
    }
    Ok(())
}

fn run_status(warehouse: &Warehouse) -> Result<()> {
    let tables = warehouse.tables()?;
    if tables.is_empty() {
        println!("Warehouse is empty: {}", warehouse.root().display());
        return Ok(());
    }

    println!("Warehouse: {}", warehouse.root().display());
    println!("Tables: {}", tables.len());
    println!();
    println!("{:<28} {:>10} {:<20} {:<16}", "Table", "Rows", "Written", "Hash");
    println!("{}", "-".repeat(77));
    for name in &tables {
        let full = name.to_string();
        match warehouse.meta(&full) {
            Some(meta) => println!(
                "{:<28} {:>10} {:<20} {:<16}",
                full,
                meta.row_count,
                meta.written_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                &meta.data_hash[..meta.data_hash.len().min(16)]
            ),
            None => println!("{:<28} {:>10} {:<20} {:<16}", full, "?", "(no meta)", "-"),
        }
        match warehouse.columns(&full) {
            Ok(columns) => println!("  columns: {}", columns.join(", ")),
            Err(e) => println!("  columns: unreadable ({e})"),
        }
    }
    Ok(())
}
