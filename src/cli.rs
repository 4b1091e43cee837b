//! CLI definition and dispatch.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::cached_info_adapter::CachedInfoAdapter;
use crate::adapters::csv_archive_adapter::CsvArchiveAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::csv_source_adapter::CsvSourceAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self, BacktestConfig, BacktestOutcome};
use crate::domain::config_validation::{
    default_backtest_start, default_history_start, parse_date, parse_refresh, parse_windows,
    validate_config,
};
use crate::domain::error::TrendscanError;
use crate::domain::history_store::PriceHistoryStore;
use crate::domain::label_cache::{format_label, LabelCache};
use crate::domain::pipeline::{needs_fetch, PipelineConfig, RefreshMode, ScreeningPipeline};
use crate::domain::symbol::Symbol;
use crate::domain::ticker_info::TickerInfo;
use crate::domain::universe::{parse_symbols, parse_symbols_file};
use crate::ports::archive_port::ArchivePort;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{PriceSourcePort, TickerInfoPort};
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "trendscan", about = "Trend template screener and crossover backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Screen symbols against the trend template
    Screen {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated symbols, overriding the config
        #[arg(long)]
        symbols: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Read archives only, never contact the source
        #[arg(long)]
        offline: bool,
        /// Keep FAIL rows even when pass_only is set
        #[arg(long)]
        all_rows: bool,
    },
    /// Fetch and merge price archives
    Sync {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbols: Option<String>,
    },
    /// Run the crossover backtest for one symbol
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
    },
    /// Show archive range and label for one symbol
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Screen {
            config,
            symbols,
            output,
            offline,
            all_rows,
        } => run_screen(&config, symbols.as_deref(), output.as_ref(), offline, all_rows),
        Command::Sync { config, symbols } => run_sync(&config, symbols.as_deref()),
        Command::Simulate { config, symbol } => run_simulate(&config, &symbol),
        Command::Info { config, symbol } => run_info(&config, &symbol),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: TrendscanError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

/// Load and validate the config file.
pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    let adapter = FileConfigAdapter::from_file(path).map_err(fail)?;
    validate_config(&adapter).map_err(fail)?;
    Ok(adapter)
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, TrendscanError> {
    Ok(BacktestConfig {
        start_date: parse_date(config, "backtest", "start_date", default_backtest_start())?,
        fast_windows: parse_windows(config, "fast_windows", &backtest::DEFAULT_FAST_WINDOWS)?,
        slow_windows: parse_windows(config, "slow_windows", &backtest::DEFAULT_SLOW_WINDOWS)?,
    })
}

pub fn build_pipeline_config(config: &dyn ConfigPort) -> Result<PipelineConfig, TrendscanError> {
    Ok(PipelineConfig {
        history_start: parse_date(config, "screen", "start_date", default_history_start())?,
        rsi_period: config.get_int("screen", "rsi_period", 14).max(2) as usize,
        refresh: parse_refresh(config)?,
        pass_only: config.get_bool("screen", "pass_only", false),
        workers: config.get_int("screen", "workers", 1).max(1) as usize,
        backtest: build_backtest_config(config)?,
    })
}

pub fn data_dir(config: &dyn ConfigPort) -> PathBuf {
    PathBuf::from(
        config
            .get_string("data", "dir")
            .unwrap_or_else(|| "data".to_string()),
    )
}

/// Symbols from `--symbols`, then `[data] symbols`, then `[data] symbols_file`.
pub fn resolve_symbols(
    symbols_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<Symbol>, TrendscanError> {
    let invalid = |e: crate::domain::universe::UniverseError| {
        TrendscanError::config_invalid("data", "symbols", e.to_string())
    };

    if let Some(list) = symbols_override {
        return parse_symbols(list).map_err(invalid);
    }
    if let Some(list) = config.get_string("data", "symbols") {
        return parse_symbols(&list).map_err(invalid);
    }
    if let Some(path) = config.get_string("data", "symbols_file") {
        let content = fs::read_to_string(&path).map_err(|e| {
            TrendscanError::config_invalid("data", "symbols_file", format!("{path}: {e}"))
        })?;
        return parse_symbols_file(&content).map_err(invalid);
    }
    Err(TrendscanError::ConfigMissing {
        section: "data".to_string(),
        key: "symbols".to_string(),
    })
}

pub fn build_price_source(config: &dyn ConfigPort) -> Result<Box<dyn PriceSourcePort>, TrendscanError> {
    let kind = config
        .get_string("source", "kind")
        .unwrap_or_else(|| "yahoo".to_string());
    match kind.as_str() {
        "csv" => {
            let dir = config
                .get_string("source", "dir")
                .ok_or_else(|| TrendscanError::ConfigMissing {
                    section: "source".to_string(),
                    key: "dir".to_string(),
                })?;
            Ok(Box::new(CsvSourceAdapter::new(PathBuf::from(dir))))
        }
        #[cfg(feature = "yahoo")]
        "yahoo" => {
            let timeout = config.get_int("source", "timeout_secs", 30).max(1) as u64;
            Ok(Box::new(
                crate::adapters::yahoo_adapter::YahooAdapter::new(timeout)?,
            ))
        }
        other => Err(TrendscanError::config_invalid(
            "source",
            "kind",
            format!("source '{other}' is not available in this build"),
        )),
    }
}

/// Ticker info behind the on-disk cache. Offline runs and csv sources only
/// read the cache.
pub fn build_info_source(
    config: &dyn ConfigPort,
    offline: bool,
) -> Result<CachedInfoAdapter, TrendscanError> {
    let dir = data_dir(config);
    let kind = config
        .get_string("source", "kind")
        .unwrap_or_else(|| "yahoo".to_string());
    if offline || kind != "yahoo" {
        return Ok(CachedInfoAdapter::read_only(dir));
    }

    #[cfg(feature = "yahoo")]
    {
        let timeout = config.get_int("source", "timeout_secs", 30).max(1) as u64;
        let inner = crate::adapters::yahoo_adapter::YahooAdapter::new(timeout)?;
        Ok(CachedInfoAdapter::new(
            dir,
            Box::new(inner),
            config.get_bool("info", "reload", false),
        ))
    }

    #[cfg(not(feature = "yahoo"))]
    {
        Ok(CachedInfoAdapter::read_only(dir))
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn run_screen(
    config_path: &Path,
    symbols_override: Option<&str>,
    output_override: Option<&PathBuf>,
    offline: bool,
    all_rows: bool,
) -> ExitCode {
    info!(config = %config_path.display(), "loading config");
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let mut pipeline_config = match build_pipeline_config(&config) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    if offline {
        pipeline_config.refresh = RefreshMode::Never;
    }
    if all_rows {
        pipeline_config.pass_only = false;
    }

    let symbols = match resolve_symbols(symbols_override, &config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let source = match build_price_source(&config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let info_source = match build_info_source(&config, offline) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let archive = CsvArchiveAdapter::new(data_dir(&config));
    let store = PriceHistoryStore::new(&archive, source.as_ref(), today());
    let pipeline = ScreeningPipeline::new(&store, &info_source, pipeline_config);
    let labels = LabelCache::new();

    let outcome = match pipeline.run(&symbols, &labels) {
        Ok(o) => o,
        Err(e) => return fail(e),
    };

    for row in &outcome.rows {
        let sim = row
            .simulated_return
            .map(|r| format!("{r:.2}%"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}\t{}\tRSI {:.2}\tclose {:.2}\tsim {}",
            row.symbol, row.verdict, row.rsi, row.current_close, sim
        );
    }
    for skipped in &outcome.skipped {
        eprintln!("warning: skipped {skipped}");
    }
    eprintln!(
        "{} screened, {} passed, {} skipped",
        outcome.rows.len(),
        outcome.passed(),
        outcome.skipped.len()
    );

    let output = output_override
        .cloned()
        .or_else(|| config.get_string("screen", "output").map(PathBuf::from));
    if let Some(path) = output {
        if let Err(e) = CsvReportAdapter::new().write(&outcome.rows, &path.to_string_lossy()) {
            return fail(e);
        }
        eprintln!("Report written to: {}", path.display());
    }

    if outcome.rows.is_empty() && outcome.skipped.len() == symbols.len() {
        eprintln!("error: no symbols with usable data");
        return ExitCode::from(5);
    }
    ExitCode::SUCCESS
}

fn run_sync(config_path: &Path, symbols_override: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let history_start = match parse_date(&config, "screen", "start_date", default_history_start()) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };
    let symbols = match resolve_symbols(symbols_override, &config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let source = match build_price_source(&config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let archive = CsvArchiveAdapter::new(data_dir(&config));
    let store = PriceHistoryStore::new(&archive, source.as_ref(), today());

    let mut failures = 0usize;
    for symbol in &symbols {
        match store.get_series(symbol, history_start, store.today(), true) {
            Ok(_) => {}
            Err(e) if e.is_fatal() => return fail(e),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "sync failed");
                eprintln!("warning: {symbol}: {e}");
                failures += 1;
                continue;
            }
        }
        match store.archive_range(symbol) {
            Ok(Some((first, last, count))) => {
                println!("{symbol}: {count} bars, {first} to {last}");
            }
            Ok(None) => eprintln!("{symbol}: no data found"),
            Err(e) => return fail(e),
        }
    }

    if failures == symbols.len() {
        eprintln!("error: no symbols synced");
        return ExitCode::from(5);
    }
    ExitCode::SUCCESS
}

fn run_simulate(config_path: &Path, symbol: &str) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let pipeline_config = match build_pipeline_config(&config) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let source = match build_price_source(&config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let symbol = Symbol::infer(symbol);
    let archive = CsvArchiveAdapter::new(data_dir(&config));
    let store = PriceHistoryStore::new(&archive, source.as_ref(), today());

    let series = match needs_fetch(&store, &symbol, pipeline_config.refresh).and_then(|fetch| {
        store.get_series(&symbol, pipeline_config.history_start, store.today(), fetch)
    }) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let bt = &pipeline_config.backtest;
    eprintln!(
        "Simulating {symbol} from {}: fast {:?}, slow {:?}",
        bt.start_date, bt.fast_windows, bt.slow_windows
    );
    match backtest::simulate(&series, bt) {
        Ok(BacktestOutcome::NoSignal) => {
            println!("{symbol}: no signal");
            ExitCode::SUCCESS
        }
        Ok(BacktestOutcome::Traded {
            total_return,
            trade_returns,
        }) => {
            for (i, r) in trade_returns.iter().enumerate() {
                println!("  trade {:>3}: {:+.2}%", i + 1, r);
            }
            println!(
                "{symbol}: {} trades, total return {total_return:.2}%",
                trade_returns.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_info(config_path: &Path, symbol: &str) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let symbol = Symbol::infer(symbol);
    let archive = CsvArchiveAdapter::new(data_dir(&config));

    let series = match archive.load(&symbol) {
        Ok(Some(s)) if !s.is_empty() => s,
        Ok(_) => {
            eprintln!("{symbol}: no data found");
            return ExitCode::SUCCESS;
        }
        Err(e) => return fail(e),
    };

    let ticker_info = match build_info_source(&config, true) {
        Ok(cache) => cache
            .fetch_info(&symbol)
            .unwrap_or_else(|_| TickerInfo::unknown()),
        Err(e) => return fail(e),
    };

    println!("{}", format_label(&symbol, &series, &ticker_info));
    if let (Some(first), Some(last)) = (series.first_date(), series.last_date()) {
        println!("{symbol}: {} bars, {first} to {last}", series.len());
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let pipeline_config = match build_pipeline_config(&config) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    eprintln!("  data dir:    {}", data_dir(&config).display());
    eprintln!("  history:     from {}", pipeline_config.history_start);
    eprintln!("  refresh:     {:?}", pipeline_config.refresh);
    eprintln!("  workers:     {}", pipeline_config.workers);
    eprintln!(
        "  backtest:    from {}, fast {:?}, slow {:?}",
        pipeline_config.backtest.start_date,
        pipeline_config.backtest.fast_windows,
        pipeline_config.backtest.slow_windows
    );

    match resolve_symbols(None, &config) {
        Ok(symbols) => eprintln!("  symbols:     {}", symbols.len()),
        Err(TrendscanError::ConfigMissing { .. }) => {
            eprintln!("  symbols:     none configured (pass --symbols)")
        }
        Err(e) => return fail(e),
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
