//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::trace_event_adapter::TraceEventAdapter;
use crate::domain::config_validation::{load_pipeline_config, load_pool_config, validate_config};
use crate::domain::error::StratgateError;
use crate::domain::ohlcv::{PriceSeries, Timeframe};
use crate::domain::parameter_space::{ParameterSpaceConfig, build_grid};
use crate::domain::pipeline::{PipelineConfig, Verdict, evaluate_strategy};
use crate::domain::pool::PoolManager;
use crate::domain::shuffle::ShuffleCache;
use crate::domain::signal::{InstrumentMeta, SignalStrategy};
use crate::domain::strategies::{MeanReversion, MomentumBreakout};
use crate::domain::strategy::StrategyRecord;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

/// Bars below which a series is too short to backtest at all.
const MIN_SERIES_BARS: usize = 300;

#[derive(Parser, Debug)]
#[command(name = "stratgate", about = "Strategy backtesting and leaderboard engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one strategy through the full gating pipeline
    Evaluate {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory holding SYMBOL_TF.csv price files
        #[arg(short, long)]
        data: PathBuf,
        /// Built-in strategy: momentum-breakout or mean-reversion
        #[arg(short, long)]
        strategy: String,
        /// Comma-separated instrument universe; first symbol is the
        /// reference instrument
        #[arg(long)]
        symbols: String,
        #[arg(long, default_value = "5m")]
        timeframe: String,
        #[arg(long, default_value_t = 20)]
        lookback: usize,
        #[arg(long, default_value_t = 0.02)]
        band: f64,
    },
    /// Print the parameter grid a strategy class would search
    Grid {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "5m")]
        timeframe: String,
    },
    /// List symbols available in a data directory
    ListSymbols {
        #[arg(short, long)]
        data: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Evaluate {
            config,
            data,
            strategy,
            symbols,
            timeframe,
            lookback,
            band,
        } => run_evaluate(
            config.as_ref(),
            &data,
            &strategy,
            &symbols,
            &timeframe,
            lookback,
            band,
        ),
        Command::Grid { config, timeframe } => run_grid(config.as_ref(), &timeframe),
        Command::ListSymbols { data } => run_list_symbols(&data),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: &StratgateError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

fn load_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, StratgateError> {
    match path {
        Some(path) => FileConfigAdapter::from_file(path),
        None => FileConfigAdapter::from_string(""),
    }
}

fn parse_timeframe(label: &str) -> Result<Timeframe, StratgateError> {
    Timeframe::parse(label).ok_or_else(|| StratgateError::ConfigInvalid {
        section: "cli".to_string(),
        key: "timeframe".to_string(),
        reason: format!("unknown timeframe '{label}'"),
    })
}

fn build_strategy(
    name: &str,
    universe: Vec<String>,
    lookback: usize,
    band: f64,
) -> Result<Box<dyn SignalStrategy>, StratgateError> {
    match name {
        "momentum-breakout" => Ok(Box::new(MomentumBreakout::new(universe, lookback))),
        "mean-reversion" => Ok(Box::new(MeanReversion::new(universe, lookback, band))),
        other => Err(StratgateError::ConfigInvalid {
            section: "cli".to_string(),
            key: "strategy".to_string(),
            reason: format!("unknown strategy '{other}'"),
        }),
    }
}

fn load_universe(
    adapter: &CsvAdapter,
    symbols: &[String],
    timeframe: Timeframe,
) -> Result<Vec<(InstrumentMeta, PriceSeries)>, StratgateError> {
    let mut data = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let series = adapter.fetch_series(symbol, timeframe)?;
        if series.len() < MIN_SERIES_BARS {
            return Err(StratgateError::InsufficientData {
                symbol: symbol.clone(),
                bars: series.len(),
                minimum: MIN_SERIES_BARS,
            });
        }
        let meta = adapter.instrument_meta(symbol)?;
        data.push((meta, series));
    }
    Ok(data)
}

#[allow(clippy::too_many_arguments)]
fn run_evaluate(
    config_path: Option<&PathBuf>,
    data_path: &PathBuf,
    strategy_name: &str,
    symbols: &str,
    timeframe: &str,
    lookback: usize,
    band: f64,
) -> ExitCode {
    // Stage 1: config
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };
    if let Err(e) = validate_config(&adapter) {
        return fail(&e);
    }
    let pipeline_config: PipelineConfig = load_pipeline_config(&adapter);

    // Stage 2: data
    let timeframe = match parse_timeframe(timeframe) {
        Ok(tf) => tf,
        Err(e) => return fail(&e),
    };
    let universe: Vec<String> = symbols
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if universe.is_empty() {
        return fail(&StratgateError::ConfigInvalid {
            section: "cli".to_string(),
            key: "symbols".to_string(),
            reason: "at least one symbol required".to_string(),
        });
    }
    eprintln!("Loading {} series from {}", universe.len(), data_path.display());
    let csv = CsvAdapter::new(data_path.clone());
    let data = match load_universe(&csv, &universe, timeframe) {
        Ok(data) => data,
        Err(e) => return fail(&e),
    };

    // Stage 3: strategy
    let strategy = match build_strategy(strategy_name, universe, lookback, band) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let mut record = StrategyRecord::new(strategy.as_ref());

    // Stage 4: pipeline
    eprintln!("Evaluating {}", record.id);
    let shuffle_cache = ShuffleCache::new();
    let pool = PoolManager::new(load_pool_config(&adapter));
    let events = TraceEventAdapter;
    let verdict = evaluate_strategy(
        &mut record,
        strategy.as_ref(),
        &data,
        &shuffle_cache,
        &pool,
        &events,
        &pipeline_config,
    );

    print_report(&record, &verdict);
    ExitCode::SUCCESS
}

fn print_report(record: &StrategyRecord, verdict: &Verdict) {
    println!("strategy:   {}", record.id);
    println!("status:     {}", record.status.label());
    if let Some(combo) = &record.metrics.best_combo {
        println!(
            "parameters: sl={:.4} tp={:.4} lev={:.0} timeout={}",
            combo.stop_loss_pct, combo.take_profit_pct, combo.leverage, combo.exit_timeout_bars
        );
    }
    if let Some(metrics) = &record.metrics.oos_metrics {
        println!(
            "oos:        sharpe={:.2} win_rate={:.2} expectancy={:.4} trades={}",
            metrics.sharpe, metrics.win_rate, metrics.expectancy, metrics.total_trades
        );
    }
    match verdict {
        Verdict::Admitted {
            score,
            robustness,
            evicted,
        } => {
            println!("verdict:    admitted (score {score:.1}, robustness {robustness:.2})");
            if let Some(evicted) = evicted {
                println!("evicted:    {evicted}");
            }
        }
        Verdict::Validated { score, robustness } => {
            println!(
                "verdict:    validated, below robustness threshold \
                 (score {score:.1}, robustness {robustness:.2})"
            );
        }
        Verdict::Retired { reason } => println!("verdict:    retired ({reason})"),
        Verdict::Discarded { reason } => println!("verdict:    discarded ({reason})"),
    }
}

fn run_grid(config_path: Option<&PathBuf>, timeframe: &str) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };
    let timeframe = match parse_timeframe(timeframe) {
        Ok(tf) => tf,
        Err(e) => return fail(&e),
    };
    let space = ParameterSpaceConfig {
        prefer_atr_stops: adapter.get_bool("parameter_space", "prefer_atr_stops", true),
        ..ParameterSpaceConfig::default()
    };
    let grid = build_grid(
        &crate::domain::parameter_space::StrategyClass::Generic,
        timeframe,
        &space,
    );
    println!("{} combos for generic class at {}", grid.len(), timeframe.label());
    for combo in grid.iter().take(10) {
        println!(
            "  sl={:.4} tp={:.4} lev={:.0} timeout={}",
            combo.stop_loss_pct, combo.take_profit_pct, combo.leverage, combo.exit_timeout_bars
        );
    }
    if grid.len() > 10 {
        println!("  ... {} more", grid.len() - 10);
    }
    ExitCode::SUCCESS
}

fn run_list_symbols(data_path: &PathBuf) -> ExitCode {
    let adapter = CsvAdapter::new(data_path.clone());
    match adapter.list_symbols() {
        Ok(symbols) => {
            for symbol in symbols {
                println!("{symbol}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let adapter = match FileConfigAdapter::from_file(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };
    match validate_config(&adapter) {
        Ok(()) => {
            println!("{} is valid", config_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}
