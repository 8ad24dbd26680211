//! CLI definition and dispatch.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvDataAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::error::QuorumtraderError;
use crate::domain::simulator;
use crate::domain::strategy::{AgentConfiguration, LifecycleState, Strategy, UnitSpec};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;
use crate::scheduler::ContinuousBacktester;

#[derive(Parser, Debug)]
#[command(name = "quorumtrader", about = "Committee-based strategy evaluator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one committee over historical data and print the result
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of per-instrument CSV files
        #[arg(short, long)]
        data: PathBuf,
    },
    /// Evaluate a grid of candidate strategies on the worker pool
    Triage {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Backtest { config, data } => run_backtest(&config, &data),
        Command::Triage { config, data } => run_triage(&config, &data),
    }
}

fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

/// Assemble the committee described by the `[committee]` section. Every key
/// has a default so a minimal config still yields a working committee.
fn committee_config(config: &dyn ConfigPort) -> AgentConfiguration {
    AgentConfiguration {
        unit_specs: vec![
            UnitSpec::Trend {
                fast: config.get_int("committee", "trend_fast", 5) as usize,
                slow: config.get_int("committee", "trend_slow", 20) as usize,
                weight: config.get_double("committee", "trend_weight", 1.0),
            },
            UnitSpec::Reversion {
                lookback: config.get_int("committee", "reversion_lookback", 20) as usize,
                entry_z: config.get_double("committee", "reversion_entry_z", 1.5),
                weight: config.get_double("committee", "reversion_weight", 1.0),
            },
            UnitSpec::Risk {
                max_drawdown_pct: config.get_double("committee", "max_drawdown_pct", 20.0),
                max_exposure_fraction: config.get_double(
                    "committee",
                    "max_exposure_fraction",
                    0.5,
                ),
                weight: config.get_double("committee", "risk_weight", 2.0),
            },
        ],
        confidence_threshold: config.get_double("committee", "confidence_threshold", 0.5),
    }
}

fn run_backtest(config_path: &PathBuf, data_dir: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match execute_backtest(&adapter, data_dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn execute_backtest(
    adapter: &FileConfigAdapter,
    data_dir: &PathBuf,
) -> Result<(), QuorumtraderError> {
    let simulation_config = adapter.simulation_config()?;
    let data = CsvDataAdapter::new(data_dir.clone());
    let series = data.fetch_series(&simulation_config)?;

    let configuration = committee_config(adapter);
    let mut committee = configuration.build_committee();
    info!(
        units = committee.unit_count(),
        threshold = committee.confidence_threshold(),
        "committee assembled"
    );

    let result = simulator::run(&simulation_config, &mut committee, &series)?;

    println!("Initial capital:  {:>14.2}", result.initial_capital);
    println!("Final capital:    {:>14.2}", result.final_capital);
    println!("Trades:           {:>14}", result.trades.len());
    println!("Win rate:         {:>14.4}", result.win_rate);
    println!("Sharpe ratio:     {:>14.4}", result.sharpe_ratio);
    println!("Sortino ratio:    {:>14.4}", result.sortino_ratio);
    println!("Calmar ratio:     {:>14.4}", result.calmar_ratio);
    println!("Max drawdown %:   {:>14.4}", result.max_drawdown_pct);
    println!("Profit factor:    {:>14.4}", result.profit_factor);
    println!("Avg win / loss:   {:>9.2} / {:.2}", result.avg_win, result.avg_loss);
    Ok(())
}

/// Candidate grid: trend and reversion parameter sweeps, each guarded by the
/// same risk sentinel.
fn candidate_strategies(adapter: &FileConfigAdapter) -> Vec<Strategy> {
    let threshold = adapter.get_double("committee", "confidence_threshold", 0.5);
    let risk = UnitSpec::Risk {
        max_drawdown_pct: adapter.get_double("committee", "max_drawdown_pct", 20.0),
        max_exposure_fraction: adapter.get_double("committee", "max_exposure_fraction", 0.5),
        weight: 2.0,
    };

    let mut candidates = Vec::new();
    for (fast, slow) in [(3, 10), (5, 20), (10, 40), (20, 60)] {
        candidates.push(Strategy::new(
            format!("trend-{fast}-{slow}"),
            AgentConfiguration {
                unit_specs: vec![
                    UnitSpec::Trend {
                        fast,
                        slow,
                        weight: 1.0,
                    },
                    risk.clone(),
                ],
                confidence_threshold: threshold,
            },
        ));
    }
    for lookback in [10, 20, 40] {
        for entry_z in [1.0, 1.5, 2.0] {
            candidates.push(Strategy::new(
                format!("reversion-{lookback}-{entry_z}"),
                AgentConfiguration {
                    unit_specs: vec![
                        UnitSpec::Reversion {
                            lookback,
                            entry_z,
                            weight: 1.0,
                        },
                        risk.clone(),
                    ],
                    confidence_threshold: threshold,
                },
            ));
        }
    }
    candidates
}

fn run_triage(config_path: &PathBuf, data_dir: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match execute_triage(&adapter, data_dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn execute_triage(
    adapter: &FileConfigAdapter,
    data_dir: &PathBuf,
) -> Result<(), QuorumtraderError> {
    let simulation_config = adapter.simulation_config()?;
    let scheduler_config = adapter.scheduler_config();
    let data = CsvDataAdapter::new(data_dir.clone());

    let candidates = candidate_strategies(adapter);
    let total = candidates.len();
    info!(candidates = total, "triage started");

    let pool = ContinuousBacktester::start(scheduler_config, simulation_config, &data)?;
    for strategy in candidates {
        pool.submit(strategy, 1)?;
    }

    let mut seen = 0;
    while seen < total {
        match pool.completions().recv() {
            Ok(completion) => {
                seen += 1;
                println!(
                    "{:<24} {:>9}  weight {:>8.4}  trades {:>4}",
                    completion.strategy_id,
                    completion.state.to_string(),
                    completion.weight,
                    completion.trade_count
                );
            }
            Err(_) => break,
        }
    }

    let report = pool.report();
    let results = pool.stop();
    let promoted = results
        .values()
        .filter(|s| s.lifecycle_state == LifecycleState::Promoted)
        .count();
    println!(
        "\n{} evaluated, {} promoted, {} failed, avg {:?}/run",
        report.completed + report.failed,
        promoted,
        report.failed,
        report.avg_simulation_time
    );
    Ok(())
}
