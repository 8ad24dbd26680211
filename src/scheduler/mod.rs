//! Continuous strategy evaluation on a fixed pool of OS threads.
//!
//! Market data is fetched once at startup and shared read-only across the
//! pool. Workers pull tasks off the priority queue, rebuild the strategy's
//! committee, run the simulation and settle the lifecycle. Completions are
//! published on a channel so callers can react without polling.

pub mod queue;
pub mod stats;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, info, warn};

use crate::domain::config::SimulationConfig;
use crate::domain::error::QuorumtraderError;
use crate::domain::simulator;
use crate::domain::strategy::{LifecycleState, Strategy};
use crate::ports::data_port::MarketDataPort;
use queue::{PopOutcome, TaskQueue};
use stats::{SchedulerReport, SchedulerStats};

const POP_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub workers: usize,
    /// Interval for the background activity report; `None` disables it.
    pub report_interval: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            workers: 4,
            report_interval: Some(Duration::from_secs(30)),
        }
    }
}

/// One settled task, published on the completion channel. Failed
/// evaluations publish too, recognizable by their non-terminal state.
#[derive(Debug, Clone)]
pub struct Completion {
    pub strategy_id: String,
    pub state: LifecycleState,
    pub weight: f64,
    pub trade_count: usize,
}

#[derive(Debug)]
pub struct ContinuousBacktester {
    queue: Arc<TaskQueue>,
    stats: Arc<SchedulerStats>,
    results: Arc<Mutex<BTreeMap<String, Strategy>>>,
    completions: Receiver<Completion>,
    workers: Vec<JoinHandle<()>>,
    reporter: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl ContinuousBacktester {
    /// Fetch the market data once, then spin up the worker pool.
    pub fn start(
        scheduler_config: SchedulerConfig,
        simulation_config: SimulationConfig,
        data: &dyn MarketDataPort,
    ) -> Result<Self, QuorumtraderError> {
        simulation_config.validate()?;
        let series = Arc::new(data.fetch_series(&simulation_config)?);
        let simulation_config = Arc::new(simulation_config);

        let worker_count = scheduler_config.workers.max(1);
        let queue = Arc::new(TaskQueue::new());
        let stats = Arc::new(SchedulerStats::new());
        let results: Arc<Mutex<BTreeMap<String, Strategy>>> = Arc::new(Mutex::new(BTreeMap::new()));
        let shutdown = Arc::new(AtomicBool::new(false));
        let (tx, rx) = unbounded();

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let queue = Arc::clone(&queue);
            let stats = Arc::clone(&stats);
            let results = Arc::clone(&results);
            let series = Arc::clone(&series);
            let simulation_config = Arc::clone(&simulation_config);
            let tx = tx.clone();
            workers.push(
                std::thread::Builder::new()
                    .name(format!("backtest-worker-{worker_id}"))
                    .spawn(move || {
                        worker_loop(&queue, &stats, &results, &series, &simulation_config, &tx);
                    })
                    .map_err(QuorumtraderError::Io)?,
            );
        }
        drop(tx);

        let reporter = match scheduler_config.report_interval {
            Some(interval) => {
                let stats = Arc::clone(&stats);
                let shutdown = Arc::clone(&shutdown);
                Some(
                    std::thread::Builder::new()
                        .name("backtest-reporter".into())
                        .spawn(move || reporter_loop(&stats, &shutdown, interval))
                        .map_err(QuorumtraderError::Io)?,
                )
            }
            None => None,
        };

        info!(workers = worker_count, "scheduler started");
        Ok(ContinuousBacktester {
            queue,
            stats,
            results,
            completions: rx,
            workers,
            reporter,
            shutdown,
        })
    }

    /// Queue a strategy for evaluation. Lower priority values run first.
    pub fn submit(&self, mut strategy: Strategy, priority: u32) -> Result<(), QuorumtraderError> {
        strategy.mark_queued();
        // Count before the push makes the task poppable, so a worker's
        // started-decrement can never land ahead of this increment.
        self.stats.task_queued();
        match self.queue.push(strategy, priority) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.stats.task_dropped();
                Err(e)
            }
        }
    }

    /// Channel of finished evaluations, in completion order.
    pub fn completions(&self) -> &Receiver<Completion> {
        &self.completions
    }

    pub fn report(&self) -> SchedulerReport {
        self.stats.report()
    }

    /// Stop accepting work, drain the queue, join the pool and hand back
    /// every evaluated strategy.
    pub fn stop(self) -> BTreeMap<String, Strategy> {
        self.queue.close();
        self.shutdown.store(true, Ordering::Relaxed);
        for worker in self.workers {
            let _ = worker.join();
        }
        if let Some(reporter) = self.reporter {
            let _ = reporter.join();
        }

        let report = self.stats.report();
        info!(
            completed = report.completed,
            failed = report.failed,
            "scheduler stopped"
        );

        let mut guard = self.results.lock().unwrap();
        std::mem::take(&mut *guard)
    }
}

fn worker_loop(
    queue: &TaskQueue,
    stats: &SchedulerStats,
    results: &Mutex<BTreeMap<String, Strategy>>,
    series: &Arc<crate::domain::bar::InstrumentSeries>,
    config: &SimulationConfig,
    completions: &Sender<Completion>,
) {
    loop {
        let task = match queue.pop_timeout(POP_TIMEOUT) {
            PopOutcome::Task(task) => task,
            PopOutcome::TimedOut => continue,
            PopOutcome::Closed => break,
        };

        let mut strategy = task.strategy;
        strategy.mark_running();
        stats.task_started();
        debug!(strategy = %strategy.id, priority = task.priority, "evaluation started");

        let mut committee = strategy.configuration.build_committee();
        let started = Instant::now();
        match simulator::run(config, &mut committee, series) {
            Ok(result) => {
                strategy.apply_result(&result);
                stats.task_completed(started.elapsed());
                debug!(
                    strategy = %strategy.id,
                    state = %strategy.lifecycle_state,
                    trades = strategy.trade_count,
                    "evaluation finished"
                );
                let completion = Completion {
                    strategy_id: strategy.id.clone(),
                    state: strategy.lifecycle_state,
                    weight: strategy.weight,
                    trade_count: strategy.trade_count,
                };
                results
                    .lock()
                    .unwrap()
                    .insert(strategy.id.clone(), strategy);
                let _ = completions.send(completion);
            }
            Err(e) => {
                // The strategy keeps its RUNNING state as a marker that the
                // evaluation never settled.
                stats.task_failed(started.elapsed());
                warn!(strategy = %strategy.id, error = %e, "evaluation failed");
                let completion = Completion {
                    strategy_id: strategy.id.clone(),
                    state: strategy.lifecycle_state,
                    weight: strategy.weight,
                    trade_count: strategy.trade_count,
                };
                results
                    .lock()
                    .unwrap()
                    .insert(strategy.id.clone(), strategy);
                let _ = completions.send(completion);
            }
        }
    }
}

fn reporter_loop(stats: &SchedulerStats, shutdown: &AtomicBool, interval: Duration) {
    let mut last_report = Instant::now();
    while !shutdown.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(50));
        if last_report.elapsed() >= interval {
            let report = stats.report();
            info!(
                completed = report.completed,
                failed = report.failed,
                running = report.running,
                queued = report.queued,
                avg_ms = report.avg_simulation_time.as_millis() as u64,
                cpu_pct = format!("{:.1}", report.cpu_utilization_pct),
                "scheduler activity"
            );
            last_report = Instant::now();
        }
    }
}
