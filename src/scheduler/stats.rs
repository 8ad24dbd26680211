//! Scheduler instrumentation.
//!
//! A single mutex guards all counters so every snapshot is internally
//! consistent: completed + failed + running + queued always accounts for
//! every submitted task.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Counters {
    completed: u64,
    failed: u64,
    running: usize,
    queued: usize,
    busy: Duration,
}

/// Point-in-time snapshot of scheduler activity.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerReport {
    pub completed: u64,
    pub failed: u64,
    pub running: usize,
    pub queued: usize,
    pub avg_simulation_time: Duration,
    /// Cumulative simulation time over wall time, in percent. Exceeds 100
    /// when several workers simulate in parallel.
    pub cpu_utilization_pct: f64,
}

#[derive(Debug)]
pub struct SchedulerStats {
    counters: Mutex<Counters>,
    started: Instant,
}

impl SchedulerStats {
    pub fn new() -> Self {
        SchedulerStats {
            counters: Mutex::new(Counters::default()),
            started: Instant::now(),
        }
    }

    pub fn task_queued(&self) {
        self.counters.lock().unwrap().queued += 1;
    }

    /// Undo a `task_queued` for a task the queue refused.
    pub fn task_dropped(&self) {
        let mut c = self.counters.lock().unwrap();
        c.queued = c.queued.saturating_sub(1);
    }

    pub fn task_started(&self) {
        let mut c = self.counters.lock().unwrap();
        c.queued = c.queued.saturating_sub(1);
        c.running += 1;
    }

    pub fn task_completed(&self, elapsed: Duration) {
        let mut c = self.counters.lock().unwrap();
        c.running = c.running.saturating_sub(1);
        c.completed += 1;
        c.busy += elapsed;
    }

    pub fn task_failed(&self, elapsed: Duration) {
        let mut c = self.counters.lock().unwrap();
        c.running = c.running.saturating_sub(1);
        c.failed += 1;
        c.busy += elapsed;
    }

    pub fn report(&self) -> SchedulerReport {
        let c = self.counters.lock().unwrap();
        let finished = c.completed + c.failed;
        let avg_simulation_time = if finished > 0 {
            c.busy / finished as u32
        } else {
            Duration::ZERO
        };

        let wall = self.started.elapsed().as_secs_f64();
        let cpu_utilization_pct = if wall > 0.0 {
            c.busy.as_secs_f64() / wall * 100.0
        } else {
            0.0
        };

        SchedulerReport {
            completed: c.completed,
            failed: c.failed,
            running: c.running,
            queued: c.queued,
            avg_simulation_time,
            cpu_utilization_pct,
        }
    }
}

impl Default for SchedulerStats {
    fn default() -> Self {
        SchedulerStats::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_stats_report_zeroes() {
        let report = SchedulerStats::new().report();
        assert_eq!(report.completed, 0);
        assert_eq!(report.failed, 0);
        assert_eq!(report.running, 0);
        assert_eq!(report.queued, 0);
        assert_eq!(report.avg_simulation_time, Duration::ZERO);
    }

    #[test]
    fn lifecycle_counting() {
        let stats = SchedulerStats::new();
        stats.task_queued();
        stats.task_queued();
        let r = stats.report();
        assert_eq!((r.queued, r.running), (2, 0));

        stats.task_started();
        let r = stats.report();
        assert_eq!((r.queued, r.running), (1, 1));

        stats.task_completed(Duration::from_millis(40));
        let r = stats.report();
        assert_eq!((r.queued, r.running, r.completed), (1, 0, 1));
    }

    #[test]
    fn dropped_task_restores_queued() {
        let stats = SchedulerStats::new();
        stats.task_queued();
        stats.task_dropped();
        assert_eq!(stats.report().queued, 0);
    }

    #[test]
    fn queued_before_started_keeps_ledger_balanced() {
        // The submitter must increment `queued` before the task can be
        // popped; under that order every decrement finds its increment and
        // the ledger drains to zero.
        let stats = SchedulerStats::new();
        for _ in 0..100 {
            stats.task_queued();
            stats.task_started();
            stats.task_completed(Duration::from_millis(1));
        }
        let r = stats.report();
        assert_eq!(r.queued, 0);
        assert_eq!(r.running, 0);
        assert_eq!(r.completed, 100);
    }

    #[test]
    fn failures_count_separately() {
        let stats = SchedulerStats::new();
        stats.task_queued();
        stats.task_started();
        stats.task_failed(Duration::from_millis(10));
        let r = stats.report();
        assert_eq!(r.completed, 0);
        assert_eq!(r.failed, 1);
    }

    #[test]
    fn avg_time_is_mean_over_finished_tasks() {
        let stats = SchedulerStats::new();
        for ms in [10_u64, 20, 30] {
            stats.task_queued();
            stats.task_started();
            stats.task_completed(Duration::from_millis(ms));
        }
        assert_eq!(stats.report().avg_simulation_time, Duration::from_millis(20));
    }

    #[test]
    fn utilization_reflects_parallel_busy_time() {
        let stats = SchedulerStats::new();
        stats.task_queued();
        stats.task_started();
        // Busy time far beyond wall time: several workers simulated at once.
        stats.task_completed(Duration::from_secs(3600));
        let r = stats.report();
        assert!(r.cpu_utilization_pct > 100.0);
    }

    #[test]
    fn completed_and_failed_never_decrease() {
        let stats = SchedulerStats::new();
        let mut last = (0, 0);
        for i in 0..10 {
            stats.task_queued();
            stats.task_started();
            if i % 3 == 0 {
                stats.task_failed(Duration::from_millis(1));
            } else {
                stats.task_completed(Duration::from_millis(1));
            }
            let r = stats.report();
            assert!(r.completed >= last.0 && r.failed >= last.1);
            last = (r.completed, r.failed);
        }
    }
}
