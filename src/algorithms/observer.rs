use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::routines::estimation::step::StepResult;
use crate::structs::grid::StepStatus;

/// Progress of one time step, handed to a [StepObserver] once the step is done or skipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub index: usize,
    pub nobs: usize,
    pub status: StepStatus,
    pub elapsed: Duration,
}

impl From<&StepResult> for StepReport {
    fn from(result: &StepResult) -> Self {
        StepReport {
            index: result.index,
            nobs: result.nobs,
            status: result.status,
            elapsed: result.elapsed,
        }
    }
}

/// Receives step reports from the worker threads, in completion order.
pub trait StepObserver: Sync {
    fn step_completed(&self, report: &StepReport);
}

impl<F> StepObserver for F
where
    F: Fn(&StepReport) + Sync,
{
    fn step_completed(&self, report: &StepReport) {
        self(report)
    }
}

/// Discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl StepObserver for Silent {
    fn step_completed(&self, _report: &StepReport) {}
}

/// Logs each step through `tracing`, with a running count of completed steps.
#[derive(Debug)]
pub struct TracingObserver {
    total: usize,
    done: AtomicUsize,
}

impl TracingObserver {
    pub fn new(total: usize) -> Self {
        TracingObserver {
            total,
            done: AtomicUsize::new(0),
        }
    }
}

impl StepObserver for TracingObserver {
    fn step_completed(&self, report: &StepReport) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        match report.status {
            StepStatus::Solved => tracing::debug!(
                "[{}/{}] Processing time-step {}: nobs = {} ({:.2?})",
                done,
                self.total,
                report.index,
                report.nobs,
                report.elapsed
            ),
            StepStatus::NoObservations => tracing::debug!(
                "[{}/{}] Time-step {} has no observation in its window",
                done,
                self.total,
                report.index
            ),
            StepStatus::Singular => tracing::warn!(
                "[{}/{}] Time-step {} is singular with nobs = {}",
                done,
                self.total,
                report.index,
                report.nobs
            ),
            StepStatus::Pending => tracing::warn!(
                "[{}/{}] Time-step {} skipped, deadline reached",
                done,
                self.total,
                report.index
            ),
        }
    }
}

/// Forwards reports over an unbounded channel, for consumers on another thread.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: UnboundedSender<StepReport>,
}

impl ChannelObserver {
    pub fn new(tx: UnboundedSender<StepReport>) -> Self {
        ChannelObserver { tx }
    }
}

impl StepObserver for ChannelObserver {
    fn step_completed(&self, report: &StepReport) {
        if self.tx.send(*report).is_err() {
            tracing::trace!("Step report {} dropped, receiver closed", report.index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn report(index: usize) -> StepReport {
        StepReport {
            index,
            nobs: 3,
            status: StepStatus::Solved,
            elapsed: Duration::from_millis(1),
        }
    }

    #[test]
    fn channel_observer_forwards_reports() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let observer = ChannelObserver::new(tx);
        observer.step_completed(&report(4));
        assert_eq!(rx.try_recv().unwrap().index, 4);
    }

    #[test]
    fn channel_observer_survives_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        ChannelObserver::new(tx).step_completed(&report(0));
    }

    #[test]
    fn closures_are_observers() {
        let seen = AtomicUsize::new(0);
        let observer = |r: &StepReport| {
            seen.fetch_add(r.nobs, Ordering::Relaxed);
        };
        observer.step_completed(&report(0));
        observer.step_completed(&report(1));
        assert_eq!(seen.load(Ordering::Relaxed), 6);
    }
}
