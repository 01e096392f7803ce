//! Progress reporting port.
//!
//! Long-running operations (catalog refresh, inventory build, organize) call
//! a [`ProgressReporter`] synchronously from whichever task is doing the
//! work. Reporters must therefore never block: log it, drop it into a
//! channel with `try_send`, or ignore it.
//!
//! Within one operation the step count never decreases and the final report
//! has `current == total`. [`Steps`] enforces both for callers.

use serde::Serialize;
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;

/// A single `(current, total, message)` progress event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current: u64,
    pub total: u64,
    pub message: String,
}

impl Progress {
    pub fn new(current: u64, total: u64, message: impl Into<String>) -> Self {
        Self {
            current,
            total,
            message: message.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.total
    }
}

/// Sink for progress events. See the [module documentation](self).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, progress: Progress);
}

impl<F> ProgressReporter for F
where
    F: Fn(Progress) + Send + Sync,
{
    fn report(&self, progress: Progress) {
        self(progress)
    }
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl ProgressReporter for Silent {
    fn report(&self, _progress: Progress) {}
}

/// Emits every event as an `info` log line.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, progress: Progress) {
        tracing::info!(current = progress.current, total = progress.total, "{}", progress.message);
    }
}

/// Forwards events into a bounded channel, dropping them when it is full.
///
/// Progress is advisory; a slow consumer loses intermediate events rather
/// than stalling the operation that emits them.
#[derive(Clone, Debug)]
pub struct ChannelReporter {
    sender: Sender<Progress>,
}

impl ChannelReporter {
    pub fn new(sender: Sender<Progress>) -> Self {
        Self { sender }
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, progress: Progress) {
        match self.sender.try_send(progress) {
            Ok(()) | Err(TrySendError::Closed(_)) => {},
            Err(TrySendError::Full(dropped)) => {
                tracing::trace!(current = dropped.current, total = dropped.total, "Progress channel full; event dropped");
            },
        }
    }
}

/// Step counter for a single operation.
///
/// Clamps every report to `total` so a miscounted operation can't overshoot,
/// and [`finish`](Self::finish) always lands on `current == total`.
pub struct Steps<'a> {
    reporter: &'a dyn ProgressReporter,
    current: u64,
    total: u64,
}

impl<'a> Steps<'a> {
    pub fn new(reporter: &'a dyn ProgressReporter, total: u64) -> Self {
        Self { reporter, current: 0, total }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Add `steps` more steps to the total, for work only discovered part
    /// way through. Nothing is reported.
    pub fn grow(&mut self, steps: u64) {
        self.total += steps;
    }

    /// Advance by one step and report it.
    pub fn advance(&mut self, message: impl Into<String>) {
        self.current = (self.current + 1).min(self.total);
        self.reporter.report(Progress::new(self.current, self.total, message));
    }

    /// Jump straight to the final step and report it.
    pub fn finish(mut self, message: impl Into<String>) {
        self.current = self.total;
        self.reporter.report(Progress::new(self.current, self.total, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_steps_are_monotonic_and_finish_on_total() {
        let seen = Mutex::new(Vec::new());
        let reporter = |p: Progress| seen.lock().unwrap().push(p);
        let mut steps = Steps::new(&reporter, 3);
        steps.advance("one");
        steps.advance("two");
        steps.advance("three");
        steps.advance("overshoot");
        steps.finish("done");
        let seen = seen.into_inner().unwrap();
        let currents: Vec<_> = seen.iter().map(|p| p.current).collect();
        assert_eq!(currents, vec![1, 2, 3, 3, 3]);
        assert!(seen.last().unwrap().is_complete());
    }

    #[test]
    fn test_grown_total_keeps_count() {
        let seen = Mutex::new(Vec::new());
        let reporter = |p: Progress| seen.lock().unwrap().push((p.current, p.total));
        let mut steps = Steps::new(&reporter, 2);
        steps.advance("listed");
        steps.grow(2);
        steps.advance("first");
        steps.finish("done");
        assert_eq!(seen.into_inner().unwrap(), vec![(1, 2), (2, 4), (4, 4)]);
    }

    #[tokio::test]
    async fn test_channel_reporter_drops_when_full() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(1);
        let reporter = ChannelReporter::new(tx);
        reporter.report(Progress::new(1, 2, "kept"));
        reporter.report(Progress::new(2, 2, "dropped"));
        assert_eq!(rx.recv().await.unwrap().message, "kept");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_reporter_ignores_closed_channel() {
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        drop(rx);
        ChannelReporter::new(tx).report(Progress::new(1, 1, "nobody listening"));
    }
}
