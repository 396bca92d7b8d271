//! Progress reporting for dataset loads.
//!
//! A load walks through the [`LoadPhase`]s in order. Core crates report
//! through [`ProgressCallback`] and never draw anything themselves; the
//! binary decides whether that becomes a progress bar or nothing.

use std::sync::Arc;

use strum_macros::{AsRefStr, Display};

/// Stage of a dataset load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum LoadPhase {
    /// Reading and decoding feed lines.
    Parsing,
    /// Deduplicating cell sectors and assigning colors.
    Placing,
    /// Computing summary statistics.
    Aggregating,
}

/// Receives progress updates from a running load.
pub trait ProgressCallback: Send + Sync {
    /// A new phase starts. `total` is the number of units it will report,
    /// when known.
    fn start_phase(&self, phase: LoadPhase, total: Option<u64>);

    /// `delta` more units of the current phase are done.
    fn advance(&self, delta: u64);

    /// The load is complete.
    fn finish(&self, summary: String);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn start_phase(&self, _phase: LoadPhase, _total: Option<u64>) {}
    fn advance(&self, _delta: u64) {}
    fn finish(&self, _summary: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ProgressCallback for Recorder {
        fn start_phase(&self, phase: LoadPhase, total: Option<u64>) {
            self.events.lock().unwrap().push(format!("{phase}:{total:?}"));
        }

        fn advance(&self, delta: u64) {
            self.events.lock().unwrap().push(format!("+{delta}"));
        }

        fn finish(&self, summary: String) {
            self.events.lock().unwrap().push(summary);
        }
    }

    #[test]
    fn phases_render_lowercase() {
        let recorder = Recorder::default();
        recorder.start_phase(LoadPhase::Parsing, Some(3));
        recorder.advance(2);
        recorder.start_phase(LoadPhase::Aggregating, None);
        recorder.finish("done".to_string());
        assert_eq!(
            *recorder.events.lock().unwrap(),
            ["parsing:Some(3)", "+2", "aggregating:None", "done"]
        );
    }
}
