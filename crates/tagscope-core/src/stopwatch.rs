//! Single-use elapsed-time capture.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Receives the start instant of a stopped [`Stopwatch`].
///
/// The recorder owns the clock: it computes `now - start` itself, so a
/// backend can substitute a manual clock in tests.
pub trait StopwatchRecorder: Send + Sync {
    fn record_stopwatch(&self, start: Instant);
}

/// Start instant bound to the timer or histogram that handed it out.
///
/// Each call to [`Stopwatch::stop`] reports independently; stopping the same
/// stopwatch twice records two samples.
#[derive(Clone)]
pub struct Stopwatch {
    start: Instant,
    recorder: Arc<dyn StopwatchRecorder>,
}

impl Stopwatch {
    pub fn new(start: Instant, recorder: Arc<dyn StopwatchRecorder>) -> Self {
        Self { start, recorder }
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    /// Report the time elapsed since `start` to the recorder.
    pub fn stop(&self) {
        self.recorder.record_stopwatch(self.start);
    }
}

impl fmt::Debug for Stopwatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stopwatch").field("start", &self.start).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Captured(Mutex<Vec<Instant>>);

    impl StopwatchRecorder for Captured {
        fn record_stopwatch(&self, start: Instant) {
            self.0.lock().unwrap().push(start);
        }
    }

    #[test]
    fn stop_forwards_start_not_elapsed() {
        let rec = Arc::new(Captured::default());
        let start = Instant::now()
            .checked_sub(Duration::from_secs(3))
            .unwrap_or_else(Instant::now);
        let sw = Stopwatch::new(start, rec.clone());
        sw.stop();
        assert_eq!(*rec.0.lock().unwrap(), vec![start]);
    }

    #[test]
    fn double_stop_reports_twice() {
        let rec = Arc::new(Captured::default());
        let sw = Stopwatch::new(Instant::now(), rec.clone());
        sw.stop();
        sw.stop();
        assert_eq!(rec.0.lock().unwrap().len(), 2);
    }
}
