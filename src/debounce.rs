use chrono::{DateTime, Duration, Utc};

/// Classic trailing-edge debounce over injected time.
///
/// Every [`input`] re-arms the deadline; [`poll`] yields the staged value
/// only once the input has been stable for the whole window. Driving it with
/// an explicit clock keeps the engine free of timer tasks and makes burst
/// scenarios deterministic to test.
///
/// [`input`]: Debouncer::input
/// [`poll`]: Debouncer::poll
#[derive(Clone, Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, DateTime<Utc>)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn input(&mut self, value: T, now: DateTime<Utc>) {
        self.pending = Some((value, now + self.delay));
    }

    pub fn poll(&mut self, now: DateTime<Utc>) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if now >= *deadline => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
