use std::time::Duration;
use tokio::task::JoinHandle;

/// Cancel-and-reschedule timer.
///
/// Scheduling replaces any pending timer; each timer carries a generation
/// and only the newest one counts as current when it fires.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            generation: 0,
            pending: None,
        }
    }

    /// Start a timer that calls `on_fire` with its generation after the window
    pub fn schedule<F>(&mut self, on_fire: F) -> u64
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.cancel();
        let generation = self.generation;
        let window = self.window;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            on_fire(generation);
        }));
        generation
    }

    /// Drop the pending timer, if any
    pub fn cancel(&mut self) {
        self.generation += 1;
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.pending.is_some() && generation == self.generation
    }

    /// Mark the current timer as consumed once its fire has been handled
    pub fn fired(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.pending = None;
        true
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
