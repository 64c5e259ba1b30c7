//! One-shot, cancellable deferred task for pre-emptive token refresh.
//!
//! # Semantics
//!
//! - At most one task is pending per timer: [`RefreshTimer::arm`] aborts
//!   the previous one before spawning the next.
//! - When the delay elapses, the task is handed to its own `tokio::spawn`
//!   and the timer itself finishes. A task that re-arms the timer it was
//!   started from (a refresh scheduling the next refresh) therefore never
//!   aborts itself.
//! - [`RefreshTimer::cancel`] only stops a task that has not fired yet. A
//!   refresh already in flight runs to completion.
//! - Dropping the timer cancels it.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub struct RefreshTimer {
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `task` after `delay`, replacing whatever was scheduled before.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.lock();
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(task);
        }));
    }

    /// Drops the pending task, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        match self.lock().take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }

    /// `true` while a task is waiting for its delay to elapse.
    pub fn is_armed(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = pending.take() {
            handle.abort();
        }
    }
}
