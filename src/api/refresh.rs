//! Single-flight coordination of token refreshes.
//!
//! The first request to hit a renewable 401 becomes the leader and performs
//! the refresh. Requests failing while that refresh is outstanding park a
//! continuation in a FIFO queue and are all woken with the same outcome.
//! One coordinator belongs to one `ApiClient`; nothing here is global.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::oneshot;

use super::error::ApiError;

/// Outcome handed to every waiter: the new access token or the refresh error.
pub type RefreshOutcome = Result<String, ApiError>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// Result of `acquire_or_wait`.
pub enum RefreshTicket<'a> {
    /// No refresh was running; the caller must perform it and settle the lease.
    Lead(RefreshLease<'a>),
    /// A refresh is already running; await the receiver for its outcome.
    Wait(oneshot::Receiver<RefreshOutcome>),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Become the refresh leader, or join the queue behind the running one.
    ///
    /// Check-and-set happens under one lock acquisition, so two callers can
    /// never both lead.
    pub fn acquire_or_wait(&self) -> RefreshTicket<'_> {
        let mut state = self.lock();
        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            log::debug!("Refresh in flight, queued request ({} waiting)", state.waiters.len());
            RefreshTicket::Wait(rx)
        } else {
            state.in_flight = true;
            RefreshTicket::Lead(RefreshLease {
                coordinator: self,
                settled: false,
            })
        }
    }

    /// Hand the new access token to every queued request, oldest first,
    /// and clear the in-flight flag.
    pub fn resolve_all(&self, access_token: &str) {
        self.settle(|| Ok(access_token.to_string()));
    }

    /// Fail every queued request with `error`, oldest first, and clear the
    /// in-flight flag.
    pub fn reject_all(&self, error: &ApiError) {
        self.settle(|| Err(error.clone()));
    }

    #[cfg(test)]
    pub fn is_refreshing(&self) -> bool {
        self.lock().in_flight
    }

    pub fn pending(&self) -> usize {
        self.lock().waiters.len()
    }

    fn settle(&self, outcome: impl Fn() -> RefreshOutcome) {
        let waiters = {
            let mut state = self.lock();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        for waiter in waiters {
            // A waiter whose request was dropped simply misses the outcome
            let _ = waiter.send(outcome());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RefreshState> {
        // The state is a flag and a queue; a panic elsewhere cannot leave it torn.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Leadership of the current refresh.
///
/// Must be settled with `resolve` or `reject`. If the leader is dropped
/// first (its future cancelled, a panic), the waiters are rejected and the
/// flag is cleared anyway.
pub struct RefreshLease<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshLease<'_> {
    pub fn resolve(mut self, access_token: &str) {
        self.settled = true;
        self.coordinator.resolve_all(access_token);
    }

    pub fn reject(mut self, error: &ApiError) {
        self.settled = true;
        self.coordinator.reject_all(error);
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.settled {
            log::warn!("Token refresh abandoned before completion");
            self.coordinator
                .reject_all(&ApiError::auth("Token refresh was abandoned"));
        }
    }
}
