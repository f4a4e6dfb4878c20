//! Single-flight coordination for token refresh.
//!
//! The first caller to see a 401 becomes the leader and performs the refresh;
//! everyone arriving while it is in flight gets a one-shot receiver and waits.
//! The leader holds a [`RefreshLease`]; dropping the lease (on any exit path,
//! including a cancelled future) clears the in-flight flag and settles every
//! waiter exactly once.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

use crate::ExpiryReason;

pub(crate) type RefreshOutcome = Result<String, ExpiryReason>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    RefreshInFlight,
}

#[derive(Debug, Default)]
pub(crate) struct RefreshGate {
    inner: Mutex<GateInner>,
}

#[derive(Debug, Default)]
struct GateInner {
    in_flight: bool,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

pub(crate) enum Ticket<'a> {
    Leader(RefreshLease<'a>),
    Waiter(oneshot::Receiver<RefreshOutcome>),
}

impl RefreshGate {
    fn lock(&self) -> MutexGuard<'_, GateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check-and-set in one critical section; never held across an await.
    pub(crate) fn enter(&self) -> Ticket<'_> {
        let mut inner = self.lock();
        if inner.in_flight {
            let (sender, receiver) = oneshot::channel();
            inner.waiters.push_back(sender);
            Ticket::Waiter(receiver)
        } else {
            inner.in_flight = true;
            Ticket::Leader(RefreshLease {
                gate: self,
                outcome: None,
            })
        }
    }

    pub(crate) fn state(&self) -> RefreshState {
        if self.lock().in_flight {
            RefreshState::RefreshInFlight
        } else {
            RefreshState::Idle
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.lock().waiters.len()
    }
}

pub(crate) struct RefreshLease<'a> {
    gate: &'a RefreshGate,
    outcome: Option<RefreshOutcome>,
}

impl RefreshLease<'_> {
    /// Record the outcome; waiters are released when the lease drops.
    pub(crate) fn settle(mut self, outcome: RefreshOutcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        let outcome = self
            .outcome
            .take()
            .unwrap_or(Err(ExpiryReason::RefreshAbandoned));

        let waiters = {
            let mut inner = self.gate.lock();
            inner.in_flight = false;
            std::mem::take(&mut inner.waiters)
        };

        let count = waiters.len();
        for waiter in waiters {
            // A waiter that went away no longer needs an answer
            let _ = waiter.send(outcome.clone());
        }
        tracing::debug!(waiters = count, refreshed = outcome.is_ok(), "Refresh settled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leader(gate: &RefreshGate) -> RefreshLease<'_> {
        match gate.enter() {
            Ticket::Leader(lease) => lease,
            Ticket::Waiter(_) => panic!("expected to lead the refresh"),
        }
    }

    fn waiter(gate: &RefreshGate) -> oneshot::Receiver<RefreshOutcome> {
        match gate.enter() {
            Ticket::Waiter(receiver) => receiver,
            Ticket::Leader(_) => panic!("expected to wait on the refresh"),
        }
    }

    #[test]
    fn test_first_caller_leads_rest_wait() {
        let gate = RefreshGate::default();
        assert_eq!(gate.state(), RefreshState::Idle);

        let lease = leader(&gate);
        let _first = waiter(&gate);
        let _second = waiter(&gate);

        assert_eq!(gate.state(), RefreshState::RefreshInFlight);
        assert_eq!(gate.pending(), 2);
        drop(lease);
    }

    #[tokio::test]
    async fn test_settle_resolves_every_waiter_and_resets() {
        let gate = RefreshGate::default();
        let lease = leader(&gate);
        let receivers: Vec<_> = (0..3).map(|_| waiter(&gate)).collect();

        lease.settle(Ok("T1".to_string()));

        assert_eq!(gate.state(), RefreshState::Idle);
        assert_eq!(gate.pending(), 0);
        for receiver in receivers {
            assert_eq!(receiver.await.unwrap(), Ok("T1".to_string()));
        }
    }

    #[tokio::test]
    async fn test_failure_is_shared_with_waiters() {
        let gate = RefreshGate::default();
        let lease = leader(&gate);
        let receiver = waiter(&gate);

        lease.settle(Err(ExpiryReason::MissingToken));

        assert_eq!(receiver.await.unwrap(), Err(ExpiryReason::MissingToken));
    }

    #[tokio::test]
    async fn test_dropped_lease_abandons_waiters() {
        let gate = RefreshGate::default();
        let lease = leader(&gate);
        let receiver = waiter(&gate);

        drop(lease);

        assert_eq!(
            receiver.await.unwrap(),
            Err(ExpiryReason::RefreshAbandoned)
        );
        assert_eq!(gate.state(), RefreshState::Idle);
    }

    #[test]
    fn test_gate_is_reusable_after_settling() {
        let gate = RefreshGate::default();
        leader(&gate).settle(Err(ExpiryReason::RetryExhausted));

        // A new 401 after a failed refresh starts a fresh attempt
        let lease = leader(&gate);
        assert_eq!(gate.state(), RefreshState::RefreshInFlight);
        lease.settle(Ok("T2".to_string()));
        assert_eq!(gate.state(), RefreshState::Idle);
    }

    #[test]
    fn test_waiters_are_queued_in_arrival_order() {
        let gate = RefreshGate::default();
        let lease = leader(&gate);
        let mut first = waiter(&gate);
        drop(waiter(&gate));
        let mut third = waiter(&gate);

        let closed: Vec<bool> = gate
            .lock()
            .waiters
            .iter()
            .map(|sender| sender.is_closed())
            .collect();
        assert_eq!(closed, vec![false, true, false]);

        lease.settle(Ok("T1".to_string()));

        assert_eq!(first.try_recv().unwrap(), Ok("T1".to_string()));
        assert_eq!(third.try_recv().unwrap(), Ok("T1".to_string()));
    }

    #[test]
    fn test_waiter_that_left_does_not_block_others() {
        let gate = RefreshGate::default();
        let lease = leader(&gate);
        drop(waiter(&gate));
        let mut kept = waiter(&gate);

        lease.settle(Ok("T1".to_string()));

        assert_eq!(kept.try_recv().unwrap(), Ok("T1".to_string()));
    }
}
