//! Pending-request table bridging HTTP callers and asynchronously delivered
//! compute results.
//!
//! Every registered request owns a slot holding its status, the eventual
//! outcome, and a `watch` channel. Waiters subscribe to their own slot's
//! channel, so a resolution only wakes the callers interested in that id. The
//! table itself sits behind one mutex that is never held across an `.await`.

use super::events::ComputeOutcome;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Time-ordered correlation token shared between a published request and its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Pending,
    Resolved,
    TimedOut,
}

/// What happened to a delivered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStatus {
    Delivered,
    /// The slot already holds a result.
    Duplicate,
    /// Every waiter gave up before the result arrived.
    Late,
    /// No slot exists for the id (never registered or already consumed).
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorrelationError {
    #[error("no compute result for request {id} within {timeout:?}")]
    TimedOut { id: RequestId, timeout: Duration },
    #[error("request {0} is not pending")]
    UnknownRequest(RequestId),
}

#[derive(Debug)]
struct PendingSlot {
    status: SlotStatus,
    result: Option<Arc<ComputeOutcome>>,
    waiters: usize,
    registered_at: Instant,
    notifier: watch::Sender<SlotStatus>,
}

#[derive(Debug, Default)]
pub struct RequestCorrelator {
    slots: Mutex<HashMap<RequestId, PendingSlot>>,
}

impl RequestCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<RequestId, PendingSlot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self) -> RequestId {
        let id = RequestId::generate();
        let (notifier, _) = watch::channel(SlotStatus::Pending);
        self.slots().insert(
            id,
            PendingSlot {
                status: SlotStatus::Pending,
                result: None,
                waiters: 0,
                registered_at: Instant::now(),
                notifier,
            },
        );
        debug!(%id, "registered pending request");
        id
    }

    /// Drops a slot outright, e.g. when the request could not be published.
    pub fn forget(&self, id: RequestId) -> bool {
        self.slots().remove(&id).is_some()
    }

    pub fn status(&self, id: RequestId) -> Option<SlotStatus> {
        self.slots().get(&id).map(|slot| slot.status)
    }

    pub fn pending_len(&self) -> usize {
        self.slots().len()
    }

    /// Waits for the result of `id`, returning the shared outcome once
    /// resolved. The last waiter to leave a resolved slot removes it; the last
    /// waiter to time out marks the slot `TimedOut` so late results are absorbed.
    pub async fn wait(
        &self,
        id: RequestId,
        timeout: Duration,
    ) -> Result<Arc<ComputeOutcome>, CorrelationError> {
        let mut receiver = {
            let mut slots = self.slots();
            let slot = slots
                .get_mut(&id)
                .ok_or(CorrelationError::UnknownRequest(id))?;
            if slot.status == SlotStatus::TimedOut {
                return Err(CorrelationError::TimedOut { id, timeout });
            }
            slot.waiters += 1;
            slot.notifier.subscribe()
        };

        // Releases the waiter even when this future is dropped mid-wait.
        let guard = WaiterGuard {
            correlator: self,
            id,
            armed: true,
        };

        // `wait_for` re-checks the slot status on every wake-up.
        let _ = tokio::time::timeout(
            timeout,
            receiver.wait_for(|status| *status == SlotStatus::Resolved),
        )
        .await;

        guard
            .release()
            .ok_or(CorrelationError::TimedOut { id, timeout })
    }

    fn release(&self, id: RequestId) -> Option<Arc<ComputeOutcome>> {
        let mut slots = self.slots();
        let slot = slots.get_mut(&id)?;
        slot.waiters = slot.waiters.saturating_sub(1);
        let result = slot.result.clone();

        if slot.waiters == 0 {
            match slot.status {
                SlotStatus::Resolved => {
                    slots.remove(&id);
                }
                SlotStatus::Pending => {
                    slot.status = SlotStatus::TimedOut;
                    slot.notifier.send_replace(SlotStatus::TimedOut);
                    warn!(%id, "every waiter left before the compute result arrived");
                }
                SlotStatus::TimedOut => {}
            }
        }

        result
    }

    /// Stores the outcome for a pending request and wakes its waiters. Any
    /// other state leaves the table untouched.
    pub fn resolve(&self, id: RequestId, outcome: ComputeOutcome) -> ResolveStatus {
        let mut slots = self.slots();
        let Some(slot) = slots.get_mut(&id) else {
            debug!(%id, "ignoring result for unknown request");
            return ResolveStatus::Unknown;
        };

        match slot.status {
            SlotStatus::Pending => {
                slot.result = Some(Arc::new(outcome));
                slot.status = SlotStatus::Resolved;
                slot.notifier.send_replace(SlotStatus::Resolved);
                debug!(%id, waiters = slot.waiters, "resolved pending request");
                ResolveStatus::Delivered
            }
            SlotStatus::Resolved => {
                debug!(%id, "ignoring duplicate result");
                ResolveStatus::Duplicate
            }
            SlotStatus::TimedOut => {
                info!(%id, "discarding result that arrived after timeout");
                ResolveStatus::Late
            }
        }
    }

    /// Removes idle slots registered more than `max_age` ago. Returns the number removed.
    pub fn sweep_expired(&self, max_age: Duration) -> usize {
        let mut slots = self.slots();
        let before = slots.len();
        slots.retain(|_, slot| slot.waiters > 0 || slot.registered_at.elapsed() < max_age);
        before - slots.len()
    }
}

/// Registered waiter on one slot. Dropping it without calling `release`
/// counts as abandoning the wait.
struct WaiterGuard<'a> {
    correlator: &'a RequestCorrelator,
    id: RequestId,
    armed: bool,
}

impl WaiterGuard<'_> {
    fn release(mut self) -> Option<Arc<ComputeOutcome>> {
        self.armed = false;
        self.correlator.release(self.id)
    }
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!(id = %self.id, "waiter abandoned pending request");
            self.correlator.release(self.id);
        }
    }
}

/// Periodically sweeps slots nobody is waiting for anymore.
pub fn spawn_sweeper(
    correlator: Arc<RequestCorrelator>,
    interval: Duration,
    max_age: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let removed = correlator.sweep_expired(max_age);
            if removed > 0 {
                info!(removed, "swept expired correlation slots");
            }
        }
    })
}
