//! Non-blocking per-resource locks.
//!
//! A subtask either acquires every lock it needs immediately or acquires
//! nothing. There is no waiting and no queueing, so two in-flight subtasks
//! can never deadlock on each other. The cost is that a conflicting subtask
//! is skipped outright; that trade-off is deliberate.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// LockConflict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LockConflict {
    pub resource: String,
    pub held_by: Uuid,
}

impl fmt::Display for LockConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource locked: {}", self.resource)
    }
}

// ---------------------------------------------------------------------------
// ResourceLocks
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Holder {
    owner: Uuid,
    #[allow(dead_code)]
    acquired_at: DateTime<Utc>,
}

type LockMap = Arc<Mutex<HashMap<String, Holder>>>;

/// The coordinator handing out all-or-nothing, non-blocking lock sets.
#[derive(Clone, Default)]
pub struct ResourceLocks {
    inner: LockMap,
}

impl ResourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire every resource for `owner`, or fail on the first conflict
    /// without taking anything. Returns an RAII guard that releases the
    /// whole set on drop.
    pub fn try_acquire(
        &self,
        owner: Uuid,
        resources: &[String],
    ) -> std::result::Result<LockSet, LockConflict> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        for resource in resources {
            if let Some(holder) = map.get(resource) {
                return Err(LockConflict {
                    resource: resource.clone(),
                    held_by: holder.owner,
                });
            }
        }

        let acquired_at = Utc::now();
        for resource in resources {
            map.insert(
                resource.clone(),
                Holder {
                    owner,
                    acquired_at,
                },
            );
        }

        Ok(LockSet {
            inner: Arc::clone(&self.inner),
            owner,
            resources: resources.to_vec(),
        })
    }

    pub fn is_locked(&self, resource: &str) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(resource)
    }

    pub fn held_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

// ---------------------------------------------------------------------------
// LockSet
// ---------------------------------------------------------------------------

/// The locks one subtask holds. Dropping the set releases them, so release
/// happens on every exit path: success, failure, or timeout.
#[derive(Debug)]
pub struct LockSet {
    inner: LockMap,
    owner: Uuid,
    resources: Vec<String>,
}

impl LockSet {
    pub fn resources(&self) -> &[String] {
        &self.resources
    }
}

impl Drop for LockSet {
    fn drop(&mut self) {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        for resource in &self.resources {
            if map.get(resource).is_some_and(|h| h.owner == self.owner) {
                map.remove(resource);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
