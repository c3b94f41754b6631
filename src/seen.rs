//! # Dedup Store
//!
//! Tracks which job identifiers have already been printed and which have
//! already been acknowledged, so that a job the server keeps listing as
//! pending is printed once and acknowledged once.
//!
//! ## Bounded, insertion-ordered sets
//!
//! Each set keeps at most [`MAX_SEEN`] identifiers. When a new identifier
//! pushes it over the limit, the oldest entries are evicted first. Order is
//! kept in a `VecDeque` alongside a `HashSet` for O(1) membership.
//!
//! ## Serialized access
//!
//! All state sits behind one mutex. Callers that want to print a job go
//! through [`SeenStore::try_reserve`], which checks "not printed, not in
//! flight" and claims the identifier in one step, so two overlapping cycles
//! can never both decide the same job is new.
//!
//! ## Persistence
//!
//! Both sets are written together, as comma-delimited lists, on every
//! mutation. There is no batching.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::RelayError;
use crate::job::JobId;
use crate::prefs::Preferences;
use crate::settings::{KEY_SEEN_ACKED, KEY_SEEN_PRINTED};

/// Maximum identifiers retained per set.
pub const MAX_SEEN: usize = 200;

const DELIMITER: &str = ",";

/// Insertion-ordered set with a size cap; the oldest entries go first.
#[derive(Debug, Clone)]
pub struct BoundedIdSet {
    order: VecDeque<JobId>,
    members: HashSet<JobId>,
    capacity: usize,
}

impl BoundedIdSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            members: HashSet::new(),
            capacity,
        }
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.members.contains(id)
    }

    /// Insert and evict down to capacity. Returns `false` if already present.
    ///
    /// Re-inserting an existing identifier does not refresh its position.
    pub fn insert(&mut self, id: JobId) -> bool {
        if !self.members.insert(id.clone()) {
            return false;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.members.remove(&evicted);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Parse a delimited list, oldest first. Blank entries are dropped.
    pub fn parse(list: &str, capacity: usize) -> Self {
        let mut set = Self::new(capacity);
        for id in list.split(DELIMITER).filter_map(JobId::new) {
            set.insert(id);
        }
        set
    }

    /// Serialize as a delimited list, oldest first.
    pub fn to_list(&self) -> String {
        self.order
            .iter()
            .map(JobId::as_str)
            .collect::<Vec<_>>()
            .join(DELIMITER)
    }
}

#[derive(Debug)]
struct SeenState {
    printed: BoundedIdSet,
    acknowledged: BoundedIdSet,
    /// Identifiers currently being printed by some cycle.
    in_flight: HashSet<JobId>,
}

/// Shared dedup store. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SeenStore {
    state: Arc<Mutex<SeenState>>,
    prefs: Arc<Preferences>,
}

impl SeenStore {
    /// Load both sets from the preferences.
    pub fn load(prefs: Arc<Preferences>) -> Self {
        let read = |key: &str| {
            prefs
                .get_string(key)
                .map(|list| BoundedIdSet::parse(&list, MAX_SEEN))
                .unwrap_or_else(|| BoundedIdSet::new(MAX_SEEN))
        };
        let state = SeenState {
            printed: read(KEY_SEEN_PRINTED),
            acknowledged: read(KEY_SEEN_ACKED),
            in_flight: HashSet::new(),
        };
        tracing::debug!(
            printed = state.printed.len(),
            acknowledged = state.acknowledged.len(),
            "loaded seen state"
        );
        Self {
            state: Arc::new(Mutex::new(state)),
            prefs,
        }
    }

    pub fn is_printed(&self, id: &JobId) -> bool {
        self.state.lock().printed.contains(id)
    }

    pub fn is_acknowledged(&self, id: &JobId) -> bool {
        self.state.lock().acknowledged.contains(id)
    }

    /// Claim an identifier for printing.
    ///
    /// Returns `true` only if the job is neither printed nor already claimed
    /// by another caller. A successful claim must be followed by
    /// [`mark_printed`](Self::mark_printed) or [`release`](Self::release).
    pub fn try_reserve(&self, id: &JobId) -> bool {
        let mut state = self.state.lock();
        if state.printed.contains(id) || state.in_flight.contains(id) {
            return false;
        }
        state.in_flight.insert(id.clone());
        true
    }

    /// Give up a claim without marking the job printed.
    pub fn release(&self, id: &JobId) {
        self.state.lock().in_flight.remove(id);
    }

    /// Record a job as printed (also clears any claim) and persist.
    pub fn mark_printed(&self, id: &JobId) -> Result<(), RelayError> {
        let mut state = self.state.lock();
        state.in_flight.remove(id);
        state.printed.insert(id.clone());
        self.persist(&state)
    }

    /// Record a job as acknowledged and persist.
    pub fn mark_acknowledged(&self, id: &JobId) -> Result<(), RelayError> {
        let mut state = self.state.lock();
        state.acknowledged.insert(id.clone());
        self.persist(&state)
    }

    pub fn printed_len(&self) -> usize {
        self.state.lock().printed.len()
    }

    pub fn acknowledged_len(&self) -> usize {
        self.state.lock().acknowledged.len()
    }

    fn persist(&self, state: &SeenState) -> Result<(), RelayError> {
        self.prefs.put_all([
            (KEY_SEEN_PRINTED, Value::from(state.printed.to_list())),
            (KEY_SEEN_ACKED, Value::from(state.acknowledged.to_list())),
        ])
    }
}

// ============================================================================
// TESTS
// ============================================================================
