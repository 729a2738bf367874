//! In-process forwarder connecting faces of the same process.
//!
//! It keeps a routing table of registered prefixes and a table of pending Interests. An Interest
//! is forwarded to the longest matching prefix, Data satisfies every pending Interest it matches,
//! and a dedicated thread expires Interests whose lifetime has elapsed.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::Instant;

use super::*;

/// Identifier of the first face, as application faces are numbered by usual forwarders
const FIRST_FACE_ID: u64 = 256;

struct Route {
    id: u64,
    face_id: u64,
    prefix: Name,
    on_interest: InterestCallback,
}

struct PendingInterest {
    interest: Interest,
    deadline: Instant,
    on_outcome: OutcomeCallback,
}

#[derive(Default)]
struct ForwarderState {
    next_route_id: u64,
    next_face_id: u64,
    routes: Vec<Route>,
    pending: Vec<PendingInterest>,
}

impl ForwarderState {
    /// Remove the expired Interests and return them along with the next deadline
    fn take_expired(&mut self, now: Instant) -> (Vec<PendingInterest>, Option<Instant>) {
        let (expired, pending): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|p| p.deadline <= now);
        self.pending = pending;
        let next = self.pending.iter().map(|p| p.deadline).min();
        (expired, next)
    }

    fn longest_match(&mut self, interest: &Interest) -> Option<&mut Route> {
        self.routes
            .iter_mut()
            .filter(|r| r.prefix.is_prefix_of(&interest.name))
            .filter(|r| interest.next_hop_face_id.map_or(true, |id| id == r.face_id))
            .max_by_key(|r| r.prefix.len())
    }

    fn is_duplicate(&self, interest: &Interest) -> bool {
        interest.nonce.is_some()
            && self
                .pending
                .iter()
                .any(|p| p.interest.name == interest.name && p.interest.nonce == interest.nonce)
    }
}

fn lock(state: &Mutex<ForwarderState>) -> MutexGuard<'_, ForwarderState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A forwarder shared by every face created from it. Cloning is cheap.
#[derive(Clone)]
pub struct MemoryForwarder {
    state: Arc<Mutex<ForwarderState>>,
    wake: Sender<()>,
}

impl MemoryForwarder {
    pub fn new() -> std::io::Result<Self> {
        let state = Arc::new(Mutex::new(ForwarderState {
            next_face_id: FIRST_FACE_ID,
            ..Default::default()
        }));
        let (wake, rx_wake) = unbounded();
        let weak = Arc::downgrade(&state);
        thread::Builder::new()
            .name("Forwarder-timer".into())
            .spawn(move || run_timer(weak, rx_wake))?;
        Ok(MemoryForwarder { state, wake })
    }

    /// Create a new face attached to this forwarder
    pub fn face(&self) -> MemoryFace {
        let face_id = {
            let mut s = lock(&self.state);
            s.next_face_id += 1;
            s.next_face_id - 1
        };
        MemoryFace {
            forwarder: self.clone(),
            face_id,
            routes: vec![],
            closed: false,
        }
    }

    /// Number of Interests waiting for Data
    pub fn pending_count(&self) -> usize {
        lock(&self.state).pending.len()
    }
}

fn run_timer(state: Weak<Mutex<ForwarderState>>, wake: Receiver<()>) {
    loop {
        let Some(state) = state.upgrade() else {
            break;
        };
        let (expired, next) = lock(&state).take_expired(Instant::now());
        drop(state);
        for p in expired {
            log::debug!("Interest expired: {}", p.interest.name);
            (p.on_outcome)(InterestOutcome::Timeout);
        }
        let disconnected = match next {
            Some(deadline) => matches!(
                wake.recv_deadline(deadline),
                Err(RecvTimeoutError::Disconnected)
            ),
            None => wake.recv().is_err(),
        };
        if disconnected {
            break;
        }
    }
}

/// A face of a [`MemoryForwarder`]
pub struct MemoryFace {
    forwarder: MemoryForwarder,
    face_id: u64,
    routes: Vec<u64>,
    closed: bool,
}

impl MemoryFace {
    pub fn face_id(&self) -> u64 {
        self.face_id
    }
}

impl Face for MemoryFace {
    fn express_interest(
        &mut self,
        mut interest: Interest,
        on_outcome: OutcomeCallback,
    ) -> Result<(), FaceError> {
        if self.closed {
            return Err(FaceError::Closed);
        }
        let lifetime = interest.lifetime_or_default();
        let mut state = lock(&self.forwarder.state);
        if state.is_duplicate(&interest) {
            drop(state);
            on_outcome(InterestOutcome::Nack(NackReason::Duplicate));
            return Ok(());
        }
        // the hint is consumed by the first hop
        let hint = interest.next_hop_face_id;
        let delivered = match state.longest_match(&interest) {
            Some(route) => {
                interest.next_hop_face_id = None;
                (route.on_interest)(interest.clone());
                true
            }
            None => false,
        };
        if !delivered {
            drop(state);
            log::debug!("No route for {} (next hop {hint:?})", interest.name);
            on_outcome(InterestOutcome::Nack(NackReason::NoRoute));
            return Ok(());
        }
        state.pending.push(PendingInterest {
            interest,
            deadline: Instant::now() + lifetime,
            on_outcome,
        });
        drop(state);
        let _ = self.forwarder.wake.send(());
        Ok(())
    }

    fn register_prefix(
        &mut self,
        prefix: &Name,
        on_interest: InterestCallback,
        _on_failure: RegisterFailedCallback,
    ) -> Result<RegisteredPrefixId, FaceError> {
        if self.closed {
            return Err(FaceError::Closed);
        }
        let mut state = lock(&self.forwarder.state);
        let id = state.next_route_id;
        state.next_route_id += 1;
        state.routes.push(Route {
            id,
            face_id: self.face_id,
            prefix: prefix.clone(),
            on_interest,
        });
        self.routes.push(id);
        log::debug!("Prefix {prefix} registered on face {}", self.face_id);
        Ok(RegisteredPrefixId(id))
    }

    fn unregister_prefix(&mut self, id: RegisteredPrefixId) {
        lock(&self.forwarder.state).routes.retain(|r| r.id != id.0);
        self.routes.retain(|r| *r != id.0);
    }

    fn sign(&mut self, data: &mut Data, signing_info: &SigningInfo) -> Result<(), FaceError> {
        data.signature = Some(signing_info.clone());
        Ok(())
    }

    fn put(&mut self, data: Data) -> Result<(), FaceError> {
        if self.closed {
            return Err(FaceError::Closed);
        }
        let satisfied = {
            let mut state = lock(&self.forwarder.state);
            let (satisfied, pending): (Vec<_>, Vec<_>) = state
                .pending
                .drain(..)
                .partition(|p| p.interest.matches_data(&data));
            state.pending = pending;
            satisfied
        };
        if satisfied.is_empty() {
            log::debug!("Unsolicited Data dropped: {}", data.name);
        }
        for p in satisfied {
            (p.on_outcome)(InterestOutcome::Data(data.clone()));
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        let routes = std::mem::take(&mut self.routes);
        lock(&self.forwarder.state)
            .routes
            .retain(|r| !routes.contains(&r.id));
        self.closed = true;
    }
}

impl Drop for MemoryFace {
    fn drop(&mut self) {
        if !self.closed {
            self.shutdown();
        }
    }
}
