//! ICE coordinator (spec §4.3).

use std::collections::HashMap;

use futures::channel::oneshot;

use crate::error::{PeerConnectionError, Result};
use crate::ids::SessionId;

/// A candidate string either normalised from the bare `candidate:...` form
/// or already carrying the SDP `a=` prefix; the core always strips the
/// prefix before storing it and re-adds it on serialisation (spec §4.3
/// "Candidate format").
#[must_use]
pub fn normalize_candidate(raw: &str) -> String {
    raw.strip_prefix("a=").unwrap_or(raw).to_string()
}

/// One entry of the pending-remote-candidates queue (spec §3
/// `IceCandidateItem`).
pub struct PendingRemoteCandidate {
    pub mline_index: usize,
    /// `None` signals end-of-candidates for that mline.
    pub candidate: Option<String>,
    pub reply: Option<oneshot::Sender<Result<()>>>,
}

/// A candidate the ICE agent produced locally, queued for coalesced
/// delivery to the application (spec §4.3 "pending-local-candidates").
#[derive(Clone, Debug)]
pub struct PendingLocalCandidate {
    pub mline_index: usize,
    pub candidate: Option<String>,
}

/// Whether this endpoint is the ICE controller or the controlled party
/// (spec §4.3 "ICE controller role").
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IceRole {
    Controlling,
    Controlled,
}

/// session-id → ICE stream mapping plus the candidate queues described in
/// spec §4.3. The concrete ICE agent/stream implementation is an external
/// collaborator (spec §4, out of scope); this only tracks what the
/// negotiation engine needs to drain and replay.
#[derive(Default)]
pub struct IceCoordinator {
    sessions: HashMap<SessionId, ()>,
    pending_remote: Vec<PendingRemoteCandidate>,
    pending_local: Vec<PendingLocalCandidate>,
    role: Option<IceRole>,
}

impl IceCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_or_create(&mut self, session_id: SessionId) {
        self.sessions.entry(session_id).or_insert(());
    }

    /// Queues a remote candidate for a session that does not yet have both
    /// descriptions applied (spec §4.3).
    pub fn queue_remote_candidate(
        &mut self,
        mline_index: usize,
        candidate: Option<String>,
        reply: Option<oneshot::Sender<Result<()>>>,
    ) {
        self.pending_remote.push(PendingRemoteCandidate {
            mline_index,
            candidate,
            reply,
        });
    }

    /// Drains the pending-remote-candidates queue, returning each entry so
    /// the caller can hand it to the ICE agent collaborator and reply to
    /// its promise (spec §4.1.3 step 6).
    pub fn drain_pending_remote(&mut self) -> Vec<PendingRemoteCandidate> {
        std::mem::take(&mut self.pending_remote)
    }

    /// Validates `mline_index` against the number of media sections in the
    /// current description; returns the `unknown-mline` error the spec
    /// requires for a candidate naming an mline that does not exist.
    pub fn validate_mline(mline_index: usize, media_section_count: usize) -> Result<()> {
        if mline_index >= media_section_count {
            return Err(tracerr::new!(PeerConnectionError::UnknownMLineIndex(
                mline_index
            )));
        }
        Ok(())
    }

    pub fn push_local_candidate(&mut self, mline_index: usize, candidate: Option<String>) {
        self.pending_local.push(PendingLocalCandidate {
            mline_index,
            candidate,
        });
    }

    /// Drains the pending-local-candidates queue for coalesced delivery to
    /// the application (spec §4.3).
    pub fn drain_pending_local(&mut self) -> Vec<PendingLocalCandidate> {
        std::mem::take(&mut self.pending_local)
    }

    #[must_use]
    pub fn role(&self) -> Option<IceRole> {
        self.role
    }

    /// Establishes the ICE controller role, once, per spec §4.1.3 step 7 /
    /// §4.3 "ICE controller role": the side that sent the initial offer, or
    /// any side whose remote description carries `a=ice-lite`. Once set to
    /// `Controlling` it is never reset.
    pub fn establish_role(&mut self, sent_initial_offer: bool, remote_is_ice_lite: bool) {
        if self.role == Some(IceRole::Controlling) {
            return;
        }
        if sent_initial_offer || remote_is_ice_lite {
            self.role = Some(IceRole::Controlling);
        } else if self.role.is_none() {
            self.role = Some(IceRole::Controlled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_both_candidate_forms() {
        assert_eq!(normalize_candidate("a=candidate:1 1 udp"), "candidate:1 1 udp");
        assert_eq!(normalize_candidate("candidate:1 1 udp"), "candidate:1 1 udp");
    }

    #[test]
    fn controller_role_is_sticky() {
        let mut ice = IceCoordinator::new();
        ice.establish_role(false, false);
        assert_eq!(ice.role(), Some(IceRole::Controlled));
        ice.establish_role(true, false);
        // Once controlled is set by our initial decision, it stays - but
        // here `establish_role` is only ever called once per side in
        // practice; directly exercise the "controlling sticks" case too.
        let mut ice2 = IceCoordinator::new();
        ice2.establish_role(true, false);
        assert_eq!(ice2.role(), Some(IceRole::Controlling));
        ice2.establish_role(false, false);
        assert_eq!(ice2.role(), Some(IceRole::Controlling));
    }
}
