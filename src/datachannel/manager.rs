//! Data channel registry and SCTP-stream-id allocation (spec §4.5.4).

use std::collections::HashMap;

use crate::error::DataChannelError;
use crate::ids::{DataChannelId, MAX_DATA_CHANNEL_ID};

use super::channel::{DataChannel, DataChannelInit};

/// Whether the local endpoint is the DTLS client or server, which fixes
/// the parity of ids it is allowed to allocate (spec §4.5.4, spec §3
/// invariant).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IdParity {
    Even,
    Odd,
}

impl IdParity {
    #[must_use]
    pub fn for_dtls_client(is_client: bool) -> Self {
        if is_client {
            Self::Even
        } else {
            Self::Odd
        }
    }

    fn matches(self, id: u16) -> bool {
        match self {
            Self::Even => id % 2 == 0,
            Self::Odd => id % 2 == 1,
        }
    }
}

/// Owns every [`DataChannel`] of a
/// [`PeerConnection`](crate::peer_connection::PeerConnection), keyed by
/// SCTP stream id (spec §3 "DataChannel" invariant: "An id is unique among
/// live data channels").
#[derive(Debug, Default)]
pub struct DataChannelManager {
    channels: HashMap<DataChannelId, DataChannel>,
    /// Channels awaiting id allocation (created with `id = -1` before the
    /// SCTP association was established).
    pending_allocation: Vec<DataChannelId>,
    next_synthetic_id: u16,
}

impl DataChannelManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next free id of the required parity, starting from 0,
    /// skipping ids of the wrong parity and ids already in use, up to
    /// `max_channels` (spec §4.5.4).
    pub fn allocate_id(
        &self,
        parity: IdParity,
        max_channels: u16,
    ) -> Result<DataChannelId, DataChannelError> {
        let limit = max_channels.min(MAX_DATA_CHANNEL_ID + 1);
        let mut id = if parity == IdParity::Odd { 1 } else { 0 };
        while id < limit {
            if parity.matches(id) && !self.channels.contains_key(&DataChannelId(id)) {
                return Ok(DataChannelId(id));
            }
            id = id.saturating_add(2);
        }
        Err(DataChannelError::IdAllocationFailed(
            "no free id of the required parity".into(),
        ))
    }

    /// Inserts a channel constructed from `init`, failing if `init.id` is
    /// `Some` and already live (spec §4.5.1 "Create": "Reject creation if
    /// id collides with an existing live channel").
    pub fn insert_with_id(
        &mut self,
        id: DataChannelId,
        init: &DataChannelInit,
    ) -> Result<&mut DataChannel, DataChannelError> {
        if self.channels.contains_key(&id) {
            return Err(DataChannelError::IdAllocationFailed(format!(
                "id {} already in use",
                id.0
            )));
        }
        self.channels.insert(id, DataChannel::new(id, init));
        Ok(self.channels.get_mut(&id).expect("just inserted"))
    }

    /// Registers a channel that has no id yet (spec §4.5.1: "if id is -1
    /// and SCTP association is established, allocate one immediately;
    /// otherwise allocate on association establish or on remote SDP
    /// apply"). Uses a synthetic placeholder id internally until a real
    /// SCTP stream id is allocated via [`Self::allocate_pending`].
    pub fn insert_pending(&mut self, init: &DataChannelInit) -> DataChannelId {
        let placeholder = DataChannelId(u16::MAX - self.next_synthetic_id);
        self.next_synthetic_id += 1;
        self.channels
            .insert(placeholder, DataChannel::new(placeholder, init));
        self.pending_allocation.push(placeholder);
        placeholder
    }

    /// Assigns real SCTP stream ids to every channel awaiting allocation,
    /// called once the SCTP association establishes or once the DTLS
    /// client/server role (and therefore parity) is known.
    pub fn allocate_pending(
        &mut self,
        parity: IdParity,
        max_channels: u16,
    ) -> Result<Vec<DataChannelId>, DataChannelError> {
        let mut reassigned = Vec::new();
        for placeholder in std::mem::take(&mut self.pending_allocation) {
            let new_id = self.allocate_id(parity, max_channels)?;
            let mut channel = self
                .channels
                .remove(&placeholder)
                .expect("pending id must exist");
            channel.id = new_id;
            self.channels.insert(new_id, channel);
            reassigned.push(new_id);
        }
        Ok(reassigned)
    }

    /// Inserts a fresh inbound channel for a stream id the SCTP layer
    /// surfaced with no matching local channel (spec §4.5.1 "Receive").
    pub fn insert_inbound(&mut self, id: DataChannelId) -> &mut DataChannel {
        self.channels
            .entry(id)
            .or_insert_with(|| DataChannel::new_inbound(id))
    }

    #[must_use]
    pub fn get(&self, id: DataChannelId) -> Option<&DataChannel> {
        self.channels.get(&id)
    }

    pub fn get_mut(&mut self, id: DataChannelId) -> Option<&mut DataChannel> {
        self.channels.get_mut(&id)
    }

    pub fn remove(&mut self, id: DataChannelId) -> Option<DataChannel> {
        self.channels.remove(&id)
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &DataChannel> {
        self.channels.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DataChannel> {
        self.channels.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_lowest_free_id_of_the_right_parity() {
        let mgr = DataChannelManager::new();
        assert_eq!(mgr.allocate_id(IdParity::Even, 65_534).unwrap(), DataChannelId(0));
        assert_eq!(mgr.allocate_id(IdParity::Odd, 65_534).unwrap(), DataChannelId(1));
    }

    #[test]
    fn skips_ids_already_in_use() {
        let mut mgr = DataChannelManager::new();
        mgr.insert_with_id(DataChannelId(0), &DataChannelInit::default())
            .unwrap();
        assert_eq!(mgr.allocate_id(IdParity::Even, 65_534).unwrap(), DataChannelId(2));
    }

    #[test]
    fn fails_cleanly_when_id_space_is_exhausted() {
        let mgr = DataChannelManager::new();
        assert!(mgr.allocate_id(IdParity::Even, 0).is_err());
    }
}
