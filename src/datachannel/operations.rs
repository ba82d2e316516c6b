//! [`PeerConnection`] operations over the data channel subsystem (spec
//! §4.5, §6.4 "Application operations").

use log::warn;

use crate::collaborators::ReliabilityParameter;
use crate::error::{DataChannelError, Result};
use crate::event::PeerConnectionEvent;
use crate::ids::DataChannelId;
use crate::peer_connection::PeerConnection;
use crate::transport::DtlsRole;

use super::channel::{DataChannelInit, Reliability};
use super::dcep::{self, DcepOpen};
use super::manager::IdParity;
use super::{decode_inbound, ppid_for_send};

fn to_sctp_reliability(reliability: Reliability) -> ReliabilityParameter {
    match reliability {
        Reliability::Reliable => ReliabilityParameter::Reliable,
        Reliability::MaxRetransmits(n) => ReliabilityParameter::MaxRetransmits(n),
        Reliability::MaxPacketLifetime(n) => ReliabilityParameter::MaxPacketLifetime(n),
    }
}

fn to_dcep_reliability(reliability: Reliability) -> dcep::Reliability {
    match reliability {
        Reliability::Reliable => dcep::Reliability::Reliable,
        Reliability::MaxRetransmits(n) => dcep::Reliability::PartialReliableRexmit(n.into()),
        Reliability::MaxPacketLifetime(n) => dcep::Reliability::PartialReliableTimed(n.into()),
    }
}

impl PeerConnection {
    fn data_channel_parity(&self) -> Option<IdParity> {
        let session = self.application_session_id()?;
        let role = self.transports.get(session)?.dtls_role?;
        Some(IdParity::for_dtls_client(role == DtlsRole::Client))
    }

    fn sctp_max_channels(&self) -> u16 {
        self.sctp
            .max_channels()
            .unwrap_or(crate::ids::MAX_DATA_CHANNEL_ID + 1)
    }

    /// Sends the DCEP OPEN frame for a channel whose id is already assigned
    /// (spec §4.5.2).
    fn send_open(&mut self, id: DataChannelId) -> Result<(), DataChannelError> {
        let channel = self
            .data_channels
            .get(id)
            .expect("channel must exist to send its own OPEN");
        let open = DcepOpen {
            unordered: !channel.ordered,
            reliability: to_dcep_reliability(channel.reliability),
            priority: channel.priority,
            label: channel.label.clone(),
            protocol: channel.protocol.clone(),
        };
        self.sctp.send(
            id.0,
            dcep::PPID_CONTROL,
            true,
            ReliabilityParameter::Reliable,
            &open.encode(),
        )
    }

    /// The SCTP association has finished handshaking. The embedder calls
    /// this from its own collaborator callback; it is not derivable from
    /// SDP state alone (spec §4.5.1 "allocate on association establish or
    /// on remote SDP apply").
    pub fn notify_sctp_established(&mut self) {
        self.allocate_pending_data_channels();
    }

    /// Reassigns ids to every channel created before the SCTP association's
    /// client/server role was known, and sends their OPEN frames.
    pub(crate) fn allocate_pending_data_channels(&mut self) {
        let parity = match self.data_channel_parity() {
            Some(parity) => parity,
            None => return,
        };
        let max_channels = self.sctp_max_channels();
        match self.data_channels.allocate_pending(parity, max_channels) {
            Ok(assigned) => {
                for id in assigned {
                    if let Err(err) = self.send_open(id) {
                        warn!("failed to send DCEP OPEN for {}: {}", id, err);
                        if let Some(channel) = self.data_channels.get_mut(id) {
                            channel.fail(err.into_parts().0);
                        }
                    }
                }
            }
            Err(err) => {
                warn!("pending data channel id allocation failed: {}", err);
            }
        }
    }

    /// Application-initiated channel creation (spec §4.5.1 "Create").
    pub fn create_data_channel(
        &mut self,
        init: DataChannelInit,
    ) -> Result<DataChannelId, DataChannelError> {
        init.validate().map_err(|e| tracerr::new!(e))?;

        let (id, allocated) = if let Some(raw_id) = init.id {
            let id = DataChannelId(raw_id);
            self.data_channels
                .insert_with_id(id, &init)
                .map_err(|e| tracerr::new!(e))?;
            (id, true)
        } else if self.sctp.is_established() {
            match self.data_channel_parity() {
                Some(parity) => {
                    let max_channels = self.sctp_max_channels();
                    let id = self
                        .data_channels
                        .allocate_id(parity, max_channels)
                        .map_err(|e| tracerr::new!(e))?;
                    self.data_channels
                        .insert_with_id(id, &init)
                        .map_err(|e| tracerr::new!(e))?;
                    (id, true)
                }
                None => (self.data_channels.insert_pending(&init), false),
            }
        } else {
            (self.data_channels.insert_pending(&init), false)
        };

        self.emit(PeerConnectionEvent::PrepareDataChannel {
            channel_id: id,
            is_local: true,
        });

        if allocated {
            if init.negotiated {
                // Both sides already agree on id/label/protocol out of
                // band, so there is no DCEP handshake to run.
                if let Some(channel) = self.data_channels.get_mut(id) {
                    channel.mark_open();
                }
            } else if let Err(err) = self.send_open(id) {
                let (raw, _trace) = err.into_parts();
                if let Some(channel) = self.data_channels.get_mut(id) {
                    channel.fail(raw.clone());
                }
                return Err(tracerr::new!(raw));
            }
        }

        Ok(id)
    }

    fn finish_send(&mut self, id: DataChannelId, len: usize, outcome: std::result::Result<(), DataChannelError>) {
        match outcome {
            Ok(()) => self.notify_bytes_sent(id, len),
            Err(err) => {
                if let Some(channel) = self.data_channels.get_mut(id) {
                    channel.drain_bytes(len);
                    channel.fail(err);
                }
            }
        }
    }

    /// Collaborator-driven notification that `len` previously-enqueued
    /// bytes on `id` have actually been handed off by the SCTP layer (spec
    /// §4.5.5's buffered-amount decrement). Completes a pending graceful
    /// close once the buffer this unblocks reaches zero (spec §4.5.1
    /// "Close").
    pub fn notify_bytes_sent(&mut self, id: DataChannelId, len: usize) {
        let channel = match self.data_channels.get_mut(id) {
            Some(channel) => channel,
            None => return,
        };
        channel.drain_bytes(len);
        if channel.ready_state == super::ReadyState::Closing && channel.buffered_amount == 0 {
            self.sctp.reset_stream(id.0);
        }
    }

    /// Sends a UTF-8 string message (spec §4.5.5).
    pub fn send_string(&mut self, id: DataChannelId, text: &str) -> Result<(), DataChannelError> {
        self.send_bytes(id, text.as_bytes(), true)
    }

    /// Sends a binary message (spec §4.5.5).
    pub fn send_data(&mut self, id: DataChannelId, data: &[u8]) -> Result<(), DataChannelError> {
        self.send_bytes(id, data, false)
    }

    fn send_bytes(
        &mut self,
        id: DataChannelId,
        buf: &[u8],
        is_string: bool,
    ) -> Result<(), DataChannelError> {
        let max_message_size = self.sctp.max_message_size();
        let channel = self
            .data_channels
            .get(id)
            .ok_or_else(|| tracerr::new!(DataChannelError::InvalidReadyState(format!("no such channel: {}", id))))?;

        if channel.ready_state != super::ReadyState::Open {
            return Err(tracerr::new!(DataChannelError::InvalidReadyState(format!(
                "channel {} is not open",
                id
            ))));
        }
        if buf.len() > max_message_size {
            return Err(tracerr::new!(DataChannelError::TypeError(format!(
                "message of {} bytes exceeds max-message-size {}",
                buf.len(),
                max_message_size
            ))));
        }

        let ppid = ppid_for_send(is_string, buf.is_empty());
        let ordered = channel.ordered;
        let reliability = to_sctp_reliability(channel.reliability);

        let channel = self.data_channels.get_mut(id).expect("checked above");
        channel.enqueue_bytes(buf.len());

        let outcome = self
            .sctp
            .send(id.0, ppid, ordered, reliability, buf)
            .map_err(|e| e.into_parts().0);
        self.finish_send(id, buf.len(), outcome);
        Ok(())
    }

    /// Application-initiated close (spec §4.5.1 "Close").
    pub fn close_data_channel(&mut self, id: DataChannelId) -> Result<(), DataChannelError> {
        let channel = self
            .data_channels
            .get_mut(id)
            .ok_or_else(|| tracerr::new!(DataChannelError::InvalidReadyState(format!("no such channel: {}", id))))?;
        if channel.ready_state == super::ReadyState::Closing
            || channel.ready_state == super::ReadyState::Closed
        {
            return Ok(());
        }
        channel.begin_close();
        if channel.buffered_amount == 0 {
            self.sctp.reset_stream(id.0);
        }
        Ok(())
    }

    /// The SCTP stream for `id` was reset, by either side (spec §4.5.1
    /// "Close": completes whichever side initiated it).
    pub fn handle_stream_reset(&mut self, id: DataChannelId) {
        if let Some(channel) = self.data_channels.get_mut(id) {
            channel.mark_closed();
        }
    }

    /// The remote peer reset its outbound stream before the local side
    /// asked to close (spec §4.5.1 "Close", "If the remote resets first").
    pub fn handle_remote_reset(&mut self, id: DataChannelId) {
        let channel = match self.data_channels.get_mut(id) {
            Some(channel) => channel,
            None => return,
        };
        channel.mark_peer_closed();
        if channel.buffered_amount == 0 {
            self.sctp.reset_stream(id.0);
            channel.mark_closed();
        }
    }

    /// Dispatches one inbound SCTP message to its owning (or newly-created)
    /// channel (spec §4.5.6).
    pub fn handle_inbound_sctp_message(&mut self, stream_id: u16, ppid: u32, buf: &[u8]) {
        let id = DataChannelId(stream_id);

        if ppid == dcep::PPID_CONTROL {
            self.handle_control_message(id, buf);
            return;
        }

        match decode_inbound(ppid, buf) {
            Ok(message) => {
                if let Some(channel) = self.data_channels.get_mut(id) {
                    channel.receive_message(message);
                } else {
                    warn!("message for unknown data channel {}", id);
                }
            }
            Err(err) => {
                warn!("dropping unparseable message on {}: {}", id, err);
                if let Some(channel) = self.data_channels.get_mut(id) {
                    channel.fail(err);
                }
            }
        }
    }

    fn handle_control_message(&mut self, id: DataChannelId, buf: &[u8]) {
        if dcep::is_ack(buf) {
            if let Some(channel) = self.data_channels.get_mut(id) {
                if !channel.opened {
                    channel.mark_open();
                }
            }
            return;
        }

        let open = match DcepOpen::decode(buf) {
            Ok(open) => open,
            Err(err) => {
                warn!("malformed DCEP OPEN on {}: {}", id, err);
                if let Some(channel) = self.data_channels.get_mut(id) {
                    channel.fail(err);
                }
                return;
            }
        };

        let is_new = self.data_channels.get(id).is_none();
        if is_new {
            let channel = self.data_channels.insert_inbound(id);
            channel.apply_remote_open(&open);
            self.emit(PeerConnectionEvent::PrepareDataChannel {
                channel_id: id,
                is_local: false,
            });
            self.emit(PeerConnectionEvent::DataChannel { channel_id: id });
        } else {
            let channel = match self.data_channels.get_mut(id) {
                Some(channel) => channel,
                None => return,
            };
            if channel.negotiated {
                channel.fail(DataChannelError::Protocol(
                    "negotiated channel received a DCEP OPEN".into(),
                ));
                return;
            }
            if channel.opened {
                // Idempotent (spec §4.5.1 "DCEP OPEN received while already open").
                return;
            }
            channel.apply_remote_open(&open);
        }

        if let Err(err) = self.sctp.send(
            id.0,
            dcep::PPID_CONTROL,
            true,
            ReliabilityParameter::Reliable,
            &dcep::encode_ack(),
        ) {
            if let Some(channel) = self.data_channels.get_mut(id) {
                channel.fail(err.into_parts().0);
            }
            return;
        }

        if let Some(channel) = self.data_channels.get_mut(id) {
            channel.mark_open();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_sctp_reliability_maps_every_variant() {
        assert_eq!(
            to_sctp_reliability(Reliability::Reliable),
            ReliabilityParameter::Reliable
        );
        assert_eq!(
            to_sctp_reliability(Reliability::MaxRetransmits(3)),
            ReliabilityParameter::MaxRetransmits(3)
        );
        assert_eq!(
            to_sctp_reliability(Reliability::MaxPacketLifetime(500)),
            ReliabilityParameter::MaxPacketLifetime(500)
        );
    }

    #[test]
    fn to_dcep_reliability_maps_every_variant() {
        assert!(matches!(
            to_dcep_reliability(Reliability::Reliable),
            dcep::Reliability::Reliable
        ));
        assert!(matches!(
            to_dcep_reliability(Reliability::MaxRetransmits(3)),
            dcep::Reliability::PartialReliableRexmit(3)
        ));
    }
}
