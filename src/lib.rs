//! A WebRTC PeerConnection negotiation engine with a DataChannel subsystem
//! layered over SCTP: JSEP offer/answer processing, ICE/DTLS/signaling
//! state aggregation, and DCEP-framed data channel messaging.
//!
//! The concrete ICE agent, DTLS handshake engine, SRTP elements and SCTP
//! association are not implemented here; they are external collaborators
//! the embedder supplies through the traits in [`collaborators`].

pub mod collaborators;
pub mod config;
pub mod datachannel;
pub mod error;
pub mod event;
pub mod ice;
pub mod ids;
mod negotiation;
pub mod payload;
pub mod peer_connection;
pub mod sdp;
pub mod state;
pub mod task;
pub mod transceiver;
pub mod transport;

pub use collaborators::{DtlsTransport, IceAgent, MediaPipeline, NullMediaPipeline, SctpTransport};
pub use config::RtcConfiguration;
pub use datachannel::{DataChannel, DataChannelEvent, DataChannelInit, ReadyState, Reliability as DataChannelReliability};
pub use error::{DataChannelError, PeerConnectionError, Result, SdpError, TaskError};
pub use event::{PeerConnectionEvent, PeerConnectionEventHandler};
pub use negotiation::DescriptionSource;
pub use peer_connection::PeerConnection;
pub use task::TaskQueue;
