//! MrlComm protocol engine.
//!
//! Raw bytes from the transport flow through [`Parser`] into reassembled
//! frames, decode into typed events, and dispatch to an [`MrlHandler`].
//! Outbound [`Command`](mrlcomm_registry::Command)s are encoded and written
//! through the link's byte sink, optionally gated by the
//! [`AckController`]'s one-outstanding-message protocol. [`Link`] ties the
//! pieces together behind one lock per direction.
//!
//! Nothing here talks to a serial device: the owner of the device feeds
//! inbound chunks to [`Link::feed`] and hands the link any
//! [`std::io::Write`] for outbound frames.

pub mod ack;
pub mod error;
pub mod handler;
pub mod link;
pub mod parser;
pub mod virtual_device;

pub use ack::{AckController, AckWait, DEFAULT_ACK_TIMEOUT};
pub use error::{LinkError, Result};
pub use handler::{dispatch, MrlHandler, WireTap};
pub use link::{Link, LinkConfig};
pub use parser::{ParseItem, Parser, ParserStats};
pub use virtual_device::VirtualDevice;
