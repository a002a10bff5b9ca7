//! Static method registry and typed message model for MrlComm v64.
//!
//! The registry is the shared contract between host and firmware: one entry
//! per method id, carrying the symbolic name, direction (host→device command
//! or device→host event), and the ordered field schema. Both ends must hold
//! an identical table; the firmware surfaces its table version through
//! `getBoardInfo`/`publishBoardInfo`.
//!
//! Decoded frames become [`Command`]/[`Event`] values, so dispatch is an
//! exhaustive `match` instead of a name lookup that can fail at runtime.

pub mod error;
pub mod message;
pub mod method;

pub use error::{DecodeError, Result};
pub use message::{BoardInfo, Command, Event};
pub use method::{
    ids, lookup, lookup_by_name, method_name, methods, render_frame, Direction, MethodDescriptor,
    MRLCOMM_VERSION,
};
