//! Transport boundary for the MrlComm protocol engine.
//!
//! The engine never opens a serial device itself. It consumes a byte sink
//! (any [`std::io::Write`]) for outbound frames, and inbound bytes are fed
//! to it in arbitrary chunks by whatever owns the device. This crate holds
//! the error type for that boundary and an in-memory [`loopback`] duplex
//! pair so the engine can be exercised without hardware.

pub mod duplex;
pub mod error;

pub use duplex::{loopback, ChunkReader, ChunkWriter, Duplex};
pub use error::{Result, TransportError};
