use mrlcomm_codec::{Frame, MAGIC, MAX_DECLARED_SIZE};
use mrlcomm_registry::{lookup, method_name};
use tracing::{debug, trace, warn};

/// Per-link counters for everything the parser drops or recovers from.
///
/// Owned by the parser instance, never shared or global, so a reader thread
/// and an error path can never race on them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserStats {
    /// Frames reassembled successfully.
    pub frames: u64,
    /// Bytes dropped while hunting for the magic byte.
    pub bad_magic: u64,
    /// Size bytes outside the frame budget.
    pub bad_size: u64,
    /// Method ids absent from the registry.
    pub unknown_method: u64,
    /// Reassembled frames whose payload failed schema decode.
    pub decode_failures: u64,
    /// Decoded events dropped because the begin handshake had not been seen.
    pub dropped_unsynchronized: u64,
}

/// What one parsing pass can hand back per input byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseItem {
    /// A complete frame was reassembled.
    Frame(Frame),
    /// A frame start carried a method id the registry does not know.
    UnknownMethod(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    WaitMagic,
    WaitSize,
    Accumulate,
}

/// Stateful byte-stream reassembler.
///
/// Consumes input one byte at a time, so chunked delivery is identical to
/// single-byte delivery. Every error resets to `WaitMagic` and resumes at
/// the next byte; no input byte is ever examined more than twice, which
/// makes forward progress structural rather than hoped-for.
#[derive(Debug)]
pub struct Parser {
    state: State,
    /// Method byte plus accumulated field bytes of the current frame.
    buf: Vec<u8>,
    /// Size byte of the current frame once seen.
    declared: usize,
    /// True once the device's begin event has been decoded.
    synchronized: bool,
    stats: ParserStats,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            state: State::WaitMagic,
            buf: Vec::with_capacity(MAX_DECLARED_SIZE),
            declared: 0,
            synchronized: false,
            stats: ParserStats::default(),
        }
    }

    /// Consume a chunk of input, pushing completed frames and unknown-method
    /// notices onto `out` in wire order.
    pub fn feed(&mut self, bytes: &[u8], out: &mut Vec<ParseItem>) {
        for &byte in bytes {
            if let Some(item) = self.push(byte) {
                out.push(item);
            }
        }
    }

    fn push(&mut self, byte: u8) -> Option<ParseItem> {
        match self.state {
            State::WaitMagic => {
                if byte == MAGIC {
                    self.state = State::WaitSize;
                } else {
                    self.stats.bad_magic += 1;
                    trace!(byte, "dropping byte while hunting for magic");
                }
                None
            }
            State::WaitSize => {
                let declared = byte as usize;
                if declared == 0 || declared > MAX_DECLARED_SIZE {
                    self.stats.bad_size += 1;
                    warn!(declared, max = MAX_DECLARED_SIZE, "declared size outside frame budget");
                    self.reset_frame();
                } else {
                    self.declared = declared;
                    self.buf.clear();
                    self.state = State::Accumulate;
                }
                None
            }
            State::Accumulate => {
                if self.buf.is_empty() && lookup(byte).is_none() {
                    self.stats.unknown_method += 1;
                    warn!(method = byte, "unknown method id, resyncing");
                    self.reset_frame();
                    // The offending byte gets exactly one second look: a real
                    // frame start may have been misread as a method byte.
                    if byte == MAGIC {
                        self.state = State::WaitSize;
                    }
                    return Some(ParseItem::UnknownMethod(byte));
                }

                self.buf.push(byte);
                if self.buf.len() < self.declared {
                    return None;
                }

                let frame = Frame::new(self.buf[0], self.buf[1..].to_vec());
                self.stats.frames += 1;
                debug!(
                    method = frame.method,
                    name = method_name(frame.method),
                    size = self.declared,
                    "frame complete"
                );
                self.reset_frame();
                Some(ParseItem::Frame(frame))
            }
        }
    }

    fn reset_frame(&mut self) {
        self.state = State::WaitMagic;
        self.buf.clear();
        self.declared = 0;
    }

    /// Reset everything, including the handshake gate. Called on transport
    /// connect/disconnect.
    pub fn reset(&mut self) {
        self.reset_frame();
        self.synchronized = false;
    }

    /// True once the device's begin event has been observed on this
    /// connection.
    pub fn synchronized(&self) -> bool {
        self.synchronized
    }

    pub fn mark_synchronized(&mut self) {
        self.synchronized = true;
    }

    pub fn note_decode_failure(&mut self) {
        self.stats.decode_failures += 1;
    }

    pub fn note_dropped_unsynchronized(&mut self) {
        self.stats.dropped_unsynchronized += 1;
    }

    pub fn stats(&self) -> ParserStats {
        self.stats
    }
}
