use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::BytesMut;
use mrlcomm_codec::{Frame, MAX_FRAME_SIZE};
use mrlcomm_registry::{method_name, render_frame, Command, Event};
use tracing::{debug, info, warn};

use crate::ack::{AckController, AckWait, DEFAULT_ACK_TIMEOUT};
use crate::error::{LinkError, Result};
use crate::handler::{dispatch, MrlHandler, WireTap};
use crate::parser::{ParseItem, Parser, ParserStats};

/// Tunables for one link instance.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Bound on each acknowledgement wait.
    pub ack_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            ack_timeout: DEFAULT_ACK_TIMEOUT,
        }
    }
}

/// The protocol engine for one serial link.
///
/// The reader path ([`feed`]) and writer path ([`send`]) may run on
/// different threads; parser state and the byte sink each sit behind their
/// own lock. Handlers and the wire tap are always invoked outside the
/// parser lock, in the order frames completed, so slow user code cannot
/// stall reassembly.
///
/// [`feed`]: Link::feed
/// [`send`]: Link::send
pub struct Link<W> {
    writer: Mutex<W>,
    parser: Mutex<Parser>,
    ack: AckController,
    handler: Arc<dyn MrlHandler>,
    tap: Option<Arc<dyn WireTap>>,
}

enum Inbound {
    Event { event: Event, frame: Frame },
    Unknown(u8),
}

impl<W: Write> Link<W> {
    pub fn new(writer: W, handler: Arc<dyn MrlHandler>) -> Self {
        Self::with_config(writer, handler, LinkConfig::default())
    }

    pub fn with_config(writer: W, handler: Arc<dyn MrlHandler>, config: LinkConfig) -> Self {
        Self {
            writer: Mutex::new(writer),
            parser: Mutex::new(Parser::new()),
            ack: AckController::new(config.ack_timeout),
            handler,
            tap: None,
        }
    }

    /// Attach a raw traffic sink.
    pub fn with_wiretap(mut self, tap: Arc<dyn WireTap>) -> Self {
        self.tap = Some(tap);
        self
    }

    fn lock_parser(&self) -> MutexGuard<'_, Parser> {
        self.parser.lock().expect("parser lock poisoned")
    }

    /// Encode a command, transmit it, and (when acks are enabled) wait for
    /// the device's acknowledgement.
    ///
    /// An ack timeout is non-fatal: the handler's `on_ack_timeout` fires and
    /// the call returns `Ok`. Only encode failures, sink failures, and
    /// cancellation are errors.
    pub fn send(&self, command: &Command) -> Result<()> {
        let mut wire = BytesMut::with_capacity(MAX_FRAME_SIZE);
        command.encode(&mut wire)?;
        let method = command.method();

        if !self.ack.begin_send(method) {
            return Err(LinkError::Cancelled);
        }

        let written = {
            let mut writer = self.writer.lock().expect("writer lock poisoned");
            writer.write_all(&wire).and_then(|()| writer.flush())
        };
        if let Err(err) = written {
            self.ack.abort_send();
            return Err(err.into());
        }
        debug!(method, name = method_name(method), "command sent");

        if let Some(tap) = &self.tap {
            let frame = Frame::new(method, wire[3..].to_vec());
            tap.on_tx(&wire, &render_frame(&frame));
        }

        match self.ack.wait(method) {
            AckWait::TimedOut => {
                warn!(method, name = method_name(method), "no acknowledgement from device");
                self.handler.on_ack_timeout(method);
            }
            AckWait::Cancelled => return Err(LinkError::Cancelled),
            AckWait::Disabled | AckWait::Acked => {}
        }

        // The local controller follows the device-side toggle once the
        // command is on the wire.
        if let Command::EnableAck { enabled } = command {
            self.ack.set_enabled(*enabled);
        }
        Ok(())
    }

    /// Consume a chunk of inbound bytes, dispatching every completed event.
    ///
    /// Never fails: framing and decode problems are recovered locally and
    /// counted in [`stats`](Link::stats). Until the device's begin event has
    /// been seen, all other events are dropped with a warning.
    pub fn feed(&self, bytes: &[u8]) {
        let mut items = Vec::new();
        let ready = {
            let mut parser = self.lock_parser();
            parser.feed(bytes, &mut items);

            let mut ready = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    ParseItem::UnknownMethod(method) => ready.push(Inbound::Unknown(method)),
                    ParseItem::Frame(frame) => match Event::decode(&frame) {
                        Ok(event) => {
                            if event.is_begin() {
                                parser.mark_synchronized();
                                info!("begin event observed, link synchronized");
                                ready.push(Inbound::Event { event, frame });
                            } else if !parser.synchronized() {
                                parser.note_dropped_unsynchronized();
                                warn!(
                                    method = frame.method,
                                    name = method_name(frame.method),
                                    "event before begin handshake, dropping"
                                );
                            } else {
                                ready.push(Inbound::Event { event, frame });
                            }
                        }
                        Err(err) => {
                            parser.note_decode_failure();
                            warn!(method = frame.method, %err, "frame decode failed, dropping");
                        }
                    },
                }
            }
            ready
        };

        // User code runs outside the parser lock, in completion order.
        for inbound in ready {
            match inbound {
                Inbound::Unknown(method) => self.handler.on_unknown(method),
                Inbound::Event { event, frame } => {
                    if let Some(tap) = &self.tap {
                        if let Ok(wire) = frame.to_wire() {
                            tap.on_rx(&wire, &render_frame(&frame));
                        }
                    }
                    if let Event::Ack { method } = event {
                        self.ack.acknowledge(method);
                    }
                    dispatch(self.handler.as_ref(), &event);
                }
            }
        }
    }

    /// The transport (re)connected: forget partial frames, the handshake
    /// gate, and any in-flight acknowledgement.
    pub fn on_connect(&self) {
        self.lock_parser().reset();
        self.ack.reset();
        debug!("link reset for new connection");
    }

    /// The transport dropped: clear parser state and unblock any sender
    /// waiting on an acknowledgement.
    pub fn on_disconnect(&self) {
        self.lock_parser().reset();
        self.ack.cancel();
        debug!("link disconnected");
    }

    /// True once the device's begin event has been seen on this connection.
    pub fn is_synchronized(&self) -> bool {
        self.lock_parser().synchronized()
    }

    /// Turn the acknowledgement protocol on or off locally, without telling
    /// the device. Sending [`Command::EnableAck`] does both.
    pub fn set_ack_enabled(&self, enabled: bool) {
        self.ack.set_enabled(enabled);
    }

    pub fn is_ack_enabled(&self) -> bool {
        self.ack.is_enabled()
    }

    /// Snapshot of the parser's recovery counters.
    pub fn stats(&self) -> ParserStats {
        self.lock_parser().stats()
    }

    /// Consume the link and return the byte sink.
    pub fn into_inner(self) -> W {
        self.writer.into_inner().expect("writer lock poisoned")
    }
}
