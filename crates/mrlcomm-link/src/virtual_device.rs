use std::io::{ErrorKind, Read, Write};

use bytes::BytesMut;
use mrlcomm_codec::Result as CodecResult;
use mrlcomm_registry::{BoardInfo, Command, Event, MRLCOMM_VERSION};
use tracing::{debug, warn};

/// Firmware stand-in speaking the device side of the protocol.
///
/// Enough behavior to exercise a host end to end without hardware: emits
/// the begin handshake, answers `getBoardInfo` and `echo`, honors
/// `enableAck` by acknowledging every processed command. Everything else is
/// accepted and ignored, like firmware with no device attached.
pub struct VirtualDevice {
    parser: crate::parser::Parser,
    ack_enabled: bool,
    board_type: u8,
}

impl Default for VirtualDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualDevice {
    pub fn new() -> Self {
        Self {
            parser: crate::parser::Parser::new(),
            ack_enabled: false,
            board_type: 1,
        }
    }

    /// The startup handshake the firmware emits once its loop is running.
    pub fn begin(&self, dst: &mut BytesMut) -> CodecResult<()> {
        Event::MrlCommBegin {
            version: MRLCOMM_VERSION,
        }
        .encode(dst)
    }

    /// Consume host bytes, appending any response frames to `dst`.
    pub fn feed(&mut self, bytes: &[u8], dst: &mut BytesMut) {
        let mut items = Vec::new();
        self.parser.feed(bytes, &mut items);
        for item in items {
            let crate::parser::ParseItem::Frame(frame) = item else {
                continue;
            };
            match Command::decode(&frame) {
                Ok(command) => {
                    if let Err(err) = self.process(command, dst) {
                        warn!(%err, "response encode failed");
                    }
                }
                Err(err) => warn!(method = frame.method, %err, "dropping undecodable command"),
            }
        }
    }

    fn process(&mut self, command: Command, dst: &mut BytesMut) -> CodecResult<()> {
        let method = command.method();
        debug!(method, "virtual device processing command");
        match command {
            Command::GetBoardInfo => {
                Event::BoardInfo(BoardInfo {
                    version: MRLCOMM_VERSION,
                    board_type: self.board_type,
                    micros_per_loop: 120,
                    sram: 1824,
                    active_pins: 0,
                    device_summary: Vec::new(),
                })
                .encode(dst)?;
            }
            Command::Echo {
                my_float,
                my_byte,
                second_float,
            } => {
                Event::Echo {
                    my_float,
                    my_byte,
                    second_float,
                }
                .encode(dst)?;
            }
            Command::EnableAck { enabled } => {
                self.ack_enabled = enabled;
            }
            _ => {}
        }
        if self.ack_enabled {
            Event::Ack { method }.encode(dst)?;
        }
        Ok(())
    }

    /// Service a stream until EOF: read chunks, parse, write responses.
    ///
    /// Emits the begin handshake first, like firmware finishing boot.
    pub fn run<R: Read, W: Write>(mut self, mut reader: R, mut writer: W) -> std::io::Result<()> {
        let mut out = BytesMut::new();
        self.begin(&mut out).map_err(std::io::Error::other)?;
        writer.write_all(&out)?;
        writer.flush()?;

        let mut chunk = [0u8; 256];
        loop {
            let read = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            out.clear();
            self.feed(&chunk[..read], &mut out);
            if !out.is_empty() {
                writer.write_all(&out)?;
                writer.flush()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{mpsc, Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use mrlcomm_registry::ids;
    use mrlcomm_transport::loopback;

    use super::*;
    use crate::handler::MrlHandler;
    use crate::link::{Link, LinkConfig};

    fn command_bytes(command: &Command) -> Vec<u8> {
        let mut wire = BytesMut::new();
        command.encode(&mut wire).unwrap();
        wire.to_vec()
    }

    #[test]
    fn answers_get_board_info() {
        let mut device = VirtualDevice::new();
        let mut out = BytesMut::new();

        device.feed(&command_bytes(&Command::GetBoardInfo), &mut out);

        let frame = mrlcomm_codec::Frame::new(out[2], out[3..].to_vec());
        let event = Event::decode(&frame).unwrap();
        let Event::BoardInfo(info) = event else {
            panic!("expected board info, got {event:?}");
        };
        assert_eq!(info.version, MRLCOMM_VERSION);
    }

    #[test]
    fn acks_every_command_once_enabled() {
        let mut device = VirtualDevice::new();
        let mut out = BytesMut::new();

        device.feed(&command_bytes(&Command::EnableAck { enabled: true }), &mut out);
        device.feed(&command_bytes(&Command::SoftReset), &mut out);

        // Ack for enableAck, then ack for softReset.
        let mut parser = crate::parser::Parser::new();
        let mut items = Vec::new();
        parser.feed(&out, &mut items);
        let methods: Vec<u8> = items
            .iter()
            .filter_map(|item| match item {
                crate::parser::ParseItem::Frame(frame) => Some(frame.method),
                crate::parser::ParseItem::UnknownMethod(_) => None,
            })
            .collect();
        assert_eq!(methods, vec![ids::PUBLISH_ACK, ids::PUBLISH_ACK]);
    }

    struct EchoCollector {
        tx: Mutex<mpsc::Sender<(f32, u8, f32)>>,
    }

    impl MrlHandler for EchoCollector {
        fn on_echo(&self, my_float: f32, my_byte: u8, second_float: f32) {
            let _ = self
                .tx
                .lock()
                .unwrap()
                .send((my_float, my_byte, second_float));
        }
    }

    #[test]
    fn full_link_roundtrip_over_loopback() {
        let (host_io, device_io) = loopback();
        let (device_reader, device_writer) = device_io.split();
        let (mut host_reader, host_writer) = host_io.split();

        let device = thread::spawn(move || {
            VirtualDevice::new().run(device_reader, device_writer).unwrap();
        });

        let (tx, rx) = mpsc::channel();
        let handler = Arc::new(EchoCollector { tx: Mutex::new(tx) });
        let link = Arc::new(Link::with_config(
            host_writer,
            handler as Arc<dyn MrlHandler>,
            LinkConfig {
                ack_timeout: Duration::from_secs(2),
            },
        ));
        link.on_connect();

        // The feeder holds only a weak handle: dropping the last strong one
        // drops the link's writer, which lets the device see EOF and stop,
        // which in turn ends this loop.
        let feeder = {
            let link = Arc::downgrade(&link);
            thread::spawn(move || {
                let mut chunk = [0u8; 64];
                loop {
                    match std::io::Read::read(&mut host_reader, &mut chunk) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            let Some(link) = link.upgrade() else { break };
                            link.feed(&chunk[..n]);
                        }
                    }
                }
            })
        };

        // Acks on, then a protocol self-test echo.
        link.send(&Command::EnableAck { enabled: true }).unwrap();
        link.send(&Command::Echo {
            my_float: 3.5,
            my_byte: 42,
            second_float: -0.25,
        })
        .unwrap();

        let echoed = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(echoed, (3.5, 42, -0.25));
        assert!(link.is_synchronized());

        link.on_disconnect();
        drop(link);
        feeder.join().unwrap();
        device.join().unwrap();
    }
}
