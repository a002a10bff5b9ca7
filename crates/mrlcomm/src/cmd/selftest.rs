use std::io::Read;
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use mrlcomm_link::{Link, LinkConfig, MrlHandler, VirtualDevice};
use mrlcomm_registry::{BoardInfo, Command, MRLCOMM_VERSION};
use mrlcomm_transport::loopback;
use serde::Serialize;
use tracing::info;

use crate::cmd::SelftestArgs;
use crate::exit::{link_error, CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
enum Probe {
    Begin(u8),
    Board(u8),
    Echo(f32, u8, f32),
}

struct ProbeHandler {
    tx: Mutex<Sender<Probe>>,
}

impl ProbeHandler {
    fn send(&self, probe: Probe) {
        let _ = self.tx.lock().expect("probe sender poisoned").send(probe);
    }
}

impl MrlHandler for ProbeHandler {
    fn on_mrl_comm_begin(&self, version: u8) {
        self.send(Probe::Begin(version));
    }

    fn on_board_info(&self, info: &BoardInfo) {
        self.send(Probe::Board(info.version));
    }

    fn on_echo(&self, my_float: f32, my_byte: u8, second_float: f32) {
        self.send(Probe::Echo(my_float, my_byte, second_float));
    }
}

#[derive(Serialize)]
struct CheckOutput {
    check: &'static str,
    pass: bool,
    detail: String,
}

fn check(name: &'static str, pass: bool, detail: impl Into<String>) -> CheckOutput {
    CheckOutput {
        check: name,
        pass,
        detail: detail.into(),
    }
}

/// Drive a full host-side session against the virtual device: begin
/// handshake, board info, ack round trip, echo self-test.
pub fn run(args: SelftestArgs, format: OutputFormat) -> CliResult<i32> {
    let mut results = Vec::new();

    let (host_io, device_io) = loopback();
    let (device_reader, device_writer) = device_io.split();
    let (mut host_reader, host_writer) = host_io.split();

    let device = thread::spawn(move || VirtualDevice::new().run(device_reader, device_writer));

    let (tx, rx) = channel();
    let handler = Arc::new(ProbeHandler { tx: Mutex::new(tx) });
    let link = Arc::new(Link::with_config(
        host_writer,
        handler as Arc<dyn MrlHandler>,
        LinkConfig {
            ack_timeout: Duration::from_millis(args.ack_timeout_ms),
        },
    ));
    link.on_connect();

    // Weak handle only: dropping the last strong reference closes the
    // outbound half, which lets the device and this loop wind down.
    let feeder = {
        let link = Arc::downgrade(&link);
        thread::spawn(move || {
            let mut chunk = [0u8; 64];
            loop {
                match host_reader.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(read) => {
                        let Some(link) = link.upgrade() else { break };
                        link.feed(&chunk[..read]);
                    }
                }
            }
        })
    };

    match rx.recv_timeout(PROBE_TIMEOUT) {
        Ok(Probe::Begin(version)) => {
            results.push(check(
                "begin handshake",
                version == MRLCOMM_VERSION && link.is_synchronized(),
                format!("device protocol version {version}"),
            ));
        }
        other => results.push(check("begin handshake", false, format!("got {other:?}"))),
    }

    link.send(&Command::EnableAck { enabled: true })
        .map_err(|err| link_error("enable acks", err))?;
    results.push(check(
        "enable acks",
        link.is_ack_enabled(),
        "enableAck sent",
    ));

    link.send(&Command::GetBoardInfo)
        .map_err(|err| link_error("board info", err))?;
    match rx.recv_timeout(PROBE_TIMEOUT) {
        Ok(Probe::Board(version)) => results.push(check(
            "board info",
            version == MRLCOMM_VERSION,
            format!("board reports registry version {version}"),
        )),
        probe => results.push(check("board info", false, format!("got {probe:?}"))),
    }

    link.send(&Command::Echo {
        my_float: 3.5,
        my_byte: 42,
        second_float: -0.25,
    })
    .map_err(|err| link_error("echo", err))?;
    match rx.recv_timeout(PROBE_TIMEOUT) {
        Ok(Probe::Echo(a, b, c)) => results.push(check(
            "echo roundtrip",
            (a, b, c) == (3.5, 42, -0.25),
            format!("device echoed {a}/{b}/{c}"),
        )),
        probe => results.push(check("echo roundtrip", false, format!("got {probe:?}"))),
    }

    let stats = link.stats();
    results.push(check(
        "clean parse",
        stats.bad_magic == 0
            && stats.bad_size == 0
            && stats.unknown_method == 0
            && stats.decode_failures == 0,
        format!("{} frames, no recoveries", stats.frames),
    ));

    link.on_disconnect();
    drop(link);
    let _ = feeder.join();
    let device_result = device.join();
    results.push(check(
        "device shutdown",
        matches!(device_result, Ok(Ok(()))),
        "virtual device exited cleanly",
    ));

    let all_passed = results.iter().all(|result| result.pass);
    info!(passed = all_passed, checks = results.len(), "selftest finished");
    render(&results, format);

    Ok(if all_passed { SUCCESS } else { HEALTH_CHECK_FAILED })
}

fn render(results: &[CheckOutput], format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(results).unwrap_or_else(|_| "[]".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHECK", "RESULT", "DETAIL"]);
            for result in results {
                table.add_row(vec![
                    result.check.to_string(),
                    if result.pass { "pass" } else { "FAIL" }.to_string(),
                    result.detail.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for result in results {
                println!(
                    "{} {}: {}",
                    if result.pass { "ok " } else { "FAIL" },
                    result.check,
                    result.detail
                );
            }
        }
    }
}
