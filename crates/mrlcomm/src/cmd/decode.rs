use mrlcomm_link::{ParseItem, Parser};
use mrlcomm_registry::{lookup, render_frame};
use serde::Serialize;

use crate::cmd::DecodeArgs;
use crate::exit::{CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{parse_hex, to_hex, OutputFormat};

#[derive(Serialize)]
struct DecodedOutput {
    method: u8,
    name: String,
    direction: Option<&'static str>,
    bytes: String,
    rendered: String,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_hex(&args.hex.join(" "))?;
    if bytes.is_empty() {
        return Err(CliError::new(DATA_INVALID, "no input bytes"));
    }

    let mut parser = Parser::new();
    let mut items = Vec::new();
    parser.feed(&bytes, &mut items);

    let decoded: Vec<DecodedOutput> = items
        .iter()
        .map(|item| match item {
            ParseItem::Frame(frame) => {
                let direction = lookup(frame.method).map(|d| d.direction.as_str());
                DecodedOutput {
                    method: frame.method,
                    name: mrlcomm_registry::method_name(frame.method).to_string(),
                    direction,
                    bytes: frame
                        .to_wire()
                        .map(|wire| to_hex(&wire))
                        .unwrap_or_default(),
                    rendered: render_frame(frame),
                }
            }
            ParseItem::UnknownMethod(method) => DecodedOutput {
                method: *method,
                name: "<unknown>".to_string(),
                direction: None,
                bytes: String::new(),
                rendered: format!("<unknown method {method}>"),
            },
        })
        .collect();

    if decoded.is_empty() {
        let stats = parser.stats();
        return Err(CliError::new(
            DATA_INVALID,
            format!(
                "no frames found ({} bytes dropped, {} size errors)",
                stats.bad_magic, stats.bad_size
            ),
        ));
    }

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&decoded).unwrap_or_else(|_| "[]".to_string())
        ),
        OutputFormat::Table | OutputFormat::Pretty => {
            for entry in &decoded {
                let arrow = match entry.direction {
                    Some("event") => '<',
                    Some(_) => '>',
                    None => '?',
                };
                println!("{arrow} {}", entry.rendered);
            }
        }
    }

    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use crate::output::parse_hex;

    #[test]
    fn servo_frame_decodes() {
        let bytes = parse_hex("AA 04 26 03 05 DC").unwrap();
        let mut parser = mrlcomm_link::Parser::new();
        let mut items = Vec::new();
        parser.feed(&bytes, &mut items);
        assert_eq!(items.len(), 1);
        let mrlcomm_link::ParseItem::Frame(frame) = &items[0] else {
            panic!("expected a frame");
        };
        assert_eq!(
            mrlcomm_registry::render_frame(frame),
            "servoMoveToMicroseconds/3/1500"
        );
    }
}
