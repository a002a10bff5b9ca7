use bytes::BytesMut;
use mrlcomm_codec::{encode_frame, Frame, Value, WireType};
use mrlcomm_registry::{lookup_by_name, render_frame};
use serde::Serialize;

use crate::cmd::EncodeArgs;
use crate::exit::{codec_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{to_hex, OutputFormat};

#[derive(Serialize)]
struct EncodedOutput {
    method: u8,
    name: &'static str,
    bytes: String,
    rendered: String,
}

fn parse_value(ty: WireType, raw: &str) -> Result<Value, CliError> {
    let invalid = |what: &str| {
        CliError::new(DATA_INVALID, format!("'{raw}' is not a valid {what}"))
    };
    Ok(match ty {
        WireType::U8 => {
            let wide: u16 = raw.parse().map_err(|_| invalid("byte"))?;
            let narrow = u8::try_from(wide).map_err(|_| {
                CliError::new(DATA_INVALID, format!("{raw} out of range for byte (0-255)"))
            })?;
            Value::U8(narrow)
        }
        WireType::Bool => match raw {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            _ => return Err(invalid("bool")),
        },
        WireType::I16 => Value::I16(raw.parse().map_err(|_| invalid("b16"))?),
        WireType::I32 => Value::I32(raw.parse().map_err(|_| invalid("b32"))?),
        WireType::U32 => Value::U32(raw.parse().map_err(|_| invalid("bu32"))?),
        WireType::F32 => Value::F32(raw.parse().map_err(|_| invalid("f32"))?),
        WireType::Str => Value::Str(raw.to_owned()),
        WireType::Bytes => {
            let mut bytes = Vec::new();
            for token in raw.split(',').filter(|token| !token.is_empty()) {
                bytes.push(token.trim().parse::<u8>().map_err(|_| invalid("byte list"))?);
            }
            Value::Bytes(bytes)
        }
    })
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let descriptor = lookup_by_name(&args.name).ok_or_else(|| {
        CliError::new(DATA_INVALID, format!("unknown method '{}'", args.name))
    })?;

    if args.values.len() != descriptor.params.len() {
        return Err(CliError::new(
            USAGE,
            format!(
                "{} takes {} field(s), got {}",
                descriptor.name,
                descriptor.params.len(),
                args.values.len()
            ),
        ));
    }

    let fields: Vec<Value> = descriptor
        .params
        .iter()
        .zip(&args.values)
        .map(|(ty, raw)| parse_value(*ty, raw))
        .collect::<Result<_, _>>()?;

    let mut wire = BytesMut::new();
    encode_frame(descriptor.id, &fields, &mut wire)
        .map_err(|err| codec_error(descriptor.name, err))?;

    let frame = Frame::new(descriptor.id, wire[3..].to_vec());
    let out = EncodedOutput {
        method: descriptor.id,
        name: descriptor.name,
        bytes: to_hex(&wire),
        rendered: render_frame(&frame),
    };

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&out).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("{}", out.bytes);
        }
    }

    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_wire_type() {
        assert_eq!(parse_value(WireType::U8, "255").unwrap(), Value::U8(255));
        assert_eq!(
            parse_value(WireType::Bool, "true").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            parse_value(WireType::I16, "-1500").unwrap(),
            Value::I16(-1500)
        );
        assert_eq!(
            parse_value(WireType::U32, "4294967295").unwrap(),
            Value::U32(u32::MAX)
        );
        assert_eq!(
            parse_value(WireType::F32, "3.5").unwrap(),
            Value::F32(3.5)
        );
        assert_eq!(
            parse_value(WireType::Bytes, "1,2,3").unwrap(),
            Value::Bytes(vec![1, 2, 3])
        );
    }

    #[test]
    fn byte_range_is_enforced_at_parse_time() {
        let err = parse_value(WireType::U8, "256").unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
        assert!(parse_value(WireType::U8, "-1").is_err());
    }

    #[test]
    fn servo_example_encodes_to_documented_bytes() {
        let descriptor = lookup_by_name("servoMoveToMicroseconds").unwrap();
        let fields = vec![
            parse_value(descriptor.params[0], "3").unwrap(),
            parse_value(descriptor.params[1], "1500").unwrap(),
        ];
        let mut wire = BytesMut::new();
        encode_frame(descriptor.id, &fields, &mut wire).unwrap();
        assert_eq!(to_hex(&wire), "AA 04 26 03 05 DC");
    }
}
