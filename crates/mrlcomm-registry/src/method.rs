use std::fmt::Write as _;

use mrlcomm_codec::{decode_fields, Frame, WireType};

/// Registry revision this table implements. The firmware reports its own
/// through `publishBoardInfo`; mismatched ends talk past each other.
pub const MRLCOMM_VERSION: u8 = 64;

/// Method ids, one per protocol operation. Ids are dense (1..=56) and
/// shared across both directions.
pub mod ids {
    pub const PUBLISH_MRLCOMM_ERROR: u8 = 1;
    pub const GET_BOARD_INFO: u8 = 2;
    pub const PUBLISH_BOARD_INFO: u8 = 3;
    pub const ENABLE_PIN: u8 = 4;
    pub const SET_DEBUG: u8 = 5;
    pub const SET_SERIAL_RATE: u8 = 6;
    pub const SOFT_RESET: u8 = 7;
    pub const ENABLE_ACK: u8 = 8;
    pub const PUBLISH_ACK: u8 = 9;
    pub const ECHO: u8 = 10;
    pub const PUBLISH_ECHO: u8 = 11;
    pub const CUSTOM_MSG: u8 = 12;
    pub const PUBLISH_CUSTOM_MSG: u8 = 13;
    pub const DEVICE_DETACH: u8 = 14;
    pub const I2C_BUS_ATTACH: u8 = 15;
    pub const I2C_READ: u8 = 16;
    pub const I2C_WRITE: u8 = 17;
    pub const I2C_WRITE_READ: u8 = 18;
    pub const PUBLISH_I2C_DATA: u8 = 19;
    pub const NEO_PIXEL_ATTACH: u8 = 20;
    pub const NEO_PIXEL_SET_ANIMATION: u8 = 21;
    pub const NEO_PIXEL_WRITE_MATRIX: u8 = 22;
    pub const ANALOG_WRITE: u8 = 23;
    pub const DIGITAL_WRITE: u8 = 24;
    pub const DISABLE_PIN: u8 = 25;
    pub const DISABLE_PINS: u8 = 26;
    pub const PIN_MODE: u8 = 27;
    pub const PUBLISH_DEBUG: u8 = 28;
    pub const PUBLISH_PIN_ARRAY: u8 = 29;
    pub const SET_TRIGGER: u8 = 30;
    pub const SET_DEBOUNCE: u8 = 31;
    pub const SERVO_ATTACH: u8 = 32;
    pub const SERVO_ATTACH_PIN: u8 = 33;
    pub const SERVO_DETACH_PIN: u8 = 34;
    pub const SERVO_SET_VELOCITY: u8 = 35;
    pub const SERVO_SWEEP_START: u8 = 36;
    pub const SERVO_SWEEP_STOP: u8 = 37;
    pub const SERVO_MOVE_TO_MICROSECONDS: u8 = 38;
    pub const SERVO_SET_ACCELERATION: u8 = 39;
    pub const PUBLISH_SERVO_EVENT: u8 = 40;
    pub const SERIAL_ATTACH: u8 = 41;
    pub const SERIAL_RELAY: u8 = 42;
    pub const PUBLISH_SERIAL_DATA: u8 = 43;
    pub const ULTRASONIC_SENSOR_ATTACH: u8 = 44;
    pub const ULTRASONIC_SENSOR_START_RANGING: u8 = 45;
    pub const ULTRASONIC_SENSOR_STOP_RANGING: u8 = 46;
    pub const PUBLISH_ULTRASONIC_SENSOR_DATA: u8 = 47;
    pub const SET_AREF: u8 = 48;
    pub const MOTOR_ATTACH: u8 = 49;
    pub const MOTOR_MOVE: u8 = 50;
    pub const MOTOR_MOVE_TO: u8 = 51;
    pub const ENCODER_ATTACH: u8 = 52;
    pub const SET_ZERO_POINT: u8 = 53;
    pub const PUBLISH_ENCODER_DATA: u8 = 54;
    pub const PUBLISH_MRL_COMM_BEGIN: u8 = 55;
    pub const SERVO_STOP: u8 = 56;
}

/// Which way a method flows on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host → device.
    Command,
    /// Device → host.
    Event,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Command => "command",
            Direction::Event => "event",
        }
    }
}

/// One registry entry: id, symbolic name, direction, ordered field schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub id: u8,
    pub name: &'static str,
    pub direction: Direction,
    pub params: &'static [WireType],
}

use self::Direction::{Command, Event};
use mrlcomm_codec::WireType::{Bool, Bytes, F32, I16, I32, Str, U8};

/// The MrlComm v64 table, ordered by id (index = id - 1).
#[rustfmt::skip]
const METHODS: &[MethodDescriptor] = &[
    MethodDescriptor { id: ids::PUBLISH_MRLCOMM_ERROR, name: "publishMRLCommError", direction: Event, params: &[Str] },
    MethodDescriptor { id: ids::GET_BOARD_INFO, name: "getBoardInfo", direction: Command, params: &[] },
    MethodDescriptor { id: ids::PUBLISH_BOARD_INFO, name: "publishBoardInfo", direction: Event, params: &[U8, U8, I16, I16, U8, Bytes] },
    MethodDescriptor { id: ids::ENABLE_PIN, name: "enablePin", direction: Command, params: &[U8, U8, I16] },
    MethodDescriptor { id: ids::SET_DEBUG, name: "setDebug", direction: Command, params: &[Bool] },
    MethodDescriptor { id: ids::SET_SERIAL_RATE, name: "setSerialRate", direction: Command, params: &[I32] },
    MethodDescriptor { id: ids::SOFT_RESET, name: "softReset", direction: Command, params: &[] },
    MethodDescriptor { id: ids::ENABLE_ACK, name: "enableAck", direction: Command, params: &[Bool] },
    MethodDescriptor { id: ids::PUBLISH_ACK, name: "publishAck", direction: Event, params: &[U8] },
    MethodDescriptor { id: ids::ECHO, name: "echo", direction: Command, params: &[F32, U8, F32] },
    MethodDescriptor { id: ids::PUBLISH_ECHO, name: "publishEcho", direction: Event, params: &[F32, U8, F32] },
    MethodDescriptor { id: ids::CUSTOM_MSG, name: "customMsg", direction: Command, params: &[Bytes] },
    MethodDescriptor { id: ids::PUBLISH_CUSTOM_MSG, name: "publishCustomMsg", direction: Event, params: &[Bytes] },
    MethodDescriptor { id: ids::DEVICE_DETACH, name: "deviceDetach", direction: Command, params: &[U8] },
    MethodDescriptor { id: ids::I2C_BUS_ATTACH, name: "i2cBusAttach", direction: Command, params: &[U8, U8] },
    MethodDescriptor { id: ids::I2C_READ, name: "i2cRead", direction: Command, params: &[U8, U8, U8] },
    MethodDescriptor { id: ids::I2C_WRITE, name: "i2cWrite", direction: Command, params: &[U8, U8, Bytes] },
    MethodDescriptor { id: ids::I2C_WRITE_READ, name: "i2cWriteRead", direction: Command, params: &[U8, U8, U8, U8] },
    MethodDescriptor { id: ids::PUBLISH_I2C_DATA, name: "publishI2cData", direction: Event, params: &[U8, Bytes] },
    MethodDescriptor { id: ids::NEO_PIXEL_ATTACH, name: "neoPixelAttach", direction: Command, params: &[U8, U8, I32] },
    MethodDescriptor { id: ids::NEO_PIXEL_SET_ANIMATION, name: "neoPixelSetAnimation", direction: Command, params: &[U8, U8, U8, U8, U8, I16] },
    MethodDescriptor { id: ids::NEO_PIXEL_WRITE_MATRIX, name: "neoPixelWriteMatrix", direction: Command, params: &[U8, Bytes] },
    MethodDescriptor { id: ids::ANALOG_WRITE, name: "analogWrite", direction: Command, params: &[U8, U8] },
    MethodDescriptor { id: ids::DIGITAL_WRITE, name: "digitalWrite", direction: Command, params: &[U8, U8] },
    MethodDescriptor { id: ids::DISABLE_PIN, name: "disablePin", direction: Command, params: &[U8] },
    MethodDescriptor { id: ids::DISABLE_PINS, name: "disablePins", direction: Command, params: &[] },
    MethodDescriptor { id: ids::PIN_MODE, name: "pinMode", direction: Command, params: &[U8, U8] },
    MethodDescriptor { id: ids::PUBLISH_DEBUG, name: "publishDebug", direction: Event, params: &[Str] },
    MethodDescriptor { id: ids::PUBLISH_PIN_ARRAY, name: "publishPinArray", direction: Event, params: &[Bytes] },
    MethodDescriptor { id: ids::SET_TRIGGER, name: "setTrigger", direction: Command, params: &[U8, U8] },
    MethodDescriptor { id: ids::SET_DEBOUNCE, name: "setDebounce", direction: Command, params: &[U8, U8] },
    MethodDescriptor { id: ids::SERVO_ATTACH, name: "servoAttach", direction: Command, params: &[U8, U8, I16, I16, Str] },
    MethodDescriptor { id: ids::SERVO_ATTACH_PIN, name: "servoAttachPin", direction: Command, params: &[U8, U8] },
    MethodDescriptor { id: ids::SERVO_DETACH_PIN, name: "servoDetachPin", direction: Command, params: &[U8] },
    MethodDescriptor { id: ids::SERVO_SET_VELOCITY, name: "servoSetVelocity", direction: Command, params: &[U8, I16] },
    MethodDescriptor { id: ids::SERVO_SWEEP_START, name: "servoSweepStart", direction: Command, params: &[U8, U8, U8, U8] },
    MethodDescriptor { id: ids::SERVO_SWEEP_STOP, name: "servoSweepStop", direction: Command, params: &[U8] },
    MethodDescriptor { id: ids::SERVO_MOVE_TO_MICROSECONDS, name: "servoMoveToMicroseconds", direction: Command, params: &[U8, I16] },
    MethodDescriptor { id: ids::SERVO_SET_ACCELERATION, name: "servoSetAcceleration", direction: Command, params: &[U8, I16] },
    MethodDescriptor { id: ids::PUBLISH_SERVO_EVENT, name: "publishServoEvent", direction: Event, params: &[U8, U8, I16, I16] },
    MethodDescriptor { id: ids::SERIAL_ATTACH, name: "serialAttach", direction: Command, params: &[U8, U8] },
    MethodDescriptor { id: ids::SERIAL_RELAY, name: "serialRelay", direction: Command, params: &[U8, Bytes] },
    MethodDescriptor { id: ids::PUBLISH_SERIAL_DATA, name: "publishSerialData", direction: Event, params: &[U8, Bytes] },
    MethodDescriptor { id: ids::ULTRASONIC_SENSOR_ATTACH, name: "ultrasonicSensorAttach", direction: Command, params: &[U8, U8, U8] },
    MethodDescriptor { id: ids::ULTRASONIC_SENSOR_START_RANGING, name: "ultrasonicSensorStartRanging", direction: Command, params: &[U8] },
    MethodDescriptor { id: ids::ULTRASONIC_SENSOR_STOP_RANGING, name: "ultrasonicSensorStopRanging", direction: Command, params: &[U8] },
    MethodDescriptor { id: ids::PUBLISH_ULTRASONIC_SENSOR_DATA, name: "publishUltrasonicSensorData", direction: Event, params: &[U8, I16] },
    MethodDescriptor { id: ids::SET_AREF, name: "setAref", direction: Command, params: &[I16] },
    MethodDescriptor { id: ids::MOTOR_ATTACH, name: "motorAttach", direction: Command, params: &[U8, U8, Bytes] },
    MethodDescriptor { id: ids::MOTOR_MOVE, name: "motorMove", direction: Command, params: &[U8, U8] },
    MethodDescriptor { id: ids::MOTOR_MOVE_TO, name: "motorMoveTo", direction: Command, params: &[U8, U8] },
    MethodDescriptor { id: ids::ENCODER_ATTACH, name: "encoderAttach", direction: Command, params: &[U8, U8, U8] },
    MethodDescriptor { id: ids::SET_ZERO_POINT, name: "setZeroPoint", direction: Command, params: &[U8] },
    MethodDescriptor { id: ids::PUBLISH_ENCODER_DATA, name: "publishEncoderData", direction: Event, params: &[U8, I16] },
    MethodDescriptor { id: ids::PUBLISH_MRL_COMM_BEGIN, name: "publishMrlCommBegin", direction: Event, params: &[U8] },
    MethodDescriptor { id: ids::SERVO_STOP, name: "servoStop", direction: Command, params: &[U8] },
];

/// Look up a method descriptor by id. O(1); this is the per-frame hot path.
pub fn lookup(id: u8) -> Option<&'static MethodDescriptor> {
    let index = (id as usize).checked_sub(1)?;
    METHODS.get(index)
}

/// Look up a method descriptor by symbolic name. Cold path, for
/// logging/debugging tools only.
pub fn lookup_by_name(name: &str) -> Option<&'static MethodDescriptor> {
    METHODS.iter().find(|descriptor| descriptor.name == name)
}

/// All registered methods, ordered by id.
pub fn methods() -> &'static [MethodDescriptor] {
    METHODS
}

/// Human-readable name for a method id, or a placeholder for unknown ids.
pub fn method_name(id: u8) -> &'static str {
    lookup(id).map_or("<unknown>", |descriptor| descriptor.name)
}

/// Render a frame as `name/field/field/...` for diagnostics and traffic
/// recording. Falls back to a hex dump when the payload does not match the
/// schema.
pub fn render_frame(frame: &Frame) -> String {
    let Some(descriptor) = lookup(frame.method) else {
        return format!("<unknown method {}>", frame.method);
    };
    let mut out = String::from(descriptor.name);
    match decode_fields(descriptor.params, &frame.payload) {
        Ok(fields) => {
            for field in fields {
                let _ = write!(out, "/{field}");
            }
        }
        Err(err) => {
            let _ = write!(out, "/<undecodable: {err}>");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_dense_and_ordered() {
        assert_eq!(METHODS.len(), 56);
        for (index, descriptor) in METHODS.iter().enumerate() {
            assert_eq!(descriptor.id as usize, index + 1, "{}", descriptor.name);
        }
    }

    #[test]
    fn names_are_unique() {
        for descriptor in METHODS {
            let hits = METHODS.iter().filter(|d| d.name == descriptor.name).count();
            assert_eq!(hits, 1, "{}", descriptor.name);
        }
    }

    #[test]
    fn every_schema_fits_a_frame() {
        // Fixed-width fields plus one length byte per variable field must
        // leave room in the 61-byte field budget for any legal payload.
        for descriptor in METHODS {
            let minimum: usize = descriptor
                .params
                .iter()
                .map(|ty| ty.fixed_len().unwrap_or(1))
                .sum();
            assert!(
                minimum <= mrlcomm_codec::MAX_PAYLOAD_SIZE,
                "{} cannot fit",
                descriptor.name
            );
        }
    }

    #[test]
    fn lookup_by_id_and_name_agree() {
        let by_id = lookup(ids::SERVO_MOVE_TO_MICROSECONDS).unwrap();
        let by_name = lookup_by_name("servoMoveToMicroseconds").unwrap();
        assert_eq!(by_id, by_name);
        assert_eq!(by_id.id, 38);
        assert_eq!(by_id.direction, Direction::Command);
    }

    #[test]
    fn unknown_ids_are_absent() {
        assert!(lookup(0).is_none());
        assert!(lookup(57).is_none());
        assert!(lookup(200).is_none());
        assert_eq!(method_name(200), "<unknown>");
    }

    #[test]
    fn begin_event_is_registered() {
        let begin = lookup(ids::PUBLISH_MRL_COMM_BEGIN).unwrap();
        assert_eq!(begin.direction, Direction::Event);
        assert_eq!(begin.params, &[WireType::U8]);
    }

    #[test]
    fn render_formats_fields_in_order() {
        let frame = Frame::new(ids::SERVO_MOVE_TO_MICROSECONDS, vec![0x03, 0x05, 0xDC]);
        assert_eq!(render_frame(&frame), "servoMoveToMicroseconds/3/1500");
    }

    #[test]
    fn render_survives_bad_payload() {
        let frame = Frame::new(ids::SERVO_MOVE_TO_MICROSECONDS, vec![0x03]);
        assert!(render_frame(&frame).starts_with("servoMoveToMicroseconds/<undecodable"));
    }
}
