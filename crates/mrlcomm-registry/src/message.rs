use bytes::BytesMut;

use mrlcomm_codec::{
    encode_frame_raw, put_bool, put_bytes, put_f32, put_i16, put_i32, put_str, put_u8, Frame,
    Result as CodecResult, WireReader, MAX_DECLARED_SIZE,
};

use crate::error::{DecodeError, Result};
use crate::method::{ids, lookup, Direction};

/// Snapshot the firmware publishes in response to `getBoardInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardInfo {
    pub version: u8,
    pub board_type: u8,
    pub micros_per_loop: i16,
    pub sram: i16,
    pub active_pins: u8,
    pub device_summary: Vec<u8>,
}

/// A host→device operation, one variant per command in the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    GetBoardInfo,
    EnablePin { address: u8, pin_type: u8, rate: i16 },
    SetDebug { enabled: bool },
    SetSerialRate { rate: i32 },
    SoftReset,
    EnableAck { enabled: bool },
    Echo { my_float: f32, my_byte: u8, second_float: f32 },
    CustomMsg { msg: Vec<u8> },
    DeviceDetach { device_id: u8 },
    I2cBusAttach { device_id: u8, i2c_bus: u8 },
    I2cRead { device_id: u8, device_address: u8, size: u8 },
    I2cWrite { device_id: u8, device_address: u8, data: Vec<u8> },
    I2cWriteRead { device_id: u8, device_address: u8, read_size: u8, write_value: u8 },
    NeoPixelAttach { device_id: u8, pin: u8, num_pixels: i32 },
    NeoPixelSetAnimation { device_id: u8, animation: u8, red: u8, green: u8, blue: u8, speed: i16 },
    NeoPixelWriteMatrix { device_id: u8, buffer: Vec<u8> },
    AnalogWrite { pin: u8, value: u8 },
    DigitalWrite { pin: u8, value: u8 },
    DisablePin { pin: u8 },
    DisablePins,
    PinMode { pin: u8, mode: u8 },
    SetTrigger { pin: u8, trigger_value: u8 },
    SetDebounce { pin: u8, delay: u8 },
    ServoAttach { device_id: u8, pin: u8, init_pos: i16, init_velocity: i16, name: String },
    ServoAttachPin { device_id: u8, pin: u8 },
    ServoDetachPin { device_id: u8 },
    ServoSetVelocity { device_id: u8, velocity: i16 },
    ServoSweepStart { device_id: u8, min: u8, max: u8, step: u8 },
    ServoSweepStop { device_id: u8 },
    ServoMoveToMicroseconds { device_id: u8, target: i16 },
    ServoSetAcceleration { device_id: u8, acceleration: i16 },
    SerialAttach { device_id: u8, relay_pin: u8 },
    SerialRelay { device_id: u8, data: Vec<u8> },
    UltrasonicSensorAttach { device_id: u8, trigger_pin: u8, echo_pin: u8 },
    UltrasonicSensorStartRanging { device_id: u8 },
    UltrasonicSensorStopRanging { device_id: u8 },
    SetAref { aref: i16 },
    MotorAttach { device_id: u8, motor_type: u8, pins: Vec<u8> },
    MotorMove { device_id: u8, power: u8 },
    MotorMoveTo { device_id: u8, position: u8 },
    EncoderAttach { device_id: u8, encoder_type: u8, pin: u8 },
    SetZeroPoint { device_id: u8 },
    ServoStop { device_id: u8 },
}

impl Command {
    /// The registry id this command encodes as.
    pub fn method(&self) -> u8 {
        match self {
            Command::GetBoardInfo => ids::GET_BOARD_INFO,
            Command::EnablePin { .. } => ids::ENABLE_PIN,
            Command::SetDebug { .. } => ids::SET_DEBUG,
            Command::SetSerialRate { .. } => ids::SET_SERIAL_RATE,
            Command::SoftReset => ids::SOFT_RESET,
            Command::EnableAck { .. } => ids::ENABLE_ACK,
            Command::Echo { .. } => ids::ECHO,
            Command::CustomMsg { .. } => ids::CUSTOM_MSG,
            Command::DeviceDetach { .. } => ids::DEVICE_DETACH,
            Command::I2cBusAttach { .. } => ids::I2C_BUS_ATTACH,
            Command::I2cRead { .. } => ids::I2C_READ,
            Command::I2cWrite { .. } => ids::I2C_WRITE,
            Command::I2cWriteRead { .. } => ids::I2C_WRITE_READ,
            Command::NeoPixelAttach { .. } => ids::NEO_PIXEL_ATTACH,
            Command::NeoPixelSetAnimation { .. } => ids::NEO_PIXEL_SET_ANIMATION,
            Command::NeoPixelWriteMatrix { .. } => ids::NEO_PIXEL_WRITE_MATRIX,
            Command::AnalogWrite { .. } => ids::ANALOG_WRITE,
            Command::DigitalWrite { .. } => ids::DIGITAL_WRITE,
            Command::DisablePin { .. } => ids::DISABLE_PIN,
            Command::DisablePins => ids::DISABLE_PINS,
            Command::PinMode { .. } => ids::PIN_MODE,
            Command::SetTrigger { .. } => ids::SET_TRIGGER,
            Command::SetDebounce { .. } => ids::SET_DEBOUNCE,
            Command::ServoAttach { .. } => ids::SERVO_ATTACH,
            Command::ServoAttachPin { .. } => ids::SERVO_ATTACH_PIN,
            Command::ServoDetachPin { .. } => ids::SERVO_DETACH_PIN,
            Command::ServoSetVelocity { .. } => ids::SERVO_SET_VELOCITY,
            Command::ServoSweepStart { .. } => ids::SERVO_SWEEP_START,
            Command::ServoSweepStop { .. } => ids::SERVO_SWEEP_STOP,
            Command::ServoMoveToMicroseconds { .. } => ids::SERVO_MOVE_TO_MICROSECONDS,
            Command::ServoSetAcceleration { .. } => ids::SERVO_SET_ACCELERATION,
            Command::SerialAttach { .. } => ids::SERIAL_ATTACH,
            Command::SerialRelay { .. } => ids::SERIAL_RELAY,
            Command::UltrasonicSensorAttach { .. } => ids::ULTRASONIC_SENSOR_ATTACH,
            Command::UltrasonicSensorStartRanging { .. } => ids::ULTRASONIC_SENSOR_START_RANGING,
            Command::UltrasonicSensorStopRanging { .. } => ids::ULTRASONIC_SENSOR_STOP_RANGING,
            Command::SetAref { .. } => ids::SET_AREF,
            Command::MotorAttach { .. } => ids::MOTOR_ATTACH,
            Command::MotorMove { .. } => ids::MOTOR_MOVE,
            Command::MotorMoveTo { .. } => ids::MOTOR_MOVE_TO,
            Command::EncoderAttach { .. } => ids::ENCODER_ATTACH,
            Command::SetZeroPoint { .. } => ids::SET_ZERO_POINT,
            Command::ServoStop { .. } => ids::SERVO_STOP,
        }
    }

    /// The registry name this command encodes as.
    pub fn name(&self) -> &'static str {
        crate::method::method_name(self.method())
    }

    fn put_fields(&self, dst: &mut BytesMut) -> CodecResult<()> {
        match self {
            Command::GetBoardInfo | Command::SoftReset | Command::DisablePins => {}
            Command::EnablePin { address, pin_type, rate } => {
                put_u8(dst, *address);
                put_u8(dst, *pin_type);
                put_i16(dst, *rate);
            }
            Command::SetDebug { enabled } => put_bool(dst, *enabled),
            Command::SetSerialRate { rate } => put_i32(dst, *rate),
            Command::EnableAck { enabled } => put_bool(dst, *enabled),
            Command::Echo { my_float, my_byte, second_float } => {
                put_f32(dst, *my_float);
                put_u8(dst, *my_byte);
                put_f32(dst, *second_float);
            }
            Command::CustomMsg { msg } => put_bytes(dst, msg)?,
            Command::DeviceDetach { device_id }
            | Command::ServoDetachPin { device_id }
            | Command::ServoSweepStop { device_id }
            | Command::UltrasonicSensorStartRanging { device_id }
            | Command::UltrasonicSensorStopRanging { device_id }
            | Command::SetZeroPoint { device_id }
            | Command::ServoStop { device_id } => put_u8(dst, *device_id),
            Command::I2cBusAttach { device_id, i2c_bus } => {
                put_u8(dst, *device_id);
                put_u8(dst, *i2c_bus);
            }
            Command::I2cRead { device_id, device_address, size } => {
                put_u8(dst, *device_id);
                put_u8(dst, *device_address);
                put_u8(dst, *size);
            }
            Command::I2cWrite { device_id, device_address, data } => {
                put_u8(dst, *device_id);
                put_u8(dst, *device_address);
                put_bytes(dst, data)?;
            }
            Command::I2cWriteRead { device_id, device_address, read_size, write_value } => {
                put_u8(dst, *device_id);
                put_u8(dst, *device_address);
                put_u8(dst, *read_size);
                put_u8(dst, *write_value);
            }
            Command::NeoPixelAttach { device_id, pin, num_pixels } => {
                put_u8(dst, *device_id);
                put_u8(dst, *pin);
                put_i32(dst, *num_pixels);
            }
            Command::NeoPixelSetAnimation { device_id, animation, red, green, blue, speed } => {
                put_u8(dst, *device_id);
                put_u8(dst, *animation);
                put_u8(dst, *red);
                put_u8(dst, *green);
                put_u8(dst, *blue);
                put_i16(dst, *speed);
            }
            Command::NeoPixelWriteMatrix { device_id, buffer } => {
                put_u8(dst, *device_id);
                put_bytes(dst, buffer)?;
            }
            Command::AnalogWrite { pin, value } | Command::DigitalWrite { pin, value } => {
                put_u8(dst, *pin);
                put_u8(dst, *value);
            }
            Command::DisablePin { pin } => put_u8(dst, *pin),
            Command::PinMode { pin, mode } => {
                put_u8(dst, *pin);
                put_u8(dst, *mode);
            }
            Command::SetTrigger { pin, trigger_value } => {
                put_u8(dst, *pin);
                put_u8(dst, *trigger_value);
            }
            Command::SetDebounce { pin, delay } => {
                put_u8(dst, *pin);
                put_u8(dst, *delay);
            }
            Command::ServoAttach { device_id, pin, init_pos, init_velocity, name } => {
                put_u8(dst, *device_id);
                put_u8(dst, *pin);
                put_i16(dst, *init_pos);
                put_i16(dst, *init_velocity);
                put_str(dst, name)?;
            }
            Command::ServoAttachPin { device_id, pin } => {
                put_u8(dst, *device_id);
                put_u8(dst, *pin);
            }
            Command::ServoSetVelocity { device_id, velocity } => {
                put_u8(dst, *device_id);
                put_i16(dst, *velocity);
            }
            Command::ServoSweepStart { device_id, min, max, step } => {
                put_u8(dst, *device_id);
                put_u8(dst, *min);
                put_u8(dst, *max);
                put_u8(dst, *step);
            }
            Command::ServoMoveToMicroseconds { device_id, target } => {
                put_u8(dst, *device_id);
                put_i16(dst, *target);
            }
            Command::ServoSetAcceleration { device_id, acceleration } => {
                put_u8(dst, *device_id);
                put_i16(dst, *acceleration);
            }
            Command::SerialAttach { device_id, relay_pin } => {
                put_u8(dst, *device_id);
                put_u8(dst, *relay_pin);
            }
            Command::SerialRelay { device_id, data } => {
                put_u8(dst, *device_id);
                put_bytes(dst, data)?;
            }
            Command::UltrasonicSensorAttach { device_id, trigger_pin, echo_pin } => {
                put_u8(dst, *device_id);
                put_u8(dst, *trigger_pin);
                put_u8(dst, *echo_pin);
            }
            Command::SetAref { aref } => put_i16(dst, *aref),
            Command::MotorAttach { device_id, motor_type, pins } => {
                put_u8(dst, *device_id);
                put_u8(dst, *motor_type);
                put_bytes(dst, pins)?;
            }
            Command::MotorMove { device_id, power } => {
                put_u8(dst, *device_id);
                put_u8(dst, *power);
            }
            Command::MotorMoveTo { device_id, position } => {
                put_u8(dst, *device_id);
                put_u8(dst, *position);
            }
            Command::EncoderAttach { device_id, encoder_type, pin } => {
                put_u8(dst, *device_id);
                put_u8(dst, *encoder_type);
                put_u8(dst, *pin);
            }
        }
        Ok(())
    }

    /// Encode the full wire frame for this command.
    pub fn encode(&self, dst: &mut BytesMut) -> CodecResult<()> {
        let mut body = BytesMut::with_capacity(MAX_DECLARED_SIZE);
        self.put_fields(&mut body)?;
        encode_frame_raw(self.method(), &body, dst)
    }

    /// Decode a reassembled frame into a typed command (the device side of
    /// the wire, used by protocol test doubles).
    pub fn decode(frame: &Frame) -> Result<Self> {
        let descriptor =
            lookup(frame.method).ok_or(DecodeError::UnknownMethod(frame.method))?;
        if descriptor.direction != Direction::Command {
            return Err(DecodeError::WrongDirection {
                name: descriptor.name,
                actual: descriptor.direction.as_str(),
                expected: "command",
            });
        }

        let mut r = WireReader::new(&frame.payload);
        let command = match frame.method {
            ids::GET_BOARD_INFO => Command::GetBoardInfo,
            ids::ENABLE_PIN => Command::EnablePin {
                address: r.u8()?,
                pin_type: r.u8()?,
                rate: r.i16()?,
            },
            ids::SET_DEBUG => Command::SetDebug { enabled: r.bool()? },
            ids::SET_SERIAL_RATE => Command::SetSerialRate { rate: r.i32()? },
            ids::SOFT_RESET => Command::SoftReset,
            ids::ENABLE_ACK => Command::EnableAck { enabled: r.bool()? },
            ids::ECHO => Command::Echo {
                my_float: r.f32()?,
                my_byte: r.u8()?,
                second_float: r.f32()?,
            },
            ids::CUSTOM_MSG => Command::CustomMsg {
                msg: r.bytes_field()?.to_vec(),
            },
            ids::DEVICE_DETACH => Command::DeviceDetach { device_id: r.u8()? },
            ids::I2C_BUS_ATTACH => Command::I2cBusAttach {
                device_id: r.u8()?,
                i2c_bus: r.u8()?,
            },
            ids::I2C_READ => Command::I2cRead {
                device_id: r.u8()?,
                device_address: r.u8()?,
                size: r.u8()?,
            },
            ids::I2C_WRITE => Command::I2cWrite {
                device_id: r.u8()?,
                device_address: r.u8()?,
                data: r.bytes_field()?.to_vec(),
            },
            ids::I2C_WRITE_READ => Command::I2cWriteRead {
                device_id: r.u8()?,
                device_address: r.u8()?,
                read_size: r.u8()?,
                write_value: r.u8()?,
            },
            ids::NEO_PIXEL_ATTACH => Command::NeoPixelAttach {
                device_id: r.u8()?,
                pin: r.u8()?,
                num_pixels: r.i32()?,
            },
            ids::NEO_PIXEL_SET_ANIMATION => Command::NeoPixelSetAnimation {
                device_id: r.u8()?,
                animation: r.u8()?,
                red: r.u8()?,
                green: r.u8()?,
                blue: r.u8()?,
                speed: r.i16()?,
            },
            ids::NEO_PIXEL_WRITE_MATRIX => Command::NeoPixelWriteMatrix {
                device_id: r.u8()?,
                buffer: r.bytes_field()?.to_vec(),
            },
            ids::ANALOG_WRITE => Command::AnalogWrite {
                pin: r.u8()?,
                value: r.u8()?,
            },
            ids::DIGITAL_WRITE => Command::DigitalWrite {
                pin: r.u8()?,
                value: r.u8()?,
            },
            ids::DISABLE_PIN => Command::DisablePin { pin: r.u8()? },
            ids::DISABLE_PINS => Command::DisablePins,
            ids::PIN_MODE => Command::PinMode {
                pin: r.u8()?,
                mode: r.u8()?,
            },
            ids::SET_TRIGGER => Command::SetTrigger {
                pin: r.u8()?,
                trigger_value: r.u8()?,
            },
            ids::SET_DEBOUNCE => Command::SetDebounce {
                pin: r.u8()?,
                delay: r.u8()?,
            },
            ids::SERVO_ATTACH => Command::ServoAttach {
                device_id: r.u8()?,
                pin: r.u8()?,
                init_pos: r.i16()?,
                init_velocity: r.i16()?,
                name: r.str_field()?.to_owned(),
            },
            ids::SERVO_ATTACH_PIN => Command::ServoAttachPin {
                device_id: r.u8()?,
                pin: r.u8()?,
            },
            ids::SERVO_DETACH_PIN => Command::ServoDetachPin { device_id: r.u8()? },
            ids::SERVO_SET_VELOCITY => Command::ServoSetVelocity {
                device_id: r.u8()?,
                velocity: r.i16()?,
            },
            ids::SERVO_SWEEP_START => Command::ServoSweepStart {
                device_id: r.u8()?,
                min: r.u8()?,
                max: r.u8()?,
                step: r.u8()?,
            },
            ids::SERVO_SWEEP_STOP => Command::ServoSweepStop { device_id: r.u8()? },
            ids::SERVO_MOVE_TO_MICROSECONDS => Command::ServoMoveToMicroseconds {
                device_id: r.u8()?,
                target: r.i16()?,
            },
            ids::SERVO_SET_ACCELERATION => Command::ServoSetAcceleration {
                device_id: r.u8()?,
                acceleration: r.i16()?,
            },
            ids::SERIAL_ATTACH => Command::SerialAttach {
                device_id: r.u8()?,
                relay_pin: r.u8()?,
            },
            ids::SERIAL_RELAY => Command::SerialRelay {
                device_id: r.u8()?,
                data: r.bytes_field()?.to_vec(),
            },
            ids::ULTRASONIC_SENSOR_ATTACH => Command::UltrasonicSensorAttach {
                device_id: r.u8()?,
                trigger_pin: r.u8()?,
                echo_pin: r.u8()?,
            },
            ids::ULTRASONIC_SENSOR_START_RANGING => {
                Command::UltrasonicSensorStartRanging { device_id: r.u8()? }
            }
            ids::ULTRASONIC_SENSOR_STOP_RANGING => {
                Command::UltrasonicSensorStopRanging { device_id: r.u8()? }
            }
            ids::SET_AREF => Command::SetAref { aref: r.i16()? },
            ids::MOTOR_ATTACH => Command::MotorAttach {
                device_id: r.u8()?,
                motor_type: r.u8()?,
                pins: r.bytes_field()?.to_vec(),
            },
            ids::MOTOR_MOVE => Command::MotorMove {
                device_id: r.u8()?,
                power: r.u8()?,
            },
            ids::MOTOR_MOVE_TO => Command::MotorMoveTo {
                device_id: r.u8()?,
                position: r.u8()?,
            },
            ids::ENCODER_ATTACH => Command::EncoderAttach {
                device_id: r.u8()?,
                encoder_type: r.u8()?,
                pin: r.u8()?,
            },
            ids::SET_ZERO_POINT => Command::SetZeroPoint { device_id: r.u8()? },
            ids::SERVO_STOP => Command::ServoStop { device_id: r.u8()? },
            other => return Err(DecodeError::UnknownMethod(other)),
        };
        r.finish().map_err(DecodeError::Codec)?;
        Ok(command)
    }
}

/// A device→host notification, one variant per event in the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    MrlCommError { message: String },
    BoardInfo(BoardInfo),
    Ack { method: u8 },
    Echo { my_float: f32, my_byte: u8, second_float: f32 },
    CustomMsg { msg: Vec<u8> },
    I2cData { device_id: u8, data: Vec<u8> },
    Debug { message: String },
    PinArray { data: Vec<u8> },
    ServoEvent { device_id: u8, event_type: u8, current_pos: i16, target_pos: i16 },
    SerialData { device_id: u8, data: Vec<u8> },
    UltrasonicSensorData { device_id: u8, echo_time: i16 },
    EncoderData { device_id: u8, position: i16 },
    MrlCommBegin { version: u8 },
}

impl Event {
    /// The registry id this event encodes as.
    pub fn method(&self) -> u8 {
        match self {
            Event::MrlCommError { .. } => ids::PUBLISH_MRLCOMM_ERROR,
            Event::BoardInfo(_) => ids::PUBLISH_BOARD_INFO,
            Event::Ack { .. } => ids::PUBLISH_ACK,
            Event::Echo { .. } => ids::PUBLISH_ECHO,
            Event::CustomMsg { .. } => ids::PUBLISH_CUSTOM_MSG,
            Event::I2cData { .. } => ids::PUBLISH_I2C_DATA,
            Event::Debug { .. } => ids::PUBLISH_DEBUG,
            Event::PinArray { .. } => ids::PUBLISH_PIN_ARRAY,
            Event::ServoEvent { .. } => ids::PUBLISH_SERVO_EVENT,
            Event::SerialData { .. } => ids::PUBLISH_SERIAL_DATA,
            Event::UltrasonicSensorData { .. } => ids::PUBLISH_ULTRASONIC_SENSOR_DATA,
            Event::EncoderData { .. } => ids::PUBLISH_ENCODER_DATA,
            Event::MrlCommBegin { .. } => ids::PUBLISH_MRL_COMM_BEGIN,
        }
    }

    /// The registry name this event encodes as.
    pub fn name(&self) -> &'static str {
        crate::method::method_name(self.method())
    }

    /// True for the device's startup handshake event.
    pub fn is_begin(&self) -> bool {
        matches!(self, Event::MrlCommBegin { .. })
    }

    fn put_fields(&self, dst: &mut BytesMut) -> CodecResult<()> {
        match self {
            Event::MrlCommError { message } => put_str(dst, message)?,
            Event::BoardInfo(info) => {
                put_u8(dst, info.version);
                put_u8(dst, info.board_type);
                put_i16(dst, info.micros_per_loop);
                put_i16(dst, info.sram);
                put_u8(dst, info.active_pins);
                put_bytes(dst, &info.device_summary)?;
            }
            Event::Ack { method } => put_u8(dst, *method),
            Event::Echo { my_float, my_byte, second_float } => {
                put_f32(dst, *my_float);
                put_u8(dst, *my_byte);
                put_f32(dst, *second_float);
            }
            Event::CustomMsg { msg } => put_bytes(dst, msg)?,
            Event::I2cData { device_id, data } => {
                put_u8(dst, *device_id);
                put_bytes(dst, data)?;
            }
            Event::Debug { message } => put_str(dst, message)?,
            Event::PinArray { data } => put_bytes(dst, data)?,
            Event::ServoEvent { device_id, event_type, current_pos, target_pos } => {
                put_u8(dst, *device_id);
                put_u8(dst, *event_type);
                put_i16(dst, *current_pos);
                put_i16(dst, *target_pos);
            }
            Event::SerialData { device_id, data } => {
                put_u8(dst, *device_id);
                put_bytes(dst, data)?;
            }
            Event::UltrasonicSensorData { device_id, echo_time } => {
                put_u8(dst, *device_id);
                put_i16(dst, *echo_time);
            }
            Event::EncoderData { device_id, position } => {
                put_u8(dst, *device_id);
                put_i16(dst, *position);
            }
            Event::MrlCommBegin { version } => put_u8(dst, *version),
        }
        Ok(())
    }

    /// Encode the full wire frame for this event (the device side of the
    /// wire, used by protocol test doubles).
    pub fn encode(&self, dst: &mut BytesMut) -> CodecResult<()> {
        let mut body = BytesMut::with_capacity(MAX_DECLARED_SIZE);
        self.put_fields(&mut body)?;
        encode_frame_raw(self.method(), &body, dst)
    }

    /// Decode a reassembled frame into a typed event.
    pub fn decode(frame: &Frame) -> Result<Self> {
        let descriptor =
            lookup(frame.method).ok_or(DecodeError::UnknownMethod(frame.method))?;
        if descriptor.direction != Direction::Event {
            return Err(DecodeError::WrongDirection {
                name: descriptor.name,
                actual: descriptor.direction.as_str(),
                expected: "event",
            });
        }

        let mut r = WireReader::new(&frame.payload);
        let event = match frame.method {
            ids::PUBLISH_MRLCOMM_ERROR => Event::MrlCommError {
                message: r.str_field()?.to_owned(),
            },
            ids::PUBLISH_BOARD_INFO => Event::BoardInfo(BoardInfo {
                version: r.u8()?,
                board_type: r.u8()?,
                micros_per_loop: r.i16()?,
                sram: r.i16()?,
                active_pins: r.u8()?,
                device_summary: r.bytes_field()?.to_vec(),
            }),
            ids::PUBLISH_ACK => Event::Ack { method: r.u8()? },
            ids::PUBLISH_ECHO => Event::Echo {
                my_float: r.f32()?,
                my_byte: r.u8()?,
                second_float: r.f32()?,
            },
            ids::PUBLISH_CUSTOM_MSG => Event::CustomMsg {
                msg: r.bytes_field()?.to_vec(),
            },
            ids::PUBLISH_I2C_DATA => Event::I2cData {
                device_id: r.u8()?,
                data: r.bytes_field()?.to_vec(),
            },
            ids::PUBLISH_DEBUG => Event::Debug {
                message: r.str_field()?.to_owned(),
            },
            ids::PUBLISH_PIN_ARRAY => Event::PinArray {
                data: r.bytes_field()?.to_vec(),
            },
            ids::PUBLISH_SERVO_EVENT => Event::ServoEvent {
                device_id: r.u8()?,
                event_type: r.u8()?,
                current_pos: r.i16()?,
                target_pos: r.i16()?,
            },
            ids::PUBLISH_SERIAL_DATA => Event::SerialData {
                device_id: r.u8()?,
                data: r.bytes_field()?.to_vec(),
            },
            ids::PUBLISH_ULTRASONIC_SENSOR_DATA => Event::UltrasonicSensorData {
                device_id: r.u8()?,
                echo_time: r.i16()?,
            },
            ids::PUBLISH_ENCODER_DATA => Event::EncoderData {
                device_id: r.u8()?,
                position: r.i16()?,
            },
            ids::PUBLISH_MRL_COMM_BEGIN => Event::MrlCommBegin { version: r.u8()? },
            other => return Err(DecodeError::UnknownMethod(other)),
        };
        r.finish().map_err(DecodeError::Codec)?;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use mrlcomm_codec::{Frame, MAGIC};

    use super::*;
    use crate::method::MRLCOMM_VERSION;

    fn frame_from_wire(wire: &[u8]) -> Frame {
        assert_eq!(wire[0], MAGIC);
        assert_eq!(wire[1] as usize + 2, wire.len());
        Frame::new(wire[2], wire[3..].to_vec())
    }

    #[test]
    fn servo_move_encodes_the_documented_bytes() {
        let mut wire = BytesMut::new();
        Command::ServoMoveToMicroseconds {
            device_id: 3,
            target: 1500,
        }
        .encode(&mut wire)
        .unwrap();
        assert_eq!(&wire[..], &[0xAA, 0x04, 0x26, 0x03, 0x05, 0xDC]);
    }

    #[test]
    fn servo_move_decodes_the_documented_bytes() {
        let frame = frame_from_wire(&[0xAA, 0x04, 0x26, 0x03, 0x05, 0xDC]);
        let command = Command::decode(&frame).unwrap();
        assert_eq!(
            command,
            Command::ServoMoveToMicroseconds {
                device_id: 3,
                target: 1500
            }
        );
    }

    #[test]
    fn commands_roundtrip() {
        let commands = [
            Command::GetBoardInfo,
            Command::EnablePin { address: 14, pin_type: 1, rate: 100 },
            Command::SetDebug { enabled: true },
            Command::SetSerialRate { rate: 115_200 },
            Command::SoftReset,
            Command::EnableAck { enabled: false },
            Command::Echo { my_float: 3.5, my_byte: 7, second_float: -0.25 },
            Command::CustomMsg { msg: vec![1, 2, 3] },
            Command::DeviceDetach { device_id: 2 },
            Command::I2cBusAttach { device_id: 1, i2c_bus: 0 },
            Command::I2cRead { device_id: 1, device_address: 0x68, size: 6 },
            Command::I2cWrite { device_id: 1, device_address: 0x68, data: vec![0x3B] },
            Command::I2cWriteRead { device_id: 1, device_address: 0x68, read_size: 2, write_value: 0x75 },
            Command::NeoPixelAttach { device_id: 4, pin: 6, num_pixels: 16 },
            Command::NeoPixelSetAnimation { device_id: 4, animation: 2, red: 255, green: 0, blue: 64, speed: 10 },
            Command::NeoPixelWriteMatrix { device_id: 4, buffer: vec![255, 0, 0] },
            Command::AnalogWrite { pin: 9, value: 128 },
            Command::DigitalWrite { pin: 13, value: 1 },
            Command::DisablePin { pin: 13 },
            Command::DisablePins,
            Command::PinMode { pin: 13, mode: 1 },
            Command::SetTrigger { pin: 14, trigger_value: 1 },
            Command::SetDebounce { pin: 14, delay: 50 },
            Command::ServoAttach { device_id: 0, pin: 9, init_pos: 90, init_velocity: -1, name: "pan".into() },
            Command::ServoAttachPin { device_id: 0, pin: 9 },
            Command::ServoDetachPin { device_id: 0 },
            Command::ServoSetVelocity { device_id: 0, velocity: 200 },
            Command::ServoSweepStart { device_id: 0, min: 10, max: 170, step: 1 },
            Command::ServoSweepStop { device_id: 0 },
            Command::ServoMoveToMicroseconds { device_id: 3, target: 1500 },
            Command::ServoSetAcceleration { device_id: 0, acceleration: -1 },
            Command::SerialAttach { device_id: 5, relay_pin: 10 },
            Command::SerialRelay { device_id: 5, data: vec![0x0D, 0x0A] },
            Command::UltrasonicSensorAttach { device_id: 6, trigger_pin: 7, echo_pin: 8 },
            Command::UltrasonicSensorStartRanging { device_id: 6 },
            Command::UltrasonicSensorStopRanging { device_id: 6 },
            Command::SetAref { aref: 1 },
            Command::MotorAttach { device_id: 7, motor_type: 2, pins: vec![3, 4] },
            Command::MotorMove { device_id: 7, power: 127 },
            Command::MotorMoveTo { device_id: 7, position: 42 },
            Command::EncoderAttach { device_id: 8, encoder_type: 1, pin: 2 },
            Command::SetZeroPoint { device_id: 8 },
            Command::ServoStop { device_id: 0 },
        ];

        for command in commands {
            let mut wire = BytesMut::new();
            command.encode(&mut wire).unwrap();
            assert_eq!(wire[1] as usize + 2, wire.len(), "{command:?}");
            assert!(wire.len() <= mrlcomm_codec::MAX_FRAME_SIZE);

            let decoded = Command::decode(&frame_from_wire(&wire)).unwrap();
            assert_eq!(decoded, command);
        }
    }

    #[test]
    fn events_roundtrip() {
        let events = [
            Event::MrlCommError { message: "bad pin".into() },
            Event::BoardInfo(BoardInfo {
                version: MRLCOMM_VERSION,
                board_type: 1,
                micros_per_loop: 120,
                sram: 1800,
                active_pins: 4,
                device_summary: vec![5, 5, 6],
            }),
            Event::Ack { method: ids::ECHO },
            Event::Echo { my_float: 1.25, my_byte: 255, second_float: -3.0 },
            Event::CustomMsg { msg: vec![9, 9] },
            Event::I2cData { device_id: 1, data: vec![0x12, 0x34] },
            Event::Debug { message: "loop".into() },
            Event::PinArray { data: vec![14, 1, 15, 0] },
            Event::ServoEvent { device_id: 0, event_type: 1, current_pos: 45, target_pos: 90 },
            Event::SerialData { device_id: 5, data: vec![b'o', b'k'] },
            Event::UltrasonicSensorData { device_id: 6, echo_time: 580 },
            Event::EncoderData { device_id: 8, position: -120 },
            Event::MrlCommBegin { version: MRLCOMM_VERSION },
        ];

        for event in events {
            let mut wire = BytesMut::new();
            event.encode(&mut wire).unwrap();
            assert_eq!(wire[1] as usize + 2, wire.len(), "{event:?}");
            assert!(wire.len() <= mrlcomm_codec::MAX_FRAME_SIZE);

            let decoded = Event::decode(&frame_from_wire(&wire)).unwrap();
            assert_eq!(decoded, event);
        }
    }

    #[test]
    fn event_decode_rejects_command_frames() {
        let frame = Frame::new(ids::GET_BOARD_INFO, Vec::new());
        let err = Event::decode(&frame).unwrap_err();
        assert!(matches!(err, DecodeError::WrongDirection { .. }));
    }

    #[test]
    fn command_decode_rejects_event_frames() {
        let frame = Frame::new(ids::PUBLISH_ACK, vec![10]);
        let err = Command::decode(&frame).unwrap_err();
        assert!(matches!(err, DecodeError::WrongDirection { .. }));
    }

    #[test]
    fn decode_rejects_unknown_method() {
        let frame = Frame::new(200, Vec::new());
        assert!(matches!(
            Event::decode(&frame).unwrap_err(),
            DecodeError::UnknownMethod(200)
        ));
    }

    #[test]
    fn decode_rejects_truncated_payload() {
        let frame = Frame::new(ids::PUBLISH_ECHO, vec![0x3F, 0x80]);
        assert!(matches!(
            Event::decode(&frame).unwrap_err(),
            DecodeError::Codec(_)
        ));
    }

    #[test]
    fn decode_rejects_excess_payload() {
        let frame = Frame::new(ids::PUBLISH_ACK, vec![10, 99]);
        assert!(matches!(
            Event::decode(&frame).unwrap_err(),
            DecodeError::Codec(mrlcomm_codec::CodecError::TrailingBytes { remaining: 1 })
        ));
    }
}
