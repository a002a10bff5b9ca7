use mrlcomm_registry::{ids, method_name, BoardInfo, Event};
use tracing::debug;

/// Receives decoded device events, one named callback per event method.
///
/// Every callback has a default implementation that forwards to
/// [`on_unhandled`], so implementors override only the events they care
/// about. Callbacks run on the thread driving [`Link::feed`] and should not
/// block it for long.
///
/// [`on_unhandled`]: MrlHandler::on_unhandled
/// [`Link::feed`]: crate::link::Link::feed
pub trait MrlHandler: Send + Sync {
    /// The device's startup handshake. Delivered even while the link is
    /// otherwise gated; the link flips to synchronized before this fires.
    fn on_mrl_comm_begin(&self, version: u8) {
        let _ = version;
    }

    fn on_mrlcomm_error(&self, message: &str) {
        let _ = message;
        self.on_unhandled(ids::PUBLISH_MRLCOMM_ERROR);
    }

    fn on_board_info(&self, info: &BoardInfo) {
        let _ = info;
        self.on_unhandled(ids::PUBLISH_BOARD_INFO);
    }

    /// An acknowledgement. The link's ack controller consumes these before
    /// dispatch; override only for diagnostics.
    fn on_ack(&self, method: u8) {
        let _ = method;
    }

    fn on_echo(&self, my_float: f32, my_byte: u8, second_float: f32) {
        let _ = (my_float, my_byte, second_float);
        self.on_unhandled(ids::PUBLISH_ECHO);
    }

    fn on_custom_msg(&self, msg: &[u8]) {
        let _ = msg;
        self.on_unhandled(ids::PUBLISH_CUSTOM_MSG);
    }

    fn on_i2c_data(&self, device_id: u8, data: &[u8]) {
        let _ = (device_id, data);
        self.on_unhandled(ids::PUBLISH_I2C_DATA);
    }

    fn on_debug(&self, message: &str) {
        let _ = message;
        self.on_unhandled(ids::PUBLISH_DEBUG);
    }

    fn on_pin_array(&self, data: &[u8]) {
        let _ = data;
        self.on_unhandled(ids::PUBLISH_PIN_ARRAY);
    }

    fn on_servo_event(&self, device_id: u8, event_type: u8, current_pos: i16, target_pos: i16) {
        let _ = (device_id, event_type, current_pos, target_pos);
        self.on_unhandled(ids::PUBLISH_SERVO_EVENT);
    }

    fn on_serial_data(&self, device_id: u8, data: &[u8]) {
        let _ = (device_id, data);
        self.on_unhandled(ids::PUBLISH_SERIAL_DATA);
    }

    fn on_ultrasonic_sensor_data(&self, device_id: u8, echo_time: i16) {
        let _ = (device_id, echo_time);
        self.on_unhandled(ids::PUBLISH_ULTRASONIC_SENSOR_DATA);
    }

    fn on_encoder_data(&self, device_id: u8, position: i16) {
        let _ = (device_id, position);
        self.on_unhandled(ids::PUBLISH_ENCODER_DATA);
    }

    /// A known event no specific callback consumed.
    fn on_unhandled(&self, method: u8) {
        debug!(method, name = method_name(method), "unhandled event");
    }

    /// A frame start carried a method id that is not in the registry. The
    /// frame was discarded before decode.
    fn on_unknown(&self, method: u8) {
        let _ = method;
    }

    /// A sent command was never acknowledged within the timeout. Best-effort
    /// signal; the protocol does not retransmit.
    fn on_ack_timeout(&self, method: u8) {
        let _ = method;
    }
}

/// Route a decoded event to its named callback.
pub fn dispatch(handler: &dyn MrlHandler, event: &Event) {
    match event {
        Event::MrlCommBegin { version } => handler.on_mrl_comm_begin(*version),
        Event::MrlCommError { message } => handler.on_mrlcomm_error(message),
        Event::BoardInfo(info) => handler.on_board_info(info),
        Event::Ack { method } => handler.on_ack(*method),
        Event::Echo {
            my_float,
            my_byte,
            second_float,
        } => handler.on_echo(*my_float, *my_byte, *second_float),
        Event::CustomMsg { msg } => handler.on_custom_msg(msg),
        Event::I2cData { device_id, data } => handler.on_i2c_data(*device_id, data),
        Event::Debug { message } => handler.on_debug(message),
        Event::PinArray { data } => handler.on_pin_array(data),
        Event::ServoEvent {
            device_id,
            event_type,
            current_pos,
            target_pos,
        } => handler.on_servo_event(*device_id, *event_type, *current_pos, *target_pos),
        Event::SerialData { device_id, data } => handler.on_serial_data(*device_id, data),
        Event::UltrasonicSensorData {
            device_id,
            echo_time,
        } => handler.on_ultrasonic_sensor_data(*device_id, *echo_time),
        Event::EncoderData {
            device_id,
            position,
        } => handler.on_encoder_data(*device_id, *position),
    }
}

/// Observes the exact bytes crossing the link, for diagnostic recording.
///
/// `rendered` is a human-readable form of the decoded call
/// (`name/field/field/...`), matching what a traffic log wants to show next
/// to the raw bytes.
pub trait WireTap: Send + Sync {
    /// A frame that was just written to the transport.
    fn on_tx(&self, bytes: &[u8], rendered: &str);

    /// A frame that was just reassembled from the transport.
    fn on_rx(&self, bytes: &[u8], rendered: &str);
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        named: Mutex<Vec<String>>,
        unhandled: Mutex<Vec<u8>>,
    }

    impl MrlHandler for Recorder {
        fn on_servo_event(
            &self,
            device_id: u8,
            event_type: u8,
            current_pos: i16,
            target_pos: i16,
        ) {
            self.named.lock().unwrap().push(format!(
                "servo/{device_id}/{event_type}/{current_pos}/{target_pos}"
            ));
        }

        fn on_unhandled(&self, method: u8) {
            self.unhandled.lock().unwrap().push(method);
        }
    }

    #[test]
    fn dispatch_reaches_the_named_callback() {
        let recorder = Recorder::default();
        dispatch(
            &recorder,
            &Event::ServoEvent {
                device_id: 1,
                event_type: 0,
                current_pos: 45,
                target_pos: 90,
            },
        );
        assert_eq!(
            recorder.named.lock().unwrap().as_slice(),
            &["servo/1/0/45/90".to_string()]
        );
        assert!(recorder.unhandled.lock().unwrap().is_empty());
    }

    #[test]
    fn unoverridden_events_fall_through_to_unhandled() {
        let recorder = Recorder::default();
        dispatch(
            &recorder,
            &Event::EncoderData {
                device_id: 2,
                position: -5,
            },
        );
        assert_eq!(
            recorder.unhandled.lock().unwrap().as_slice(),
            &[ids::PUBLISH_ENCODER_DATA]
        );
    }

    #[test]
    fn begin_and_ack_default_to_silent_consumption() {
        let recorder = Recorder::default();
        dispatch(&recorder, &Event::MrlCommBegin { version: 64 });
        dispatch(&recorder, &Event::Ack { method: 10 });
        assert!(recorder.unhandled.lock().unwrap().is_empty());
    }
}
