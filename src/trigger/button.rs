use chrono::Utc;
use rppal::gpio::{Gpio, InputPin, Level, Trigger};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::TriggerEvent;
use crate::config::ConfigButton;

/// Owns the doorbell input pin. The edge interrupt stays bound for as long
/// as this handle is alive; dropping it unbinds the interrupt.
pub struct DoorbellButton {
    _pin: InputPin,
}

impl DoorbellButton {
    /// Binds the "pressed" edge of the configured pin to the trigger queue.
    ///
    /// The button shorts the pin to ground, so the pin idles high on the
    /// internal pull-up and a press arrives as a falling edge. Edge
    /// detection itself is the GPIO driver's job; every delivered edge is
    /// forwarded as one event.
    pub fn bind(
        config: &ConfigButton,
        queue: mpsc::UnboundedSender<TriggerEvent>,
    ) -> Result<DoorbellButton, TriggerError> {
        let gpio = Gpio::new()?;
        let mut pin = gpio.get(config.pin)?.into_input_pullup();
        pin.set_async_interrupt(Trigger::FallingEdge, move |_level: Level| {
            let sent = queue.send(TriggerEvent {
                pressed_at: Utc::now(),
            });
            if sent.is_err() {
                debug!("Capture loop gone, dropping button press");
            }
        })?;
        info!("Doorbell button bound to GPIO {}", config.pin);
        Ok(DoorbellButton { _pin: pin })
    }
}

quick_error! {
    #[derive(Debug)]
    pub enum TriggerError {
        Gpio(error: rppal::gpio::Error) {
            from()
            display("Unable to bind doorbell button: {}", error)
            source(error)
        }
    }
}
