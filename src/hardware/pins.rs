use embedded_hal::digital::v2::OutputPin;
use rp_pico::hal::gpio::DynPin;
use train_panel::charlieplex::{PinRole, TriStatePin};

pub type PinError = <DynPin as OutputPin>::Error;

/// GPIO that is reconfigured on every charlieplex slot.
pub struct CharliePin(DynPin);

impl CharliePin {
    /// Takes any GPIO and leaves it floating.
    pub fn new(pin: impl Into<DynPin>) -> Self {
        let mut pin = pin.into();
        pin.into_floating_input();
        CharliePin(pin)
    }
}

impl TriStatePin for CharliePin {
    type Error = PinError;

    fn set_role(&mut self, role: PinRole) -> Result<(), PinError> {
        match role {
            PinRole::HighZ => {
                self.0.into_floating_input();
                Ok(())
            }
            // The output latch may hold a stale level for a moment. Every other
            // pin is floating by now, so at worst this slot's own LED lights early.
            PinRole::DriveHigh => {
                self.0.into_push_pull_output();
                self.0.set_high()
            }
            PinRole::DriveLow => {
                self.0.into_push_pull_output();
                self.0.set_low()
            }
        }
    }
}

/// Matrix column: push-pull output.
#[cfg(not(feature = "serial-only"))]
pub fn column(pin: impl Into<DynPin>) -> DynPin {
    let mut pin = pin.into();
    pin.into_push_pull_output();
    pin
}

/// Matrix row: pulled down, a closed switch pulls it up through its diode.
#[cfg(not(feature = "serial-only"))]
pub fn row(pin: impl Into<DynPin>) -> DynPin {
    let mut pin = pin.into();
    pin.into_pull_down_input();
    pin
}

/// Encoder phase line, common to ground.
#[cfg(not(feature = "serial-only"))]
pub fn encoder_line(pin: impl Into<DynPin>) -> DynPin {
    let mut pin = pin.into();
    pin.into_pull_up_input();
    pin
}
