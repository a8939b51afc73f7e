//! USB device setup and the CDC command port.

use defmt::{debug, info, warn};
use usb_device::{
    class_prelude::{UsbBus, UsbBusAllocator},
    device::{UsbDevice, UsbDeviceBuilder, UsbVidPid},
    UsbError,
};
use usbd_serial::SerialPort;

use train_panel::{
    charlieplex::LedStates,
    command::{CommandInterpreter, Greeter, LINE_LEN},
    wiring,
};

pub(super) const VID_PID: UsbVidPid = UsbVidPid(0x1209, 0x0001);
pub(super) const MANUFACTURER: &str = "train-panel";

/// CDC serial only.
#[cfg(feature = "serial-only")]
pub fn serial_device<B: UsbBus>(usb_bus: &UsbBusAllocator<B>) -> UsbDevice<'_, B> {
    UsbDeviceBuilder::new(usb_bus, VID_PID)
        .manufacturer(MANUFACTURER)
        .product("Train Panel LEDs")
        .serial_number("TP13")
        .device_class(usbd_serial::USB_CLASS_CDC)
        .build()
}

/// Serial line handling: LED commands in, ready banner out.
pub struct CommandPort {
    interpreter: CommandInterpreter<'static, LINE_LEN>,
    greeter: Greeter,
    connected: bool,
}

impl CommandPort {
    pub fn new(banner: &'static [u8]) -> Self {
        CommandPort {
            interpreter: CommandInterpreter::new(&wiring::LED_COMMANDS),
            greeter: Greeter::new(banner),
            connected: false,
        }
    }

    /// Drains received bytes into `leds` and pushes out any pending banner.
    pub fn service<B: UsbBus, const LEDS: usize>(
        &mut self,
        serial: &mut SerialPort<'_, B>,
        leds: &mut LedStates<LEDS>,
    ) {
        let mut buf = [0u8; 64];
        match serial.read(&mut buf) {
            Ok(n) if n > 0 => {
                let applied = self.interpreter.feed(&buf[..n], leds);
                if applied > 0 {
                    debug!("serial: {} command(s), {} LED(s) on", applied, leds.count_on());
                }
            }
            Ok(_) | Err(UsbError::WouldBlock) => {}
            Err(e) => warn!("serial read: {}", defmt::Debug2Format(&e)),
        }

        let dtr = serial.dtr();
        if dtr != self.connected {
            info!("serial: host {}", if dtr { "connected" } else { "gone" });
            self.connected = dtr;
        }
        self.greeter.set_dtr(dtr);

        let pending = self.greeter.pending();
        if pending.is_empty() {
            return;
        }
        match serial.write(pending) {
            Ok(n) => self.greeter.consumed(n),
            Err(UsbError::WouldBlock) => {}
            Err(e) => warn!("serial write: {}", defmt::Debug2Format(&e)),
        }
    }
}
