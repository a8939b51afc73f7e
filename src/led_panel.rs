use defmt::{error, info, unwrap};
use embedded_hal::{
    digital::v2::{OutputPin, PinState},
    timer::CountDown,
};
use usbd_serial::SerialPort;

use train_panel::{
    charlieplex::{Charlieplex, LedStates},
    command::READY_SERIAL_ONLY,
    config::TIMING,
    wiring::{self, LED_COUNT},
};

use crate::hardware::{
    pins::CharliePin,
    usb::{serial_device, CommandPort},
    Board,
};

pub fn run() -> ! {
    let Board {
        pins,
        timer,
        usb_bus,
        ..
    } = Board::take();

    unwrap!(wiring::check_pins(&wiring::SERIAL_ONLY_PINS));
    unwrap!(TIMING.validate(LED_COUNT));
    info!(
        "train-panel serial-only: {} LEDs at {} Hz",
        LED_COUNT,
        TIMING.refresh_hz(LED_COUNT)
    );

    let mut serial = SerialPort::new(usb_bus);
    let mut usb_dev = serial_device(usb_bus);

    let plex_pins = [
        CharliePin::new(pins.gpio13),
        CharliePin::new(pins.gpio14),
        CharliePin::new(pins.gpio15),
        CharliePin::new(pins.gpio16),
        CharliePin::new(pins.gpio17),
    ];
    let mut plex = unwrap!(Charlieplex::new(plex_pins, wiring::LEDS));
    let mut leds = LedStates::<LED_COUNT>::new();
    let mut port = CommandPort::new(READY_SERIAL_ONLY);

    let mut tick_count_down = timer.count_down();
    tick_count_down.start(TIMING.tick);

    let mut led_on = false;
    let mut led_pin = pins.led.into_push_pull_output();
    let mut blink_count_down = timer.count_down();
    blink_count_down.start(TIMING.heartbeat);

    loop {
        if blink_count_down.wait().is_ok() {
            led_on = !led_on;
            led_pin.set_state(PinState::from(led_on)).ok();
        }

        usb_dev.poll(&mut [&mut serial]);
        port.service(&mut serial, &mut leds);

        if tick_count_down.wait().is_ok() {
            if let Err(e) = plex.step(&leds) {
                error!("charlieplex: {}", defmt::Debug2Format(&e));
            }
        }
    }
}
