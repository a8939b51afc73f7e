use defmt::{error, info, unwrap};
use embedded_hal::{
    adc::{Channel, OneShot},
    digital::v2::{OutputPin, PinState},
    timer::CountDown,
};
use usb_device::device::UsbDeviceState;
use usbd_human_interface_device::{usb_class::UsbHidClassBuilder, UsbHidError};
use usbd_serial::SerialPort;

use rp_pico::hal::{adc::Adc, usb::UsbBus};

use train_panel::{
    buttonmatrix::{ActiveLevel, ButtonMatrix},
    charlieplex::{Charlieplex, LedStates},
    command::READY_JOYSTICK,
    config::TIMING,
    debounce::Debouncer,
    encoder::RotaryEncoder,
    joystick::{scale_adc, InputAggregator, Inputs},
    wiring::{self, LED_COUNT},
};

use crate::hardware::{
    hid::{composite_device, PanelJoystick, PanelJoystickConfig},
    pins::{column, encoder_line, row, CharliePin},
    usb::CommandPort,
    Board,
};

fn sample<PIN>(adc: &mut Adc, pin: &mut PIN) -> Option<u16>
where
    PIN: Channel<Adc>,
    Adc: OneShot<Adc, u16, PIN>,
{
    adc.read(pin).ok().map(scale_adc)
}

pub fn run() -> ! {
    let Board {
        pins,
        timer,
        mut adc,
        usb_bus,
    } = Board::take();

    unwrap!(wiring::check_pins(&wiring::JOYSTICK_PINS));
    unwrap!(TIMING.validate(LED_COUNT));
    info!(
        "train-panel joystick: {} LEDs at {} Hz, debounce {} ms",
        LED_COUNT,
        TIMING.refresh_hz(LED_COUNT),
        TIMING.debounce.to_millis()
    );

    let mut hid = UsbHidClassBuilder::new()
        .add_device(PanelJoystickConfig::default())
        .build(usb_bus);
    let mut serial = SerialPort::new(usb_bus);
    let mut usb_dev = composite_device(usb_bus);

    // GPIO numbers as in wiring::JOYSTICK_PINS.
    let rows = [
        row(pins.gpio2),
        row(pins.gpio3),
        row(pins.gpio4),
        row(pins.gpio5),
        row(pins.gpio6),
    ];
    let cols = [
        column(pins.gpio7),
        column(pins.gpio8),
        column(pins.gpio9),
        column(pins.gpio10),
        column(pins.gpio11),
        column(pins.gpio12),
    ];
    let mut butmat = unwrap!(ButtonMatrix::new(cols, rows, ActiveLevel::High).ok());
    let mut debouncer = Debouncer::new(TIMING.debounce);

    let plex_pins = [
        CharliePin::new(pins.gpio13),
        CharliePin::new(pins.gpio14),
        CharliePin::new(pins.gpio15),
        CharliePin::new(pins.gpio16),
        CharliePin::new(pins.gpio17),
    ];
    let mut plex = unwrap!(Charlieplex::new(plex_pins, wiring::LEDS));
    let mut leds = LedStates::<LED_COUNT>::new();

    let mut encoder = unwrap!(RotaryEncoder::new(
        encoder_line(pins.gpio18),
        encoder_line(pins.gpio19),
        TIMING.encoder_pulse,
    )
    .ok());

    let mut slider_x = pins.gpio26.into_floating_input();
    let mut slider_y = pins.gpio27.into_floating_input();
    let mut slider_z = pins.gpio28.into_floating_input();

    let mut aggregator = InputAggregator::new(TIMING.slider_hysteresis);
    let mut port = CommandPort::new(READY_JOYSTICK);

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

        usb_dev.poll(&mut [&mut hid, &mut serial]);
        port.service(&mut serial, &mut leds);

        if tick_count_down.wait().is_err() {
            continue;
        }
        let now = timer.get_counter();

        if let Err(e) = plex.step(&leds) {
            error!("charlieplex: {}", defmt::Debug2Format(&e));
        }
        if let Err(e) = butmat.step(&mut debouncer, now) {
            error!("matrix: {}", defmt::Debug2Format(&e));
        }
        let pulse = match encoder.poll(now) {
            Ok(pulse) => pulse,
            Err(e) => {
                error!("encoder: {}", defmt::Debug2Format(&e));
                None
            }
        };
        let sliders = [
            sample(&mut adc, &mut slider_x),
            sample(&mut adc, &mut slider_y),
            sample(&mut adc, &mut slider_z),
        ];
        let report = aggregator.build(&Inputs {
            matrix: &debouncer,
            encoder: pulse,
            sliders,
        });

        if usb_dev.state() == UsbDeviceState::Configured {
            let joystick: &mut PanelJoystick<'_, UsbBus> = hid.device();
            if let Err(e) = aggregator.push(joystick, &report) {
                error!("hid report: {}", defmt::Debug2Format(&e));
            }
        } else {
            // The host wants a fresh report after (re)enumeration.
            aggregator.resend();
        }

        match hid.tick() {
            Ok(()) | Err(UsbHidError::WouldBlock) => {}
            Err(e) => error!("hid tick: {}", defmt::Debug2Format(&e)),
        }
    }
}
