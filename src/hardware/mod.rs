//! RP2040 bring-up shared by both firmware variants.

#[cfg(not(feature = "serial-only"))]
pub mod hid;
pub mod pins;
pub mod usb;

use defmt::unwrap;
use rp_pico as bsp;

use bsp::{
    hal::{
        adc::Adc, clocks::init_clocks_and_plls, sio::Sio, usb::UsbBus, watchdog::Watchdog, Timer,
    },
    pac::Peripherals,
    Pins,
};
use usb_device::class_prelude::UsbBusAllocator;

pub struct Board {
    pub pins: Pins,
    pub timer: Timer,
    #[cfg_attr(feature = "serial-only", allow(dead_code))]
    pub adc: Adc,
    pub usb_bus: &'static UsbBusAllocator<UsbBus>,
}

impl Board {
    /// Clocks, timer, GPIO bank, ADC and the USB bus. Panics if called twice.
    pub fn take() -> Board {
        let mut pac = unwrap!(Peripherals::take());
        let mut watchdog = Watchdog::new(pac.WATCHDOG);

        let clocks = unwrap!(init_clocks_and_plls(
            bsp::XOSC_CRYSTAL_FREQ,
            pac.XOSC,
            pac.CLOCKS,
            pac.PLL_SYS,
            pac.PLL_USB,
            &mut pac.RESETS,
            &mut watchdog,
        )
        .ok());

        let timer = Timer::new(pac.TIMER, &mut pac.RESETS);

        let sio = Sio::new(pac.SIO);

        let pins = Pins::new(
            pac.IO_BANK0,
            pac.PADS_BANK0,
            sio.gpio_bank0,
            &mut pac.RESETS,
        );

        let adc = Adc::new(pac.ADC, &mut pac.RESETS);

        let usb_bus: &'static UsbBusAllocator<UsbBus> = unwrap!(cortex_m::singleton!(
            : UsbBusAllocator<UsbBus> = UsbBusAllocator::new(UsbBus::new(
                pac.USBCTRL_REGS,
                pac.USBCTRL_DPRAM,
                clocks.usb_clock,
                true,
                &mut pac.RESETS,
            ))
        ));

        Board {
            pins,
            timer,
            adc,
            usb_bus,
        }
    }
}
