#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

cfg_if::cfg_if! {
    if #[cfg(target_os = "none")] {
        use defmt_rtt as _;
        use panic_probe as _;

        mod hardware;
        #[cfg(not(feature = "serial-only"))]
        mod joystick_panel;
        #[cfg(feature = "serial-only")]
        mod led_panel;

        #[rp_pico::entry]
        fn main() -> ! {
            start()
        }

        fn start() -> ! {
            cfg_if::cfg_if! {
                if #[cfg(feature = "serial-only")] {
                    led_panel::run()
                } else {
                    joystick_panel::run()
                }
            }
        }
    } else {
        fn main() {
            eprintln!("train-panel is RP2040 firmware, build it with --target thumbv6m-none-eabi");
        }
    }
}
