//! Timing configuration.
//!
//! The main loop runs on a fixed tick. Every tick advances exactly one LED slot and
//! one matrix column, so the tick alone sets both the LED refresh rate and how often
//! each switch is sampled.

use crate::{wiring, Duration};

/// Lowest full-cycle LED refresh that still reads as steady light.
pub const MIN_REFRESH_HZ: u32 = 60;
/// Lowest main-loop rate that keeps debounce latency and LED refresh in bounds.
pub const MIN_LOOP_HZ: u32 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum ConfigError {
    ZeroSlotInterval,
    LoopTooSlow { hz: u32 },
    RefreshTooSlow { hz: u32 },
}

/// Each switch is sampled once per [`sweep`](PanelTiming::sweep), so a press is
/// only guaranteed to register once it has been held for `debounce + sweep()`
/// (11 ms with [`TIMING`]). Shorter holds register only when they line up with
/// the column samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanelTiming {
    /// Main-loop period. One LED slot and one matrix column per tick.
    pub tick: Duration,
    /// A switch must read the same for this long before its state flips.
    pub debounce: Duration,
    /// How long an encoder detent holds its joystick button.
    pub encoder_pulse: Duration,
    /// Slider changes smaller than this many counts are ignored.
    pub slider_hysteresis: u16,
    /// Status LED toggle period.
    pub heartbeat: Duration,
    /// Interrupt IN endpoint interval of the HID interface.
    pub hid_poll: Duration,
}

pub const TIMING: PanelTiming = PanelTiming {
    tick: Duration::millis(1),
    debounce: Duration::millis(5),
    encoder_pulse: Duration::millis(30),
    slider_hysteresis: 4,
    heartbeat: Duration::millis(500),
    hid_poll: Duration::millis(10),
};

impl PanelTiming {
    pub const fn loop_hz(&self) -> u32 {
        if self.tick.ticks() == 0 {
            return 0;
        }
        (1_000_000 / self.tick.ticks()) as u32
    }

    /// Full multiplex cycles per second for a table of `led_count` LEDs.
    pub const fn refresh_hz(&self, led_count: usize) -> u32 {
        let cycle = self.tick.ticks() * led_count as u64;
        if cycle == 0 {
            return 0;
        }
        (1_000_000 / cycle) as u32
    }

    /// Time for the scanner to visit every column once.
    pub const fn sweep(&self) -> Duration {
        Duration::from_ticks(self.tick.ticks() * wiring::COLS as u64)
    }

    pub const fn validate(&self, led_count: usize) -> Result<(), ConfigError> {
        if self.tick.ticks() == 0 {
            return Err(ConfigError::ZeroSlotInterval);
        }
        let hz = self.loop_hz();
        if hz < MIN_LOOP_HZ {
            return Err(ConfigError::LoopTooSlow { hz });
        }
        let hz = self.refresh_hz(led_count);
        if hz < MIN_REFRESH_HZ {
            return Err(ConfigError::RefreshTooSlow { hz });
        }
        Ok(())
    }
}

const _: () = assert!(
    TIMING.validate(wiring::LED_COUNT).is_ok(),
    "LED refresh or loop rate below contract"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_timing_meets_refresh_contract() {
        assert_eq!(TIMING.validate(wiring::LED_COUNT), Ok(()));
        assert_eq!(TIMING.loop_hz(), 1000);
        assert_eq!(TIMING.refresh_hz(13), 76);
        assert_eq!(TIMING.refresh_hz(12), 83);
        assert_eq!(TIMING.sweep(), Duration::millis(6));
        assert_eq!(TIMING.debounce + TIMING.sweep(), Duration::millis(11));
    }

    #[test]
    fn slow_slots_are_rejected() {
        // 2 ms per slot is fine for the loop but 13 LEDs only refresh at 38 Hz.
        let slow = PanelTiming {
            tick: Duration::millis(2),
            ..TIMING
        };
        assert_eq!(slow.validate(13), Err(ConfigError::RefreshTooSlow { hz: 38 }));
        assert_eq!(slow.validate(8), Ok(()));

        let crawling = PanelTiming {
            tick: Duration::millis(4),
            ..TIMING
        };
        assert_eq!(crawling.validate(1), Err(ConfigError::LoopTooSlow { hz: 250 }));

        let zero = PanelTiming {
            tick: Duration::micros(0),
            ..TIMING
        };
        assert_eq!(zero.validate(13), Err(ConfigError::ZeroSlotInterval));
    }
}
