//! Static wiring of the panel.
//!
//! Pico GPIO numbers for every role, the 13-LED charlieplex table, the serial
//! command names and the joystick button map. Nothing here changes at runtime.
//! The tables are checked at compile time (see the `const` assertions at the
//! bottom), and the firmware repeats the pin check once at boot.

use crate::charlieplex::{check_leds, LedPins};

/// Matrix rows, read as pull-down inputs. Diode cathodes face these pins.
pub const ROWS: usize = 5;
/// Matrix columns, driven high one at a time.
pub const COLS: usize = 6;

pub const ROW_GPIOS: [u8; ROWS] = [2, 3, 4, 5, 6];
pub const COL_GPIOS: [u8; COLS] = [7, 8, 9, 10, 11, 12];

/// Charlieplex pool, A..E.
pub const CHARLIEPLEX_PINS: usize = 5;
pub const CHARLIEPLEX_GPIOS: [u8; CHARLIEPLEX_PINS] = [13, 14, 15, 16, 17];

/// Quadrature encoder CLK, DT.
pub const ENCODER_GPIOS: [u8; 2] = [18, 19];
/// Slider wipers X, Y, Z (ADC0..ADC2).
pub const SLIDER_GPIOS: [u8; 3] = [26, 27, 28];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum PinFunction {
    MatrixRow,
    MatrixColumn,
    Charlieplex,
    Encoder,
    Slider,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum WiringError {
    /// The same GPIO shows up under two roles.
    PinConflict { gpio: u8 },
    EmptyLedTable,
    LedPinOutOfRange { led: usize },
    LedSelfLoop { led: usize },
    DuplicateLed { led: usize },
    ButtonOutOfRange { button: u8 },
    DuplicateButton { button: u8 },
}

const A: u8 = 0;
const B: u8 = 1;
const C: u8 = 2;
const D: u8 = 3;
const E: u8 = 4;

pub const LED_COUNT: usize = 13;

/// LED1..LED13 as (drive, sink) pairs over pins A..E.
#[rustfmt::skip]
pub const LEDS: [LedPins; LED_COUNT] = [
    LedPins::new(A, B), // 1  SIFA
    LedPins::new(B, A), // 2  LZB Ende
    LedPins::new(A, C), // 3  PZB 70
    LedPins::new(C, A), // 4  PZB 85
    LedPins::new(B, C), // 5  PZB 55
    LedPins::new(C, B), // 6  500 Hz
    LedPins::new(A, D), // 7  1000 Hz
    LedPins::new(D, A), // 8  doors left
    LedPins::new(B, D), // 9  doors right
    LedPins::new(C, D), // 10 LZB Ü
    LedPins::new(D, B), // 11 LZB G
    LedPins::new(D, C), // 12 LZB S
    LedPins::new(A, E), // 13 Befehl 40
];

/// First `N` entries of [`LEDS`].
///
/// The older 12-LED panel is wired as `led_subset::<12>()` over pins A..D only.
pub const fn led_subset<const N: usize>() -> [LedPins; N] {
    let mut out = [LedPins::new(0, 0); N];
    let mut i = 0;
    while i < N {
        out[i] = LEDS[i];
        i += 1;
    }
    out
}

/// Serial command names and the 0-based LED they address.
///
/// `PZB80`/`PZB50` are the spellings from the wiring notes, `PZB85`/`PZB55` the
/// ones the PC bridge sends. Both are accepted.
#[rustfmt::skip]
pub const LED_COMMANDS: [(&str, usize); 15] = [
    ("SIFA", 0),
    ("LZB", 1),
    ("PZB70", 2),
    ("PZB85", 3), ("PZB80", 3),
    ("PZB55", 4), ("PZB50", 4),
    ("500HZ", 5),
    ("1000HZ", 6),
    ("TUEREN_L", 7),
    ("TUEREN_R", 8),
    ("LZB_UE", 9),
    ("LZB_G", 10),
    ("LZB_S", 11),
    ("BEF40", 12),
];

/// Buttons carried by the HID report. Bits 30 and 31 are padding.
pub const BUTTON_COUNT: usize = 30;

/// Joystick button for every matrix cell. `None` cells are scanned but unused.
#[rustfmt::skip]
pub const BUTTON_GRID: [[Option<u8>; COLS]; ROWS] = [
    // BTN1/pedal, ROT4 1-4,                              ENC_SW
    [ Some(17), Some(18), Some(19), Some(20), Some(21), Some(16) ],
    // SW1-SW5 up,                                        TOG1 up
    [ Some(0),  Some(2),  Some(4),  Some(6),  Some(8),  Some(22) ],
    // SW1-SW5 down,                                      TOG1 down
    [ Some(1),  Some(3),  Some(5),  Some(7),  Some(9),  Some(23) ],
    // SW6-SW8 up,                  ROT3 1-2,             TOG2 up
    [ Some(10), Some(12), Some(14), Some(24), Some(25), Some(26) ],
    // SW6-SW8 down,                empty,                TOG2 down
    [ Some(11), Some(13), Some(15), None,     None,     Some(27) ],
];

/// Momentary buttons pulsed by encoder detents.
pub const ENCODER_CW_BUTTON: u8 = 28;
pub const ENCODER_CCW_BUTTON: u8 = 29;

/// Every GPIO the joystick variant claims.
#[rustfmt::skip]
pub const JOYSTICK_PINS: [(u8, PinFunction); 21] = [
    (ROW_GPIOS[0], PinFunction::MatrixRow),
    (ROW_GPIOS[1], PinFunction::MatrixRow),
    (ROW_GPIOS[2], PinFunction::MatrixRow),
    (ROW_GPIOS[3], PinFunction::MatrixRow),
    (ROW_GPIOS[4], PinFunction::MatrixRow),
    (COL_GPIOS[0], PinFunction::MatrixColumn),
    (COL_GPIOS[1], PinFunction::MatrixColumn),
    (COL_GPIOS[2], PinFunction::MatrixColumn),
    (COL_GPIOS[3], PinFunction::MatrixColumn),
    (COL_GPIOS[4], PinFunction::MatrixColumn),
    (COL_GPIOS[5], PinFunction::MatrixColumn),
    (CHARLIEPLEX_GPIOS[0], PinFunction::Charlieplex),
    (CHARLIEPLEX_GPIOS[1], PinFunction::Charlieplex),
    (CHARLIEPLEX_GPIOS[2], PinFunction::Charlieplex),
    (CHARLIEPLEX_GPIOS[3], PinFunction::Charlieplex),
    (CHARLIEPLEX_GPIOS[4], PinFunction::Charlieplex),
    (ENCODER_GPIOS[0], PinFunction::Encoder),
    (ENCODER_GPIOS[1], PinFunction::Encoder),
    (SLIDER_GPIOS[0], PinFunction::Slider),
    (SLIDER_GPIOS[1], PinFunction::Slider),
    (SLIDER_GPIOS[2], PinFunction::Slider),
];

/// Every GPIO the serial-only variant claims.
#[rustfmt::skip]
pub const SERIAL_ONLY_PINS: [(u8, PinFunction); CHARLIEPLEX_PINS] = [
    (CHARLIEPLEX_GPIOS[0], PinFunction::Charlieplex),
    (CHARLIEPLEX_GPIOS[1], PinFunction::Charlieplex),
    (CHARLIEPLEX_GPIOS[2], PinFunction::Charlieplex),
    (CHARLIEPLEX_GPIOS[3], PinFunction::Charlieplex),
    (CHARLIEPLEX_GPIOS[4], PinFunction::Charlieplex),
];

/// Rejects a pin table in which any GPIO appears more than once.
pub const fn check_pins(table: &[(u8, PinFunction)]) -> Result<(), WiringError> {
    let mut i = 0;
    while i < table.len() {
        let mut j = i + 1;
        while j < table.len() {
            if table[i].0 == table[j].0 {
                return Err(WiringError::PinConflict { gpio: table[i].0 });
            }
            j += 1;
        }
        i += 1;
    }
    Ok(())
}

/// Rejects a button grid that maps a button twice or past the report.
pub const fn check_buttons(grid: &[[Option<u8>; COLS]; ROWS]) -> Result<(), WiringError> {
    let mut seen = [false; 32];
    let extra = [ENCODER_CW_BUTTON, ENCODER_CCW_BUTTON];
    let mut row = 0;
    while row < ROWS {
        let mut col = 0;
        while col < COLS {
            if let Some(button) = grid[row][col] {
                if button as usize >= BUTTON_COUNT {
                    return Err(WiringError::ButtonOutOfRange { button });
                }
                if seen[button as usize] {
                    return Err(WiringError::DuplicateButton { button });
                }
                seen[button as usize] = true;
            }
            col += 1;
        }
        row += 1;
    }
    let mut i = 0;
    while i < extra.len() {
        let button = extra[i];
        if button as usize >= BUTTON_COUNT {
            return Err(WiringError::ButtonOutOfRange { button });
        }
        if seen[button as usize] {
            return Err(WiringError::DuplicateButton { button });
        }
        seen[button as usize] = true;
        i += 1;
    }
    Ok(())
}

const _: () = assert!(check_pins(&JOYSTICK_PINS).is_ok(), "GPIO assigned twice");
const _: () = assert!(check_pins(&SERIAL_ONLY_PINS).is_ok(), "GPIO assigned twice");
const _: () = assert!(check_leds(&LEDS, CHARLIEPLEX_PINS).is_ok(), "bad LED table");
const _: () = assert!(check_buttons(&BUTTON_GRID).is_ok(), "bad button map");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_tables_are_consistent() {
        assert_eq!(check_pins(&JOYSTICK_PINS), Ok(()));
        assert_eq!(check_pins(&SERIAL_ONLY_PINS), Ok(()));
        assert_eq!(check_leds(&LEDS, CHARLIEPLEX_PINS), Ok(()));
        assert_eq!(check_buttons(&BUTTON_GRID), Ok(()));
    }

    #[test]
    fn pin_conflict_names_the_gpio() {
        let table = [
            (2, PinFunction::MatrixRow),
            (13, PinFunction::Charlieplex),
            (2, PinFunction::Charlieplex),
        ];
        assert_eq!(check_pins(&table), Err(WiringError::PinConflict { gpio: 2 }));
    }

    #[test]
    fn button_grid_rejects_duplicates() {
        let mut grid = BUTTON_GRID;
        grid[4][3] = Some(0);
        assert_eq!(check_buttons(&grid), Err(WiringError::DuplicateButton { button: 0 }));

        let mut grid = BUTTON_GRID;
        grid[4][4] = Some(31);
        assert_eq!(check_buttons(&grid), Err(WiringError::ButtonOutOfRange { button: 31 }));
    }

    #[test]
    fn twelve_led_panel_fits_four_pins() {
        let leds = led_subset::<12>();
        assert_eq!(check_leds(&leds, 4), Ok(()));
        assert_eq!(leds[11], LEDS[11]);
        // LED13 is the only one that needs pin E.
        assert_eq!(
            check_leds(&LEDS, 4),
            Err(WiringError::LedPinOutOfRange { led: 12 })
        );
    }

    #[test]
    fn every_command_targets_a_real_led() {
        for (name, led) in LED_COMMANDS {
            assert!(led < LED_COUNT, "{} -> {}", name, led);
        }
    }

    #[test]
    fn twenty_eight_switch_positions_are_mapped() {
        let mapped = BUTTON_GRID.iter().flatten().filter(|b| b.is_some()).count();
        assert_eq!(mapped, 28);
    }
}
