//! Core of the train-panel firmware.
//!
//! Everything in here is hardware independent: pins come in through `embedded-hal`
//! traits (plus [`charlieplex::TriStatePin`] for the LED network) and time comes in
//! as [`Instant`] values, so the whole core runs under `cargo test` on the host.
//!
//! | Module | Purpose |
//! | ------ | ------- |
//! | [`buttonmatrix`] | one-column-per-step 5x6 matrix scanner |
//! | [`debounce`] | per-cell time based debounce state machine |
//! | [`charlieplex`] | 5-pin tri-state LED multiplexer |
//! | [`command`] | serial line framing and `NAME:VALUE` interpreter |
//! | [`encoder`] | polled quadrature decoder with detent pulses |
//! | [`joystick`] | input aggregation into the HID joystick report |
//! | [`encoding`] | HID report packing and descriptor |
//! | [`wiring`] | static pin, LED and button tables |
//! | [`config`] | timing constants and refresh checks |

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod buttonmatrix;
pub mod charlieplex;
pub mod command;
pub mod config;
pub mod debounce;
pub mod encoder;
pub mod encoding;
pub mod joystick;
pub mod wiring;

/// Microsecond timestamps, the same resolution as the RP2040 system timer.
pub type Instant = fugit::TimerInstantU64<1_000_000>;
/// Microsecond durations matching [`Instant`].
pub type Duration = fugit::MicrosDurationU64;
