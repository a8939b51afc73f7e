//! Serial LED commands.
//!
//! The PC side sends one command per line:
//!
//! ```text
//! SIFA:1        named LED on
//! PZB70:0       named LED off
//! LED:7:1       LED by number, 1-based
//! OFF           every LED off
//! ```
//!
//! Nothing is ever acknowledged. Lines that do not parse are dropped.

use heapless::Vec;

use crate::charlieplex::LedStates;

/// Longest accepted line, terminator excluded.
pub const LINE_LEN: usize = 32;

/// Sent once the host opens the port on the joystick build.
pub const READY_JOYSTICK: &[u8] = b"OK:Joystick+Zusi Ready\r\n";
/// Sent once the host opens the port on the serial-only build.
pub const READY_SERIAL_ONLY: &[u8] = b"OK:Zusi Ready\r\n";

/// Splits a byte stream into `\n` terminated lines of at most `N` bytes.
///
/// A line that does not fit is thrown away up to and including its newline.
pub struct LineReader<const N: usize> {
    buffer: Vec<u8, N>,
    overflowed: bool,
}

impl<const N: usize> LineReader<N> {
    pub const fn new() -> Self {
        LineReader {
            buffer: Vec::new(),
            overflowed: false,
        }
    }

    /// Takes one byte. Returns the line it completed, without the newline.
    pub fn push(&mut self, byte: u8) -> Option<Vec<u8, N>> {
        if byte == b'\n' {
            if self.overflowed {
                self.overflowed = false;
                warn!("serial: dropped line longer than {} bytes", N);
                return None;
            }
            return Some(core::mem::take(&mut self.buffer));
        }
        if self.overflowed {
            return None;
        }
        if self.buffer.push(byte).is_err() {
            self.buffer.clear();
            self.overflowed = true;
        }
        None
    }
}

impl<const N: usize> Default for LineReader<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Command {
    /// Set the wanted state of one LED (0-based).
    Set { led: usize, on: bool },
    AllOff,
}

impl Command {
    pub fn apply<const LEDS: usize>(self, leds: &mut LedStates<LEDS>) {
        match self {
            Command::Set { led, on } => {
                leds.set(led, on);
            }
            Command::AllOff => leds.clear_all(),
        }
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value {
        "0" => Some(false),
        "1" => Some(true),
        _ => None,
    }
}

fn parse_led_number(number: &str, led_count: usize) -> Option<usize> {
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: usize = number.parse().ok()?;
    (1..=led_count).contains(&n).then(|| n - 1)
}

/// Parses one line against a name table of `(name, led)` pairs.
///
/// Surrounding whitespace, including the `\r` of a CRLF line end, is ignored.
/// Names are case sensitive.
pub fn parse(line: &str, names: &[(&str, usize)], led_count: usize) -> Option<Command> {
    let mut fields = line.trim().split(':');
    let name = fields.next()?;
    let first = fields.next();
    let second = fields.next();
    if fields.next().is_some() {
        return None;
    }

    match (name, first, second) {
        ("OFF", None, None) => Some(Command::AllOff),
        ("LED", Some(number), Some(value)) => Some(Command::Set {
            led: parse_led_number(number, led_count)?,
            on: parse_switch(value)?,
        }),
        (name, Some(value), None) => {
            let led = names
                .iter()
                .find(|(known, _)| *known == name)
                .map(|(_, led)| *led)
                .filter(|led| *led < led_count)?;
            Some(Command::Set {
                led,
                on: parse_switch(value)?,
            })
        }
        _ => None,
    }
}

/// Turns serial bytes into LED state changes.
pub struct CommandInterpreter<'a, const LINE: usize> {
    reader: LineReader<LINE>,
    names: &'a [(&'a str, usize)],
}

impl<'a, const LINE: usize> CommandInterpreter<'a, LINE> {
    pub const fn new(names: &'a [(&'a str, usize)]) -> Self {
        CommandInterpreter {
            reader: LineReader::new(),
            names,
        }
    }

    /// Feeds received bytes. Returns how many commands were applied.
    pub fn feed<const LEDS: usize>(&mut self, bytes: &[u8], leds: &mut LedStates<LEDS>) -> usize {
        let mut applied = 0;
        for &byte in bytes {
            let Some(line) = self.reader.push(byte) else {
                continue;
            };
            let Ok(text) = core::str::from_utf8(&line) else {
                trace!("serial: ignored non-text line");
                continue;
            };
            match parse(text, self.names, LEDS) {
                Some(command) => {
                    debug!("serial: {}", command);
                    command.apply(leds);
                    applied += 1;
                }
                None => trace!("serial: ignored line"),
            }
        }
        applied
    }
}

/// Hands out the ready banner each time the host opens the port.
///
/// The port counts as opened on a rising edge of DTR. The banner may need several
/// writes to go out, so the unsent tail is kept until [`consumed`](Self::consumed)
/// accounts for it.
pub struct Greeter {
    banner: &'static [u8],
    dtr: bool,
    pending: &'static [u8],
}

impl Greeter {
    pub const fn new(banner: &'static [u8]) -> Self {
        Greeter {
            banner,
            dtr: false,
            pending: &[],
        }
    }

    /// Reports the current DTR line state.
    pub fn set_dtr(&mut self, dtr: bool) {
        if dtr && !self.dtr {
            self.pending = self.banner;
        } else if !dtr {
            self.pending = &[];
        }
        self.dtr = dtr;
    }

    /// Bytes still waiting to be written.
    pub fn pending(&self) -> &'static [u8] {
        self.pending
    }

    pub fn consumed(&mut self, n: usize) {
        self.pending = &self.pending[n.min(self.pending.len())..];
    }
}
