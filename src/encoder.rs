//! Rotary encoder.
//!
//! The encoder is polled from the main loop. Every tick the two phase lines are
//! fed through a Gray-code state table, and each completed detent becomes a short
//! joystick button press, clockwise and counter-clockwise on separate buttons.

use embedded_hal::digital::v2::InputPin;

use crate::{Duration, Instant};

/// Quadrature counts per mechanical detent.
pub const COUNTS_PER_DETENT: i32 = 4;
/// Detents that may queue up while earlier pulses are still being sent.
pub const MAX_BACKLOG: i32 = 8;

// Indexed by (previous << 2) | current, where a state is (CLK << 1) | DT.
// Transitions that skip a state are impossible in one poll and count as zero.
#[rustfmt::skip]
const TRANSITIONS: [i8; 16] = [
     0, -1,  1,  0,
     1,  0,  0, -1,
    -1,  0,  0,  1,
     0,  1, -1,  0,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

#[derive(Clone, Debug)]
pub struct QuadratureDecoder {
    state: u8,
    count: i32,
    detent: i32,
}

impl QuadratureDecoder {
    /// Starts at the current line levels with position zero.
    pub fn new(clk: bool, dt: bool) -> Self {
        QuadratureDecoder {
            state: Self::encode(clk, dt),
            count: 0,
            detent: 0,
        }
    }

    fn encode(clk: bool, dt: bool) -> u8 {
        ((clk as u8) << 1) | dt as u8
    }

    /// Feeds the current line levels. Returns the detents completed since the
    /// previous call, positive for clockwise.
    pub fn update(&mut self, clk: bool, dt: bool) -> i32 {
        let next = Self::encode(clk, dt);
        let delta = TRANSITIONS[((self.state << 2) | next) as usize];
        self.state = next;
        self.count = self.count.wrapping_add(delta as i32);

        // Boundaries sit halfway between rest positions, so contact noise at
        // rest never crosses one.
        let detent = self.count.wrapping_add(COUNTS_PER_DETENT / 2).div_euclid(COUNTS_PER_DETENT);
        let steps = detent.wrapping_sub(self.detent);
        self.detent = detent;
        steps
    }

    /// Raw quadrature count.
    pub fn position(&self) -> i32 {
        self.count
    }

    pub fn detents(&self) -> i32 {
        self.detent
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Pressed { dir: Direction, since: Instant },
    Gap { since: Instant },
}

/// Turns detent steps into timed button presses.
///
/// Each detent holds its button for one pulse length, then releases for the same
/// time so consecutive detents in the same direction are seen as separate presses.
#[derive(Clone, Debug)]
pub struct DetentPulses {
    pulse: Duration,
    backlog: i32,
    phase: Phase,
}

impl DetentPulses {
    pub const fn new(pulse: Duration) -> Self {
        DetentPulses {
            pulse,
            backlog: 0,
            phase: Phase::Idle,
        }
    }

    /// Queues detent steps. Opposite directions cancel out.
    pub fn add(&mut self, steps: i32) {
        self.backlog = self
            .backlog
            .saturating_add(steps)
            .clamp(-MAX_BACKLOG, MAX_BACKLOG);
    }

    fn elapsed(&self, since: Instant, now: Instant) -> bool {
        now.checked_duration_since(since)
            .map_or(false, |d| d >= self.pulse)
    }

    /// Button that should be held at `now`, if any.
    pub fn poll(&mut self, now: Instant) -> Option<Direction> {
        if let Phase::Pressed { dir, since } = self.phase {
            if !self.elapsed(since, now) {
                return Some(dir);
            }
            self.phase = Phase::Gap { since: now };
        }
        if let Phase::Gap { since } = self.phase {
            if !self.elapsed(since, now) {
                return None;
            }
            self.phase = Phase::Idle;
        }

        let dir = match self.backlog {
            0 => return None,
            b if b > 0 => {
                self.backlog -= 1;
                Direction::Clockwise
            }
            _ => {
                self.backlog += 1;
                Direction::CounterClockwise
            }
        };
        self.phase = Phase::Pressed { dir, since: now };
        Some(dir)
    }

    pub fn backlog(&self) -> i32 {
        self.backlog
    }
}

/// Encoder on two input pins, producing button pulses.
pub struct RotaryEncoder<CLK, DT>
where
    CLK: InputPin,
    DT: InputPin<Error = CLK::Error>,
{
    clk: CLK,
    dt: DT,
    decoder: QuadratureDecoder,
    pulses: DetentPulses,
}

impl<CLK, DT> RotaryEncoder<CLK, DT>
where
    CLK: InputPin,
    DT: InputPin<Error = CLK::Error>,
{
    pub fn new(clk: CLK, dt: DT, pulse: Duration) -> Result<Self, CLK::Error> {
        let decoder = QuadratureDecoder::new(clk.is_high()?, dt.is_high()?);
        Ok(RotaryEncoder {
            clk,
            dt,
            decoder,
            pulses: DetentPulses::new(pulse),
        })
    }

    /// Samples the lines and returns the pulse button to hold at `now`.
    pub fn poll(&mut self, now: Instant) -> Result<Option<Direction>, CLK::Error> {
        let steps = self.decoder.update(self.clk.is_high()?, self.dt.is_high()?);
        if steps != 0 {
            debug!("encoder: {} detent(s), at {}", steps, self.decoder.detents());
            self.pulses.add(steps);
        }
        Ok(self.pulses.poll(now))
    }

    pub fn detents(&self) -> i32 {
        self.decoder.detents()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use std::{cell::Cell, rc::Rc};

    const PULSE: Duration = Duration::millis(30);

    // (CLK, DT) for one clockwise detent starting from rest at 11.
    const CW: [(bool, bool); 4] = [(false, true), (false, false), (true, false), (true, true)];

    fn at(ms: u64) -> Instant {
        Instant::from_ticks(ms * 1_000)
    }

    fn turn(dec: &mut QuadratureDecoder, seq: &[(bool, bool)]) -> i32 {
        seq.iter().map(|&(c, d)| dec.update(c, d)).sum()
    }

    #[test]
    fn full_cycle_is_one_detent() {
        let mut dec = QuadratureDecoder::new(true, true);
        assert_eq!(turn(&mut dec, &CW), 1);
        assert_eq!(dec.position(), 4);

        let back = [(true, false), (false, false), (false, true), (true, true)];
        assert_eq!(turn(&mut dec, &back), -1);
        assert_eq!(dec.position(), 0);
        assert_eq!(dec.detents(), 0);
    }

    #[test]
    fn chatter_at_rest_is_not_a_detent() {
        let mut dec = QuadratureDecoder::new(true, true);
        for _ in 0..10 {
            assert_eq!(dec.update(false, true), 0);
            assert_eq!(dec.update(true, true), 0);
        }
        assert_eq!(dec.detents(), 0);
    }

    #[test]
    fn skipped_state_is_ignored() {
        let mut dec = QuadratureDecoder::new(true, true);
        assert_eq!(dec.update(false, false), 0);
        assert_eq!(dec.position(), 0);
    }

    #[test]
    fn pulses_are_held_then_released() {
        let mut pulses = DetentPulses::new(PULSE);
        assert_eq!(pulses.poll(at(0)), None);

        pulses.add(2);
        assert_eq!(pulses.poll(at(1)), Some(Direction::Clockwise));
        assert_eq!(pulses.poll(at(30)), Some(Direction::Clockwise));
        assert_eq!(pulses.poll(at(31)), None);
        assert_eq!(pulses.poll(at(60)), None);
        assert_eq!(pulses.poll(at(61)), Some(Direction::Clockwise));
        assert_eq!(pulses.poll(at(91)), None);
        assert_eq!(pulses.poll(at(200)), None);
        assert_eq!(pulses.backlog(), 0);
    }

    #[test]
    fn backlog_is_capped_and_cancels() {
        let mut pulses = DetentPulses::new(PULSE);
        pulses.add(20);
        assert_eq!(pulses.backlog(), MAX_BACKLOG);
        pulses.add(-10);
        assert_eq!(pulses.backlog(), -2);
        assert_eq!(pulses.poll(at(0)), Some(Direction::CounterClockwise));
        assert_eq!(pulses.backlog(), -1);
    }

    struct Line(Rc<Cell<bool>>);

    impl InputPin for Line {
        type Error = Infallible;

        fn is_high(&self) -> Result<bool, Infallible> {
            Ok(self.0.get())
        }

        fn is_low(&self) -> Result<bool, Infallible> {
            Ok(!self.0.get())
        }
    }

    #[test]
    fn encoder_on_pins() {
        let clk = Rc::new(Cell::new(true));
        let dt = Rc::new(Cell::new(true));
        let mut enc =
            RotaryEncoder::new(Line(clk.clone()), Line(dt.clone()), PULSE).unwrap();

        let mut ms = 0;
        let mut held = Vec::new();
        for (c, d) in CW {
            clk.set(c);
            dt.set(d);
            held.push(enc.poll(at(ms)).unwrap());
            ms += 1;
        }
        // The detent counts as soon as the shaft passes halfway.
        let cw = Some(Direction::Clockwise);
        assert_eq!(held, vec![None, cw, cw, cw]);
        assert_eq!(enc.detents(), 1);
    }
}
