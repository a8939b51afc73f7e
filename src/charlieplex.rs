//! Charlieplexed LED driver.
//!
//! `N` shared pins address up to `N * (N - 1)` LEDs. Each LED sits between an
//! ordered (drive, sink) pin pair, so two LEDs may share a pair only in opposite
//! polarity. Only one LED can be forward-biased at a time, so [`Charlieplex::step`]
//! lights at most one LED per call and the caller repeats it fast enough for the
//! eye to blend the cycle into steady light.
//!
//! Each step first puts every pin back into high impedance, then drives the two
//! pins of the LED in the current slot, and only when that LED is wanted on.

use crate::wiring::WiringError;

/// Electrical state of one charlieplex pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum PinRole {
    /// Input without pulls. Pin takes no part in the current slot.
    HighZ,
    /// Push-pull output, high. Feeds the LED anode through its resistor.
    DriveHigh,
    /// Push-pull output, low. Sinks the LED cathode.
    DriveLow,
}

impl PinRole {
    #[inline]
    pub fn is_driven(self) -> bool {
        self != PinRole::HighZ
    }
}

/// A GPIO that can be switched between the three charlieplexing states at runtime.
pub trait TriStatePin {
    type Error;

    fn set_role(&mut self, role: PinRole) -> Result<(), Self::Error>;
}

/// Pin indices of one LED, anode side first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct LedPins {
    pub drive: u8,
    pub sink: u8,
}

impl LedPins {
    pub const fn new(drive: u8, sink: u8) -> Self {
        Self { drive, sink }
    }
}

/// Checks an LED table against a pool of `pin_count` pins.
///
/// Each entry must use two distinct pins inside the pool, and no (drive, sink)
/// pair may appear twice.
pub const fn check_leds(leds: &[LedPins], pin_count: usize) -> Result<(), WiringError> {
    if leds.is_empty() {
        return Err(WiringError::EmptyLedTable);
    }
    let mut i = 0;
    while i < leds.len() {
        let led = leds[i];
        if led.drive as usize >= pin_count || led.sink as usize >= pin_count {
            return Err(WiringError::LedPinOutOfRange { led: i });
        }
        if led.drive == led.sink {
            return Err(WiringError::LedSelfLoop { led: i });
        }
        let mut j = 0;
        while j < i {
            if leds[j].drive == led.drive && leds[j].sink == led.sink {
                return Err(WiringError::DuplicateLed { led: i });
            }
            j += 1;
        }
        i += 1;
    }
    Ok(())
}

/// Pin roles for one multiplex slot.
///
/// Everything is high impedance unless the LED is wanted on, in which case exactly
/// its two pins are driven.
pub fn slot_roles<const PINS: usize>(led: LedPins, on: bool) -> [PinRole; PINS] {
    let mut roles = [PinRole::HighZ; PINS];
    if on {
        roles[led.drive as usize] = PinRole::DriveHigh;
        roles[led.sink as usize] = PinRole::DriveLow;
    }
    roles
}

/// Desired on/off bit per LED.
///
/// Written by the command interpreter, only ever read by the driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedStates<const N: usize> {
    on: [bool; N],
}

impl<const N: usize> LedStates<N> {
    pub const fn new() -> Self {
        Self { on: [false; N] }
    }

    /// Records the wanted state of `led` (0-based). Returns `false` if there is no
    /// such LED, leaving every bit untouched.
    pub fn set(&mut self, led: usize, on: bool) -> bool {
        match self.on.get_mut(led) {
            Some(bit) => {
                *bit = on;
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn is_on(&self, led: usize) -> bool {
        self.on.get(led).copied().unwrap_or(false)
    }

    pub fn clear_all(&mut self) {
        self.on = [false; N];
    }

    pub fn count_on(&self) -> usize {
        self.on.iter().filter(|on| **on).count()
    }
}

impl<const N: usize> Default for LedStates<N> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Charlieplex<P, const PINS: usize, const LEDS: usize>
where
    P: TriStatePin,
{
    pins: [P; PINS],
    leds: [LedPins; LEDS],
    cursor: usize,
}

impl<P, const PINS: usize, const LEDS: usize> Charlieplex<P, PINS, LEDS>
where
    P: TriStatePin,
{
    /// Takes ownership of the shared pins and releases all of them.
    pub fn new(pins: [P; PINS], leds: [LedPins; LEDS]) -> Result<Self, WiringError> {
        check_leds(&leds, PINS)?;
        let mut plex = Self {
            pins,
            leds,
            cursor: 0,
        };
        // A pin that refuses to float now will be retried on every step.
        if plex.release().is_err() {
            warn!("charlieplex: could not release pins at init");
        }
        Ok(plex)
    }

    /// Puts every shared pin into high impedance.
    pub fn release(&mut self) -> Result<(), P::Error> {
        for pin in self.pins.iter_mut() {
            pin.set_role(PinRole::HighZ)?;
        }
        Ok(())
    }

    /// Advances the multiplex cycle by one LED slot.
    ///
    /// The previous slot is broken first, then the current LED is lit if its
    /// desired bit is set. It stays lit until the next call. The cursor advances
    /// even if a pin operation fails, so one bad pin cannot stall the cycle.
    pub fn step(&mut self, desired: &LedStates<LEDS>) -> Result<(), P::Error> {
        let slot = self.cursor;
        self.cursor = (slot + 1) % LEDS;

        self.release()?;
        let roles = slot_roles::<PINS>(self.leds[slot], desired.is_on(slot));
        // Sink before drive.
        for role in [PinRole::DriveLow, PinRole::DriveHigh] {
            for (pin, _) in self.pins.iter_mut().zip(roles).filter(|(_, r)| *r == role) {
                pin.set_role(role)?;
            }
        }
        Ok(())
    }

    /// Index of the LED the next [`step`](Self::step) will serve.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Releases every pin and hands them back.
    pub fn free(mut self) -> Result<[P; PINS], P::Error> {
        self.release()?;
        Ok(self.pins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wiring;
    use core::convert::Infallible;
    use std::{cell::RefCell, rc::Rc, vec::Vec};

    const PINS: usize = 5;

    /// Shared view of the simulated pin network. Every role change is logged as a
    /// full snapshot so invariants can be checked between individual pin writes.
    #[derive(Default)]
    struct Network {
        roles: [Option<PinRole>; PINS],
        log: Vec<[PinRole; PINS]>,
    }

    impl Network {
        fn snapshot(&self) -> [PinRole; PINS] {
            self.roles.map(|r| r.unwrap_or(PinRole::HighZ))
        }
    }

    struct SimPin {
        index: usize,
        net: Rc<RefCell<Network>>,
    }

    impl TriStatePin for SimPin {
        type Error = Infallible;

        fn set_role(&mut self, role: PinRole) -> Result<(), Infallible> {
            let mut net = self.net.borrow_mut();
            net.roles[self.index] = Some(role);
            let snap = net.snapshot();
            net.log.push(snap);
            Ok(())
        }
    }

    fn panel() -> (
        Charlieplex<SimPin, PINS, { wiring::LED_COUNT }>,
        Rc<RefCell<Network>>,
    ) {
        let net = Rc::new(RefCell::new(Network::default()));
        let pins = core::array::from_fn(|index| SimPin {
            index,
            net: net.clone(),
        });
        let plex = Charlieplex::new(pins, wiring::LEDS).unwrap();
        net.borrow_mut().log.clear();
        (plex, net)
    }

    fn driven(snap: &[PinRole; PINS]) -> Vec<usize> {
        (0..PINS).filter(|&i| snap[i].is_driven()).collect()
    }

    #[test]
    fn new_releases_every_pin() {
        let net = Rc::new(RefCell::new(Network::default()));
        let pins: [SimPin; PINS] = core::array::from_fn(|index| SimPin {
            index,
            net: net.clone(),
        });
        let _plex = Charlieplex::new(pins, wiring::LEDS).unwrap();
        assert_eq!(net.borrow().snapshot(), [PinRole::HighZ; PINS]);
    }

    #[test]
    fn free_releases_a_lit_led() {
        let (mut plex, net) = panel();
        let mut desired = LedStates::new();
        desired.set(0, true);
        plex.step(&desired).unwrap();
        assert_eq!(driven(&net.borrow().snapshot()), vec![0, 1]);

        let pins = plex.free().unwrap();
        assert_eq!(pins.len(), PINS);
        assert_eq!(net.borrow().snapshot(), [PinRole::HighZ; PINS]);
    }

    #[test]
    fn dark_panel_never_drives_a_pin() {
        let (mut plex, net) = panel();
        let desired = LedStates::new();
        for _ in 0..3 * wiring::LED_COUNT {
            plex.step(&desired).unwrap();
        }
        assert!(net.borrow().log.iter().all(|snap| driven(snap).is_empty()));
    }

    #[test]
    fn lit_slot_drives_exactly_its_pair() {
        let (mut plex, net) = panel();
        let mut desired = LedStates::new();
        desired.set(2, true); // LED3, A -> C

        plex.step(&desired).unwrap();
        plex.step(&desired).unwrap();
        assert_eq!(net.borrow().snapshot(), [PinRole::HighZ; PINS]);

        plex.step(&desired).unwrap();
        let snap = net.borrow().snapshot();
        assert_eq!(snap[0], PinRole::DriveHigh);
        assert_eq!(snap[2], PinRole::DriveLow);
        assert_eq!(driven(&snap), vec![0, 2]);

        plex.step(&desired).unwrap();
        assert_eq!(net.borrow().snapshot(), [PinRole::HighZ; PINS]);
    }

    /// LEDs of the table whose anode pin is high while the cathode pin is low.
    fn forward_biased(snap: &[PinRole; PINS]) -> usize {
        wiring::LEDS
            .iter()
            .filter(|l| {
                snap[l.drive as usize] == PinRole::DriveHigh
                    && snap[l.sink as usize] == PinRole::DriveLow
            })
            .count()
    }

    fn pair(led: LedPins) -> [usize; 2] {
        [led.drive as usize, led.sink as usize]
    }

    #[test]
    fn driven_pins_stay_within_the_slot_pairs() {
        let (mut plex, net) = panel();
        let mut desired = LedStates::new();
        for led in [0, 1, 4, 5, 7, 10, 12] {
            desired.set(led, true);
        }

        let mut previous: Option<LedPins> = None;
        for _ in 0..3 * wiring::LED_COUNT {
            let slot = plex.cursor();
            let led = wiring::LEDS[slot];
            net.borrow_mut().log.clear();
            plex.step(&desired).unwrap();

            let net = net.borrow();
            // One write per pin to release, then the writes that light the slot.
            let (release, light) = net.log.split_at(PINS);
            for snap in release {
                assert!(forward_biased(snap) <= 1, "slot {}: {:?}", slot, snap);
                for pin in driven(snap) {
                    let lit_before = previous.map_or(false, |p| pair(p).contains(&pin));
                    assert!(
                        lit_before || pair(led).contains(&pin),
                        "slot {} drove foreign pin {} while releasing",
                        slot,
                        pin
                    );
                }
            }
            assert!(driven(release.last().unwrap()).is_empty());
            for snap in light {
                assert!(forward_biased(snap) <= 1, "slot {}: {:?}", slot, snap);
                assert!(driven(snap).iter().all(|pin| pair(led).contains(pin)));
            }
            if desired.is_on(slot) {
                assert_eq!(light.len(), 2);
                assert_eq!(light[0][led.sink as usize], PinRole::DriveLow);
                assert_eq!(light[0][led.drive as usize], PinRole::HighZ);
            } else {
                assert!(light.is_empty());
            }

            previous = desired.is_on(slot).then_some(led);
        }
    }

    #[test]
    fn full_cycle_visits_each_led_once() {
        let (mut plex, net) = panel();
        let mut desired = LedStates::new();
        for led in 0..wiring::LED_COUNT {
            desired.set(led, true);
        }

        let start = plex.cursor();
        let mut lit = Vec::new();
        for _ in 0..wiring::LED_COUNT {
            plex.step(&desired).unwrap();
            let snap = net.borrow().snapshot();
            let drive = snap.iter().position(|r| *r == PinRole::DriveHigh).unwrap();
            let sink = snap.iter().position(|r| *r == PinRole::DriveLow).unwrap();
            let led = wiring::LEDS
                .iter()
                .position(|l| l.drive as usize == drive && l.sink as usize == sink)
                .unwrap();
            lit.push(led);
        }

        assert_eq!(plex.cursor(), start);
        assert_eq!(lit, (0..wiring::LED_COUNT).collect::<Vec<_>>());
    }

    #[test]
    fn clearing_a_bit_darkens_the_next_visit() {
        let (mut plex, net) = panel();
        let mut desired = LedStates::new();
        desired.set(0, true);
        plex.step(&desired).unwrap();
        assert_eq!(driven(&net.borrow().snapshot()), vec![0, 1]);

        desired.set(0, false);
        for _ in 0..wiring::LED_COUNT {
            plex.step(&desired).unwrap();
        }
        assert!(driven(&net.borrow().snapshot()).is_empty());
    }

    #[test]
    fn slot_roles_is_empty_when_off() {
        let led = LedPins::new(3, 1);
        assert_eq!(slot_roles::<PINS>(led, false), [PinRole::HighZ; PINS]);
        assert_eq!(
            slot_roles::<PINS>(led, true),
            [
                PinRole::HighZ,
                PinRole::DriveLow,
                PinRole::HighZ,
                PinRole::DriveHigh,
                PinRole::HighZ
            ]
        );
    }

    #[test]
    fn rejects_broken_led_tables() {
        assert_eq!(
            check_leds(&[LedPins::new(0, 5)], PINS),
            Err(WiringError::LedPinOutOfRange { led: 0 })
        );
        assert_eq!(
            check_leds(&[LedPins::new(0, 1), LedPins::new(2, 2)], PINS),
            Err(WiringError::LedSelfLoop { led: 1 })
        );
        assert_eq!(
            check_leds(
                &[LedPins::new(0, 1), LedPins::new(1, 0), LedPins::new(0, 1)],
                PINS
            ),
            Err(WiringError::DuplicateLed { led: 2 })
        );
        assert_eq!(check_leds(&[], PINS), Err(WiringError::EmptyLedTable));
    }

    #[test]
    fn led_states_ignore_unknown_leds() {
        let mut states = LedStates::<3>::new();
        assert!(states.set(2, true));
        assert!(!states.set(3, true));
        assert!(!states.is_on(3));
        assert_eq!(states.count_on(), 1);
        states.clear_all();
        assert_eq!(states.count_on(), 0);
    }
}
