//! Joystick side of the panel.
//!
//! [`InputAggregator`] folds the debounced matrix, the encoder pulse and the three
//! sliders into one [`JoystickReport`] per tick and hands it to a [`ReportSink`]
//! when it differs from the last report the sink accepted.

use crate::{
    debounce::Debouncer,
    encoder::Direction,
    encoding,
    wiring::{self, BUTTON_COUNT, COLS, ROWS},
};

/// Bit slots in the report. Slots past [`BUTTON_COUNT`] are padding.
pub const BUTTON_SLOTS: usize = 32;
/// Largest axis value, the 10-bit range of the original sliders.
pub const AXIS_MAX: u16 = 1023;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JoystickReport {
    pub buttons: [bool; BUTTON_SLOTS],
    /// X, Y, Z in `0..=AXIS_MAX`.
    pub axes: [u16; 3],
}

impl JoystickReport {
    /// Sets a 0-based button. Padding slots and unknown buttons are ignored.
    pub fn set_button(&mut self, button: u8, pressed: bool) {
        if let Some(slot) = self.buttons.get_mut(button as usize) {
            if (button as usize) < BUTTON_COUNT {
                *slot = pressed;
            }
        }
    }

    pub fn pressed(&self) -> impl Iterator<Item = usize> + '_ {
        self.buttons
            .iter()
            .enumerate()
            .filter(|(_, p)| **p)
            .map(|(i, _)| i)
    }

    pub fn to_bytes(&self) -> [u8; encoding::REPORT_LEN] {
        encoding::encode(self)
    }
}

/// Scales a 12-bit RP2040 ADC sample to the 10-bit axis range.
#[inline]
pub fn scale_adc(raw: u16) -> u16 {
    raw.min(4095) >> 2
}

/// Per-axis jitter filter.
///
/// The output only follows the input once it has moved by at least the
/// hysteresis. The end stops are always reachable.
#[derive(Clone, Copy, Debug)]
pub struct AxisFilter {
    hysteresis: u16,
    value: Option<u16>,
}

impl AxisFilter {
    pub const fn new(hysteresis: u16) -> Self {
        AxisFilter {
            hysteresis,
            value: None,
        }
    }

    pub fn update(&mut self, sample: u16) -> u16 {
        let sample = sample.min(AXIS_MAX);
        let value = match self.value {
            Some(current)
                if current.abs_diff(sample) < self.hysteresis
                    && sample != 0
                    && sample != AXIS_MAX =>
            {
                current
            }
            _ => sample,
        };
        self.value = Some(value);
        value
    }

    pub fn value(&self) -> u16 {
        self.value.unwrap_or(0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum SinkError<E> {
    /// The transport cannot take a report right now. Try again next tick.
    Busy,
    Failed(E),
}

/// Where joystick reports go. On the panel this is the USB HID interface.
pub trait ReportSink {
    type Error;

    fn try_send(&mut self, report: &JoystickReport) -> Result<(), SinkError<Self::Error>>;
}

/// Raw inputs for one tick.
pub struct Inputs<'a> {
    pub matrix: &'a Debouncer<ROWS, COLS>,
    pub encoder: Option<Direction>,
    /// Scaled slider samples, `None` where the ADC had no fresh value.
    pub sliders: [Option<u16>; 3],
}

pub struct InputAggregator {
    axes: [AxisFilter; 3],
    sent: Option<JoystickReport>,
}

impl InputAggregator {
    pub const fn new(hysteresis: u16) -> Self {
        InputAggregator {
            axes: [AxisFilter::new(hysteresis); 3],
            sent: None,
        }
    }

    /// Builds the report for the current inputs.
    pub fn build(&mut self, inputs: &Inputs) -> JoystickReport {
        let mut report = JoystickReport::default();
        for (ri, buttons) in wiring::BUTTON_GRID.iter().enumerate() {
            for (ci, button) in buttons.iter().enumerate() {
                if let Some(button) = button {
                    report.set_button(*button, inputs.matrix.is_active(ri, ci));
                }
            }
        }
        match inputs.encoder {
            Some(Direction::Clockwise) => report.set_button(wiring::ENCODER_CW_BUTTON, true),
            Some(Direction::CounterClockwise) => {
                report.set_button(wiring::ENCODER_CCW_BUTTON, true)
            }
            None => {}
        }
        for (axis, (filter, sample)) in self.axes.iter_mut().zip(inputs.sliders).enumerate() {
            report.axes[axis] = match sample {
                Some(sample) => filter.update(sample),
                None => filter.value(),
            };
        }
        report
    }

    /// Sends `report` unless the sink already has it.
    ///
    /// Returns `Ok(true)` when the sink took a new report. A busy sink is not an
    /// error: the report stays unsent and goes out on a later call.
    pub fn push<S: ReportSink>(
        &mut self,
        sink: &mut S,
        report: &JoystickReport,
    ) -> Result<bool, S::Error> {
        if self.sent.as_ref() == Some(report) {
            return Ok(false);
        }
        match sink.try_send(report) {
            Ok(()) => {
                self.sent = Some(*report);
                Ok(true)
            }
            Err(SinkError::Busy) => Ok(false),
            Err(SinkError::Failed(e)) => Err(e),
        }
    }

    /// Forgets the last sent report, e.g. after a USB reset.
    pub fn resend(&mut self) {
        self.sent = None;
    }
}
