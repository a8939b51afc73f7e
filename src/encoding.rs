use crate::joystick::JoystickReport;

/// Bytes in one input report: 4 bytes of buttons, then X, Y, Z as u16.
pub const REPORT_LEN: usize = 10;

/// HID report descriptor of the panel joystick: 30 buttons, 2 padding bits and
/// three 10-bit axes carried in 16-bit fields.
#[rustfmt::skip]
pub const JOYSTICK_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01,       // Usage Page (Generic Desktop)
    0x09, 0x04,       // Usage (Joystick)
    0xA1, 0x01,       // Collection (Application)
    0x05, 0x09,       //   Usage Page (Button)
    0x19, 0x01,       //   Usage Minimum (1)
    0x29, 0x1E,       //   Usage Maximum (30)
    0x15, 0x00,       //   Logical Minimum (0)
    0x25, 0x01,       //   Logical Maximum (1)
    0x75, 0x01,       //   Report Size (1)
    0x95, 0x1E,       //   Report Count (30)
    0x81, 0x02,       //   Input (Data, Var, Abs)
    0x75, 0x01,       //   Report Size (1)
    0x95, 0x02,       //   Report Count (2)
    0x81, 0x03,       //   Input (Const, Var, Abs)
    0x05, 0x01,       //   Usage Page (Generic Desktop)
    0x09, 0x30,       //   Usage (X)
    0x09, 0x31,       //   Usage (Y)
    0x09, 0x32,       //   Usage (Z)
    0x15, 0x00,       //   Logical Minimum (0)
    0x26, 0xFF, 0x03, //   Logical Maximum (1023)
    0x75, 0x10,       //   Report Size (16)
    0x95, 0x03,       //   Report Count (3)
    0x81, 0x02,       //   Input (Data, Var, Abs)
    0xC0,             // End Collection
];

pub fn encode(report: &JoystickReport) -> [u8; REPORT_LEN] {
    let mut encoded = [0; REPORT_LEN];
    for (outidx, chunk) in report.buttons.chunks(8).enumerate() {
        let mut packed = 0;
        for i in 0..chunk.len() {
            packed |= (chunk[i] as u8) << (i as u8);
        }
        encoded[outidx] = packed;
    }
    for (i, axis) in report.axes.iter().enumerate() {
        encoded[4 + 2 * i..6 + 2 * i].copy_from_slice(&axis.to_le_bytes());
    }
    encoded
}
