//! Custom HID joystick interface carrying [`JoystickReport`]s.

use defmt::unwrap;
use fugit::MillisDurationU32;
use usb_device::{
    class_prelude::{UsbBus, UsbBusAllocator},
    device::{UsbDevice, UsbDeviceBuilder},
    UsbError,
};
use usbd_human_interface_device::{
    descriptor::InterfaceProtocol,
    device::DeviceClass,
    interface::{
        InBytes16, Interface, InterfaceBuilder, InterfaceConfig, OutNone, ReportSingle,
        UsbAllocatable,
    },
    UsbHidError,
};

use train_panel::{
    config::TIMING,
    encoding::JOYSTICK_REPORT_DESCRIPTOR,
    joystick::{JoystickReport, ReportSink, SinkError},
};

use super::usb::{MANUFACTURER, VID_PID};

type JoystickInterface<'a, B> = Interface<'a, B, InBytes16, OutNone, ReportSingle>;

pub struct PanelJoystick<'a, B: UsbBus> {
    interface: JoystickInterface<'a, B>,
}

impl<'a, B: UsbBus> DeviceClass<'a> for PanelJoystick<'a, B> {
    type I = JoystickInterface<'a, B>;

    fn interface(&mut self) -> &mut Self::I {
        &mut self.interface
    }

    fn reset(&mut self) {}

    fn tick(&mut self) -> Result<(), UsbHidError> {
        Ok(())
    }
}

impl<'a, B: UsbBus> ReportSink for PanelJoystick<'a, B> {
    type Error = UsbError;

    fn try_send(&mut self, report: &JoystickReport) -> Result<(), SinkError<UsbError>> {
        match self.interface.write_report(&report.to_bytes()) {
            Ok(_) => Ok(()),
            Err(UsbError::WouldBlock) => Err(SinkError::Busy),
            Err(e) => Err(SinkError::Failed(e)),
        }
    }
}

pub struct PanelJoystickConfig<'a> {
    interface: InterfaceConfig<'a, InBytes16, OutNone, ReportSingle>,
}

impl<'a> Default for PanelJoystickConfig<'a> {
    fn default() -> Self {
        let poll = MillisDurationU32::from_ticks(TIMING.hid_poll.to_millis() as u32);
        let interface = unwrap!(InterfaceBuilder::new(JOYSTICK_REPORT_DESCRIPTOR)
            .map(|b| {
                b.boot_device(InterfaceProtocol::None)
                    .description("Train Panel")
            })
            .and_then(|b| b.in_endpoint(poll))
            .map(|b| b.without_out_endpoint().build())
            .ok());
        PanelJoystickConfig { interface }
    }
}

impl<'a, B: UsbBus + 'a> UsbAllocatable<'a, B> for PanelJoystickConfig<'a> {
    type Allocated = PanelJoystick<'a, B>;

    fn allocate(self, usb_alloc: &'a UsbBusAllocator<B>) -> Self::Allocated {
        PanelJoystick {
            interface: Interface::new(usb_alloc, self.interface),
        }
    }
}

/// HID joystick + CDC serial in one device.
pub fn composite_device<B: UsbBus>(usb_bus: &UsbBusAllocator<B>) -> UsbDevice<'_, B> {
    UsbDeviceBuilder::new(usb_bus, VID_PID)
        .manufacturer(MANUFACTURER)
        .product("Train Panel Joystick")
        .serial_number("TP13")
        .composite_with_iads()
        .build()
}

