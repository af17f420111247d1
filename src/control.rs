//! The control transfer responder: standard requests on endpoint 0.

use usb_device::bus::UsbBus;
use usb_device::control::Request;
use usb_device::descriptor::descriptor_type;

use crate::class::{HidBootloader, SystemControl};
use crate::descriptor;
use crate::flash::FlashController;

/// HID class code for a report descriptor in GetDescriptor.
const DESC_TYPE_HID_REPORT: u8 = 0x22;

/// One control request, as unpacked from the 8-byte setup stage.
/// Created per transfer and consumed immediately.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct SetupPacket {
    // Dispatch uses the request number only; type and index are kept as
    // parsed because they complete the setup stage layout.
    #[allow(dead_code)]
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    #[allow(dead_code)]
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    pub(crate) fn parse(raw: &[u8; 8]) -> Self {
        SetupPacket {
            request_type: raw[0],
            request: raw[1],
            value: u16::from_le_bytes([raw[2], raw[3]]),
            index: u16::from_le_bytes([raw[4], raw[5]]),
            length: u16::from_le_bytes([raw[6], raw[7]]),
        }
    }

    fn value_high(&self) -> u8 {
        (self.value >> 8) as u8
    }

    fn value_low(&self) -> u8 {
        self.value as u8
    }
}

impl<B: UsbBus, F: FlashController, S: SystemControl> HidBootloader<B, F, S> {
    /// Answer one setup packet. Every path sends exactly one response on
    /// the control endpoint before returning.
    ///
    /// Dispatch is on the request number alone. That makes the class
    /// SET_REPORT request (0x09, same number as SET_CONFIGURATION) land
    /// in the configuration ack, which is exactly what arms the data
    /// stage carrying the 64-byte output report.
    pub(crate) fn handle_setup(&mut self, setup: &SetupPacket) {
        match setup.request {
            Request::SET_ADDRESS => {
                // Ack with a zero-length status reply first; the address
                // is latched only once that transmission completes, or
                // the host loses the device mid-enumeration.
                self.pending_address = setup.value_low();
                self.send_control(&[]);
            }

            Request::GET_DESCRIPTOR => self.get_descriptor(setup),

            Request::GET_STATUS => {
                let status = self.device_status.to_le_bytes();
                self.send_control_limited(&status, setup.length);
            }

            Request::GET_CONFIGURATION => {
                let configured = [self.configured as u8];
                self.send_control_limited(&configured, setup.length);
            }

            Request::SET_CONFIGURATION => {
                self.configured = true;
                self.send_control(&[]);
            }

            Request::GET_INTERFACE => self.send_control(&[]),

            _ => {
                // "I will not process this": empty status plus a stall.
                self.send_control(&[]);
                self.stall_control();
            }
        }
    }

    /// Reply with `min(wLength, descriptor length)` bytes of the matching
    /// blob. An unknown (type, index) pair gets a zero-length reply, not
    /// an error.
    fn get_descriptor(&mut self, setup: &SetupPacket) {
        let blob: &[u8] = match setup.value_high() {
            descriptor_type::DEVICE => &descriptor::DEVICE,
            descriptor_type::CONFIGURATION => &descriptor::CONFIGURATION,
            DESC_TYPE_HID_REPORT => &descriptor::HID_REPORT,
            descriptor_type::STRING => match setup.value_low() {
                0x00 => &descriptor::STRING_LANG_ID,
                0x01 => &descriptor::STRING_PRODUCT,
                0x02 => &descriptor::STRING_SERIAL,
                _ => &[],
            },
            _ => &[],
        };

        self.send_control_limited(blob, setup.length);
    }
}
