//! The bootloader device object: endpoint ownership and the single
//! event-handler loop everything else runs inside.

use core::cmp::min;

use usb_device::bus::{PollResult, UsbBus};
use usb_device::endpoint::{EndpointAddress, EndpointType};
use usb_device::{Result, UsbDirection};

use crate::control::SetupPacket;
use crate::flash::FlashController;
use crate::protocol::{Session, REPORT_SIZE};

/// Control endpoint packet size, fixed by the device descriptor.
const CONTROL_PACKET: usize = 8;

/// Holds the largest descriptor blob.
const CONTROL_BUF: usize = 64;

/// Board-level hooks the bootloader calls but cannot implement itself.
pub trait SystemControl {
    /// 8-byte identity reported by the GetDeviceUID command. This is the
    /// value the host tool matches against its firmware image, so it must
    /// agree with the application firmware's configuration.
    const DEVICE_UID: [u8; 8];

    /// Reset the microcontroller. On hardware this does not return; the
    /// handler stops processing after the call either way.
    fn system_reset(&mut self);

    /// Persist the "insecure" flag for the application firmware to find
    /// on its next boot. The flag must survive a system reset.
    fn set_insecure_flag(&mut self);

    /// Data received on an OUT endpoint the bootloader itself does not
    /// service. The default does nothing.
    fn endpoint_data(&mut self, endpoint: u8, data: &[u8]) {
        let _ = (endpoint, data);
    }
}

/// In-progress control IN transfer, sent in 8-byte packets.
struct ControlReply {
    buf: [u8; CONTROL_BUF],
    len: usize,
    pos: usize,
    /// A full-packet-aligned reply shorter than the requested length is
    /// terminated by a zero-length packet.
    need_zlp: bool,
}

impl ControlReply {
    fn idle() -> Self {
        ControlReply {
            buf: [0; CONTROL_BUF],
            len: 0,
            pos: 0,
            need_zlp: false,
        }
    }
}

/// HID bootloader device for a `usb-device` bus.
///
/// Owns the bus and both hardware collaborators; all protocol and flash
/// logic runs inside [`poll`](Self::poll), which is meant to be called
/// from the USB interrupt. Nothing here suspends: every operation either
/// returns immediately or blocks the handler to completion.
pub struct HidBootloader<B: UsbBus, F: FlashController, S: SystemControl> {
    bus: B,
    pub(crate) flash: F,
    pub(crate) system: S,

    ep0_out: EndpointAddress,
    ep0_in: EndpointAddress,
    ep1_in: EndpointAddress,

    pub(crate) session: Session,
    reply: ControlReply,

    pub(crate) device_status: u16,
    pub(crate) configured: bool,
    /// Bus address waiting for the SetAddress status stage to go out.
    pub(crate) pending_address: u8,
}

impl<B: UsbBus, F: FlashController, S: SystemControl> HidBootloader<B, F, S> {
    /// Allocate the control endpoint pair and the interrupt IN endpoint,
    /// enable the bus and return the device in its initial state.
    pub fn new(mut bus: B, flash: F, system: S) -> Result<Self> {
        let ep0_out = bus.alloc_ep(
            UsbDirection::Out,
            Some(EndpointAddress::from_parts(0, UsbDirection::Out)),
            EndpointType::Control,
            CONTROL_PACKET as u16,
            0,
        )?;
        let ep0_in = bus.alloc_ep(
            UsbDirection::In,
            Some(EndpointAddress::from_parts(0, UsbDirection::In)),
            EndpointType::Control,
            CONTROL_PACKET as u16,
            0,
        )?;
        let ep1_in = bus.alloc_ep(
            UsbDirection::In,
            Some(EndpointAddress::from_parts(1, UsbDirection::In)),
            EndpointType::Interrupt,
            REPORT_SIZE as u16,
            5,
        )?;

        bus.enable();

        Ok(HidBootloader {
            bus,
            flash,
            system,
            ep0_out,
            ep0_in,
            ep1_in,
            session: Session::new(),
            reply: ControlReply::idle(),
            device_status: 0,
            configured: false,
            pending_address: 0,
        })
    }

    /// Service pending bus events: setup packets, report fragments and
    /// transmission completions. One call handles one poll result; call
    /// it from the USB interrupt handler (or in a loop).
    pub fn poll(&mut self) {
        match self.bus.poll() {
            PollResult::None | PollResult::Suspend | PollResult::Resume => {}
            PollResult::Reset => self.bus_reset(),
            PollResult::Data {
                ep_out,
                ep_in_complete,
                ep_setup,
            } => {
                if ep_in_complete & 1 != 0 {
                    self.control_tx_complete();
                }

                if ep_setup & 1 != 0 {
                    let mut raw = [0u8; 8];
                    if self.bus.read(self.ep0_out, &mut raw).is_ok() {
                        let setup = SetupPacket::parse(&raw);
                        self.handle_setup(&setup);
                    }
                } else if ep_out & 1 != 0 {
                    // Report data arrives on the control endpoint in
                    // packet-sized fragments.
                    let mut fragment = [0u8; REPORT_SIZE];
                    if let Ok(len) = self.bus.read(self.ep0_out, &mut fragment) {
                        if len > 0 {
                            self.handle_report_data(&fragment);
                        }
                    }
                }

                // Data on endpoints the bootloader does not service goes
                // to the board hook.
                for ep in 1..16u8 {
                    if ep_out & (1 << ep) != 0 {
                        let addr =
                            EndpointAddress::from_parts(ep as usize, UsbDirection::Out);
                        let mut buf = [0u8; 64];
                        if let Ok(len) = self.bus.read(addr, &mut buf) {
                            if len > 0 {
                                self.system.endpoint_data(ep, &buf[..len]);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Host-driven bus reset: back to the default (unconfigured,
    /// unaddressed) USB state. The flash session deliberately survives;
    /// only a power cycle or system reset clears it.
    fn bus_reset(&mut self) {
        self.bus.reset();
        self.configured = false;
        self.pending_address = 0;
        self.reply = ControlReply::idle();
    }

    /// A control IN packet went out: latch a pending bus address and
    /// keep a chunked reply going.
    fn control_tx_complete(&mut self) {
        if self.pending_address != 0 {
            // The status stage for SetAddress is on the wire; switching
            // the address any earlier breaks enumeration.
            self.bus.set_device_address(self.pending_address);
            self.pending_address = 0;
        }

        if self.reply.pos < self.reply.len {
            self.control_tx_chunk();
        } else if self.reply.need_zlp {
            self.reply.need_zlp = false;
            self.bus.write(self.ep0_in, &[]).ok();
        }
    }

    /// Start a control reply; an empty `data` is the zero-length ack.
    pub(crate) fn send_control(&mut self, data: &[u8]) {
        self.reply.buf[..data.len()].copy_from_slice(data);
        self.reply.len = data.len();
        self.reply.pos = 0;
        self.reply.need_zlp = false;
        self.control_tx_chunk();
    }

    /// Start a control reply truncated to the requested length.
    pub(crate) fn send_control_limited(&mut self, data: &[u8], requested: u16) {
        let len = min(data.len(), requested as usize);
        self.send_control(&data[..len]);
        self.reply.need_zlp =
            len != 0 && len % CONTROL_PACKET == 0 && len < requested as usize;
    }

    fn control_tx_chunk(&mut self) {
        let n = min(self.reply.len - self.reply.pos, CONTROL_PACKET);
        let chunk = &self.reply.buf[self.reply.pos..self.reply.pos + n];
        if self.bus.write(self.ep0_in, chunk).is_ok() {
            self.reply.pos += n;
        }
    }

    /// Protocol-level refusal on the control endpoint.
    pub(crate) fn stall_control(&mut self) {
        self.bus.set_stalled(self.ep0_in, true);
    }

    /// Queue an 8-byte command reply on the interrupt IN endpoint.
    pub(crate) fn send_report(&mut self, report: &[u8; REPORT_SIZE]) {
        self.bus.write(self.ep1_in, report).ok();
    }
}
