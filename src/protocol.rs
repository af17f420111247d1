//! The command/data state machine: reassembles 8-byte report fragments
//! into 64-byte buffers and interprets them as commands or page payload.

use usb_device::bus::UsbBus;

use crate::class::{HidBootloader, SystemControl};
use crate::flash::{self, FlashController};

/// Bytes in one flash page and in one reconstructed command buffer,
/// matching the 64-byte HID output report.
pub const PAGE_SIZE: usize = 64;

/// Bytes delivered by one report fragment, matching the 8-byte HID input
/// report and the endpoint packet size.
pub const REPORT_SIZE: usize = 8;

/// First two bytes of every command buffer.
const COMMAND_TAG: [u8; 2] = *b"VC";

/// Upper bound on one flash session: 10 MiB of page payload. The wire
/// format carries the page count in 16 bits, so this bound is never hit
/// in practice; it is kept as a guard against a widened count field.
const MAX_SESSION_PAGES: u32 = 10 * 1024 * 1024 / PAGE_SIZE as u32;

const CMD_GET_VERSION: u8 = 0x00;
const CMD_GET_DEVICE_UID: u8 = 0x01;
const CMD_BEGIN_FLASH: u8 = 0x02;
const CMD_REBOOT: u8 = 0x03;
const CMD_SET_INSECURE_FLAG: u8 = 0x04;

/// Protocol version reported by GetVersion.
const PROTOCOL_VERSION: u8 = 1;

const BOOTLOADER_IDENT: [u8; REPORT_SIZE] = [PROTOCOL_VERSION, 0, 0, 0, 0, 0, 0, 0];

#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum State {
    /// Completed buffers are interpreted as commands.
    Init,
    /// Completed buffers are page payload for the current session.
    Flash,
}

/// Protocol state for one power cycle. A USB bus reset does not touch
/// this; only a system reset starts a fresh session.
pub(crate) struct Session {
    state: State,
    page: [u8; PAGE_SIZE],
    offset: usize,
    pages_to_flash: u32,
    current_page: u32,
}

impl Session {
    pub(crate) fn new() -> Self {
        Session {
            state: State::Init,
            page: [0; PAGE_SIZE],
            offset: 0,
            pages_to_flash: 0,
            current_page: 0,
        }
    }
}

impl<B: UsbBus, F: FlashController, S: SystemControl> HidBootloader<B, F, S> {
    /// Feed one 8-byte report fragment into the state machine.
    ///
    /// [`poll`](Self::poll) calls this for every OUT data packet on the
    /// control endpoint; it is public so that alternative transports and
    /// tests can drive the protocol directly. Every eighth fragment
    /// completes a buffer and dispatches it.
    pub fn handle_report_data(&mut self, fragment: &[u8; REPORT_SIZE]) {
        match self.session.state {
            State::Init => {
                self.accumulate(fragment);

                if self.session.offset == PAGE_SIZE {
                    self.session.offset = 0;

                    if self.session.page[..2] == COMMAND_TAG {
                        self.dispatch_command();
                    }
                    // Anything without the tag is dropped without a reply.
                }
            }
            State::Flash => {
                self.accumulate(fragment);

                if self.session.offset == PAGE_SIZE {
                    self.session.offset = 0;
                    self.flash_current_page();
                }

                if self.session.current_page == self.session.pages_to_flash {
                    // Session complete, back to processing commands.
                    self.session.state = State::Init;
                }
            }
        }
    }

    fn accumulate(&mut self, fragment: &[u8; REPORT_SIZE]) {
        let offset = self.session.offset;
        self.session.page[offset..offset + REPORT_SIZE].copy_from_slice(fragment);
        self.session.offset += REPORT_SIZE;
    }

    fn dispatch_command(&mut self) {
        match self.session.page[2] {
            CMD_GET_VERSION => self.send_report(&BOOTLOADER_IDENT),
            CMD_GET_DEVICE_UID => self.send_report(&S::DEVICE_UID),
            CMD_BEGIN_FLASH => {
                let pages =
                    self.session.page[3] as u32 + 256 * self.session.page[4] as u32;

                if pages < MAX_SESSION_PAGES {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("flash session: {} pages", pages);

                    self.session.pages_to_flash = pages;
                    self.session.current_page = 0;
                    self.session.offset = 0;
                    self.session.state = State::Flash;
                } else {
                    // Ignored; the host has to notice the missing progress.
                    #[cfg(feature = "defmt")]
                    defmt::warn!("oversized flash request: {} pages", pages);
                }
            }
            CMD_REBOOT => {
                #[cfg(feature = "defmt")]
                defmt::info!("reboot requested");

                // Does not return on hardware.
                self.system.system_reset();
            }
            CMD_SET_INSECURE_FLAG => self.system.set_insecure_flag(),
            _ => {}
        }
    }

    fn flash_current_page(&mut self) {
        let address =
            F::PROGRAM_START + self.session.current_page * PAGE_SIZE as u32;

        flash::write_page(&mut self.flash, address, &self.session.page);
        self.session.current_page += 1;
    }
}
