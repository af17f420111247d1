#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
//!
//! Implements the "VC" vendor HID bootloader protocol for a `usb-device` bus.
//!
//! ## About
//!
//! Many small microcontroller boards ship with a resident HID bootloader:
//! the device enumerates as a vendor Human-Interface-Device, a host tool
//! sends a short command protocol inside fixed-size HID reports, and the
//! bootloader programs a new application image into on-chip flash. No
//! dedicated programming hardware is required, and the device side needs
//! no filesystem and no dynamic memory.
//!
//! This library is the full device side of that protocol: USB enumeration
//! (descriptor delivery over the control endpoint), reassembly of 8-byte
//! report fragments into 64-byte command or page buffers, and the
//! erase/program sequencing against the flash controller. The actual
//! hardware access is not part of the library and is expected to be
//! provided by the library user:
//!
//! * the USB peripheral, through an implementation of `usb-device`'s
//!   [`UsbBus`](usb_device::bus::UsbBus);
//! * the flash controller, through [`FlashController`];
//! * reset and persisted-flag primitives, through [`SystemControl`].
//!
//! ### Protocol
//!
//! The host transfers 64-byte output reports, delivered by the transport
//! as eight 8-byte fragments. Outside of a flash session a completed
//! buffer starting with the `b"VC"` tag is a command, selected by byte 2:
//!
//! | opcode | command         | effect                                        |
//! |--------|-----------------|-----------------------------------------------|
//! | `0x00` | GetVersion      | 8-byte version reply on the interrupt endpoint |
//! | `0x01` | GetDeviceUID    | 8-byte board identity reply                    |
//! | `0x02` | BeginFlash      | start a session of byte3 + 256 * byte4 pages   |
//! | `0x03` | Reboot          | system reset                                   |
//! | `0x04` | SetInsecureFlag | persist the "insecure" boot flag               |
//!
//! During a flash session every completed 64-byte buffer is raw page
//! payload. Pages are programmed sequentially from
//! [`FlashController::PROGRAM_START`]; a page that lands on an erase-block
//! boundary erases that block first. After the announced number of pages
//! the device returns to command mode.
//!
//! There is deliberately no image verification, no authentication and no
//! rollback: malformed commands are dropped silently and the host tool is
//! responsible for the correctness of the image it sends.
//!
//! ## Example
//!
//! The example focuses on the protocol object; clocking, interrupt and USB
//! peripheral setup are target-specific and out of scope here.
//!
//! ```no_run
//! use usb_device::bus::UsbBus;
//! use usbd_hid_boot::{FlashController, HidBootloader, SystemControl};
//!
//! struct Flash;
//!
//! impl FlashController for Flash {
//!     // The application image starts past the 4 KiB bootloader.
//!     const PROGRAM_START: u32 = 0x0800_1000;
//!
//!     fn is_busy(&self) -> bool {
//!         false // read FLASH_SR.BSY
//!     }
//!     fn unlock(&mut self) {
//!         // write the FLASH_KEYR key sequence
//!     }
//!     fn lock(&mut self) {
//!         // set FLASH_CR.LOCK
//!     }
//!     fn erase_block(&mut self, address: u32) {
//!         // set PER, write AR, strobe STRT, clear PER
//!         let _ = address;
//!     }
//!     fn program_halfword(&mut self, address: u32, value: u16) {
//!         // set PG, 16-bit store, clear PG
//!         let _ = (address, value);
//!     }
//! }
//!
//! struct Board;
//!
//! impl SystemControl for Board {
//!     const DEVICE_UID: [u8; 8] = [0xFF; 8];
//!
//!     fn system_reset(&mut self) {
//!         // SCB::sys_reset()
//!     }
//!     fn set_insecure_flag(&mut self) {
//!         // write the flag to an RTC backup register
//!     }
//! }
//!
//! fn run<B: UsbBus>(bus: B) -> ! {
//!     let mut bootloader = match HidBootloader::new(bus, Flash, Board) {
//!         Ok(b) => b,
//!         Err(_) => panic!("endpoint allocation failed"),
//!     };
//!
//!     // Usually driven from the USB interrupt instead.
//!     loop {
//!         bootloader.poll();
//!     }
//! }
//! ```

/// Device object and board-level hooks.
pub mod class;
/// Canonical USB descriptor blobs.
pub mod descriptor;

mod control;
mod flash;
mod protocol;

#[doc(inline)]
pub use crate::class::{HidBootloader, SystemControl};
pub use crate::flash::FlashController;
pub use crate::protocol::{PAGE_SIZE, REPORT_SIZE};
