//! The flash programming engine: erase/program sequencing on top of the
//! raw controller primitives.

use crate::protocol::PAGE_SIZE;

/// Trait that describes the flash controller the bootloader programs
/// through. Implementations map directly onto the controller's registers
/// (busy flag, lock bits, erase and halfword-program operations); all
/// sequencing and alignment rules live in the library.
///
/// The engine never runs two operations concurrently: every call happens
/// inside the single USB event handler, and the whole erase-plus-program
/// flow for one page is bracketed by a single [`unlock`](Self::unlock) /
/// [`lock`](Self::lock) pair.
pub trait FlashController {
    /// First address of the application image, i.e. where page 0 of a
    /// flash session is programmed. On the reference target the
    /// bootloader occupies the first 4 KiB, so this is `0x0800_1000`.
    const PROGRAM_START: u32;

    /// Erase granularity in bytes. Must be a power of two and a multiple
    /// of the 64-byte page size. Defaults to the 1 KiB blocks of
    /// medium-density STM32F10x parts.
    const BLOCK_SIZE: u32 = 1024;

    /// Returns `true` while the controller is executing an erase or
    /// program operation.
    fn is_busy(&self) -> bool;

    /// Open the controller for erase/program access.
    fn unlock(&mut self);

    /// Re-lock the controller. Not reentrant with [`unlock`](Self::unlock).
    fn lock(&mut self);

    /// Start erasing the block beginning at `address`.
    ///
    /// Only called with block-aligned addresses. Erasing destroys the
    /// whole block, so the caller must not hold data it still needs
    /// there. Completion is signalled through [`is_busy`](Self::is_busy).
    fn erase_block(&mut self, address: u32);

    /// Program one 16-bit unit at `address`.
    ///
    /// Only called on a range that has been erased since its last write;
    /// NOR flash can clear bits but never set them. Completion is
    /// signalled through [`is_busy`](Self::is_busy).
    fn program_halfword(&mut self, address: u32, value: u16);

    /// Called on every iteration of a busy poll. The default does
    /// nothing; targets can insert a wait-for-interrupt here, and tests
    /// use it to observe (or break) the poll loop.
    ///
    /// There is no timeout: a controller that never clears its busy flag
    /// hangs the event handler for good.
    fn busy_wait(&mut self) {}
}

/// Erase (when block-aligned) and program one 64-byte page.
///
/// The unlock/lock pair brackets the whole flow, not the individual
/// operations.
pub(crate) fn write_page<F: FlashController>(
    flash: &mut F,
    address: u32,
    data: &[u8; PAGE_SIZE],
) {
    flash.unlock();
    if address % F::BLOCK_SIZE == 0 {
        erase_block(flash, address);
    }
    program_page(flash, address, data);
    flash.lock();
}

fn erase_block<F: FlashController>(flash: &mut F, address: u32) {
    wait_idle(flash);
    flash.erase_block(address);
    wait_idle(flash);
}

fn program_page<F: FlashController>(flash: &mut F, address: u32, data: &[u8]) {
    wait_idle(flash);
    for (i, half) in data.chunks_exact(2).enumerate() {
        let value = u16::from_le_bytes([half[0], half[1]]);
        flash.program_halfword(address + 2 * i as u32, value);
        wait_idle(flash);
    }
}

fn wait_idle<F: FlashController>(flash: &mut F) {
    while flash.is_busy() {
        flash.busy_wait();
    }
}
