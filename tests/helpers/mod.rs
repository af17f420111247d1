//! Simulated flash controller and board hooks with operation logs.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use usbd_hid_boot::{FlashController, SystemControl};

/// Application image base used throughout the tests; the bootloader
/// itself occupies the first 4 KiB of the reference part.
pub const PROGRAM_START: u32 = 0x0800_1000;

/// Erase granularity of the simulated part.
pub const BLOCK_SIZE: u32 = 1024;

/// Board identity reported by GetDeviceUID.
pub const TEST_UID: [u8; 8] = [0x6F, 0xC5, 0xEE, 0x60, 0x90, 0x92, 0x53, 0xA4];

/// Simulated flash array size, 16 KiB from `PROGRAM_START`.
pub const MEM_SIZE: usize = 16 * 1024;

/// One controller call, in invocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashOp {
    Unlock,
    Lock,
    EraseBlock(u32),
    ProgramHalfword(u32, u16),
}

#[derive(Default)]
pub struct FlashLog {
    pub ops: Vec<FlashOp>,
    pub busy_waits: u32,
}

impl FlashLog {
    /// Index of the first matching op, or panic.
    pub fn position(&self, op: FlashOp) -> usize {
        self.ops
            .iter()
            .position(|o| *o == op)
            .unwrap_or_else(|| panic!("{:?} not in log", op))
    }

    pub fn erases(&self) -> Vec<u32> {
        self.ops
            .iter()
            .filter_map(|o| match o {
                FlashOp::EraseBlock(a) => Some(*a),
                _ => None,
            })
            .collect()
    }

    pub fn program_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|o| matches!(o, FlashOp::ProgramHalfword(..)))
            .count()
    }
}

/// Flash controller simulation with NOR semantics: the array starts at
/// all-zeroes, erase fills a block with `0xFF`, and programming can only
/// clear bits. Skipped or misordered erases therefore corrupt the data
/// visibly.
pub struct TestFlash {
    pub log: Rc<RefCell<FlashLog>>,
    pub memory: Rc<RefCell<Vec<u8>>>,
    /// `is_busy` reports busy this many more times before going idle.
    pub busy_countdown: Cell<u32>,
    locked: bool,
}

impl TestFlash {
    pub fn new() -> Self {
        TestFlash {
            log: Rc::default(),
            memory: Rc::new(RefCell::new(vec![0u8; MEM_SIZE])),
            busy_countdown: Cell::new(0),
            locked: true,
        }
    }

    fn offset(address: u32) -> usize {
        (address - PROGRAM_START) as usize
    }
}

impl FlashController for TestFlash {
    const PROGRAM_START: u32 = PROGRAM_START;
    const BLOCK_SIZE: u32 = BLOCK_SIZE;

    fn is_busy(&self) -> bool {
        let left = self.busy_countdown.get();
        if left > 0 {
            self.busy_countdown.set(left - 1);
            true
        } else {
            false
        }
    }

    fn unlock(&mut self) {
        self.locked = false;
        self.log.borrow_mut().ops.push(FlashOp::Unlock);
    }

    fn lock(&mut self) {
        self.locked = true;
        self.log.borrow_mut().ops.push(FlashOp::Lock);
    }

    fn erase_block(&mut self, address: u32) {
        assert!(!self.locked, "erase while locked");
        assert_eq!(address % BLOCK_SIZE, 0, "unaligned erase");
        self.log.borrow_mut().ops.push(FlashOp::EraseBlock(address));

        let from = Self::offset(address);
        self.memory.borrow_mut()[from..from + BLOCK_SIZE as usize].fill(0xFF);
    }

    fn program_halfword(&mut self, address: u32, value: u16) {
        assert!(!self.locked, "program while locked");
        self.log
            .borrow_mut()
            .ops
            .push(FlashOp::ProgramHalfword(address, value));

        let from = Self::offset(address);
        let mut mem = self.memory.borrow_mut();
        let [lo, hi] = value.to_le_bytes();
        mem[from] &= lo;
        mem[from + 1] &= hi;
    }

    fn busy_wait(&mut self) {
        self.log.borrow_mut().busy_waits += 1;
    }
}

#[derive(Default)]
pub struct SystemLog {
    pub resets: u32,
    pub insecure_flags: u32,
    pub endpoint_data: Vec<(u8, Vec<u8>)>,
}

/// Board hooks that only record what was asked of them. `system_reset`
/// returns so that tests can observe it was invoked.
pub struct TestSystem {
    pub log: Rc<RefCell<SystemLog>>,
}

impl TestSystem {
    pub fn new() -> Self {
        TestSystem { log: Rc::default() }
    }
}

impl SystemControl for TestSystem {
    const DEVICE_UID: [u8; 8] = TEST_UID;

    fn system_reset(&mut self) {
        self.log.borrow_mut().resets += 1;
    }

    fn set_insecure_flag(&mut self) {
        self.log.borrow_mut().insecure_flags += 1;
    }

    fn endpoint_data(&mut self, endpoint: u8, data: &[u8]) {
        self.log
            .borrow_mut()
            .endpoint_data
            .push((endpoint, data.to_vec()));
    }
}

/// Build a 64-byte command buffer: the `b"VC"` tag, the opcode, then any
/// opcode-specific payload from byte 3.
pub fn command(opcode: u8, args: &[u8]) -> [u8; 64] {
    let mut page = [0u8; 64];
    page[0] = b'V';
    page[1] = b'C';
    page[2] = opcode;
    page[3..3 + args.len()].copy_from_slice(args);
    page
}

/// BeginFlash command for a session of `pages` 64-byte pages.
pub fn begin_flash(pages: u16) -> [u8; 64] {
    command(0x02, &pages.to_le_bytes())
}

/// Distinct per-page payload pattern.
pub fn page_pattern(page_index: u32) -> [u8; 64] {
    let mut page = [0u8; 64];
    for (i, b) in page.iter_mut().enumerate() {
        *b = (page_index as usize * 64 + i) as u8 ^ 0x5A;
    }
    page
}
