use log::trace;

use crate::ir::{Body, Op, Register};

/// Registers the allocator may hand out, and which of them carry call
/// arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterFile {
    pub free_registers: u32,
    pub arg_registers: &'static [Register],
}

impl RegisterFile {
    /// MIPS with `$t0-$t9`, `$s0-$s7` and `$a0-$a3` free; the first four
    /// arguments travel in `$a0-$a3`.
    pub const MIPS: RegisterFile = RegisterFile {
        free_registers: 22,
        arg_registers: &[0, 1, 2, 3],
    };

    /// `k` interchangeable registers and no argument registers.
    pub const fn new(free_registers: u32) -> Self {
        Self {
            free_registers,
            arg_registers: &[],
        }
    }

    pub fn arg_register(&self, index: usize) -> Option<Register> {
        self.arg_registers
            .get(index)
            .copied()
            .filter(|&reg| reg < self.free_registers)
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::MIPS
    }
}

/// Pin parameters and outgoing arguments to their argument registers.
pub fn pin(body: &mut Body, frame: &RegisterFile) {
    let ids = body.ids().to_vec();
    for id in ids {
        let instruction = body.get_mut(id);
        let index = match instruction.op {
            Op::Parameter(i) | Op::Arg(_, i) => i,
            _ => continue,
        };
        if let Some(reg) = frame.arg_register(index) {
            trace!("pin {} to r{}", id, reg);
            instruction.pin(reg);
        }
    }
}
