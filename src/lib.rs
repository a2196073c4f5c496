pub mod ast;
pub mod codegen;
pub mod common;
pub mod frame;
pub mod ir;
pub mod translate;

use log::debug;
use thiserror::Error;

use crate::{
    common::{Label, Positions, Symbol},
    frame::RegisterFile,
};

pub use codegen::{alloc, alloc_class, alloc_method, alloc_program, Allocation};
pub use frame::pin;
pub use translate::translate;

/// Translate the program, pin calling-convention registers and allocate
/// every method for `frame`.
pub fn compile(program: &ast::Program, frame: &RegisterFile) -> Result<ir::Program> {
    let mut program = translate(program)?;

    for method in program.methods_mut() {
        pin(method.body_mut(), frame);
    }

    let allocations = alloc_program(&mut program, frame.free_registers)?;
    debug!(
        "allocated {} methods, {} stack slots in total",
        allocations.len(),
        allocations.iter().map(|a| a.stack_slots).sum::<u32>()
    );

    Ok(program)
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{}: `{name}` needs a receiver, but there is no `this` here", .pos.0)]
    NoReceiver { name: Symbol, pos: Positions },

    #[error("jump to unknown label `{0}`")]
    UnresolvedLabel(Label),

    #[error("no free registers to allocate")]
    NoFreeRegisters,
}

pub type Result<T> = std::result::Result<T, Error>;
