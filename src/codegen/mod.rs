//! Graph-coloring register allocation over the IR.

pub mod color;
pub mod flow;
mod graph;
pub mod liveness;
pub mod reg_alloc;
pub mod spill;
pub mod variable;

pub use graph::{Graph, Node, ID};
pub use reg_alloc::{alloc, alloc_class, alloc_method, alloc_program, Allocation};
pub use variable::{VarId, Variables};
