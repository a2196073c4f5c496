mod label;
mod position;
mod symbol;

pub use label::{Label, LabelGen};
pub use position::{span, Position, Positions};
pub use symbol::Symbol;
