mod body;

use std::fmt::Display;

pub use body::Body;

use strum::Display as StrumDisplay;

use crate::{
    ast::Operator,
    common::{Label, Positions, Symbol},
};

pub type Register = u32;

/// Identity of an instruction inside its method's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstrId(pub(crate) u32);

impl InstrId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for InstrId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub method: Symbol,
    pub args: Vec<InstrId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay)]
pub enum BinOp {
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,
    And,
    Or,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
}

impl From<Operator> for BinOp {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Lt => BinOp::Lt,
            Operator::Le => BinOp::Le,
            Operator::Eq => BinOp::Eq,
            Operator::Ne => BinOp::Ne,
            Operator::Gt => BinOp::Gt,
            Operator::Ge => BinOp::Ge,
            Operator::And => BinOp::And,
            Operator::Or => BinOp::Or,
            Operator::Plus => BinOp::Plus,
            Operator::Minus => BinOp::Minus,
            Operator::Mul => BinOp::Mul,
            Operator::Div => BinOp::Div,
            Operator::Mod => BinOp::Mod,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Two definitions of one variable meeting at a join point.
    Unify(InstrId, InstrId),
    This,
    Parameter(usize),
    Arg(InstrId, usize),
    Null,
    Int(i32),
    Boolean(bool),
    NewObj(Symbol),
    NewIntArray(InstrId),
    Label(Label),
    Goto(Label),
    Branch(InstrId, Label),
    NBranch(InstrId, Label),
    /// Receiver and call descriptor. The arguments are `Arg` instructions.
    Call(InstrId, Call),
    Print(InstrId),
    Return(InstrId),
    Member(InstrId, Symbol),
    Index(InstrId, InstrId),
    Store(InstrId, u32),
    Load(u32),
    VarAssg(InstrId, Symbol),
    /// Object, value and field name.
    MemberAssg(InstrId, InstrId, Symbol),
    /// Array, value and index.
    IndexAssg(InstrId, InstrId, InstrId),
    Not(InstrId),
    Binary(BinOp, InstrId, InstrId),
}

impl Op {
    /// Every instruction this one reads, call arguments and the index of an
    /// index assignment included.
    pub fn operands(&self) -> Vec<InstrId> {
        match self {
            Op::This
            | Op::Parameter(_)
            | Op::Null
            | Op::Int(_)
            | Op::Boolean(_)
            | Op::NewObj(_)
            | Op::Label(_)
            | Op::Goto(_)
            | Op::Load(_) => vec![],
            Op::Arg(v, _)
            | Op::NewIntArray(v)
            | Op::Branch(v, _)
            | Op::NBranch(v, _)
            | Op::Print(v)
            | Op::Return(v)
            | Op::Member(v, _)
            | Op::Store(v, _)
            | Op::VarAssg(v, _)
            | Op::Not(v) => vec![*v],
            Op::Unify(l, r)
            | Op::Index(l, r)
            | Op::MemberAssg(l, r, _)
            | Op::Binary(_, l, r) => vec![*l, *r],
            Op::IndexAssg(array, value, index) => vec![*array, *value, *index],
            Op::Call(target, call) => {
                let mut v = Vec::with_capacity(call.args.len() + 1);
                v.push(*target);
                v.extend(call.args.iter().copied());
                v
            }
        }
    }

    pub fn operands_mut(&mut self) -> Vec<&mut InstrId> {
        match self {
            Op::This
            | Op::Parameter(_)
            | Op::Null
            | Op::Int(_)
            | Op::Boolean(_)
            | Op::NewObj(_)
            | Op::Label(_)
            | Op::Goto(_)
            | Op::Load(_) => vec![],
            Op::Arg(v, _)
            | Op::NewIntArray(v)
            | Op::Branch(v, _)
            | Op::NBranch(v, _)
            | Op::Print(v)
            | Op::Return(v)
            | Op::Member(v, _)
            | Op::Store(v, _)
            | Op::VarAssg(v, _)
            | Op::Not(v) => vec![v],
            Op::Unify(l, r)
            | Op::Index(l, r)
            | Op::MemberAssg(l, r, _)
            | Op::Binary(_, l, r) => vec![l, r],
            Op::IndexAssg(array, value, index) => vec![array, value, index],
            Op::Call(target, call) => {
                let mut v = Vec::with_capacity(call.args.len() + 1);
                v.push(target);
                v.extend(call.args.iter_mut());
                v
            }
        }
    }

    /// Whether the instruction produces a value that needs a location.
    pub fn defines_value(&self) -> bool {
        !matches!(
            self,
            Op::Label(_)
                | Op::Goto(_)
                | Op::Branch(..)
                | Op::NBranch(..)
                | Op::Return(_)
                | Op::Print(_)
                | Op::Store(..)
        )
    }

    pub fn is_unify(&self) -> bool {
        matches!(self, Op::Unify(..))
    }

    /// Branch target, if any.
    pub fn target(&self) -> Option<&Label> {
        match self {
            Op::Goto(label) | Op::Branch(_, label) | Op::NBranch(_, label) => Some(label),
            _ => None,
        }
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Op::Unify(l, r) => write!(f, "Unify {} {}", l, r),
            Op::This => write!(f, "This"),
            Op::Parameter(n) => write!(f, "Parameter *{}", n),
            Op::Arg(v, n) => write!(f, "Arg {} *{}", v, n),
            Op::Null => write!(f, "Null"),
            Op::Int(n) => write!(f, "Int *{}", n),
            Op::Boolean(b) => write!(f, "Boolean *{}", b),
            Op::NewObj(class) => write!(f, "NewObj *{}", class),
            Op::NewIntArray(size) => write!(f, "NewIntArray {}", size),
            Op::Label(label) => write!(f, "Label *{}", label),
            Op::Goto(label) => write!(f, "Goto *{}", label),
            Op::Branch(cond, label) => write!(f, "Branch {} *{}", cond, label),
            Op::NBranch(cond, label) => write!(f, "NBranch {} *{}", cond, label),
            Op::Call(target, call) => {
                let args = call
                    .args
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "Call {} *{}({})", target, call.method, args)
            }
            Op::Print(v) => write!(f, "Print {}", v),
            Op::Return(v) => write!(f, "Return {}", v),
            Op::Member(obj, field) => write!(f, "Member {} *{}", obj, field),
            Op::Index(array, index) => write!(f, "Index {} {}", array, index),
            Op::Store(v, slot) => write!(f, "Store {} *{}", v, slot),
            Op::Load(slot) => write!(f, "Load *{}", slot),
            Op::VarAssg(v, name) => write!(f, "VarAssg {} *{}", v, name),
            Op::MemberAssg(obj, v, field) => write!(f, "MemberAssg {} {} *{}", obj, v, field),
            Op::IndexAssg(array, v, index) => write!(f, "IndexAssg {} {} {}", array, v, index),
            Op::Not(v) => write!(f, "Not {}", v),
            Op::Binary(op, l, r) => write!(f, "{} {} {}", op, l, r),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub op: Op,
    /// Source node, for diagnostics only.
    pub pos: Option<Positions>,
    register: Option<Register>,
    pinned: Option<Register>,
    spill_slot: Option<u32>,
}

impl Instruction {
    pub fn new(op: Op) -> Self {
        Self {
            op,
            pos: None,
            register: None,
            pinned: None,
            spill_slot: None,
        }
    }

    pub fn with_pos(op: Op, pos: Positions) -> Self {
        Self {
            pos: Some(pos),
            ..Self::new(op)
        }
    }

    pub fn register(&self) -> Option<Register> {
        self.register
    }

    pub(crate) fn set_register(&mut self, register: Option<Register>) {
        self.register = register;
    }

    /// Fix the register of this instruction before allocation runs.
    pub fn pin(&mut self, register: Register) {
        self.pinned = Some(register);
    }

    pub fn pinned(&self) -> Option<Register> {
        self.pinned
    }

    pub fn spill_slot(&self) -> Option<u32> {
        self.spill_slot
    }

    pub(crate) fn set_spill_slot(&mut self, slot: u32) {
        self.spill_slot = Some(slot);
    }

    /// Loads, stores and spilled definitions live in memory, never in an
    /// allocatable register.
    pub fn is_spill_code(&self) -> bool {
        self.spill_slot.is_some() || matches!(self.op, Op::Load(_) | Op::Store(..))
    }
}

#[derive(Debug, Clone)]
pub struct Method {
    pub name: Symbol,
    pub params: Vec<Symbol>,
    body: Body,
}

impl Method {
    pub fn new(name: Symbol, params: Vec<Symbol>, body: Body) -> Self {
        Self { name, params, body }
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }
}

#[derive(Debug, Clone)]
pub struct Class {
    pub name: Symbol,
    pub superclass: Option<Symbol>,
    pub fields: Vec<Symbol>,
    pub methods: Vec<Method>,
}

#[derive(Debug, Clone)]
pub struct Program {
    pub main: Method,
    pub classes: Vec<Class>,
}

impl Program {
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        std::iter::once(&self.main).chain(self.classes.iter().flat_map(|cl| cl.methods.iter()))
    }

    pub fn methods_mut(&mut self) -> impl Iterator<Item = &mut Method> {
        std::iter::once(&mut self.main)
            .chain(self.classes.iter_mut().flat_map(|cl| cl.methods.iter_mut()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operands() {
        let call = Op::Call(
            InstrId(0),
            Call {
                method: Symbol::new("run"),
                args: vec![InstrId(3), InstrId(4)],
            },
        );
        assert_eq!(call.operands(), vec![InstrId(0), InstrId(3), InstrId(4)]);

        let mut index_assg = Op::IndexAssg(InstrId(1), InstrId(2), InstrId(5));
        assert_eq!(index_assg.operands(), vec![InstrId(1), InstrId(2), InstrId(5)]);
        for operand in index_assg.operands_mut() {
            if *operand == InstrId(5) {
                *operand = InstrId(9);
            }
        }
        assert_eq!(index_assg, Op::IndexAssg(InstrId(1), InstrId(2), InstrId(9)));

        assert!(Op::Load(0).operands().is_empty());
    }

    #[test]
    fn test_defines_value() {
        assert!(Op::Int(1).defines_value());
        assert!(Op::VarAssg(InstrId(0), Symbol::new("x")).defines_value());
        assert!(!Op::Goto(Label::IfDone(0)).defines_value());
        assert!(!Op::Return(InstrId(0)).defines_value());
        assert!(!Op::Store(InstrId(0), 0).defines_value());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Op::Binary(BinOp::Plus, InstrId(1), InstrId(2)).to_string(),
            "Plus 1 2"
        );
        assert_eq!(
            Op::NBranch(InstrId(3), Label::IfElse(0)).to_string(),
            "NBranch 3 *if_else_0"
        );
    }
}
