//! Syntax tree handed over by the front end.
//!
//! The parser and the type checker live outside this crate; everything here
//! is assumed to be well formed.

use strum::{Display, EnumIter, EnumString};

use crate::common::Positions;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(pub String);

impl Ident {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub main: MainClass,
    pub classes: Vec<ClassDecl>,
}

/// The static entry point. It has no `this`, no locals and no return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainClass {
    pub name: Ident,
    pub body: Stmt,
    pub pos: Positions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    pub name: Ident,
    pub extends: Option<Ident>,
    pub fields: Vec<VarDecl>,
    pub methods: Vec<MethodDecl>,
    pub pos: Positions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub ret_type: Type,
    pub name: Ident,
    pub params: Vec<Param>,
    pub var_decls: Vec<VarDecl>,
    pub body: Vec<Stmt>,
    pub ret: Expr,
    pub pos: Positions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub ty: Type,
    pub name: Ident,
    pub pos: Positions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarDecl {
    pub ty: Type,
    pub name: Ident,
    pub pos: Positions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Boolean,
    IntArray,
    Class(Ident),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Block(Vec<Stmt>, Positions),
    If {
        cond: Expr,
        then: Box<Stmt>,
        els: Option<Box<Stmt>>,
        pos: Positions,
    },
    While(Expr, Box<Stmt>, Positions),
    Print(Expr, Positions),
    Expr(Expr, Positions),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LValue {
    Var(Ident, Positions),
    Member(Box<Expr>, Ident, Positions),
    Index(Box<Expr>, Box<Expr>, Positions),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Assign(LValue, Box<Expr>, Positions),
    Op(Operator, Box<Expr>, Box<Expr>, Positions),
    Not(Box<Expr>, Positions),
    Int(i32, Positions),
    Bool(bool, Positions),
    Null(Positions),
    This(Positions),
    Var(Ident, Positions),
    Member(Box<Expr>, Ident, Positions),
    Index(Box<Expr>, Box<Expr>, Positions),
    Call {
        target: Box<Expr>,
        method: Ident,
        args: Vec<Expr>,
        pos: Positions,
    },
    NewObject(Ident, Positions),
    NewIntArray(Box<Expr>, Positions),
}

impl Expr {
    pub fn pos(&self) -> Positions {
        match self {
            Expr::Assign(_, _, pos)
            | Expr::Op(_, _, _, pos)
            | Expr::Not(_, pos)
            | Expr::Int(_, pos)
            | Expr::Bool(_, pos)
            | Expr::Null(pos)
            | Expr::This(pos)
            | Expr::Var(_, pos)
            | Expr::Member(_, _, pos)
            | Expr::Index(_, _, pos)
            | Expr::Call { pos, .. }
            | Expr::NewObject(_, pos)
            | Expr::NewIntArray(_, pos) => *pos,
        }
    }
}

/// Binary operator token, parsed from and printed as its source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum Operator {
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Mod,
}
