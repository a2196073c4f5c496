//! Lowering of the syntax tree into the linear IR.
//!
//! Structured control flow becomes labels and branches. Every name maps to
//! the instruction that last defined it; where two control paths meet with
//! different definitions a `Unify` ties them to one storage location.

use std::collections::HashMap;

use itertools::Itertools;
use log::debug;

use crate::{
    ast::{ClassDecl, Expr, LValue, MainClass, MethodDecl, Program, Stmt},
    common::{Label, LabelGen, Positions, Symbol},
    ir::{self, Body, Call, InstrId, Instruction, Op},
    Error, Result,
};

type SymbolTable = HashMap<Symbol, InstrId>;

/// Straight-line code under construction together with the bindings that
/// are visible at its end.
#[derive(Debug, Default)]
struct Scope {
    code: Vec<InstrId>,
    symbols: SymbolTable,
}

impl Scope {
    /// Empty code sharing the current bindings, for code compiled on a side path.
    fn fork(&self) -> Self {
        Self {
            code: Vec::new(),
            symbols: self.symbols.clone(),
        }
    }
}

struct Translator {
    instructions: Vec<Instruction>,
    labels: LabelGen,
    // `false` while compiling the static main method.
    has_this: bool,
}

impl Translator {
    fn new(has_this: bool) -> Self {
        Self {
            instructions: Vec::new(),
            labels: LabelGen::new(),
            has_this,
        }
    }

    fn finish(self, root: Scope) -> Body {
        Body::from_parts(self.instructions, root.code)
    }

    fn emit(&mut self, scope: &mut Scope, op: Op, pos: Positions) -> InstrId {
        let id = InstrId(self.instructions.len() as u32);
        self.instructions.push(Instruction::with_pos(op, pos));
        scope.code.push(id);
        id
    }

    fn this(&mut self, scope: &mut Scope, name: Symbol, pos: Positions) -> Result<InstrId> {
        if !self.has_this {
            return Err(Error::NoReceiver { name, pos });
        }
        Ok(self.emit(scope, Op::This, pos))
    }

    fn stmt(&mut self, scope: &mut Scope, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Block(stmts, _) => {
                for stmt in stmts {
                    self.stmt(scope, stmt)?;
                }
            }
            Stmt::If {
                cond,
                then,
                els,
                pos,
            } => self.if_stmt(scope, cond, then, els.as_deref(), *pos)?,
            Stmt::While(cond, body, pos) => self.while_stmt(scope, cond, body, *pos)?,
            Stmt::Print(value, pos) => {
                let value = self.expr(scope, value)?;
                self.emit(scope, Op::Print(value), *pos);
            }
            Stmt::Expr(expr, _) => {
                self.expr(scope, expr)?;
            }
        }
        Ok(())
    }

    fn if_stmt(
        &mut self,
        scope: &mut Scope,
        cond: &Expr,
        then: &Stmt,
        els: Option<&Stmt>,
        pos: Positions,
    ) -> Result<()> {
        let cond = self.expr(scope, cond)?;

        let n = self.labels.fresh();
        let (else_label, done_label) = (Label::IfElse(n), Label::IfDone(n));

        self.emit(scope, Op::NBranch(cond, else_label.clone()), pos);

        let mut side = scope.fork();

        self.stmt(scope, then)?;
        self.emit(scope, Op::Goto(done_label.clone()), pos);
        self.emit(scope, Op::Label(else_label), pos);

        if let Some(els) = els {
            self.stmt(&mut side, els)?;
        }
        scope.code.append(&mut side.code);

        self.emit(scope, Op::Label(done_label), pos);
        self.unify(scope, &side.symbols, pos);

        Ok(())
    }

    fn while_stmt(
        &mut self,
        scope: &mut Scope,
        cond: &Expr,
        body: &Stmt,
        pos: Positions,
    ) -> Result<()> {
        let n = self.labels.fresh();
        let (cond_label, end_label) = (Label::WhileCond(n), Label::WhileEnd(n));

        self.emit(scope, Op::Label(cond_label.clone()), pos);
        let cond = self.expr(scope, cond)?;
        self.emit(scope, Op::NBranch(cond, end_label.clone()), pos);

        let mut side = scope.fork();
        self.stmt(&mut side, body)?;
        scope.code.append(&mut side.code);

        self.emit(scope, Op::Goto(cond_label), pos);
        self.emit(scope, Op::Label(end_label), pos);
        self.unify(scope, &side.symbols, pos);

        Ok(())
    }

    /// Merge the bindings of a side path back into `scope`.
    fn unify(&mut self, scope: &mut Scope, other: &SymbolTable, pos: Positions) {
        let merges = scope
            .symbols
            .iter()
            .filter_map(|(&name, &ours)| match other.get(&name) {
                Some(&theirs) if theirs != ours => Some((name, ours, theirs)),
                _ => None,
            })
            .sorted_by_key(|&(_, ours, _)| ours)
            .collect::<Vec<_>>();

        for (name, ours, theirs) in merges {
            let unify = self.emit(scope, Op::Unify(ours, theirs), pos);
            debug!("unify {}: {} = Unify {} {}", name, unify, ours, theirs);
            scope.symbols.insert(name, unify);
        }
    }

    fn expr(&mut self, scope: &mut Scope, expr: &Expr) -> Result<InstrId> {
        let id = match expr {
            Expr::Assign(target, value, pos) => self.assign(scope, target, value, *pos)?,
            Expr::Op(op, left, right, pos) => {
                let left = self.expr(scope, left)?;
                let right = self.expr(scope, right)?;
                self.emit(scope, Op::Binary((*op).into(), left, right), *pos)
            }
            Expr::Not(value, pos) => {
                let value = self.expr(scope, value)?;
                self.emit(scope, Op::Not(value), *pos)
            }
            Expr::Int(n, pos) => self.emit(scope, Op::Int(*n), *pos),
            Expr::Bool(b, pos) => self.emit(scope, Op::Boolean(*b), *pos),
            Expr::Null(pos) => self.emit(scope, Op::Null, *pos),
            Expr::This(pos) => self.this(scope, Symbol::new("this"), *pos)?,
            Expr::Var(name, pos) => {
                let name = Symbol::from(name);
                match scope.symbols.get(&name).copied() {
                    Some(id) => id,
                    None => {
                        let this = self.this(scope, name, *pos)?;
                        self.emit(scope, Op::Member(this, name), *pos)
                    }
                }
            }
            Expr::Member(sub, name, pos) => {
                let sub = self.expr(scope, sub)?;
                self.emit(scope, Op::Member(sub, name.into()), *pos)
            }
            Expr::Index(array, index, pos) => {
                let array = self.expr(scope, array)?;
                let index = self.expr(scope, index)?;
                self.emit(scope, Op::Index(array, index), *pos)
            }
            Expr::Call {
                target,
                method,
                args,
                pos,
            } => {
                let target = self.expr(scope, target)?;
                let values = args
                    .iter()
                    .map(|arg| self.expr(scope, arg))
                    .collect::<Result<Vec<_>>>()?;
                let args = values
                    .into_iter()
                    .zip(args)
                    .enumerate()
                    .map(|(i, (value, arg))| self.emit(scope, Op::Arg(value, i), arg.pos()))
                    .collect();
                let call = Call {
                    method: method.into(),
                    args,
                };
                self.emit(scope, Op::Call(target, call), *pos)
            }
            Expr::NewObject(class, pos) => self.emit(scope, Op::NewObj(class.into()), *pos),
            Expr::NewIntArray(size, pos) => {
                let size = self.expr(scope, size)?;
                self.emit(scope, Op::NewIntArray(size), *pos)
            }
        };
        Ok(id)
    }

    fn assign(
        &mut self,
        scope: &mut Scope,
        target: &LValue,
        value: &Expr,
        pos: Positions,
    ) -> Result<InstrId> {
        let value = self.expr(scope, value)?;

        let id = match target {
            LValue::Var(name, _) => {
                let name = Symbol::from(name);
                if scope.symbols.contains_key(&name) {
                    let id = self.emit(scope, Op::VarAssg(value, name), pos);
                    scope.symbols.insert(name, id);
                    id
                } else {
                    let this = self.this(scope, name, pos)?;
                    self.emit(scope, Op::MemberAssg(this, value, name), pos)
                }
            }
            LValue::Member(sub, name, _) => {
                let sub = self.expr(scope, sub)?;
                self.emit(scope, Op::MemberAssg(sub, value, name.into()), pos)
            }
            LValue::Index(array, index, _) => {
                let array = self.expr(scope, array)?;
                let index = self.expr(scope, index)?;
                self.emit(scope, Op::IndexAssg(array, value, index), pos)
            }
        };
        Ok(id)
    }
}

pub fn translate_method(method: &MethodDecl) -> Result<ir::Method> {
    let mut translator = Translator::new(true);
    let mut root = Scope::default();

    let mut params = Vec::with_capacity(method.params.len());
    for (i, param) in method.params.iter().enumerate() {
        let name = Symbol::from(&param.name);
        let id = translator.emit(&mut root, Op::Parameter(i), param.pos);
        root.symbols.insert(name, id);
        params.push(name);
    }

    for var in &method.var_decls {
        let id = translator.emit(&mut root, Op::Null, var.pos);
        root.symbols.insert(Symbol::from(&var.name), id);
    }

    for stmt in &method.body {
        translator.stmt(&mut root, stmt)?;
    }

    let ret = translator.expr(&mut root, &method.ret)?;
    translator.emit(&mut root, Op::Return(ret), method.ret.pos());

    Ok(ir::Method::new(
        Symbol::from(&method.name),
        params,
        translator.finish(root),
    ))
}

pub fn translate_main(main: &MainClass) -> Result<ir::Method> {
    let mut translator = Translator::new(false);
    let mut root = Scope::default();

    translator.stmt(&mut root, &main.body)?;

    Ok(ir::Method::new(
        Symbol::new("main"),
        Vec::new(),
        translator.finish(root),
    ))
}

pub fn translate_class(class: &ClassDecl) -> Result<ir::Class> {
    let methods = class
        .methods
        .iter()
        .map(translate_method)
        .collect::<Result<Vec<_>>>()?;

    Ok(ir::Class {
        name: Symbol::from(&class.name),
        superclass: class.extends.as_ref().map(Symbol::from),
        fields: class.fields.iter().map(|f| Symbol::from(&f.name)).collect(),
        methods,
    })
}

pub fn translate(program: &Program) -> Result<ir::Program> {
    let main = translate_main(&program.main)?;
    let classes = program
        .classes
        .iter()
        .map(translate_class)
        .collect::<Result<Vec<_>>>()?;

    Ok(ir::Program { main, classes })
}
