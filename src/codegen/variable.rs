//! Storage classes of a method body.
//!
//! Instructions tied together by `Unify` must live in the same place. The
//! classes are rebuilt from scratch whenever the body changes.

use std::fmt::Display;

use crate::ir::{Body, InstrId, Op};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub(crate) u32);

impl VarId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for VarId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variables {
    // indexed by `InstrId`
    var_of: Vec<Option<VarId>>,
    // indexed by `VarId`, empty once merged away
    members: Vec<Vec<InstrId>>,
}

impl Variables {
    pub fn build(body: &Body) -> Self {
        let mut vars = Self {
            var_of: vec![None; body.capacity()],
            members: Vec::with_capacity(body.len()),
        };

        for (n, &id) in body.ids().iter().enumerate() {
            vars.var_of[id.index()] = Some(VarId(n as u32));
            vars.members.push(vec![id]);
        }

        for (id, instruction) in body.iter() {
            if let Op::Unify(left, right) = instruction.op {
                vars.merge(id, left);
                vars.merge(id, right);
            }
        }

        vars
    }

    /// Put `a` and `b` into the same class. The smaller id survives.
    pub(crate) fn merge(&mut self, a: InstrId, b: InstrId) {
        let (a, b) = (self.var_of(a), self.var_of(b));
        if a == b {
            return;
        }
        let (keep, gone) = if a < b { (a, b) } else { (b, a) };

        let moved = std::mem::take(&mut self.members[gone.index()]);
        for &id in &moved {
            self.var_of[id.index()] = Some(keep);
        }
        self.members[keep.index()].extend(moved);
    }

    pub fn var_of(&self, id: InstrId) -> VarId {
        match self.var_of.get(id.index()).copied().flatten() {
            Some(var) => var,
            None => unreachable!("instruction {} is not part of the body", id),
        }
    }

    pub fn members(&self, var: VarId) -> &[InstrId] {
        &self.members[var.index()]
    }

    /// Live classes in id order.
    pub fn iter(&self) -> impl Iterator<Item = (VarId, &[InstrId])> + '_ {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, members)| !members.is_empty())
            .map(|(n, members)| (VarId(n as u32), members.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
