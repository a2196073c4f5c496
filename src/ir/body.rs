use std::fmt::Display;

use super::{InstrId, Instruction};

/// Instructions of one method.
///
/// Instructions live in an arena and refer to each other by [`InstrId`];
/// `order` is the linear program order. Inserting an instruction never
/// invalidates existing ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    arena: Vec<Instruction>,
    order: Vec<InstrId>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(arena: Vec<Instruction>, order: Vec<InstrId>) -> Self {
        debug_assert_eq!(arena.len(), order.len());
        Self { arena, order }
    }

    fn alloc(&mut self, instruction: Instruction) -> InstrId {
        let id = InstrId(self.arena.len() as u32);
        self.arena.push(instruction);
        id
    }

    /// Append to the end of the body.
    pub fn push(&mut self, instruction: Instruction) -> InstrId {
        let id = self.alloc(instruction);
        self.order.push(id);
        id
    }

    /// Insert so that the new instruction ends up at `position`.
    pub fn insert(&mut self, position: usize, instruction: Instruction) -> InstrId {
        let id = self.alloc(instruction);
        self.order.insert(position, id);
        id
    }

    pub fn get(&self, id: InstrId) -> &Instruction {
        &self.arena[id.index()]
    }

    pub fn get_mut(&mut self, id: InstrId) -> &mut Instruction {
        &mut self.arena[id.index()]
    }

    pub fn id_at(&self, position: usize) -> InstrId {
        self.order[position]
    }

    pub fn position(&self, id: InstrId) -> Option<usize> {
        self.order.iter().position(|&v| v == id)
    }

    pub fn ids(&self) -> &[InstrId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstrId, &Instruction)> + '_ {
        self.order.iter().map(|&id| (id, &self.arena[id.index()]))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Size of the arena, an upper bound of every `InstrId` in this body.
    pub(crate) fn capacity(&self) -> usize {
        self.arena.len()
    }
}

impl Display for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (id, instruction) in self.iter() {
            write!(f, "{:>4}: {}", id.index(), instruction.op)?;
            if let Some(reg) = instruction.register() {
                write!(f, "  ; r{}", reg)?;
            }
            if let Some(reg) = instruction.pinned() {
                write!(f, "  ; pinned r{}", reg)?;
            }
            if let Some(slot) = instruction.spill_slot() {
                write!(f, "  ; slot {}", slot)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
