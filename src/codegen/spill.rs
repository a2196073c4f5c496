use std::collections::HashMap;

use log::debug;

use crate::ir::{Body, InstrId, Instruction, Op};

use super::variable::{VarId, Variables};

/// Move every spilled variable into its own stack slot.
///
/// Each definition is followed by a `Store` and each use is preceded by a
/// `Load`, so the variable itself never needs a register again. Slots are
/// numbered from `next_slot`, which is advanced past the ones taken.
/// Returns the number of inserted instructions.
pub fn rewrite_program(
    body: &mut Body,
    vars: &Variables,
    spilled_nodes: &[VarId],
    next_slot: &mut u32,
) -> usize {
    let mut slot_of: HashMap<InstrId, u32> = HashMap::new();
    for &var in spilled_nodes {
        let slot = *next_slot;
        *next_slot += 1;

        debug!("spill {} to slot {}", var, slot);
        for &member in vars.members(var) {
            body.get_mut(member).set_spill_slot(slot);
            slot_of.insert(member, slot);
        }
    }

    let mut inserted = 0;
    let mut position = 0;
    while position < body.len() {
        let id = body.id_at(position);
        let instruction = body.get(id);
        let own_slot = slot_of.get(&id).copied();
        let pos = instruction.pos;

        // members of one variable share the slot, nothing to load
        let keeps_operands = own_slot.is_some() && instruction.op.is_unify();

        if !keeps_operands {
            let mut loads: Vec<(u32, InstrId)> = Vec::new();
            for operand in instruction.op.operands() {
                let slot = match slot_of.get(&operand) {
                    Some(&slot) => slot,
                    None => continue,
                };
                if loads.iter().any(|&(s, _)| s == slot) {
                    continue;
                }

                let mut load = Instruction::new(Op::Load(slot));
                load.pos = pos;
                let load = body.insert(position, load);
                position += 1;
                inserted += 1;
                loads.push((slot, load));
            }

            if !loads.is_empty() {
                for operand in body.get_mut(id).op.operands_mut() {
                    if let Some(&slot) = slot_of.get(&*operand) {
                        if let Some(&(_, load)) = loads.iter().find(|&&(s, _)| s == slot) {
                            *operand = load;
                        }
                    }
                }
            }
        }

        let instruction = body.get(id);
        if let Some(slot) = own_slot {
            if instruction.op.defines_value() && !instruction.op.is_unify() {
                let mut store = Instruction::new(Op::Store(id, slot));
                store.pos = pos;
                body.insert(position + 1, store);
                position += 1;
                inserted += 1;
            }
        }

        position += 1;
    }

    inserted
}
