use log::debug;
use rayon::prelude::*;

use crate::{
    ir::{Body, Class, Method, Program},
    Error, Result,
};

use super::{
    color::{self, Coloring},
    flow::FlowGraph,
    liveness::{self, InterferenceGraph},
    spill,
    variable::Variables,
};

/// What the code generator needs to know besides the registers written into
/// the body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Allocation {
    /// Build-color-spill iterations, the last one without spills.
    pub rounds: usize,
    /// Stack slots used by spill code.
    pub stack_slots: u32,
}

/// Allocate registers `0..k` for one method body, rewriting it with spill
/// code until everything left fits.
pub fn alloc(body: &mut Body, k: u32) -> Result<Allocation> {
    if k == 0 {
        return Err(Error::NoFreeRegisters);
    }

    let mut allocation = Allocation::default();
    loop {
        allocation.rounds += 1;

        let vars = Variables::build(body);
        let mut flow_graph = FlowGraph::convert(body, &vars)?;
        liveness::analyze(&mut flow_graph);

        let candidates = liveness::candidates(body, &vars);
        let interference = InterferenceGraph::build(&flow_graph, &candidates);
        let coloring = color::color(&interference, k);

        debug!(
            "round {}: {} instructions, {} variables, {} candidates, {} spills",
            allocation.rounds,
            body.len(),
            vars.len(),
            candidates.len(),
            coloring.spills.len()
        );

        if coloring.spills.is_empty() {
            assign(body, &vars, &coloring);
            return Ok(allocation);
        }

        spill::rewrite_program(body, &vars, &coloring.spills, &mut allocation.stack_slots);
    }
}

fn assign(body: &mut Body, vars: &Variables, coloring: &Coloring) {
    let ids = body.ids().to_vec();
    for id in ids {
        let instruction = body.get_mut(id);
        let register = match coloring.colors.get(&vars.var_of(id)) {
            Some(&color) if instruction.op.defines_value() => Some(color),
            _ => None,
        };
        instruction.set_register(register);
    }
}

pub fn alloc_method(method: &mut Method, k: u32) -> Result<Allocation> {
    let allocation = alloc(method.body_mut(), k)?;
    debug!(
        "{}: {} rounds, {} stack slots",
        method.name, allocation.rounds, allocation.stack_slots
    );
    Ok(allocation)
}

pub fn alloc_class(class: &mut Class, k: u32) -> Result<Vec<Allocation>> {
    class
        .methods
        .par_iter_mut()
        .map(|method| alloc_method(method, k))
        .collect()
}

/// Allocate every method of the program, `main` first in the result.
pub fn alloc_program(program: &mut Program, k: u32) -> Result<Vec<Allocation>> {
    program
        .methods_mut()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|method| alloc_method(method, k))
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::ir::{BinOp, InstrId, Instruction, Op};

    use super::*;

    fn straight_line() -> (Body, [InstrId; 3]) {
        // a = 1; b = 2; c = 3; print(a + b + c)
        let mut body = Body::new();
        let a = body.push(Instruction::new(Op::Int(1)));
        let b = body.push(Instruction::new(Op::Int(2)));
        let c = body.push(Instruction::new(Op::Int(3)));
        let ab = body.push(Instruction::new(Op::Binary(BinOp::Plus, a, b)));
        let abc = body.push(Instruction::new(Op::Binary(BinOp::Plus, ab, c)));
        body.push(Instruction::new(Op::Print(abc)));
        (body, [a, b, c])
    }

    #[test]
    fn test_no_registers() {
        let (mut body, _) = straight_line();
        assert_eq!(alloc(&mut body, 0), Err(Error::NoFreeRegisters));
    }

    #[test]
    fn test_fits() {
        let (mut body, [a, b, c]) = straight_line();
        let allocation = alloc(&mut body, 3).unwrap();

        assert_eq!(allocation.rounds, 1);
        assert_eq!(allocation.stack_slots, 0);
        assert_eq!(body.len(), 6);

        let regs = [a, b, c].map(|id| body.get(id).register());
        assert!(regs.iter().all(|r| matches!(r, Some(r) if *r < 3)));
        assert_ne!(regs[0], regs[1]);
        assert_ne!(regs[1], regs[2]);
        assert_ne!(regs[0], regs[2]);

        let (_, print) = body.iter().last().unwrap();
        assert_eq!(print.register(), None);
    }

    #[test]
    fn test_spill() {
        let (mut body, [a, b, c]) = straight_line();
        let allocation = alloc(&mut body, 2).unwrap();

        assert_eq!(allocation.rounds, 2);
        assert_eq!(allocation.stack_slots, 1);
        assert_eq!(body.get(a).spill_slot(), Some(0));
        assert_eq!(body.get(a).register(), None);
        assert!(body.get(b).register().is_some());
        assert!(body.get(c).register().is_some());

        let stores = body
            .iter()
            .filter(|(_, i)| matches!(i.op, Op::Store(_, 0)))
            .count();
        let loads = body
            .iter()
            .filter(|(_, i)| matches!(i.op, Op::Load(0)))
            .count();
        assert_eq!((stores, loads), (1, 1));
        assert!(body
            .iter()
            .filter(|(_, i)| i.is_spill_code())
            .all(|(_, i)| i.register().is_none()));
    }

    #[test]
    fn test_pinned_register_wins() {
        let mut body = Body::new();
        let p = body.push(Instruction::new(Op::Parameter(0)));
        let one = body.push(Instruction::new(Op::Int(1)));
        let sum = body.push(Instruction::new(Op::Binary(BinOp::Plus, p, one)));
        body.push(Instruction::new(Op::Return(sum)));
        body.get_mut(p).pin(1);

        alloc(&mut body, 2).unwrap();
        assert_eq!(body.get(p).register(), Some(1));
        assert_eq!(body.get(one).register(), Some(0));
    }
}
