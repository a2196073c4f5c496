use std::collections::{HashMap, HashSet};

use log::trace;

use crate::{
    common::Label,
    ir::{Body, InstrId, Op},
    Error, Result,
};

use super::{
    graph::{Graph, ID},
    variable::{VarId, Variables},
};

pub type LiveSet = HashSet<VarId>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub instr: InstrId,
    pub def: Option<VarId>,
    pub uses: LiveSet,
    pub live_in: LiveSet,
    pub live_out: LiveSet,
}

impl Node {
    pub fn def(&self) -> Option<VarId> {
        self.def
    }

    pub fn uses(&self) -> &LiveSet {
        &self.uses
    }
}

/// Control flow graph with one node per instruction position. Node `n` of
/// the graph is the instruction at position `n` of the body.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    pub(super) graph: Graph<Node>,
}

impl FlowGraph {
    pub fn graph_ref(&self) -> &Graph<Node> {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph<Node> {
        &mut self.graph
    }

    pub fn convert(body: &Body, vars: &Variables) -> Result<Self> {
        let mut graph = FlowGraph {
            graph: Graph::with_capacity(body.len()),
        };
        graph.convert_inner(body, vars)?;

        Ok(graph)
    }

    fn convert_inner(&mut self, body: &Body, vars: &Variables) -> Result<()> {
        let mut jumps: Vec<(ID, &Label)> = Vec::new();
        let mut labels: HashMap<&Label, ID> = HashMap::new();

        let mut before_id = None;
        for (instr, instruction) in body.iter() {
            let def = instruction.op.defines_value().then(|| vars.var_of(instr));
            let uses = match instruction.op {
                Op::Unify(..) => LiveSet::from([vars.var_of(instr)]),
                ref op => op.operands().into_iter().map(|v| vars.var_of(v)).collect(),
            };

            let id = self.graph.insert(Node {
                instr,
                def,
                uses,
                live_in: LiveSet::new(),
                live_out: LiveSet::new(),
            });

            if let Some(before) = before_id {
                let linked = self.graph.link(before, id);
                assert!(linked);
            }

            match &instruction.op {
                Op::Label(label) => {
                    labels.insert(label, id);
                    before_id = Some(id);
                }
                Op::Goto(label) => {
                    jumps.push((id, label));
                    before_id = None;
                }
                Op::Branch(_, label) | Op::NBranch(_, label) => {
                    jumps.push((id, label));
                    before_id = Some(id);
                }
                _ => {
                    before_id = Some(id);
                }
            }
        }

        for (from, label) in jumps {
            let to = *labels
                .get(label)
                .ok_or_else(|| Error::UnresolvedLabel(label.clone()))?;
            // a branch to the very next label is already linked
            self.graph.link(from, to);
        }

        trace!("flow graph: {} nodes", self.graph.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::ir::{BinOp, Instruction};

    use super::*;

    #[test]
    fn test_convert() {
        //    0: Int 0
        //    1: Label cond
        //    2: Int 10
        //    3: Lt 0 2
        //    4: NBranch 3 end
        //    5: Print 0
        //    6: Goto cond
        //    7: Label end
        //    8: Return 0
        let (cond, end) = (Label::WhileCond(0), Label::WhileEnd(0));
        let mut body = Body::new();
        let i = body.push(Instruction::new(Op::Int(0)));
        body.push(Instruction::new(Op::Label(cond.clone())));
        let ten = body.push(Instruction::new(Op::Int(10)));
        let lt = body.push(Instruction::new(Op::Binary(BinOp::Lt, i, ten)));
        body.push(Instruction::new(Op::NBranch(lt, end.clone())));
        body.push(Instruction::new(Op::Print(i)));
        body.push(Instruction::new(Op::Goto(cond)));
        body.push(Instruction::new(Op::Label(end)));
        body.push(Instruction::new(Op::Return(i)));

        let vars = Variables::build(&body);
        let flow = FlowGraph::convert(&body, &vars).unwrap();
        let graph = flow.graph;

        let expected: Vec<(Vec<usize>, Vec<usize>)> = vec![
            (vec![], vec![1]),
            (vec![0, 6], vec![2]),
            (vec![1], vec![3]),
            (vec![2], vec![4]),
            (vec![3], vec![5, 7]),
            (vec![4], vec![6]),
            (vec![5], vec![1]),
            (vec![4], vec![8]),
            (vec![7], vec![]),
        ];

        assert_edges(&graph, expected);

        let lt_node = graph.get(graph.ids().nth(3).unwrap()).val();
        assert_eq!(lt_node.def(), Some(vars.var_of(lt)));
        assert_eq!(
            lt_node.uses(),
            &LiveSet::from([vars.var_of(i), vars.var_of(ten)])
        );

        let print_node = graph.get(graph.ids().nth(5).unwrap()).val();
        assert_eq!(print_node.def(), None);

        //    0: Int 1
        //    1: Branch 0 done
        //    2: Print 0
        //    3: Label done
        //    4: Return 0
        let done = Label::IfDone(0);
        let mut body = Body::new();
        let one = body.push(Instruction::new(Op::Int(1)));
        body.push(Instruction::new(Op::Branch(one, done.clone())));
        body.push(Instruction::new(Op::Print(one)));
        body.push(Instruction::new(Op::Label(done)));
        body.push(Instruction::new(Op::Return(one)));

        let vars = Variables::build(&body);
        let graph = FlowGraph::convert(&body, &vars).unwrap().graph;
        assert_edges(
            &graph,
            vec![
                (vec![], vec![1]),
                (vec![0], vec![2, 3]),
                (vec![1], vec![3]),
                (vec![1, 2], vec![4]),
                (vec![3], vec![]),
            ],
        );

        let branch_node = graph.get(graph.ids().nth(1).unwrap()).val();
        assert_eq!(branch_node.def(), None);
        assert_eq!(branch_node.uses(), &LiveSet::from([vars.var_of(one)]));
    }

    fn assert_edges(graph: &Graph<Node>, expected: Vec<(Vec<usize>, Vec<usize>)>) {
        assert_eq!(graph.nodes().len(), expected.len());
        for ((pred, succ), actual) in expected.into_iter().zip(graph.nodes().iter()) {
            let actual_pred = graph.pred(actual.id()).map(ID::index).collect::<Vec<_>>();
            assert_eq!(pred, actual_pred);

            let actual_succ = graph.succ(actual.id()).map(ID::index).collect::<Vec<_>>();
            assert_eq!(succ, actual_succ);
        }
    }

    #[test]
    fn test_unify_uses_itself() {
        let mut body = Body::new();
        let a = body.push(Instruction::new(Op::Int(1)));
        let b = body.push(Instruction::new(Op::Int(2)));
        let u = body.push(Instruction::new(Op::Unify(a, b)));

        let vars = Variables::build(&body);
        let flow = FlowGraph::convert(&body, &vars).unwrap();
        let node = flow.graph_ref().nodes()[2].val();
        assert_eq!(node.instr, u);
        assert_eq!(node.uses(), &LiveSet::from([vars.var_of(u)]));
        assert_eq!(node.def(), Some(vars.var_of(a)));
    }

    #[test]
    fn test_unresolved_label() {
        let mut body = Body::new();
        body.push(Instruction::new(Op::Goto(Label::IfDone(7))));

        let vars = Variables::build(&body);
        assert_eq!(
            FlowGraph::convert(&body, &vars).unwrap_err(),
            Error::UnresolvedLabel(Label::IfDone(7))
        );
    }
}
