use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use log::trace;

use crate::ir::{Body, Register};

use super::{
    flow::{FlowGraph, LiveSet},
    graph::{Graph, ID},
    variable::{VarId, Variables},
};

/// Iterate the dataflow equations until nothing changes. Returns the number
/// of passes, the last of which changed nothing.
pub fn analyze(flow_graph: &mut FlowGraph) -> usize {
    let graph = flow_graph.graph_mut();

    let mut passes = 0;
    loop {
        passes += 1;
        let mut has_change = false;

        for id in graph.ids().rev() {
            let node = graph.get(id).val();

            let mut new_out: LiveSet = node.def.into_iter().collect();
            for succ in graph.succ(id) {
                new_out.extend(&graph.get(succ).val().live_in);
            }

            let mut new_in = node.uses.clone();
            new_in.extend(new_out.iter().filter(|&&v| Some(v) != node.def));

            if node.live_in != new_in || node.live_out != new_out {
                has_change = true;
                let node = graph.get_mut(id).val_mut();
                node.live_in = new_in;
                node.live_out = new_out;
            }
        }

        if !has_change {
            break;
        }
    }

    trace!("liveness converged after {} passes", passes);
    passes
}

/// Variables that compete for a register, with the register their pinned
/// member asks for.
pub type Candidates = BTreeMap<VarId, Option<Register>>;

/// A variable is a candidate when it holds a value and none of its members
/// already lives in memory.
pub fn candidates(body: &Body, vars: &Variables) -> Candidates {
    vars.iter()
        .filter(|(_, members)| {
            let members = members.iter().map(|&id| body.get(id));
            members.clone().any(|m| m.op.defines_value())
                && !members.clone().any(|m| m.is_spill_code())
        })
        .map(|(var, members)| {
            let pinned = members.iter().find_map(|&id| body.get(id).pinned());
            (var, pinned)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterferenceNode {
    pub var: VarId,
    pub pinned: Option<Register>,
}

#[derive(Debug, Clone)]
pub struct InterferenceGraph {
    graph: Graph<InterferenceNode>,
    var2id: HashMap<VarId, ID>,
}

impl InterferenceGraph {
    pub fn graph_ref(&self) -> &Graph<InterferenceNode> {
        &self.graph
    }

    pub fn id(&self, var: VarId) -> Option<ID> {
        self.var2id.get(&var).copied()
    }

    pub fn var(&self, id: ID) -> VarId {
        self.graph.get(id).val().var
    }

    pub fn interferes(&self, a: VarId, b: VarId) -> bool {
        match (self.id(a), self.id(b)) {
            (Some(a), Some(b)) => self.graph.get(a).adj().any(|id| id == b),
            _ => false,
        }
    }

    /// Two candidates interfere when they are live together on entry to or
    /// exit from some instruction.
    pub fn build(flow_graph: &FlowGraph, candidates: &Candidates) -> Self {
        let mut graph = Graph::with_capacity(candidates.len());
        let mut var2id = HashMap::new();

        for (&var, &pinned) in candidates {
            let id = graph.insert(InterferenceNode { var, pinned });
            var2id.insert(var, id);
        }

        for flow_node in flow_graph.graph_ref().nodes() {
            let node = flow_node.val();
            for set in [&node.live_in, &node.live_out] {
                let lives = set
                    .iter()
                    .filter_map(|var| var2id.get(var).copied())
                    .sorted();
                for (one, other) in lives.tuple_combinations() {
                    graph.double_link(one, other);
                }
            }
        }

        trace!(
            "interference graph: {} nodes, {} edges",
            graph.len(),
            graph.nodes().iter().map(|n| n.succ().count()).sum::<usize>() / 2
        );

        Self { graph, var2id }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::codegen::flow::Node;

    use super::*;

    fn var(n: u32) -> VarId {
        VarId(n)
    }

    fn flow_graph() -> FlowGraph {
        //     a <- 0
        // L1: b <- a + 1
        //     c <- c + b
        //     a <- b * 2
        //     if a < N goto L1
        //     return c
        let (a, b, c) = (var(0), var(1), var(2));
        let nodes = vec![
            (Some(a), vec![]),
            (Some(b), vec![a]),
            (Some(c), vec![c, b]),
            (Some(a), vec![b]),
            (None, vec![a]),
            (None, vec![c]),
        ];
        let edges = vec![(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (4, 1)];

        let mut graph = Graph::new();
        let mut ids = Vec::new();
        for (n, (def, uses)) in nodes.into_iter().enumerate() {
            let id = graph.insert(Node {
                instr: crate::ir::InstrId(n as u32),
                def,
                uses: uses.into_iter().collect(),
                live_in: LiveSet::new(),
                live_out: LiveSet::new(),
            });
            ids.push(id);
        }
        for (from, to) in edges {
            graph.link(ids[from], ids[to]);
        }

        FlowGraph { graph }
    }

    #[test]
    fn test_liveness() {
        let (a, b, c) = (var(0), var(1), var(2));
        let mut flow = flow_graph();
        analyze(&mut flow);

        let expected_live_out = vec![
            HashSet::from([a, c]),
            HashSet::from([b, c]),
            HashSet::from([b, c]),
            HashSet::from([a, c]),
            HashSet::from([a, c]),
            HashSet::from([]),
        ];
        let expected_live_in = vec![
            HashSet::from([c]),
            HashSet::from([a, c]),
            HashSet::from([b, c]),
            HashSet::from([b, c]),
            HashSet::from([a, c]),
            HashSet::from([c]),
        ];

        let nodes = flow.graph_ref().nodes();
        assert_eq!(nodes.len(), expected_live_out.len());
        for ((node, out), live_in) in nodes.iter().zip(expected_live_out).zip(expected_live_in) {
            assert_eq!(node.val().live_out, out);
            assert_eq!(node.val().live_in, live_in);
        }
    }

    #[test]
    fn test_liveness_fixpoint() {
        let mut flow = flow_graph();
        analyze(&mut flow);
        let converged = flow.graph_ref().nodes().to_vec();

        assert_eq!(analyze(&mut flow), 1);
        for (before, after) in converged.iter().zip(flow.graph_ref().nodes()) {
            assert_eq!(before.val(), after.val());
        }
    }

    #[test]
    fn test_interference() {
        let (a, b, c) = (var(0), var(1), var(2));
        let mut flow = flow_graph();
        analyze(&mut flow);

        let candidates = Candidates::from([(a, None), (b, None), (c, Some(3))]);
        let live_graph = InterferenceGraph::build(&flow, &candidates);

        for node in live_graph.graph_ref().nodes() {
            let pred: HashSet<_> = live_graph.graph_ref().pred(node.id()).collect();
            let succ: HashSet<_> = live_graph.graph_ref().succ(node.id()).collect();
            assert_eq!(pred, succ);

            let set: HashSet<_> = pred.iter().map(|&id| live_graph.var(id)).collect();
            let v = node.val().var;
            if v == a || v == b {
                assert_eq!(set, HashSet::from([c]));
            } else if v == c {
                assert_eq!(set, HashSet::from([a, b]));
                assert_eq!(node.val().pinned, Some(3));
            } else {
                unreachable!()
            }
        }
        assert!(!live_graph.interferes(a, b));
        assert!(live_graph.interferes(b, c));
    }

    #[test]
    fn test_interference_skips_non_candidates() {
        let (a, b, c) = (var(0), var(1), var(2));
        let mut flow = flow_graph();
        analyze(&mut flow);

        let candidates = Candidates::from([(a, None), (b, None)]);
        let live_graph = InterferenceGraph::build(&flow, &candidates);

        assert_eq!(live_graph.graph_ref().len(), 2);
        assert!(live_graph.id(c).is_none());
        assert!(!live_graph.interferes(a, c));
        assert!(live_graph.graph_ref().nodes().iter().all(|n| n.adj().count() == 0));
    }
}
