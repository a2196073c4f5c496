use std::collections::{HashMap, HashSet};

use log::trace;

use crate::ir::Register;

use super::{graph::ID, liveness::InterferenceGraph, variable::VarId};

type LiveID = ID;
type Degree = HashMap<LiveID, usize>;
type AdjList = HashMap<LiveID, HashSet<LiveID>>;
type Pinned = HashMap<LiveID, Register>;
type Remaining = Vec<LiveID>;
type SelectStack = Vec<LiveID>;
type PotentialSpills = HashSet<LiveID>;
type Colors = HashMap<LiveID, Register>;
type SpilledNodes = Vec<LiveID>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coloring {
    pub colors: HashMap<VarId, Register>,
    /// Actual spills, in variable order.
    pub spills: Vec<VarId>,
}

/// Color the interference graph with registers `0..k`.
pub fn color(live_graph: &InterferenceGraph, k: u32) -> Coloring {
    let (mut adj_list, mut degree, pinned) = build(live_graph, k);
    let mut remaining = make_work_list(live_graph);
    let mut select_stack = SelectStack::new();
    let mut potential_spills = PotentialSpills::new();

    // pinned nodes that can go right away
    let easy_pinned = remaining
        .iter()
        .copied()
        .filter(|id| pinned.contains_key(id) && degree[id] < k as usize)
        .collect::<Vec<_>>();
    for id in easy_pinned {
        remove(id, &mut remaining, &mut select_stack, &mut adj_list, &mut degree);
    }

    while !remaining.is_empty() {
        if !simplify(
            &mut remaining,
            &mut select_stack,
            &mut adj_list,
            &mut degree,
            k,
        ) {
            select_spill(
                &mut remaining,
                &mut select_stack,
                &mut adj_list,
                &mut degree,
                &pinned,
                &mut potential_spills,
            );
        }
    }

    let (colors, spilled_nodes) =
        assign_colors(live_graph, &select_stack, &pinned, &potential_spills, k);

    Coloring {
        colors: colors
            .into_iter()
            .map(|(id, reg)| (live_graph.var(id), reg))
            .collect(),
        spills: spilled_nodes
            .into_iter()
            .map(|id| live_graph.var(id))
            .collect(),
    }
}

fn build(live_graph: &InterferenceGraph, k: u32) -> (AdjList, Degree, Pinned) {
    let mut adj_list = AdjList::new();
    let mut degree = Degree::new();
    let mut pinned = Pinned::new();

    for node in live_graph.graph_ref().nodes() {
        let id = node.id();
        let adj: HashSet<_> = node.adj().filter(|&other| other != id).collect();
        degree.insert(id, adj.len());
        adj_list.insert(id, adj);

        // a pin outside the register file cannot be honoured
        if let Some(reg) = node.val().pinned.filter(|&reg| reg < k) {
            pinned.insert(id, reg);
        }
    }

    (adj_list, degree, pinned)
}

fn make_work_list(live_graph: &InterferenceGraph) -> Remaining {
    live_graph.graph_ref().ids().collect()
}

fn remove(
    id: LiveID,
    remaining: &mut Remaining,
    select_stack: &mut SelectStack,
    adj_list: &mut AdjList,
    degree: &mut Degree,
) {
    remaining.retain(|&other| other != id);
    select_stack.push(id);

    let adjs = adj_list.remove(&id).unwrap_or_default();
    for adj in adjs {
        decrement_degree(id, adj, adj_list, degree);
    }
    degree.insert(id, 0);
}

fn decrement_degree(removed: LiveID, id: LiveID, adj_list: &mut AdjList, degree: &mut Degree) {
    if let Some(adj) = adj_list.get_mut(&id) {
        if adj.remove(&removed) {
            *degree.entry(id).or_insert(1) -= 1;
        }
    }
}

/// Remove the first node of insignificant degree. Returns `false` when
/// every remaining node has at least `k` neighbours.
fn simplify(
    remaining: &mut Remaining,
    select_stack: &mut SelectStack,
    adj_list: &mut AdjList,
    degree: &mut Degree,
    k: u32,
) -> bool {
    let id = match remaining.iter().find(|&&id| degree[&id] < k as usize) {
        Some(&id) => id,
        None => return false,
    };

    remove(id, remaining, select_stack, adj_list, degree);
    true
}

fn select_spill(
    remaining: &mut Remaining,
    select_stack: &mut SelectStack,
    adj_list: &mut AdjList,
    degree: &mut Degree,
    pinned: &Pinned,
    potential_spills: &mut PotentialSpills,
) {
    let id = remaining[0];
    if !pinned.contains_key(&id) {
        trace!("potential spill {:?}", id);
        potential_spills.insert(id);
    }

    remove(id, remaining, select_stack, adj_list, degree);
}

fn assign_colors(
    live_graph: &InterferenceGraph,
    select_stack: &SelectStack,
    pinned: &Pinned,
    potential_spills: &PotentialSpills,
    k: u32,
) -> (Colors, SpilledNodes) {
    let mut colors = Colors::new();
    let mut spilled_nodes = SpilledNodes::new();

    let used_by_adj = |id: LiveID, colors: &Colors| -> HashSet<Register> {
        live_graph
            .graph_ref()
            .get(id)
            .adj()
            .filter_map(|adj| colors.get(&adj).copied())
            .collect()
    };

    // the later definition keeps a contended pin, the earlier one goes to memory
    let mut pinned_nodes = pinned.keys().copied().collect::<Vec<_>>();
    pinned_nodes.sort_unstable_by(|a, b| b.cmp(a));
    for id in pinned_nodes {
        let reg = pinned[&id];
        if used_by_adj(id, &colors).contains(&reg) {
            trace!("pinned {:?} loses r{}", id, reg);
            spilled_nodes.push(id);
        } else {
            colors.insert(id, reg);
        }
    }

    let reserved: HashSet<Register> = pinned.values().copied().collect();
    let (potential, normal): (Vec<LiveID>, Vec<LiveID>) = select_stack
        .iter()
        .rev()
        .copied()
        .filter(|id| !pinned.contains_key(id))
        .partition(|id| potential_spills.contains(id));

    for id in normal.into_iter().chain(potential) {
        let used = used_by_adj(id, &colors);
        match (0..k).find(|reg| !used.contains(reg) && !reserved.contains(reg)) {
            Some(reg) => {
                colors.insert(id, reg);
            }
            None => spilled_nodes.push(id),
        }
    }

    spilled_nodes.sort();
    (colors, spilled_nodes)
}
