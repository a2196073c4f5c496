use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ID(usize);

impl ID {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Node<T> {
    id: ID,
    val: T,
    succ: BTreeSet<ID>,
    pred: BTreeSet<ID>,
}

impl<T> Node<T> {
    pub fn id(&self) -> ID {
        self.id
    }

    pub fn val(&self) -> &T {
        &self.val
    }

    pub fn val_mut(&mut self) -> &mut T {
        &mut self.val
    }

    fn new(val: T, id: ID) -> Self {
        Node {
            id,
            val,
            succ: BTreeSet::new(),
            pred: BTreeSet::new(),
        }
    }

    pub fn succ(&self) -> impl Iterator<Item = ID> + '_ {
        self.succ.iter().copied()
    }

    pub fn pred(&self) -> impl Iterator<Item = ID> + '_ {
        self.pred.iter().copied()
    }

    /// Neighbours in either direction. For a double-linked graph this is
    /// the undirected adjacency.
    pub fn adj(&self) -> impl Iterator<Item = ID> + '_ {
        self.succ.union(&self.pred).copied()
    }
}

impl<T> PartialEq for Node<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Node<T> {}

#[derive(Debug, Clone)]
pub struct Graph<T> {
    nodes: Vec<Node<T>>,
}

impl<T> Graph<T> {
    pub fn new() -> Self {
        Graph { nodes: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Graph {
            nodes: Vec::with_capacity(capacity),
        }
    }

    pub fn get(&self, id: ID) -> &Node<T> {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: ID) -> &mut Node<T> {
        &mut self.nodes[id.0]
    }

    pub fn insert(&mut self, val: T) -> ID {
        let id = self.nodes.len();
        self.nodes.push(Node::new(val, ID(id)));
        ID(id)
    }

    /// Returns `false` if the edge already existed.
    pub fn link(&mut self, from: ID, to: ID) -> bool {
        let inserted = self.nodes[from.0].succ.insert(to);
        assert_eq!(inserted, self.nodes[to.0].pred.insert(from));
        inserted
    }

    pub fn double_link(&mut self, one: ID, other: ID) {
        self.link(one, other);
        self.link(other, one);
    }

    pub fn succ(&self, id: ID) -> impl Iterator<Item = ID> + '_ {
        self.get(id).succ()
    }

    pub fn pred(&self, id: ID) -> impl Iterator<Item = ID> + '_ {
        self.get(id).pred()
    }

    pub fn nodes(&self) -> &[Node<T>] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node<T>] {
        &mut self.nodes
    }

    pub fn ids(&self) -> impl DoubleEndedIterator<Item = ID> {
        (0..self.nodes.len()).map(ID)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<T> Default for Graph<T> {
    fn default() -> Self {
        Self::new()
    }
}
