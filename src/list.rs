//! A circular doubly linked list backed by an arena of nodes.
//!
//! The deduction pass needs a worklist it can revisit round after round,
//! with O(1) removal of whichever node it is currently looking at. Links
//! are stored as indices into the arena rather than pointers, so node
//! handles stay valid for the life of the list.

/// Stable handle to a node in a [`CircularList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: usize,
    next: usize,
    linked: bool,
}

/// A circularly linked worklist.
///
/// Non-empty invariant: `tail.next == head` and `head.prev == tail`. The
/// circle is re-closed after every structural change, so traversal by
/// `next` never terminates on its own - callers impose their own stopping
/// condition (see the deduction pass's progress sentinel).
#[derive(Debug, Default)]
pub struct CircularList<T> {
    nodes: Vec<Node<T>>,
    /// `(head, tail)` when non-empty.
    ends: Option<(usize, usize)>,
    len: usize,
}

impl<T> CircularList<T> {
    pub fn new() -> Self {
        CircularList {
            nodes: Vec::new(),
            ends: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends a value after the current tail. O(1).
    pub fn push(&mut self, value: T) -> NodeId {
        let id = self.nodes.len();
        match self.ends {
            None => {
                // A lone node is its own neighbor in both directions.
                self.nodes.push(Node {
                    value,
                    prev: id,
                    next: id,
                    linked: true,
                });
                self.ends = Some((id, id));
            }
            Some((head, tail)) => {
                self.nodes.push(Node {
                    value,
                    prev: tail,
                    next: head,
                    linked: true,
                });
                self.nodes[tail].next = id;
                self.nodes[head].prev = id;
                self.ends = Some((head, id));
            }
        }
        self.len += 1;
        NodeId(id)
    }

    /// Unlinks a node. O(1).
    ///
    /// The node must currently be in the list; removing a node twice is a
    /// caller bug and panics rather than being papered over.
    pub fn remove(&mut self, id: NodeId) {
        let i = id.0;
        assert!(self.nodes[i].linked, "removed a node that is not linked");
        self.nodes[i].linked = false;
        self.len -= 1;

        if self.len == 0 {
            self.ends = None;
            return;
        }

        let prev = self.nodes[i].prev;
        let next = self.nodes[i].next;
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;

        if let Some((head, tail)) = self.ends {
            let head = if head == i { next } else { head };
            let tail = if tail == i { prev } else { tail };
            self.ends = Some((head, tail));
        }
    }

    pub fn head(&self) -> Option<NodeId> {
        self.ends.map(|(head, _)| NodeId(head))
    }

    pub fn tail(&self) -> Option<NodeId> {
        self.ends.map(|(_, tail)| NodeId(tail))
    }

    pub fn get(&self, id: NodeId) -> &T {
        &self.nodes[id.0].value
    }

    /// The node after `id`, wrapping from tail back to head.
    pub fn next(&self, id: NodeId) -> NodeId {
        NodeId(self.nodes[id.0].next)
    }

    /// The node before `id`, wrapping from head back to tail.
    pub fn prev(&self, id: NodeId) -> NodeId {
        NodeId(self.nodes[id.0].prev)
    }

    /// Endless traversal from the head following `next`.
    ///
    /// The sequence never terminates for a non-empty list; take only as
    /// many nodes as you can account for.
    pub fn iter_cycle(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut cursor = self.ends.map(|(head, _)| head);
        std::iter::from_fn(move || {
            let current = cursor?;
            cursor = Some(self.nodes[current].next);
            Some(NodeId(current))
        })
    }
}
