//! The list itself.

use std::fmt;

use mempool_core::{AccessError, BlockAllocator, Handle};

use crate::node::{Node, NODE_SIZE};

/// Reference to one node of a [`LinkedList`].
///
/// Returned by inserts and [`LinkedList::find`]. A `NodeRef` is only
/// meaningful for the list that produced it; operations given a node that
/// is not (or no longer) in the list do nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeRef(Handle);

impl NodeRef {
    /// The allocation holding this node.
    pub fn handle(&self) -> Handle {
        self.0
    }
}

/// A singly-linked list of `u16` values whose nodes are allocations in a
/// [`BlockAllocator`].
///
/// Every node is one allocation of `NODE_SIZE` bytes; the list owns those
/// allocations and frees them on [`clear`](Self::clear) or drop. Every
/// operation walks the list from the head.
///
/// Inserts that cannot allocate a node are skipped: they return `None` and
/// leave the list unchanged.
pub struct LinkedList<'a, A: BlockAllocator + ?Sized> {
    alloc: &'a A,
    head: Option<Handle>,
}

impl<'a, A: BlockAllocator + ?Sized> LinkedList<'a, A> {
    /// An empty list allocating from `alloc`.
    pub fn new(alloc: &'a A) -> Self {
        Self { alloc, head: None }
    }

    fn load(&self, handle: Handle) -> Option<Node> {
        let mut buf = [0u8; NODE_SIZE];
        self.alloc.read(handle, 0, &mut buf).ok()?;
        Some(Node::decode(&buf))
    }

    fn store(&self, handle: Handle, node: Node) -> Result<(), AccessError> {
        self.alloc.write(handle, 0, &node.encode())
    }

    /// Allocate and write a node. `None` if the allocator is exhausted.
    fn create(&self, node: Node) -> Option<Handle> {
        let Some(handle) = self.alloc.alloc(NODE_SIZE) else {
            tracing::trace!(value = node.value, "list insert skipped: no memory for node");
            return None;
        };
        if self.store(handle, node).is_err() {
            self.alloc.free(Some(handle));
            return None;
        }
        Some(handle)
    }

    /// Point `prev` at `next`, releasing `orphan` if the write fails.
    fn relink(&self, prev: Handle, mut node: Node, next: Option<Handle>, orphan: Handle) -> bool {
        node.next = next;
        if self.store(prev, node).is_err() {
            self.alloc.free(Some(orphan));
            return false;
        }
        true
    }

    fn links(&self) -> Links<'_, A> {
        Links {
            alloc: self.alloc,
            cursor: self.head,
        }
    }

    /// Position of `target` in the list with its predecessor, if any.
    fn locate(&self, target: Handle) -> Option<Option<(Handle, Node)>> {
        let mut prev = None;
        for (handle, node) in self.links() {
            if handle == target {
                return Some(prev);
            }
            prev = Some((handle, node));
        }
        None
    }

    /// Append `value` at the end of the list.
    pub fn push_back(&mut self, value: u16) -> Option<NodeRef> {
        let tail = self.links().last();
        let handle = self.create(Node { value, next: None })?;
        match tail {
            None => self.head = Some(handle),
            Some((t, node)) => {
                if !self.relink(t, node, Some(handle), handle) {
                    return None;
                }
            }
        }
        Some(NodeRef(handle))
    }

    /// Insert `value` directly after `node`.
    ///
    /// Does nothing and returns `None` if `node` is not in this list.
    pub fn insert_after(&mut self, node: NodeRef, value: u16) -> Option<NodeRef> {
        let (_, prev) = self.links().find(|(h, _)| *h == node.0)?;
        let handle = self.create(Node {
            value,
            next: prev.next,
        })?;
        self.relink(node.0, prev, Some(handle), handle)
            .then_some(NodeRef(handle))
    }

    /// Insert `value` directly before `node`, making it the new head if
    /// `node` is the head.
    ///
    /// If `node` is not in this list nothing is allocated and `None` is
    /// returned.
    pub fn insert_before(&mut self, node: NodeRef, value: u16) -> Option<NodeRef> {
        let Some(prev) = self.locate(node.0) else {
            tracing::trace!(value, "list insert skipped: anchor node not in list");
            return None;
        };
        let handle = self.create(Node {
            value,
            next: Some(node.0),
        })?;
        match prev {
            None => self.head = Some(handle),
            Some((p, prev_node)) => {
                if !self.relink(p, prev_node, Some(handle), handle) {
                    return None;
                }
            }
        }
        Some(NodeRef(handle))
    }

    /// Unlink and free the first node holding `value`.
    ///
    /// Returns whether a node was removed.
    pub fn remove(&mut self, value: u16) -> bool {
        let mut prev = None;
        let mut found = None;
        for (handle, node) in self.links() {
            if node.value == value {
                found = Some((handle, node));
                break;
            }
            prev = Some((handle, node));
        }
        let Some((handle, node)) = found else {
            return false;
        };
        match prev {
            None => self.head = node.next,
            Some((p, mut prev_node)) => {
                prev_node.next = node.next;
                if self.store(p, prev_node).is_err() {
                    return false;
                }
            }
        }
        self.alloc.free(Some(handle));
        true
    }

    /// First node holding `value`.
    pub fn find(&self, value: u16) -> Option<NodeRef> {
        self.links()
            .find(|(_, node)| node.value == value)
            .map(|(handle, _)| NodeRef(handle))
    }

    /// Value stored in `node`, if it is in this list.
    pub fn value(&self, node: NodeRef) -> Option<u16> {
        self.links()
            .find(|(h, _)| *h == node.0)
            .map(|(_, n)| n.value)
    }

    /// The first node.
    pub fn head(&self) -> Option<NodeRef> {
        self.head.map(NodeRef)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.links().count()
    }

    /// Whether the list has no nodes.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Values from head to tail.
    pub fn iter(&self) -> Iter<'_, A> {
        Iter {
            links: self.links(),
        }
    }

    /// Format the nodes from `start` through `end` inclusive.
    ///
    /// A `None` start means the head; a `None` end, or an end that is never
    /// reached, means the tail. A start that is not in the list formats as
    /// `[]`.
    pub fn display_range(
        &self,
        start: Option<NodeRef>,
        end: Option<NodeRef>,
    ) -> DisplayRange<'_, 'a, A> {
        DisplayRange {
            list: self,
            start,
            end,
        }
    }

    /// Free every node and leave the list empty.
    pub fn clear(&mut self) {
        let mut cursor = self.head.take();
        while let Some(handle) = cursor {
            cursor = self.load(handle).and_then(|node| node.next);
            self.alloc.free(Some(handle));
        }
    }
}

impl<A: BlockAllocator + ?Sized> Drop for LinkedList<'_, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<A: BlockAllocator + ?Sized> fmt::Display for LinkedList<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.display_range(None, None), f)
    }
}

impl<A: BlockAllocator + ?Sized> fmt::Debug for LinkedList<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Walks `(handle, node)` pairs from a starting handle.
///
/// Stops early if a node cannot be read, which only happens when the
/// allocator was torn down underneath the list.
struct Links<'l, A: ?Sized> {
    alloc: &'l A,
    cursor: Option<Handle>,
}

impl<A: BlockAllocator + ?Sized> Iterator for Links<'_, A> {
    type Item = (Handle, Node);

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.cursor.take()?;
        let mut buf = [0u8; NODE_SIZE];
        self.alloc.read(handle, 0, &mut buf).ok()?;
        let node = Node::decode(&buf);
        self.cursor = node.next;
        Some((handle, node))
    }
}

/// Iterator over the values of a [`LinkedList`].
pub struct Iter<'l, A: ?Sized> {
    links: Links<'l, A>,
}

impl<A: BlockAllocator + ?Sized> Iterator for Iter<'_, A> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        self.links.next().map(|(_, node)| node.value)
    }
}

/// [`Display`](fmt::Display) adapter returned by
/// [`LinkedList::display_range`].
pub struct DisplayRange<'l, 'a, A: BlockAllocator + ?Sized> {
    list: &'l LinkedList<'a, A>,
    start: Option<NodeRef>,
    end: Option<NodeRef>,
}

impl<A: BlockAllocator + ?Sized> fmt::Display for DisplayRange<'_, '_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        let mut started = self.start.is_none();
        let mut first = true;
        for (handle, node) in self.list.links() {
            let here = Some(NodeRef(handle));
            if !started {
                if here != self.start {
                    continue;
                }
                started = true;
            }
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}", node.value)?;
            if here == self.end {
                break;
            }
        }
        f.write_str("]")
    }
}
