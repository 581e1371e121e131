use std::cmp::Ordering;

type Link<T> = Option<Box<Node<T>>>;

struct Node<T> {
    item: T,
    left: Link<T>,
    right: Link<T>,
}

/// Unbalanced binary search tree ordered by a caller-supplied total order.
///
/// Items the comparator reports as `Equal` are the same item: a second
/// insert is rejected. Callers wanting several items with the same primary
/// key must fold a unique discriminator into the comparator (the ledger
/// orders by date, then id).
///
/// No rebalancing is done. Pre-sorted input degenerates into a list with
/// O(n) depth and O(n) insert/search; all walks are iterative so depth only
/// costs time, never stack.
pub struct Bst<T, C> {
    root: Link<T>,
    len: usize,
    cmp: C,
}

impl<T: Ord> Bst<T, fn(&T, &T) -> Ordering> {
    /// Tree ordered by `T`'s own `Ord`.
    pub fn natural() -> Self {
        Self::new(T::cmp)
    }
}

impl<T, C> Bst<T, C>
where
    C: Fn(&T, &T) -> Ordering,
{
    pub fn new(cmp: C) -> Self {
        Self {
            root: None,
            len: 0,
            cmp,
        }
    }

    /// Returns false (and drops `item`) if an equal item is already present.
    pub fn insert(&mut self, item: T) -> bool {
        let mut link = &mut self.root;
        while let Some(node) = link {
            link = match (self.cmp)(&item, &node.item) {
                Ordering::Less => &mut node.left,
                Ordering::Greater => &mut node.right,
                Ordering::Equal => return false,
            };
        }
        *link = Some(Box::new(Node {
            item,
            left: None,
            right: None,
        }));
        self.len += 1;
        true
    }

    pub fn get(&self, item: &T) -> Option<&T> {
        let mut cur = self.root.as_deref();
        while let Some(node) = cur {
            cur = match (self.cmp)(item, &node.item) {
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
                Ordering::Equal => return Some(&node.item),
            };
        }
        None
    }

    pub fn contains(&self, item: &T) -> bool {
        self.get(item).is_some()
    }

    /// Remove the item equal to `item`. Absent items are a no-op.
    ///
    /// A node with two children takes its in-order successor's item, and the
    /// successor (which has no left child) is spliced out of the right subtree.
    pub fn remove(&mut self, item: &T) -> Option<T> {
        let mut link = &mut self.root;
        loop {
            let ord = match link {
                None => return None,
                Some(node) => (self.cmp)(item, &node.item),
            };
            if ord == Ordering::Equal {
                break;
            }
            if let Some(node) = link {
                link = if ord == Ordering::Less {
                    &mut node.left
                } else {
                    &mut node.right
                };
            }
        }

        let node = link.as_mut()?;
        if node.left.is_some() && node.right.is_some() {
            let successor = Self::take_min(&mut node.right)?;
            self.len -= 1;
            return Some(std::mem::replace(&mut node.item, successor));
        }

        let Node { item, left, right } = *link.take()?;
        *link = left.or(right);
        self.len -= 1;
        Some(item)
    }

    /// Unlink the leftmost node under `link`, splicing its right child up.
    fn take_min(link: &mut Link<T>) -> Option<T> {
        let mut link = link;
        while link.as_ref()?.left.is_some() {
            link = &mut link.as_mut()?.left;
        }
        let Node { item, right, .. } = *link.take()?;
        *link = right;
        Some(item)
    }

    /// Ascending iterator; a fresh walk each call.
    pub fn iter(&self) -> Iter<'_, T> {
        let mut iter = Iter { stack: Vec::new() };
        iter.push_left_spine(self.root.as_deref());
        iter
    }

    /// Snapshot of every item in ascending order.
    pub fn in_order(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }

    /// Items within `[min, max]` inclusive, ascending.
    pub fn range_query(&self, min: &T, max: &T) -> Vec<T>
    where
        T: Clone,
    {
        self.range_by(|item| {
            if (self.cmp)(item, min) == Ordering::Less {
                Ordering::Less
            } else if (self.cmp)(item, max) == Ordering::Greater {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        })
    }

    /// Items for which `probe` returns `Equal`, ascending.
    ///
    /// `probe` classifies an item as below (`Less`), inside (`Equal`) or
    /// above (`Greater`) the wanted range and must be monotone in the tree's
    /// order. Subtrees entirely below or above the range are never visited.
    pub fn range_by<P>(&self, probe: P) -> Vec<T>
    where
        T: Clone,
        P: Fn(&T) -> Ordering,
    {
        let mut out = Vec::new();
        let mut stack: Vec<&Node<T>> = Vec::new();
        let mut cur = self.root.as_deref();
        loop {
            while let Some(node) = cur {
                if probe(&node.item) == Ordering::Less {
                    // node and its whole left subtree are below the range
                    cur = node.right.as_deref();
                } else {
                    stack.push(node);
                    cur = node.left.as_deref();
                }
            }
            let Some(node) = stack.pop() else { break };
            if probe(&node.item) == Ordering::Greater {
                // everything still on the stack is larger still
                break;
            }
            out.push(node.item.clone());
            cur = node.right.as_deref();
        }
        out
    }

    pub fn find_min(&self) -> Option<&T> {
        let mut node = self.root.as_deref()?;
        while let Some(left) = node.left.as_deref() {
            node = left;
        }
        Some(&node.item)
    }

    pub fn find_max(&self) -> Option<&T> {
        let mut node = self.root.as_deref()?;
        while let Some(right) = node.right.as_deref() {
            node = right;
        }
        Some(&node.item)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut level: Vec<&Node<T>> = self.root.as_deref().into_iter().collect();
        while !level.is_empty() {
            height += 1;
            level = level
                .iter()
                .flat_map(|n| n.left.as_deref().into_iter().chain(n.right.as_deref()))
                .collect();
        }
        height
    }
}

impl<T, C> Drop for Bst<T, C> {
    fn drop(&mut self) {
        // Unlink node by node; the default recursive drop would blow the
        // stack on a degenerate tree.
        let mut stack: Vec<Box<Node<T>>> = self.root.take().into_iter().collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(node.left.take());
            stack.extend(node.right.take());
        }
    }
}

/// In-order iterator over a [`Bst`].
pub struct Iter<'a, T> {
    stack: Vec<&'a Node<T>>,
}

impl<'a, T> Iter<'a, T> {
    fn push_left_spine(&mut self, mut cur: Option<&'a Node<T>>) {
        while let Some(node) = cur {
            self.stack.push(node);
            cur = node.left.as_deref();
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let node = self.stack.pop()?;
        self.push_left_spine(node.right.as_deref());
        Some(&node.item)
    }
}
