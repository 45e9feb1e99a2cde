use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};
use std::iter::FromIterator;
use std::sync::Arc;

type Link = Option<Arc<Node>>;

struct Node {
    left: Link,
    /// The node's value, minus the value of the closest ancestor we stepped *right* from to get
    /// here. Left children share their parent's base, so along a path of left steps this doesn't
    /// change frame.
    delta: u64,
    right: Link,
    size: usize,
    height: u32,
}

#[inline]
fn size_of(link: &Link) -> usize {
    link.as_ref().map_or(0, |n| n.size)
}

#[inline]
fn height_of(link: &Link) -> u32 {
    link.as_ref().map_or(0, |n| n.height)
}

impl Node {
    fn new(left: Link, delta: u64, right: Link) -> Arc<Node> {
        let size = size_of(&left) + 1 + size_of(&right);
        let height = height_of(&left).max(height_of(&right)) + 1;
        Arc::new(Node { left, delta, right, size, height })
    }
}

fn rotate_right(l: &Node, delta: u64, right: Link) -> Arc<Node> {
    debug_assert!(l.delta < delta);
    // l's right subtree and `right` both end up under the old parent, which now hangs right of l.
    let new_right = Node::new(l.right.clone(), delta - l.delta, right);
    Node::new(l.left.clone(), l.delta, Some(new_right))
}

fn rotate_left(left: Link, delta: u64, r: &Node) -> Arc<Node> {
    let new_left = Node::new(left, delta, r.left.clone());
    Node::new(Some(new_left), delta + r.delta, r.right.clone())
}

/// Build a node out of its parts, rotating if one side is more than 1 taller than the other.
fn balance(left: Link, delta: u64, right: Link) -> Arc<Node> {
    let lh = height_of(&left);
    let rh = height_of(&right);

    if lh > rh + 1 {
        if let Some(l) = left.as_deref() {
            return match l.right.as_deref() {
                // The extra height is on the inside. A single rotation would just move it across.
                Some(lr) if lr.height > height_of(&l.left) => {
                    let l = rotate_left(l.left.clone(), l.delta, lr);
                    rotate_right(&l, delta, right)
                }
                _ => rotate_right(l, delta, right),
            };
        }
    } else if rh > lh + 1 {
        if let Some(r) = right.as_deref() {
            return match r.left.as_deref() {
                Some(rl) if rl.height > height_of(&r.right) => {
                    let r = rotate_right(rl, r.delta, r.right.clone());
                    rotate_left(left, delta, &r)
                }
                _ => rotate_left(left, delta, r),
            };
        }
    }

    Node::new(left, delta, right)
}

fn insert_rec(link: &Link, i: u64) -> Arc<Node> {
    let Some(node) = link else {
        return Node::new(None, i, None);
    };

    match i.cmp(&node.delta) {
        Ordering::Less => balance(Some(insert_rec(&node.left, i)), node.delta, node.right.clone()),
        Ordering::Equal => node.clone(),
        Ordering::Greater => balance(node.left.clone(), node.delta, Some(insert_rec(&node.right, i - node.delta))),
    }
}

fn shift_rec(link: &Link, i: u64) -> Link {
    let node = link.as_ref()?;

    Some(if i <= node.delta {
        // This node (and so everything to its right) moves up. The left subtree is in our
        // parent's frame, so it needs checking against the same i.
        balance(shift_rec(&node.left, i), node.delta + 1, node.right.clone())
    } else {
        balance(node.left.clone(), node.delta, shift_rec(&node.right, i - node.delta))
    })
}

/// A persistent set of absolute positions.
///
/// The set maps between two coordinate spaces: the "full" space containing every integer, and the
/// "collapsed" space you get by deleting the members of the set and closing up the gaps. When the
/// set holds tombstoned positions, the full space is the absolute coordinate space of the document
/// and the collapsed space is the visible text.
///
/// Cloning is O(1). All the methods which change the set return a new tree and leave `self` alone.
#[derive(Clone, Default)]
pub struct IndexTransformTree {
    root: Link,
}

impl IndexTransformTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        size_of(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn height(&self) -> u32 {
        height_of(&self.root)
    }

    pub fn contains(&self, mut i: u64) -> bool {
        let mut cur = self.root.as_deref();
        while let Some(node) = cur {
            match i.cmp(&node.delta) {
                Ordering::Less => cur = node.left.as_deref(),
                Ordering::Equal => return true,
                Ordering::Greater => {
                    i -= node.delta;
                    cur = node.right.as_deref();
                }
            }
        }
        false
    }

    /// Map from the collapsed space to the full space. This returns the i-th (0-based) integer
    /// which is *not* in the set.
    ///
    /// The result is never a member of the set, so it can always be passed to
    /// [`collapse`](Self::collapse).
    pub fn expand(&self, mut i: u64) -> u64 {
        let mut base = 0;
        let mut cur = self.root.as_deref();
        while let Some(node) = cur {
            // Number of non-members below this node, in this frame.
            let x = node.delta - size_of(&node.left) as u64;
            if i < x {
                cur = node.left.as_deref();
            } else {
                i = i + 1 - x;
                base += node.delta;
                cur = node.right.as_deref();
            }
        }
        base + i
    }

    /// Map from the full space to the collapsed space. This is i minus the number of members
    /// smaller than i.
    ///
    /// i must not be a member of the set. (Members have no position in the collapsed space.)
    pub fn collapse(&self, mut i: u64) -> u64 {
        debug_assert!(!self.contains(i), "collapse called with member {i}");

        let mut result = i;
        let mut cur = self.root.as_deref();
        while let Some(node) = cur {
            if i < node.delta {
                cur = node.left.as_deref();
            } else {
                result -= size_of(&node.left) as u64 + 1;
                i -= node.delta;
                cur = node.right.as_deref();
            }
        }
        result
    }

    /// Add i to the set. Adding an existing member is a no-op.
    #[must_use]
    pub fn insert(&self, i: u64) -> Self {
        if self.contains(i) { return self.clone(); }
        Self { root: Some(insert_rec(&self.root, i)) }
    }

    /// Increment every member >= i by 1. Afterwards i itself is never a member.
    #[must_use]
    pub fn shift_from(&self, i: u64) -> Self {
        Self { root: shift_rec(&self.root, i) }
    }

    /// Iterate through the members in ascending order.
    pub fn iter(&self) -> Iter<'_> {
        let mut iter = Iter { stack: Vec::with_capacity(self.height() as usize) };
        iter.push_left_spine(&self.root, 0);
        iter
    }

    /// Check the tree's internal invariants. Panics if anything is wrong. This is only exported
    /// for testing.
    #[allow(unused)]
    pub fn dbg_check(&self) {
        fn check(link: &Link) -> (usize, u32) {
            let Some(node) = link.as_deref() else { return (0, 0); };

            let (left_size, left_height) = check(&node.left);
            let (right_size, right_height) = check(&node.right);
            assert_eq!(node.size, left_size + right_size + 1);
            assert_eq!(node.height, left_height.max(right_height) + 1);
            assert!(left_height.abs_diff(right_height) <= 1,
                "Unbalanced node: left height {left_height} right height {right_height}");
            if let Some(right) = node.right.as_deref() {
                assert!(right.delta > 0);
            }
            (node.size, node.height)
        }

        let (size, _) = check(&self.root);

        let values: Vec<u64> = self.iter().collect();
        assert_eq!(values.len(), size);
        assert!(values.windows(2).all(|w| w[0] < w[1]), "Values not strictly increasing: {:?}", values);
    }
}

impl PartialEq for IndexTransformTree {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for IndexTransformTree {}

impl Debug for IndexTransformTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<u64> for IndexTransformTree {
    fn from_iter<T: IntoIterator<Item=u64>>(iter: T) -> Self {
        iter.into_iter().fold(Self::new(), |tree, i| tree.insert(i))
    }
}

impl<'a> IntoIterator for &'a IndexTransformTree {
    type Item = u64;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// In-order iterator over the members of an [`IndexTransformTree`].
pub struct Iter<'a> {
    /// Nodes we still need to yield, along with the base their delta is relative to.
    stack: Vec<(&'a Node, u64)>,
}

impl<'a> Iter<'a> {
    fn push_left_spine(&mut self, mut link: &'a Link, base: u64) {
        while let Some(node) = link.as_deref() {
            self.stack.push((node, base));
            link = &node.left;
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let (node, base) = self.stack.pop()?;
        let value = base + node.delta;
        self.push_left_spine(&node.right, value);
        Some(value)
    }
}
