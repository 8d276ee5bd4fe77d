//!
//! # Dependency-Ordering Trait and Helpers
//!

// Std-Lib Imports
use std::collections::HashSet;
use std::hash::Hash;

///
/// # Dependency-Ordering Trait
///
/// Cell libraries and similar layout-types form graphs in which nodes reference
/// other nodes. Nodes are commonly stored unordered, but serialization and
/// similar processing tasks require a linear order in which every node appears
/// before (or after) everything it depends upon.
///
/// [DepOrder] produces such an order, dependencies-first.
/// Implementers provide two methods:
///
/// * `process` visits a single `Item` and pushes each of its *direct*
///   dependencies onto the provided [DepOrderer].
/// * `fail` creates the implementation's error value upon detection of a
///   dependency cycle through an `Item`.
///
/// The associated `Item` type is commonly a key or index into the graph's
/// backing storage; the implementing type carries whatever context (e.g. a
/// reference to that storage) `process` needs to look items up.
///
/// The default-implemented [DepOrder::order] is the primary entry point.
/// It visits each entry of `items` depth-first and returns the full
/// dependencies-first ordering. Items reachable more than once appear exactly
/// once, at their earliest valid position.
///
pub trait DepOrder: Sized {
    /// Item Type. Typically a key or index into the graph's backing storage.
    type Item: Clone + Eq + Hash;
    /// Error Type, produced solely upon cycle detection.
    type Error;

    /// Dependency-order all entries in `items`, dependencies first.
    fn order(&self, items: &[Self::Item]) -> Result<Vec<Self::Item>, Self::Error> {
        let mut orderer = DepOrderer::new(items.len());
        for item in items {
            orderer.push(self, item)?;
        }
        Ok(orderer.stack)
    }

    /// Visit `item`, pushing each of its direct dependencies onto `orderer`.
    fn process(&self, item: &Self::Item, orderer: &mut DepOrderer<Self>)
        -> Result<(), Self::Error>;
    /// Create the error value reported for a cycle through `item`.
    fn fail(&self, item: &Self::Item) -> Self::Error;
}

/// # Dependency-Order Helper
///
/// Tracks the depth-first traversal state: the completed, ordered stack,
/// plus membership sets for completed and in-progress items.
/// Public solely for use in the call-signature of [DepOrder::process].
pub struct DepOrderer<P: DepOrder> {
    /// Ordered, completed items
    stack: Vec<P::Item>,
    /// Completed items, for quick membership tests
    seen: HashSet<P::Item>,
    /// In-progress items, i.e. open recursive stack-frames. Used for cycle detection.
    pending: HashSet<P::Item>,
}
impl<P: DepOrder> DepOrderer<P> {
    fn new(capacity: usize) -> Self {
        Self {
            stack: Vec::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
            pending: HashSet::new(),
        }
    }
    /// Push `item`'s dependencies, and then `item` itself, onto the ordered stack.
    pub fn push(&mut self, p: &P, item: &P::Item) -> Result<(), P::Error> {
        if self.seen.contains(item) {
            return Ok(());
        }
        // A repeat visit while `item` remains in-progress indicates a cycle.
        if !self.pending.insert(item.clone()) {
            return Err(p.fail(item));
        }
        p.process(item, self)?;
        self.pending.remove(item);
        self.seen.insert(item.clone());
        self.stack.push(item.clone());
        Ok(())
    }
}
