//! Compile-time jump labels

use std::collections::BTreeSet;
use std::fmt;

use tracing::trace;

/// A symbolic jump target
///
/// Labels exist only while a rule is being assembled; the resolver replaces
/// every reference with a relative offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(u32);

impl Label {
    /// Create a label with an explicit id (for hand-built instruction streams)
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// The numeric id
    #[must_use]
    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Issues labels and recycles them once their rule has been resolved
///
/// Released labels go back to a free pool, so the number of distinct labels
/// ever issued is bounded by the largest single rule. Labels stay outstanding
/// until the whole rule resolves, since marker names must be unique within
/// one stream.
#[derive(Debug, Default)]
pub struct LabelAllocator {
    next: u32,
    free: Vec<Label>,
    outstanding: BTreeSet<Label>,
    peak: usize,
}

impl LabelAllocator {
    /// Create an empty allocator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a label that is not currently outstanding
    pub fn allocate(&mut self) -> Label {
        let label = self.free.pop().unwrap_or_else(|| {
            let label = Label(self.next);
            self.next += 1;
            label
        });
        self.outstanding.insert(label);
        self.peak = self.peak.max(self.outstanding.len());
        trace!(%label, "allocated label");
        label
    }

    /// Return every outstanding label to the free pool
    ///
    /// Call once the instruction stream that references them is resolved.
    pub fn release_all(&mut self) {
        // Highest first so the smallest ids are reused first.
        while let Some(label) = self.outstanding.pop_last() {
            self.free.push(label);
        }
    }

    /// Returns true if `label` has been issued and not yet released
    #[must_use]
    pub fn is_outstanding(&self, label: Label) -> bool {
        self.outstanding.contains(&label)
    }

    /// Labels issued and not yet released
    pub fn outstanding(&self) -> impl Iterator<Item = Label> + '_ {
        self.outstanding.iter().copied()
    }

    /// Number of distinct labels ever created
    #[must_use]
    pub fn issued(&self) -> u32 {
        self.next
    }

    /// Largest number of labels outstanding at once
    #[must_use]
    pub fn peak(&self) -> usize {
        self.peak
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_unique_while_outstanding() {
        let mut labels = LabelAllocator::new();
        let a = labels.allocate();
        let b = labels.allocate();
        assert_ne!(a, b);
        assert!(labels.is_outstanding(a));
        assert_eq!(labels.outstanding().count(), 2);
    }

    #[test]
    fn released_labels_are_reused() {
        let mut labels = LabelAllocator::new();
        let a = labels.allocate();
        labels.release_all();
        assert!(!labels.is_outstanding(a));

        let b = labels.allocate();
        assert_eq!(a, b);
        assert_eq!(labels.issued(), 1);
    }

    #[test]
    fn release_all_bounds_issued_count() {
        let mut labels = LabelAllocator::new();
        for _ in 0..10 {
            for _ in 0..4 {
                labels.allocate();
            }
            labels.release_all();
        }
        assert_eq!(labels.issued(), 4);
        assert_eq!(labels.peak(), 4);
        assert_eq!(labels.outstanding().count(), 0);
    }

    #[test]
    fn smallest_ids_reused_first() {
        let mut labels = LabelAllocator::new();
        labels.allocate();
        labels.allocate();
        labels.release_all();
        assert_eq!(labels.allocate(), Label::new(0));
    }

    #[test]
    fn display() {
        assert_eq!(Label::new(7).to_string(), "L7");
    }
}
