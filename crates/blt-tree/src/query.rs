//! Typed node filters used by every search in the traversal engine.
//!
//! A [`Query`] is a tag guard (which kinds qualify) plus an optional name
//! and an optional predicate. The kind check always runs first, so a
//! predicate only ever sees nodes of the requested kinds.

use std::fmt;

use crate::kind::NodeKind;
use crate::tree::NodeRef;

/// Which kinds a query accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KindFilter {
    /// Any kind, including placeholders.
    Any,
    /// Exactly one kind.
    Is(NodeKind),
    /// Any of the listed kinds.
    OneOf(Vec<NodeKind>),
}

impl KindFilter {
    /// Returns `true` if `kind` passes this filter.
    pub fn accepts(&self, kind: NodeKind) -> bool {
        match self {
            Self::Any => true,
            Self::Is(k) => *k == kind,
            Self::OneOf(kinds) => kinds.contains(&kind),
        }
    }
}

type Predicate<'q> = Box<dyn Fn(NodeRef<'_>) -> bool + Send + Sync + 'q>;

/// A typed search filter.
pub struct Query<'q> {
    kinds: KindFilter,
    name: Option<&'q str>,
    predicate: Option<Predicate<'q>>,
}

impl<'q> Query<'q> {
    /// Match nodes of any kind.
    pub fn any() -> Self {
        Self::with_filter(KindFilter::Any)
    }

    /// Match nodes of a single kind.
    pub fn kind(kind: NodeKind) -> Self {
        Self::with_filter(KindFilter::Is(kind))
    }

    /// Match nodes of any of the given kinds.
    pub fn kinds(kinds: impl IntoIterator<Item = NodeKind>) -> Self {
        Self::with_filter(KindFilter::OneOf(kinds.into_iter().collect()))
    }

    fn with_filter(kinds: KindFilter) -> Self {
        Self {
            kinds,
            name: None,
            predicate: None,
        }
    }

    /// Additionally require an exact name.
    pub fn named(mut self, name: &'q str) -> Self {
        self.name = Some(name);
        self
    }

    /// Additionally require a predicate to hold.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(NodeRef<'_>) -> bool + Send + Sync + 'q,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// The kind guard of this query.
    pub fn kind_filter(&self) -> &KindFilter {
        &self.kinds
    }

    /// Evaluate the query against a node.
    pub fn matches(&self, node: NodeRef<'_>) -> bool {
        if !self.kinds.accepts(node.kind()) {
            return false;
        }
        if let Some(name) = self.name {
            if node.name() != Some(name) {
                return false;
            }
        }
        match &self.predicate {
            Some(predicate) => predicate(node),
            None => true,
        }
    }
}

impl From<NodeKind> for Query<'_> {
    fn from(kind: NodeKind) -> Self {
        Query::kind(kind)
    }
}

impl fmt::Debug for Query<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("kinds", &self.kinds)
            .field("name", &self.name)
            .field("predicate", &self.predicate.as_ref().map(|_| "<fn>"))
            .finish()
    }
}
