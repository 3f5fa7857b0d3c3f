//! Whitelist authorization: which dotted paths a caller may filter on.
//!
//! The whitelist is consulted for every field path the compiler meets, at
//! any nesting depth, with the converted (model-native) dotted name. A
//! rejected path aborts the whole compilation; nothing is silently
//! dropped.

use std::collections::BTreeSet;
use std::fmt;

/// The authorization policy for one compilation call.
pub enum Whitelist {
    /// Every resolvable path may be queried.
    AllowAll,
    /// Exact-match lookup against a fixed set of dotted paths. No wildcard
    /// expansion: `artist.name` does not imply `artist`.
    Paths(BTreeSet<String>),
    /// A caller-supplied predicate over the dotted path.
    Predicate(Box<dyn Fn(&str) -> bool + Send + Sync>),
}

impl Whitelist {
    /// Build a [`Whitelist::Paths`] from anything iterable as strings.
    pub fn paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Whitelist::Paths(paths.into_iter().map(Into::into).collect())
    }

    /// Build a [`Whitelist::Predicate`] from a closure.
    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Whitelist::Predicate(Box::new(f))
    }

    /// Whether filtering on `dotted` is permitted.
    pub fn allows(&self, dotted: &str) -> bool {
        match self {
            Whitelist::AllowAll => true,
            Whitelist::Paths(set) => set.contains(dotted),
            Whitelist::Predicate(f) => f(dotted),
        }
    }
}

impl fmt::Debug for Whitelist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Whitelist::AllowAll => f.write_str("Whitelist::AllowAll"),
            Whitelist::Paths(set) => f.debug_tuple("Whitelist::Paths").field(set).finish(),
            Whitelist::Predicate(_) => f.write_str("Whitelist::Predicate(..)"),
        }
    }
}
