//! Resolution of dependency-bearing constraints against already absorbed siblings.
//!
//! Siblings are absorbed in declaration order, so a constraint that depends on a later sibling
//! is *postponed* once and re-attempted right after that sibling absorbs.

use crate::ast::{Constraint, ConstraintKind, DependencySource};
use std::collections::HashMap;
use std::fmt;

/// What the engine recorded about one absorbed sibling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Facts {
    /// Absolute start of the sibling.
    pub offset: usize,
    pub consumed: usize,
    pub value: Option<i128>,
    pub count: Option<usize>,
}

/// Absorbed siblings of the group being walked, by name.
#[derive(Debug, Default)]
pub struct Siblings {
    facts: HashMap<String, Facts>,
}

impl Siblings {
    pub fn record(&mut self, name: &str, facts: Facts) {
        self.facts.insert(name.to_string(), facts);
    }

    pub fn get(&self, name: &str) -> Option<&Facts> {
        self.facts.get(name)
    }

    pub fn value(&self, name: &str) -> Option<i128> {
        self.facts.get(name).and_then(|f| f.value)
    }
}

/// Inclusive size/length bound; `max == None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedBound {
    pub min: u64,
    pub max: Option<u64>,
}

impl ResolvedBound {
    pub fn exact(n: u64) -> Self {
        ResolvedBound { min: n, max: Some(n) }
    }

    pub fn admits(&self, n: u64) -> bool {
        n >= self.min && self.max.map_or(true, |m| n <= m)
    }
}

impl fmt::Display for ResolvedBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", max),
            Some(max) => write!(f, "[{}, {}]", self.min, max),
            None => write!(f, "at least {}", self.min),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Bound(ResolvedBound),
    /// The sibling named by the dependency has not been absorbed yet.
    Postponed,
    Rejected(String),
}

/// Resolve the size bound of `constraint`.
///
/// Without a dependency the static bound is returned. With one, the bound is
/// `measure(sibling) + base`: exact for `SizeExact`, an upper bound for `SizeBounded`.
pub fn resolve(constraint: &Constraint, siblings: &Siblings) -> Resolution {
    let (min, max) = match constraint.kind {
        ConstraintKind::SizeExact(n) => (n, Some(n)),
        ConstraintKind::SizeBounded { min, max } => (min, max),
        _ => (0, None),
    };
    let dep = match &constraint.depends_on {
        Some(d) => d,
        None => return Resolution::Bound(ResolvedBound { min, max }),
    };
    let facts = match siblings.get(&dep.sibling) {
        Some(f) => f,
        None => return Resolution::Postponed,
    };
    let measure: i128 = match dep.source {
        DependencySource::EncodedLength => facts.consumed as i128,
        DependencySource::ItemCount => match facts.count {
            Some(c) => c as i128,
            None => return Resolution::Rejected(format!("{} is not a repetition", dep.sibling)),
        },
        DependencySource::Value => match facts.value {
            Some(v) => v,
            None => return Resolution::Rejected(format!("{} has no integer value", dep.sibling)),
        },
    };
    let bound = match u64::try_from(measure + dep.base as i128) {
        Ok(b) => b,
        Err(_) => {
            return Resolution::Rejected(format!(
                "{} + {} is not a valid size",
                measure, dep.base
            ))
        }
    };
    match constraint.kind {
        ConstraintKind::SizeBounded { min, .. } => {
            Resolution::Bound(ResolvedBound { min, max: Some(bound) })
        }
        _ => Resolution::Bound(ResolvedBound::exact(bound)),
    }
}
