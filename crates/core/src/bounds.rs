//! Range bounds over tuples
//!
//! [`Bounds`] is what callers write: optional `gt`/`gte`/`lt`/`lte` ends,
//! an optional `prefix`, a `limit` and a `reverse` flag. [`NormalizedBounds`]
//! is what the rest of the engine consumes: two optional [`Endpoint`]s and the
//! `contains` predicate shared by the sorted primitives, the storage backends,
//! the concurrency log and the reactivity tracker.
//!
//! ## Prefix semantics
//!
//! When `prefix` is set, `gt`/`gte`/`lt`/`lte` are relative to it. A missing
//! lower end becomes `gte: prefix` and a missing upper end becomes
//! `lte: prefix ++ [MAX]`, so the range brackets every tuple starting with
//! `prefix`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::compare::compare_value;
use crate::error::{Error, Result};
use crate::types::{prepend, Tuple};
use crate::value::Value;

/// Component that sorts below or above every value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentinel {
    /// Below every value, above the end of a tuple
    Min,
    /// Above every value
    Max,
}

/// One end of a range: a tuple, an optional trailing sentinel, and whether
/// the end itself is included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Key components
    pub tuple: Tuple,
    /// Optional trailing sentinel component
    pub sentinel: Option<Sentinel>,
    /// Whether a tuple equal to this endpoint is in range
    pub inclusive: bool,
}

impl Endpoint {
    /// Inclusive endpoint at `tuple`
    pub fn inclusive(tuple: Tuple) -> Self {
        Self {
            tuple,
            sentinel: None,
            inclusive: true,
        }
    }

    /// Exclusive endpoint at `tuple`
    pub fn exclusive(tuple: Tuple) -> Self {
        Self {
            tuple,
            sentinel: None,
            inclusive: false,
        }
    }

    /// Attach a trailing sentinel
    pub fn with_sentinel(mut self, sentinel: Sentinel) -> Self {
        self.sentinel = Some(sentinel);
        self
    }

    /// Ordering of `tuple` relative to this endpoint's key (ignores `inclusive`)
    pub fn locate(&self, tuple: &[Value]) -> Ordering {
        compare_extended(tuple, None, &self.tuple, self.sentinel)
    }

    /// Compare two endpoint keys (ignores `inclusive`)
    pub fn compare_key(&self, other: &Endpoint) -> Ordering {
        compare_extended(&self.tuple, self.sentinel, &other.tuple, other.sentinel)
    }

    fn prefixed(self, prefix: &[Value]) -> Self {
        Self {
            tuple: prepend(prefix, self.tuple),
            ..self
        }
    }

    fn render(&self) -> String {
        let op = if self.inclusive { "=" } else { "" };
        match self.sentinel {
            Some(s) => format!("{op}{:?}+{s:?}", self.tuple),
            None => format!("{op}{:?}", self.tuple),
        }
    }
}

// Order of a single extended component: end-of-tuple < MIN < value < MAX
#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum Slot<'a> {
    End,
    Min,
    Value(&'a Value),
    Max,
}

fn slot<'a>(tuple: &'a [Value], sentinel: Option<Sentinel>, i: usize) -> Slot<'a> {
    if let Some(v) = tuple.get(i) {
        return Slot::Value(v);
    }
    match (i == tuple.len(), sentinel) {
        (true, Some(Sentinel::Min)) => Slot::Min,
        (true, Some(Sentinel::Max)) => Slot::Max,
        _ => Slot::End,
    }
}

fn compare_extended(
    a: &[Value],
    a_sentinel: Option<Sentinel>,
    b: &[Value],
    b_sentinel: Option<Sentinel>,
) -> Ordering {
    let len = a.len().max(b.len()) + 1;
    for i in 0..len {
        let ordering = match (slot(a, a_sentinel, i), slot(b, b_sentinel, i)) {
            (Slot::Value(x), Slot::Value(y)) => compare_value(x, y),
            (x, y) => x.cmp(&y),
        };
        match ordering {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Caller-facing range description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// Exclusive lower end (takes precedence over `gte`)
    pub gt: Option<Tuple>,
    /// Inclusive lower end
    pub gte: Option<Tuple>,
    /// Exclusive upper end (takes precedence over `lte`)
    pub lt: Option<Tuple>,
    /// Inclusive upper end
    pub lte: Option<Tuple>,
    /// Restrict to tuples starting with this prefix
    pub prefix: Option<Tuple>,
    /// Maximum number of rows to return
    pub limit: Option<usize>,
    /// Return rows in descending order
    pub reverse: bool,
}

impl Bounds {
    /// Unbounded range
    pub fn new() -> Self {
        Self::default()
    }

    /// Every tuple starting with `prefix`
    pub fn prefix(prefix: Tuple) -> Self {
        Self {
            prefix: Some(prefix),
            ..Self::default()
        }
    }

    /// Exactly the tuple `tuple`
    pub fn point(tuple: Tuple) -> Self {
        Self::new().gte(tuple.clone()).lte(tuple)
    }

    /// Set an exclusive lower end
    pub fn gt(mut self, tuple: Tuple) -> Self {
        self.gt = Some(tuple);
        self.gte = None;
        self
    }

    /// Set an inclusive lower end
    pub fn gte(mut self, tuple: Tuple) -> Self {
        self.gte = Some(tuple);
        self.gt = None;
        self
    }

    /// Set an exclusive upper end
    pub fn lt(mut self, tuple: Tuple) -> Self {
        self.lt = Some(tuple);
        self.lte = None;
        self
    }

    /// Set an inclusive upper end
    pub fn lte(mut self, tuple: Tuple) -> Self {
        self.lte = Some(tuple);
        self.lt = None;
        self
    }

    /// Set the prefix
    pub fn with_prefix_filter(mut self, prefix: Tuple) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Cap the number of rows
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Return rows in descending order
    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// Move these bounds under `prefix` (used by subspaces)
    pub fn with_prefix(mut self, prefix: &[Value]) -> Self {
        if prefix.is_empty() {
            return self;
        }
        let inner = self.prefix.take().unwrap_or_default();
        self.prefix = Some(prepend(prefix, inner));
        self
    }

    /// Resolve into endpoints
    pub fn normalize(&self) -> NormalizedBounds {
        let prefix = self.prefix.as_deref();
        let under = |t: &Tuple| prepend(prefix.unwrap_or(&[]), t.clone());

        let lower = match (&self.gt, &self.gte, prefix) {
            (Some(t), _, _) => Some(Endpoint::exclusive(under(t))),
            (None, Some(t), _) => Some(Endpoint::inclusive(under(t))),
            (None, None, Some(p)) => Some(Endpoint::inclusive(p.to_vec())),
            (None, None, None) => None,
        };
        let upper = match (&self.lt, &self.lte, prefix) {
            (Some(t), _, _) => Some(Endpoint::exclusive(under(t))),
            (None, Some(t), _) => Some(Endpoint::inclusive(under(t))),
            (None, None, Some(p)) => Some(Endpoint::inclusive(p.to_vec()).with_sentinel(Sentinel::Max)),
            (None, None, None) => None,
        };

        NormalizedBounds {
            lower,
            upper,
            limit: self.limit,
            reverse: self.reverse,
        }
    }
}

impl From<Bounds> for NormalizedBounds {
    fn from(bounds: Bounds) -> Self {
        bounds.normalize()
    }
}

/// Resolved range: optional endpoints plus limit and direction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedBounds {
    /// Lower end, `None` for unbounded
    pub lower: Option<Endpoint>,
    /// Upper end, `None` for unbounded
    pub upper: Option<Endpoint>,
    /// Maximum number of rows to return
    pub limit: Option<usize>,
    /// Return rows in descending order
    pub reverse: bool,
}

impl NormalizedBounds {
    /// Unbounded range
    pub fn all() -> Self {
        Self::default()
    }

    /// Exactly the tuple `tuple`
    pub fn point(tuple: Tuple) -> Self {
        Self {
            lower: Some(Endpoint::inclusive(tuple.clone())),
            upper: Some(Endpoint::inclusive(tuple)),
            limit: None,
            reverse: false,
        }
    }

    /// Whether `tuple` is at or above the lower end
    pub fn above_lower(&self, tuple: &[Value]) -> bool {
        self.lower.as_ref().map_or(true, |end| {
            match end.locate(tuple) {
                Ordering::Greater => true,
                Ordering::Equal => end.inclusive,
                Ordering::Less => false,
            }
        })
    }

    /// Whether `tuple` is at or below the upper end
    pub fn below_upper(&self, tuple: &[Value]) -> bool {
        self.upper.as_ref().map_or(true, |end| {
            match end.locate(tuple) {
                Ordering::Less => true,
                Ordering::Equal => end.inclusive,
                Ordering::Greater => false,
            }
        })
    }

    /// Whether `tuple` lies within both ends (ignores `limit`)
    pub fn contains(&self, tuple: &[Value]) -> bool {
        self.above_lower(tuple) && self.below_upper(tuple)
    }

    /// Fail with `InvalidBounds` if the lower end sorts after the upper end
    pub fn validate(&self) -> Result<()> {
        if let (Some(lower), Some(upper)) = (&self.lower, &self.upper) {
            if lower.compare_key(upper) == Ordering::Greater {
                return Err(Error::InvalidBounds {
                    lower: lower.render(),
                    upper: upper.render(),
                });
            }
        }
        Ok(())
    }

    /// Move these bounds under `prefix`
    ///
    /// Open ends are closed at the edges of the prefix.
    pub fn with_prefix(self, prefix: &[Value]) -> Self {
        if prefix.is_empty() {
            return self;
        }
        let lower = Some(match self.lower {
            Some(end) => end.prefixed(prefix),
            None => Endpoint::inclusive(prefix.to_vec()),
        });
        let upper = Some(match self.upper {
            Some(end) => end.prefixed(prefix),
            None => Endpoint::inclusive(prefix.to_vec()).with_sentinel(Sentinel::Max),
        });
        Self {
            lower,
            upper,
            ..self
        }
    }

    /// Copy of these bounds with a different limit
    pub fn with_limit(&self, limit: Option<usize>) -> Self {
        Self {
            limit,
            ..self.clone()
        }
    }
}
