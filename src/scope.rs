//! Scope tiers and their nesting order.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::{DiError, DiResult};

/// A lifetime tier.
///
/// Tiers are totally ordered by depth: depth 0 is the outermost tier (it
/// outlives every other tier), each following tier nests inside the previous
/// one. Contexts are created tier by tier, so a context at depth `n` always
/// has live ancestors at every depth below `n`.
///
/// The default tiers are [`Scope::LIFETIME`] and [`Scope::REQUEST`]. Custom
/// tiers are obtained from a [`Scopes`] set:
///
/// ```rust
/// use ferrous_inject::Scopes;
///
/// let scopes = Scopes::new(["app", "session", "request"]);
/// let session = scopes.get("session").unwrap();
/// assert_eq!(session.depth(), 1);
/// assert_eq!(scopes.next(Some(session)).unwrap().name(), "request");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope {
    depth: usize,
    name: &'static str,
}

impl Scope {
    /// Outermost default tier, lives as long as the container.
    pub const LIFETIME: Scope = Scope {
        depth: 0,
        name: "lifetime",
    };

    /// Per unit-of-work default tier.
    pub const REQUEST: Scope = Scope {
        depth: 1,
        name: "request",
    };

    /// Position in the nesting order, 0 being outermost.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Tier name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Ordered set of scope tiers used by one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scopes {
    tiers: Arc<[Scope]>,
}

impl Scopes {
    /// Builds a tier set, outermost first.
    ///
    /// # Panics
    ///
    /// Panics if `names` is empty or contains a name twice; see
    /// [`try_new`](Scopes::try_new).
    pub fn new<I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        match Self::try_new(names) {
            Ok(scopes) => scopes,
            Err(err) => panic!("{}", err),
        }
    }

    /// Builds a tier set, outermost first, rejecting an empty set or a
    /// repeated name with [`DiError::InvalidScopes`].
    pub fn try_new<I>(names: I) -> DiResult<Self>
    where
        I: IntoIterator<Item = &'static str>,
    {
        let tiers: Vec<Scope> = names
            .into_iter()
            .enumerate()
            .map(|(depth, name)| Scope { depth, name })
            .collect();

        if tiers.is_empty() {
            return Err(DiError::InvalidScopes("a container needs at least one scope".to_string()));
        }
        for (i, tier) in tiers.iter().enumerate() {
            if tiers[..i].iter().any(|other| other.name == tier.name) {
                return Err(DiError::InvalidScopes(format!("scope {} defined twice", tier.name)));
            }
        }

        Ok(Self {
            tiers: tiers.into(),
        })
    }

    /// Outermost tier; the root context lives here.
    pub fn first(&self) -> Scope {
        self.tiers[0]
    }

    /// The tier nested directly inside `current`, or the first tier for `None`.
    ///
    /// Fails with [`DiError::NoScope`] past the innermost tier.
    pub fn next(&self, current: Option<Scope>) -> DiResult<Scope> {
        match current {
            None => Ok(self.first()),
            Some(scope) => self
                .tiers
                .get(scope.depth + 1)
                .copied()
                .ok_or(DiError::NoScope(scope.name)),
        }
    }

    /// Looks a tier up by name.
    pub fn get(&self, name: &str) -> Option<Scope> {
        self.tiers.iter().find(|tier| tier.name == name).copied()
    }

    /// True if `scope` is one of this set's tiers.
    pub fn contains(&self, scope: Scope) -> bool {
        self.tiers.get(scope.depth) == Some(&scope)
    }

    /// Tier used by scoped and transient providers without an explicit scope:
    /// the one after the outermost, or the outermost if it is the only tier.
    pub fn default_scoped(&self) -> Scope {
        self.tiers.get(1).copied().unwrap_or_else(|| self.first())
    }

    /// Tiers, outermost first.
    pub fn iter(&self) -> impl Iterator<Item = Scope> + '_ {
        self.tiers.iter().copied()
    }

    /// Number of tiers.
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Always false; a scope set has at least one tier.
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

static DEFAULT_TIERS: Lazy<Arc<[Scope]>> = Lazy::new(|| Arc::from([Scope::LIFETIME, Scope::REQUEST]));

impl Default for Scopes {
    fn default() -> Self {
        Self {
            tiers: DEFAULT_TIERS.clone(),
        }
    }
}
