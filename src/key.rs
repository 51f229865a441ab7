//! Type descriptors used as registry, cache and plan keys.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Structural description of a type.
///
/// Keys compare by value, not identity: two separately built descriptors for
/// `Box<i32>` are equal and hash identically, so they can be used
/// interchangeably as registry and cache keys.
///
/// # Key Shapes
///
/// - **Type**: an origin name plus ordered type arguments (`Box<i32>`)
/// - **Param**: an unbound generic parameter (`T`), used in declared dependency types
/// - **Many**: "every provider registered for" the inner type
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::TypeKey;
///
/// let a = TypeKey::named("Box").with_args([TypeKey::of::<i32>()]);
/// let b = TypeKey::named("Box").with_args([TypeKey::of::<i32>()]);
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "Box<i32>");
///
/// let open = TypeKey::named("Box").with_args([TypeKey::param("T")]);
/// assert!(open.has_params());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeKey {
    /// Concrete type: origin name and ordered arguments
    Type {
        /// Origin name, e.g. `Box` or `alloc::string::String`
        name: Arc<str>,
        /// Ordered type arguments, empty for non-generic types
        args: Arc<[TypeKey]>,
    },
    /// Unbound generic parameter, e.g. `T`
    Param(Arc<str>),
    /// Every provider registered for the inner type
    Many(Arc<TypeKey>),
}

impl TypeKey {
    /// Key for a Rust type, named by `std::any::type_name`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::named(std::any::type_name::<T>())
    }

    /// Key for a non-generic type with the given origin name.
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        TypeKey::Type {
            name: name.into(),
            args: Arc::from(Vec::new()),
        }
    }

    /// Key for an unbound generic parameter.
    pub fn param(name: impl Into<Arc<str>>) -> Self {
        TypeKey::Param(name.into())
    }

    /// Key for "every provider of `inner`".
    pub fn many(inner: TypeKey) -> Self {
        TypeKey::Many(Arc::new(inner))
    }

    /// Replaces the type arguments. Only `Type` keys carry arguments; other
    /// shapes are returned unchanged.
    pub fn with_args<I>(self, args: I) -> Self
    where
        I: IntoIterator<Item = TypeKey>,
    {
        match self {
            TypeKey::Type { name, .. } => TypeKey::Type {
                name,
                args: args.into_iter().collect(),
            },
            other => other,
        }
    }

    /// Origin or parameter name. `Many` keys report their inner name.
    pub fn name(&self) -> &str {
        match self {
            TypeKey::Type { name, .. } => name,
            TypeKey::Param(name) => name,
            TypeKey::Many(inner) => inner.name(),
        }
    }

    /// Type arguments of a `Type` key.
    pub fn args(&self) -> &[TypeKey] {
        match self {
            TypeKey::Type { args, .. } => args,
            _ => &[],
        }
    }

    /// The key with its arguments stripped (`Box<i32>` -> `Box`).
    pub fn origin(&self) -> TypeKey {
        match self {
            TypeKey::Type { name, args } if !args.is_empty() => TypeKey::named(name.clone()),
            other => other.clone(),
        }
    }

    /// True for parameterized `Type` keys.
    pub fn is_generic(&self) -> bool {
        !self.args().is_empty()
    }

    /// True for `Many` keys.
    pub fn is_many(&self) -> bool {
        matches!(self, TypeKey::Many(_))
    }

    /// Inner type of a `Many` key.
    pub fn inner(&self) -> Option<&TypeKey> {
        match self {
            TypeKey::Many(inner) => Some(inner),
            _ => None,
        }
    }

    /// True if an unbound parameter appears anywhere in this key.
    pub fn has_params(&self) -> bool {
        match self {
            TypeKey::Param(_) => true,
            TypeKey::Type { args, .. } => args.iter().any(TypeKey::has_params),
            TypeKey::Many(inner) => inner.has_params(),
        }
    }

    /// Rewrites every bound parameter, recursing into arguments.
    ///
    /// Parameters without a binding are left in place.
    ///
    /// ```rust
    /// use std::collections::HashMap;
    /// use std::sync::Arc;
    /// use ferrous_inject::TypeKey;
    ///
    /// let mut bindings = HashMap::new();
    /// bindings.insert(Arc::<str>::from("T"), TypeKey::of::<u8>());
    ///
    /// let repo = TypeKey::named("Repo").with_args([TypeKey::param("T")]);
    /// assert_eq!(
    ///     repo.substitute(&bindings),
    ///     TypeKey::named("Repo").with_args([TypeKey::of::<u8>()]),
    /// );
    /// ```
    pub fn substitute(&self, bindings: &HashMap<Arc<str>, TypeKey>) -> TypeKey {
        match self {
            TypeKey::Param(name) => bindings.get(name).cloned().unwrap_or_else(|| self.clone()),
            TypeKey::Type { name, args } if !args.is_empty() => TypeKey::Type {
                name: name.clone(),
                args: args.iter().map(|arg| arg.substitute(bindings)).collect(),
            },
            TypeKey::Many(inner) => TypeKey::many(inner.substitute(bindings)),
            other => other.clone(),
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKey::Type { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeKey::Param(name) => f.write_str(name),
            TypeKey::Many(inner) => write!(f, "Many<{}>", inner),
        }
    }
}
