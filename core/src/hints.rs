//! Hints - Typed Ambient Context
//!
//! Hints carry capabilities and configuration down a workflow tree.
//! A parent binds a value under a key; every descendant rendered beneath it
//! can read the value back with the key's static type.
//!
//! # Philosophy
//! > Keys = Types. A key's identity is its type, its value type is fixed by the key.
//!
//! Hints do NOT use string keys or structural matching. Two keys that store the
//! same value type are still distinct keys.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::ops::Add;
use std::sync::Arc;

/// A typed slot in a [`Hints`] map.
///
/// Implement this on a marker type (usually a unit struct). The marker type
/// *is* the key identity: two markers with the same `Value` type never alias.
/// Use [`hint_key!`](crate::hint_key) to declare one in a single line.
///
/// ```rust
/// use arbor_core::hints::{HintKey, Hints};
///
/// struct Greeting;
///
/// impl HintKey for Greeting {
///     type Value = String;
///     fn default_value() -> String {
///         "hello".to_string()
///     }
/// }
///
/// let hints = Hints::new().with::<Greeting>("howdy".to_string());
/// assert_eq!(hints.get::<Greeting>(), "howdy");
/// assert_eq!(Hints::new().get::<Greeting>(), "hello");
/// ```
pub trait HintKey: 'static {
    /// The type stored under this key.
    type Value: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    /// Value returned when the key has never been bound.
    fn default_value() -> Self::Value;

    /// Fully qualified key name, used in `Debug` output and logs.
    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Opaque identity of a [`HintKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(TypeId);

impl KeyId {
    pub fn of<K: HintKey>() -> Self {
        KeyId(TypeId::of::<K>())
    }
}

/// Object-safe view of a stored value.
trait HintValue: Any + Send + Sync {
    fn eq_value(&self, other: &dyn HintValue) -> bool;
    fn debug_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
    fn as_any(&self) -> &dyn Any;
}

impl<T> HintValue for T
where
    T: PartialEq + fmt::Debug + Send + Sync + 'static,
{
    fn eq_value(&self, other: &dyn HintValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn debug_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Clone)]
struct Binding {
    name: &'static str,
    value: Arc<dyn HintValue>,
}

impl Binding {
    fn of<K: HintKey>(value: K::Value) -> Self {
        Binding {
            name: K::name(),
            value: Arc::new(value),
        }
    }
}

type Bindings = imbl::HashMap<KeyId, Binding>;

/// Immutable, typed, heterogeneous map propagated down a workflow tree.
///
/// `Hints` is a value type: every insertion produces a new map and leaves
/// earlier copies untouched. The binding table is a persistent hash trie, so
/// clones are O(1) and a derived map shares all but the touched path with
/// the map it came from.
///
/// Equality is structural over the set of `(key, value)` bindings, so a
/// renderer can compare two maps to detect "did any ambient capability change".
#[derive(Clone, Default)]
pub struct Hints {
    bindings: Bindings,
}

impl Hints {
    /// Create an empty map. Every lookup returns the key's default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the value bound under `K`, or `K::default_value()` if unbound.
    pub fn get<K: HintKey>(&self) -> K::Value {
        self.get_ref::<K>()
            .cloned()
            .unwrap_or_else(K::default_value)
    }

    /// Borrow the value explicitly bound under `K`, if any.
    pub fn get_ref<K: HintKey>(&self) -> Option<&K::Value> {
        self.bindings
            .get(&KeyId::of::<K>())
            .and_then(|binding| binding.value.as_any().downcast_ref::<K::Value>())
    }

    /// Check whether `K` has an explicit binding.
    pub fn contains<K: HintKey>(&self) -> bool {
        self.bindings.contains_key(&KeyId::of::<K>())
    }

    /// Return a map identical to `self` except that `K` maps to `value`.
    ///
    /// A previous binding for `K` is overridden (last write wins).
    pub fn with<K: HintKey>(mut self, value: K::Value) -> Self {
        self.insert::<K>(value);
        self
    }

    /// Non-consuming form of [`Hints::with`].
    pub fn put<K: HintKey>(&self, value: K::Value) -> Self {
        Hints {
            bindings: self.bindings.update(KeyId::of::<K>(), Binding::of::<K>(value)),
        }
    }

    /// Return a map without a binding for `K`; lookups fall back to the default.
    pub fn without<K: HintKey>(mut self) -> Self {
        self.bindings.remove(&KeyId::of::<K>());
        self
    }

    /// Combine two maps. Bindings in `other` override bindings in `self`.
    pub fn merge(&self, other: &Hints) -> Self {
        if other.is_empty() || self.bindings.ptr_eq(&other.bindings) {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut merged = self.clone();
        for (id, binding) in other.bindings.iter() {
            merged.bindings.insert(*id, binding.clone());
        }
        merged
    }

    /// Number of explicit bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Names of the explicitly bound keys, sorted.
    pub fn key_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.bindings.values().map(|b| b.name).collect();
        names.sort_unstable();
        names
    }

    fn insert<K: HintKey>(&mut self, value: K::Value) {
        self.bindings.insert(KeyId::of::<K>(), Binding::of::<K>(value));
    }
}

impl PartialEq for Hints {
    fn eq(&self, other: &Self) -> bool {
        if self.bindings.ptr_eq(&other.bindings) {
            return true;
        }
        self.bindings.len() == other.bindings.len()
            && self.bindings.iter().all(|(id, binding)| {
                other
                    .bindings
                    .get(id)
                    .is_some_and(|theirs| binding.value.eq_value(theirs.value.as_ref()))
            })
    }
}

// Only key identities feed the hash: equal maps always share a key set, and
// values are not required to be `Hash`.
impl Hash for Hints {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut combined: u64 = 0;
        for id in self.bindings.keys() {
            let mut hasher = DefaultHasher::new();
            id.hash(&mut hasher);
            combined = combined.wrapping_add(hasher.finish());
        }
        state.write_usize(self.bindings.len());
        state.write_u64(combined);
    }
}

impl fmt::Debug for Hints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Value<'a>(&'a dyn HintValue);

        impl fmt::Debug for Value<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.debug_value(f)
            }
        }

        let mut entries: Vec<_> = self.bindings.values().collect();
        entries.sort_by_key(|binding| binding.name);
        f.debug_map()
            .entries(
                entries
                    .into_iter()
                    .map(|binding| (binding.name, Value(binding.value.as_ref()))),
            )
            .finish()
    }
}

/// `hints + (Key, value)` binds a value under a unit-struct key.
impl<K: HintKey> Add<(K, K::Value)> for Hints {
    type Output = Hints;

    fn add(self, (_key, value): (K, K::Value)) -> Hints {
        self.with::<K>(value)
    }
}

/// `parent + overrides` merges two maps, right-hand side wins.
impl Add<Hints> for Hints {
    type Output = Hints;

    fn add(self, other: Hints) -> Hints {
        self.merge(&other)
    }
}

impl Add<&Hints> for &Hints {
    type Output = Hints;

    fn add(self, other: &Hints) -> Hints {
        self.merge(other)
    }
}

/// Declare one or more unit-struct [`HintKey`]s.
///
/// ```rust
/// arbor_core::hint_key! {
///     /// Text appended to greetings.
///     pub Punctuation: String = "!".to_string();
///     pub RetryLimit: u32 = 3;
/// }
///
/// let hints = arbor_core::Hints::new() + (RetryLimit, 5);
/// assert_eq!(hints.get::<RetryLimit>(), 5);
/// assert_eq!(hints.get::<Punctuation>(), "!");
/// ```
#[macro_export]
macro_rules! hint_key {
    ($($(#[$meta:meta])* $vis:vis $name:ident: $value:ty = $default:expr;)+) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
            $vis struct $name;

            impl $crate::hints::HintKey for $name {
                type Value = $value;

                fn default_value() -> $value {
                    $default
                }

                fn name() -> &'static str {
                    concat!(module_path!(), "::", stringify!($name))
                }
            }
        )+
    };
}

/// Last path segment of a type's name, without generic arguments.
///
/// `arbor_std::sources::FromStream<u32>` becomes `FromStream`.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
