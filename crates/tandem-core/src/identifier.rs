//! Path identifiers using string interning for cheap copies and comparisons.
//!
//! Every semantic node and notation record is addressed by a stable path: the
//! `::`-joined chain of segments from the document root down to the element,
//! e.g. `model::package_1::use_case_2`. The [`Id`] type stores such a path as
//! an interned symbol so that it is `Copy` and hashes in constant time.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, OnceLock},
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Separator between path segments.
pub const SEPARATOR: &str = "::";

/// Global string interner for identifier storage.
///
/// # Thread Safety
///
/// This uses `Mutex` for thread-safe access to the string interner, so ids
/// can be shared freely between diagram sessions running on different threads.
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn interner() -> MutexGuard<'static, DefaultStringInterner> {
    INTERNER
        .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
        .lock()
        .expect("Failed to acquire interner lock")
}

/// Interned path identifier.
///
/// # Examples
///
/// ```
/// use tandem_core::identifier::Id;
///
/// let root = Id::new("model");
/// let package = root.create_nested(Id::new("package_1"));
/// assert_eq!(package, "model::package_1");
/// assert_eq!(package.parent(), Some(root));
/// assert!(package.is_within(root));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    /// Creates an `Id` from &str.
    pub fn new(name: &str) -> Self {
        Self(interner().get_or_intern(name))
    }

    /// Creates a nested path by appending `child_id` to this path with the
    /// `::` separator.
    ///
    /// # Examples
    ///
    /// ```
    /// use tandem_core::identifier::Id;
    ///
    /// let parent = Id::new("model");
    /// let nested = parent.create_nested(Id::new("actor_1"));
    /// assert_eq!(nested, "model::actor_1");
    /// ```
    pub fn create_nested(&self, child_id: Id) -> Self {
        let mut interner = interner();
        let parent_str = interner
            .resolve(self.0)
            .expect("Parent ID should exist in interner");
        let child_str = interner
            .resolve(child_id.0)
            .expect("Child ID should exist in interner");
        let nested_name = format!("{parent_str}{SEPARATOR}{child_str}");
        Self(interner.get_or_intern(&nested_name))
    }

    /// Creates a nested path from a plain segment string.
    pub fn nested(&self, segment: &str) -> Self {
        self.create_nested(Id::new(segment))
    }

    /// Runs `f` with the textual form of this id.
    pub fn with_str<R>(self, f: impl FnOnce(&str) -> R) -> R {
        let interner = interner();
        let value = interner
            .resolve(self.0)
            .expect("Symbol should exist in interner");
        f(value)
    }

    /// Returns the path one level up, or `None` for a single-segment path.
    pub fn parent(self) -> Option<Self> {
        let parent = self.with_str(|path| {
            path.rfind(SEPARATOR)
                .map(|idx| path[..idx].to_string())
        })?;
        Some(Self::new(&parent))
    }

    /// Returns the last segment of the path.
    pub fn last_segment(self) -> String {
        self.with_str(|path| {
            path.rsplit(SEPARATOR)
                .next()
                .unwrap_or(path)
                .to_string()
        })
    }

    /// Returns the number of segments in the path.
    pub fn depth(self) -> usize {
        self.with_str(|path| path.split(SEPARATOR).count())
    }

    /// Returns `true` if this path equals `ancestor` or lies below it.
    pub fn is_within(self, ancestor: Id) -> bool {
        if self == ancestor {
            return true;
        }
        let ancestor = ancestor.to_string();
        self.with_str(|path| {
            path.strip_prefix(ancestor.as_str())
                .is_some_and(|rest| rest.starts_with(SEPARATOR))
        })
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_str(|value| write!(f, "{value}"))
    }
}

impl std::str::FromStr for Id {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Id {
    /// Creates an `Id` from a string slice
    ///
    /// This is a convenience implementation that calls `Id::new`.
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for Id {
    /// Allows direct comparison with string slices: `id == "string"`
    fn eq(&self, other: &str) -> bool {
        self.with_str(|value| value == other)
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.with_str(|value| serializer.serialize_str(value))
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::new(&value))
    }
}
