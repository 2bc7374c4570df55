//! Cache key identifying one cached asset.

/// Which image field of a catalog entry an asset was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageRole {
    /// Full-size loading screen artwork (`splash`).
    Splash,
    /// Small list icon (`displayIcon`).
    Icon,
}

impl ImageRole {
    /// Suffix appended to the key for this role.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Splash => "splash",
            Self::Icon => "icon",
        }
    }
}

impl std::fmt::Display for ImageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Opaque identifier for one cached asset.
///
/// Keys are used verbatim as file stems under the cache root, so the same
/// logical asset must always map to the same key across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a key from any string-like input.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Builds the key for one image of a map entry, e.g. `map_<uuid>_splash`.
    ///
    /// The id is used as given; callers pass the catalog's own text.
    #[must_use]
    pub fn for_map(id: &str, role: ImageRole) -> Self {
        Self(format!("map_{id}_{}", role.suffix()))
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
