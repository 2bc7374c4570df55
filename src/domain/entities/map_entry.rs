//! Catalog map entry.
//!
//! Only the identity and the two image fields carry meaning for the cache.
//! Every other field of the upstream payload is kept verbatim so rewritten
//! entries can be served back unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{CacheKey, ImageRole};

/// Prefix of local references produced by the cache.
pub const LOCAL_REFERENCE_PREFIX: &str = "/cache/";

/// One map in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapEntry {
    /// Upstream identifier.
    #[serde(default)]
    pub uuid: String,
    /// Human readable name.
    #[serde(default)]
    pub display_name: String,
    /// Splash artwork URL, or local reference after caching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub splash: Option<String>,
    /// Icon URL, or local reference after caching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_icon: Option<String>,
    /// Remaining upstream fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MapEntry {
    /// Creates an entry with no image fields.
    #[must_use]
    pub fn new(uuid: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            display_name: display_name.into(),
            splash: None,
            display_icon: None,
            extra: Map::new(),
        }
    }

    /// Sets the splash URL.
    #[must_use]
    pub fn with_splash(mut self, url: impl Into<String>) -> Self {
        self.splash = Some(url.into());
        self
    }

    /// Sets the display icon URL.
    #[must_use]
    pub fn with_display_icon(mut self, url: impl Into<String>) -> Self {
        self.display_icon = Some(url.into());
        self
    }

    /// Returns the trimmed identity, or `None` when it is empty.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        Some(self.uuid.trim()).filter(|id| !id.is_empty())
    }

    /// Returns the identity only when it is a well-formed UUID.
    ///
    /// The text is returned as the catalog wrote it, not re-formatted.
    #[must_use]
    pub fn valid_identity(&self) -> Option<&str> {
        self.identity().filter(|id| Uuid::parse_str(id).is_ok())
    }

    /// Returns the non-empty URL stored in the given image field.
    #[must_use]
    pub fn image_url(&self, role: ImageRole) -> Option<&str> {
        let field = match role {
            ImageRole::Splash => self.splash.as_deref(),
            ImageRole::Icon => self.display_icon.as_deref(),
        };
        field.filter(|url| !url.is_empty())
    }

    /// Replaces the given image field.
    pub fn set_image_url(&mut self, role: ImageRole, value: String) {
        match role {
            ImageRole::Splash => self.splash = Some(value),
            ImageRole::Icon => self.display_icon = Some(value),
        }
    }

    /// Lists `(key, url)` pairs for every non-empty image field.
    ///
    /// Entries with an empty identity yield nothing.
    #[must_use]
    pub fn image_keys(&self) -> Vec<(CacheKey, String)> {
        let Some(id) = self.identity() else {
            return Vec::new();
        };

        [ImageRole::Splash, ImageRole::Icon]
            .into_iter()
            .filter_map(|role| {
                self.image_url(role)
                    .map(|url| (CacheKey::for_map(id, role), url.to_string()))
            })
            .collect()
    }
}

/// Builds the local reference served for a stored file name.
#[must_use]
pub fn local_reference(basename: &str) -> String {
    format!("{LOCAL_REFERENCE_PREFIX}{basename}")
}
