use serde::{Deserialize, Serialize};

use crate::domain::entities::MapEntry;

/// Upstream catalog response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEnvelope {
    /// Upstream status code echoed in the body.
    #[serde(default)]
    pub status: u16,
    /// Map entries.
    #[serde(default)]
    pub data: Vec<MapEntry>,
}
