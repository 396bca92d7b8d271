//! Sector deduplication key.

use erb_map_erb_models::CellSite;
use serde::{Deserialize, Serialize};

/// Identity of a rendered cell sector: the raw latitude, longitude, and
/// azimuth text as received.
///
/// Equality is exact text match with no numeric tolerance, so `"-15.7"`
/// and `"-15.70"` are different sectors. Missing components are the empty
/// string. Unlike plain string concatenation, the components stay
/// separate, so `("1", "23", ..)` never collides with `("12", "3", ..)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorKey {
    /// Raw latitude text.
    pub latitude: String,
    /// Raw longitude text.
    pub longitude: String,
    /// Raw azimuth text.
    pub azimuth: String,
}

impl SectorKey {
    /// Builds the key for a cell site.
    #[must_use]
    pub fn from_cell(cell: &CellSite) -> Self {
        Self {
            latitude: cell.latitude.clone().unwrap_or_default(),
            longitude: cell.longitude.clone().unwrap_or_default(),
            azimuth: cell.azimuth.clone().unwrap_or_default(),
        }
    }
}

impl std::fmt::Display for SectorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}|{}", self.latitude, self.longitude, self.azimuth)
    }
}
