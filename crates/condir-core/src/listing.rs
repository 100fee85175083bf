use serde::{Deserialize, Serialize};

/// One directory listing as extracted from a rendered page, before any
/// normalization.
///
/// Every field is best-effort. A record only counts as extracted when
/// `name` is present; nameless records never leave the page extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub name: Option<String>,
    /// Raw rating as scraped, e.g. `"4.8"` or `"4.8 ★"`.
    pub rating: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    /// Badge alt texts, in document order.
    #[serde(default)]
    pub certifications: Vec<String>,
    /// Opaque identifier from the embedded analytics payload.
    pub external_id: Option<String>,
    pub reviews_count: Option<u32>,
    pub certificates_count: Option<u32>,
    pub certificate_name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub services: Vec<String>,
}

impl ListingRecord {
    /// Returns `true` once the record carries a display name.
    #[must_use]
    pub fn is_extracted(&self) -> bool {
        self.name.is_some()
    }
}

/// A listing cleaned up for storage: bounded rating, canonical phone,
/// blank badges and services dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedContractor {
    pub name: String,
    /// Star rating clamped to `0.0..=5.0`; `None` when unparseable.
    pub rating: Option<f64>,
    pub address: Option<String>,
    /// `(AAA) BBB-CCCC` for ten-digit numbers, otherwise the trimmed original.
    pub phone: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub external_id: Option<String>,
    pub reviews_count: Option<u32>,
    pub certifications: Vec<String>,
    pub services: Vec<String>,
}
