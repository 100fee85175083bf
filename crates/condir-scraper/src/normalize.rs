//! ETL normalization from raw [`ListingRecord`]s to
//! [`NormalizedContractor`]s ready for storage.

use std::sync::LazyLock;

use condir_core::{ListingRecord, NormalizedContractor};
use regex::Regex;

static RATING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid rating regex"));

const MAX_RATING: f64 = 5.0;

/// Normalize one harvested record. Returns `None` for a record without a
/// usable name, which cannot be stored.
#[must_use]
pub fn normalize_listing(record: ListingRecord) -> Option<NormalizedContractor> {
    let name = non_blank(record.name)?;
    Some(NormalizedContractor {
        name,
        rating: record.rating.as_deref().and_then(clean_rating),
        address: non_blank(record.address),
        phone: record.phone.as_deref().and_then(clean_phone),
        website: non_blank(record.website),
        description: non_blank(record.description),
        external_id: non_blank(record.external_id),
        reviews_count: record.reviews_count,
        certifications: non_blank_list(record.certifications),
        services: non_blank_list(record.services),
    })
}

/// Read a star rating such as `"4.8"`, `"4.8 ★"` or `"★ 4.8 / 5"`.
///
/// The first number found is used and clamped to `0.0..=5.0`. Returns
/// `None` when there is no number.
#[must_use]
pub fn clean_rating(raw: &str) -> Option<f64> {
    let number = RATING_NUMBER.find(raw)?;
    let value: f64 = number.as_str().parse().ok()?;
    Some(value.clamp(0.0, MAX_RATING))
}

/// Format a ten-digit phone number as `(AAA) BBB-CCCC`; anything else is
/// returned trimmed. Blank input yields `None`.
#[must_use]
pub fn clean_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 10 {
        return Some(format!(
            "({}) {}-{}",
            &digits[..3],
            &digits[3..6],
            &digits[6..]
        ));
    }
    Some(trimmed.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn non_blank_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
