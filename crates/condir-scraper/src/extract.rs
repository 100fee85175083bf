//! Field extraction for a single listing element.
//!
//! Each field walks its probe list in order and keeps the first non-empty
//! value. After the visual probes, the embedded analytics payload fills in
//! whatever is still missing; it never overrides a value read from markup.

use condir_core::ListingRecord;
use scraper::ElementRef;
use serde_json::Value;

use crate::profile::{CompiledProbe, CompiledProfile};

/// Extract whatever can be read from `element`. Never fails; unreadable
/// fields are left `None`.
#[must_use]
pub fn extract_listing(element: ElementRef<'_>, profile: &CompiledProfile) -> ListingRecord {
    let mut record = ListingRecord {
        name: first_match(element, &profile.name),
        rating: first_match(element, &profile.rating),
        address: first_match(element, &profile.address),
        phone: first_match(element, &profile.phone),
        website: first_match(element, &profile.website),
        certifications: badges(element, profile),
        ..ListingRecord::default()
    };

    if let Some((selector, attr)) = &profile.payload {
        let payload = element
            .select(selector)
            .find_map(|el| el.value().attr(attr))
            .and_then(|raw| serde_json::from_str::<Value>(raw).ok());
        if let Some(payload) = payload {
            backfill(&mut record, &payload);
        }
    }

    record
}

/// Walk `probes` in order; the first one yielding a non-empty value wins.
fn first_match(element: ElementRef<'_>, probes: &[CompiledProbe]) -> Option<String> {
    probes.iter().find_map(|compiled| {
        let value = element
            .select(&compiled.selector)
            .find_map(|el| read_probe(el, compiled))?;
        tracing::trace!(locator = %compiled.probe.describe(), "field located");
        Some(value)
    })
}

fn read_probe(element: ElementRef<'_>, compiled: &CompiledProbe) -> Option<String> {
    let probe = &compiled.probe;
    let raw = match &probe.attr {
        Some(attr) => element.value().attr(attr)?.trim().to_string(),
        None => element_text(element),
    };
    let value = match &probe.strip_prefix {
        Some(prefix) => raw
            .strip_prefix(prefix.as_str())
            .unwrap_or(raw.as_str())
            .trim()
            .to_string(),
        None => raw,
    };
    if value.is_empty() {
        return None;
    }
    if probe.absolute_url && !is_absolute_http(&value) {
        return None;
    }
    Some(value)
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_absolute_http(value: &str) -> bool {
    url::Url::parse(value).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

fn badges(element: ElementRef<'_>, profile: &CompiledProfile) -> Vec<String> {
    element
        .select(&profile.badge)
        .filter_map(|img| img.value().attr("alt"))
        .map(str::trim)
        .filter(|alt| {
            let lower = alt.to_lowercase();
            profile.badge_keywords.iter().any(|k| lower.contains(k.as_str()))
        })
        .map(ToString::to_string)
        .collect()
}

/// Fill fields still absent in `record` from the analytics payload.
fn backfill(record: &mut ListingRecord, payload: &Value) {
    if record.name.is_none() {
        record.name = scalar_string(payload.get("contractor_name"));
    }
    if record.rating.is_none() {
        record.rating = scalar_string(payload.get("contractor_rating"));
    }
    if record.external_id.is_none() {
        record.external_id = scalar_string(payload.get("contractor_id"));
    }
    if record.reviews_count.is_none() {
        record.reviews_count = scalar_u32(payload.get("contractor_reviews_count"));
    }
    if record.certificates_count.is_none() {
        record.certificates_count = scalar_u32(payload.get("contractor_certificates_count"));
    }
    if record.certificate_name.is_none() {
        record.certificate_name = scalar_string(payload.get("contractor_certificate_name"));
    }
}

/// A non-empty string, or a number rendered as text.
fn scalar_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn scalar_u32(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
