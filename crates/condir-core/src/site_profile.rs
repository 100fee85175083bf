//! Markup profile for a paginated listing site.
//!
//! The harvester never hard-codes selectors; it walks the ordered probe and
//! locator lists held here. [`SiteProfile::default`] describes the GAF
//! residential contractor directory. Other sites can be targeted by pointing
//! `CONDIR_SITE_PROFILE_PATH` at a YAML file with the same shape; omitted
//! keys fall back to the defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Placeholder substituted with the target page number in pagination locators.
pub const PAGE_PLACEHOLDER: &str = "{n}";

/// One way of reading a field out of a listing element.
///
/// The first element matching `css` is read: its visible text when `attr`
/// is unset, otherwise the named attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldProbe {
    pub css: String,
    #[serde(default)]
    pub attr: Option<String>,
    /// Stripped from the front of the value when present (e.g. `tel:`).
    #[serde(default)]
    pub strip_prefix: Option<String>,
    /// Only accept `http://` / `https://` values.
    #[serde(default)]
    pub absolute_url: bool,
}

impl FieldProbe {
    #[must_use]
    pub fn text(css: &str) -> Self {
        Self {
            css: css.to_string(),
            attr: None,
            strip_prefix: None,
            absolute_url: false,
        }
    }

    #[must_use]
    pub fn attr(css: &str, attr: &str) -> Self {
        Self {
            css: css.to_string(),
            attr: Some(attr.to_string()),
            strip_prefix: None,
            absolute_url: false,
        }
    }

    /// What the probe reads, for logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.attr {
            Some(attr) => format!("{}@{attr}", self.css),
            None => self.css.clone(),
        }
    }
}

/// Where the site embeds its machine-readable per-listing JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredPayload {
    pub css: String,
    pub attr: String,
}

/// A pagination control candidate: a CSS selector plus an optional match on
/// the control's visible text. `{n}` in `css` or `text` is replaced with the
/// requested page number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlLocator {
    pub css: String,
    /// Visible text must equal this (after trimming).
    #[serde(default)]
    pub text: Option<String>,
    /// Visible text must contain this.
    #[serde(default)]
    pub text_contains: Option<String>,
}

impl ControlLocator {
    #[must_use]
    pub fn css(css: &str) -> Self {
        Self {
            css: css.to_string(),
            text: None,
            text_contains: None,
        }
    }

    #[must_use]
    pub fn with_text(css: &str, text: &str) -> Self {
        Self {
            css: css.to_string(),
            text: Some(text.to_string()),
            text_contains: None,
        }
    }

    #[must_use]
    pub fn containing(css: &str, needle: &str) -> Self {
        Self {
            css: css.to_string(),
            text: None,
            text_contains: Some(needle.to_string()),
        }
    }

    /// Returns a copy with every `{n}` replaced by `page`.
    #[must_use]
    pub fn for_page(&self, page: u32) -> Self {
        let n = page.to_string();
        Self {
            css: self.css.replace(PAGE_PLACEHOLDER, &n),
            text: self.text.as_ref().map(|t| t.replace(PAGE_PLACEHOLDER, &n)),
            text_contains: self
                .text_contains
                .as_ref()
                .map(|t| t.replace(PAGE_PLACEHOLDER, &n)),
        }
    }

    /// Returns `true` if the visible text satisfies this locator.
    #[must_use]
    pub fn matches_text(&self, text: &str) -> bool {
        let text = text.trim();
        if let Some(expected) = &self.text {
            if text != expected {
                return false;
            }
        }
        if let Some(needle) = &self.text_contains {
            if !text.contains(needle.as_str()) {
                return false;
            }
        }
        true
    }

    fn mentions_page(&self) -> bool {
        self.css.contains(PAGE_PLACEHOLDER)
            || self
                .text
                .as_deref()
                .is_some_and(|t| t.contains(PAGE_PLACEHOLDER))
            || self
                .text_contains
                .as_deref()
                .is_some_and(|t| t.contains(PAGE_PLACEHOLDER))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    /// Listing container selectors; the first one that finds anything wins.
    pub listing_selectors: Vec<String>,
    pub name: Vec<FieldProbe>,
    pub rating: Vec<FieldProbe>,
    pub address: Vec<FieldProbe>,
    pub phone: Vec<FieldProbe>,
    pub website: Vec<FieldProbe>,
    pub structured_payload: Option<StructuredPayload>,
    /// Selector for badge images; their `alt` text is matched against
    /// `badge_keywords`.
    pub badge_selector: String,
    pub badge_keywords: Vec<String>,
    /// Numbered page controls, tried in order.
    pub page_controls: Vec<ControlLocator>,
    /// "Next" controls, tried when no numbered control works.
    pub next_controls: Vec<ControlLocator>,
}

impl Default for SiteProfile {
    fn default() -> Self {
        let rating_container = "div.rating-stars, span[class*='rating']";
        Self {
            listing_selectors: vec![
                "article.certification-card".to_string(),
                "div.certification-card__wrapper".to_string(),
            ],
            name: vec![FieldProbe::text("h2 a, h3 a"), FieldProbe::text("h2, h3")],
            rating: vec![
                FieldProbe::attr(rating_container, "data-rating"),
                FieldProbe::text(rating_container),
            ],
            address: vec![FieldProbe::text(
                "p[class*='city'], p[class*='location'], p[class*='address']",
            )],
            phone: vec![
                FieldProbe::text("a[href*='tel:']"),
                FieldProbe {
                    strip_prefix: Some("tel:".to_string()),
                    ..FieldProbe::attr("a[href*='tel:']", "href")
                },
            ],
            website: vec![FieldProbe {
                absolute_url: true,
                ..FieldProbe::attr("a[target='_blank'][href*='http']", "href")
            }],
            structured_payload: Some(StructuredPayload {
                css: "a[data-layer]".to_string(),
                attr: "data-layer".to_string(),
            }),
            badge_selector: "img[alt]".to_string(),
            badge_keywords: ["award", "elite", "master", "certified"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            page_controls: vec![
                ControlLocator::with_text("a", "{n}"),
                ControlLocator::with_text("button", "{n}"),
                ControlLocator::css("a[aria-label='Page {n}']"),
                ControlLocator::css("button[aria-label='Page {n}']"),
                ControlLocator::with_text("a[class*='pagination']", "{n}"),
                ControlLocator::with_text("button[class*='pagination']", "{n}"),
                ControlLocator::with_text("li > a", "{n}"),
                ControlLocator::with_text("li > button", "{n}"),
            ],
            next_controls: vec![
                ControlLocator::css("button[aria-label*='Next']"),
                ControlLocator::css("a[aria-label*='Next']"),
                ControlLocator::containing("button", "\u{203a}"),
                ControlLocator::containing("a", "\u{203a}"),
                ControlLocator::css("button[class*='next']"),
                ControlLocator::css("a[class*='next']"),
            ],
        }
    }
}

/// Load and validate a site profile from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_site_profile(path: &Path) -> Result<SiteProfile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ProfileFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_site_profile(&content)
}

/// Parse and validate a site profile from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_site_profile(yaml: &str) -> Result<SiteProfile, ConfigError> {
    let profile: SiteProfile = serde_yaml::from_str(yaml)?;
    validate_site_profile(&profile)?;
    Ok(profile)
}

fn validate_site_profile(profile: &SiteProfile) -> Result<(), ConfigError> {
    if profile.listing_selectors.is_empty() {
        return Err(ConfigError::Validation(
            "listing_selectors must name at least one selector".to_string(),
        ));
    }
    if profile.listing_selectors.iter().any(|s| s.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "listing_selectors must not contain blank selectors".to_string(),
        ));
    }
    if profile.name.is_empty() {
        return Err(ConfigError::Validation(
            "at least one name probe is required".to_string(),
        ));
    }
    if profile.page_controls.is_empty() && profile.next_controls.is_empty() {
        return Err(ConfigError::Validation(
            "page_controls and next_controls cannot both be empty".to_string(),
        ));
    }
    if let Some(locator) = profile.page_controls.iter().find(|l| !l.mentions_page()) {
        return Err(ConfigError::Validation(format!(
            "page control '{}' never references {PAGE_PLACEHOLDER}",
            locator.css
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_description_names_attribute_when_read() {
        assert_eq!(FieldProbe::text("h2 a").describe(), "h2 a");
        assert_eq!(
            FieldProbe::attr("div.rating", "data-rating").describe(),
            "div.rating@data-rating"
        );
    }

    #[test]
    fn default_profile_is_valid() {
        validate_site_profile(&SiteProfile::default()).unwrap();
    }

    #[test]
    fn for_page_substitutes_css_and_text() {
        let aria = ControlLocator::css("a[aria-label='Page {n}']").for_page(3);
        assert_eq!(aria.css, "a[aria-label='Page 3']");

        let text = ControlLocator::with_text("li > a", "{n}").for_page(12);
        assert_eq!(text.css, "li > a");
        assert_eq!(text.text.as_deref(), Some("12"));
    }

    #[test]
    fn matches_text_is_exact_after_trim() {
        let locator = ControlLocator::with_text("a", "2");
        assert!(locator.matches_text(" 2\n"));
        assert!(!locator.matches_text("12"));
        assert!(!locator.matches_text("2 of 5"));
    }

    #[test]
    fn matches_text_contains() {
        let locator = ControlLocator::containing("button", "\u{203a}");
        assert!(locator.matches_text("Next \u{203a}"));
        assert!(!locator.matches_text("Next"));
    }

    #[test]
    fn locator_without_text_matches_anything() {
        assert!(ControlLocator::css("button[class*='next']").matches_text(""));
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let profile = parse_site_profile(
            "listing_selectors:\n  - \"li.result\"\nbadge_keywords: [\"preferred\"]\n",
        )
        .unwrap();
        assert_eq!(profile.listing_selectors, vec!["li.result".to_string()]);
        assert_eq!(profile.badge_keywords, vec!["preferred".to_string()]);
        assert_eq!(profile.name, SiteProfile::default().name);
        assert_eq!(profile.page_controls, SiteProfile::default().page_controls);
    }

    #[test]
    fn yaml_probe_with_attribute() {
        let profile = parse_site_profile(
            "website:\n  - css: \"a.site\"\n    attr: href\n    absolute_url: true\n",
        )
        .unwrap();
        assert_eq!(profile.website.len(), 1);
        assert_eq!(profile.website[0].attr.as_deref(), Some("href"));
        assert!(profile.website[0].absolute_url);
    }

    #[test]
    fn rejects_empty_listing_selectors() {
        let err = parse_site_profile("listing_selectors: []\n").unwrap_err();
        assert!(err.to_string().contains("listing_selectors"));
    }

    #[test]
    fn rejects_page_control_without_placeholder() {
        let err = parse_site_profile("page_controls:\n  - css: \"a.page\"\n").unwrap_err();
        assert!(err.to_string().contains("never references"));
    }

    #[test]
    fn rejects_malformed_yaml() {
        let err = parse_site_profile("listing_selectors: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::ProfileFileParse(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load_site_profile(Path::new("/nonexistent/profile.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ProfileFileIo { .. }));
    }
}
