//! A [`SiteProfile`] with every CSS selector parsed once up front.

use condir_core::{ControlLocator, FieldProbe, SiteProfile};
use scraper::Selector;

use crate::error::ScraperError;

#[derive(Debug, Clone)]
pub struct CompiledProbe {
    pub selector: Selector,
    pub probe: FieldProbe,
}

#[derive(Debug, Clone)]
pub struct CompiledProfile {
    /// Listing container selectors paired with their source text, in
    /// fallback order.
    pub listing: Vec<(String, Selector)>,
    pub name: Vec<CompiledProbe>,
    pub rating: Vec<CompiledProbe>,
    pub address: Vec<CompiledProbe>,
    pub phone: Vec<CompiledProbe>,
    pub website: Vec<CompiledProbe>,
    pub payload: Option<(Selector, String)>,
    pub badge: Selector,
    /// Lowercased.
    pub badge_keywords: Vec<String>,
    pub page_controls: Vec<ControlLocator>,
    pub next_controls: Vec<ControlLocator>,
}

impl CompiledProfile {
    /// Parse every selector in `profile`.
    ///
    /// Pagination locators are checked with `{n}` substituted, since that
    /// is the form the browser sees.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidSelector`] naming the first selector
    /// that does not parse.
    pub fn compile(profile: &SiteProfile) -> Result<Self, ScraperError> {
        let listing = profile
            .listing_selectors
            .iter()
            .map(|css| Ok((css.clone(), parse(css)?)))
            .collect::<Result<Vec<_>, ScraperError>>()?;

        for locator in profile.page_controls.iter().chain(&profile.next_controls) {
            parse(&locator.for_page(1).css)?;
        }

        let payload = profile
            .structured_payload
            .as_ref()
            .map(|p| Ok::<_, ScraperError>((parse(&p.css)?, p.attr.clone())))
            .transpose()?;

        Ok(Self {
            listing,
            name: compile_probes(&profile.name)?,
            rating: compile_probes(&profile.rating)?,
            address: compile_probes(&profile.address)?,
            phone: compile_probes(&profile.phone)?,
            website: compile_probes(&profile.website)?,
            payload,
            badge: parse(&profile.badge_selector)?,
            badge_keywords: profile
                .badge_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            page_controls: profile.page_controls.clone(),
            next_controls: profile.next_controls.clone(),
        })
    }

    /// All listing selectors joined into one group, for presence checks.
    #[must_use]
    pub fn any_listing_css(&self) -> String {
        self.listing
            .iter()
            .map(|(css, _)| css.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn compile_probes(probes: &[FieldProbe]) -> Result<Vec<CompiledProbe>, ScraperError> {
    probes
        .iter()
        .map(|probe| {
            Ok(CompiledProbe {
                selector: parse(&probe.css)?,
                probe: probe.clone(),
            })
        })
        .collect()
}

fn parse(css: &str) -> Result<Selector, ScraperError> {
    Selector::parse(css).map_err(|e| ScraperError::InvalidSelector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_compiles() {
        let compiled = CompiledProfile::compile(&SiteProfile::default()).unwrap();
        assert_eq!(compiled.listing.len(), 2);
        assert_eq!(compiled.name.len(), 2);
        assert!(compiled.payload.is_some());
        assert!(compiled.badge_keywords.contains(&"elite".to_string()));
    }

    #[test]
    fn any_listing_css_joins_selectors() {
        let compiled = CompiledProfile::compile(&SiteProfile::default()).unwrap();
        assert_eq!(
            compiled.any_listing_css(),
            "article.certification-card, div.certification-card__wrapper"
        );
    }

    #[test]
    fn invalid_probe_selector_is_reported() {
        let profile = SiteProfile {
            address: vec![FieldProbe::text("p[[")],
            ..SiteProfile::default()
        };
        let err = CompiledProfile::compile(&profile).unwrap_err();
        assert!(matches!(err, ScraperError::InvalidSelector { ref selector, .. } if selector == "p[["));
    }

    #[test]
    fn invalid_control_selector_is_reported() {
        let profile = SiteProfile {
            next_controls: vec![ControlLocator::css("button:::next")],
            ..SiteProfile::default()
        };
        assert!(CompiledProfile::compile(&profile).is_err());
    }

    #[test]
    fn keywords_are_lowercased() {
        let profile = SiteProfile {
            badge_keywords: vec!["Preferred".to_string()],
            ..SiteProfile::default()
        };
        let compiled = CompiledProfile::compile(&profile).unwrap();
        assert_eq!(compiled.badge_keywords, vec!["preferred".to_string()]);
    }
}
