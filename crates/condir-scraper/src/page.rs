//! Page Extractor: scroll the current render into full view, snapshot it,
//! and run every listing through extraction and deduplication.

use std::time::Duration;

use condir_core::ListingRecord;
use scraper::Html;

use crate::dedup::Deduplicator;
use crate::error::SessionError;
use crate::extract::extract_listing;
use crate::profile::CompiledProfile;
use crate::session::BrowserSession;

/// How the page is scrolled before its listings are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollPlan {
    pub step_px: u64,
    pub step_pause: Duration,
    /// Wait after reaching the bottom, for lazy content to land.
    pub settle: Duration,
}

impl Default for ScrollPlan {
    fn default() -> Self {
        Self {
            step_px: 300,
            step_pause: Duration::from_millis(300),
            settle: Duration::from_secs(2),
        }
    }
}

/// What one page contributed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageReport {
    /// Listing containers on the page.
    pub found: usize,
    /// Newly accepted records, in document order.
    pub accepted: Vec<ListingRecord>,
    /// Named records whose key was already seen.
    pub duplicates: usize,
    /// Containers with no readable name.
    pub skipped: usize,
}

/// Extract every new listing from the page currently shown in `session`.
///
/// Zero accepted records is the caller's signal that the listing is
/// exhausted.
///
/// # Errors
///
/// Returns [`SessionError`] only when the session cannot be scrolled or its
/// DOM cannot be read.
pub fn extract_page<S>(
    session: &mut S,
    profile: &CompiledProfile,
    dedup: &mut Deduplicator,
    scroll: &ScrollPlan,
) -> Result<PageReport, SessionError>
where
    S: BrowserSession + ?Sized,
{
    scroll_through(session, scroll)?;

    let html = session.rendered_html()?;
    let document = Html::parse_document(&html);

    // First listing selector that matches anything wins.
    let containers = profile
        .listing
        .iter()
        .map(|(_, selector)| document.select(selector).collect::<Vec<_>>())
        .find(|found| !found.is_empty())
        .unwrap_or_default();

    let mut report = PageReport {
        found: containers.len(),
        ..PageReport::default()
    };

    for (idx, element) in containers.into_iter().enumerate() {
        let record = extract_listing(element, profile);
        if !record.is_extracted() {
            tracing::debug!(position = idx + 1, "listing without a name skipped");
            report.skipped += 1;
            continue;
        }
        let name = record.name.as_deref().unwrap_or_default();
        if dedup.accept(&record) {
            tracing::debug!(position = idx + 1, name, "listing accepted");
            report.accepted.push(record);
        } else {
            tracing::debug!(position = idx + 1, name, "duplicate listing");
            report.duplicates += 1;
        }
    }

    tracing::info!(
        found = report.found,
        accepted = report.accepted.len(),
        duplicates = report.duplicates,
        skipped = report.skipped,
        seen = dedup.seen_count(),
        "page extracted"
    );
    Ok(report)
}

/// Step down the page so lazily rendered listings load, then sit at the
/// bottom for `settle`.
fn scroll_through<S>(session: &mut S, scroll: &ScrollPlan) -> Result<(), SessionError>
where
    S: BrowserSession + ?Sized,
{
    let height = session.scroll_height()?;
    let step = scroll.step_px.max(1);
    let mut y = 0;
    while y < height {
        y += step;
        session.scroll_to(y)?;
        session.pause(scroll.step_pause);
    }
    session.scroll_to_bottom()?;
    session.pause(scroll.settle);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use condir_core::SiteProfile;

    use crate::session::SnapshotSession;

    fn card(name: &str, city: &str) -> String {
        format!(r#"<article class="certification-card"><h2><a>{name}</a></h2><p class="city">{city}</p></article>"#)
    }

    fn open(body: &str) -> SnapshotSession {
        let mut session = SnapshotSession::new(vec![format!("<html><body>{body}</body></html>")])
            .with_scroll_height(900);
        session.open("snapshot://start").unwrap();
        session
    }

    fn profile() -> CompiledProfile {
        CompiledProfile::compile(&SiteProfile::default()).unwrap()
    }

    #[test]
    fn counts_accepted_duplicates_and_skipped() {
        let body = format!(
            "{}{}{}<article class=\"certification-card\"><p class=\"city\">Nowhere</p></article>",
            card("Summit Roofing", "Brooklyn, NY"),
            card("Peak Exteriors", "Queens, NY"),
            card("Summit Roofing", "Brooklyn, NY"),
        );
        let mut session = open(&body);
        let mut dedup = Deduplicator::default();

        let report = extract_page(&mut session, &profile(), &mut dedup, &ScrollPlan::default()).unwrap();

        assert_eq!(report.found, 4);
        assert_eq!(report.accepted.len(), 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(dedup.seen_count(), 2);
        assert!(report.accepted.iter().all(ListingRecord::is_extracted));
        assert_eq!(report.accepted[0].name.as_deref(), Some("Summit Roofing"));
        assert_eq!(report.accepted[1].name.as_deref(), Some("Peak Exteriors"));
    }

    #[test]
    fn secondary_selector_used_when_primary_finds_nothing() {
        let body = r#"<div class="certification-card__wrapper"><h3>Ridge Co</h3></div>"#;
        let mut session = open(body);
        let mut dedup = Deduplicator::default();

        let report = extract_page(&mut session, &profile(), &mut dedup, &ScrollPlan::default()).unwrap();

        assert_eq!(report.found, 1);
        assert_eq!(report.accepted[0].name.as_deref(), Some("Ridge Co"));
    }

    #[test]
    fn blank_name_is_skipped_without_touching_dedup() {
        let body = format!(
            "<article class=\"certification-card\"><h2><a>   </a></h2><p class=\"city\">Nowhere</p></article>{}",
            card("Ridge Co", "Albany, NY"),
        );
        let mut session = open(&body);
        let mut dedup = Deduplicator::default();

        let report = extract_page(&mut session, &profile(), &mut dedup, &ScrollPlan::default()).unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(dedup.seen_count(), 1);
    }

    #[test]
    fn empty_page_accepts_nothing() {
        let mut session = open("<main><p>No contractors match your search.</p></main>");
        let mut dedup = Deduplicator::default();

        let report = extract_page(&mut session, &profile(), &mut dedup, &ScrollPlan::default()).unwrap();

        assert_eq!(report, PageReport::default());
    }

    #[test]
    fn scrolls_in_steps_then_settles_at_bottom() {
        let mut session = open(&card("Summit Roofing", "Brooklyn, NY"));
        let mut dedup = Deduplicator::default();
        let plan = ScrollPlan::default();

        extract_page(&mut session, &profile(), &mut dedup, &plan).unwrap();

        // 900px in 300px steps: three step pauses plus the settle.
        assert_eq!(session.paused(), plan.step_pause * 3 + plan.settle);
        assert_eq!(session.scroll_position(), 900);
    }

    #[test]
    fn previously_seen_listing_is_a_duplicate() {
        let mut session = open(&card("Summit Roofing", "Brooklyn, NY"));
        let mut dedup = Deduplicator::default();
        dedup.accept(&ListingRecord {
            name: Some("Summit Roofing".to_string()),
            address: Some("Brooklyn, NY".to_string()),
            ..ListingRecord::default()
        });

        let report = extract_page(&mut session, &profile(), &mut dedup, &ScrollPlan::default()).unwrap();

        assert!(report.accepted.is_empty());
        assert_eq!(report.duplicates, 1);
    }
}
