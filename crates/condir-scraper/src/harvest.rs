//! Harvest Controller: drives one browser session through a paginated
//! listing until it stops producing new records.
//!
//! ```text
//! Init -> PageLoaded -> Extracting -> Navigating -> Extracting -> ...
//!                                  \-> Done | Aborted
//! ```
//!
//! Records accepted before any stop, including a session fault, are always
//! returned, and the session is closed on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use condir_core::{AppConfig, ConfigError, DedupStrategy, ListingRecord};

use crate::dedup::Deduplicator;
use crate::error::SessionError;
use crate::page::{extract_page, ScrollPlan};
use crate::pagination::{go_to_page, Advance, NavTiming};
use crate::profile::CompiledProfile;
use crate::session::{wait_until, BrowserSession};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestState {
    Init,
    PageLoaded,
    Extracting,
    Navigating,
    Done,
    Aborted,
}

/// Why a harvest stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A page yielded no new records.
    Saturated,
    /// The page ceiling was reached.
    PageLimit,
    /// No pagination control could be activated.
    NavigationExhausted,
    /// The stop flag was raised.
    Cancelled,
    /// The browser session failed.
    Fault(String),
}

impl StopReason {
    /// Short machine-readable label, as stored with a harvest run.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Saturated => "saturated",
            Self::PageLimit => "page_limit",
            Self::NavigationExhausted => "navigation_exhausted",
            Self::Cancelled => "cancelled",
            Self::Fault(_) => "fault",
        }
    }

    /// Terminal state a harvest ending for this reason lands in.
    #[must_use]
    pub fn final_state(&self) -> HarvestState {
        match self {
            Self::Saturated | Self::PageLimit => HarvestState::Done,
            Self::NavigationExhausted | Self::Cancelled | Self::Fault(_) => HarvestState::Aborted,
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fault(message) => write!(f, "fault: {message}"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HarvestOutcome {
    /// Accepted records in acceptance order.
    pub records: Vec<ListingRecord>,
    /// Pages that were extracted.
    pub pages_visited: u32,
    pub final_state: HarvestState,
    pub stop_reason: StopReason,
    /// Listing containers dropped for lack of a name.
    pub skipped_elements: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestConfig {
    pub url: String,
    /// Safety ceiling on extracted pages.
    pub max_pages: u32,
    pub page_load_timeout: Duration,
    pub transition_timeout: Duration,
    pub poll_interval: Duration,
    pub scroll: ScrollPlan,
    pub nav: NavTiming,
    pub dedup: DedupStrategy,
}

impl HarvestConfig {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_pages: 15,
            page_load_timeout: Duration::from_secs(8),
            transition_timeout: Duration::from_secs(5),
            poll_interval: POLL_INTERVAL,
            scroll: ScrollPlan::default(),
            nav: NavTiming::default(),
            dedup: DedupStrategy::default(),
        }
    }

    /// Build the harvest settings from application config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configured base URL is invalid.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            max_pages: config.harvest_max_pages,
            page_load_timeout: Duration::from_secs(config.harvest_page_load_secs),
            transition_timeout: Duration::from_secs(config.harvest_transition_secs),
            scroll: ScrollPlan {
                step_px: config.harvest_scroll_step_px,
                step_pause: Duration::from_millis(config.harvest_scroll_pause_ms),
                settle: Duration::from_millis(config.harvest_settle_ms),
            },
            dedup: config.harvest_dedup_key,
            ..Self::new(config.search_url()?.to_string())
        })
    }
}

/// Accumulated results, owned by one `run` call.
struct Progress {
    state: HarvestState,
    records: Vec<ListingRecord>,
    pages_visited: u32,
    skipped: usize,
}

impl Progress {
    fn enter(&mut self, state: HarvestState) {
        tracing::debug!(from = ?self.state, to = ?state, "harvest state change");
        self.state = state;
    }
}

pub struct Harvester {
    config: HarvestConfig,
    profile: CompiledProfile,
    stop: Arc<AtomicBool>,
}

impl Harvester {
    #[must_use]
    pub fn new(config: HarvestConfig, profile: CompiledProfile) -> Self {
        Self {
            config,
            profile,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an externally owned stop flag (e.g. one set from a signal handler).
    #[must_use]
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Flag that, once set, ends the harvest before the next page.
    #[must_use]
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Harvest every page reachable from the configured URL.
    ///
    /// Never fails: session faults end the run as
    /// [`HarvestState::Aborted`] with [`StopReason::Fault`] and whatever was
    /// collected so far.
    pub fn run<S>(&self, session: &mut S) -> HarvestOutcome
    where
        S: BrowserSession + ?Sized,
    {
        let mut progress = Progress {
            state: HarvestState::Init,
            records: Vec::new(),
            pages_visited: 0,
            skipped: 0,
        };

        let stop_reason = match self.drive(session, &mut progress) {
            Ok(reason) => reason,
            Err(e) => {
                tracing::error!(error = %e, state = ?progress.state, "browser session failed; keeping partial results");
                StopReason::Fault(e.to_string())
            }
        };

        if let Err(e) = session.close() {
            tracing::warn!(error = %e, "failed to close browser session");
        }

        let final_state = stop_reason.final_state();
        progress.enter(final_state);
        tracing::info!(
            pages_visited = progress.pages_visited,
            records = progress.records.len(),
            skipped = progress.skipped,
            reason = %stop_reason,
            "harvest finished"
        );

        HarvestOutcome {
            records: progress.records,
            pages_visited: progress.pages_visited,
            final_state,
            stop_reason,
            skipped_elements: progress.skipped,
        }
    }

    fn drive<S>(&self, session: &mut S, progress: &mut Progress) -> Result<StopReason, SessionError>
    where
        S: BrowserSession + ?Sized,
    {
        if self.cancelled() {
            return Ok(StopReason::Cancelled);
        }

        let listing_css = self.profile.any_listing_css();
        let config = &self.config;

        tracing::info!(url = %config.url, "opening listing");
        session.open(&config.url)?;
        let loaded = wait_until(&*session, config.page_load_timeout, config.poll_interval, |s| {
            s.count(&listing_css).is_ok_and(|n| n > 0)
        });
        if !loaded {
            tracing::warn!(
                timeout_secs = config.page_load_timeout.as_secs(),
                "no listing appeared before the page-load timeout"
            );
        }
        progress.enter(HarvestState::PageLoaded);

        let mut dedup = Deduplicator::new(config.dedup);
        let mut page: u32 = 1;
        loop {
            progress.enter(HarvestState::Extracting);
            let report = extract_page(session, &self.profile, &mut dedup, &config.scroll)?;
            progress.pages_visited += 1;
            progress.skipped += report.skipped;
            let accepted = report.accepted.len();
            progress.records.extend(report.accepted);
            tracing::info!(page, accepted, total = progress.records.len(), "page harvested");

            if accepted == 0 {
                return Ok(StopReason::Saturated);
            }
            if page >= config.max_pages {
                return Ok(StopReason::PageLimit);
            }
            if self.cancelled() {
                return Ok(StopReason::Cancelled);
            }

            progress.enter(HarvestState::Navigating);
            let before = session.first_text(&listing_css)?;
            match go_to_page(session, &self.profile, page + 1, &config.nav)? {
                Advance::Stuck => return Ok(StopReason::NavigationExhausted),
                Advance::ByNext => {
                    tracing::debug!(page = page + 1, "advanced by next control; page number unverified");
                }
                Advance::ToPage(_) => {}
            }

            // Errors here resurface on the next extraction.
            let changed = wait_until(&*session, config.transition_timeout, config.poll_interval, |s| {
                s.first_text(&listing_css).map_or(true, |now| now != before)
            });
            if !changed {
                tracing::debug!(page = page + 1, "first listing unchanged after transition wait");
            }
            page += 1;
        }
    }

    fn cancelled(&self) -> bool {
        let stop = self.stop.load(Ordering::SeqCst);
        if stop {
            tracing::info!("harvest cancellation requested");
        }
        stop
    }
}
