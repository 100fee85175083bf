//! Pagination Navigator: move the session from the current page to page `n`
//! of a listing whose pager markup is not known in advance.
//!
//! Numbered controls are tried first, in the order the site profile lists
//! them. If none of them can be activated, "next" controls are tried, which
//! may land on a page other than `n`. A control that is covered by an
//! overlay is activated from script instead.

use std::time::Duration;

use condir_core::ControlLocator;

use crate::error::{ClickError, SessionError};
use crate::profile::CompiledProfile;
use crate::session::{BrowserSession, Control};

/// Result of one navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// A numbered control for the requested page was activated.
    ToPage(u32),
    /// Only a "next" control worked; the new page number is not verified.
    ByNext,
    /// No control could be activated.
    Stuck,
}

impl Advance {
    #[must_use]
    pub fn advanced(self) -> bool {
        !matches!(self, Self::Stuck)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavTiming {
    /// Wait after scrolling to the pager at the bottom of the page.
    pub bottom_pause: Duration,
    /// Wait after bringing a control into view, before clicking it.
    pub focus_pause: Duration,
}

impl Default for NavTiming {
    fn default() -> Self {
        Self {
            bottom_pause: Duration::from_secs(2),
            focus_pause: Duration::from_secs(1),
        }
    }
}

/// Try to move to page `page`.
///
/// Failures on individual candidates are logged and skipped.
///
/// # Errors
///
/// Returns [`SessionError`] only when the session itself fails (see
/// [`SessionError::is_fatal`]).
pub fn go_to_page<S>(
    session: &mut S,
    profile: &CompiledProfile,
    page: u32,
    timing: &NavTiming,
) -> Result<Advance, SessionError>
where
    S: BrowserSession + ?Sized,
{
    session.scroll_to_bottom()?;
    session.pause(timing.bottom_pause);

    for locator in &profile.page_controls {
        let locator = locator.for_page(page);
        if try_locator(session, &locator, false, timing)? {
            tracing::info!(page, selector = %locator.css, "moved to page");
            return Ok(Advance::ToPage(page));
        }
    }

    for locator in &profile.next_controls {
        if try_locator(session, locator, true, timing)? {
            tracing::info!(page, selector = %locator.css, "moved forward via next control");
            return Ok(Advance::ByNext);
        }
    }

    tracing::warn!(page, "no pagination control could be activated");
    Ok(Advance::Stuck)
}

/// Activate the first usable candidate of `locator`. `Ok(false)` means no
/// candidate worked.
fn try_locator<S>(
    session: &mut S,
    locator: &ControlLocator,
    require_enabled: bool,
    timing: &NavTiming,
) -> Result<bool, SessionError>
where
    S: BrowserSession + ?Sized,
{
    let controls = match session.find_controls(&locator.css) {
        Ok(controls) => controls,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            tracing::debug!(selector = %locator.css, error = %e, "locator lookup failed");
            return Ok(false);
        }
    };

    let candidates = controls
        .into_iter()
        .filter(|c| c.visible && (!require_enabled || c.enabled))
        .filter(|c| locator.matches_text(&c.text));

    for control in candidates {
        match activate(session, &control, timing) {
            Ok(()) => return Ok(true),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::debug!(
                    selector = %control.selector,
                    index = control.index,
                    error = %e,
                    "pagination candidate failed"
                );
            }
        }
    }
    Ok(false)
}

fn activate<S>(session: &mut S, control: &Control, timing: &NavTiming) -> Result<(), SessionError>
where
    S: BrowserSession + ?Sized,
{
    session.scroll_into_view(control)?;
    session.pause(timing.focus_pause);
    match session.click(control) {
        Ok(()) => Ok(()),
        Err(ClickError::Intercepted) => {
            tracing::debug!(selector = %control.selector, "click intercepted; activating from script");
            session.force_click(control)
        }
        Err(ClickError::Session(e)) => Err(e),
    }
}
