//! Browser session abstraction.
//!
//! The harvest pipeline only talks to a page through [`BrowserSession`]:
//! open a URL, scroll, snapshot the rendered DOM, and find and activate
//! controls. [`ChromeSession`] drives a real headless Chrome;
//! [`SnapshotSession`] replays saved HTML pages and backs the tests.

mod chrome;
mod snapshot;

use std::time::Duration;

use crate::error::{ClickError, SessionError};

pub use chrome::{ChromeOptions, ChromeSession};
pub use snapshot::SnapshotSession;

/// A control found on the current render, identified by the selector that
/// found it and its position among that selector's matches.
///
/// Controls are re-resolved on every operation, so a handle can go stale if
/// the page re-renders between `find_controls` and `click`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub selector: String,
    pub index: usize,
    /// Trimmed visible text.
    pub text: String,
    pub aria_label: Option<String>,
    pub visible: bool,
    pub enabled: bool,
}

pub trait BrowserSession {
    /// Load `url` in the session's page.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Navigation`] when the page cannot be loaded.
    fn open(&mut self, url: &str) -> Result<(), SessionError>;

    /// Number of elements currently matching `css`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the page cannot be queried.
    fn count(&self, css: &str) -> Result<usize, SessionError>;

    /// Trimmed visible text of the first element matching `css`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the page cannot be queried.
    fn first_text(&self, css: &str) -> Result<Option<String>, SessionError>;

    /// Scrollable height of the document in CSS pixels.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the page cannot be queried.
    fn scroll_height(&self) -> Result<u64, SessionError>;

    /// Scroll the viewport to vertical offset `y`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the page cannot be scrolled.
    fn scroll_to(&mut self, y: u64) -> Result<(), SessionError>;

    /// Scroll the viewport to the current bottom of the document.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the page cannot be scrolled.
    fn scroll_to_bottom(&mut self) -> Result<(), SessionError>;

    /// Serialized HTML of the current render.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the DOM cannot be read.
    fn rendered_html(&self) -> Result<String, SessionError>;

    /// All elements matching `css`, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the page cannot be queried.
    fn find_controls(&self, css: &str) -> Result<Vec<Control>, SessionError>;

    /// Bring `control` to the middle of the viewport.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ControlDetached`] if the control is gone.
    fn scroll_into_view(&mut self, control: &Control) -> Result<(), SessionError>;

    /// Click `control` the way a user would.
    ///
    /// # Errors
    ///
    /// Returns [`ClickError::Intercepted`] when another element covers the
    /// control, or [`ClickError::Session`] for any other failure.
    fn click(&mut self, control: &Control) -> Result<(), ClickError>;

    /// Activate `control` from script, bypassing hit-testing.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the control is gone or the script fails.
    fn force_click(&mut self, control: &Control) -> Result<(), SessionError>;

    /// Block for `duration`.
    fn pause(&self, duration: Duration);

    /// Release the underlying browser. Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the browser refuses to close cleanly.
    fn close(&mut self) -> Result<(), SessionError>;
}

/// Poll `condition` every `interval` until it holds or `timeout` elapses.
///
/// The number of polls is fixed up front (`timeout / interval`, at least
/// one), so the worst case never exceeds `timeout` plus one interval no
/// matter how `pause` is implemented.
pub fn wait_until<S, F>(session: &S, timeout: Duration, interval: Duration, mut condition: F) -> bool
where
    S: BrowserSession + ?Sized,
    F: FnMut(&S) -> bool,
{
    let interval = interval.max(Duration::from_millis(1));
    let polls = (timeout.as_millis() / interval.as_millis()).max(1);
    for _ in 0..polls {
        if condition(session) {
            return true;
        }
        session.pause(interval);
    }
    condition(session)
}
