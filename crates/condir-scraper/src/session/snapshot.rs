//! Replays saved HTML pages as if they were successive renders of one
//! paginated listing.
//!
//! Clicking a control whose text is a page number moves to that page; any
//! other control moves one page forward. Elements carrying `hidden` or an
//! inline `display: none` are invisible, `disabled` / `aria-disabled="true"`
//! ones are disabled, `data-covered` marks a control whose real click is
//! intercepted by an overlay, and `data-click-fails` one whose click the
//! browser rejects outright.

use std::cell::Cell;
use std::path::Path;
use std::time::Duration;

use scraper::{ElementRef, Html, Selector};

use super::{BrowserSession, Control};
use crate::error::{ClickError, ScraperError, SessionError};

const DEFAULT_SCROLL_HEIGHT: u64 = 3000;

#[derive(Debug)]
pub struct SnapshotSession {
    pages: Vec<String>,
    current: Option<usize>,
    scroll_height: u64,
    scroll_y: u64,
    crash_on: Option<usize>,
    crashed: bool,
    closed: bool,
    forced_clicks: usize,
    paused: Cell<Duration>,
}

impl SnapshotSession {
    #[must_use]
    pub fn new(pages: Vec<String>) -> Self {
        Self {
            pages,
            current: None,
            scroll_height: DEFAULT_SCROLL_HEIGHT,
            scroll_y: 0,
            crash_on: None,
            crashed: false,
            closed: false,
            forced_clicks: 0,
            paused: Cell::new(Duration::ZERO),
        }
    }

    /// Load every `*.html` file in `dir`, ordered by file name.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::SnapshotIo`] if the directory or a file cannot
    /// be read, or [`ScraperError::NoSnapshots`] if it holds no HTML files.
    pub fn from_dir(dir: &Path) -> Result<Self, ScraperError> {
        let io_err = |path: &Path, source| ScraperError::SnapshotIo {
            path: path.display().to_string(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
            let path = entry.map_err(|e| io_err(dir, e))?.path();
            if path.extension().is_some_and(|ext| ext == "html") {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(ScraperError::NoSnapshots(dir.display().to_string()));
        }
        files.sort();

        let mut pages = Vec::with_capacity(files.len());
        for path in &files {
            pages.push(std::fs::read_to_string(path).map_err(|e| io_err(path, e))?);
        }
        tracing::debug!(dir = %dir.display(), pages = pages.len(), "loaded html snapshots");
        Ok(Self::new(pages))
    }

    #[must_use]
    pub fn with_scroll_height(mut self, height: u64) -> Self {
        self.scroll_height = height;
        self
    }

    /// Simulate a browser crash once page `page` (1-based) is reached.
    #[must_use]
    pub fn crash_on_page(mut self, page: u32) -> Self {
        self.crash_on = Some(page.saturating_sub(1) as usize);
        self
    }

    /// 1-based number of the page currently shown.
    #[must_use]
    pub fn current_page(&self) -> Option<u32> {
        self.current.and_then(|i| u32::try_from(i + 1).ok())
    }

    #[must_use]
    pub fn forced_clicks(&self) -> usize {
        self.forced_clicks
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn scroll_position(&self) -> u64 {
        self.scroll_y
    }

    /// Total time requested through [`BrowserSession::pause`].
    #[must_use]
    pub fn paused(&self) -> Duration {
        self.paused.get()
    }

    fn live(&self) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        if self.crashed {
            return Err(SessionError::Script("browser crashed".to_string()));
        }
        Ok(())
    }

    fn document(&self) -> Result<Html, SessionError> {
        self.live()?;
        let index = self.current.ok_or(SessionError::NoPage)?;
        let html = self.pages.get(index).ok_or(SessionError::NoPage)?;
        Ok(Html::parse_document(html))
    }

    fn show(&mut self, index: usize, url: &str) -> Result<(), SessionError> {
        if index >= self.pages.len() {
            return Err(SessionError::Navigation {
                url: url.to_string(),
                reason: format!("no snapshot for page {}", index + 1),
            });
        }
        self.current = Some(index);
        self.scroll_y = 0;
        if self.crash_on == Some(index) {
            self.crashed = true;
        }
        Ok(())
    }

    fn resolve<'a>(
        document: &'a Html,
        control: &Control,
    ) -> Result<ElementRef<'a>, SessionError> {
        let selector = parse_selector(&control.selector)?;
        document
            .select(&selector)
            .nth(control.index)
            .ok_or_else(|| SessionError::ControlDetached {
                selector: control.selector.clone(),
                index: control.index,
            })
    }

    /// Follow `control`: a numeric label jumps to that page, anything else
    /// steps forward.
    fn follow(&mut self, control: &Control) -> Result<(), SessionError> {
        let current = self.current.ok_or(SessionError::NoPage)?;
        let target = match control.text.trim().parse::<usize>() {
            Ok(n) if n > 0 => n - 1,
            _ => current + 1,
        };
        self.show(target, &format!("snapshot://page/{}", target + 1))
    }
}

impl BrowserSession for SnapshotSession {
    fn open(&mut self, url: &str) -> Result<(), SessionError> {
        self.live()?;
        self.show(0, url)
    }

    fn count(&self, css: &str) -> Result<usize, SessionError> {
        let document = self.document()?;
        let selector = parse_selector(css)?;
        Ok(document.select(&selector).count())
    }

    fn first_text(&self, css: &str) -> Result<Option<String>, SessionError> {
        let document = self.document()?;
        let selector = parse_selector(css)?;
        Ok(document
            .select(&selector)
            .next()
            .map(|el| visible_text(&el))
            .filter(|t| !t.is_empty()))
    }

    fn scroll_height(&self) -> Result<u64, SessionError> {
        self.live()?;
        self.current.ok_or(SessionError::NoPage)?;
        Ok(self.scroll_height)
    }

    fn scroll_to(&mut self, y: u64) -> Result<(), SessionError> {
        self.live()?;
        self.scroll_y = y.min(self.scroll_height);
        Ok(())
    }

    fn scroll_to_bottom(&mut self) -> Result<(), SessionError> {
        self.live()?;
        self.scroll_y = self.scroll_height;
        Ok(())
    }

    fn rendered_html(&self) -> Result<String, SessionError> {
        self.live()?;
        let index = self.current.ok_or(SessionError::NoPage)?;
        self.pages.get(index).cloned().ok_or(SessionError::NoPage)
    }

    fn find_controls(&self, css: &str) -> Result<Vec<Control>, SessionError> {
        let document = self.document()?;
        let selector = parse_selector(css)?;
        Ok(document
            .select(&selector)
            .enumerate()
            .map(|(index, el)| {
                let attrs = el.value();
                Control {
                    selector: css.to_string(),
                    index,
                    text: visible_text(&el),
                    aria_label: attrs.attr("aria-label").map(ToString::to_string),
                    visible: is_visible(&el),
                    enabled: attrs.attr("disabled").is_none()
                        && attrs.attr("aria-disabled") != Some("true"),
                }
            })
            .collect())
    }

    fn scroll_into_view(&mut self, control: &Control) -> Result<(), SessionError> {
        let document = self.document()?;
        Self::resolve(&document, control)?;
        Ok(())
    }

    fn click(&mut self, control: &Control) -> Result<(), ClickError> {
        let (covered, rejected) = {
            let document = self.document()?;
            let element = Self::resolve(&document, control)?;
            let attrs = element.value();
            (
                attrs.attr("data-covered").is_some(),
                attrs.attr("data-click-fails").is_some(),
            )
        };
        if covered {
            return Err(ClickError::Intercepted);
        }
        if rejected {
            return Err(SessionError::ClickFailed {
                selector: control.selector.clone(),
                index: control.index,
                reason: "element rejected the click".to_string(),
            }
            .into());
        }
        self.follow(control)?;
        Ok(())
    }

    fn force_click(&mut self, control: &Control) -> Result<(), SessionError> {
        {
            let document = self.document()?;
            Self::resolve(&document, control)?;
        }
        self.forced_clicks += 1;
        self.follow(control)
    }

    fn pause(&self, duration: Duration) {
        self.paused.set(self.paused.get() + duration);
    }

    fn close(&mut self) -> Result<(), SessionError> {
        self.closed = true;
        Ok(())
    }
}

fn parse_selector(css: &str) -> Result<Selector, SessionError> {
    Selector::parse(css).map_err(|e| SessionError::Script(format!("invalid selector {css}: {e}")))
}

fn visible_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// An element is visible unless it or an ancestor is `hidden` or styled
/// `display: none`.
fn is_visible(element: &ElementRef<'_>) -> bool {
    std::iter::once(*element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .all(|el| {
            let attrs = el.value();
            let style = attrs
                .attr("style")
                .map(|s| s.replace(' ', "").to_ascii_lowercase())
                .unwrap_or_default();
            attrs.attr("hidden").is_none() && !style.contains("display:none")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> String {
        format!("<html><body>{body}</body></html>")
    }

    fn session(pages: &[&str]) -> SnapshotSession {
        let mut session = SnapshotSession::new(pages.iter().map(|b| page(b)).collect());
        session.open("snapshot://start").unwrap();
        session
    }

    #[test]
    fn queries_need_an_open_page() {
        let session = SnapshotSession::new(vec![page("<p>x</p>")]);
        assert!(matches!(session.count("p"), Err(SessionError::NoPage)));
    }

    #[test]
    fn count_and_first_text() {
        let session = session(&["<ul><li> Alpha \n Roofing </li><li>Beta</li></ul>"]);
        assert_eq!(session.count("li").unwrap(), 2);
        assert_eq!(session.first_text("li").unwrap().as_deref(), Some("Alpha Roofing"));
        assert_eq!(session.first_text("h2").unwrap(), None);
    }

    #[test]
    fn controls_report_visibility_and_state() {
        let session = session(&[
            r#"<a>1</a><a hidden>2</a><div style="display: none"><a>3</a></div>
               <button aria-disabled="true">Next</button>"#,
        ]);
        let links = session.find_controls("a").unwrap();
        assert_eq!(links.len(), 3);
        assert!(links[0].visible);
        assert!(!links[1].visible);
        assert!(!links[2].visible);

        let next = session.find_controls("button").unwrap();
        assert!(next[0].visible);
        assert!(!next[0].enabled);
    }

    #[test]
    fn numeric_click_jumps_and_other_click_steps() {
        let mut jump = session(&["<a>3</a><a>Next</a>", "<a>Next</a>", "<p>three</p>"]);
        let controls = jump.find_controls("a").unwrap();
        jump.click(&controls[0]).unwrap();
        assert_eq!(jump.current_page(), Some(3));

        let mut step = session(&["<a>Next</a>", "<p>two</p>"]);
        let controls = step.find_controls("a").unwrap();
        step.click(&controls[0]).unwrap();
        assert_eq!(step.current_page(), Some(2));
    }

    #[test]
    fn covered_control_is_intercepted_until_forced() {
        let mut session = session(&["<a data-covered>2</a>", "<p>two</p>"]);
        let controls = session.find_controls("a").unwrap();
        assert!(matches!(
            session.click(&controls[0]),
            Err(ClickError::Intercepted)
        ));
        session.force_click(&controls[0]).unwrap();
        assert_eq!(session.current_page(), Some(2));
        assert_eq!(session.forced_clicks(), 1);
    }

    #[test]
    fn click_past_last_snapshot_fails_navigation() {
        let mut session = session(&["<a>2</a>"]);
        let controls = session.find_controls("a").unwrap();
        let err = session.click(&controls[0]).unwrap_err();
        assert!(matches!(
            err,
            ClickError::Session(SessionError::Navigation { .. })
        ));
        assert_eq!(session.current_page(), Some(1));
    }

    #[test]
    fn crash_poisons_every_call() {
        let mut session = SnapshotSession::new(vec![page("<a>2</a>"), page("<p>two</p>")])
            .crash_on_page(2);
        session.open("snapshot://start").unwrap();
        let controls = session.find_controls("a").unwrap();
        session.click(&controls[0]).unwrap();
        assert!(matches!(session.rendered_html(), Err(SessionError::Script(_))));
    }

    #[test]
    fn closed_session_refuses_work() {
        let mut session = session(&["<p>x</p>"]);
        session.close().unwrap();
        session.close().unwrap();
        assert!(session.is_closed());
        assert!(matches!(session.count("p"), Err(SessionError::Closed)));
    }

    #[test]
    fn from_dir_orders_by_file_name() {
        let dir = std::env::temp_dir().join(format!("condir-snapshots-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("page-02.html"), page("<p>second</p>")).unwrap();
        std::fs::write(dir.join("page-01.html"), page("<p>first</p>")).unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let mut session = SnapshotSession::from_dir(&dir).unwrap();
        session.open("snapshot://start").unwrap();
        assert_eq!(session.first_text("p").unwrap().as_deref(), Some("first"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn from_dir_without_html_is_an_error() {
        let dir = std::env::temp_dir().join(format!("condir-empty-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let err = SnapshotSession::from_dir(&dir).unwrap_err();
        assert!(matches!(err, ScraperError::NoSnapshots(_)));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
