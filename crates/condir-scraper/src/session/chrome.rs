//! Headless Chrome implementation of [`BrowserSession`].
//!
//! Every DOM query goes through `Runtime.evaluate` with a `JSON.stringify`
//! wrapper so results come back by value. Real clicks use the element's
//! midpoint; a hit-test with `document.elementFromPoint` first decides
//! whether something else would swallow the click.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::Deserialize;

use super::{BrowserSession, Control};
use crate::error::{ClickError, SessionError};

/// Chrome's own idle watchdog; must outlast the longest blocking wait.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(300);
const WINDOW_SIZE: (u32, u32) = (1920, 1080);

#[derive(Debug, Clone, Default)]
pub struct ChromeOptions {
    /// Explicit Chrome binary; falls back to `CHROME_PATH`, then autodetection.
    pub path: Option<PathBuf>,
    pub headless: bool,
}

pub struct ChromeSession {
    browser: Option<Browser>,
    tab: Arc<Tab>,
}

#[derive(Deserialize)]
struct RawControl {
    text: String,
    aria_label: Option<String>,
    visible: bool,
    enabled: bool,
}

impl ChromeSession {
    /// Launch Chrome and open one tab.
    ///
    /// Sandbox is disabled automatically inside containers (detected via
    /// `/.dockerenv` or the `CONDIR_CONTAINER` env var).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Launch`] if Chrome cannot be started.
    pub fn launch(options: &ChromeOptions) -> Result<Self, SessionError> {
        let is_container = std::env::var("CONDIR_CONTAINER").is_ok()
            || Path::new("/.dockerenv").exists();

        let chrome_path = options
            .path
            .clone()
            .or_else(|| std::env::var("CHROME_PATH").ok().map(PathBuf::from));

        let launch_options = LaunchOptions::default_builder()
            .headless(options.headless)
            .sandbox(!is_container)
            .path(chrome_path)
            .window_size(Some(WINDOW_SIZE))
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .build()
            .map_err(|e| SessionError::Launch(format!("invalid launch options: {e}")))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| SessionError::Launch(format!("failed to launch headless Chrome: {e}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| SessionError::Launch(format!("failed to create browser tab: {e}")))?;

        tracing::debug!(headless = options.headless, sandbox = !is_container, "chrome session started");
        Ok(Self {
            browser: Some(browser),
            tab,
        })
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.browser.is_none() {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    /// Evaluate `expression` and return the JSON value it produced.
    fn eval(&self, expression: &str) -> Result<serde_json::Value, SessionError> {
        self.ensure_open()?;
        let remote = self
            .tab
            .evaluate(expression, false)
            .map_err(|e| SessionError::Script(e.to_string()))?;
        Ok(remote.value.unwrap_or(serde_json::Value::Null))
    }

    /// Evaluate an expression wrapped in `JSON.stringify` and decode it.
    fn eval_json<T: serde::de::DeserializeOwned>(
        &self,
        expression: &str,
        context: &str,
    ) -> Result<T, SessionError> {
        let wrapped = format!("JSON.stringify({expression})");
        let value = self.eval(&wrapped)?;
        let text = value.as_str().ok_or_else(|| SessionError::ScriptResult {
            context: context.to_string(),
            value: value.to_string(),
        })?;
        serde_json::from_str(text).map_err(|e| SessionError::ScriptResult {
            context: context.to_string(),
            value: format!("{text} ({e})"),
        })
    }

    /// JS expression resolving to the control's element (or `undefined`).
    fn element_expr(control: &Control) -> String {
        format!(
            "document.querySelectorAll({})[{}]",
            js_string(&control.selector),
            control.index
        )
    }
}

impl BrowserSession for ChromeSession {
    fn open(&mut self, url: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.tab
            .navigate_to(url)
            .map_err(|e| SessionError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| SessionError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn count(&self, css: &str) -> Result<usize, SessionError> {
        self.eval_json(
            &format!("document.querySelectorAll({}).length", js_string(css)),
            "count",
        )
    }

    fn first_text(&self, css: &str) -> Result<Option<String>, SessionError> {
        let text: Option<String> = self.eval_json(
            &format!(
                "(() => {{ const el = document.querySelector({}); return el ? (el.innerText || '').trim() : null; }})()",
                js_string(css)
            ),
            "first_text",
        )?;
        Ok(text.filter(|t| !t.is_empty()))
    }

    fn scroll_height(&self) -> Result<u64, SessionError> {
        let height: f64 = self.eval_json("document.body.scrollHeight", "scroll_height")?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(height.max(0.0) as u64)
    }

    fn scroll_to(&mut self, y: u64) -> Result<(), SessionError> {
        self.eval(&format!("window.scrollTo(0, {y})"))?;
        Ok(())
    }

    fn scroll_to_bottom(&mut self) -> Result<(), SessionError> {
        self.eval("window.scrollTo(0, document.body.scrollHeight)")?;
        Ok(())
    }

    fn rendered_html(&self) -> Result<String, SessionError> {
        self.ensure_open()?;
        self.tab
            .get_content()
            .map_err(|e| SessionError::Script(format!("failed to read page content: {e}")))
    }

    fn find_controls(&self, css: &str) -> Result<Vec<Control>, SessionError> {
        let raw: Vec<RawControl> = self.eval_json(
            &format!(
                "Array.from(document.querySelectorAll({})).map(el => {{
                    const r = el.getBoundingClientRect();
                    const s = window.getComputedStyle(el);
                    return {{
                        text: (el.innerText || el.textContent || '').trim(),
                        aria_label: el.getAttribute('aria-label'),
                        visible: r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none',
                        enabled: !el.disabled && el.getAttribute('aria-disabled') !== 'true',
                    }};
                }})",
                js_string(css)
            ),
            "find_controls",
        )?;
        Ok(raw
            .into_iter()
            .enumerate()
            .map(|(index, c)| Control {
                selector: css.to_string(),
                index,
                text: c.text,
                aria_label: c.aria_label,
                visible: c.visible,
                enabled: c.enabled,
            })
            .collect())
    }

    fn scroll_into_view(&mut self, control: &Control) -> Result<(), SessionError> {
        let found: bool = self.eval_json(
            &format!(
                "(() => {{ const el = {}; if (!el) return false; el.scrollIntoView({{block: 'center'}}); return true; }})()",
                Self::element_expr(control)
            ),
            "scroll_into_view",
        )?;
        if !found {
            return Err(SessionError::ControlDetached {
                selector: control.selector.clone(),
                index: control.index,
            });
        }
        Ok(())
    }

    fn click(&mut self, control: &Control) -> Result<(), ClickError> {
        let hit: String = self.eval_json(
            &format!(
                "(() => {{
                    const el = {};
                    if (!el) return 'missing';
                    const r = el.getBoundingClientRect();
                    const top = document.elementFromPoint(r.left + r.width / 2, r.top + r.height / 2);
                    return (top === el || el.contains(top)) ? 'clear' : 'covered';
                }})()",
                Self::element_expr(control)
            ),
            "click hit-test",
        )?;
        match hit.as_str() {
            "clear" => {}
            "covered" => return Err(ClickError::Intercepted),
            _ => {
                return Err(SessionError::ControlDetached {
                    selector: control.selector.clone(),
                    index: control.index,
                }
                .into())
            }
        }

        let click_failed = |reason: String| SessionError::ClickFailed {
            selector: control.selector.clone(),
            index: control.index,
            reason,
        };
        let elements = self
            .tab
            .find_elements(&control.selector)
            .map_err(|e| click_failed(e.to_string()))?;
        let element = elements
            .get(control.index)
            .ok_or_else(|| SessionError::ControlDetached {
                selector: control.selector.clone(),
                index: control.index,
            })?;
        element
            .click()
            .map_err(|e| click_failed(e.to_string()))?;
        Ok(())
    }

    fn force_click(&mut self, control: &Control) -> Result<(), SessionError> {
        let clicked: bool = self.eval_json(
            &format!(
                "(() => {{ const el = {}; if (!el) return false; el.click(); return true; }})()",
                Self::element_expr(control)
            ),
            "force_click",
        )?;
        if !clicked {
            return Err(SessionError::ControlDetached {
                selector: control.selector.clone(),
                index: control.index,
            });
        }
        Ok(())
    }

    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn close(&mut self) -> Result<(), SessionError> {
        let Some(browser) = self.browser.take() else {
            return Ok(());
        };
        let result = self
            .tab
            .close(false)
            .map(|_| ())
            .map_err(|e| SessionError::Script(format!("failed to close tab: {e}")));
        // Dropping the browser kills the Chrome process.
        drop(browser);
        tracing::debug!("chrome session closed");
        result
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if self.browser.is_some() {
            if let Err(e) = self.close() {
                tracing::warn!(error = %e, "chrome session did not close cleanly");
            }
        }
    }
}

/// Encode `s` as a JavaScript string literal.
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_string_escapes_quotes() {
        assert_eq!(
            js_string("a[aria-label='Page 2']"),
            "\"a[aria-label='Page 2']\""
        );
        assert_eq!(js_string("a[title=\"x\"]"), "\"a[title=\\\"x\\\"]\"");
    }

    #[test]
    fn element_expr_indexes_selector_matches() {
        let control = Control {
            selector: "li > a".to_string(),
            index: 3,
            text: "4".to_string(),
            aria_label: None,
            visible: true,
            enabled: true,
        };
        assert_eq!(
            ChromeSession::element_expr(&control),
            "document.querySelectorAll(\"li > a\")[3]"
        );
    }
}
