use thiserror::Error;

/// Failure while driving the browser. Only [`SessionError::is_fatal`]
/// variants end a harvest early (with partial results kept); field- and
/// element-level problems never surface as a `SessionError`.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("unexpected script result for {context}: {value}")]
    ScriptResult { context: String, value: String },

    #[error("control {selector}[{index}] is no longer attached")]
    ControlDetached { selector: String, index: usize },

    /// The browser rejected the click on one located control.
    #[error("click on {selector}[{index}] failed: {reason}")]
    ClickFailed {
        selector: String,
        index: usize,
        reason: String,
    },

    #[error("no page is loaded")]
    NoPage,

    #[error("session is closed")]
    Closed,
}

impl SessionError {
    /// `true` when the browser itself is unusable, as opposed to one element
    /// or one navigation attempt going wrong.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Launch(_) | Self::Script(_) | Self::NoPage | Self::Closed
        )
    }
}

/// Outcome of a direct click attempt on a control.
#[derive(Debug, Error)]
pub enum ClickError {
    /// Another element sits on top of the control's click point.
    #[error("click intercepted by an overlapping element")]
    Intercepted,

    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("invalid CSS selector \"{selector}\" in site profile: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("failed to read snapshot {path}: {source}")]
    SnapshotIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no HTML snapshots found in {0}")]
    NoSnapshots(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_control_failures_are_not_fatal() {
        let detached = SessionError::ControlDetached {
            selector: "a".to_string(),
            index: 0,
        };
        let click_failed = SessionError::ClickFailed {
            selector: "a".to_string(),
            index: 1,
            reason: "Could not compute box model".to_string(),
        };
        assert!(!detached.is_fatal());
        assert!(!click_failed.is_fatal());
        assert!(SessionError::Script("boom".to_string()).is_fatal());
    }
}
