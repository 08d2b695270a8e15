// SPDX-License-Identifier: GPL-3.0-only

//! Result actions: copy, share and open
//!
//! Every action is a no-op returning [`ActionError::Unavailable`] when the
//! current result does not enable it (see [`ActionAvailability`]).

pub mod clipboard;
pub mod share;

pub use clipboard::{Clipboard, ClipboardCommand, Osc52Clipboard, SystemClipboard};
pub use share::{CommandShareSheet, NoShareSheet, ShareSheet, ShareStatus};

use crate::config::Config;
use crate::errors::ActionError;
use crate::scanner::types::{ActionAvailability, DecodedResult};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{info, warn};
use url::Url;

/// What an action ended up doing, for the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Copied,
    /// The system clipboard failed and the terminal fallback was used
    CopiedViaFallback,
    Shared,
    /// The share target was dismissed; nothing is shown
    ShareCancelled,
    /// No share facility, the text was copied instead
    SharedViaClipboard,
    Opened,
}

/// Opens links in the default browser
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &Url) -> Result<(), ActionError>;
}

/// Launches the desktop's default handler, detached from this process
#[derive(Debug, Default)]
pub struct SystemOpener;

impl UrlOpener for SystemOpener {
    fn open(&self, url: &Url) -> Result<(), ActionError> {
        open::that_detached(url.as_str()).map_err(|e| ActionError::OpenFailed(e.to_string()))?;
        info!(url = %url, "Opened link");
        Ok(())
    }
}

pub struct ActionHandlers {
    clipboard: Box<dyn Clipboard>,
    fallback_clipboard: Box<dyn Clipboard>,
    share_sheet: Box<dyn ShareSheet>,
    opener: Box<dyn UrlOpener>,
}

impl ActionHandlers {
    pub fn new(
        clipboard: Box<dyn Clipboard>,
        fallback_clipboard: Box<dyn Clipboard>,
        share_sheet: Box<dyn ShareSheet>,
        opener: Box<dyn UrlOpener>,
    ) -> Self {
        Self {
            clipboard,
            fallback_clipboard,
            share_sheet,
            opener,
        }
    }

    /// Handlers backed by the real system facilities
    pub fn from_config(config: &Config) -> Self {
        let share_sheet: Box<dyn ShareSheet> = match config
            .share_command
            .as_deref()
            .and_then(CommandShareSheet::new)
        {
            Some(sheet) => Box::new(sheet),
            None => Box::new(NoShareSheet),
        };

        Self::new(
            Box::new(SystemClipboard::detect()),
            Box::new(Osc52Clipboard),
            share_sheet,
            Box::new(SystemOpener),
        )
    }

    /// Copy the result text to the clipboard
    pub fn copy(&self, result: Option<&DecodedResult>) -> Result<ActionOutcome, ActionError> {
        let result = enabled(result, |a| a.copy)?;
        self.copy_text(&result.text)
    }

    /// Hand the result to the share sheet, or copy it when there is none
    ///
    /// A cancelled share is not an error.
    pub fn share(&self, result: Option<&DecodedResult>) -> Result<ActionOutcome, ActionError> {
        let result = enabled(result, |a| a.share)?;

        if !self.share_sheet.is_available() {
            return self
                .copy_text(&result.text)
                .map(|_| ActionOutcome::SharedViaClipboard);
        }

        match self.share_sheet.share(&result.text, result.web_url().as_ref()) {
            Ok(ShareStatus::Shared) => Ok(ActionOutcome::Shared),
            Ok(ShareStatus::Cancelled) => Ok(ActionOutcome::ShareCancelled),
            Err(e) => {
                warn!(error = %e, "Share failed, copying instead");
                self.copy_text(&result.text)
                    .map(|_| ActionOutcome::SharedViaClipboard)
            }
        }
    }

    /// Run [`share`](Self::share) on the blocking pool
    ///
    /// A share command may stay open for as long as the user interacts with
    /// it; the caller polls the returned [`PendingShare`] instead of waiting.
    pub fn share_in_background(
        self: &Arc<Self>,
        runtime: &Handle,
        result: Option<&DecodedResult>,
    ) -> Result<PendingShare, ActionError> {
        let result = enabled(result, |a| a.share)?.clone();
        let handlers = Arc::clone(self);
        let (tx, rx) = oneshot::channel();
        runtime.spawn_blocking(move || {
            // The receiver is gone when the UI quit first
            let _ = tx.send(handlers.share(Some(&result)));
        });
        Ok(PendingShare { rx })
    }

    /// Open the result in the browser; only web links are opened
    pub fn open(&self, result: Option<&DecodedResult>) -> Result<ActionOutcome, ActionError> {
        let result = enabled(result, |a| a.open)?;
        let url = result.web_url().ok_or(ActionError::Unavailable)?;
        self.opener.open(&url)?;
        Ok(ActionOutcome::Opened)
    }

    fn copy_text(&self, text: &str) -> Result<ActionOutcome, ActionError> {
        match self.clipboard.write(text) {
            Ok(()) => Ok(ActionOutcome::Copied),
            Err(e) => {
                warn!(
                    clipboard = self.clipboard.name(),
                    fallback = self.fallback_clipboard.name(),
                    error = %e,
                    "Clipboard write failed, using fallback"
                );
                self.fallback_clipboard.write(text)?;
                Ok(ActionOutcome::CopiedViaFallback)
            }
        }
    }
}

/// A share running in the background
pub struct PendingShare {
    rx: oneshot::Receiver<Result<ActionOutcome, ActionError>>,
}

impl PendingShare {
    /// The outcome, once the share has finished
    pub fn try_outcome(&mut self) -> Option<Result<ActionOutcome, ActionError>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(ActionError::ShareFailed(
                "share task ended unexpectedly".to_string(),
            ))),
        }
    }
}

fn enabled<'a>(
    result: Option<&'a DecodedResult>,
    action: impl Fn(&ActionAvailability) -> bool,
) -> Result<&'a DecodedResult, ActionError> {
    match result {
        Some(r) if action(&ActionAvailability::for_result(Some(r))) => Ok(r),
        _ => Err(ActionError::Unavailable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct FakeClipboard {
        fail: bool,
        log: Recorder,
    }

    impl Clipboard for FakeClipboard {
        fn name(&self) -> &str {
            "fake"
        }

        fn write(&self, text: &str) -> Result<(), ActionError> {
            if self.fail {
                return Err(ActionError::ClipboardFailed("down".to_string()));
            }
            self.log.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct FakeOpener(Recorder);

    impl UrlOpener for FakeOpener {
        fn open(&self, url: &Url) -> Result<(), ActionError> {
            self.0.0.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    fn handlers(primary_fails: bool) -> (ActionHandlers, Recorder, Recorder, Recorder) {
        let primary = Recorder::default();
        let fallback = Recorder::default();
        let opened = Recorder::default();
        let handlers = ActionHandlers::new(
            Box::new(FakeClipboard {
                fail: primary_fails,
                log: primary.clone(),
            }),
            Box::new(FakeClipboard {
                fail: false,
                log: fallback.clone(),
            }),
            Box::new(NoShareSheet),
            Box::new(FakeOpener(opened.clone())),
        );
        (handlers, primary, fallback, opened)
    }

    #[test]
    fn test_actions_without_result_are_unavailable() {
        let (handlers, primary, _, opened) = handlers(false);
        assert_eq!(handlers.copy(None), Err(ActionError::Unavailable));
        assert_eq!(handlers.share(None), Err(ActionError::Unavailable));
        assert_eq!(handlers.open(None), Err(ActionError::Unavailable));
        assert!(primary.calls().is_empty());
        assert!(opened.calls().is_empty());
    }

    #[test]
    fn test_copy_uses_fallback_on_failure() {
        let (handlers, _, fallback, _) = handlers(true);
        let result = DecodedResult::new("hello");
        assert_eq!(
            handlers.copy(Some(&result)),
            Ok(ActionOutcome::CopiedViaFallback)
        );
        assert_eq!(fallback.calls(), vec!["hello"]);
    }

    #[test]
    fn test_open_rejects_plain_text() {
        let (handlers, _, _, opened) = handlers(false);
        let result = DecodedResult::new("hello");
        assert_eq!(handlers.open(Some(&result)), Err(ActionError::Unavailable));
        assert!(opened.calls().is_empty());
    }

    #[test]
    fn test_open_web_link() {
        let (handlers, _, _, opened) = handlers(false);
        let result = DecodedResult::new("https://example.com/path");
        assert_eq!(handlers.open(Some(&result)), Ok(ActionOutcome::Opened));
        assert_eq!(opened.calls(), vec!["https://example.com/path"]);
    }
}
