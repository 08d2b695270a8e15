// SPDX-License-Identifier: GPL-3.0-only

//! Share sheet
//!
//! There is no desktop-wide share sheet on Linux, so sharing runs a
//! user-configured command. The decoded text is appended as the last
//! argument; when it is a web link the URL is also exported as
//! `QRSCAN_SHARE_URL`.

use crate::errors::ActionError;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};
use url::Url;

/// Environment variable carrying the URL of a shared web link
pub const SHARE_URL_ENV: &str = "QRSCAN_SHARE_URL";

/// How a share attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareStatus {
    Shared,
    /// The user backed out of the share target
    Cancelled,
}

pub trait ShareSheet: Send + Sync {
    /// Whether sharing can be attempted at all
    fn is_available(&self) -> bool;

    fn share(&self, text: &str, url: Option<&Url>) -> Result<ShareStatus, ActionError>;
}

/// Shares by running an external command
#[derive(Debug, Clone)]
pub struct CommandShareSheet {
    program: String,
    args: Vec<String>,
}

impl CommandShareSheet {
    /// `command[0]` is the program, the rest are leading arguments
    pub fn new(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl ShareSheet for CommandShareSheet {
    fn is_available(&self) -> bool {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            return program.is_file();
        }
        std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
            .unwrap_or(false)
    }

    fn share(&self, text: &str, url: Option<&Url>) -> Result<ShareStatus, ActionError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        match url {
            Some(url) => command.env(SHARE_URL_ENV, url.as_str()),
            None => command.env_remove(SHARE_URL_ENV),
        };

        let status = command
            .status()
            .map_err(|e| ActionError::ShareFailed(format!("{}: {}", self.program, e)))?;

        if status.success() {
            info!(program = %self.program, "Shared result");
            Ok(ShareStatus::Shared)
        } else {
            debug!(program = %self.program, %status, "Share command cancelled");
            Ok(ShareStatus::Cancelled)
        }
    }
}

/// No share facility configured
#[derive(Debug, Default)]
pub struct NoShareSheet;

impl ShareSheet for NoShareSheet {
    fn is_available(&self) -> bool {
        false
    }

    fn share(&self, _text: &str, _url: Option<&Url>) -> Result<ShareStatus, ActionError> {
        Err(ActionError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(script: &str) -> CommandShareSheet {
        let command = ["sh", "-c", script].map(String::from);
        CommandShareSheet::new(&command).unwrap()
    }

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(CommandShareSheet::new(&[]).is_none());
        assert!(CommandShareSheet::new(&[" ".to_string()]).is_none());
    }

    #[test]
    fn test_successful_share() {
        let sheet = sheet("exit 0");
        assert!(sheet.is_available());
        assert_eq!(sheet.share("hello", None), Ok(ShareStatus::Shared));
    }

    #[test]
    fn test_non_zero_exit_is_cancellation() {
        assert_eq!(sheet("exit 1").share("hello", None), Ok(ShareStatus::Cancelled));
    }

    #[test]
    fn test_text_and_url_are_passed() {
        // The appended text becomes $0 of the script
        let sheet = sheet(r#"test "$0" = "https://example.com" && test "$QRSCAN_SHARE_URL" = "https://example.com/""#);
        let url = Url::parse("https://example.com").unwrap();
        assert_eq!(
            sheet.share("https://example.com", Some(&url)),
            Ok(ShareStatus::Shared)
        );
    }

    #[test]
    fn test_missing_program() {
        let command = ["qrscan-test-missing-share".to_string()];
        let sheet = CommandShareSheet::new(&command).unwrap();
        assert!(!sheet.is_available());
        assert!(matches!(
            sheet.share("hello", None),
            Err(ActionError::ShareFailed(_))
        ));
    }
}
