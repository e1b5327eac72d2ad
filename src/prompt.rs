//! Questions asked on the terminal.
//!
//! Commands take a [`Prompter`] so tests can answer for the user.

use dialoguer::{Confirm, Password};

use crate::{Error, Result};

/// Interactive questions asked of the user.
pub trait Prompter {
    /// Ask a yes/no question. Any failure to ask counts as "no".
    fn confirm(&self, prompt: &str) -> bool;

    /// Ask for a secret with hidden input.
    fn password(&self, prompt: &str) -> Result<String>;
}

/// [`Prompter`] on the controlling terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn confirm(&self, prompt: &str) -> bool {
        match Confirm::new().with_prompt(prompt).default(false).interact() {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "confirmation prompt failed");
                false
            }
        }
    }

    fn password(&self, prompt: &str) -> Result<String> {
        Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(|e| Error::Io(std::io::Error::other(e)))
    }
}
