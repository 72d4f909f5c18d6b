//! User decisions behind a trait.
//!
//! The session only asks questions through [`Prompter`]; the interactive
//! terminal implementation and the `--yes` implementation are interchangeable.

use anyhow::{Context, Result, bail};
use inquire::validator::Validation;
use inquire::{Confirm, CustomUserError, Select, Text};
use std::path::PathBuf;

use crate::paths::check_manual_path;

pub trait Prompter {
    /// Pick one of `options`, returning its index
    fn select(&mut self, message: &str, options: Vec<String>) -> Result<usize>;

    /// Ask a yes/no question
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;

    /// Ask for an installation directory.
    ///
    /// Implementations must only return input accepted by
    /// [`check_manual_path`], re-asking until it is.
    fn input_path(&mut self, message: &str) -> Result<PathBuf>;
}

/// Terminal prompts via inquire
#[derive(Debug, Default)]
pub struct InquirePrompter;

impl Prompter for InquirePrompter {
    fn select(&mut self, message: &str, options: Vec<String>) -> Result<usize> {
        let choice = Select::new(message, options)
            .with_help_message("Use arrow keys, Enter to choose")
            .raw_prompt()
            .context("Selection cancelled")?;
        Ok(choice.index)
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        Confirm::new(message)
            .with_default(default)
            .prompt()
            .context("Confirmation cancelled")
    }

    fn input_path(&mut self, message: &str) -> Result<PathBuf> {
        let input = Text::new(message)
            .with_validator(|input: &str| -> Result<Validation, CustomUserError> {
                Ok(match check_manual_path(input) {
                    Ok(_) => Validation::Valid,
                    Err(msg) => Validation::Invalid(msg.into()),
                })
            })
            .prompt()
            .context("Path input cancelled")?;

        // The validator already accepted it; re-run to get the trimmed path
        check_manual_path(&input).map_err(|msg| anyhow::anyhow!("{}: {}", msg, input))
    }
}

/// Non-interactive answers for `--yes`.
///
/// Confirmations take their default, selections take the first option, and a
/// request for a manual path is an error.
#[derive(Debug, Default)]
pub struct AssumeDefaults;

impl Prompter for AssumeDefaults {
    fn select(&mut self, message: &str, options: Vec<String>) -> Result<usize> {
        if options.is_empty() {
            bail!("Nothing to choose from: {}", message);
        }
        tracing::info!(question = message, answer = %options[0], "assumed first option");
        Ok(0)
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        tracing::info!(question = message, answer = default, "assumed default");
        Ok(default)
    }

    fn input_path(&mut self, message: &str) -> Result<PathBuf> {
        bail!(
            "{}\nHint: Pass the installation directory with --path when running with --yes.",
            message
        );
    }
}
