//! One run of the mirror switch, from locating the install to the final
//! backup notice.
//!
//! The session owns the decision flow:
//! - locate and select the installation directory
//! - confirm, then optionally back it up
//! - run the replacement engine
//! - on failure or no changes, offer to restore the backup
//!
//! Every component error is reported here and turned into an outcome; only
//! prompt failures (e.g. the user hitting Ctrl-C) propagate to the caller.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::backup::{create_backup, restore_backup};
use crate::fs_utils::{dir_size, format_bytes};
use crate::paths::{Environment, check_manual_path, locate};
use crate::prompt::Prompter;
use crate::replace::{MIRROR_DOMAIN, ReplacementEngine, ReplacementReport, SOURCE_DOMAIN};
use crate::ui::Ui;

const MANUAL_ENTRY: &str = "Enter a path manually";
const MANUAL_PROMPT: &str = "Full path to the LM Studio app directory:";

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The user stopped before anything was modified
    Cancelled,
    /// At least one replacement was written
    Replaced,
    /// Nothing was replaced, or the replacement failed
    Unchanged,
}

/// Flags that pre-answer parts of the flow
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Installation directory; skips discovery when set
    pub path: Option<PathBuf>,
    /// Never create a backup and don't ask about it
    pub skip_backup: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub started_at: DateTime<Utc>,
    pub outcome: Outcome,
    pub install_dir: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
    /// `Some` only when a restore was attempted
    pub restored: Option<bool>,
    pub replacements: usize,
    pub code_replacements: usize,
}

impl SessionReport {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            outcome: Outcome::Cancelled,
            install_dir: None,
            backup_dir: None,
            restored: None,
            replacements: 0,
            code_replacements: 0,
        }
    }
}

enum BackupStep {
    Created(PathBuf),
    Skipped,
    Cancelled,
}

pub struct Session<'a> {
    env: &'a Environment,
    ui: &'a Ui,
    engine: &'a ReplacementEngine,
    prompter: &'a mut dyn Prompter,
    options: SessionOptions,
}

impl<'a> Session<'a> {
    pub fn new(
        env: &'a Environment,
        ui: &'a Ui,
        engine: &'a ReplacementEngine,
        prompter: &'a mut dyn Prompter,
        options: SessionOptions,
    ) -> Self {
        Self {
            env,
            ui,
            engine,
            prompter,
            options,
        }
    }

    /// Run the full switch
    pub fn run(mut self) -> Result<SessionReport> {
        let mut report = SessionReport::new();
        self.ui.banner(SOURCE_DOMAIN, MIRROR_DOMAIN);

        let install_dir = self.select_install_dir()?;
        self.ui.info(format!(
            "Using LM Studio directory: {}",
            self.ui.bold(install_dir.display().to_string())
        ));
        report.install_dir = Some(install_dir.clone());

        let proceed = self.prompter.confirm(
            "Continue with the replacement? Closing LM Studio first is recommended.",
            true,
        )?;
        if !proceed {
            self.ui.warn("Operation cancelled.");
            return Ok(report);
        }

        let backup_dir = match self.backup_step(&install_dir)? {
            BackupStep::Cancelled => {
                self.ui.warn("Operation cancelled.");
                return Ok(report);
            }
            BackupStep::Created(dir) => Some(dir),
            BackupStep::Skipped => None,
        };
        report.backup_dir = backup_dir.clone();

        match self.run_replacement(&install_dir) {
            Some(replaced) if replaced.changed() => {
                report.outcome = Outcome::Replaced;
                report.replacements = replaced.total();
                report.code_replacements = replaced.code_total();
                self.ui.newline();
                self.ui.ok("Done!");
                self.ui.println(format!(
                    "Start LM Studio again; model downloads now go through {}.",
                    MIRROR_DOMAIN
                ));
            }
            _ => {
                report.outcome = Outcome::Unchanged;
                self.ui.newline();
                self.ui
                    .warn("The replacement did not complete or found nothing to replace.");
                if let Some(backup) = &backup_dir {
                    let offered = self.offer_restore(backup, &install_dir);
                    if offered.is_err() {
                        self.report_backup_location(backup);
                    }
                    report.restored = offered?;
                }
            }
        }

        if let Some(backup) = &backup_dir {
            self.report_backup_location(backup);
        }

        Ok(report)
    }

    /// Restore a retained backup into the selected installation.
    ///
    /// Asking for `--restore` is the intent, so the confirmation defaults to yes.
    pub fn restore_only(mut self, backup_dir: &Path) -> Result<SessionReport> {
        let mut report = SessionReport::new();

        if !backup_dir.is_dir() {
            bail!(
                "Backup directory not found: {}\nHint: Backups are kept under {}.",
                backup_dir.display(),
                self.env.temp_dir.display()
            );
        }

        let install_dir = self.select_install_dir()?;
        report.install_dir = Some(install_dir.clone());
        report.backup_dir = Some(backup_dir.to_path_buf());

        let confirmed = self.prompter.confirm(
            &format!(
                "Restore {} over {}? Files in the install will be overwritten.",
                backup_dir.display(),
                install_dir.display()
            ),
            true,
        )?;
        if !confirmed {
            self.ui.warn("Restore cancelled.");
            return Ok(report);
        }

        let restored = self.restore(backup_dir, &install_dir);
        report.restored = Some(restored);
        report.outcome = Outcome::Unchanged;
        Ok(report)
    }

    // -------------------------------------------------------------------------
    // Path selection
    // -------------------------------------------------------------------------

    fn select_install_dir(&mut self) -> Result<PathBuf> {
        if let Some(path) = &self.options.path {
            let input = path.to_string_lossy();
            return check_manual_path(&input)
                .map_err(|msg| anyhow::anyhow!("{}: {}", msg, path.display()));
        }

        if !self.env.platform.is_supported() {
            self.ui.warn(
                "This platform may not be supported; trying the usual LM Studio locations anyway.",
            );
        }

        let found = locate(self.env);
        self.choose_from(found)
    }

    fn choose_from(&mut self, mut found: Vec<PathBuf>) -> Result<PathBuf> {
        match found.len() {
            0 => {
                self.ui
                    .warn("No LM Studio installation found, please enter its location.");
                self.prompter.input_path(MANUAL_PROMPT)
            }
            1 => {
                let only = found.remove(0);
                let use_it = self.prompter.confirm(
                    &format!("Found LM Studio at {}. Use this directory?", only.display()),
                    true,
                )?;
                if use_it {
                    Ok(only)
                } else {
                    self.prompter.input_path(MANUAL_PROMPT)
                }
            }
            _ => {
                let mut options: Vec<String> =
                    found.iter().map(|p| p.display().to_string()).collect();
                options.push(MANUAL_ENTRY.to_string());

                let idx = self.prompter.select(
                    "Found several possible LM Studio installations, choose one:",
                    options,
                )?;
                if idx < found.len() {
                    Ok(found.swap_remove(idx))
                } else {
                    self.prompter.input_path(MANUAL_PROMPT)
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Backup / restore
    // -------------------------------------------------------------------------

    fn backup_step(&mut self, install_dir: &Path) -> Result<BackupStep> {
        if self.options.skip_backup {
            self.ui.info("Skipping backup (--no-backup).");
            return Ok(BackupStep::Skipped);
        }

        if !self
            .prompter
            .confirm("Create a backup before replacing?", true)?
        {
            return Ok(BackupStep::Skipped);
        }

        let spinner = self.ui.spinner("Creating backup...");
        match create_backup(install_dir, &self.env.temp_dir) {
            Ok(dir) => {
                let size = dir_size(&dir).map(format_bytes).unwrap_or_else(|_| "?".into());
                self.ui.spinner_finish_ok(
                    &spinner,
                    format!("Backup created at {} ({})", dir.display(), size),
                );
                Ok(BackupStep::Created(dir))
            }
            Err(e) => {
                self.ui
                    .spinner_finish_err(&spinner, format!("Backup failed: {:#}", e));
                let go_on = self
                    .prompter
                    .confirm("Backup failed. Continue without a backup?", false)?;
                Ok(if go_on {
                    BackupStep::Skipped
                } else {
                    BackupStep::Cancelled
                })
            }
        }
    }

    fn offer_restore(&mut self, backup_dir: &Path, install_dir: &Path) -> Result<Option<bool>> {
        if !self.prompter.confirm("Restore the backup?", true)? {
            return Ok(None);
        }
        Ok(Some(self.restore(backup_dir, install_dir)))
    }

    fn restore(&self, backup_dir: &Path, install_dir: &Path) -> bool {
        let spinner = self
            .ui
            .spinner(format!("Restoring from {}...", backup_dir.display()));
        match restore_backup(backup_dir, install_dir) {
            Ok(()) => {
                self.ui.spinner_finish_ok(&spinner, "Restore complete");
                true
            }
            Err(e) => {
                self.ui
                    .spinner_finish_err(&spinner, format!("Restore failed: {:#}", e));
                self.ui.println(format!(
                    "Copy the files in {} back into {} by hand.",
                    backup_dir.display(),
                    install_dir.display()
                ));
                false
            }
        }
    }

    fn report_backup_location(&self, backup_dir: &Path) {
        self.ui.newline();
        self.ui.info(format!("Backup kept at: {}", backup_dir.display()));
        self.ui.println(self.ui.dim(
            "To undo manually, copy the files from that directory back into the LM Studio app directory.",
        ));
    }

    // -------------------------------------------------------------------------
    // Replacement
    // -------------------------------------------------------------------------

    /// Run the engine, reporting as it goes. `None` means the run failed.
    fn run_replacement(&self, install_dir: &Path) -> Option<ReplacementReport> {
        let spinner = self.ui.spinner("Scanning files...");
        let sets = match self.engine.scan(install_dir) {
            Ok(sets) => sets,
            Err(e) => {
                self.ui
                    .spinner_finish_err(&spinner, format!("Scan failed: {:#}", e));
                return None;
            }
        };
        spinner.finish_and_clear();

        if sets.is_empty() {
            self.ui
                .warn("No processable files found in the selected directory.");
            return Some(ReplacementReport::default());
        }

        self.ui.info(format!(
            "Found {} JS/TSX files and {} other files, replacing...",
            sets.code.len(),
            sets.other.len()
        ));

        let report = match self.engine.run_on(install_dir, &sets) {
            Ok(report) => report,
            Err(e) => {
                self.ui.err(format!("Replacement failed: {:#}", e));
                return None;
            }
        };

        for skipped in &report.skipped {
            self.ui
                .warn(format!("Skipped non-UTF-8 file: {}", skipped.display()));
        }

        if report.changed() {
            self.ui.newline();
            self.ui.println(self.ui.report_table(&report).to_string());
            self.ui.ok(format!(
                "Replaced {} occurrence(s) of {} with {}",
                report.total(),
                SOURCE_DOMAIN,
                MIRROR_DOMAIN
            ));
            self.ui.println(format!(
                "  {} of them in JS/TSX files",
                report.code_total()
            ));
        } else {
            self.ui.warn(
                "Nothing to replace. The install may already use the mirror or a different URL format.",
            );
        }

        Some(report)
    }
}
