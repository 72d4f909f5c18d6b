//! Test utilities shared across test modules
//!
//! A scratch [`Environment`] rooted in a temp directory and a [`Prompter`]
//! that replays scripted answers.

use anyhow::{Result, bail};
use std::collections::VecDeque;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::paths::{Environment, Platform, check_manual_path};
use crate::prompt::Prompter;

/// Build an environment whose home and temp directories live in `temp_dir`
pub fn setup_test_env(temp_dir: &TempDir, platform: Platform) -> Environment {
    let home_dir = temp_dir.path().join("home");
    let tmp = temp_dir.path().join("tmp");
    std::fs::create_dir_all(&home_dir).unwrap();
    std::fs::create_dir_all(&tmp).unwrap();

    Environment {
        platform,
        home_dir,
        temp_dir: tmp,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Select(usize),
    Confirm(bool),
    Path(String),
}

/// Replays answers in order, failing on a question of the wrong kind
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<Answer>,
    /// Actions run just before the question with the given index is answered
    hooks: Vec<(usize, Box<dyn FnOnce()>)>,
    asked: usize,
    /// Options offered by the most recent `select`
    pub last_options: Vec<String>,
    /// Manual paths refused by validation
    pub rejected_paths: usize,
}

impl ScriptedPrompter {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: answers.into(),
            ..Default::default()
        }
    }

    /// Run `action` right before question number `index` (0-based) is answered
    pub fn before_question(mut self, index: usize, action: impl FnOnce() + 'static) -> Self {
        self.hooks.push((index, Box::new(action)));
        self
    }

    pub fn is_exhausted(&self) -> bool {
        self.answers.is_empty()
    }

    fn next(&mut self, message: &str) -> Result<Answer> {
        let index = self.asked;
        self.asked += 1;
        if let Some(pos) = self.hooks.iter().position(|(at, _)| *at == index) {
            let (_, action) = self.hooks.remove(pos);
            action();
        }

        match self.answers.pop_front() {
            Some(answer) => Ok(answer),
            None => bail!("No scripted answer left for: {}", message),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn select(&mut self, message: &str, options: Vec<String>) -> Result<usize> {
        self.last_options = options;
        match self.next(message)? {
            Answer::Select(idx) => Ok(idx),
            other => bail!("Expected a selection for '{}', got {:?}", message, other),
        }
    }

    fn confirm(&mut self, message: &str, _default: bool) -> Result<bool> {
        match self.next(message)? {
            Answer::Confirm(yes) => Ok(yes),
            other => bail!("Expected a confirmation for '{}', got {:?}", message, other),
        }
    }

    fn input_path(&mut self, message: &str) -> Result<PathBuf> {
        loop {
            match self.next(message)? {
                Answer::Path(input) => match check_manual_path(&input) {
                    Ok(path) => return Ok(path),
                    Err(_) => self.rejected_paths += 1,
                },
                other => bail!("Expected a path for '{}', got {:?}", message, other),
            }
        }
    }
}
