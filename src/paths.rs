//! Installation discovery.
//!
//! Candidate directories come from a static per-platform table. The only
//! process-wide inputs (platform, home and temp directories) are gathered
//! once into [`Environment`] so that discovery and backups can be pointed at
//! a scratch directory in tests.

use anyhow::{Context, Result};
use directories::BaseDirs;
use std::path::{Path, PathBuf};

/// Host platform tag used to pick the candidate table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Mac,
    Windows,
    /// Linux and anything else; searched with a generic Unix-like layout
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::Mac
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Other
        }
    }

    /// LM Studio only ships official builds for macOS and Windows
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// Environment queries the locator and backup manager depend on
#[derive(Debug, Clone)]
pub struct Environment {
    pub platform: Platform,
    /// The user's home directory
    pub home_dir: PathBuf,
    /// Where backups are written
    pub temp_dir: PathBuf,
}

impl Environment {
    pub fn detect() -> Result<Self> {
        let base_dirs = BaseDirs::new().context("Failed to determine home directory")?;

        Ok(Self {
            platform: Platform::current(),
            home_dir: base_dirs.home_dir().to_path_buf(),
            temp_dir: std::env::temp_dir(),
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Anchor {
    /// Absolute location
    Root,
    /// Relative to the home directory
    Home,
}

const MAC_CANDIDATES: &[(Anchor, &str)] = &[
    (Anchor::Root, "/Applications/LM Studio.app/Contents/Resources/app"),
    (Anchor::Home, "Applications/LM Studio.app/Contents/Resources/app"),
];

const WINDOWS_CANDIDATES: &[(Anchor, &str)] = &[
    (Anchor::Home, "AppData/Local/LM-Studio/resources/app"),
    (Anchor::Home, "AppData/Local/Programs/LM-Studio/resources/app"),
    (Anchor::Root, "C:/Program Files/LM-Studio/resources/app"),
    (Anchor::Root, "C:/Program Files (x86)/LM-Studio/resources/app"),
];

const OTHER_CANDIDATES: &[(Anchor, &str)] = &[
    (Anchor::Home, ".local/share/LM-Studio/resources/app"),
    (Anchor::Root, "/opt/LM-Studio/resources/app"),
    (Anchor::Root, "/usr/local/LM-Studio/resources/app"),
];

fn candidate_table(platform: Platform) -> &'static [(Anchor, &'static str)] {
    match platform {
        Platform::Mac => MAC_CANDIDATES,
        Platform::Windows => WINDOWS_CANDIDATES,
        Platform::Other => OTHER_CANDIDATES,
    }
}

/// Every plausible installation directory for `platform`, in probing order.
///
/// None of the returned paths are checked; see [`locate`].
pub fn candidate_paths(platform: Platform, home: &Path) -> Vec<PathBuf> {
    candidate_table(platform)
        .iter()
        .map(|(anchor, template)| match anchor {
            Anchor::Root => PathBuf::from(template),
            Anchor::Home => home.join(template),
        })
        .collect()
}

/// Candidates for the current environment that exist right now.
///
/// A failed existence check (permission denied, broken mount, ...) counts as
/// a missing candidate.
pub fn locate(env: &Environment) -> Vec<PathBuf> {
    candidate_paths(env.platform, &env.home_dir)
        .into_iter()
        .filter(|candidate| path_exists(candidate))
        .collect()
}

fn path_exists(path: &Path) -> bool {
    match path.try_exists() {
        Ok(exists) => {
            tracing::debug!(path = %path.display(), exists, "checked candidate");
            exists
        }
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "existence check failed, treating as missing");
            false
        }
    }
}

/// Validate a manually entered installation path.
///
/// The error is the message shown next to the prompt.
pub fn check_manual_path(input: &str) -> Result<PathBuf, &'static str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("Path cannot be empty");
    }

    let path = PathBuf::from(trimmed);
    if path_exists(&path) {
        Ok(path)
    } else {
        Err("Path does not exist")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_env;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_candidate_order_windows() {
        let home = Path::new("/home/alice");
        let candidates = candidate_paths(Platform::Windows, home);
        assert_eq!(candidates.len(), 4);
        assert_eq!(
            candidates[0],
            home.join("AppData/Local/LM-Studio/resources/app")
        );
        assert_eq!(
            candidates[3],
            PathBuf::from("C:/Program Files (x86)/LM-Studio/resources/app")
        );
    }

    #[test]
    fn test_candidate_paths_mac() {
        let home = Path::new("/Users/alice");
        let candidates = candidate_paths(Platform::Mac, home);
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/Applications/LM Studio.app/Contents/Resources/app"),
                home.join("Applications/LM Studio.app/Contents/Resources/app"),
            ]
        );
    }

    #[test]
    fn test_only_other_is_unsupported() {
        assert!(Platform::Mac.is_supported());
        assert!(Platform::Windows.is_supported());
        assert!(!Platform::Other.is_supported());
    }

    #[test]
    fn test_locate_returns_existing_candidates_only() {
        let temp_dir = TempDir::new().unwrap();
        let env = setup_test_env(&temp_dir, Platform::Other);

        assert!(locate(&env).iter().all(|p| !p.starts_with(temp_dir.path())));

        let installed = env.home_dir.join(".local/share/LM-Studio/resources/app");
        fs::create_dir_all(&installed).unwrap();

        let found = locate(&env);
        assert!(found.contains(&installed));
        assert_eq!(found[0], installed);
        assert!(found.iter().all(|p| p.exists()));
    }

    #[test]
    fn test_locate_preserves_table_order() {
        let temp_dir = TempDir::new().unwrap();
        let env = setup_test_env(&temp_dir, Platform::Windows);

        let programs = env.home_dir.join("AppData/Local/Programs/LM-Studio/resources/app");
        let local = env.home_dir.join("AppData/Local/LM-Studio/resources/app");
        fs::create_dir_all(&programs).unwrap();
        fs::create_dir_all(&local).unwrap();

        let found: Vec<_> = locate(&env)
            .into_iter()
            .filter(|p| p.starts_with(temp_dir.path()))
            .collect();
        assert_eq!(found, vec![local, programs]);
    }

    #[test]
    fn test_check_manual_path() {
        let temp_dir = TempDir::new().unwrap();

        assert_eq!(check_manual_path(""), Err("Path cannot be empty"));
        assert_eq!(check_manual_path("   "), Err("Path cannot be empty"));
        assert_eq!(
            check_manual_path(temp_dir.path().join("nope").to_str().unwrap()),
            Err("Path does not exist")
        );

        let input = format!("  {}  ", temp_dir.path().display());
        assert_eq!(check_manual_path(&input), Ok(temp_dir.path().to_path_buf()));
    }
}
