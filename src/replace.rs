//! URL rewriting across an installation's bundled files.
//!
//! Two file sets are collected below the root:
//! - code files (`.js`, `.tsx`) receive every rule
//! - other files (`.json`, `.html`, `.css`, `.ts`) receive only the
//!   full-URL rule
//!
//! `node_modules` is never entered. Each file is read once, rewritten in
//! memory rule by rule, and written back only if something matched.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Domain being replaced
pub const SOURCE_DOMAIN: &str = "huggingface.co";
/// Domain written in its place
pub const MIRROR_DOMAIN: &str = "hf-mirror.com";

const SCHEME: &str = "https://";
const CODE_EXTENSIONS: &[&str] = &["js", "tsx"];
const OTHER_EXTENSIONS: &[&str] = &["json", "html", "css", "ts"];
const EXCLUDED_DIRS: &[&str] = &["node_modules"];

/// Which extension set a file was collected from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Code,
    Other,
}

/// Which files a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    AllFiles,
    CodeFiles,
}

impl Scope {
    fn covers(self, kind: FileKind) -> bool {
        match self {
            Self::AllFiles => true,
            Self::CodeFiles => kind == FileKind::Code,
        }
    }
}

/// A single find/replace rule. `replacement` may use `$1`-style group refs.
#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: Regex,
    pub replacement: String,
    pub scope: Scope,
}

impl Rule {
    fn new(pattern: &str, replacement: String, scope: Scope) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)
                .with_context(|| format!("Invalid replacement pattern: {}", pattern))?,
            replacement,
            scope,
        })
    }

    /// Apply the rule to `text`, returning the number of matches replaced
    fn apply(&self, text: &mut String) -> usize {
        let count = self.pattern.find_iter(text.as_str()).count();
        if count > 0 {
            *text = self
                .pattern
                .replace_all(text.as_str(), self.replacement.as_str())
                .into_owned();
        }
        count
    }
}

/// Build the rule list that moves `source` URLs over to `mirror`.
///
/// Order matters: rules are applied in sequence to the same buffer.
///
/// The protocol-relative rule only looks at the single character before
/// `//`, which must not be one of `h`, `t`, `p`, `s` or `:`. That skips
/// `https://` (already covered by the first rule) but also `http://` and
/// `wss://`, and it can never match at offset 0.
pub fn mirror_rules(source: &str, mirror: &str) -> Result<Vec<Rule>> {
    let src = regex::escape(source);

    Ok(vec![
        Rule::new(
            &regex::escape(&format!("{}{}", SCHEME, source)),
            format!("{}{}", SCHEME, mirror),
            Scope::AllFiles,
        )?,
        Rule::new(
            &format!(r#"(['"]){}(['"])"#, src),
            format!("${{1}}{}${{2}}", mirror),
            Scope::CodeFiles,
        )?,
        Rule::new(
            &format!(r"([^:hpst])//{}", src),
            format!("${{1}}//{}", mirror),
            Scope::CodeFiles,
        )?,
        Rule::new(
            &format!(r"{}/", src),
            format!("{}/", mirror),
            Scope::CodeFiles,
        )?,
    ])
}

/// Files found below a root, split by kind
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileSets {
    pub code: Vec<PathBuf>,
    pub other: Vec<PathBuf>,
}

impl FileSets {
    pub fn is_empty(&self) -> bool {
        self.code.is_empty() && self.other.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = (&PathBuf, FileKind)> {
        self.code
            .iter()
            .map(|p| (p, FileKind::Code))
            .chain(self.other.iter().map(|p| (p, FileKind::Other)))
    }
}

/// Replacement counts for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileResult {
    /// Relative to the scanned root
    pub path: PathBuf,
    pub kind: FileKind,
    /// Matches of the full-URL rule
    pub url_replacements: usize,
    /// Matches of the code-only domain rules
    pub domain_replacements: usize,
}

impl FileResult {
    pub fn total(&self) -> usize {
        self.url_replacements + self.domain_replacements
    }

    pub fn changed(&self) -> bool {
        self.total() > 0
    }
}

/// Outcome of one replacement run
#[derive(Debug, Default, Clone, Serialize)]
pub struct ReplacementReport {
    /// Number of code files scanned
    pub code_files: usize,
    /// Number of other files scanned
    pub other_files: usize,
    /// Files that changed
    pub files: Vec<FileResult>,
    /// Files skipped because they are not valid UTF-8
    pub skipped: Vec<PathBuf>,
}

impl ReplacementReport {
    pub fn is_empty_scan(&self) -> bool {
        self.code_files == 0 && self.other_files == 0
    }

    pub fn total(&self) -> usize {
        self.files.iter().map(FileResult::total).sum()
    }

    pub fn code_total(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.kind == FileKind::Code)
            .map(FileResult::total)
            .sum()
    }

    pub fn changed(&self) -> bool {
        self.total() > 0
    }
}

/// Scans an installation and applies the mirror rules
#[derive(Debug, Clone)]
pub struct ReplacementEngine {
    rules: Vec<Rule>,
}

impl ReplacementEngine {
    /// Engine for the default `huggingface.co` -> `hf-mirror.com` rewrite
    pub fn new() -> Result<Self> {
        Self::with_domains(SOURCE_DOMAIN, MIRROR_DOMAIN)
    }

    pub fn with_domains(source: &str, mirror: &str) -> Result<Self> {
        Ok(Self {
            rules: mirror_rules(source, mirror)?,
        })
    }

    /// Collect code and other files below `root`
    pub fn scan(&self, root: &Path) -> Result<FileSets> {
        let mut sets = FileSets::default();

        let walker = WalkDir::new(root).follow_links(false).into_iter();
        for entry in walker.filter_entry(|e| e.depth() == 0 || !is_skipped_entry(e)) {
            let entry = entry.with_context(|| format!("Failed to scan {}", root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let extension = entry.path().extension().and_then(|e| e.to_str());
            match extension {
                Some(ext) if CODE_EXTENSIONS.contains(&ext) => sets.code.push(entry.into_path()),
                Some(ext) if OTHER_EXTENSIONS.contains(&ext) => sets.other.push(entry.into_path()),
                _ => {}
            }
        }

        sets.code.sort();
        sets.other.sort();
        tracing::debug!(
            root = %root.display(),
            code = sets.code.len(),
            other = sets.other.len(),
            "scan complete"
        );
        Ok(sets)
    }

    /// Rewrite a single file in place.
    ///
    /// Returns `None` when the file is not valid UTF-8 and was left alone.
    pub fn apply_to_file(&self, path: &Path, kind: FileKind) -> Result<Option<(usize, usize)>> {
        let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let Ok(mut text) = String::from_utf8(bytes) else {
            tracing::warn!(path = %path.display(), "skipping file that is not valid UTF-8");
            return Ok(None);
        };

        let mut url_replacements = 0;
        let mut domain_replacements = 0;
        for rule in self.rules.iter().filter(|r| r.scope.covers(kind)) {
            let count = rule.apply(&mut text);
            match rule.scope {
                Scope::AllFiles => url_replacements += count,
                Scope::CodeFiles => domain_replacements += count,
            }
        }

        if url_replacements + domain_replacements > 0 {
            fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::debug!(
                path = %path.display(),
                url_replacements,
                domain_replacements,
                "rewrote file"
            );
        }

        Ok(Some((url_replacements, domain_replacements)))
    }

    /// Scan `root` and rewrite every matching file.
    ///
    /// An empty scan is not an error; check [`ReplacementReport::is_empty_scan`].
    pub fn run(&self, root: &Path) -> Result<ReplacementReport> {
        let sets = self.scan(root)?;
        self.run_on(root, &sets)
    }

    /// Rewrite an already scanned file set
    pub fn run_on(&self, root: &Path, sets: &FileSets) -> Result<ReplacementReport> {
        let mut report = ReplacementReport {
            code_files: sets.code.len(),
            other_files: sets.other.len(),
            ..Default::default()
        };

        for (path, kind) in sets.iter() {
            let rel_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            match self.apply_to_file(path, kind)? {
                None => report.skipped.push(rel_path),
                Some((url_replacements, domain_replacements)) => {
                    let result = FileResult {
                        path: rel_path,
                        kind,
                        url_replacements,
                        domain_replacements,
                    };
                    if result.changed() {
                        report.files.push(result);
                    }
                }
            }
        }

        Ok(report)
    }
}

fn is_skipped_entry(entry: &DirEntry) -> bool {
    let Some(name) = entry.file_name().to_str() else {
        return false;
    };

    if name.starts_with('.') {
        return true;
    }

    entry.file_type().is_dir() && EXCLUDED_DIRS.contains(&name)
}
