//! Run-directory layout, backups and scrub-runs cleanup.
//!
//! Grounded on `original_source/src/xeda/flow_runner/default_runner.py`:
//! `get_flow_run_path` (directory naming), `scrub_runs` (stale run
//! removal with confirmation) and `backup_existing` (from `xeda.utils`).
//! The atomic-rename idiom for the backup move is grounded on
//! `crates/xchecker-lock/src/lib.rs`'s `write_file_atomic`.

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::fs;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunPathError {
    #[error("io error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_err(path: &Utf8Path, source: std::io::Error) -> RunPathError {
    RunPathError::Io {
        path: path.to_owned(),
        source,
    }
}

/// Replace characters that are unsafe in a path component on common
/// filesystems. Mirrors the effect of Python's `pathvalidate.sanitize_filename`
/// as used by `get_flow_run_path` on the design-name subdirectory.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .trim_end_matches('.')
        .to_string()
}

/// Number of hex characters kept from a fingerprint when it is appended to
/// a run-directory name (spec §4.2, `DIR_NAME_HASH_LEN` in the original).
pub const DIR_NAME_HASH_LEN: usize = xeda_hash::DIR_SUFFIX_LEN;

/// Compute the run-path for a single flow invocation:
/// `<xeda_run_dir>/<design>[_<design_hash16>]/<flow>[_<flowrun_hash16>]`.
///
/// `design_hash` is only appended when caching is enabled and the run is
/// not incremental; `flowrun_hash` is appended whenever caching is
/// enabled, matching `get_flow_run_path`'s conditionals exactly.
pub fn flow_run_path(
    xeda_run_dir: &Utf8Path,
    design_name: &str,
    flow_name: &str,
    design_hash: Option<&str>,
    flowrun_hash: Option<&str>,
    cached_dependencies: bool,
    incremental: bool,
) -> Utf8PathBuf {
    let mut design_subdir = design_name.to_string();
    let mut flow_subdir = flow_name.to_string();
    if cached_dependencies {
        if let Some(h) = design_hash {
            if !incremental {
                design_subdir.push('_');
                design_subdir.push_str(&h[..DIR_NAME_HASH_LEN.min(h.len())]);
            }
        }
        if let Some(h) = flowrun_hash {
            flow_subdir.push('_');
            flow_subdir.push_str(&h[..DIR_NAME_HASH_LEN.min(h.len())]);
        }
    }
    xeda_run_dir
        .join(sanitize_filename(&design_subdir))
        .join(flow_subdir)
}

/// Move an existing run directory aside with a timestamped suffix instead
/// of deleting it. Grounded on `xeda.utils.backup_existing`.
pub fn backup_existing(path: &Utf8Path) -> Result<Option<Utf8PathBuf>, RunPathError> {
    if !path.exists() {
        return Ok(None);
    }
    let timestamp = chrono::Utc::now().format("%Y-%m-%d-%H%M%S");
    let mut backup = Utf8PathBuf::from(format!("{path}.backup_{timestamp}"));
    let mut n = 1u32;
    while backup.exists() {
        backup = Utf8PathBuf::from(format!("{path}.backup_{timestamp}_{n}"));
        n += 1;
    }
    fs::rename(path, &backup).map_err(|e| io_err(path, e))?;
    Ok(Some(backup))
}

/// A run directory eligible for removal by [`scrub_runs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrubCandidate {
    pub path: Utf8PathBuf,
}

/// Find sibling run directories for `flow_name` under `dir` that match the
/// `<flow_name>_<16 hex chars>` naming scheme, excluding any path in
/// `exclude` (normally the run path about to be (re)used). Pure discovery;
/// does not touch the filesystem.
///
/// Grounded on `scrub_runs`'s regex
/// `^{flow_name}_[a-z0-9]{DIR_NAME_HASH_LEN}$`.
pub fn find_scrub_candidates(
    flow_name: &str,
    dir: &Utf8Path,
    exclude: &[Utf8PathBuf],
) -> Result<Vec<ScrubCandidate>, RunPathError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let pattern = format!(
        "^{}_[a-z0-9]{{{}}}$",
        regex::escape(flow_name),
        DIR_NAME_HASH_LEN
    );
    let re = Regex::new(&pattern).expect("scrub pattern is always valid");

    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = Utf8PathBuf::from_path_buf(entry.path())
            .map_err(|p| io_err(dir, std::io::Error::other(format!("non-utf8 path {p:?}"))))?;
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name() else {
            continue;
        };
        if !re.is_match(name) {
            continue;
        }
        if exclude.iter().any(|ex| ex == &path) {
            continue;
        }
        candidates.push(ScrubCandidate { path });
    }
    candidates.sort();
    Ok(candidates)
}

/// Remove every candidate directory tree. Callers are expected to have
/// already confirmed removal (the CLI layer owns the interactive "type
/// 'yes'" prompt that `scrub_runs` performs inline; keeping confirmation
/// out of this crate keeps it usable non-interactively, e.g. from DSE
/// workers).
pub fn remove_candidates(candidates: &[ScrubCandidate]) -> Result<usize, RunPathError> {
    let mut removed = 0;
    for c in candidates {
        match fs::remove_dir_all(&c.path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(&c.path, e)),
        }
    }
    Ok(removed)
}

impl PartialOrd for ScrubCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScrubCandidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.path.cmp(&other.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_filename_replaces_unsafe_chars() {
        assert_eq!(sanitize_filename("a/b:c*d"), "a_b_c_d");
    }

    #[test]
    fn flow_run_path_appends_hashes_when_cached() {
        let dir = Utf8Path::new("/runs");
        let p = flow_run_path(
            dir,
            "mydesign",
            "vivado_synth",
            Some(&"a".repeat(64)),
            Some(&"b".repeat(64)),
            true,
            false,
        );
        assert_eq!(
            p,
            Utf8PathBuf::from(format!(
                "/runs/mydesign_{}/vivado_synth_{}",
                "a".repeat(16),
                "b".repeat(16)
            ))
        );
    }

    #[test]
    fn flow_run_path_skips_design_hash_when_incremental() {
        let dir = Utf8Path::new("/runs");
        let p = flow_run_path(
            dir,
            "mydesign",
            "vivado_synth",
            Some(&"a".repeat(64)),
            Some(&"b".repeat(64)),
            true,
            true,
        );
        assert_eq!(
            p,
            Utf8PathBuf::from(format!("/runs/mydesign/vivado_synth_{}", "b".repeat(16)))
        );
    }

    #[test]
    fn flow_run_path_omits_hashes_when_not_cached() {
        let dir = Utf8Path::new("/runs");
        let p = flow_run_path(
            dir,
            "mydesign",
            "vivado_synth",
            Some(&"a".repeat(64)),
            Some(&"b".repeat(64)),
            false,
            false,
        );
        assert_eq!(p, Utf8PathBuf::from("/runs/mydesign/vivado_synth"));
    }

    #[test]
    fn backup_existing_renames_aside() {
        let tmp = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        let target = base.join("vivado_synth_abc");
        fs::create_dir(&target).unwrap();
        let backup = backup_existing(&target).unwrap().unwrap();
        assert!(!target.exists());
        assert!(backup.exists());
        assert!(backup.as_str().contains("backup_"));
    }

    #[test]
    fn backup_existing_is_noop_when_missing() {
        let result = backup_existing(Utf8Path::new("/does/not/exist")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn find_scrub_candidates_matches_flow_hash_pattern_and_respects_exclude() {
        let tmp = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        let keep = base.join(format!("vivado_synth_{}", "a".repeat(16)));
        let stale = base.join(format!("vivado_synth_{}", "b".repeat(16)));
        let unrelated = base.join("vivado_synth");
        fs::create_dir(&keep).unwrap();
        fs::create_dir(&stale).unwrap();
        fs::create_dir(&unrelated).unwrap();

        let candidates =
            find_scrub_candidates("vivado_synth", &base, std::slice::from_ref(&keep)).unwrap();
        assert_eq!(candidates, vec![ScrubCandidate { path: stale }]);
    }

    #[test]
    fn remove_candidates_deletes_directory_trees() {
        let tmp = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        let stale = base.join("stale_dir");
        fs::create_dir(&stale).unwrap();
        fs::write(stale.join("results.json"), "{}").unwrap();

        let removed = remove_candidates(&[ScrubCandidate { path: stale.clone() }]).unwrap();
        assert_eq!(removed, 1);
        assert!(!stale.exists());
    }
}
