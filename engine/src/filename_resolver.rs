//! Computes the local filename for an incoming file transfer, including
//! `~`/`%h` expansion and collision handling (spec §4.1), grounded on the
//! teacher's collision-avoidant ongoing-transfer bookkeeping
//! (`model/src/responses/ongoing_transfer.rs`, consulted from
//! `transfer.rs::update_ongoing_transfer`), generalized to the resume/
//! rename decision tree spec §4.1 and §4.1.1 spell out.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Outcome of resolving a candidate local path against the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub local_filename: PathBuf,
    /// Set when the candidate is resumable: the existing on-disk size to
    /// continue from.
    pub resume_from: Option<u64>,
}

/// Expands `~` to `$HOME`, then `%h` to `app_data_dir`, in that order
/// (SPEC_FULL §6, matching `irc-dcc.c`'s `dcc_redirect_resume`/
/// `dcc_file_is_resumable` substitution order exactly — only a bare
/// leading `~`, no `~user` forms).
pub fn expand_path(raw: &str, app_data_dir: &str) -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_default();
    let expanded = if let Some(rest) = raw.strip_prefix('~') {
        format!("{home}{rest}")
    } else {
        raw.to_string()
    };
    PathBuf::from(expanded.replace("%h", app_data_dir))
}

/// A local path is resumable iff `auto_resume` is set, the file is
/// writable, and its on-disk size is strictly less than `offered_size`
/// (spec §4.1.1). File size is compared as `u64` throughout (Design Note
/// §9 bug #3: the original's `unsigned long` comparison silently
/// truncates on 32-bit builds for files over 4 GiB).
fn resume_eligible(path: &Path, offered_size: u64, auto_resume: bool) -> Option<u64> {
    if !auto_resume {
        return None;
    }
    let metadata = std::fs::metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }
    if OpenOptions::new().append(true).open(path).is_err() {
        return None;
    }
    let existing: u64 = metadata.len();
    (existing < offered_size).then_some(existing)
}

/// Resolves the local filename for an incoming `filename` from
/// `remote_nick`, against `download_path` (spec §4.1 steps 1-6).
pub fn resolve(
    download_path: &Path,
    app_data_dir: &str,
    remote_nick: &str,
    filename: &str,
    offered_size: u64,
    auto_resume: bool,
    auto_rename: bool,
) -> Option<Resolution> {
    let download_path = expand_path(&download_path.to_string_lossy(), app_data_dir);
    let candidate = download_path.join(format!("{remote_nick}.{filename}"));

    if !candidate.exists() {
        return Some(Resolution {
            local_filename: candidate,
            resume_from: None,
        });
    }

    if let Some(existing) = resume_eligible(&candidate, offered_size, auto_resume) {
        return Some(Resolution {
            local_filename: candidate,
            resume_from: Some(existing),
        });
    }

    if !auto_rename {
        return None;
    }

    let mut suffix: u32 = 1;
    loop {
        let renamed = append_suffix(&candidate, suffix);
        if !renamed.exists() {
            return Some(Resolution {
                local_filename: renamed,
                resume_from: None,
            });
        }
        if let Some(existing) = resume_eligible(&renamed, offered_size, auto_resume) {
            return Some(Resolution {
                local_filename: renamed,
                resume_from: Some(existing),
            });
        }
        suffix += 1;
    }
}

fn append_suffix(path: &Path, suffix: u32) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{suffix}"));
    PathBuf::from(name)
}
