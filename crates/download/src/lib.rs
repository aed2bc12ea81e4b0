// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

// Opt-in for allowed-by-default lints (in alphabetical order)
#![warn(future_incompatible)]
#![warn(let_underscore)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(unreachable_pub)]
#![warn(unsafe_code)]
#![warn(unused)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

//! The bounded, resumable downloader: walks a `*-toget.gz` candidate list,
//! fetches each filename into its content-addressed place in the media
//! tree, and journals the outcome exactly once per filename.
//!
//! A run-wide budget caps how many *new* attempts a single invocation makes
//! per repository type; entries beyond the cap are left for the next run.
//! A `404` is treated as an authoritative "gone", not a capacity problem,
//! and does not consume the budget.
//!
//! [`run`] is the normal entry point, building its skip-set from every
//! journaled filename. [`resume`] is the `--continue` entry point: it locates
//! the last journaled filename as a marker and scans the candidate list
//! forward to it instead, so resuming a large, mostly-finished list doesn't
//! require rebuilding a skip-set covering everything already done.

mod journal;

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use flate2::read::GzDecoder;
use mediasync_core::{
    artifacts::RepoType,
    filename::MediaFilename,
    hashpath::HashPath,
};
use mediasync_http::Fetcher;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;

use crate::journal::{already_journaled, last_entry, JournalWriter};

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Fetch(#[from] mediasync_http::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use super::{Budget, Error, Result, Summary};
}

/// RFC 3986 unreserved characters stay literal; everything else is
/// percent-encoded. Filenames routinely contain characters (spaces,
/// parentheses, non-ASCII scripts) that are not URL path-safe as-is.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'.')
    .remove(b'-')
    .remove(b'_')
    .remove(b'~');

/// Builds the remote URL for `filename` under `base_url`, inserting the
/// two-level content hash path derived from the filename's raw bytes.
#[must_use]
pub fn build_url(base_url: &str, filename: &str) -> String {
    let hash_path = HashPath::of_filename_bytes(filename.as_bytes());
    let encoded = utf8_percent_encode(filename, PATH_SEGMENT);
    format!(
        "{base_url}/{h1}/{h1h2}/{encoded}",
        h1 = hash_path.first_level(),
        h1h2 = hash_path.second_level(),
    )
}

/// The on-disk destination for `filename` under a media root.
#[must_use]
pub fn local_path(media_root: &Path, filename: &str) -> PathBuf {
    HashPath::of_filename_bytes(filename.as_bytes())
        .join_onto(media_root)
        .join(filename)
}

/// Caps how many new download attempts a single invocation makes. `404`
/// responses are authoritative and do not draw on the budget.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    pub cap: u32,
}

impl Budget {
    #[must_use]
    pub fn new(cap: u32) -> Self {
        Self { cap }
    }
}

/// Tally of what one invocation of [`run`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub retrieved: u32,
    pub failed: u32,
    pub skipped_already_done: u32,
    pub budget_exhausted_remaining: u32,
}

/// Walks `toget_path` (a sorted `*-toget.gz` candidate list) and fetches
/// each entry that: (1) passes the filename sanity gate, (2) was not
/// already journaled by a previous invocation for this run, and (3) still
/// fits within `budget`.
pub fn run(
    fetcher: &Fetcher,
    repo_type: RepoType,
    base_url: &str,
    toget_path: &Path,
    media_root: &Path,
    working_dir: &Path,
    project: &str,
    budget: Budget,
) -> Result<Summary> {
    let retrieved_path = working_dir.join(repo_type.retrieved_artifact(project));
    let failed_path = working_dir.join(repo_type.get_failed_artifact(project));

    let mut done = already_journaled(&retrieved_path)?;
    done.extend(already_journaled(&failed_path)?);

    let mut retrieved_journal = JournalWriter::open(&retrieved_path)?;
    let mut failed_journal = JournalWriter::open(&failed_path)?;

    let mut summary = Summary::default();
    let mut attempts = 0u32;

    let file = File::open(toget_path)?;
    let mut reader = BufReader::new(GzDecoder::new(file));
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let Some(filename) = line.split_whitespace().next() else {
            continue;
        };
        if done.contains(filename) {
            summary.skipped_already_done += 1;
            continue;
        }

        let media_filename = match MediaFilename::parse(filename) {
            Ok(media_filename) => media_filename,
            Err(err) => {
                log::warn!("skipping {filename}: failed sanity gate: {err}");
                continue;
            }
        };

        if attempts >= budget.cap {
            summary.budget_exhausted_remaining += 1;
            continue;
        }

        attempt_one(
            fetcher,
            base_url,
            media_root,
            filename,
            &media_filename,
            &mut retrieved_journal,
            &mut failed_journal,
            &mut summary,
            &mut attempts,
        )?;
        done.insert(filename.to_owned());
    }

    retrieved_journal.close()?;
    failed_journal.close()?;
    Ok(summary)
}

/// Resumes downloads for a project from where a prior, possibly-interrupted
/// invocation left off, without rebuilding a set of every filename already
/// journaled: the last entry recorded in `working_dir`'s retrieval journal
/// is the resume marker. `toget_path` is scanned forward until the marker is
/// matched, then fetching continues from the next candidate, appending to
/// the same journals. If the marker is absent (no prior retrieved entries
/// for this project) nothing is attempted: resuming never guesses where to
/// start.
pub fn resume(
    fetcher: &Fetcher,
    repo_type: RepoType,
    base_url: &str,
    toget_path: &Path,
    media_root: &Path,
    working_dir: &Path,
    project: &str,
    budget: Budget,
) -> Result<Summary> {
    let retrieved_path = working_dir.join(repo_type.retrieved_artifact(project));
    let failed_path = working_dir.join(repo_type.get_failed_artifact(project));

    let Some(marker) = last_entry(&retrieved_path)? else {
        log::info!("no prior retrieved entries for {project}, nothing to resume");
        return Ok(Summary::default());
    };

    let mut retrieved_journal = JournalWriter::open(&retrieved_path)?;
    let mut failed_journal = JournalWriter::open(&failed_path)?;

    let mut summary = Summary::default();
    let mut attempts = 0u32;
    let mut past_marker = false;

    let file = File::open(toget_path)?;
    let mut reader = BufReader::new(GzDecoder::new(file));
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let Some(filename) = line.split_whitespace().next() else {
            continue;
        };

        if !past_marker {
            if filename == marker {
                past_marker = true;
            }
            continue;
        }

        let media_filename = match MediaFilename::parse(filename) {
            Ok(media_filename) => media_filename,
            Err(err) => {
                log::warn!("skipping {filename}: failed sanity gate: {err}");
                continue;
            }
        };

        if attempts >= budget.cap {
            summary.budget_exhausted_remaining += 1;
            continue;
        }

        attempt_one(
            fetcher,
            base_url,
            media_root,
            filename,
            &media_filename,
            &mut retrieved_journal,
            &mut failed_journal,
            &mut summary,
            &mut attempts,
        )?;
    }

    retrieved_journal.close()?;
    failed_journal.close()?;
    Ok(summary)
}

#[allow(clippy::too_many_arguments)]
fn attempt_one(
    fetcher: &Fetcher,
    base_url: &str,
    media_root: &Path,
    filename: &str,
    media_filename: &MediaFilename,
    retrieved_journal: &mut JournalWriter,
    failed_journal: &mut JournalWriter,
    summary: &mut Summary,
    attempts: &mut u32,
) -> Result<()> {
    let url = build_url(base_url, media_filename.as_str());
    let dest = local_path(media_root, media_filename.as_str());
    match fetcher.get_file(&url, &dest, true) {
        Ok(Some(status)) if status.is_success() => {
            retrieved_journal.record(&format!("{filename} {status}", status = status.as_u16()))?;
            summary.retrieved += 1;
            *attempts += 1;
        }
        Ok(status) => {
            let code = status.map(|s| s.as_u16());
            if code == Some(404) {
                // Authoritative "gone": does not consume the budget.
                failed_journal.record(&format!("{filename} 404"))?;
            } else {
                failed_journal.record(&format!(
                    "{filename} {status}",
                    status = code.map_or_else(|| "none".to_owned(), |c| c.to_string())
                ))?;
                *attempts += 1;
            }
            summary.failed += 1;
        }
        Err(err) => {
            log::warn!("download of {filename} failed: {err}");
            failed_journal.record(&format!("{filename} error"))?;
            summary.failed += 1;
            *attempts += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_inserts_hash_path_and_percent_encodes() {
        let url = build_url("https://example.org/media", "a b.jpg");
        let hash_path = HashPath::of_filename_bytes(b"a b.jpg");
        assert!(url.starts_with("https://example.org/media/"));
        assert!(url.contains(&format!("/{}/{}/", hash_path.first_level(), hash_path.second_level())));
        assert!(url.ends_with("a%20b.jpg"));
    }

    #[test]
    fn local_path_matches_hash_path_join() {
        let root = Path::new("/srv/media");
        let path = local_path(root, "cat.jpg");
        let hash_path = HashPath::of_filename_bytes(b"cat.jpg");
        assert_eq!(path, hash_path.join_onto(root).join("cat.jpg"));
    }

    #[test]
    fn resume_with_no_prior_retrieved_entries_attempts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new("test-agent", mediasync_http::RetryPolicy::new(1, std::time::Duration::from_secs(0))).unwrap();
        let toget = dir.path().join("project-uploaded-toget.gz");
        let summary = resume(
            &fetcher,
            RepoType::Local,
            "https://example.org/media",
            &toget,
            dir.path(),
            dir.path(),
            "enwiki",
            Budget::new(10),
        )
        .unwrap();
        assert_eq!(summary, Summary::default());
    }
}
