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

//! The `MostRecentIndex`: for every project and every artifact suffix, the
//! most recent date (excluding today's, by default) on which that artifact
//! was produced. Drives the full-vs-incremental mode decision and locates
//! prior-run artifacts for incremental reconciliation and resume.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
};

use mediasync_core::{artifacts, project::ProjectName};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use super::{Error, MostRecentIndex, Result, RunMode};
}

/// `project -> date -> set of suffixed artifact names` (the filename with
/// the project name prefix stripped off).
#[derive(Debug, Clone, Default)]
pub struct MostRecentIndex {
    by_project: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
}

impl MostRecentIndex {
    /// Scans `listsdir` and builds the index, excluding `today` unless
    /// `include_today` is set. Never mutates `listsdir`; a fresh scan
    /// reflects exactly what is on disk at the moment it is called.
    pub fn build(listsdir: &Path, today: &str, include_today: bool) -> Result<Self> {
        let mut by_project: BTreeMap<String, BTreeMap<String, BTreeSet<String>>> = BTreeMap::new();

        if !listsdir.is_dir() {
            return Ok(Self { by_project });
        }

        for date_entry in fs::read_dir(listsdir)? {
            let date_entry = date_entry?;
            let Some(date) = date_entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            if !include_today && date == today {
                continue;
            }
            if !date_entry.file_type()?.is_dir() {
                continue;
            }

            for project_entry in fs::read_dir(date_entry.path())? {
                let project_entry = project_entry?;
                let Some(project) = project_entry.file_name().to_str().map(str::to_owned) else {
                    continue;
                };
                if !project_entry.file_type()?.is_dir() {
                    continue;
                }

                let mut suffixes = BTreeSet::new();
                for file_entry in fs::read_dir(project_entry.path())? {
                    let file_entry = file_entry?;
                    let Some(filename) = file_entry.file_name().to_str().map(str::to_owned) else {
                        continue;
                    };
                    if let Some(suffix) = filename.strip_prefix(&project) {
                        suffixes.insert(suffix.to_owned());
                    }
                }
                by_project
                    .entry(project)
                    .or_default()
                    .insert(date.clone(), suffixes);
            }
        }

        Ok(Self { by_project })
    }

    /// The most recent date on which `project` produced an artifact with
    /// exactly this `suffix` (e.g. `-all-media-keep.gz`), or `None`.
    #[must_use]
    pub fn most_recent_date_for(&self, project: &ProjectName, suffix: &str) -> Option<&str> {
        let dates = self.by_project.get(project.as_str())?;
        dates
            .iter()
            .rev()
            .find(|(_, suffixes)| suffixes.contains(suffix))
            .map(|(date, _)| date.as_str())
    }

    #[must_use]
    pub fn has_prior_keep_artifact(&self, project: &ProjectName) -> bool {
        self.most_recent_date_for(project, &artifacts::all_media_keep(""))
            .is_some()
    }
}

/// Full vs. incremental reconciliation mode for one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Full,
    Incremental,
}

impl RunMode {
    /// Decides the run mode for `project`:
    /// forced full > no prior keep-artifact > incremental.
    #[must_use]
    pub fn decide(project: &ProjectName, index: &MostRecentIndex, force_full: bool) -> Self {
        if force_full || !index.has_prior_keep_artifact(project) {
            Self::Full
        } else {
            Self::Incremental
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, date: &str, project: &str, suffix: &str) {
        let project_dir = dir.join(date).join(project);
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(project_dir.join(format!("{project}{suffix}")), b"").unwrap();
    }

    #[test]
    fn excludes_today_by_default() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "20200101", "enwiki", "-all-media-keep.gz");
        touch(dir.path(), "20200202", "enwiki", "-all-media-keep.gz");
        let index = MostRecentIndex::build(dir.path(), "20200202", false).unwrap();
        let project = ProjectName::new("enwiki");
        assert_eq!(
            index.most_recent_date_for(&project, "-all-media-keep.gz"),
            Some("20200101")
        );
    }

    #[test]
    fn mode_is_full_without_prior_keep_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let index = MostRecentIndex::build(dir.path(), "20200202", false).unwrap();
        let project = ProjectName::new("enwiki");
        assert_eq!(RunMode::decide(&project, &index, false), RunMode::Full);
    }

    #[test]
    fn mode_is_incremental_with_prior_keep_artifact() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "20200101", "enwiki", "-all-media-keep.gz");
        let index = MostRecentIndex::build(dir.path(), "20200202", false).unwrap();
        let project = ProjectName::new("enwiki");
        assert_eq!(RunMode::decide(&project, &index, false), RunMode::Incremental);
    }

    #[test]
    fn force_full_overrides_prior_artifact() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "20200101", "enwiki", "-all-media-keep.gz");
        let index = MostRecentIndex::build(dir.path(), "20200202", false).unwrap();
        let project = ProjectName::new("enwiki");
        assert_eq!(RunMode::decide(&project, &index, true), RunMode::Full);
    }
}
