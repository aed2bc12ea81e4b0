// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Walks a project's local media subtree and emits the sorted local
//! inventory consumed by the reconciler.

use std::{
    fs::{self, File},
    io::Write as _,
    path::Path,
};

use flate2::{write::GzEncoder, Compression};
use mediasync_core::{artifacts, project::ProjectName, timestamp::RecordTimestamp};
use walkdir::WalkDir;

use crate::{sort::external_sort_gzip, Error, Result};

/// Writes `<project>-local-media.gz`: one line per regular file under
/// `project_media_dir`, each `<filename> <14-digit-mtime> <directory>`.
///
/// Skips projects whose name contains a slash (retired), matching
/// `LocalFiles.record_local_media_for_project`'s `is_active` guard.
pub fn record(
    project: &ProjectName,
    project_media_dir: &Path,
    listsdir: &Path,
    today: &str,
) -> Result<()> {
    if !project.is_active() {
        log::debug!("skipping local media list for {project}: not active");
        return Ok(());
    }

    let working_dir = artifacts::working_dir(listsdir, today, project.as_str());
    fs::create_dir_all(&working_dir)?;
    let output_path = working_dir.join(artifacts::local_media(project.as_str()));
    let file = File::create(&output_path)?;
    let mut encoder = GzEncoder::new(file, Compression::default());

    for entry in WalkDir::new(project_media_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(std::result::Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let metadata = entry.metadata()?;
        let mtime = metadata.modified()?;
        let timestamp = RecordTimestamp::from_mtime(mtime);
        let filename = entry.file_name().to_string_lossy();
        let Some(dirname) = entry.path().parent() else {
            continue;
        };
        writeln!(
            encoder,
            "{filename} {timestamp} {dirname}",
            dirname = dirname.display()
        )?;
    }
    encoder.finish()?;
    Ok(())
}

/// Sorts `<project>-local-media.gz` into `<project>-local-media-sorted.gz`
/// under `LC_ALL=C` byte order on the filename field.
pub fn sort(project: &ProjectName, listsdir: &Path, today: &str) -> Result<()> {
    if !project.is_active() {
        return Ok(());
    }
    let working_dir = artifacts::working_dir(listsdir, today, project.as_str());
    let input_path = working_dir.join(artifacts::local_media(project.as_str()));
    if !input_path.exists() {
        log::warn!("no local media list to sort for {project} at {}", input_path.display());
        return Err(Error::ArtifactMissing(input_path.display().to_string()));
    }
    let output_path = working_dir.join(artifacts::local_media_sorted(project.as_str()));
    let input = File::open(&input_path)?;
    let output = File::create(&output_path)?;
    external_sort_gzip(input, output, false)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read as _;

    #[test]
    fn record_and_sort_round_trip() {
        let media_dir = tempfile::tempdir().unwrap();
        fs::write(media_dir.path().join("b.jpg"), b"x").unwrap();
        fs::write(media_dir.path().join("a.jpg"), b"x").unwrap();

        let lists_dir = tempfile::tempdir().unwrap();
        let project = ProjectName::new("enwiki");
        record(&project, media_dir.path(), lists_dir.path(), "20200101").unwrap();
        sort(&project, lists_dir.path(), "20200101").unwrap();

        let sorted_path = artifacts::working_dir(lists_dir.path(), "20200101", "enwiki")
            .join(artifacts::local_media_sorted("enwiki"));
        let mut decoder = flate2::read::GzDecoder::new(File::open(sorted_path).unwrap());
        let mut contents = String::new();
        decoder.read_to_string(&mut contents).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("a.jpg"));
        assert!(lines[1].starts_with("b.jpg"));
    }

    #[test]
    fn retired_project_is_skipped() {
        let media_dir = tempfile::tempdir().unwrap();
        let lists_dir = tempfile::tempdir().unwrap();
        let project = ProjectName::new("wikipedia/tlh");
        record(&project, media_dir.path(), lists_dir.path(), "20200101").unwrap();
        assert!(!artifacts::working_dir(lists_dir.path(), "20200101", "wikipedia/tlh").exists());
    }
}
