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

//! The media hash-dir skeleton and the archive-on-delete discipline: media
//! this engine decides to delete is moved aside, never unlinked, and a
//! retired project's whole tree is moved to a dated archive directory
//! rather than removed.

use std::{
    fs::{self, File},
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use flate2::read::GzDecoder;
use mediasync_core::{hashpath::HashPath, timestamp::ArchiveTimestamp};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("archive destination already exists (same-second collision): {0}")]
    ArchiveCollision(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use super::{ArchiveMover, Error, MediaTree, Result};
}

/// Bootstraps the 256-subdirectory hash skeleton under a project's media
/// directory, so later downloads only ever need to create the leaf file.
pub struct MediaTree;

impl MediaTree {
    pub fn bootstrap(project_media_dir: &Path) -> Result<()> {
        for (first, first_two) in HashPath::all_hash_subdirs() {
            fs::create_dir_all(project_media_dir.join(first).join(first_two))?;
        }
        Ok(())
    }

    /// A project's media directory is empty iff none of its 256 fixed hash
    /// subdirectories contains an entry. This checks exactly those 256
    /// directories rather than a full recursive walk, since the hash-dir
    /// skeleton is the only place files are ever placed.
    pub fn project_is_empty(project_media_dir: &Path) -> Result<bool> {
        for (first, first_two) in HashPath::all_hash_subdirs() {
            let subdir = project_media_dir.join(first).join(first_two);
            if !subdir.is_dir() {
                continue;
            }
            if fs::read_dir(subdir)?.next().is_some() {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Tally of one [`ArchiveMover::delete_by_list`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    pub archived: u32,
    pub already_absent: u32,
}

pub struct ArchiveMover;

impl ArchiveMover {
    /// Moves every filename named in `all_media_delete` from the project's
    /// media directory into the mirrored location under
    /// `<archive_root>/deleted/<projecttype>/<langcode>`, preserving the
    /// hash-dir shape. A filename already absent (a prior run was
    /// interrupted after archiving but before journaling, or the file was
    /// already cleaned up by hand) is not an error: deletes are idempotent.
    pub fn delete_by_list(
        media_root: &Path,
        archive_root: &Path,
        projecttype: &str,
        langcode: &str,
        all_media_delete: &Path,
    ) -> Result<DeleteSummary> {
        let project_media_dir = media_root.join(projecttype).join(langcode);
        let project_archive_dir = archive_root.join("deleted").join(projecttype).join(langcode);
        let mut summary = DeleteSummary::default();

        let file = File::open(all_media_delete)?;
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
            let hash_path = HashPath::of_filename_bytes(filename.as_bytes());
            let source = hash_path.join_onto(&project_media_dir).join(filename);
            if !source.exists() {
                summary.already_absent += 1;
                continue;
            }
            let dest_dir = hash_path.join_onto(&project_archive_dir);
            fs::create_dir_all(&dest_dir)?;
            fs::rename(&source, dest_dir.join(filename))?;
            summary.archived += 1;
        }
        Ok(summary)
    }

    /// Moves a retired project's entire media directory to
    /// `<archive_root>/<projecttype>/<langcode>.<YYYYMMDDHHMMSS>`. Fails
    /// loudly rather than retrying or disambiguating if that destination
    /// already exists: two retirements of the same project within the same
    /// second is treated as a condition worth stopping for, not papering
    /// over.
    pub fn archive_retired_project(
        media_root: &Path,
        archive_root: &Path,
        projecttype: &str,
        langcode: &str,
        timestamp: &ArchiveTimestamp,
    ) -> Result<PathBuf> {
        let source = media_root.join(projecttype).join(langcode);
        let dest = archive_root.join(projecttype).join(format!("{langcode}.{timestamp}"));
        if dest.exists() {
            return Err(Error::ArchiveCollision(dest.display().to_string()));
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&source, &dest)?;
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write as _;

    fn gz_file(path: &Path, text: &str) {
        let file = File::create(path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap();
    }

    #[test]
    fn bootstrap_creates_all_256_subdirs() {
        let dir = tempfile::tempdir().unwrap();
        MediaTree::bootstrap(dir.path()).unwrap();
        assert!(dir.path().join("0").join("00").is_dir());
        assert!(dir.path().join("f").join("ff").is_dir());
    }

    #[test]
    fn fresh_tree_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        MediaTree::bootstrap(dir.path()).unwrap();
        assert!(MediaTree::project_is_empty(dir.path()).unwrap());
    }

    #[test]
    fn tree_with_a_file_is_not_empty() {
        let dir = tempfile::tempdir().unwrap();
        MediaTree::bootstrap(dir.path()).unwrap();
        let hash_path = HashPath::of_filename_bytes(b"cat.jpg");
        fs::write(hash_path.join_onto(dir.path()).join("cat.jpg"), b"x").unwrap();
        assert!(!MediaTree::project_is_empty(dir.path()).unwrap());
    }

    #[test]
    fn delete_by_list_moves_files_into_archive_and_is_idempotent_on_absentees() {
        let root = tempfile::tempdir().unwrap();
        let media_root = root.path().join("media");
        let archive_root = root.path().join("archive");
        let project_media_dir = media_root.join("wikipedia").join("en");
        MediaTree::bootstrap(&project_media_dir).unwrap();

        let hash_path = HashPath::of_filename_bytes(b"cat.jpg");
        let source = hash_path.join_onto(&project_media_dir).join("cat.jpg");
        fs::write(&source, b"meow").unwrap();

        let delete_list = root.path().join("delete.gz");
        gz_file(&delete_list, "cat.jpg 1\ndog.png 1\n");

        let summary =
            ArchiveMover::delete_by_list(&media_root, &archive_root, "wikipedia", "en", &delete_list).unwrap();
        assert_eq!(summary.archived, 1);
        assert_eq!(summary.already_absent, 1);
        assert!(!source.exists());
        let archived = hash_path
            .join_onto(&archive_root.join("deleted").join("wikipedia").join("en"))
            .join("cat.jpg");
        assert_eq!(fs::read(archived).unwrap(), b"meow");
    }

    #[test]
    fn archive_retired_project_moves_whole_tree() {
        let root = tempfile::tempdir().unwrap();
        let media_root = root.path().join("media");
        let archive_root = root.path().join("archive");
        let project_dir = media_root.join("wikipedia").join("oldwiki");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(project_dir.join("marker"), b"x").unwrap();

        let timestamp = ArchiveTimestamp::now_utc();
        let dest = ArchiveMover::archive_retired_project(&media_root, &archive_root, "wikipedia", "oldwiki", &timestamp)
            .unwrap();
        assert!(!project_dir.exists());
        assert!(dest.join("marker").exists());
    }

    #[test]
    fn archive_retired_project_fails_loudly_on_collision() {
        let root = tempfile::tempdir().unwrap();
        let media_root = root.path().join("media");
        let archive_root = root.path().join("archive");
        fs::create_dir_all(media_root.join("wikipedia").join("oldwiki")).unwrap();

        let timestamp = ArchiveTimestamp::now_utc();
        fs::create_dir_all(archive_root.join("wikipedia").join(format!("oldwiki.{timestamp}"))).unwrap();

        let result =
            ArchiveMover::archive_retired_project(&media_root, &archive_root, "wikipedia", "oldwiki", &timestamp);
        assert!(matches!(result, Err(Error::ArchiveCollision(_))));
    }
}
