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

//! Configuration loading and validation.
//!
//! Grounded on the desktop-app settings pattern (a `serde`-derived struct
//! persisted as `ron`), but unlike that pattern a missing or malformed file
//! is always fatal here: there is no sensible default media root to fall
//! back to.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const FILE_SUFFIX: &str = "ron";

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ron::de::SpannedError,
    },

    #[error("configuration directory does not exist or is not a directory: {0}")]
    DirectoryInvalid(String),

    #[error("configuration URL is not an absolute URL ({field}): {value}")]
    UrlInvalid { field: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use super::{Config, Error, Result};
}

/// Directory paths. All three must already exist; this engine never
/// bootstraps the top-level roots, only the per-project hash-dir skeleton
/// underneath `media_root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directories {
    pub media_root: std::path::PathBuf,
    pub archive_root: std::path::PathBuf,
    pub lists_root: std::path::PathBuf,
}

/// Remote endpoints. All four must parse as absolute URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Urls {
    pub site_matrix_api: Url,
    pub inventory_listing_index: Url,
    pub uploaded_media_base: Url,
    pub foreignrepo_media_base: Url,
}

/// Retry counts and per-run download caps. All non-negative by construction
/// (the fields are unsigned).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    pub http_retries: u32,
    pub http_wait_secs: u64,
    pub uploaded_download_cap: u32,
    pub foreignrepo_download_cap: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Misc {
    pub foreignrepo_dbname: String,
    pub user_agent: String,
    pub api_path_suffix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub directories: Directories,
    pub urls: Urls,
    pub limits: Limits,
    pub misc: Misc,
}

impl Config {
    /// Loads and validates a configuration file. A missing or malformed file
    /// is always an error: there is no usable default.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| Error::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = ron::de::from_bytes(&bytes).map_err(|source| Error::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        log::info!("Loaded configuration from {path}", path = path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for dir in [
            &self.directories.media_root,
            &self.directories.archive_root,
            &self.directories.lists_root,
        ] {
            if !dir.is_dir() {
                return Err(Error::DirectoryInvalid(dir.display().to_string()));
            }
        }
        for (field, url) in [
            ("site_matrix_api", &self.urls.site_matrix_api),
            ("inventory_listing_index", &self.urls.inventory_listing_index),
            ("uploaded_media_base", &self.urls.uploaded_media_base),
            ("foreignrepo_media_base", &self.urls.foreignrepo_media_base),
        ] {
            if url.cannot_be_a_base() {
                return Err(Error::UrlInvalid {
                    field,
                    value: url.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ron(media_root: &Path, archive_root: &Path, lists_root: &Path) -> String {
        format!(
            r#"(
    directories: (
        media_root: {media_root:?},
        archive_root: {archive_root:?},
        lists_root: {lists_root:?},
    ),
    urls: (
        site_matrix_api: "https://meta.wikimedia.org/w/api.php",
        inventory_listing_index: "https://dumps.wikimedia.org/other/media/",
        uploaded_media_base: "https://upload.wikimedia.org",
        foreignrepo_media_base: "https://upload.wikimedia.org/wikipedia/commons",
    ),
    limits: (
        http_retries: 3,
        http_wait_secs: 5,
        uploaded_download_cap: 1000,
        foreignrepo_download_cap: 1000,
    ),
    misc: (
        foreignrepo_dbname: "commonswiki",
        user_agent: "mediasync/0.1",
        api_path_suffix: "/w/api.php",
    ),
)"#,
            media_root = media_root.display().to_string(),
            archive_root = archive_root.display().to_string(),
            lists_root = lists_root.display().to_string(),
        )
    }

    #[test]
    fn load_validates_directories_exist() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.ron");
        fs::write(&config_path, sample_ron(dir.path(), dir.path(), dir.path())).unwrap();
        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.misc.foreignrepo_dbname, "commonswiki");
    }

    #[test]
    fn load_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.ron");
        let missing = dir.path().join("does-not-exist");
        fs::write(&config_path, sample_ron(&missing, dir.path(), dir.path())).unwrap();
        assert!(matches!(
            Config::load(&config_path),
            Err(Error::DirectoryInvalid(_))
        ));
    }

    #[test]
    fn load_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.ron");
        assert!(matches!(Config::load(&missing), Err(Error::Read { .. })));
    }
}
