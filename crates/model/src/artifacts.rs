// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Fixed artifact filenames for the per-project working directory (§6 of
//! the design document). The source alternates between `_` and `-`
//! separators; this module is the single normative source of truth for
//! these names so every component composes them the same way rather than
//! re-deriving a templated scheme that would "fix" the inconsistency.

use std::path::PathBuf;

/// `<listsdir>/<YYYYMMDD>/<project>/`
#[must_use]
pub fn working_dir(listsdir: &std::path::Path, date: &str, project: &str) -> PathBuf {
    listsdir.join(date).join(project)
}

macro_rules! artifact_fn {
    ($name:ident, $suffix:literal) => {
        #[must_use]
        pub fn $name(project: &str) -> String {
            format!(concat!("{project}", $suffix), project = project)
        }
    };
}

artifact_fn!(local_media, "-local-media.gz");
artifact_fn!(local_media_sorted, "-local-media-sorted.gz");
artifact_fn!(uploads_sorted, "-uploads-sorted.gz");
artifact_fn!(foreignrepo_sorted, "-foreignrepo-sorted.gz");
artifact_fn!(all_media_keep, "-all-media-keep.gz");
artifact_fn!(all_media_delete, "-all-media-delete.gz");
artifact_fn!(all_media_gone, "-all-media-gone.gz");
artifact_fn!(new_media_projectuploads, "-new-media-projectuploads.gz");
artifact_fn!(new_media_foreignrepouploads, "-new-media-foreignrepouploads.gz");
artifact_fn!(uploaded_toget, "-uploaded-toget.gz");
artifact_fn!(foreignrepo_toget, "-foreignrepo-toget.gz");
artifact_fn!(local_retrieved, "_local_retrieved.gz");
artifact_fn!(local_get_failed, "_local_get_failed.gz");
artifact_fn!(foreignrepo_retrieved, "_foreignrepo_retrieved.gz");
artifact_fn!(foreignrepo_get_failed, "_foreignrepo_get_failed.gz");

/// `<project>-<date>-local-wikiqueries.gz`, the raw per-project uploads
/// inventory as downloaded from the remote listing server.
#[must_use]
pub fn raw_local_wikiqueries(project: &str, date: &str) -> String {
    format!("{project}-{date}-local-wikiqueries.gz")
}

/// `<project>-<date>-remote-wikiqueries.gz`, the raw per-project
/// foreign-repo-references inventory.
#[must_use]
pub fn raw_remote_wikiqueries(project: &str, date: &str) -> String {
    format!("{project}-{date}-remote-wikiqueries.gz")
}

/// The repository type a download journal entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoType {
    Local,
    Foreign,
}

impl RepoType {
    #[must_use]
    pub fn retrieved_artifact(self, project: &str) -> String {
        match self {
            Self::Local => local_retrieved(project),
            Self::Foreign => foreignrepo_retrieved(project),
        }
    }

    #[must_use]
    pub fn get_failed_artifact(self, project: &str) -> String {
        match self {
            Self::Local => local_get_failed(project),
            Self::Foreign => foreignrepo_get_failed(project),
        }
    }

    #[must_use]
    pub fn toget_artifact(self, project: &str) -> String {
        match self {
            Self::Local => uploaded_toget(project),
            Self::Foreign => foreignrepo_toget(project),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normative_names_use_mixed_separators_verbatim() {
        assert_eq!(local_media("enwiki"), "enwiki-local-media.gz");
        assert_eq!(local_retrieved("enwiki"), "enwiki_local_retrieved.gz");
        assert_eq!(all_media_keep("enwiki"), "enwiki-all-media-keep.gz");
    }
}
