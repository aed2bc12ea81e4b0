// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Sanity gate for candidate media filenames, shared by the downloader and
//! the archive mover so both sides of the content-addressed storage scheme
//! agree on what a filename is allowed to look like.

use crate::{Error, Result};

/// Fixed allow-list of media/document extensions.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "ai", "aif", "aiff", "avi", "dia", "djvu", "doc", "dv", "eps", "gif", "indd", "inx", "jpg",
    "jpeg", "mid", "mov", "odg", "odp", "ods", "odt", "ogg", "ogv", "omniplan", "otf", "ott",
    "pdf", "png", "ppd", "ppt", "psd", "stl", "svg", "wff2", "webp", "wmv", "woff", "xcf", "xml",
    "zip",
];

/// A filename that has passed the sanity gate: UTF-8, free of path
/// separators, carrying an allowed extension.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MediaFilename(String);

impl MediaFilename {
    /// Validates a candidate filename.
    ///
    /// Rejects anything that isn't UTF-8, contains `/` or the platform path
    /// separator, or whose extension isn't on [`ALLOWED_EXTENSIONS`].
    pub fn parse(candidate: impl AsRef<std::ffi::OsStr>) -> Result<Self> {
        let candidate = candidate.as_ref();
        let Some(text) = candidate.to_str() else {
            return Err(Error::InvalidFilename(candidate.to_owned()));
        };
        if text.contains('/') || text.contains(std::path::MAIN_SEPARATOR) {
            return Err(Error::InvalidFilename(candidate.to_owned()));
        }
        let Some(extension) = text.rsplit('.').next().filter(|ext| *ext != text) else {
            return Err(Error::DisallowedExtension(text.to_owned()));
        };
        if !ALLOWED_EXTENSIONS
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
        {
            return Err(Error::DisallowedExtension(text.to_owned()));
        }
        Ok(Self(text.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for MediaFilename {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MediaFilename {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allowed_extension() {
        assert!(MediaFilename::parse("cat.jpg").is_ok());
        assert!(MediaFilename::parse("Foo.Bar.PDF").is_ok());
    }

    #[test]
    fn rejects_path_separators() {
        assert!(MediaFilename::parse("a/b.jpg").is_err());
    }

    #[test]
    fn rejects_missing_or_disallowed_extension() {
        assert!(MediaFilename::parse("noextension").is_err());
        assert!(MediaFilename::parse("script.exe").is_err());
    }

    #[test]
    fn trailing_extra_extension_sorts_and_validates_independently() {
        // `A.jpg` < `A.jpg.jpg`: both are valid distinct filenames.
        let a = MediaFilename::parse("A.jpg").unwrap();
        let b = MediaFilename::parse("A.jpg.jpg").unwrap();
        assert!(a < b);
    }
}
