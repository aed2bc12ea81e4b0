// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Two-level content-addressed hash path derivation, shared by
//! `LocalInventory`, the downloader and the archive mover so that all three
//! agree on where a given filename lives in the media tree.

use std::path::PathBuf;

use digest::Digest as _;

/// The two-level hash path derived from the MD5 digest of a filename's raw
/// bytes: the first hex digit, then the first two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashPath {
    first: char,
    first_two: [char; 2],
}

impl HashPath {
    /// Computes the hash path for the raw bytes of a filename.
    ///
    /// Hashing operates on raw bytes, not on a percent-encoded or otherwise
    /// transformed representation: the URL the downloader fetches from and
    /// the path it writes to must derive the same hash path.
    #[must_use]
    pub fn of_filename_bytes(filename: &[u8]) -> Self {
        let digest = md5::Md5::digest(filename);
        let hex = format!("{digest:x}");
        let mut chars = hex.chars();
        let first = chars.next().expect("md5 digest is never empty");
        let second = chars.next().expect("md5 digest has at least two digits");
        Self {
            first,
            first_two: [first, second],
        }
    }

    #[must_use]
    pub fn first_level(&self) -> String {
        self.first.to_string()
    }

    #[must_use]
    pub fn second_level(&self) -> String {
        self.first_two.iter().collect()
    }

    /// Appends `<h1>/<h1h2>` onto `base`.
    #[must_use]
    pub fn join_onto(&self, base: &std::path::Path) -> PathBuf {
        base.join(self.first_level()).join(self.second_level())
    }
}

/// All 256 two-level hash directory names, in the order the reference
/// implementation creates them (nested loop over hex digits).
#[must_use]
pub fn all_hash_subdirs() -> Vec<(String, String)> {
    const HEX_DIGITS: &str = "0123456789abcdef";
    let mut subdirs = Vec::with_capacity(256);
    for first in HEX_DIGITS.chars() {
        for second in HEX_DIGITS.chars() {
            subdirs.push((first.to_string(), format!("{first}{second}")));
        }
    }
    subdirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_deterministic_and_hex() {
        let a = HashPath::of_filename_bytes(b"cat.jpg");
        let b = HashPath::of_filename_bytes(b"cat.jpg");
        assert_eq!(a, b);
        assert_eq!(a.first_level().len(), 1);
        assert_eq!(a.second_level().len(), 2);
        assert!(a.second_level().starts_with(&a.first_level()));
        assert!(a.second_level().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn join_onto_appends_two_levels() {
        let hp = HashPath::of_filename_bytes(b"dog.png");
        let joined = hp.join_onto(std::path::Path::new("/media/wikipedia/en"));
        let expected = std::path::Path::new("/media/wikipedia/en")
            .join(hp.first_level())
            .join(hp.second_level());
        assert_eq!(joined, expected);
    }

    #[test]
    fn all_hash_subdirs_has_256_entries() {
        let subdirs = all_hash_subdirs();
        assert_eq!(subdirs.len(), 256);
        assert_eq!(subdirs[0], ("0".to_owned(), "00".to_owned()));
        assert_eq!(subdirs[255], ("f".to_owned(), "ff".to_owned()));
    }
}
