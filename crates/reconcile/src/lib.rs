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

//! Streaming merge-join and set-difference operators over sorted,
//! byte-lexicographic, line-oriented gzip inventories. Every operator reads
//! its inputs in lockstep and never materializes a full stream in memory:
//! that guarantee is what lets these run over inventories with hundreds of
//! millions of lines on bounded memory.
//!
//! All comparisons and all "identity" are on the leading whitespace field of
//! a line (the filename); trailing fields (timestamp, directory) ride along
//! for whichever side's line is actually emitted.

use std::{
    cmp::Ordering,
    fs::File,
    io::{BufRead, BufReader, Read, Write},
    path::Path,
};

use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use super::{Error, Result};
}

/// Returns the leading whitespace-delimited field of a line: the key every
/// operator in this module compares and diffs on.
#[must_use]
fn leading_field(line: &[u8]) -> &[u8] {
    line.split(|&b| b == b' ' || b == b'\t')
        .next()
        .unwrap_or(line)
}

fn second_field(line: &[u8]) -> Option<&[u8]> {
    let mut fields = line.split(|&b| b == b' ' || b == b'\t');
    fields.next()?;
    fields.next()
}

/// A single line read off a sorted gzip stream, positioned at the current
/// entry. `None` once the stream is exhausted.
struct Cursor<R> {
    reader: BufReader<GzDecoder<R>>,
    current: Option<Vec<u8>>,
}

impl<R: Read> Cursor<R> {
    fn open(reader: R) -> Result<Self> {
        let mut cursor = Self {
            reader: BufReader::new(GzDecoder::new(reader)),
            current: None,
        };
        cursor.advance()?;
        Ok(cursor)
    }

    fn advance(&mut self) -> Result<()> {
        let mut line = Vec::new();
        let read = self.reader.read_until(b'\n', &mut line)?;
        self.current = (read > 0 && line != b"\n").then_some(line);
        Ok(())
    }

    fn key(&self) -> Option<&[u8]> {
        self.current.as_deref().map(leading_field)
    }
}

fn open_gzip(path: &Path) -> Result<Cursor<File>> {
    Cursor::open(File::open(path)?)
}

fn gzip_writer(path: &Path) -> Result<GzEncoder<File>> {
    Ok(GzEncoder::new(File::create(path)?, Compression::default()))
}

/// `mergeKeep`: merges two already-sorted inventories (uploaded media and
/// foreign-repo-referenced media) into the single sorted set of everything
/// this project is entitled to keep locally. Equivalent to `sort -m`: lines
/// from both sides are preserved, including same-key lines appearing on
/// both sides.
pub fn merge_keep(uploaded_sorted: &Path, foreignrepo_sorted: &Path, all_media_keep: &Path) -> Result<()> {
    let mut left = open_gzip(uploaded_sorted)?;
    let mut right = open_gzip(foreignrepo_sorted)?;
    let mut out = gzip_writer(all_media_keep)?;

    loop {
        match (left.current.as_ref(), right.current.as_ref()) {
            (Some(l), Some(r)) => {
                if leading_field(l).cmp(leading_field(r)) == Ordering::Greater {
                    out.write_all(r)?;
                    right.advance()?;
                } else {
                    out.write_all(l)?;
                    left.advance()?;
                }
            }
            (Some(l), None) => {
                out.write_all(l)?;
                left.advance()?;
            }
            (None, Some(r)) => {
                out.write_all(r)?;
                right.advance()?;
            }
            (None, None) => break,
        }
    }
    out.finish()?;
    Ok(())
}

/// Shared lockstep walk for `diffFetchUploaded` / `diffFetchForeign`: for
/// every entry in `remote_sorted`, advance `local_sorted` while its key is
/// less than the remote key, then decide whether the remote entry needs
/// fetching — the local copy is missing, or (`check_staleness`) present but
/// recorded under a strictly older timestamp. Equal filenames where the
/// local timestamp is already greater than or equal to the remote one are
/// left alone.
fn diff_fetch(
    local_sorted: &Path,
    remote_sorted: &Path,
    toget: &Path,
    check_staleness: bool,
) -> Result<()> {
    let mut local = open_gzip(local_sorted)?;
    let mut remote = open_gzip(remote_sorted)?;
    let mut out = gzip_writer(toget)?;

    while let Some(remote_line) = remote.current.clone() {
        let remote_key = leading_field(&remote_line).to_vec();
        while matches!(local.key(), Some(local_key) if local_key < remote_key.as_slice()) {
            local.advance()?;
        }

        let needs_fetch = match local.key() {
            None => true,
            Some(local_key) if local_key > remote_key.as_slice() => true,
            Some(_) => {
                check_staleness
                    && match (
                        second_field(local.current.as_ref().expect("Some key implies Some line")),
                        second_field(&remote_line),
                    ) {
                        (Some(local_ts), Some(remote_ts)) => local_ts < remote_ts,
                        _ => true,
                    }
            }
        };
        if needs_fetch {
            out.write_all(&remote_line)?;
        }
        remote.advance()?;
    }
    out.finish()?;
    Ok(())
}

/// `diffFetchUploaded`: entries on the uploaded-media inventory that are
/// missing locally or recorded with a stale timestamp.
pub fn diff_fetch_uploaded(local_sorted: &Path, uploaded_sorted: &Path, toget: &Path) -> Result<()> {
    diff_fetch(local_sorted, uploaded_sorted, toget, true)
}

/// `diffFetchForeign`: entries referenced from a foreign repository that are
/// missing locally. No staleness check: foreign-repo references carry no
/// meaningful timestamp to compare against.
pub fn diff_fetch_foreign(local_sorted: &Path, foreignrepo_sorted: &Path, toget: &Path) -> Result<()> {
    diff_fetch(local_sorted, foreignrepo_sorted, toget, false)
}

/// `diffDelete`: local entries whose key does not appear anywhere in the
/// merged keep-list, i.e. files this project no longer has any remote
/// justification to retain.
pub fn diff_delete(local_sorted: &Path, all_media_keep: &Path, all_media_delete: &Path) -> Result<()> {
    let mut local = open_gzip(local_sorted)?;
    let mut keep = open_gzip(all_media_keep)?;
    let mut out = gzip_writer(all_media_delete)?;

    while let Some(local_line) = local.current.clone() {
        let local_key = leading_field(&local_line).to_vec();
        while matches!(keep.key(), Some(keep_key) if keep_key < local_key.as_slice()) {
            keep.advance()?;
        }
        let retained = matches!(keep.key(), Some(keep_key) if keep_key == local_key.as_slice());
        if !retained {
            out.write_all(&local_line)?;
        }
        local.advance()?;
    }
    out.finish()?;
    Ok(())
}

/// Generic "only in first, not in second" lockstep diff: the shared engine
/// behind `diffOldExtra`/`diffNewExtra`, parameterised by which dated run
/// plays the "first" role.
fn diff_only_in_first(first: &Path, second: &Path, out_path: &Path) -> Result<()> {
    let mut first_cursor = open_gzip(first)?;
    let mut second_cursor = open_gzip(second)?;
    let mut out = gzip_writer(out_path)?;

    while let Some(first_line) = first_cursor.current.clone() {
        let first_key = leading_field(&first_line).to_vec();
        while matches!(second_cursor.key(), Some(second_key) if second_key < first_key.as_slice()) {
            second_cursor.advance()?;
        }
        let present_in_second = matches!(second_cursor.key(), Some(second_key) if second_key == first_key.as_slice());
        if !present_in_second {
            out.write_all(&first_line)?;
        }
        first_cursor.advance()?;
    }
    out.finish()?;
    Ok(())
}

/// `diffOldExtra`: entries present in the prior run's inventory that have
/// dropped out of the current one (media gone from the remote).
pub fn diff_old_extra(old_sorted: &Path, new_sorted: &Path, all_media_gone: &Path) -> Result<()> {
    diff_only_in_first(old_sorted, new_sorted, all_media_gone)
}

/// `diffNewExtra`: entries present in the current run's inventory that were
/// absent from the prior one (newly uploaded or newly referenced media).
pub fn diff_new_extra(old_sorted: &Path, new_sorted: &Path, new_media: &Path) -> Result<()> {
    diff_only_in_first(new_sorted, old_sorted, new_media)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read as _;

    fn gz_file(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap();
        path
    }

    fn read_gz(path: &Path) -> String {
        let file = File::open(path).unwrap();
        let mut decoder = GzDecoder::new(file);
        let mut text = String::new();
        decoder.read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn merge_keep_unions_both_sorted_streams() {
        let dir = tempfile::tempdir().unwrap();
        let uploaded = gz_file(dir.path(), "u.gz", "ant.gif 1\ncat.jpg 1\n");
        let foreign = gz_file(dir.path(), "f.gz", "bee.png 1\ncat.jpg 1\n");
        let out = dir.path().join("keep.gz");
        merge_keep(&uploaded, &foreign, &out).unwrap();
        assert_eq!(
            read_gz(&out),
            "ant.gif 1\nbee.png 1\ncat.jpg 1\ncat.jpg 1\n"
        );
    }

    #[test]
    fn diff_fetch_uploaded_flags_missing_and_stale() {
        let dir = tempfile::tempdir().unwrap();
        // local has cat.jpg at ts 1 (up to date), dog.png at ts 1 (stale vs. ts 2),
        // eel.svg at ts 5 (locally newer than the remote's ts 3)
        let local = gz_file(dir.path(), "local.gz", "cat.jpg 1 aa\ndog.png 1 bb\neel.svg 5 cc\n");
        // uploaded: ant.gif (missing locally), cat.jpg ts1 (up to date),
        // dog.png ts2 (stale), eel.svg ts3 (local copy is newer, skip)
        let uploaded = gz_file(dir.path(), "up.gz", "ant.gif 1\ncat.jpg 1\ndog.png 2\neel.svg 3\n");
        let toget = dir.path().join("toget.gz");
        diff_fetch_uploaded(&local, &uploaded, &toget).unwrap();
        assert_eq!(read_gz(&toget), "ant.gif 1\ndog.png 2\n");
    }

    #[test]
    fn diff_fetch_foreign_ignores_timestamp_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let local = gz_file(dir.path(), "local.gz", "cat.jpg 99 aa\n");
        let foreign = gz_file(dir.path(), "fr.gz", "ant.gif 1\ncat.jpg 1\n");
        let toget = dir.path().join("toget.gz");
        diff_fetch_foreign(&local, &foreign, &toget).unwrap();
        assert_eq!(read_gz(&toget), "ant.gif 1\n");
    }

    #[test]
    fn diff_delete_flags_local_entries_absent_from_keep() {
        let dir = tempfile::tempdir().unwrap();
        let local = gz_file(dir.path(), "local.gz", "ant.gif 1 aa\ncat.jpg 1 aa\nzzz.png 1 aa\n");
        let keep = gz_file(dir.path(), "keep.gz", "cat.jpg 1\n");
        let delete = dir.path().join("delete.gz");
        diff_delete(&local, &keep, &delete).unwrap();
        assert_eq!(read_gz(&delete), "ant.gif 1 aa\nzzz.png 1 aa\n");
    }

    #[test]
    fn diff_old_extra_finds_media_gone_from_remote() {
        let dir = tempfile::tempdir().unwrap();
        let old = gz_file(dir.path(), "old.gz", "ant.gif 1\ncat.jpg 1\ndog.png 1\n");
        let new = gz_file(dir.path(), "new.gz", "cat.jpg 1\n");
        let gone = dir.path().join("gone.gz");
        diff_old_extra(&old, &new, &gone).unwrap();
        assert_eq!(read_gz(&gone), "ant.gif 1\ndog.png 1\n");
    }

    #[test]
    fn diff_new_extra_finds_newly_present_media() {
        let dir = tempfile::tempdir().unwrap();
        let old = gz_file(dir.path(), "old.gz", "cat.jpg 1\n");
        let new = gz_file(dir.path(), "new.gz", "ant.gif 1\ncat.jpg 1\ndog.png 1\n");
        let added = dir.path().join("added.gz");
        diff_new_extra(&old, &new, &added).unwrap();
        assert_eq!(read_gz(&added), "ant.gif 1\ndog.png 1\n");
    }

    #[test]
    fn empty_inputs_produce_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let empty = gz_file(dir.path(), "empty.gz", "");
        let out = dir.path().join("out.gz");
        diff_delete(&empty, &empty, &out).unwrap();
        assert_eq!(read_gz(&out), "");
    }
}
