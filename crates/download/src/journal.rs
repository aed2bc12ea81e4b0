// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Append-only success/failure journals. A download is journaled to exactly
//! one of the two files, exactly once: the sanity gate and the budget loop
//! both check [`already_journaled`] before attempting anything, so a
//! resumed run never re-attempts, and therefore never re-journals, a
//! filename an earlier run already recorded.
//!
//! Journal files are gzip, and a resumed run appends a fresh gzip member
//! rather than rewriting the file: gzip streams are valid when concatenated,
//! so [`already_journaled`] reads them back with a multi-member decoder.

use std::{
    collections::HashSet,
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::Path,
};

use flate2::{read::MultiGzDecoder, write::GzEncoder, Compression};

use crate::Result;

/// Reads every filename already recorded in `path` (if it exists at all).
pub(crate) fn already_journaled(path: &Path) -> Result<HashSet<String>> {
    let mut seen = HashSet::new();
    if !path.exists() {
        return Ok(seen);
    }
    let file = File::open(path)?;
    let mut reader = BufReader::new(MultiGzDecoder::new(file));
    let mut line = String::new();
    while reader.read_line(&mut line)? > 0 {
        if let Some(filename) = line.split_whitespace().next() {
            seen.insert(filename.to_owned());
        }
        line.clear();
    }
    Ok(seen)
}

/// The filename of the last entry recorded in `path`, or `None` if the
/// journal does not exist or is empty. Used to locate the resume marker in
/// a prior run's retrieval journal.
pub(crate) fn last_entry(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path)?;
    let mut reader = BufReader::new(MultiGzDecoder::new(file));
    let mut line = String::new();
    let mut last = None;
    while reader.read_line(&mut line)? > 0 {
        if let Some(filename) = line.split_whitespace().next() {
            last = Some(filename.to_owned());
        }
        line.clear();
    }
    Ok(last)
}

/// An append-only journal writer: one gzip member per process lifetime,
/// flushed and finished on [`JournalWriter::close`].
pub(crate) struct JournalWriter {
    encoder: GzEncoder<File>,
}

impl JournalWriter {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            encoder: GzEncoder::new(file, Compression::default()),
        })
    }

    pub(crate) fn record(&mut self, line: &str) -> Result<()> {
        writeln!(self.encoder, "{line}")?;
        Ok(())
    }

    pub(crate) fn close(self) -> Result<()> {
        self.encoder.finish()?;
        Ok(())
    }
}
