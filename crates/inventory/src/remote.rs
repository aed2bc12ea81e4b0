// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Locates the latest dated index on the remote listing server, downloads
//! per-project raw inventories, and normalizes them into the sorted
//! `-uploads-sorted.gz` / `-foreignrepo-sorted.gz` artifacts.

use std::{
    fs::File,
    io::{BufRead as _, BufReader, Write as _},
    path::Path,
};

use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use mediasync_core::{artifacts, project::ProjectName};
use mediasync_http::Fetcher;

use crate::{sort::external_sort_gzip, Error, Result};

/// Extracts `YYYYMMDD` anchor targets (`<a href="YYYYMMDD/">`) from an HTML
/// directory listing and returns the lexicographically (== chronologically,
/// for this fixed-width shape) greatest one.
#[must_use]
pub fn latest_date(index_html: &str) -> Option<String> {
    index_html
        .lines()
        .filter(|line| line.contains("<a href="))
        .filter_map(|line| {
            let after = line.split_once("<a href=\"")?.1;
            let (target, _) = after.split_once('"')?;
            Some(target.trim_end_matches('/').to_owned())
        })
        .filter(|date| date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit()))
        .max()
}

/// Fetches the index page and extracts the latest date, per [`latest_date`].
pub fn fetch_latest_date(fetcher: &Fetcher, index_url: &str) -> Result<Option<String>> {
    let content = fetcher.get_content(index_url)?;
    let html = String::from_utf8_lossy(&content);
    Ok(latest_date(&html))
}

/// Raw filename template for the project-uploads inventory.
pub const LOCAL_WIKIQUERIES_TEMPLATE: &str = "local-wikiqueries";
/// Raw filename template for the foreign-repo-references inventory.
pub const REMOTE_WIKIQUERIES_TEMPLATE: &str = "remote-wikiqueries";

/// Downloads, for each `todo` project, `<baseurl>/<date>/<project>-<date>-<template>.gz`
/// into that project's working directory.
pub fn get_per_project_lists(
    fetcher: &Fetcher,
    base_url: &str,
    remote_date: &str,
    todos: &[ProjectName],
    listsdir: &Path,
    today: &str,
    template: &str,
) -> Result<()> {
    for project in todos {
        let filename = match template {
            LOCAL_WIKIQUERIES_TEMPLATE => artifacts::raw_local_wikiqueries(project.as_str(), remote_date),
            REMOTE_WIKIQUERIES_TEMPLATE => artifacts::raw_remote_wikiqueries(project.as_str(), remote_date),
            other => other.to_owned(),
        };
        let url = format!("{base_url}/{remote_date}/{filename}");
        let working_dir = artifacts::working_dir(listsdir, today, project.as_str());
        std::fs::create_dir_all(&working_dir)?;
        let dest = working_dir.join(&filename);
        match fetcher.get_file(&url, &dest, true) {
            Ok(Some(status)) if status.is_success() => {}
            Ok(status) => {
                log::warn!(
                    "failed to retrieve {url} for project {project} (status {status:?}); will be skipped downstream"
                );
            }
            Err(err) => {
                log::warn!("failed to retrieve {url} for project {project}: {err}");
            }
        }
    }
    Ok(())
}

/// Strips the first line (an SQL column header), sorts by the leading
/// field under byte order, deduplicates, and re-gzips. Operates as a byte
/// stream end to end; never materializes the full input in memory.
pub fn normalize(input_path: &Path, output_path: &Path) -> Result<()> {
    if !input_path.exists() {
        return Err(Error::ArtifactMissing(input_path.display().to_string()));
    }
    let input = File::open(input_path)?;
    let mut reader = BufReader::new(GzDecoder::new(input));

    // Drop the header line, then re-gzip the remainder into a scratch
    // stream that the external sort reads back out.
    let mut header = Vec::new();
    reader.read_until(b'\n', &mut header)?;

    let mut headerless = tempfile::tempfile()?;
    {
        let mut encoder = GzEncoder::new(&mut headerless, Compression::fast());
        std::io::copy(&mut reader, &mut encoder).map_err(Error::Normalisation)?;
        encoder.finish().map_err(Error::Normalisation)?;
    }
    use std::io::Seek as _;
    headerless.seek(std::io::SeekFrom::Start(0))?;

    let output = File::create(output_path)?;
    external_sort_gzip(headerless, output, true).map_err(Error::Normalisation)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_date_picks_max_among_anchors() {
        let html = r#"
            <a href="20190101/">20190101/</a> 10-Feb-2019
            <a href="20200303/">20200303/</a> 10-Feb-2020
            <a href="notadate/">notadate/</a>
        "#;
        assert_eq!(latest_date(html).as_deref(), Some("20200303"));
    }

    #[test]
    fn latest_date_none_when_absent() {
        let html = r#"<a href="readme.txt">readme</a>"#;
        assert_eq!(latest_date(html), None);
    }

    #[test]
    fn normalize_strips_header_sorts_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("in.gz");
        {
            let file = File::create(&input_path).unwrap();
            let mut encoder = GzEncoder::new(file, Compression::default());
            encoder
                .write_all(b"img_name\tupload_timestamp\ndog.png 2\ncat.jpg 1\ncat.jpg 1\n")
                .unwrap();
            encoder.finish().unwrap();
        }
        let output_path = dir.path().join("out.gz");
        normalize(&input_path, &output_path).unwrap();

        let file = File::open(&output_path).unwrap();
        let mut decoder = GzDecoder::new(file);
        let mut contents = String::new();
        std::io::Read::read_to_string(&mut decoder, &mut contents).unwrap();
        assert_eq!(contents, "cat.jpg 1\ndog.png 2\n");
    }
}
