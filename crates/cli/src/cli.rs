// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;

use clap::Parser;

/// Reconciles a local media mirror against the remote inventories served by
/// a set of wiki projects.
#[derive(Parser, Debug)]
#[command(name = "mediasync", version, about)]
pub struct Cli {
    /// Path to the RON configuration file.
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,

    /// Restrict the run to these dbnames. May be repeated. Default: every
    /// active project.
    #[arg(long = "project", value_name = "DBNAME")]
    pub projects: Vec<String>,

    /// Override the configured HTTP retry count.
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Override the configured inter-retry wait, in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub wait_secs: Option<u64>,

    /// Increase log verbosity. May be repeated (`-v`, `-vv`).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Compute everything but perform no deletes or downloads.
    #[arg(long)]
    pub dry_run: bool,

    /// Force a full reconciliation even where a prior run's keep-list
    /// exists, skipping the incremental gone/new-media diffs.
    #[arg(long)]
    pub full: bool,

    /// Resume an interrupted run for today: include today's own
    /// partially-built artifacts when locating the most recent prior run,
    /// and skip downloads already recorded in today's journals.
    #[arg(long = "continue")]
    pub resume: bool,

    /// Also resolve retired projects' types via the (expensive) per-site
    /// API and archive their media directories.
    #[arg(long)]
    pub archive: bool,
}

impl Cli {
    #[must_use]
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
