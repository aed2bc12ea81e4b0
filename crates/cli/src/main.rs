// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

#![warn(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod cli;
mod run;

use anyhow::Context as _;
use clap::Parser as _;

use crate::{
    cli::Cli,
    run::{run, RunOptions},
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new().filter_level(cli.log_level()).init();

    let mut config = mediasync_config::Config::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    if let Some(retries) = cli.retries {
        config.limits.http_retries = retries;
    }
    if let Some(wait_secs) = cli.wait_secs {
        config.limits.http_wait_secs = wait_secs;
    }

    let options = RunOptions {
        dry_run: cli.dry_run,
        force_full: cli.full,
        resume: cli.resume,
        archive_retired: cli.archive,
    };

    run(&config, &cli.projects, options)
}
