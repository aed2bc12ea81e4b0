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

//! `GetContent`/`GetFile` with bounded retries and a configured
//! inter-retry wait, streaming large bodies straight to disk.
//!
//! The engine runs strictly serially (see the concurrency model), so this
//! wraps `reqwest`'s blocking client rather than its async one: a single
//! in-flight request at a time gets nothing from an async runtime but
//! complexity.

use std::{
    fs,
    io::{self, Write as _},
    path::Path,
    time::Duration,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("request to {url} failed after exhausting retries (last status: {status:?})")]
    FetcherExhausted {
        url: String,
        status: Option<reqwest::StatusCode>,
    },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use super::{Error, Fetcher, Result};
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub retries: u32,
    pub wait: Duration,
    pub request_timeout: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(retries: u32, wait: Duration) -> Self {
        Self {
            retries,
            wait,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
pub struct Fetcher {
    client: reqwest::blocking::Client,
    user_agent: String,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(user_agent: impl Into<String>, policy: RetryPolicy) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(policy.request_timeout)
            .build()?;
        Ok(Self {
            client,
            user_agent: user_agent.into(),
            policy,
        })
    }

    fn send_with_retries(&self, url: &str) -> (Option<reqwest::blocking::Response>, Option<reqwest::StatusCode>) {
        let mut last_status = None;
        for attempt in 0..=self.policy.retries {
            if attempt > 0 {
                std::thread::sleep(self.policy.wait);
            }
            let response = self
                .client
                .get(url)
                .header(reqwest::header::USER_AGENT, &self.user_agent)
                .send();
            match response {
                Ok(response) if response.status().is_success() => {
                    return (Some(response), None);
                }
                Ok(response) => {
                    last_status = Some(response.status());
                    log::warn!(
                        "GET {url} returned {status} (attempt {attempt}/{retries})",
                        status = response.status(),
                        retries = self.policy.retries
                    );
                }
                Err(err) => {
                    log::warn!("GET {url} failed: {err} (attempt {attempt}/{retries})", retries = self.policy.retries);
                }
            }
        }
        (None, last_status)
    }

    /// Returns the response body bytes on success, retrying on any non-2xx
    /// response. Fails with [`Error::FetcherExhausted`] carrying the last
    /// observed status code once retries are exhausted.
    pub fn get_content(&self, url: &str) -> Result<Vec<u8>> {
        let (response, last_status) = self.send_with_retries(url);
        match response {
            Some(response) => Ok(response.bytes()?.to_vec()),
            None => Err(Error::FetcherExhausted {
                url: url.to_owned(),
                status: last_status,
            }),
        }
    }

    /// Streams the response body to `path`. On success the file is fully
    /// written; on failure no partial file is left behind.
    ///
    /// When `return_on_fail` is set, exhaustion returns the last status code
    /// instead of raising, so the downloader can journal the failure and
    /// keep going.
    pub fn get_file(
        &self,
        url: &str,
        path: &Path,
        return_on_fail: bool,
    ) -> Result<Option<reqwest::StatusCode>> {
        let (response, last_status) = self.send_with_retries(url);
        let Some(mut response) = response else {
            if return_on_fail {
                return Ok(last_status);
            }
            return Err(Error::FetcherExhausted {
                url: url.to_owned(),
                status: last_status,
            });
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        if let Err(err) = io::copy(&mut response, &mut file).and_then(|_| file.flush()) {
            drop(file);
            let _ = fs::remove_file(path);
            return Err(err.into());
        }
        Ok(Some(reqwest::StatusCode::OK))
    }
}
