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
#![allow(clippy::default_trait_access)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::missing_errors_doc)]

pub mod artifacts;
pub mod filename;
pub mod hashpath;
pub mod project;
pub mod runcontext;
pub mod timestamp;

use std::result::Result as StdResult;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("filename contains a path separator or is not valid UTF-8: {0:?}")]
    InvalidFilename(std::ffi::OsString),

    #[error("filename extension is not on the allow-list: {0}")]
    DisallowedExtension(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = StdResult<T, Error>;

pub mod prelude {
    pub use super::{Error, Result};
}
