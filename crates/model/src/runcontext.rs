// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The immutable run-wide context: the "today" date stamp and the
//! configured User-Agent. The only process-wide state this engine has is
//! carried here, as explicit fields threaded through components, never as
//! module-level globals.

use crate::timestamp::DateStamp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    today: DateStamp,
    user_agent: String,
}

impl RunContext {
    #[must_use]
    pub fn new(today: DateStamp, user_agent: impl Into<String>) -> Self {
        Self {
            today,
            user_agent: user_agent.into(),
        }
    }

    #[must_use]
    pub fn starting_now(user_agent: impl Into<String>) -> Self {
        Self::new(DateStamp::today_utc(), user_agent)
    }

    #[must_use]
    pub fn today(&self) -> &DateStamp {
        &self.today
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}
