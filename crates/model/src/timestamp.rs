// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The 14-digit `YYYYMMDDHHMMSS` UTC timestamp used throughout inventory
//! records, and the 8-digit `YYYYMMDD` date stamp used for dated working
//! directories.

use std::time::SystemTime;

use jiff::Timestamp as JiffTimestamp;

/// A `YYYYMMDDHHMMSS` timestamp, always UTC, always exactly 14 ASCII digits.
///
/// Comparing two [`RecordTimestamp`] values byte-lexicographically (the way
/// the reconciler compares inventory record fields) agrees with comparing
/// them chronologically, which is the whole point of this fixed-width
/// representation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordTimestamp(String);

impl RecordTimestamp {
    /// Derives a record timestamp from a file's modification time.
    ///
    /// # Panics
    ///
    /// Panics if `mtime` predates the Unix epoch; this cannot happen for any
    /// real filesystem modification time.
    #[must_use]
    pub fn from_mtime(mtime: SystemTime) -> Self {
        let zoned = JiffTimestamp::try_from(mtime)
            .expect("modification time representable as a timestamp")
            .to_zoned(jiff::tz::TimeZone::UTC);
        Self(format!(
            "{year:04}{month:02}{day:02}{hour:02}{minute:02}{second:02}",
            year = zoned.year(),
            month = zoned.month(),
            day = zoned.day(),
            hour = zoned.hour(),
            minute = zoned.minute(),
            second = zoned.second(),
        ))
    }

    /// Parses a 14-digit timestamp field read from an inventory record.
    #[must_use]
    pub fn parse(field: &str) -> Option<Self> {
        (field.len() == 14 && field.bytes().all(|b| b.is_ascii_digit())).then(|| Self(field.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The UTC `YYYYMMDD` date stamp for "today" at run start, computed once and
/// threaded through the run rather than recomputed by components.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateStamp(String);

impl DateStamp {
    #[must_use]
    pub fn today_utc() -> Self {
        let zoned = JiffTimestamp::now().to_zoned(jiff::tz::TimeZone::UTC);
        Self(format!(
            "{year:04}{month:02}{day:02}",
            year = zoned.year(),
            month = zoned.month(),
            day = zoned.day(),
        ))
    }

    /// Parses an 8-digit date stamp, e.g. a `<listsdir>` entry name.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        (text.len() == 8 && text.bytes().all(|b| b.is_ascii_digit())).then(|| Self(text.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DateStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A second-resolution `YYYYMMDDHHMMSS` stamp for retired-project archive
/// directory names. Distinct from [`RecordTimestamp`] only in intent: this
/// one is compared for same-second collisions, not sort order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveTimestamp(String);

impl ArchiveTimestamp {
    #[must_use]
    pub fn now_utc() -> Self {
        let zoned = JiffTimestamp::now().to_zoned(jiff::tz::TimeZone::UTC);
        Self(format!(
            "{year:04}{month:02}{day:02}{hour:02}{minute:02}{second:02}",
            year = zoned.year(),
            month = zoned.month(),
            day = zoned.day(),
            hour = zoned.hour(),
            minute = zoned.minute(),
            second = zoned.second(),
        ))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArchiveTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_wrong_width() {
        assert!(RecordTimestamp::parse("2020010100000").is_none());
        assert!(RecordTimestamp::parse("202001010000000").is_none());
        assert!(RecordTimestamp::parse("2020010100000x").is_none());
    }

    #[test]
    fn parse_accepts_fourteen_digits() {
        let ts = RecordTimestamp::parse("20200101000000").unwrap();
        assert_eq!(ts.as_str(), "20200101000000");
    }

    #[test]
    fn lexicographic_order_matches_chronological_order() {
        let earlier = RecordTimestamp::parse("20200101000000").unwrap();
        let later = RecordTimestamp::parse("20200303000000").unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn date_stamp_round_trip() {
        let stamp = DateStamp::today_utc();
        assert_eq!(stamp.as_str().len(), 8);
        let parsed = DateStamp::parse(stamp.as_str()).unwrap();
        assert_eq!(stamp, parsed);
    }
}
