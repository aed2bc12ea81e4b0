// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Project identity: the stable database name plus its derived
//! `(projecttype, langcode)` attributes.

/// The second-to-last label of a project's base URL, e.g. `wikipedia`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectType(String);

impl ProjectType {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The leftmost label of a project's base URL, or a site-matrix `code`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LangCode(String);

impl LangCode {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LangCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Either a known database name (e.g. `enwiki`) or a retired-project
/// sentinel of the form `<projecttype>/<langcode>`.
///
/// The presence of a `/` is the normative signal that a project is *not*
/// active; [`ProjectName::is_active`] checks exactly that, never a registry
/// lookup, mirroring `Projects.is_active` in the reference implementation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectName(String);

impl ProjectName {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn retired(projecttype: &ProjectType, langcode: &LangCode) -> Self {
        Self(format!("{projecttype}/{langcode}"))
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.0.contains('/')
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// If this name is a retired sentinel (`type/lang`), splits it literally.
    /// Otherwise returns `None`: the caller must look the name up in the
    /// active project registry instead.
    #[must_use]
    pub fn split_retired(&self) -> Option<(ProjectType, LangCode)> {
        let (ty, lang) = self.0.split_once('/')?;
        Some((ProjectType::new(ty), LangCode::new(lang)))
    }
}

impl std::fmt::Display for ProjectName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single active project's attributes, as derived from the site-matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub dbname: ProjectName,
    pub langcode: LangCode,
    /// Absent for `specials` entries until [`crate::runcontext`]-driven
    /// callers pay for the expensive per-site lookup.
    pub projecttype: Option<ProjectType>,
    pub todo: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retired_name_round_trips() {
        let ty = ProjectType::new("wikipedia");
        let lang = LangCode::new("tlh");
        let name = ProjectName::retired(&ty, &lang);
        assert_eq!(name.as_str(), "wikipedia/tlh");
        assert!(!name.is_active());
        let (ty2, lang2) = name.split_retired().unwrap();
        assert_eq!(ty2, ty);
        assert_eq!(lang2, lang);
    }

    #[test]
    fn dbname_is_active() {
        let name = ProjectName::new("enwiki");
        assert!(name.is_active());
        assert!(name.split_retired().is_none());
    }
}
