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

//! Remote project enumeration: pulls the MediaWiki site-matrix, builds the
//! bidirectional `dbname <-> (projecttype, langcode)` mapping, and (lazily,
//! because it is expensive) resolves the project type of `specials` sites
//! via a per-site `filerepoinfo` API call.

use std::{collections::BTreeMap, time::Duration};

use mediasync_core::project::{LangCode, ProjectName, ProjectType};
use mediasync_http::Fetcher;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("site-matrix response is not valid JSON")]
    MalformedJson(#[from] serde_json::Error),

    #[error("site-matrix response is missing the top-level \"sitematrix\" object")]
    MissingSiteMatrix,

    #[error(transparent)]
    Fetch(#[from] mediasync_http::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use super::{Error, ProjectRegistry, Result};
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveEntry {
    langcode: LangCode,
    projecttype: Option<ProjectType>,
    todo: bool,
    /// The site's own base URL, kept around so `fill_in_projecttypes` can
    /// make the per-site API call without re-parsing the site-matrix.
    site_url: Option<String>,
}

/// The active project set and derived lookup tables.
#[derive(Debug, Clone)]
pub struct ProjectRegistry {
    active: BTreeMap<String, ActiveEntry>,
    type_lang_to_dbname: BTreeMap<String, String>,
}

/// Derives the projecttype from a site base URL by taking the
/// second-to-last dot-separated label, e.g. `https://si.wikipedia.org` ->
/// `wikipedia`.
#[must_use]
pub fn projecttype_from_url(url: &str) -> Option<String> {
    let mut labels: Vec<&str> = url.rsplit('.').collect();
    labels.get(1).map(|label| (*label).to_owned())
}

impl ProjectRegistry {
    /// Builds the active project set from a raw site-matrix JSON response.
    ///
    /// `todo_whitelist`, if non-empty, marks only the listed dbnames as
    /// `todo`; an empty whitelist means "all active projects".
    pub fn from_site_matrix_json(json: &[u8], todo_whitelist: &[String]) -> Result<Self> {
        let root: serde_json::Value = serde_json::from_slice(json)?;
        let sitematrix = root.get("sitematrix").ok_or(Error::MissingSiteMatrix)?;
        let Some(sitematrix) = sitematrix.as_object() else {
            return Err(Error::MissingSiteMatrix);
        };

        let mut active = BTreeMap::new();
        for (key, group) in sitematrix {
            if key == "specials" {
                process_specials(group, todo_whitelist, &mut active);
            } else {
                process_regular_group(group, todo_whitelist, &mut active);
            }
        }

        let type_lang_to_dbname = build_reverse_map(&active);
        Ok(Self {
            active,
            type_lang_to_dbname,
        })
    }

    /// Removes the configured foreign-repo wiki from the active set so it is
    /// never mirrored in full.
    pub fn exclude_foreign_repo(&mut self, foreignrepo_dbname: &str) {
        if self.active.remove(foreignrepo_dbname).is_some() {
            self.type_lang_to_dbname = build_reverse_map(&self.active);
        }
    }

    /// If any entries are marked `todo`, returns those; otherwise returns
    /// every active dbname. Compute once per run; never call this inside a
    /// loop expecting it to react to later mutation.
    #[must_use]
    pub fn todos(&self) -> Vec<ProjectName> {
        let explicit: Vec<ProjectName> = self
            .active
            .iter()
            .filter(|(_, entry)| entry.todo)
            .map(|(dbname, _)| ProjectName::new(dbname.clone()))
            .collect();
        if !explicit.is_empty() {
            return explicit;
        }
        self.active
            .keys()
            .map(|dbname| ProjectName::new(dbname.clone()))
            .collect()
    }

    /// Resolves `(projecttype, langcode)` for a project name. A name
    /// containing `/` is interpreted literally (a retired-project
    /// sentinel); otherwise it is looked up among active projects.
    #[must_use]
    pub fn type_lang(&self, project: &ProjectName) -> Option<(ProjectType, LangCode)> {
        if let Some(retired) = project.split_retired() {
            return Some(retired);
        }
        let entry = self.active.get(project.as_str())?;
        Some((entry.projecttype.clone()?, entry.langcode.clone()))
    }

    /// Reverse lookup: `type/lang -> dbname`, or the `type/lang` sentinel
    /// itself if the project is no longer active (retired).
    #[must_use]
    pub fn name_from_type_lang(&self, projecttype: &ProjectType, langcode: &LangCode) -> ProjectName {
        let key = format!("{projecttype}/{langcode}");
        match self.type_lang_to_dbname.get(&key) {
            Some(dbname) => ProjectName::new(dbname.clone()),
            None => ProjectName::retired(projecttype, langcode),
        }
    }

    /// Whether `dbname` is present in the active set at all (ignores the
    /// `todo` whitelist).
    #[must_use]
    pub fn is_active(&self, dbname: &str) -> bool {
        self.active.contains_key(dbname)
    }

    /// For every active entry still missing a projecttype (every `specials`
    /// site that was enumerated), resolves it via a per-site `filerepoinfo`
    /// API call, sleeping `wait` between requests. Expensive: only the
    /// retired-project archival path should call this.
    pub fn fill_in_projecttypes(&mut self, fetcher: &Fetcher, api_path_suffix: &str, wait: Duration) -> Result<()> {
        let pending: Vec<String> = self
            .active
            .iter()
            .filter(|(_, entry)| entry.projecttype.is_none())
            .map(|(dbname, _)| dbname.clone())
            .collect();

        for dbname in pending {
            let Some(site_url) = self.active.get(&dbname).and_then(|e| e.site_url.clone()) else {
                continue;
            };
            let projecttype = fetch_projecttype(fetcher, &site_url, api_path_suffix, &dbname);
            if let Some(entry) = self.active.get_mut(&dbname) {
                entry.projecttype = projecttype.map(ProjectType::new);
            }
            std::thread::sleep(wait);
        }

        self.type_lang_to_dbname = build_reverse_map(&self.active);
        Ok(())
    }
}

fn fetch_projecttype(fetcher: &Fetcher, site_url: &str, api_path_suffix: &str, dbname: &str) -> Option<String> {
    let url = format!(
        "{site_url}{api_path_suffix}?action=query&meta=filerepoinfo&friprop=name%7Curl&format=json"
    );
    let content = match fetcher.get_content(&url) {
        Ok(content) => content,
        Err(err) => {
            log::warn!("Failed to retrieve file repo info for project {dbname}: {err}");
            return None;
        }
    };
    let root: serde_json::Value = serde_json::from_slice(&content).ok()?;
    let repos = root.get("query")?.get("repos")?.as_array()?;
    for repo in repos {
        if repo.get("name")?.as_str()? == "local" {
            let repo_url = repo.get("url")?.as_str()?;
            let fields: Vec<&str> = repo_url.split('/').collect();
            return fields.iter().rev().nth(1).map(|s| (*s).to_owned());
        }
    }
    None
}

fn process_regular_group(group: &serde_json::Value, todo: &[String], active: &mut BTreeMap<String, ActiveEntry>) {
    let Some(code) = group.get("code").and_then(serde_json::Value::as_str) else {
        return;
    };
    let Some(sites) = group.get("site").and_then(serde_json::Value::as_array) else {
        return;
    };
    for site in sites {
        if site.get("private").is_some() {
            continue;
        }
        let (Some(dbname), Some(url)) = (
            site.get("dbname").and_then(serde_json::Value::as_str),
            site.get("url").and_then(serde_json::Value::as_str),
        ) else {
            continue;
        };
        let projecttype = projecttype_from_url(url);
        active.insert(
            dbname.to_owned(),
            ActiveEntry {
                langcode: LangCode::new(code),
                projecttype: projecttype.map(ProjectType::new),
                todo: todo.is_empty() || todo.iter().any(|t| t == dbname),
                site_url: Some(url.to_owned()),
            },
        );
    }
}

fn process_specials(group: &serde_json::Value, todo: &[String], active: &mut BTreeMap<String, ActiveEntry>) {
    let Some(sites) = group.as_array() else {
        return;
    };
    for site in sites {
        if site.get("private").is_some() {
            continue;
        }
        let (Some(dbname), Some(code), Some(url)) = (
            site.get("dbname").and_then(serde_json::Value::as_str),
            site.get("code").and_then(serde_json::Value::as_str),
            site.get("url").and_then(serde_json::Value::as_str),
        ) else {
            continue;
        };
        active.insert(
            dbname.to_owned(),
            ActiveEntry {
                langcode: LangCode::new(code),
                // Specials never get a cheap URL-derived projecttype; it is
                // filled in lazily via `fill_in_projecttypes` when needed.
                projecttype: None,
                todo: todo.is_empty() || todo.iter().any(|t| t == dbname),
                site_url: Some(url.to_owned()),
            },
        );
    }
}

fn build_reverse_map(active: &BTreeMap<String, ActiveEntry>) -> BTreeMap<String, String> {
    active
        .iter()
        .filter_map(|(dbname, entry)| {
            let projecttype = entry.projecttype.as_ref()?;
            Some((format!("{projecttype}/{langcode}", langcode = entry.langcode), dbname.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_MATRIX: &str = r#"{
        "sitematrix": {
            "count": 5,
            "0": {
                "code": "en",
                "name": "English",
                "site": [
                    {"url": "https://en.wikipedia.org", "dbname": "enwiki", "code": "wiki"},
                    {"url": "https://en.wiktionary.org", "dbname": "enwiktionary", "code": "wiktionary", "private": ""}
                ]
            },
            "specials": [
                {"url": "https://commons.wikimedia.org", "dbname": "commonswiki", "code": "commons"}
            ]
        }
    }"#;

    #[test]
    fn parses_regular_and_specials_and_skips_private() {
        let registry = ProjectRegistry::from_site_matrix_json(SAMPLE_MATRIX.as_bytes(), &[]).unwrap();
        assert!(registry.is_active("enwiki"));
        assert!(registry.is_active("commonswiki"));
        assert!(!registry.is_active("enwiktionary"));
    }

    #[test]
    fn todos_defaults_to_all_active_when_whitelist_empty() {
        let registry = ProjectRegistry::from_site_matrix_json(SAMPLE_MATRIX.as_bytes(), &[]).unwrap();
        let todos = registry.todos();
        assert_eq!(todos.len(), 2);
    }

    #[test]
    fn todos_honors_whitelist() {
        let registry = ProjectRegistry::from_site_matrix_json(
            SAMPLE_MATRIX.as_bytes(),
            &["enwiki".to_owned()],
        )
        .unwrap();
        let todos = registry.todos();
        assert_eq!(todos, vec![ProjectName::new("enwiki")]);
    }

    #[test]
    fn exclude_foreign_repo_removes_entry_and_rebuilds_reverse_map() {
        let mut registry = ProjectRegistry::from_site_matrix_json(SAMPLE_MATRIX.as_bytes(), &[]).unwrap();
        registry.exclude_foreign_repo("enwiki");
        assert!(!registry.is_active("enwiki"));
    }

    #[test]
    fn name_from_type_lang_falls_back_to_sentinel_when_unknown() {
        let registry = ProjectRegistry::from_site_matrix_json(SAMPLE_MATRIX.as_bytes(), &[]).unwrap();
        let name = registry.name_from_type_lang(&ProjectType::new("wikipedia"), &LangCode::new("xx"));
        assert_eq!(name.as_str(), "wikipedia/xx");
    }

    #[test]
    fn projecttype_from_url_takes_second_to_last_label() {
        assert_eq!(
            projecttype_from_url("https://si.wikipedia.org").as_deref(),
            Some("wikipedia")
        );
    }
}
