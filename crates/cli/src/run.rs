// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The run orchestration, in the normative step order: bootstrap media
//! trees, archive retired projects, acquire and sort the local inventory,
//! fetch and normalize the remote inventories, reconcile, then (unless
//! dry-run) archive-delete and download. `--continue` short-circuits all of
//! that and resumes downloads only, against the most recent artifacts found
//! for each project rather than a fresh run's.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context as _, Result};
use mediasync_archive::{ArchiveMover, MediaTree};
use mediasync_config::Config;
use mediasync_core::{
    artifacts::{self, RepoType},
    project::{LangCode, ProjectName, ProjectType},
    runcontext::RunContext,
    timestamp::ArchiveTimestamp,
};
use mediasync_download::Budget;
use mediasync_http::{Fetcher, RetryPolicy};
use mediasync_inventory::{local, remote};
use mediasync_reconcile::{diff_delete, diff_fetch_foreign, diff_fetch_uploaded, diff_new_extra, diff_old_extra, merge_keep};
use mediasync_registry::ProjectRegistry;
use mediasync_runstate::{MostRecentIndex, RunMode};

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub dry_run: bool,
    pub force_full: bool,
    pub resume: bool,
    pub archive_retired: bool,
}

pub fn run(config: &Config, projects_whitelist: &[String], options: RunOptions) -> Result<()> {
    let run_context = RunContext::starting_now(config.misc.user_agent.clone());
    let today = run_context.today().as_str();

    let wait = Duration::from_secs(config.limits.http_wait_secs);
    let policy = RetryPolicy::new(config.limits.http_retries, wait);
    let fetcher = Fetcher::new(run_context.user_agent(), policy).context("failed to build HTTP client")?;

    log::info!("fetching site matrix from {}", config.urls.site_matrix_api);
    let site_matrix_json = fetcher
        .get_content(config.urls.site_matrix_api.as_str())
        .context("failed to fetch site matrix")?;
    let mut registry = ProjectRegistry::from_site_matrix_json(&site_matrix_json, projects_whitelist)
        .context("failed to parse site matrix")?;
    registry.exclude_foreign_repo(&config.misc.foreignrepo_dbname);

    let todos = registry.todos();
    log::info!("{} project(s) scheduled for this run", todos.len());

    // Every todo project's media directory and download URL are keyed by
    // (projecttype, langcode), not by dbname; `specials` sites only carry a
    // projecttype once resolved. Resolve eagerly whenever a todo actually
    // needs it, not only under `--archive`, which otherwise only gates the
    // retired-project sweep itself.
    if options.archive_retired || todos.iter().any(|project| registry.type_lang(project).is_none()) {
        registry
            .fill_in_projecttypes(&fetcher, &config.misc.api_path_suffix, wait)
            .context("failed to resolve project types for specials")?;
    }

    if options.resume {
        return resume_downloads(config, &fetcher, &registry, &todos, today);
    }

    for project in &todos {
        let project_media_dir = project_media_dir(config, &registry, project)?;
        MediaTree::bootstrap(&project_media_dir)
            .with_context(|| format!("failed to bootstrap media tree for {project}"))?;
    }

    if options.archive_retired {
        archive_retired_projects(config, &registry, &todos)?;
    }

    for project in &todos {
        let project_media_dir = project_media_dir(config, &registry, project)?;
        local::record(project, &project_media_dir, &config.directories.lists_root, today)
            .with_context(|| format!("failed to record local media for {project}"))?;
        local::sort(project, &config.directories.lists_root, today)
            .with_context(|| format!("failed to sort local media for {project}"))?;
    }

    let remote_date = remote::fetch_latest_date(&fetcher, config.urls.inventory_listing_index.as_str())
        .context("failed to fetch remote listing index")?
        .context("remote listing server has no dated inventory yet")?;
    log::info!("latest remote inventory date is {remote_date}");

    remote::get_per_project_lists(
        &fetcher,
        config.urls.uploaded_media_base.as_str(),
        &remote_date,
        &todos,
        &config.directories.lists_root,
        today,
        remote::LOCAL_WIKIQUERIES_TEMPLATE,
    )
    .context("failed to fetch per-project uploaded-media lists")?;
    remote::get_per_project_lists(
        &fetcher,
        config.urls.foreignrepo_media_base.as_str(),
        &remote_date,
        &todos,
        &config.directories.lists_root,
        today,
        remote::REMOTE_WIKIQUERIES_TEMPLATE,
    )
    .context("failed to fetch per-project foreign-repo-reference lists")?;

    for project in &todos {
        let working_dir = artifacts::working_dir(&config.directories.lists_root, today, project.as_str());
        normalize_if_present(
            &working_dir.join(artifacts::raw_local_wikiqueries(project.as_str(), &remote_date)),
            &working_dir.join(artifacts::uploads_sorted(project.as_str())),
        )?;
        normalize_if_present(
            &working_dir.join(artifacts::raw_remote_wikiqueries(project.as_str(), &remote_date)),
            &working_dir.join(artifacts::foreignrepo_sorted(project.as_str())),
        )?;
    }

    let index = MostRecentIndex::build(&config.directories.lists_root, today, false)
        .context("failed to build most-recent-artifact index")?;

    for project in &todos {
        reconcile_one_project(config, &fetcher, &registry, &index, today, project, options)
            .with_context(|| format!("reconciliation failed for {project}"))?;
    }

    Ok(())
}

/// The canonical on-disk media directory for a project: `<mediaroot>/<projecttype>/<langcode>`.
fn project_media_dir(config: &Config, registry: &ProjectRegistry, project: &ProjectName) -> Result<PathBuf> {
    let (projecttype, langcode) = registry
        .type_lang(project)
        .with_context(|| format!("no projecttype/langcode known for {project}"))?;
    Ok(config.directories.media_root.join(projecttype.as_str()).join(langcode.as_str()))
}

fn normalize_if_present(input: &std::path::Path, output: &std::path::Path) -> Result<()> {
    if !input.exists() {
        return Ok(());
    }
    remote::normalize(input, output).with_context(|| format!("failed to normalize {}", input.display()))?;
    Ok(())
}

#[allow(clippy::too_many_lines)]
fn reconcile_one_project(
    config: &Config,
    fetcher: &Fetcher,
    registry: &ProjectRegistry,
    index: &MostRecentIndex,
    today: &str,
    project: &ProjectName,
    options: RunOptions,
) -> Result<()> {
    let working_dir = artifacts::working_dir(&config.directories.lists_root, today, project.as_str());
    let local_sorted = working_dir.join(artifacts::local_media_sorted(project.as_str()));
    let uploads_sorted = working_dir.join(artifacts::uploads_sorted(project.as_str()));
    let foreignrepo_sorted = working_dir.join(artifacts::foreignrepo_sorted(project.as_str()));

    let mode = RunMode::decide(project, index, options.force_full);
    log::debug!("{project}: reconciliation mode {mode:?}");

    let uploaded_toget = working_dir.join(artifacts::uploaded_toget(project.as_str()));
    let foreignrepo_toget = working_dir.join(artifacts::foreignrepo_toget(project.as_str()));
    diff_fetch_uploaded(&local_sorted, &uploads_sorted, &uploaded_toget)?;
    diff_fetch_foreign(&local_sorted, &foreignrepo_sorted, &foreignrepo_toget)?;

    let all_media_keep = working_dir.join(artifacts::all_media_keep(project.as_str()));
    merge_keep(&uploads_sorted, &foreignrepo_sorted, &all_media_keep)?;

    let all_media_delete = working_dir.join(artifacts::all_media_delete(project.as_str()));
    diff_delete(&local_sorted, &all_media_keep, &all_media_delete)?;

    if mode == RunMode::Incremental {
        if let Some(prior_date) = index.most_recent_date_for(project, &artifacts::all_media_keep("")) {
            let prior_dir = artifacts::working_dir(&config.directories.lists_root, prior_date, project.as_str());
            let prior_keep = prior_dir.join(artifacts::all_media_keep(project.as_str()));
            let all_media_gone = working_dir.join(artifacts::all_media_gone(project.as_str()));
            diff_old_extra(&prior_keep, &all_media_keep, &all_media_gone)?;

            let prior_uploads = prior_dir.join(artifacts::uploads_sorted(project.as_str()));
            let new_uploads = working_dir.join(artifacts::new_media_projectuploads(project.as_str()));
            diff_new_extra(&prior_uploads, &uploads_sorted, &new_uploads)?;

            let prior_foreignrepo = prior_dir.join(artifacts::foreignrepo_sorted(project.as_str()));
            let new_foreignrepo = working_dir.join(artifacts::new_media_foreignrepouploads(project.as_str()));
            diff_new_extra(&prior_foreignrepo, &foreignrepo_sorted, &new_foreignrepo)?;
        }
    }

    if options.dry_run {
        log::info!("{project}: dry-run, skipping delete and download");
        return Ok(());
    }

    let (projecttype, langcode) = registry
        .type_lang(project)
        .with_context(|| format!("no projecttype/langcode known for {project}"))?;

    ArchiveMover::delete_by_list(
        &config.directories.media_root,
        &config.directories.archive_root,
        projecttype.as_str(),
        langcode.as_str(),
        &all_media_delete,
    )
    .with_context(|| format!("failed to archive deletes for {project}"))?;

    let project_media_dir = config.directories.media_root.join(projecttype.as_str()).join(langcode.as_str());
    let uploaded_media_base = format!(
        "{}/{}/{}",
        config.urls.uploaded_media_base.as_str(),
        projecttype.as_str(),
        langcode.as_str(),
    );
    mediasync_download::run(
        fetcher,
        RepoType::Local,
        &uploaded_media_base,
        &uploaded_toget,
        &project_media_dir,
        &working_dir,
        project.as_str(),
        Budget::new(config.limits.uploaded_download_cap),
    )
    .with_context(|| format!("failed to download uploaded media for {project}"))?;
    mediasync_download::run(
        fetcher,
        RepoType::Foreign,
        config.urls.foreignrepo_media_base.as_str(),
        &foreignrepo_toget,
        &project_media_dir,
        &working_dir,
        project.as_str(),
        Budget::new(config.limits.foreignrepo_download_cap),
    )
    .with_context(|| format!("failed to download foreign-repo media for {project}"))?;

    Ok(())
}

/// Archives any `<mediaroot>/<projecttype>/<langcode>` directory that is no
/// longer in the active+scheduled set and is not already empty.
fn archive_retired_projects(config: &Config, registry: &ProjectRegistry, todos: &[ProjectName]) -> Result<()> {
    let Ok(projecttype_entries) = std::fs::read_dir(&config.directories.media_root) else {
        return Ok(());
    };
    for projecttype_entry in projecttype_entries {
        let projecttype_entry = projecttype_entry?;
        if !projecttype_entry.file_type()?.is_dir() {
            continue;
        }
        let Some(projecttype_name) = projecttype_entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        let Ok(langcode_entries) = std::fs::read_dir(projecttype_entry.path()) else {
            continue;
        };
        for langcode_entry in langcode_entries {
            let langcode_entry = langcode_entry?;
            if !langcode_entry.file_type()?.is_dir() {
                continue;
            }
            let Some(langcode_name) = langcode_entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            let projecttype = ProjectType::new(projecttype_name.clone());
            let langcode = LangCode::new(langcode_name.clone());
            let project = registry.name_from_type_lang(&projecttype, &langcode);
            let still_wanted = registry.is_active(project.as_str()) || todos.contains(&project);
            if still_wanted {
                continue;
            }
            if MediaTree::project_is_empty(&langcode_entry.path())? {
                continue;
            }
            log::info!("archiving retired project {project}");
            let timestamp = ArchiveTimestamp::now_utc();
            ArchiveMover::archive_retired_project(
                &config.directories.media_root,
                &config.directories.archive_root,
                &projecttype_name,
                &langcode_name,
                &timestamp,
            )
            .with_context(|| format!("failed to archive retired project {project}"))?;
        }
    }
    Ok(())
}

/// `--continue`: resumes downloads only, against the most recent artifacts
/// found for each project (which may predate today, if a prior run was
/// interrupted), skipping inventory acquisition and reconciliation entirely.
fn resume_downloads(
    config: &Config,
    fetcher: &Fetcher,
    registry: &ProjectRegistry,
    todos: &[ProjectName],
    today: &str,
) -> Result<()> {
    let index = MostRecentIndex::build(&config.directories.lists_root, today, true)
        .context("failed to build most-recent-artifact index")?;

    for project in todos {
        let Some((projecttype, langcode)) = registry.type_lang(project) else {
            log::warn!("skipping resume for {project}: projecttype/langcode unknown");
            continue;
        };
        let project_media_dir = config.directories.media_root.join(projecttype.as_str()).join(langcode.as_str());
        let uploaded_media_base = format!(
            "{}/{}/{}",
            config.urls.uploaded_media_base.as_str(),
            projecttype.as_str(),
            langcode.as_str(),
        );

        resume_repo_type(
            config,
            fetcher,
            &index,
            project,
            RepoType::Local,
            &uploaded_media_base,
            &project_media_dir,
            config.limits.uploaded_download_cap,
        )?;
        resume_repo_type(
            config,
            fetcher,
            &index,
            project,
            RepoType::Foreign,
            config.urls.foreignrepo_media_base.as_str(),
            &project_media_dir,
            config.limits.foreignrepo_download_cap,
        )?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn resume_repo_type(
    config: &Config,
    fetcher: &Fetcher,
    index: &MostRecentIndex,
    project: &ProjectName,
    repo_type: RepoType,
    base_url: &str,
    project_media_dir: &std::path::Path,
    cap: u32,
) -> Result<()> {
    let Some(date) = index.most_recent_date_for(project, &repo_type.retrieved_artifact("")) else {
        log::info!("{project}: no prior {repo_type:?} retrieval journal, nothing to resume");
        return Ok(());
    };
    let working_dir = artifacts::working_dir(&config.directories.lists_root, date, project.as_str());
    let toget_path = working_dir.join(repo_type.toget_artifact(project.as_str()));

    let summary = mediasync_download::resume(
        fetcher,
        repo_type,
        base_url,
        &toget_path,
        project_media_dir,
        &working_dir,
        project.as_str(),
        Budget::new(cap),
    )
    .with_context(|| format!("failed to resume {repo_type:?} downloads for {project}"))?;
    log::info!("{project}: resumed {repo_type:?} from {date}: {summary:?}");
    Ok(())
}
