//! Read-only listings: projects, statuses, points and tags.

use std::fmt::Write as _;

use anyhow::Context;
use clap::Args;
use taiga_stats_core::summary::{StatusSummary, points_by_status, tag_counts};
use taiga_stats_core::{TagFilter, select_items};
use taiga_stats_tracker::Project;

use crate::config::RunConfig;

#[derive(Debug, Clone, Args)]
pub struct TagArgs {
    /// Only count stories carrying this tag (`*` for all)
    #[arg(long, default_value = "*")]
    pub tag: String,
}

pub(crate) async fn run_projects(config: &RunConfig) -> anyhow::Result<()> {
    let client = crate::connect(config).await?;
    let projects = client.projects().await.context("fetching projects")?;
    print!("{}", format_projects(&projects));
    Ok(())
}

pub(crate) async fn run_statuses(config: &RunConfig) -> anyhow::Result<()> {
    let project_id = config.project_id()?;
    let client = crate::connect(config).await?;
    let catalog = client
        .statuses(project_id)
        .await
        .context("fetching statuses")?;
    let mut out = String::new();
    for status in catalog.list_ordered() {
        let _ = writeln!(out, "{}\t{}\t{}", status.id, status.order, status.name);
    }
    print!("{out}");
    Ok(())
}

pub(crate) async fn run_points(config: &RunConfig, args: &TagArgs) -> anyhow::Result<()> {
    let project_id = config.project_id()?;
    let client = crate::connect(config).await?;
    let catalog = client
        .statuses(project_id)
        .await
        .context("fetching statuses")?;
    let stories = client
        .stories(project_id)
        .await
        .context("fetching stories")?;

    let filter = TagFilter::parse(&args.tag);
    let selected = select_items(&stories, &filter)?;
    let summary = points_by_status(&catalog, &selected);
    print!("{}", format_points(&filter, &summary));
    Ok(())
}

pub(crate) async fn run_tags(config: &RunConfig) -> anyhow::Result<()> {
    let project_id = config.project_id()?;
    let client = crate::connect(config).await?;
    let stories = client
        .stories(project_id)
        .await
        .context("fetching stories")?;
    let all: Vec<_> = stories.iter().collect();
    let mut out = String::new();
    for (tag, count) in tag_counts(&all) {
        let _ = writeln!(out, "{tag}\t{count}");
    }
    print!("{out}");
    Ok(())
}

fn format_projects(projects: &[Project]) -> String {
    let mut out = String::new();
    for project in projects {
        let _ = writeln!(out, "{}\t{}\t{}", project.id, project.slug, project.name);
    }
    out
}

fn format_points(filter: &TagFilter, summary: &[StatusSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "tag: {filter}");
    let mut stories = 0;
    let mut points = 0.0;
    for row in summary {
        let _ = writeln!(out, "{}\t{}\t{}", row.name, row.stories, row.points);
        stories += row.stories;
        points += row.points;
    }
    let _ = writeln!(out, "total\t{stories}\t{points}");
    out
}
