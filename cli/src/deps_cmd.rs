//! `deps`: emit the story dependency graph as Graphviz DOT.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use taiga_stats_core::{
    DependencyGraph, GraphOptions, Item, StatusId, TagFilter, find_attribute, select_items,
    write_atomic,
};

use crate::config::RunConfig;

#[derive(Debug, Clone, Args)]
pub struct DepsArgs {
    /// Only stories carrying this tag (`*` for all)
    #[arg(long, default_value = "*")]
    pub tag: String,

    /// Only stories in these statuses, comma separated
    #[arg(long, value_delimiter = ',', value_name = "ID,...")]
    pub status_ids: Option<Vec<StatusId>>,

    /// Append the story's tags to its label
    #[arg(long)]
    pub include_tags: bool,

    /// Append the story's points to its label
    #[arg(long)]
    pub include_points: bool,

    /// Keep closed stories (default)
    #[arg(long, overrides_with = "exclude_closed")]
    pub include_closed: bool,

    /// Drop closed stories
    #[arg(long, overrides_with = "include_closed")]
    pub exclude_closed: bool,

    /// Write the DOT document here instead of stdout
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub(crate) async fn run(config: &RunConfig, args: &DepsArgs) -> anyhow::Result<()> {
    let project_id = config.project_id()?;
    let client = crate::connect(config).await?;
    let catalog = client
        .statuses(project_id)
        .await
        .context("fetching statuses")?;
    let status_filter: Option<BTreeSet<StatusId>> = match &args.status_ids {
        Some(ids) => Some(
            catalog
                .resolve_selection(Some(ids.as_slice()))?
                .into_iter()
                .collect(),
        ),
        None => None,
    };

    let attributes = client
        .custom_attributes(project_id)
        .await
        .context("fetching custom attributes")?;
    let depends_on = find_attribute(&attributes, &config.settings.dependency_attribute)?;

    let project = client
        .project(project_id)
        .await
        .context("fetching project")?;
    let stories = client
        .stories(project_id)
        .await
        .context("fetching stories")?;
    let filter = TagFilter::parse(&args.tag);
    let mut items = keep_items(
        select_items(&stories, &filter)?,
        status_filter.as_ref(),
        !args.exclude_closed,
    );
    tracing::info!(tag = %filter, stories = items.len(), "selected stories");
    client
        .load_attribute_values(&mut items)
        .await
        .context("fetching custom attribute values")?;

    let graph = DependencyGraph::build(
        format!("{} dependencies", project.name),
        &items,
        depends_on,
        GraphOptions {
            include_tags: args.include_tags,
            include_points: args.include_points,
        },
    );
    let dot = graph.to_dot();

    match &args.output {
        Some(path) => {
            write_atomic(path, dot.as_bytes())?;
            tracing::info!(path = %path.display(), "wrote dependency graph");
        }
        None => print!("{dot}"),
    }
    Ok(())
}

fn keep_items(
    selected: Vec<&Item>,
    statuses: Option<&BTreeSet<StatusId>>,
    include_closed: bool,
) -> Vec<Item> {
    selected
        .into_iter()
        .filter(|item| statuses.is_none_or(|ids| ids.contains(&item.status)))
        .filter(|item| include_closed || !item.is_closed)
        .cloned()
        .collect()
}
