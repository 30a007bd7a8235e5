//! `store-daily`: append today's per-status counts to each tag's snapshot file.

use anyhow::Context;
use chrono::NaiveDate;
use chrono::Utc;
use clap::Args;
use taiga_stats_core::summary::counts_by_status_name;
use taiga_stats_core::{SnapshotStore, TagFilter, select_items};

use crate::config::RunConfig;

#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    /// Tag filter to snapshot; repeat for several files (`*` for all stories)
    #[arg(long = "tag", value_name = "TAG", default_value = "*")]
    pub tags: Vec<String>,

    /// Record the row under this date instead of today (UTC)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,
}

/// Append one row per tag filter.
///
/// Every filter is checked against the fetched stories before the first
/// file is touched, so a bad tag leaves all snapshot files unchanged.
pub(crate) async fn run(config: &RunConfig, args: &StoreArgs) -> anyhow::Result<()> {
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

    let mut filters: Vec<TagFilter> = Vec::with_capacity(args.tags.len());
    for raw in &args.tags {
        let filter = TagFilter::parse(raw);
        if !filters.contains(&filter) {
            filters.push(filter);
        }
    }

    let mut batches = Vec::with_capacity(filters.len());
    for filter in &filters {
        let selected = select_items(&stories, filter)?;
        batches.push((filter, counts_by_status_name(&catalog, &selected)));
    }

    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
    let store = SnapshotStore::new(&config.settings.output_dir);
    let names = catalog.ordered_names();

    for (filter, counts) in batches {
        store.ensure_schema(filter, &names)?;
        let row = store.append(filter, date, &counts)?;
        println!(
            "{}\t{}",
            store.data_path(filter).display(),
            row.counts
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join("\t")
        );
    }
    Ok(())
}
