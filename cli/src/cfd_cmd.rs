//! `cfd`: stack a snapshot file into a cumulative flow chart.

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Args;
use taiga_stats_core::{
    ChartOptions, SeriesMatrix, SnapshotStore, StatsError, StatusId, TagFilter,
    collect_annotations, compute_ideal_pace, render_svg, write_atomic,
};

use crate::config::RunConfig;

#[derive(Debug, Clone, Args)]
pub struct CfdArgs {
    /// Snapshot file to chart, by tag (`*` for all stories)
    #[arg(long, default_value = "*")]
    pub tag: String,

    /// Statuses to stack, comma separated, bottom layer last (default: all)
    #[arg(long, value_delimiter = ',', value_name = "ID,...")]
    pub status_ids: Option<Vec<StatusId>>,

    /// Draw the pace needed to finish the target layer by this date
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub target_date: Option<NaiveDate>,

    /// Layer index the pace line projects, 0 being the first stacked layer
    #[arg(long, requires = "target_date", value_name = "N")]
    pub target_layer: Option<usize>,

    /// Draw annotation callouts stored in the snapshot file
    #[arg(long)]
    pub annotations: bool,

    /// Write the chart here instead of next to the snapshot file
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub(crate) async fn run(config: &RunConfig, args: &CfdArgs) -> anyhow::Result<()> {
    let project_id = config.project_id()?;
    let client = crate::connect(config).await?;
    let catalog = client
        .statuses(project_id)
        .await
        .context("fetching statuses")?;

    // Reject unknown ids before any file is read.
    let selection = catalog.resolve_selection(args.status_ids.as_deref())?;

    let filter = TagFilter::parse(&args.tag);
    let store = SnapshotStore::new(&config.settings.output_dir);
    let table = store.load(&filter)?;
    if table.is_empty() {
        return Err(StatsError::EmptySeries.into());
    }
    let matrix = SeriesMatrix::build(&table, &selection, &catalog)?;
    tracing::info!(
        tag = %filter,
        layers = matrix.layer_count(),
        days = matrix.column_count(),
        "built series"
    );

    let pace = match args.target_date {
        Some(date) => Some(compute_ideal_pace(
            &matrix,
            args.target_layer.unwrap_or(0),
            date,
        )?),
        None => None,
    };
    let annotations = if args.annotations {
        collect_annotations(&table, &matrix)
    } else {
        Vec::new()
    };

    let options = ChartOptions {
        title: chart_title(&filter),
        ..ChartOptions::default()
    };
    let svg = render_svg(&matrix, &annotations, pace.as_ref(), &options);
    let path = args
        .output
        .clone()
        .unwrap_or_else(|| store.chart_path(&filter));
    write_atomic(&path, svg.as_bytes())?;
    tracing::info!(path = %path.display(), "wrote chart");
    println!("{}", path.display());
    Ok(())
}

fn chart_title(filter: &TagFilter) -> String {
    match filter {
        TagFilter::All => "Cumulative flow".to_string(),
        TagFilter::Tag(tag) => format!("Cumulative flow: {tag}"),
    }
}
