//! Cumulative flow reconstruction from snapshot tables.
//!
//! A [`SeriesMatrix`] holds one row per selected status, in stacking order,
//! and one column per snapshot date, in file order. Layer `i` is drawn at
//! the cumulative sum of rows `0..=i`.

use chrono::NaiveDate;

use crate::error::{Result, StatsError};
use crate::snapshot::SnapshotTable;
use crate::status::{StatusCatalog, StatusId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesMatrix {
    /// Selected status ids in stacking order
    pub status_ids: Vec<StatusId>,
    /// Column names from the snapshot header, aligned with `status_ids`
    pub labels: Vec<String>,
    pub dates: Vec<NaiveDate>,
    /// `rows[layer][column]`
    pub rows: Vec<Vec<u64>>,
}

impl SeriesMatrix {
    /// Stack the selected statuses out of a loaded table.
    ///
    /// Each selected id is resolved to its status name through `catalog` and
    /// located by that name in the table's header. A status whose name has no
    /// column means the selection and the stored schema disagree; that is
    /// reported, never patched up.
    pub fn build(
        table: &SnapshotTable,
        selection: &[StatusId],
        catalog: &StatusCatalog,
    ) -> Result<Self> {
        let columns = table.status_names.len();
        let mut labels = Vec::with_capacity(selection.len());
        let mut rows = Vec::with_capacity(selection.len());

        for &id in selection {
            let index = catalog
                .name_for(id)
                .and_then(|name| table.status_names.iter().position(|c| c == name))
                .ok_or(StatsError::StatusNotInData { id, columns })?;
            labels.push(table.status_names[index].clone());
            let row = table
                .rows
                .iter()
                .map(|r| r.counts.get(index).copied())
                .collect::<Option<Vec<u64>>>()
                .ok_or(StatsError::StatusNotInData { id, columns })?;
            rows.push(row);
        }

        Ok(Self {
            status_ids: selection.to_vec(),
            labels,
            dates: table.dates(),
            rows,
        })
    }

    pub fn layer_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.dates.len()
    }

    /// Drawn height of `layer` at `column`: sum of rows `0..=layer`.
    pub fn stacked_height(&self, layer: usize, column: usize) -> u64 {
        self.rows
            .iter()
            .take(layer + 1)
            .map(|row| row.get(column).copied().unwrap_or(0))
            .sum()
    }

    /// Every layer's drawn heights, bottom layer first.
    pub fn cumulative(&self) -> Vec<Vec<u64>> {
        (0..self.layer_count())
            .map(|layer| {
                (0..self.column_count())
                    .map(|col| self.stacked_height(layer, col))
                    .collect()
            })
            .collect()
    }

    pub fn column_total(&self, column: usize) -> u64 {
        match self.layer_count() {
            0 => 0,
            n => self.stacked_height(n - 1, column),
        }
    }

    pub fn max_total(&self) -> u64 {
        (0..self.column_count())
            .map(|col| self.column_total(col))
            .max()
            .unwrap_or(0)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacePoint {
    pub date: NaiveDate,
    pub value: u64,
}

/// Straight line from the first recorded value to the target value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdealPaceLine {
    pub start: PacePoint,
    pub end: PacePoint,
}

/// Flat continuation of the target layer past the last snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatExtension {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub value: u64,
}

/// Non-fatal findings while computing the pace line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaceWarning {
    TargetBeforeFirstDate { target: NaiveDate, first: NaiveDate },
}

impl std::fmt::Display for PaceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TargetBeforeFirstDate { target, first } => write!(
                f,
                "target date {target} is before the first recorded date {first}"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdealPace {
    pub line: IdealPaceLine,
    pub extension: Option<FlatExtension>,
    pub warnings: Vec<PaceWarning>,
}

/// Project the pace needed for `target_layer` to reach its final value by
/// `target_date`.
///
/// `start` is the stacked height of everything below the target layer at the
/// first date; `end` is the stacked height up to and including the target
/// layer at the last date. A layer index outside the selection is fatal. A
/// target date before the first snapshot is only a warning.
pub fn compute_ideal_pace(
    matrix: &SeriesMatrix,
    target_layer: usize,
    target_date: NaiveDate,
) -> Result<IdealPace> {
    let layers = matrix.layer_count();
    if target_layer >= layers {
        return Err(StatsError::InvalidTargetLayer {
            index: target_layer,
            layers,
        });
    }
    let (Some(first_date), Some(last_date)) = (matrix.first_date(), matrix.last_date()) else {
        return Err(StatsError::EmptySeries);
    };
    let last_column = matrix.column_count() - 1;

    let start_value = match target_layer {
        0 => 0,
        layer => matrix.stacked_height(layer - 1, 0),
    };
    let end_value = matrix.stacked_height(target_layer, last_column);

    let mut warnings = Vec::new();
    if target_date < first_date {
        let warning = PaceWarning::TargetBeforeFirstDate {
            target: target_date,
            first: first_date,
        };
        tracing::warn!(%warning, "ideal pace target precedes recorded data");
        warnings.push(warning);
    }

    let extension = (last_date < target_date).then_some(FlatExtension {
        from: last_date,
        to: target_date,
        value: end_value,
    });

    Ok(IdealPace {
        line: IdealPaceLine {
            start: PacePoint {
                date: first_date,
                value: start_value,
            },
            end: PacePoint {
                date: target_date,
                value: end_value,
            },
        },
        extension,
        warnings,
    })
}
