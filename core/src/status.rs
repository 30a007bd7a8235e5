//! Workflow statuses and the project-wide status ordering.

use crate::error::{Result, StatsError};

/// Tracker-assigned status identifier.
pub type StatusId = i64;

/// A workflow stage with its display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub id: StatusId,
    pub name: String,
    pub order: i64,
}

impl Status {
    pub fn new(id: StatusId, name: impl Into<String>, order: i64) -> Self {
        Self {
            id,
            name: name.into(),
            order,
        }
    }
}

/// The statuses of one project, held in ascending `order`.
///
/// Sorting is stable, so statuses sharing an `order` keep the order the
/// tracker returned them in.
#[derive(Debug, Clone, Default)]
pub struct StatusCatalog {
    statuses: Vec<Status>,
}

impl StatusCatalog {
    pub fn new(mut statuses: Vec<Status>) -> Self {
        statuses.sort_by_key(|s| s.order);
        Self { statuses }
    }

    /// Statuses sorted ascending by `order`.
    pub fn list_ordered(&self) -> &[Status] {
        &self.statuses
    }

    pub fn ordered_ids(&self) -> Vec<StatusId> {
        self.statuses.iter().map(|s| s.id).collect()
    }

    pub fn ordered_names(&self) -> Vec<String> {
        self.statuses.iter().map(|s| s.name.clone()).collect()
    }

    pub fn id_for(&self, name: &str) -> Option<StatusId> {
        self.statuses.iter().find(|s| s.name == name).map(|s| s.id)
    }

    pub fn name_for(&self, id: StatusId) -> Option<&str> {
        self.statuses
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.name.as_str())
    }

    pub fn contains(&self, id: StatusId) -> bool {
        self.statuses.iter().any(|s| s.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    /// Resolve the stacking order of statuses.
    ///
    /// Without an explicit list every status is returned in descending
    /// `order`, so the earliest workflow stage ends up last. An explicit list
    /// is validated in full and then reversed verbatim.
    pub fn resolve_selection(&self, explicit: Option<&[StatusId]>) -> Result<Vec<StatusId>> {
        let Some(ids) = explicit else {
            let mut ids = self.ordered_ids();
            ids.reverse();
            return Ok(ids);
        };

        if let Some(&unknown) = ids.iter().find(|id| !self.contains(**id)) {
            return Err(StatsError::UnknownStatus {
                id: unknown,
                known: self.ordered_ids(),
            });
        }

        Ok(ids.iter().rev().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn catalog() -> StatusCatalog {
        StatusCatalog::new(vec![
            Status::new(30, "Done", 3),
            Status::new(10, "New", 1),
            Status::new(20, "In progress", 2),
        ])
    }

    #[test]
    fn list_ordered_sorts_by_order() {
        let catalog = catalog();
        let names: Vec<_> = catalog
            .list_ordered()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["New", "In progress", "Done"]);
    }

    #[test]
    fn equal_orders_keep_insertion_order() {
        let catalog = StatusCatalog::new(vec![
            Status::new(2, "B", 5),
            Status::new(1, "A", 5),
            Status::new(3, "C", 1),
        ]);
        assert_eq!(catalog.ordered_ids(), vec![3, 2, 1]);
    }

    #[test]
    fn name_and_id_lookups() {
        let catalog = catalog();
        assert_eq!(catalog.id_for("Done"), Some(30));
        assert_eq!(catalog.id_for("Archived"), None);
        assert_eq!(catalog.name_for(20), Some("In progress"));
        assert_eq!(catalog.name_for(99), None);
    }

    #[test]
    fn default_selection_is_descending_order() {
        let ids = catalog().resolve_selection(None).unwrap();
        assert_eq!(ids, vec![30, 20, 10]);
    }

    #[test]
    fn explicit_selection_is_reversed_verbatim() {
        let ids = catalog().resolve_selection(Some(&[10, 30])).unwrap();
        assert_eq!(ids, vec![30, 10]);
    }

    #[test]
    fn explicit_selection_with_unknown_id_fails() {
        let err = catalog().resolve_selection(Some(&[10, 77, 30])).unwrap_err();
        match err {
            StatsError::UnknownStatus { id, known } => {
                assert_eq!(id, 77);
                assert_eq!(known, vec![10, 20, 30]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
