//! Per-status and per-tag aggregates over a set of stories.

use std::collections::BTreeMap;

use crate::item::Item;
use crate::status::{StatusCatalog, StatusId};

#[derive(Debug, Clone, PartialEq)]
pub struct StatusSummary {
    pub status_id: StatusId,
    pub name: String,
    pub stories: usize,
    pub points: f64,
}

/// Story count and point sum for every catalog status, ascending order.
/// Stories without an estimate count as zero points.
pub fn points_by_status(catalog: &StatusCatalog, items: &[&Item]) -> Vec<StatusSummary> {
    catalog
        .list_ordered()
        .iter()
        .map(|status| {
            let in_status = items.iter().filter(|i| i.status == status.id);
            let (stories, points) = in_status.fold((0, 0.0), |(n, p), i| {
                (n + 1, p + i.total_points.unwrap_or(0.0))
            });
            StatusSummary {
                status_id: status.id,
                name: status.name.clone(),
                stories,
                points,
            }
        })
        .collect()
}

/// Number of stories in each catalog status, keyed by status name.
///
/// Every catalog status appears, with zero when it holds no stories.
pub fn counts_by_status_name(catalog: &StatusCatalog, items: &[&Item]) -> BTreeMap<String, u64> {
    let mut counts: BTreeMap<String, u64> = catalog
        .list_ordered()
        .iter()
        .map(|s| (s.name.clone(), 0))
        .collect();
    for item in items {
        match catalog.name_for(item.status) {
            Some(name) => *counts.entry(name.to_string()).or_default() += 1,
            None => tracing::debug!(
                reference = item.reference,
                status = item.status,
                "story status not in catalog"
            ),
        }
    }
    counts
}

/// Stories per tag, sorted by tag name.
pub fn tag_counts(items: &[&Item]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for tag in items.iter().flat_map(|i| i.tags.iter()) {
        *counts.entry(tag.clone()).or_default() += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;
    use pretty_assertions::assert_eq;

    fn catalog() -> StatusCatalog {
        StatusCatalog::new(vec![Status::new(2, "Done", 2), Status::new(1, "New", 1)])
    }

    fn story(reference: i64, status: StatusId, points: Option<f64>, tags: &[&str]) -> Item {
        Item {
            reference,
            status,
            total_points: points,
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            ..Item::default()
        }
    }

    #[test]
    fn points_follow_catalog_order() {
        let items = [
            story(1, 1, Some(3.0), &[]),
            story(2, 2, Some(5.0), &[]),
            story(3, 1, None, &[]),
        ];
        let refs: Vec<&Item> = items.iter().collect();
        let summary = points_by_status(&catalog(), &refs);
        assert_eq!(
            summary,
            vec![
                StatusSummary {
                    status_id: 1,
                    name: "New".into(),
                    stories: 2,
                    points: 3.0,
                },
                StatusSummary {
                    status_id: 2,
                    name: "Done".into(),
                    stories: 1,
                    points: 5.0,
                },
            ]
        );
    }

    #[test]
    fn counts_include_empty_statuses() {
        let items = [story(1, 2, None, &[]), story(2, 42, None, &[])];
        let refs: Vec<&Item> = items.iter().collect();
        let counts = counts_by_status_name(&catalog(), &refs);
        assert_eq!(
            counts,
            BTreeMap::from([("Done".to_string(), 1), ("New".to_string(), 0)])
        );
    }

    #[test]
    fn tags_are_counted_per_story() {
        let items = [
            story(1, 1, None, &["ui", "api"]),
            story(2, 1, None, &["ui"]),
        ];
        let refs: Vec<&Item> = items.iter().collect();
        assert_eq!(
            tag_counts(&refs),
            BTreeMap::from([("api".to_string(), 1), ("ui".to_string(), 2)])
        );
    }
}
