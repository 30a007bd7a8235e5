//! Dependency graph extraction and DOT serialization.
//!
//! Dependencies come from a free-text custom attribute holding a
//! comma-separated list of `#ref` tokens. Tokens are weak references: an edge
//! may point at a story that is not part of the current selection, or that
//! does not exist at all.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::error::{Result, StatsError};
use crate::item::Item;

/// A custom attribute definition on the project's story schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDef {
    pub id: i64,
    pub name: String,
}

/// Id of the attribute called `name`; its absence is a hard precondition
/// failure, not something to skip per item.
pub fn find_attribute(defs: &[AttributeDef], name: &str) -> Result<i64> {
    defs.iter()
        .find(|d| d.name == name)
        .map(|d| d.id)
        .ok_or_else(|| StatsError::MissingAttribute {
            name: name.to_string(),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeColor {
    Green,
    Black,
}

impl NodeColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Black => "black",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub reference: i64,
    pub label: String,
    pub color: NodeColor,
}

impl GraphNode {
    fn to_dot(&self) -> String {
        format!(
            "\"{}\" [label=\"{}\", color=\"{}\"]",
            self.reference,
            self.label,
            self.color.as_str()
        )
    }
}

/// `from` depends-on target → `to`. `from` is an opaque token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    pub from: String,
    pub to: i64,
}

impl GraphEdge {
    fn to_dot(&self) -> String {
        format!("\"{}\" -> \"{}\"", escape_label(&self.from), self.to)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GraphOptions {
    pub include_tags: bool,
    pub include_points: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    pub title: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl DependencyGraph {
    /// Build the graph for `items`.
    ///
    /// Nodes and edges come out deduplicated and sorted by their DOT text,
    /// so the same stories always give the same document whatever order the
    /// tracker returned them in.
    pub fn build<'a>(
        title: impl Into<String>,
        items: impl IntoIterator<Item = &'a Item>,
        depends_on_attribute: i64,
        options: GraphOptions,
    ) -> Self {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();

        for item in items {
            nodes.push(GraphNode {
                reference: item.reference,
                label: node_label(item, options),
                color: if item.is_closed {
                    NodeColor::Green
                } else {
                    NodeColor::Black
                },
            });

            if let Some(raw) = item.custom_attribute_values.get(&depends_on_attribute) {
                edges.extend(parse_dependency_tokens(raw).into_iter().map(|from| GraphEdge {
                    from,
                    to: item.reference,
                }));
            }
        }

        sort_dedup_by_text(&mut nodes, GraphNode::to_dot);
        sort_dedup_by_text(&mut edges, GraphEdge::to_dot);

        tracing::debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            "built dependency graph"
        );

        Self {
            title: title.into(),
            nodes,
            edges,
        }
    }

    /// Render as a Graphviz `digraph` document.
    pub fn to_dot(&self) -> String {
        let title = escape_label(&self.title);
        let mut out = String::new();
        let _ = writeln!(out, "digraph \"{title}\" {{");
        let _ = writeln!(out, "    label=\"{title}\"");
        let _ = writeln!(out, "    labelloc=\"t\"");
        let _ = writeln!(out);
        let _ = writeln!(out, "    // Edges");
        for edge in &self.edges {
            let _ = writeln!(out, "    {}", edge.to_dot());
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "    // Nodes");
        for node in &self.nodes {
            let _ = writeln!(out, "    {}", node.to_dot());
        }
        out.push_str("}\n");
        out
    }
}

/// Split a raw attribute value into referenced tokens.
///
/// Each comma-separated token is trimmed and loses one leading `#`; empty
/// tokens are dropped.
pub fn parse_dependency_tokens(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .map(|t| t.strip_prefix('#').unwrap_or(t))
        .map(strip_quotes)
        .filter(|t| !t.is_empty())
        .collect()
}

fn node_label(item: &Item, options: GraphOptions) -> String {
    let mut label = format!("#{} {}", item.reference, escape_label(&item.subject));
    if options.include_tags && !item.tags.is_empty() {
        let tags: Vec<String> = item.tags.iter().map(|t| escape_label(t)).collect();
        // Literal `\n`: a line break for Graphviz, not for the document.
        let _ = write!(label, "\\n[{}]", tags.join(", "));
    }
    if options.include_points {
        match item.total_points {
            Some(points) => {
                let _ = write!(label, "\\nPoints: {points}");
            }
            None => label.push_str("\\nPoints: -"),
        }
    }
    label
}

/// Double quotes would terminate the DOT string; backslashes would escape it.
fn escape_label(raw: &str) -> String {
    strip_quotes(raw)
        .replace('\\', "\\\\")
        .replace(['\n', '\r'], " ")
}

fn strip_quotes(raw: &str) -> String {
    raw.replace('"', "")
}

fn sort_dedup_by_text<T>(values: &mut Vec<T>, text: fn(&T) -> String) {
    let mut seen = BTreeSet::new();
    let mut keyed: Vec<(String, T)> = values
        .drain(..)
        .map(|v| (text(&v), v))
        .filter(|(k, _)| seen.insert(k.clone()))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    values.extend(keyed.into_iter().map(|(_, v)| v));
}
