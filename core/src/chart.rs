//! Stacked-area cumulative flow chart rendered as SVG.

use std::fmt::Write as _;

use chrono::NaiveDate;

use crate::series::{IdealPace, SeriesMatrix};
use crate::snapshot::SnapshotTable;

const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 220.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const Y_TICKS: u64 = 5;

const PALETTE: [&str; 10] = [
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1", "#ff9da7",
    "#9c755f", "#bab0ac",
];

#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: "Cumulative flow".to_string(),
            width: 1200,
            height: 700,
        }
    }
}

/// A callout anchored on the top edge of one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartAnnotation {
    pub date: NaiveDate,
    pub value: u64,
    pub text: String,
}

/// Callouts for every annotated row of `table`.
///
/// Each is placed at the drawn height of its annotation layer. Rows naming a
/// layer the selection does not have are skipped with a warning.
pub fn collect_annotations(table: &SnapshotTable, matrix: &SeriesMatrix) -> Vec<ChartAnnotation> {
    let mut out = Vec::new();
    for (column, row) in table.rows.iter().enumerate() {
        let Some(text) = row.annotation.as_deref() else {
            continue;
        };
        if row.annotation_layer >= matrix.layer_count() {
            tracing::warn!(
                date = %row.date,
                layer = row.annotation_layer,
                layers = matrix.layer_count(),
                "annotation layer outside selection, skipping"
            );
            continue;
        }
        out.push(ChartAnnotation {
            date: row.date,
            value: matrix.stacked_height(row.annotation_layer, column),
            text: text.to_string(),
        });
    }
    out
}

struct Frame {
    first: NaiveDate,
    span_days: f64,
    max_value: f64,
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
}

impl Frame {
    fn x(&self, date: NaiveDate) -> f64 {
        let days = (date - self.first).num_days() as f64;
        self.left + (self.right - self.left) * days / self.span_days
    }

    fn y(&self, value: u64) -> f64 {
        self.bottom - (self.bottom - self.top) * value as f64 / self.max_value
    }
}

/// Render the chart. Identical inputs give byte-identical output.
pub fn render_svg(
    matrix: &SeriesMatrix,
    annotations: &[ChartAnnotation],
    pace: Option<&IdealPace>,
    options: &ChartOptions,
) -> String {
    let width = f64::from(options.width);
    let height = f64::from(options.height);
    let frame = frame_for(matrix, pace, width, height);
    let cumulative = matrix.cumulative();

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="12">"#,
        w = options.width,
        h = options.height
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" font-size="18" text-anchor="middle">{}</text>"#,
        width / 2.0,
        MARGIN_TOP / 2.0 + 6.0,
        escape_xml(&options.title)
    );

    // Upper layers first; each lower layer paints over the one above it.
    for (layer, heights) in cumulative.iter().enumerate().rev() {
        if heights.is_empty() {
            continue;
        }
        let mut points: Vec<String> = matrix
            .dates
            .iter()
            .zip(heights)
            .map(|(date, value)| format!("{:.1},{:.1}", frame.x(*date), frame.y(*value)))
            .collect();
        if let (Some(first), Some(last)) = (matrix.first_date(), matrix.last_date()) {
            points.push(format!("{:.1},{:.1}", frame.x(last), frame.y(0)));
            points.push(format!("{:.1},{:.1}", frame.x(first), frame.y(0)));
        }
        let _ = writeln!(
            svg,
            r#"<polygon points="{}" fill="{}" stroke="{}" stroke-width="1"/>"#,
            points.join(" "),
            color(layer),
            color(layer)
        );
    }

    write_axes(&mut svg, matrix, pace, &frame);

    if let Some(pace) = pace {
        let _ = writeln!(
            svg,
            r#"<line class="ideal-pace" x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="black" stroke-width="2" stroke-dasharray="8,4"/>"#,
            frame.x(pace.line.start.date),
            frame.y(pace.line.start.value),
            frame.x(pace.line.end.date),
            frame.y(pace.line.end.value)
        );
        if let Some(ext) = pace.extension {
            let _ = writeln!(
                svg,
                r#"<line class="pace-extension" x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="dimgray" stroke-width="2" stroke-dasharray="2,3"/>"#,
                frame.x(ext.from),
                frame.y(ext.value),
                frame.x(ext.to),
                frame.y(ext.value)
            );
        }
    }

    for note in annotations {
        let (x, y) = (frame.x(note.date), frame.y(note.value));
        let _ = writeln!(
            svg,
            r#"<circle class="annotation" cx="{x:.1}" cy="{y:.1}" r="4" fill="black"/>"#
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}">{}</text>"#,
            x + 6.0,
            y - 6.0,
            escape_xml(&note.text)
        );
    }

    write_legend(&mut svg, matrix, &frame);
    svg.push_str("</svg>\n");
    svg
}

fn frame_for(matrix: &SeriesMatrix, pace: Option<&IdealPace>, width: f64, height: f64) -> Frame {
    let mut dates = matrix.dates.clone();
    let mut max_value = matrix.max_total();
    if let Some(pace) = pace {
        dates.extend([pace.line.start.date, pace.line.end.date]);
        max_value = max_value.max(pace.line.start.value).max(pace.line.end.value);
        if let Some(ext) = pace.extension {
            dates.push(ext.to);
        }
    }
    let first = dates.iter().min().copied().unwrap_or_default();
    let last = dates.iter().max().copied().unwrap_or_default();
    let span_days = ((last - first).num_days() as f64).max(1.0);

    Frame {
        first,
        span_days,
        max_value: (max_value as f64).max(1.0),
        left: MARGIN_LEFT,
        right: (width - MARGIN_RIGHT).max(MARGIN_LEFT + 1.0),
        top: MARGIN_TOP,
        bottom: (height - MARGIN_BOTTOM).max(MARGIN_TOP + 1.0),
    }
}

fn write_axes(svg: &mut String, matrix: &SeriesMatrix, pace: Option<&IdealPace>, frame: &Frame) {
    let _ = writeln!(
        svg,
        r#"<line x1="{l:.1}" y1="{b:.1}" x2="{r:.1}" y2="{b:.1}" stroke="black"/>"#,
        l = frame.left,
        r = frame.right,
        b = frame.bottom
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{l:.1}" y1="{t:.1}" x2="{l:.1}" y2="{b:.1}" stroke="black"/>"#,
        l = frame.left,
        t = frame.top,
        b = frame.bottom
    );

    let max = frame.max_value as u64;
    let step = max.div_ceil(Y_TICKS).max(1);
    let mut tick = 0;
    while tick <= max {
        let y = frame.y(tick);
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{tick}</text>"#,
            frame.left - 8.0,
            y + 4.0
        );
        tick += step;
    }

    let mut labelled: Vec<NaiveDate> = Vec::new();
    labelled.extend(matrix.first_date());
    labelled.extend(matrix.last_date());
    if let Some(pace) = pace {
        labelled.push(pace.line.end.date);
    }
    labelled.sort();
    labelled.dedup();
    for date in labelled {
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            frame.x(date),
            frame.bottom + 20.0,
            date.format("%Y-%m-%d")
        );
    }
}

fn write_legend(svg: &mut String, matrix: &SeriesMatrix, frame: &Frame) {
    let x = frame.right + 20.0;
    for (layer, label) in matrix.labels.iter().enumerate() {
        let y = frame.top + 20.0 * layer as f64;
        let _ = writeln!(
            svg,
            r#"<rect x="{x:.1}" y="{y:.1}" width="14" height="14" fill="{}"/>"#,
            color(layer)
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}">{}</text>"#,
            x + 20.0,
            y + 11.0,
            escape_xml(label)
        );
    }
}

fn color(layer: usize) -> &'static str {
    PALETTE[layer % PALETTE.len()]
}

fn escape_xml(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::compute_ideal_pace;
    use crate::snapshot::SnapshotRow;
    use crate::status::{Status, StatusCatalog};
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn table() -> SnapshotTable {
        SnapshotTable {
            status_names: vec!["New".into(), "Done".into()],
            rows: vec![
                SnapshotRow::plain(day(1), vec![5, 0]),
                SnapshotRow {
                    date: day(2),
                    annotation: Some("Demo <1>".into()),
                    annotation_layer: 1,
                    counts: vec![3, 2],
                },
                SnapshotRow::plain(day(3), vec![1, 4]),
            ],
        }
    }

    fn catalog() -> StatusCatalog {
        StatusCatalog::new(vec![Status::new(1, "New", 1), Status::new(2, "Done", 2)])
    }

    fn matrix() -> SeriesMatrix {
        SeriesMatrix::build(&table(), &[2, 1], &catalog()).unwrap()
    }

    #[test]
    fn annotations_sit_on_their_layer() {
        let notes = collect_annotations(&table(), &matrix());
        assert_eq!(
            notes,
            vec![ChartAnnotation {
                date: day(2),
                value: 5,
                text: "Demo <1>".into(),
            }]
        );
    }

    #[test]
    fn annotations_outside_selection_are_skipped() {
        let single = SeriesMatrix::build(&table(), &[2], &catalog()).unwrap();
        assert!(collect_annotations(&table(), &single).is_empty());
    }

    #[test]
    fn svg_has_one_polygon_per_layer_and_legend() {
        let svg = render_svg(&matrix(), &[], None, &ChartOptions::default());
        assert!(svg.starts_with("<svg "));
        assert!(svg.ends_with("</svg>\n"));
        assert_eq!(svg.matches("<polygon").count(), 2);
        assert!(svg.contains(">Done</text>"));
        assert!(svg.contains(">New</text>"));
        assert!(!svg.contains("ideal-pace"));
    }

    #[test]
    fn svg_draws_pace_extension_and_escaped_annotations() {
        let matrix = matrix();
        let pace = compute_ideal_pace(&matrix, 0, day(10)).unwrap();
        let notes = collect_annotations(&table(), &matrix);
        let svg = render_svg(&matrix, &notes, Some(&pace), &ChartOptions::default());
        assert!(svg.contains("class=\"ideal-pace\""));
        assert!(svg.contains("class=\"pace-extension\""));
        assert!(svg.contains("Demo &lt;1&gt;"));
        assert!(svg.contains(">2024-03-10</text>"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let matrix = matrix();
        let pace = compute_ideal_pace(&matrix, 1, day(5)).unwrap();
        let a = render_svg(&matrix, &[], Some(&pace), &ChartOptions::default());
        let b = render_svg(&matrix, &[], Some(&pace), &ChartOptions::default());
        assert_eq!(a, b);
    }
}
