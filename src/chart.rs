//! Renders the summary table as a self-contained interactive HTML chart:
//! a horizontal grouped bar per (treatment group, gender) with the delta,
//! its two-decimal display form, and the percentile shift in the hover text.
//!
//! plotly.js is embedded in the artifact, so the file is viewable offline.

use itertools::Itertools;
use plotly::common::{DashType, Font, HoverInfo, Marker, Orientation, Title};
use plotly::layout::{
    Annotation, Axis, BarMode, CategoryOrder, Legend, Margin, Shape, ShapeLine, ShapeType,
};
use plotly::{Bar, Layout, Plot};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use crate::types::{Gender, SummaryRow, TreatmentGroup};

const FEMALE_COLOR: &str = "#D4AF37";
const MALE_COLOR: &str = "#2E5E4E";
const REFERENCE_COLOR: &str = "#8C8C8C";

const CHART_TITLE: &str = "Cash That Heals: Mental wellbeing by gender and transfer type";
const FOOTNOTE: &str = "Note: A z-score change of 0.25 corresponds to a shift from the 50th to roughly the 60th percentile in psychological wellbeing.";

fn gender_color(gender: Gender) -> &'static str {
    match gender {
        Gender::Female => FEMALE_COLOR,
        Gender::Male => MALE_COLOR,
    }
}

/// Display order for the y axis: groups sorted ascending by their Female
/// delta, groups without a Female row last. This keeps the visual ranking
/// stable across runs of identical input.
pub fn group_display_order(rows: &[SummaryRow]) -> Vec<String> {
    let female_delta = |group: TreatmentGroup| {
        rows.iter()
            .find(|r| r.group == group && r.gender == Gender::Female)
            .map(|r| r.delta)
    };

    let mut groups: Vec<TreatmentGroup> = rows.iter().map(|r| r.group).unique().collect();
    groups.sort_by(|a, b| match (female_delta(*a), female_delta(*b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    groups.into_iter().map(|g| g.label().to_string()).collect()
}

fn hover_text(row: &SummaryRow) -> String {
    format!(
        "Group: {}<br>Gender: {}<br>Δ z-score: {}<br>Approx. percentile shift: {}",
        row.group, row.gender, row.delta_display, row.percentile_shift
    )
}

/// Builds the figure: one bar trace per gender, grouped by treatment group,
/// with an optional dashed reference line at the whole-sample average delta.
pub fn build_chart(rows: &[SummaryRow], avg_delta: Option<f64>) -> Plot {
    let group_order = group_display_order(rows);

    let mut plot = Plot::new();
    for gender in Gender::ALL {
        let mut deltas = Vec::new();
        let mut labels = Vec::new();
        let mut hovers = Vec::new();
        for label in &group_order {
            let Some(row) = rows
                .iter()
                .find(|r| r.group.label() == label && r.gender == gender)
            else {
                continue;
            };
            deltas.push(row.delta);
            labels.push(label.clone());
            hovers.push(hover_text(row));
        }

        let trace = Bar::new(deltas, labels)
            .name(gender.label())
            .orientation(Orientation::Horizontal)
            .marker(Marker::new().color(gender_color(gender)))
            .hover_text_array(hovers)
            .hover_info(HoverInfo::Text);
        plot.add_trace(trace);
    }

    let mut layout = Layout::new()
        .title(Title::with_text(CHART_TITLE))
        .bar_mode(BarMode::Group)
        .bar_gap(0.3)
        .width(1200)
        .height(525)
        .x_axis(Axis::new().title(Title::with_text(
            "Change in Psychological Wellbeing Index (Δ z-score)",
        )))
        .y_axis(
            Axis::new()
                .title(Title::with_text("Treatment Group"))
                .category_order(CategoryOrder::Array)
                .category_array(group_order),
        )
        .legend(Legend::new().title(Title::with_text("Gender")))
        .margin(Margin::new().top(100).bottom(140).left(120).right(80));

    let mut annotations = vec![
        Annotation::new()
            .text(FOOTNOTE)
            .x_ref("paper")
            .y_ref("paper")
            .x(0.5)
            .y(-0.28)
            .show_arrow(false)
            .font(Font::new().size(13)),
    ];

    if let Some(avg) = avg_delta {
        layout = layout.shapes(vec![
            Shape::new()
                .shape_type(ShapeType::Line)
                .x_ref("x")
                .y_ref("paper")
                .x0(avg)
                .x1(avg)
                .y0(0.0)
                .y1(1.0)
                .line(
                    ShapeLine::new()
                        .color(REFERENCE_COLOR)
                        .width(1.5)
                        .dash(DashType::Dash),
                ),
        ]);
        annotations.push(
            Annotation::new()
                .text(format!("Avg Δ = {avg:.4}"))
                .x(avg)
                .y(1.04)
                .y_ref("paper")
                .show_arrow(false)
                .font(Font::new().size(11).color(REFERENCE_COLOR)),
        );
    }

    layout = layout.annotations(annotations);
    plot.set_layout(layout);
    plot
}

/// Writes the finished figure as a single self-contained HTML file.
pub fn write_chart(
    rows: &[SummaryRow],
    avg_delta: Option<f64>,
    path: &Path,
) -> std::io::Result<()> {
    let plot = build_chart(rows, avg_delta);
    fs::write(path, plot.to_html())
}
