//! SVG figures drawn with plotters.

use crate::stats::descriptive::quantile_sorted;
use crate::stats::OddsRatio;
use anyhow::{anyhow, Result};
use plotters::prelude::*;
use std::path::Path;
use tracing::debug;

const DARK_BLUE: RGBColor = RGBColor(0, 0, 139);
const GREY: RGBColor = RGBColor(128, 128, 128);
const DARK_GREY: RGBColor = RGBColor(169, 169, 169);
const LIGHT_BLUE: RGBColor = RGBColor(173, 216, 230);

fn plot_err<E: std::fmt::Display>(e: E) -> anyhow::Error {
    anyhow!("Plotting failed: {}", e)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Split a polyline into alternating dash segments of roughly `dash` length.
fn dashes(points: &[(f64, f64)], dash: f64) -> Vec<Vec<(f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    let mut drawn = 0.0;
    let mut on = true;

    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let length = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
        if length == 0.0 {
            continue;
        }
        let mut t = 0.0;
        while length - t > 1e-12 {
            let step = (dash - drawn).min(length - t);
            let start = (a.0 + (b.0 - a.0) * t / length, a.1 + (b.1 - a.1) * t / length);
            let end_t = t + step;
            let end = (
                a.0 + (b.0 - a.0) * end_t / length,
                a.1 + (b.1 - a.1) * end_t / length,
            );
            if on {
                if current.is_empty() {
                    current.push(start);
                }
                current.push(end);
            }
            drawn += step;
            t = end_t;
            if drawn >= dash - 1e-12 {
                if on && !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                on = !on;
                drawn = 0.0;
            }
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// One model's ROC curve.
#[derive(Debug, Clone)]
pub struct RocSeries<'a> {
    pub name: &'a str,
    pub points: &'a [(f64, f64)],
    pub auc: f64,
}

/// ROC curves of the clinical (dashed grey) and structural (solid dark
/// blue) models with the chance diagonal.
pub fn roc_figure(
    path: &Path,
    title: &str,
    clinical: &RocSeries,
    structural: &RocSeries,
) -> Result<()> {
    ensure_parent(path)?;
    let root = SVGBackend::new(path, (600, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 18))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0f64..1.0f64, 0.0f64..1.0f64)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("False Positive Rate")
        .y_desc("True Positive Rate")
        .draw()
        .map_err(plot_err)?;

    for segment in dashes(&[(0.0, 0.0), (1.0, 1.0)], 0.01) {
        chart
            .draw_series(std::iter::once(PathElement::new(segment, BLACK.mix(0.3))))
            .map_err(plot_err)?;
    }

    for segment in dashes(clinical.points, 0.03) {
        chart
            .draw_series(std::iter::once(PathElement::new(segment, GREY.stroke_width(2))))
            .map_err(plot_err)?;
    }
    chart
        .draw_series(std::iter::once(PathElement::new(Vec::<(f64, f64)>::new(), GREY)))
        .map_err(plot_err)?
        .label(format!("{} (AUC={:.2})", clinical.name, clinical.auc))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GREY.stroke_width(2)));

    chart
        .draw_series(LineSeries::new(
            structural.points.iter().copied(),
            DARK_BLUE.stroke_width(3),
        ))
        .map_err(plot_err)?
        .label(format!("{} (AUC={:.2})", structural.name, structural.auc))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], DARK_BLUE.stroke_width(3)));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    debug!("Saved figure {}", path.display());
    Ok(())
}

/// Box statistics: quartiles, Tukey whiskers and outliers.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    /// `None` for an empty sample. Whiskers reach the most extreme values
    /// within 1.5 IQR of the box.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let q1 = quantile_sorted(&sorted, 0.25);
        let median = quantile_sorted(&sorted, 0.5);
        let q3 = quantile_sorted(&sorted, 0.75);
        let iqr = q3 - q1;
        let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        let inside: Vec<f64> = sorted
            .iter()
            .copied()
            .filter(|v| *v >= lo_fence && *v <= hi_fence)
            .collect();
        let outliers = sorted
            .iter()
            .copied()
            .filter(|v| *v < lo_fence || *v > hi_fence)
            .collect();

        Some(Self {
            q1,
            median,
            q3,
            lower_whisker: inside.first().copied().unwrap_or(q1),
            upper_whisker: inside.last().copied().unwrap_or(q3),
            outliers,
        })
    }
}

fn padded_range(min: f64, max: f64) -> (f64, f64) {
    let span = (max - min).abs().max(1e-9);
    (min - span * 0.08, max + span * 0.08)
}

/// One box per group, with an optional horizontal reference line.
pub fn box_plot(
    path: &Path,
    title: &str,
    y_desc: &str,
    groups: &[(String, Vec<f64>)],
    reference: Option<(f64, &str)>,
) -> Result<()> {
    let boxes: Vec<(&str, BoxStats)> = groups
        .iter()
        .filter_map(|(label, values)| BoxStats::from_values(values).map(|b| (label.as_str(), b)))
        .collect();
    if boxes.is_empty() {
        return Err(anyhow!("No data to plot for {}", title));
    }

    let mut y_min = boxes
        .iter()
        .flat_map(|(_, b)| b.outliers.iter().copied().chain([b.lower_whisker]))
        .fold(f64::INFINITY, f64::min);
    let mut y_max = boxes
        .iter()
        .flat_map(|(_, b)| b.outliers.iter().copied().chain([b.upper_whisker]))
        .fold(f64::NEG_INFINITY, f64::max);
    if let Some((value, _)) = reference {
        y_min = y_min.min(value);
        y_max = y_max.max(value);
    }
    let (y_lo, y_hi) = padded_range(y_min, y_max);
    let n = boxes.len() as f64;

    ensure_parent(path)?;
    let root = SVGBackend::new(path, (500, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 18))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..(n - 0.5), y_lo..y_hi)
        .map_err(plot_err)?;

    let labels: Vec<&str> = boxes.iter().map(|(label, _)| *label).collect();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(boxes.len())
        .x_label_formatter(&|val: &f64| {
            let idx = val.round();
            if idx >= 0.0 && (idx as usize) < labels.len() && (val - idx).abs() < 1e-6 {
                labels[idx as usize].to_string()
            } else {
                String::new()
            }
        })
        .y_desc(y_desc)
        .draw()
        .map_err(plot_err)?;

    for (i, (_, stats)) in boxes.iter().enumerate() {
        let x = i as f64;
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(x - 0.3, stats.q1), (x + 0.3, stats.q3)],
                LIGHT_BLUE.filled(),
            )))
            .map_err(plot_err)?;
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(x - 0.3, stats.q1), (x + 0.3, stats.q3)],
                BLACK.stroke_width(1),
            )))
            .map_err(plot_err)?;

        let lines = [
            vec![(x - 0.3, stats.median), (x + 0.3, stats.median)],
            vec![(x, stats.q3), (x, stats.upper_whisker)],
            vec![(x, stats.q1), (x, stats.lower_whisker)],
            vec![(x - 0.12, stats.upper_whisker), (x + 0.12, stats.upper_whisker)],
            vec![(x - 0.12, stats.lower_whisker), (x + 0.12, stats.lower_whisker)],
        ];
        for line in lines {
            chart
                .draw_series(std::iter::once(PathElement::new(line, BLACK.stroke_width(1))))
                .map_err(plot_err)?;
        }

        chart
            .draw_series(
                stats
                    .outliers
                    .iter()
                    .map(|v| Circle::new((x, *v), 3, BLACK.stroke_width(1))),
            )
            .map_err(plot_err)?;
    }

    if let Some((value, label)) = reference {
        for segment in dashes(&[(-0.5, value), (n - 0.5, value)], 0.08) {
            chart
                .draw_series(std::iter::once(PathElement::new(segment, RED.stroke_width(2))))
                .map_err(plot_err)?;
        }
        chart
            .draw_series(std::iter::once(Text::new(
                label.to_string(),
                (-0.45, value + (y_hi - y_lo) * 0.02),
                ("sans-serif", 12).into_font().color(&RED),
            )))
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;
    debug!("Saved figure {}", path.display());
    Ok(())
}

/// One forest plot row: a parameter measured at both sites.
#[derive(Debug, Clone)]
pub struct ForestRow {
    pub label: String,
    pub radius: OddsRatio,
    pub tibia: OddsRatio,
}

/// Odds ratios with 95% CI whiskers, radius above tibia on each row, and a
/// vertical line at OR = 1.
pub fn forest_plot(path: &Path, title: &str, x_desc: &str, rows: &[ForestRow]) -> Result<()> {
    if rows.is_empty() {
        return Err(anyhow!("No odds ratios to plot"));
    }

    let x_max = rows
        .iter()
        .flat_map(|r| [r.radius.upper, r.tibia.upper])
        .filter(|v| v.is_finite())
        .fold(1.0f64, f64::max);
    let x_min = rows
        .iter()
        .flat_map(|r| [r.radius.lower, r.tibia.lower])
        .filter(|v| v.is_finite())
        .fold(1.0f64, f64::min);
    let (x_lo, x_hi) = padded_range(x_min.min(0.0), x_max);
    let n = rows.len() as f64;

    ensure_parent(path)?;
    let root = SVGBackend::new(path, (900, 650)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 18))
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(120)
        .build_cartesian_2d(x_lo..x_hi, -0.5f64..(n - 0.5))
        .map_err(plot_err)?;

    let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(rows.len())
        .y_label_formatter(&|val: &f64| {
            let idx = val.round();
            if idx >= 0.0 && (idx as usize) < labels.len() && (val - idx).abs() < 1e-6 {
                labels[idx as usize].to_string()
            } else {
                String::new()
            }
        })
        .x_desc(x_desc)
        .draw()
        .map_err(plot_err)?;

    for segment in dashes(&[(1.0, -0.5), (1.0, n - 0.5)], 0.05) {
        chart
            .draw_series(std::iter::once(PathElement::new(segment, RED.mix(0.7).stroke_width(2))))
            .map_err(plot_err)?;
    }

    let sites = [(0.15, BLACK, "Distal Radius"), (-0.15, DARK_GREY, "Distal Tibia")];
    for (offset, color, name) in sites {
        let points: Vec<(f64, OddsRatio)> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let or = if offset > 0.0 { r.radius } else { r.tibia };
                (i as f64 + offset, or)
            })
            .collect();

        for (y, or) in &points {
            let whisker = vec![(or.lower, *y), (or.upper, *y)];
            chart
                .draw_series(std::iter::once(PathElement::new(whisker, color.stroke_width(2))))
                .map_err(plot_err)?;
            for cap in [or.lower, or.upper] {
                chart
                    .draw_series(std::iter::once(PathElement::new(
                        vec![(cap, y - 0.05), (cap, y + 0.05)],
                        color.stroke_width(2),
                    )))
                    .map_err(plot_err)?;
            }
        }

        chart
            .draw_series(
                points
                    .iter()
                    .map(|(y, or)| Circle::new((or.estimate, *y), 6, color.filled())),
            )
            .map_err(plot_err)?
            .label(name)
            .legend(move |(x, y)| Circle::new((x + 10, y), 5, color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    debug!("Saved figure {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn or(estimate: f64) -> OddsRatio {
        OddsRatio {
            estimate,
            lower: estimate * 0.6,
            upper: estimate * 1.5,
            p_value: 0.02,
        }
    }

    #[test]
    fn test_box_stats() {
        let stats = BoxStats::from_values(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(stats.q1, 2.0);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.q3, 4.0);
        assert_eq!(stats.lower_whisker, 1.0);
        assert_eq!(stats.upper_whisker, 4.0);
        assert_eq!(stats.outliers, vec![100.0]);
        assert!(BoxStats::from_values(&[]).is_none());
    }

    #[test]
    fn test_dashes_cover_half_the_line() {
        let segments = dashes(&[(0.0, 0.0), (1.0, 0.0)], 0.1);
        assert_eq!(segments.len(), 5);
        let drawn: f64 = segments
            .iter()
            .map(|s| s.last().unwrap().0 - s.first().unwrap().0)
            .sum();
        assert!((drawn - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_roc_figure_writes_svg() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("figures").join("roc.svg");
        let clinical = [(0.0, 0.0), (0.4, 0.6), (1.0, 1.0)];
        let structural = [(0.0, 0.0), (0.1, 0.7), (1.0, 1.0)];
        roc_figure(
            &path,
            "Diagnostic Performance",
            &RocSeries {
                name: "Clinical Model",
                points: &clinical,
                auc: 0.6,
            },
            &RocSeries {
                name: "Structural Model",
                points: &structural,
                auc: 0.8,
            },
        )
        .unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Structural Model (AUC=0.80)"));
    }

    #[test]
    fn test_box_plot_writes_svg() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("box.svg");
        let groups = vec![
            ("Co".to_string(), vec![-1.0, -1.5, -0.5, -2.0]),
            ("Fx".to_string(), vec![-2.2, -2.8, -1.9]),
            ("DM".to_string(), vec![]),
        ];
        let reference = Some((-2.5, "Osteoporosis (-2.5)"));
        box_plot(&path, "T-score", "T-Score", &groups, reference).unwrap();
        assert!(path.exists());

        let empty = vec![("Co".to_string(), vec![])];
        assert!(box_plot(&path, "T", "T", &empty, None).is_err());
    }

    #[test]
    fn test_forest_plot_writes_svg() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("forest.svg");
        let rows = vec![
            ForestRow {
                label: "Tb.N".to_string(),
                radius: or(2.1),
                tibia: or(1.7),
            },
            ForestRow {
                label: "Ct.Po".to_string(),
                radius: or(1.2),
                tibia: or(0.9),
            },
        ];
        forest_plot(&path, "Fracture Risk", "Odds Ratio (95% CI)", &rows).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("Distal Radius"));
        assert!(forest_plot(&path, "x", "x", &[]).is_err());
    }
}
