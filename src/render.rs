//! PNG charts of experiment results.
//!
//! - Trials chart: exact and estimated distinct counts of every stream, with the
//!   theoretical `1.04/√M` and `1.3/√M` bands around the mean exact count.
//! - Summary chart: mean estimate over streams with a `± σ` band.

use std::path::Path;

use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::debug;

use crate::aggregate::{mean_exact, theory_bands, ErrorBand};
use crate::config::config_error;
use crate::error::{ExperimentError, Result};
use crate::records::{SummaryRecord, TrialGroups};

/// Figure size and resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartStyle {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width_in: 9.0,
            height_in: 5.0,
            dpi: 150,
        }
    }
}

impl ChartStyle {
    /// Image size in pixels
    pub fn pixel_size(&self) -> (u32, u32) {
        let dpi = f64::from(self.dpi);
        (
            (self.width_in * dpi).round() as u32,
            (self.height_in * dpi).round() as u32,
        )
    }

    /// Convert typographic points to pixels at this resolution
    fn pt(&self, points: f64) -> f64 {
        points * f64::from(self.dpi) / 72.0
    }

    pub fn validate(&self) -> Result<()> {
        let (width, height) = self.pixel_size();
        if self.dpi == 0 || width == 0 || height == 0 {
            return Err(config_error(format!(
                "figure of {}x{} in at {} dpi is empty",
                self.width_in, self.height_in, self.dpi
            )));
        }
        Ok(())
    }
}

/// Fill of the inner and outer theoretical bands
const BAND_COLORS: [RGBColor; 2] = [RGBColor(31, 119, 180), RGBColor(255, 127, 14)];
const BAND_ALPHA: [f64; 2] = [0.12, 0.08];
const BAND_SIGMA: RGBColor = RGBColor(31, 119, 180);
const SIGMA_ALPHA: f64 = 0.2;
const GRID_ALPHA: f64 = 0.3;

/// Axis ranges covering all plotted points, with some headroom above
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Bounds {
    pub fn fit(xs: impl IntoIterator<Item = f64>, ys: impl IntoIterator<Item = f64>) -> Self {
        let x_max = xs
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max);
        let (y_min, y_max) = ys
            .into_iter()
            .filter(|v| v.is_finite())
            .fold((0.0, 0.0), |(lo, hi): (f64, f64), v| (lo.min(v), hi.max(v)));
        let pad = (y_max - y_min).max(1.0) * 0.05;
        Self {
            x_max: if x_max > 0.0 { x_max } else { 1.0 },
            y_min: if y_min < 0.0 { y_min - pad } else { 0.0 },
            y_max: y_max + pad,
        }
    }
}

/// Draw the per-stream exact vs estimate chart and save it to `path`
pub fn render_trials_chart(
    path: &Path,
    groups: &TrialGroups,
    precision: u8,
    style: &ChartStyle,
) -> Result<()> {
    style.validate()?;
    let bands = mean_exact(groups)?.map(|mean| TheoryBands {
        items: mean.items.iter().map(|&v| v as f64).collect(),
        bands: theory_bands(&mean, precision),
    });

    let root = BitMapBackend::new(path, style.pixel_size()).into_drawing_area();
    draw_trials_chart(&root, groups, bands.as_ref(), style)
        .and_then(|_| root.present())
        .map_err(|e| render_error(path, e))?;
    debug!(path = %path.display(), streams = groups.len(), "trials chart saved");
    Ok(())
}

/// Draw the mean ± σ chart and save it to `path`
pub fn render_summary_chart(path: &Path, rows: &[SummaryRecord], style: &ChartStyle) -> Result<()> {
    style.validate()?;
    let root = BitMapBackend::new(path, style.pixel_size()).into_drawing_area();
    draw_summary_chart(&root, rows, style)
        .and_then(|_| root.present())
        .map_err(|e| render_error(path, e))?;
    debug!(path = %path.display(), steps = rows.len(), "summary chart saved");
    Ok(())
}

fn render_error<E: std::fmt::Display>(path: &Path, e: E) -> ExperimentError {
    ExperimentError::Render {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Theoretical bands around the mean exact count, on the mean item axis
struct TheoryBands {
    items: Vec<f64>,
    bands: [ErrorBand; 2],
}

type DrawResult<DB> = std::result::Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

fn draw_trials_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    groups: &TrialGroups,
    bands: Option<&TheoryBands>,
    style: &ChartStyle,
) -> DrawResult<DB> {
    let records = groups.values().flatten();
    let band_values = bands
        .into_iter()
        .flat_map(|t| t.bands.iter().flat_map(|band| band.high.iter().copied()));
    let bounds = Bounds::fit(
        records.clone().map(|r| r.items as f64),
        records
            .flat_map(|r| [r.exact as f64, r.estimate])
            .chain(band_values),
    );

    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(root)
        .caption("HyperLogLog estimate vs exact", ("sans-serif", style.pt(12.0)))
        .margin(style.pt(8.0) as u32)
        .x_label_area_size(style.pt(28.0) as u32)
        .y_label_area_size(style.pt(44.0) as u32)
        .build_cartesian_2d(0.0..bounds.x_max, bounds.y_min..bounds.y_max)?;

    configure_mesh(&mut chart, "processed items", "unique count", style)?;

    if let Some(theory) = bands {
        for ((band, color), alpha) in theory.bands.iter().zip(BAND_COLORS).zip(BAND_ALPHA) {
            let fill = color.mix(alpha).filled();
            chart
                .draw_series(std::iter::once(Polygon::new(
                    band_polygon(&theory.items, &band.low, &band.high),
                    fill,
                )))?
                .label(band.label())
                .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 24, y + 6)], fill));
        }
    }

    for (idx, (stream_id, records)) in groups.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let exact_style = color.stroke_width(2);
        chart
            .draw_series(LineSeries::new(
                records.iter().map(|r| (r.items as f64, r.exact as f64)),
                exact_style,
            ))?
            .label(format!("exact (stream {stream_id})"))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], exact_style));

        let estimate_style = color.stroke_width(1);
        chart
            .draw_series(DashedLineSeries::new(
                records.iter().map(|r| (r.items as f64, r.estimate)),
                6,
                4,
                estimate_style,
            ))?
            .label(format!("estimate (stream {stream_id})"))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], estimate_style));
    }

    draw_legend(&mut chart, style)
}

fn draw_summary_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    rows: &[SummaryRecord],
    style: &ChartStyle,
) -> DrawResult<DB> {
    let items: Vec<f64> = rows.iter().map(|r| r.items as f64).collect();
    let lower: Vec<f64> = rows.iter().map(SummaryRecord::lower).collect();
    let upper: Vec<f64> = rows.iter().map(SummaryRecord::upper).collect();
    let bounds = Bounds::fit(items.iter().copied(), lower.iter().chain(&upper).copied());

    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(root)
        .caption("HyperLogLog estimate statistics", ("sans-serif", style.pt(12.0)))
        .margin(style.pt(8.0) as u32)
        .x_label_area_size(style.pt(28.0) as u32)
        .y_label_area_size(style.pt(44.0) as u32)
        .build_cartesian_2d(0.0..bounds.x_max, bounds.y_min..bounds.y_max)?;

    configure_mesh(&mut chart, "processed items", "estimated unique count", style)?;

    let fill = BAND_SIGMA.mix(SIGMA_ALPHA).filled();
    chart
        .draw_series(std::iter::once(Polygon::new(
            band_polygon(&items, &lower, &upper),
            fill,
        )))?
        .label("E(Nt) ± σ")
        .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 24, y + 6)], fill));

    let mean_style = BAND_SIGMA.stroke_width(2);
    chart
        .draw_series(LineSeries::new(
            rows.iter().map(|r| (r.items as f64, r.mean)),
            mean_style,
        ))?
        .label("E(Nt)")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], mean_style));

    draw_legend(&mut chart, style)
}

type Chart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn configure_mesh<'a, DB: DrawingBackend + 'a>(
    chart: &mut Chart<'a, DB>,
    x_desc: &str,
    y_desc: &str,
    style: &ChartStyle,
) -> DrawResult<DB> {
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", style.pt(10.0)))
        .label_style(("sans-serif", style.pt(8.0)))
        .bold_line_style(BLACK.mix(GRID_ALPHA * 0.5))
        .light_line_style(BLACK.mix(GRID_ALPHA * 0.15))
        .x_label_formatter(&|v| format!("{v:.0}"))
        .y_label_formatter(&|v| format!("{v:.0}"))
        .draw()
}

fn draw_legend<'a, DB: DrawingBackend + 'a>(
    chart: &mut Chart<'a, DB>,
    style: &ChartStyle,
) -> DrawResult<DB> {
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .label_font(("sans-serif", style.pt(8.0)))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK.mix(0.3))
        .draw()
}

/// Closed outline of the area between `low` and `high`: upper edge left to right,
/// then lower edge right to left
pub fn band_polygon(xs: &[f64], low: &[f64], high: &[f64]) -> Vec<(f64, f64)> {
    let upper = xs.iter().copied().zip(high.iter().copied());
    let lower = xs.iter().copied().zip(low.iter().copied()).rev();
    upper.chain(lower).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{read_summary, read_trials};

    const TRIALS_CSV: &str = "\
stream_id,step_index,items,exact,estimate
0,0,500,497,489.25
0,1,1000,991,1012.5
1,0,500,496,503.0
1,1,1000,989,975.125
";

    const SUMMARY_CSV: &str = "\
step_index,items,mean_estimate,stddev_estimate
0,500,496.125,6.875
1,1000,993.813,18.688
";

    /// Width and height from the PNG IHDR chunk
    fn png_size(path: &Path) -> (u32, u32) {
        let bytes = std::fs::read(path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(&bytes[12..16], b"IHDR");
        let be = |at: usize| {
            let mut word = [0u8; 4];
            word.copy_from_slice(&bytes[at..at + 4]);
            u32::from_be_bytes(word)
        };
        (be(16), be(20))
    }

    #[test]
    fn test_render_trials_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph1.png");
        let groups = read_trials(TRIALS_CSV.as_bytes()).unwrap();
        render_trials_chart(&path, &groups, 10, &ChartStyle::default()).unwrap();
        assert_eq!(png_size(&path), (1350, 750));
    }

    #[test]
    fn test_render_summary_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph2.png");
        let rows = read_summary(SUMMARY_CSV.as_bytes()).unwrap();
        render_summary_chart(&path, &rows, &ChartStyle::default()).unwrap();
        assert_eq!(png_size(&path), (1350, 750));
    }

    #[test]
    fn test_render_header_only_files() {
        let dir = tempfile::tempdir().unwrap();
        let style = ChartStyle::default();

        let trials_png = dir.path().join("graph1.png");
        let header = "stream_id,step_index,items,exact,estimate\n";
        let groups = read_trials(header.as_bytes()).unwrap();
        assert!(groups.is_empty());
        render_trials_chart(&trials_png, &groups, 10, &style).unwrap();
        assert_eq!(png_size(&trials_png), (1350, 750));

        let summary_png = dir.path().join("graph2.png");
        let header = "step_index,items,mean_estimate,stddev_estimate\n";
        let rows = read_summary(header.as_bytes()).unwrap();
        assert!(rows.is_empty());
        render_summary_chart(&summary_png, &rows, &style).unwrap();
        assert_eq!(png_size(&summary_png), (1350, 750));
    }

    #[test]
    fn test_render_rejects_misaligned_streams() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph1.png");
        let csv = "\
stream_id,step_index,items,exact,estimate
0,0,10,10,10.0
0,1,20,19,19.5
1,0,10,10,9.5
";
        let groups = read_trials(csv.as_bytes()).unwrap();
        assert!(matches!(
            render_trials_chart(&path, &groups, 10, &ChartStyle::default()),
            Err(ExperimentError::StepCountMismatch { stream_id: 1, .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_default_pixel_size() {
        assert_eq!(ChartStyle::default().pixel_size(), (1350, 750));
    }

    #[test]
    fn test_invalid_style() {
        let style = ChartStyle {
            dpi: 0,
            ..ChartStyle::default()
        };
        assert!(style.validate().is_err());
    }

    #[test]
    fn test_band_polygon_order() {
        let polygon = band_polygon(&[1.0, 2.0, 3.0], &[0.5, 1.5, 2.5], &[1.5, 2.5, 3.5]);
        assert_eq!(
            polygon,
            vec![
                (1.0, 1.5),
                (2.0, 2.5),
                (3.0, 3.5),
                (3.0, 2.5),
                (2.0, 1.5),
                (1.0, 0.5)
            ]
        );
    }

    #[test]
    fn test_bounds_fit() {
        let bounds = Bounds::fit([10.0, 50_000.0], [0.0, 1000.0]);
        assert_eq!(bounds.x_max, 50_000.0);
        assert_eq!(bounds.y_min, 0.0);
        assert_eq!(bounds.y_max, 1050.0);
    }

    #[test]
    fn test_bounds_of_empty_data() {
        let bounds = Bounds::fit([0.0f64; 0], [0.0f64; 0]);
        assert_eq!(bounds.x_max, 1.0);
        assert_eq!(bounds.y_min, 0.0);
        assert_eq!(bounds.y_max, 0.05);
    }

    #[test]
    fn test_bounds_with_negative_lower_band() {
        let bounds = Bounds::fit([1.0], [-10.0, 90.0]);
        assert_eq!(bounds.y_min, -15.0);
        assert_eq!(bounds.y_max, 95.0);
    }
}
