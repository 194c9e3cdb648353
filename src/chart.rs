//! SVG charts rendered from the summary table.
//!
//! Three figures: throughput per file size with error bars, an efficiency
//! bubble chart (throughput against CPU, bubble area from peak memory) and the
//! avalanche percentage per file size against the 45-55% band.

use crate::error::{BenchError, BenchResult};
use crate::hasher::HashAlgorithm;
use crate::report::ResultRow;
use crate::utils::size_label;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

const WIDTH: f64 = 1000.0;
const HEIGHT: f64 = 600.0;
const FONT: &str = "sans-serif";

pub const THROUGHPUT_CHART: &str = "01_throughput_comparison.svg";
pub const EFFICIENCY_CHART: &str = "02_efficiency_matrix.svg";
pub const AVALANCHE_CHART: &str = "03_avalanche_consistency.svg";

fn color(algo: HashAlgorithm) -> &'static str {
    match algo {
        HashAlgorithm::Sha256 => "#2ecc71",
        HashAlgorithm::Sha3_256 => "#e74c3c",
        HashAlgorithm::Blake2 => "#3498db",
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

struct Svg {
    body: String,
}

impl Svg {
    fn new() -> Self {
        let mut svg = Svg {
            body: String::new(),
        };
        svg.rect(0.0, 0.0, WIDTH, HEIGHT, "#ffffff", 1.0);
        svg
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: &str, opacity: f64) {
        let _ = writeln!(
            self.body,
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" fill-opacity="{}"/>"#,
            x, y, w.max(0.0), h.max(0.0), fill, opacity
        );
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: &str, width: f64, dashed: bool) {
        let dash = if dashed { r#" stroke-dasharray="6,4""# } else { "" };
        let _ = writeln!(
            self.body,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="{}"{}/>"#,
            x1, y1, x2, y2, stroke, width, dash
        );
    }

    fn circle(&mut self, cx: f64, cy: f64, r: f64, fill: &str, opacity: f64) {
        let _ = writeln!(
            self.body,
            r##"<circle cx="{:.1}" cy="{:.1}" r="{:.1}" fill="{}" fill-opacity="{}" stroke="#ffffff" stroke-width="2"/>"##,
            cx, cy, r, fill, opacity
        );
    }

    fn polyline(&mut self, points: &[(f64, f64)], stroke: &str) {
        let coords: Vec<String> = points
            .iter()
            .map(|(x, y)| format!("{:.1},{:.1}", x, y))
            .collect();
        let _ = writeln!(
            self.body,
            r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
            coords.join(" "),
            stroke
        );
    }

    fn text(&mut self, x: f64, y: f64, content: &str, size: u32, anchor: &str, bold: bool) {
        let weight = if bold { "bold" } else { "normal" };
        let _ = writeln!(
            self.body,
            r#"<text x="{:.1}" y="{:.1}" font-family="{}" font-size="{}" font-weight="{}" text-anchor="{}">{}</text>"#,
            x,
            y,
            FONT,
            size,
            weight,
            anchor,
            escape(content)
        );
    }

    fn vertical_text(&mut self, x: f64, y: f64, content: &str) {
        let _ = writeln!(
            self.body,
            r#"<text x="{:.1}" y="{:.1}" font-family="{}" font-size="13" font-weight="bold" text-anchor="middle" transform="rotate(-90 {:.1} {:.1})">{}</text>"#,
            x,
            y,
            FONT,
            x,
            y,
            escape(content)
        );
    }

    fn finish(self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n{}</svg>\n",
            self.body,
            w = WIDTH,
            h = HEIGHT
        )
    }
}

/// Plot rectangle and the value ranges mapped onto it.
struct Frame {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    x_range: (f64, f64),
    y_range: (f64, f64),
    y_inverted: bool,
}

impl Frame {
    fn new(x_range: (f64, f64), y_range: (f64, f64)) -> Self {
        Frame {
            left: 90.0,
            top: 70.0,
            width: WIDTH - 90.0 - 190.0,
            height: HEIGHT - 70.0 - 80.0,
            x_range,
            y_range,
            y_inverted: false,
        }
    }

    fn bottom(&self) -> f64 {
        self.top + self.height
    }

    fn x(&self, value: f64) -> f64 {
        let (lo, hi) = self.x_range;
        self.left + (value - lo) / (hi - lo) * self.width
    }

    fn y(&self, value: f64) -> f64 {
        let (lo, hi) = self.y_range;
        let t = (value - lo) / (hi - lo);
        if self.y_inverted {
            self.top + t * self.height
        } else {
            self.bottom() - t * self.height
        }
    }

    fn draw_axes(&self, svg: &mut Svg, title: &str, x_label: &str, y_label: &str) {
        svg.text(WIDTH / 2.0, 35.0, title, 16, "middle", true);
        svg.line(self.left, self.bottom(), self.left + self.width, self.bottom(), "#333333", 1.0, false);
        svg.line(self.left, self.top, self.left, self.bottom(), "#333333", 1.0, false);
        svg.text(
            self.left + self.width / 2.0,
            HEIGHT - 25.0,
            x_label,
            13,
            "middle",
            true,
        );
        svg.vertical_text(25.0, self.top + self.height / 2.0, y_label);
    }

    fn draw_y_ticks(&self, svg: &mut Svg, decimals: usize) {
        let (lo, hi) = self.y_range;
        for tick in ticks(lo, hi) {
            let y = self.y(tick);
            svg.line(self.left, y, self.left + self.width, y, "#e5e5e5", 1.0, false);
            svg.text(self.left - 8.0, y + 4.0, &format!("{:.*}", decimals, tick), 11, "end", false);
        }
    }

    fn draw_x_ticks(&self, svg: &mut Svg, decimals: usize) {
        let (lo, hi) = self.x_range;
        for tick in ticks(lo, hi) {
            let x = self.x(tick);
            svg.line(x, self.top, x, self.bottom(), "#e5e5e5", 1.0, false);
            svg.text(x, self.bottom() + 18.0, &format!("{:.*}", decimals, tick), 11, "middle", false);
        }
    }
}

/// Round tick positions covering `[lo, hi]`.
fn ticks(lo: f64, hi: f64) -> Vec<f64> {
    if !(hi > lo) || !lo.is_finite() || !hi.is_finite() {
        return vec![lo];
    }
    let raw = (hi - lo) / 6.0;
    let magnitude = 10f64.powf(raw.log10().floor());
    let normalized = raw / magnitude;
    let step = magnitude
        * if normalized < 1.5 {
            1.0
        } else if normalized < 3.0 {
            2.0
        } else if normalized < 7.0 {
            5.0
        } else {
            10.0
        };

    let mut out = Vec::new();
    let mut tick = (lo / step).ceil() * step;
    while tick <= hi + step * 1e-9 {
        out.push(tick);
        tick += step;
    }
    out
}

fn draw_legend(svg: &mut Svg, entries: &[(String, &str)]) {
    let x = WIDTH - 170.0;
    let mut y = 90.0;
    for (label, fill) in entries {
        svg.rect(x, y - 11.0, 14.0, 14.0, fill, 1.0);
        svg.text(x + 22.0, y, label, 12, "start", false);
        y += 24.0;
    }
}

/// Algorithms present in `rows`, in canonical order.
fn algorithms(rows: &[ResultRow]) -> Vec<HashAlgorithm> {
    HashAlgorithm::ALL
        .into_iter()
        .filter(|algo| rows.iter().any(|r| r.algorithm == *algo))
        .collect()
}

/// Distinct size labels ordered by file size.
fn size_groups(rows: &[ResultRow]) -> Vec<String> {
    let mut sized: Vec<(u64, String)> = rows
        .iter()
        .map(|r| (r.size_bytes, size_label(r.size_bytes)))
        .collect();
    sized.sort();
    let mut labels: Vec<String> = Vec::new();
    for (_, label) in sized {
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

fn find<'a>(rows: &'a [ResultRow], algo: HashAlgorithm, label: &str) -> Option<&'a ResultRow> {
    rows.iter()
        .find(|r| r.algorithm == algo && size_label(r.size_bytes) == label)
}

/// Throughput error derived from the relative spread of the timing.
fn throughput_error(row: &ResultRow) -> f64 {
    if row.mean_time > 0.0 {
        row.throughput_mbps * row.stdev_time / row.mean_time
    } else {
        0.0
    }
}

pub fn throughput_chart(rows: &[ResultRow]) -> String {
    let algos = algorithms(rows);
    let groups = size_groups(rows);

    let top = rows
        .iter()
        .map(|r| r.throughput_mbps + throughput_error(r))
        .fold(0.0, f64::max);
    let y_max = if top > 0.0 { top * 1.15 } else { 1.0 };

    let frame = Frame::new((0.0, groups.len().max(1) as f64), (0.0, y_max));

    let mut svg = Svg::new();
    frame.draw_y_ticks(&mut svg, 0);
    frame.draw_axes(
        &mut svg,
        "Throughput Comparison: SHA-256 vs SHA3-256 vs BLAKE2",
        "File Size",
        "Throughput (MB/s)",
    );

    let slot = frame.width / groups.len().max(1) as f64;
    let bar_width = slot * 0.8 / algos.len().max(1) as f64;

    for (g, label) in groups.iter().enumerate() {
        let group_left = frame.left + g as f64 * slot + slot * 0.1;
        svg.text(
            group_left + slot * 0.4,
            frame.bottom() + 20.0,
            label,
            12,
            "middle",
            false,
        );

        for (a, algo) in algos.iter().enumerate() {
            let Some(row) = find(rows, *algo, label) else {
                continue;
            };
            let x = group_left + a as f64 * bar_width;
            let y = frame.y(row.throughput_mbps);
            svg.rect(x, y, bar_width * 0.95, frame.bottom() - y, color(*algo), 1.0);

            let center = x + bar_width * 0.475;
            let err = throughput_error(row);
            if err > 0.0 {
                let lo = frame.y((row.throughput_mbps - err).max(0.0));
                let hi = frame.y(row.throughput_mbps + err);
                svg.line(center, lo, center, hi, "#333333", 1.0, false);
                svg.line(center - 4.0, hi, center + 4.0, hi, "#333333", 1.0, false);
                svg.line(center - 4.0, lo, center + 4.0, lo, "#333333", 1.0, false);
            }
            svg.text(
                center,
                frame.y(row.throughput_mbps + err) - 6.0,
                &format!("{:.0}", row.throughput_mbps),
                10,
                "middle",
                false,
            );
        }
    }

    let legend: Vec<(String, &str)> = algos
        .iter()
        .map(|a| (a.name().to_string(), color(*a)))
        .collect();
    draw_legend(&mut svg, &legend);
    svg.finish()
}

pub fn efficiency_chart(rows: &[ResultRow]) -> String {
    let algos = algorithms(rows);

    let x_max = rows.iter().map(|r| r.throughput_mbps).fold(0.0, f64::max);
    let y_max = rows.iter().map(|r| r.cpu_percent).fold(0.0, f64::max);
    let x_max = if x_max > 0.0 { x_max * 1.15 } else { 1.0 };
    let y_max = if y_max > 0.0 { (y_max * 1.15).min(100.0) } else { 1.0 };

    let mut frame = Frame::new((0.0, x_max), (0.0, y_max));
    frame.y_inverted = true;

    let mut svg = Svg::new();
    frame.draw_x_ticks(&mut svg, 0);
    frame.draw_y_ticks(&mut svg, 1);
    frame.draw_axes(
        &mut svg,
        "Efficiency Matrix: Speed vs Resource Usage",
        "Throughput (MB/s), further right is faster",
        "CPU Usage (%), lower is more efficient",
    );

    if !rows.is_empty() {
        let n = rows.len() as f64;
        let mean_x = rows.iter().map(|r| r.throughput_mbps).sum::<f64>() / n;
        let mean_y = rows.iter().map(|r| r.cpu_percent).sum::<f64>() / n;
        let (mx, my) = (frame.x(mean_x), frame.y(mean_y));
        svg.line(frame.left, my, frame.left + frame.width, my, "#999999", 1.0, true);
        svg.line(mx, frame.top, mx, frame.bottom(), "#999999", 1.0, true);
    }

    for algo in &algos {
        for row in rows.iter().filter(|r| r.algorithm == *algo) {
            let cx = frame.x(row.throughput_mbps);
            let cy = frame.y(row.cpu_percent);
            // Bubble area grows linearly with peak memory.
            let radius = ((row.peak_memory_mb * 2000.0).sqrt() / 2.0).clamp(4.0, 40.0);
            svg.circle(cx, cy, radius, color(*algo), 0.7);
            svg.text(cx + radius + 3.0, cy - 3.0, &size_label(row.size_bytes), 10, "start", false);
        }
    }

    let legend: Vec<(String, &str)> = algos
        .iter()
        .map(|a| (a.name().to_string(), color(*a)))
        .collect();
    draw_legend(&mut svg, &legend);
    svg.finish()
}

pub fn avalanche_chart(rows: &[ResultRow]) -> String {
    let algos = algorithms(rows);
    let groups = size_groups(rows);

    let lowest = rows.iter().map(|r| r.avalanche_pct).fold(40.0, f64::min);
    let highest = rows.iter().map(|r| r.avalanche_pct).fold(60.0, f64::max);
    let frame = Frame::new((0.0, groups.len().max(1) as f64), (lowest.floor(), highest.ceil()));

    let mut svg = Svg::new();
    frame.draw_y_ticks(&mut svg, 0);

    let band_top = frame.y(55.0);
    svg.rect(frame.left, band_top, frame.width, frame.y(45.0) - band_top, "#2ecc71", 0.1);
    let target = frame.y(50.0);
    svg.line(frame.left, target, frame.left + frame.width, target, "#ff0000", 2.0, true);

    frame.draw_axes(
        &mut svg,
        "Avalanche Effect Consistency: Hash Diffusion Quality",
        "File Size",
        "Avalanche Effect (%)",
    );

    let slot = frame.width / groups.len().max(1) as f64;
    let center_of = |g: usize| frame.left + (g as f64 + 0.5) * slot;
    for (g, label) in groups.iter().enumerate() {
        svg.text(center_of(g), frame.bottom() + 20.0, label, 12, "middle", false);
    }

    for algo in &algos {
        let points: Vec<(f64, f64, f64)> = groups
            .iter()
            .enumerate()
            .filter_map(|(g, label)| {
                find(rows, *algo, label).map(|r| (center_of(g), frame.y(r.avalanche_pct), r.avalanche_pct))
            })
            .collect();

        let line: Vec<(f64, f64)> = points.iter().map(|(x, y, _)| (*x, *y)).collect();
        svg.polyline(&line, color(*algo));
        for (x, y, value) in &points {
            svg.circle(*x, *y, 6.0, color(*algo), 1.0);
            svg.text(*x, *y - 12.0, &format!("{:.1}%", value), 10, "middle", false);
        }
    }

    let mut legend: Vec<(String, &str)> = algos
        .iter()
        .map(|a| (a.name().to_string(), color(*a)))
        .collect();
    legend.push(("Ideal target (50%)".to_string(), "#ff0000"));
    legend.push(("Ideal range (45-55%)".to_string(), "#c8f0d8"));
    draw_legend(&mut svg, &legend);
    svg.finish()
}

/// Writes the three charts into `out_dir` and returns their paths.
pub fn render_charts<P: AsRef<Path>>(rows: &[ResultRow], out_dir: P) -> BenchResult<Vec<PathBuf>> {
    if rows.is_empty() {
        return Err(BenchError::validation("summary table has no rows to chart"));
    }

    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir).map_err(|e| BenchError::io(out_dir, e))?;

    let charts = [
        (THROUGHPUT_CHART, throughput_chart(rows)),
        (EFFICIENCY_CHART, efficiency_chart(rows)),
        (AVALANCHE_CHART, avalanche_chart(rows)),
    ];

    let mut written = Vec::with_capacity(charts.len());
    for (name, content) in charts {
        let path = out_dir.join(name);
        fs::write(&path, content).map_err(|e| BenchError::io(&path, e))?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(size_mb: u64, algorithm: HashAlgorithm, throughput: f64, avalanche: f64) -> ResultRow {
        ResultRow {
            filename: format!("test_{}MB.dat", size_mb),
            size_bytes: size_mb * 1024 * 1024,
            algorithm,
            mean_time: size_mb as f64 / throughput,
            stdev_time: 0.0001,
            throughput_mbps: throughput,
            cpu_percent: 25.0,
            peak_memory_mb: 0.0079,
            avalanche_pct: avalanche,
        }
    }

    fn sample_rows() -> Vec<ResultRow> {
        vec![
            row(1, HashAlgorithm::Sha256, 400.0, 50.39),
            row(1, HashAlgorithm::Blake2, 700.0, 49.8),
            row(1024, HashAlgorithm::Sha256, 410.0, 48.05),
            row(1024, HashAlgorithm::Blake2, 720.0, 51.17),
        ]
    }

    #[test]
    fn test_ticks_are_round() {
        assert_eq!(ticks(0.0, 60.0), vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
        assert_eq!(ticks(40.0, 60.0), vec![40.0, 45.0, 50.0, 55.0, 60.0]);
        assert_eq!(ticks(5.0, 5.0), vec![5.0]);
    }

    #[test]
    fn test_size_groups_ordered_by_bytes() {
        let mut rows = sample_rows();
        rows.reverse();
        assert_eq!(size_groups(&rows), vec!["1 MB", "1 GB"]);
        assert_eq!(
            algorithms(&rows),
            vec![HashAlgorithm::Sha256, HashAlgorithm::Blake2]
        );
    }

    #[test]
    fn test_charts_contain_expected_marks() {
        let rows = sample_rows();

        let throughput = throughput_chart(&rows);
        assert!(throughput.starts_with("<svg"));
        assert_eq!(throughput.matches("fill=\"#2ecc71\"").count(), 3); // 2 bars + legend
        assert!(throughput.contains(">720<"));

        let efficiency = efficiency_chart(&rows);
        assert_eq!(efficiency.matches("<circle").count(), 4);
        assert!(efficiency.contains("stroke-dasharray"));

        let avalanche = avalanche_chart(&rows);
        assert_eq!(avalanche.matches("<polyline").count(), 2);
        assert!(avalanche.contains(">51.2%<"));
        assert!(avalanche.contains("Ideal range (45-55%)"));
    }

    #[test]
    fn test_render_charts_writes_three_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("charts");
        let written = render_charts(&sample_rows(), &out)?;
        assert_eq!(written.len(), 3);
        for path in written {
            assert!(fs::read_to_string(path)?.ends_with("</svg>\n"));
        }
        Ok(())
    }

    #[test]
    fn test_render_charts_rejects_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        assert!(render_charts(&[], dir.path().join("charts")).is_err());
        assert!(!dir.path().join("charts").exists());
    }
}
