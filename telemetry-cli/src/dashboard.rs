//! Console dashboard panels
//!
//! Each panel is a render target: the poller hands it a fresh publication
//! after every successful cycle and the panel redraws itself as text.

use std::io::{self, Write};
use telemetry_core::{CanonicalField, Publication, RenderTarget, Result, TelemetryError};

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const GAUGE_WIDTH: usize = 20;

/// Where panels write their text
pub type Output = Box<dyn Write + Send>;

/// Format an optional reading, falling back to `absent`
pub fn fmt_reading(value: Option<f64>, absent: &str) -> String {
    match value {
        Some(v) => format!("{}", v),
        None => absent.to_string(),
    }
}

fn write_panel(out: &mut Output, name: &str, text: &str) -> Result<()> {
    out.write_all(text.as_bytes())
        .and_then(|_| out.flush())
        .map_err(|e| TelemetryError::Render {
            target: name.to_string(),
            message: e.to_string(),
        })
}

/// Last update, row count, leak status and the latest readings
pub struct OverviewPanel {
    out: Output,
}

impl OverviewPanel {
    pub fn new(out: Output) -> Self {
        Self { out }
    }

    pub fn render(publication: &Publication) -> String {
        let mut text = format!(
            "── Overview ── last update {} · {} rows\n",
            publication.published_at.format("%Y-%m-%d %H:%M:%S"),
            publication.row_count()
        );

        let Some(latest) = &publication.latest else {
            text.push_str("  no readings yet\n");
            return text;
        };

        let (leak, pill) = if latest.leak {
            ("Detected", "Leak: YES")
        } else {
            ("None", "Leak: NO")
        };
        text.push_str(&format!("  Leak       {:<10} [{}]\n", leak, pill));
        text.push_str(&format!("  pH         {}\n", fmt_reading(latest.ph, "--")));
        text.push_str(&format!("  Salinity   {}\n", fmt_reading(latest.salinity, "--")));
        text.push_str(&format!("  Pressure   {}\n", fmt_reading(latest.pressure, "--")));
        text.push_str(&format!("  Turbidity  {}\n", fmt_reading(latest.turbidity, "--")));
        text
    }
}

impl RenderTarget for OverviewPanel {
    fn name(&self) -> &str {
        "overview"
    }

    fn update(&mut self, publication: &Publication) -> Result<()> {
        write_panel(&mut self.out, "overview", &Self::render(publication))
    }
}

/// Half-donut speed gauge, drawn as a bar
pub struct SpeedGauge {
    out: Output,
}

impl SpeedGauge {
    pub fn new(out: Output) -> Self {
        Self { out }
    }

    pub fn render(publication: &Publication) -> String {
        let [speed, _rest] = publication.speed_gauge();
        let filled = ((speed.clamp(0.0, 100.0) / 100.0) * GAUGE_WIDTH as f64).round() as usize;
        format!(
            "  Speed      [{}{}] {}%\n",
            "#".repeat(filled),
            "-".repeat(GAUGE_WIDTH - filled),
            speed
        )
    }
}

impl RenderTarget for SpeedGauge {
    fn name(&self) -> &str {
        "speed-gauge"
    }

    fn update(&mut self, publication: &Publication) -> Result<()> {
        write_panel(&mut self.out, "speed-gauge", &Self::render(publication))
    }
}

/// Rolling trend of one metric over the trend window
pub struct TrendPanel {
    field: CanonicalField,
    title: &'static str,
    name: String,
    out: Output,
}

impl TrendPanel {
    pub fn new(field: CanonicalField, title: &'static str, out: Output) -> Self {
        Self {
            field,
            title,
            name: format!("{}-trend", field),
            out,
        }
    }

    pub fn render(&self, publication: &Publication) -> String {
        let series = publication.trend_series(self.field);
        let Some((lo, hi)) = series.range() else {
            return format!("  {:<10} no data\n", self.title);
        };

        let spark: String = series
            .values
            .iter()
            .map(|v| match v {
                Some(v) => sparkline_char(*v, lo, hi),
                None => ' ',
            })
            .collect();

        format!(
            "  {:<10} {} (min {} max {} last {}, {} pts)\n",
            self.title,
            spark,
            lo,
            hi,
            fmt_reading(series.last_value(), "--"),
            series.values.len()
        )
    }
}

fn sparkline_char(value: f64, lo: f64, hi: f64) -> char {
    if hi <= lo {
        return SPARK_LEVELS[SPARK_LEVELS.len() / 2];
    }
    let scaled = (value - lo) / (hi - lo) * (SPARK_LEVELS.len() - 1) as f64;
    SPARK_LEVELS[(scaled.round() as usize).min(SPARK_LEVELS.len() - 1)]
}

impl RenderTarget for TrendPanel {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, publication: &Publication) -> Result<()> {
        let text = self.render(publication);
        write_panel(&mut self.out, &self.name, &text)
    }
}

/// Most recent records, newest first
pub struct RecordsTable {
    out: Output,
}

impl RecordsTable {
    pub fn new(out: Output) -> Self {
        Self { out }
    }

    pub fn render(publication: &Publication) -> String {
        let mut text = format!(
            "  {:<20} {:>8} {:>9} {:>9} {:>10} {:>5}\n",
            "Time", "pH", "Salinity", "Pressure", "Turbidity", "Leak"
        );
        for record in &publication.display_window {
            text.push_str(&format!(
                "  {:<20} {:>8} {:>9} {:>9} {:>10} {:>5}\n",
                record.timestamp,
                fmt_reading(record.ph, ""),
                fmt_reading(record.salinity, ""),
                fmt_reading(record.pressure, ""),
                fmt_reading(record.turbidity, ""),
                if record.leak { "YES" } else { "NO" }
            ));
        }
        text
    }
}

impl RenderTarget for RecordsTable {
    fn name(&self) -> &str {
        "records-table"
    }

    fn update(&mut self, publication: &Publication) -> Result<()> {
        write_panel(&mut self.out, "records-table", &Self::render(publication))
    }
}

/// The full dashboard layout, every panel writing through `make_out`
pub fn dashboard_targets<F>(mut make_out: F) -> Vec<Box<dyn RenderTarget>>
where
    F: FnMut() -> Output,
{
    vec![
        Box::new(OverviewPanel::new(make_out())),
        Box::new(SpeedGauge::new(make_out())),
        Box::new(TrendPanel::new(CanonicalField::Ph, "pH", make_out())),
        Box::new(TrendPanel::new(CanonicalField::Salinity, "Salinity", make_out())),
        Box::new(TrendPanel::new(CanonicalField::Pressure, "Pressure", make_out())),
        Box::new(TrendPanel::new(CanonicalField::Turbidity, "Turbidity", make_out())),
        Box::new(RecordsTable::new(make_out())),
    ]
}

/// Dashboard writing to stdout
pub fn stdout_targets() -> Vec<Box<dyn RenderTarget>> {
    dashboard_targets(|| Box::new(io::stdout()))
}
