//! ### Graph
//! Renders the views produced by the `selection` module as PNGs: a
//! choropleth of mean load, the load time series, and the daily band.

use crate::compute::{DailyAggregate, RegionMean};
use crate::convert::{LoadPoint, TimeAxis};
use crate::geo::{Bounds, GeoBoundaries};
use crate::region::RegionRegistry;
use crate::selection::{BaseTables, Views};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use plotters::backend::BitMapBackend;
use plotters::chart::ChartBuilder;
use plotters::chart::SeriesLabelPosition;
use plotters::drawing::IntoDrawingArea;
use plotters::element::PathElement;
use plotters::element::Polygon;
use plotters::prelude::Rectangle;
use plotters::series::LineSeries;
use plotters::style::Color;
use plotters::style::RGBColor;
use plotters::style::BLACK;
use plotters::style::WHITE;
use std::path::Path;

/// One color per registry slot, cycled past eight regions.
const REGION_COLORS: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(23, 190, 207),
];

const LOW_LOAD: RGBColor = RGBColor(255, 237, 160);
const HIGH_LOAD: RGBColor = RGBColor(189, 0, 38);
const NO_DATA: RGBColor = RGBColor(200, 200, 200);

/// Rough New England extent, used when there's no geometry at all.
const FALLBACK_BOUNDS: Bounds = Bounds {
    lon_min: -73.8,
    lon_max: -66.8,
    lat_min: 40.9,
    lat_max: 47.5,
};

pub struct Graphing<'a> {
    path: &'a Path,
}

impl<'a> Graphing<'a> {
    const CHART_COLOR: RGBColor = WHITE;

    pub fn new(path: &'a Path) -> Self {
        Graphing { path }
    }

    /// Polygons shaded by mean load. Boundaries with no matching region
    /// are drawn grey; regions with no boundary are simply absent.
    pub fn choropleth(
        &self,
        summary: &[RegionMean],
        boundaries: &GeoBoundaries,
        title: &str,
    ) -> anyhow::Result<()> {
        let root = BitMapBackend::new(self.path, (1080, 1080)).into_drawing_area();
        root.fill(&Self::CHART_COLOR)?;

        let bounds = boundaries.bounds().unwrap_or(FALLBACK_BOUNDS);
        let pad = 0.2;
        let lo = summary
            .iter()
            .map(|m| m.mean_load_mw)
            .fold(f64::INFINITY, f64::min);
        let hi = summary
            .iter()
            .map(|m| m.mean_load_mw)
            .fold(f64::NEG_INFINITY, f64::max);
        let caption = if summary.is_empty() {
            format!("{title} (no data)")
        } else {
            format!("{title} ({lo:.0} to {hi:.0} MW)")
        };

        let mut chart = ChartBuilder::on(&root)
            .x_label_area_size(48)
            .y_label_area_size(60)
            .margin(20)
            .caption(caption, ("sans-serif", 32.))
            .build_cartesian_2d(
                (bounds.lon_min - pad)..(bounds.lon_max + pad),
                (bounds.lat_min - pad)..(bounds.lat_max + pad),
            )?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .x_desc("Longitude")
            .y_desc("Latitude")
            .axis_desc_style(("sans-serif", 20))
            .x_label_formatter(&|lon| format!("{lon:.1}"))
            .y_label_formatter(&|lat| format!("{lat:.1}"))
            .x_label_style(("sans-serif", 14))
            .y_label_style(("sans-serif", 14))
            .draw()?;

        for (name, shape) in boundaries.iter() {
            let fill = summary
                .iter()
                .find(|m| m.region == name)
                .map_or(NO_DATA, |m| shade(m.mean_load_mw, lo, hi));
            chart.draw_series(
                shape
                    .exteriors()
                    .map(|ring| Polygon::new(ring.clone(), fill.filled())),
            )?;
            chart.draw_series(
                shape
                    .exteriors()
                    .map(|ring| PathElement::new(ring.clone(), BLACK.stroke_width(1))),
            )?;
        }

        for unmapped in summary.iter().filter(|m| boundaries.get(&m.region).is_none()) {
            log::debug!("{} has no boundary, left off the map", unmapped.region);
        }

        root.present()?;
        Ok(())
    }

    /// One line per region present in `points`, colored by registry slot.
    pub fn time_series(
        &self,
        points: &[&LoadPoint],
        registry: &RegionRegistry,
        time_axis: TimeAxis,
        title: &str,
    ) -> anyhow::Result<()> {
        let root = BitMapBackend::new(self.path, (1080, 720)).into_drawing_area();
        root.fill(&Self::CHART_COLOR)?;

        let x_min = points.iter().map(|p| seconds(p.timestamp)).min().unwrap_or(0);
        let x_max = points
            .iter()
            .map(|p| seconds(p.timestamp))
            .max()
            .unwrap_or(x_min)
            .max(x_min + 1);
        let y_max = points.iter().map(|p| p.load_mw).fold(1., f64::max) * 1.05;

        let mut chart = ChartBuilder::on(&root)
            .x_label_area_size(72)
            .y_label_area_size(84)
            .margin(20)
            .caption(title, ("sans-serif", 40.))
            .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .bold_line_style(WHITE.mix(0.3))
            .y_desc("Load (MW)")
            .x_desc(time_axis.label())
            .axis_desc_style(("sans-serif", 30))
            .x_label_formatter(&|&secs| format_seconds(secs))
            .x_labels(12)
            .y_labels(10)
            .x_label_style(("sans-serif", 16))
            .y_label_style(("sans-serif", 16))
            .draw()?;

        let mut labeled = false;
        for (idx, region) in registry.names().iter().enumerate() {
            let series: Vec<(i64, f64)> = points
                .iter()
                .filter(|p| p.region == *region)
                .map(|p| (seconds(p.timestamp), p.load_mw))
                .collect();
            if series.is_empty() {
                continue;
            }
            let color = REGION_COLORS[idx % REGION_COLORS.len()];
            chart
                .draw_series(LineSeries::new(series, color.stroke_width(2)))?
                .label(region.as_str())
                .legend(move |(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
                });
            labeled = true;
        }

        if labeled {
            chart
                .configure_series_labels()
                .border_style(BLACK)
                .background_style(WHITE.mix(0.8))
                .position(SeriesLabelPosition::UpperRight)
                .label_font(("sans-serif", 14))
                .draw()?;
        }

        root.present()?;
        Ok(())
    }

    /// Min to max envelope per day with the daily mean drawn over it.
    pub fn daily_band(&self, days: &[&DailyAggregate], title: &str) -> anyhow::Result<()> {
        let root = BitMapBackend::new(self.path, (1080, 720)).into_drawing_area();
        root.fill(&Self::CHART_COLOR)?;

        let mut days = days.to_vec();
        days.sort_by_key(|day| day.date);

        let x_min = days.first().map_or(0, |day| day_number(day.date));
        let x_max = days
            .last()
            .map_or(x_min, |day| day_number(day.date))
            .max(x_min + 1);
        let y_min = days
            .iter()
            .map(|day| day.daily_min)
            .fold(f64::INFINITY, f64::min);
        let y_max = days
            .iter()
            .map(|day| day.daily_max)
            .fold(f64::NEG_INFINITY, f64::max);
        let (y_min, y_max) = if days.is_empty() {
            (0., 1.)
        } else {
            (y_min * 0.95, y_max * 1.05 + 1.)
        };

        let mut chart = ChartBuilder::on(&root)
            .x_label_area_size(72)
            .y_label_area_size(84)
            .margin(20)
            .caption(title, ("sans-serif", 40.))
            .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .y_desc("Load (MW)")
            .x_desc("Date")
            .axis_desc_style(("sans-serif", 30))
            .x_label_formatter(&|&day| format_day(day))
            .x_labels(12)
            .y_labels(10)
            .x_label_style(("sans-serif", 16))
            .y_label_style(("sans-serif", 16))
            .draw()?;

        if days.is_empty() {
            root.present()?;
            return Ok(());
        }

        let band_color = REGION_COLORS[0];
        let avg_color = REGION_COLORS[3];

        let band: Vec<(i32, f64)> = days
            .iter()
            .map(|day| (day_number(day.date), day.daily_max))
            .chain(
                days.iter()
                    .rev()
                    .map(|day| (day_number(day.date), day.daily_min)),
            )
            .collect();
        chart
            .draw_series(std::iter::once(Polygon::new(
                band,
                band_color.mix(0.3).filled(),
            )))?
            .label("Daily min to max")
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 10, y + 5)], band_color.mix(0.3).filled())
            });

        chart
            .draw_series(LineSeries::new(
                days.iter().map(|day| (day_number(day.date), day.daily_avg)),
                avg_color.stroke_width(3),
            ))?
            .label("Daily average")
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 10, y + 5)], avg_color.filled())
            });

        chart
            .configure_series_labels()
            .border_style(BLACK)
            .background_style(WHITE.mix(0.8))
            .position(SeriesLabelPosition::UpperRight)
            .label_font(("sans-serif", 14))
            .draw()?;

        root.present()?;
        Ok(())
    }
}

/// Writes `map.png`, `time_series.png` and `daily_band.png` into `dir`.
pub fn render_views(dir: &Path, base: &BaseTables, views: &Views) -> anyhow::Result<()> {
    let range = format!("{} to {}", views.date_range.start(), views.date_range.end());

    Graphing::new(&dir.join("map.png")).choropleth(
        &views.map_summary,
        base.boundaries(),
        &format!("Mean load, {range}"),
    )?;

    let series_title = match views.selected_region {
        Some(region) => format!("Load Over Time: {region}"),
        None => "Load Over Time".to_string(),
    };
    Graphing::new(&dir.join("time_series.png")).time_series(
        &views.time_series,
        base.registry(),
        base.time_axis(),
        &series_title,
    )?;

    let band_title = match views.selected_region {
        Some(region) => format!("Daily Load Range: {region}"),
        None => "Daily Load Range (select a region)".to_string(),
    };
    Graphing::new(&dir.join("daily_band.png")).daily_band(&views.daily_band, &band_title)?;

    log::info!("Rendered views for {range} into {}", dir.display());
    Ok(())
}

fn shade(value: f64, lo: f64, hi: f64) -> RGBColor {
    let t = if hi > lo {
        ((value - lo) / (hi - lo)).clamp(0., 1.)
    } else {
        1.
    };
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    RGBColor(
        mix(LOW_LOAD.0, HIGH_LOAD.0),
        mix(LOW_LOAD.1, HIGH_LOAD.1),
        mix(LOW_LOAD.2, HIGH_LOAD.2),
    )
}

fn seconds(timestamp: NaiveDateTime) -> i64 {
    timestamp.and_utc().timestamp()
}

fn format_seconds(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format("%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn day_number(date: NaiveDate) -> i32 {
    date.num_days_from_ce()
}

fn format_day(day: i32) -> String {
    NaiveDate::from_num_days_from_ce_opt(day)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
