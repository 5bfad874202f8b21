//! ### Selection
//! The interactive half of the explorer. Base tables are built once and
//! never touched again; a `SelectionState` moves in response to map clicks
//! and range changes, and `compute_views` reduces the pair into the three
//! tables the map, the time series chart and the daily band chart draw.

use crate::compute::{self, DailyAggregate, RegionMean};
use crate::convert::{self, LoadPoint, TimeAxis};
use crate::error::Result;
use crate::geo::{self, GeoBoundaries, JoinReport};
use crate::region::RegionRegistry;
use chrono::NaiveDate;
use std::path::Path;

/// Everything derived from the input files at startup.
#[derive(Debug)]
pub struct BaseTables {
    registry: RegionRegistry,
    time_axis: TimeAxis,
    points: Vec<LoadPoint>,
    daily: Vec<DailyAggregate>,
    boundaries: GeoBoundaries,
    join: JoinReport,
}

impl BaseTables {
    pub fn load(load_csv: &Path, geojson: &Path, registry: RegionRegistry) -> Result<Self> {
        let raw = convert::read_load_csv(load_csv)?;
        let points = convert::reshape(&raw, &registry)?;
        let boundaries = geo::load_boundaries(geojson)?;
        Ok(Self::new(registry, points, boundaries)?.with_time_axis(raw.time_axis))
    }

    /// Points are taken to be on the UTC axis; see `with_time_axis`.
    pub fn new(
        registry: RegionRegistry,
        points: Vec<LoadPoint>,
        boundaries: GeoBoundaries,
    ) -> Result<Self> {
        convert::check_region_set(&points, &registry)?;
        let daily = compute::daily_aggregates(&points);
        let join = JoinReport::check(&registry, &boundaries);
        join.log_warnings();

        log::info!(
            "Base tables ready: {} load points, {} daily rows, {} boundaries",
            points.len(),
            daily.len(),
            boundaries.len()
        );

        Ok(Self {
            registry,
            time_axis: TimeAxis::Utc,
            points,
            daily,
            boundaries,
            join,
        })
    }

    pub fn with_time_axis(mut self, time_axis: TimeAxis) -> Self {
        self.time_axis = time_axis;
        self
    }

    pub fn registry(&self) -> &RegionRegistry {
        &self.registry
    }

    /// Clock the point timestamps were read on.
    pub fn time_axis(&self) -> TimeAxis {
        self.time_axis
    }

    pub fn points(&self) -> &[LoadPoint] {
        &self.points
    }

    pub fn daily(&self) -> &[DailyAggregate] {
        &self.daily
    }

    pub fn boundaries(&self) -> &GeoBoundaries {
        &self.boundaries
    }

    pub fn join_report(&self) -> &JoinReport {
        &self.join
    }

    /// First and last calendar date with any reading.
    pub fn date_span(&self) -> Option<DateRange> {
        let first = self.points.iter().map(LoadPoint::date).min()?;
        let last = self.points.iter().map(LoadPoint::date).max()?;
        Some(DateRange::new(first, last))
    }

    /// No region, whole dataset.
    pub fn initial_selection(&self) -> SelectionState {
        SelectionState {
            selected_region: None,
            date_range: self
                .date_span()
                .unwrap_or(DateRange::new(NaiveDate::MIN, NaiveDate::MAX)),
        }
    }
}

/// Inclusive calendar range. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// An end before the start is pulled up to the start.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    /// `None` clears the selection.
    RegionClicked(Option<String>),
    DateRangeChanged(NaiveDate, NaiveDate),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    pub selected_region: Option<String>,
    pub date_range: DateRange,
}

impl SelectionState {
    pub fn apply(&mut self, event: SelectionEvent) {
        match event {
            SelectionEvent::RegionClicked(region) => self.selected_region = region,
            SelectionEvent::DateRangeChanged(start, end) => {
                if end < start {
                    log::debug!("range {start}..{end} is inverted, clamping end to {start}");
                }
                self.date_range = DateRange::new(start, end);
            }
        }
    }
}

/// The three tables handed to the renderer. Rows borrow from the base tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Views<'a> {
    /// The region actually applied; an unregistered selection shows up as `None`.
    pub selected_region: Option<&'a str>,
    pub date_range: DateRange,
    pub map_summary: Vec<RegionMean>,
    pub time_series: Vec<&'a LoadPoint>,
    pub daily_band: Vec<&'a DailyAggregate>,
}

/// Pure: the same base tables and selection always give the same views.
///
/// The map always covers every region over the selected dates; only the
/// two charts follow the region selection. The daily band is empty unless
/// a region is selected.
pub fn compute_views<'a>(base: &'a BaseTables, selection: &SelectionState) -> Views<'a> {
    let range = selection.date_range;
    let in_range: Vec<&LoadPoint> = base
        .points
        .iter()
        .filter(|point| range.contains(point.date()))
        .collect();

    let map_summary = compute::region_means(in_range.iter().copied());

    let region = selection.selected_region.as_deref().and_then(|clicked| {
        let known = base
            .registry
            .position(clicked)
            .map(|idx| base.registry.names()[idx].as_str());
        if known.is_none() {
            log::debug!("ignoring selection of unregistered region {clicked:?}");
        }
        known
    });

    let (time_series, daily_band) = match region {
        None => (in_range, Vec::new()),
        Some(region) => (
            in_range
                .into_iter()
                .filter(|point| point.region == region)
                .collect(),
            base.daily
                .iter()
                .filter(|day| day.region == region && range.contains(day.date))
                .collect(),
        ),
    };

    Views {
        selected_region: region,
        date_range: range,
        map_summary,
        time_series,
        daily_band,
    }
}

/// One viewer's selection over shared base tables.
pub struct Session<'a> {
    base: &'a BaseTables,
    state: SelectionState,
}

impl<'a> Session<'a> {
    pub fn new(base: &'a BaseTables) -> Self {
        Self {
            base,
            state: base.initial_selection(),
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn dispatch(&mut self, event: SelectionEvent) -> Views<'a> {
        self.state.apply(event);
        self.views()
    }

    pub fn reset(&mut self) -> Views<'a> {
        self.state = self.base.initial_selection();
        self.views()
    }

    pub fn views(&self) -> Views<'a> {
        compute_views(self.base, &self.state)
    }
}
