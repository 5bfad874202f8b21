use chrono::NaiveDate;
use load_explorer::{
    compute::DailyAggregate,
    convert::{self, LoadPoint, TimeAxis},
    error::JoinMismatch,
    region::{RegionRegistry, NEW_ENGLAND_REGIONS},
    selection::{compute_views, BaseTables, SelectionEvent, Session},
    Error,
};
use std::{fmt::Write as _, fs, path::Path};
use tempfile::TempDir;

const GEOJSON: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "properties": {"NAME": "Maine"},
         "geometry": {"type": "Polygon", "coordinates": [[[-71.0, 43.0], [-67.0, 45.0], [-70.0, 47.5], [-71.0, 43.0]]]}},
        {"type": "Feature", "properties": {"NAME": "Vermont"},
         "geometry": {"type": "Polygon", "coordinates": [[[-73.4, 42.7], [-71.5, 42.7], [-71.5, 45.0], [-73.4, 42.7]]]}},
        {"type": "Feature", "properties": {"NAME": "New Hampshire"},
         "geometry": {"type": "Polygon", "coordinates": [[[-72.5, 42.7], [-70.7, 42.9], [-71.1, 45.3], [-72.5, 42.7]]]}},
        {"type": "Feature", "properties": {"NAME": "Connecticut"},
         "geometry": {"type": "Polygon", "coordinates": [[[-73.7, 41.0], [-71.8, 41.3], [-71.8, 42.0], [-73.7, 41.0]]]}},
        {"type": "Feature", "properties": {"NAME": "Rhode Island"},
         "geometry": {"type": "Polygon", "coordinates": [[[-71.9, 41.3], [-71.1, 41.4], [-71.4, 42.0], [-71.9, 41.3]]]}},
        {"type": "Feature", "properties": {"NAME": "Massachusetts"},
         "geometry": {"type": "Polygon", "coordinates": [[[-73.5, 42.0], [-70.0, 42.0], [-71.0, 42.9], [-73.5, 42.0]]]}}
    ]
}"#;

/// Two days of six-hourly readings for every New England zone. Zone `i`
/// reads `1000 * (i + 1) + hour`.
fn load_csv() -> String {
    let mut csv = String::from(
        "Local Timestamp Eastern Time (Interval Ending),UTC Timestamp (Interval Ending),Local Date,Hour Number",
    );
    for region in NEW_ENGLAND_REGIONS {
        write!(csv, ",{region} Actual Load (MW)").unwrap();
    }
    csv.push('\n');

    for day in 1..=2 {
        for hour in [0, 6, 12, 18] {
            write!(
                csv,
                "2024-01-0{day} {:02}:00:00,2024-01-0{day} {hour:02}:00:00,2024-01-0{day},{hour}",
                (hour + 19) % 24
            )
            .unwrap();
            for idx in 0..NEW_ENGLAND_REGIONS.len() {
                write!(csv, ",{}", 1000 * (idx + 1) + hour).unwrap();
            }
            csv.push('\n');
        }
    }
    csv
}

fn fixtures() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("load.csv"), load_csv()).unwrap();
    fs::write(dir.path().join("ne.json"), GEOJSON).unwrap();
    dir
}

fn load(dir: &Path) -> BaseTables {
    BaseTables::load(
        &dir.join("load.csv"),
        &dir.join("ne.json"),
        RegionRegistry::new_england(),
    )
    .unwrap()
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

#[test]
fn loads_the_cross_product_of_timestamps_and_regions() {
    let dir = fixtures();
    let base = load(dir.path());

    assert_eq!(base.points().len(), 8 * NEW_ENGLAND_REGIONS.len());
    assert_eq!(base.daily().len(), 2 * NEW_ENGLAND_REGIONS.len());
    for day in base.daily() {
        assert!(day.daily_min <= day.daily_avg && day.daily_avg <= day.daily_max);
    }

    let maine_day_one = base
        .daily()
        .iter()
        .find(|d| d.region == "Maine" && d.date == date(1))
        .unwrap();
    assert_eq!(maine_day_one.daily_min, 2000.);
    assert_eq!(maine_day_one.daily_max, 2018.);
    assert_eq!(maine_day_one.daily_avg, 2009.);
}

#[test]
fn time_axis_follows_the_timestamp_column() {
    let dir = fixtures();
    assert_eq!(load(dir.path()).time_axis(), TimeAxis::Utc);

    let local_only = "\
Local Timestamp Eastern Time (Interval Ending),Maine Actual Load (MW),Vermont Actual Load (MW)
2024-01-01 01:00:00,1000,500
2024-01-01 02:00:00,1100,550
";
    fs::write(dir.path().join("local.csv"), local_only).unwrap();
    let base = BaseTables::load(
        &dir.path().join("local.csv"),
        &dir.path().join("ne.json"),
        RegionRegistry::new(["Maine", "Vermont"]),
    )
    .unwrap();
    assert_eq!(base.time_axis(), TimeAxis::Local);
    assert_eq!(base.time_axis().label(), "Time (local)");
}

#[test]
fn massachusetts_zones_do_not_join_the_state_boundary() {
    let dir = fixtures();
    let base = load(dir.path());
    let report = base.join_report();

    assert_eq!(report.mismatches.len(), 4);
    assert!(report
        .mismatches
        .contains(&JoinMismatch::MissingLoad("Massachusetts".into())));
    assert!(report.mismatches.contains(&JoinMismatch::MissingGeometry(
        "Western/Central Massachusetts".into()
    )));
}

#[test]
fn click_then_narrow_the_range() {
    let dir = fixtures();
    let base = load(dir.path());
    let mut session = Session::new(&base);

    let views = session.dispatch(SelectionEvent::RegionClicked(Some("Maine".into())));
    assert_eq!(views.time_series.len(), 8);
    assert_eq!(views.daily_band.len(), 2);
    assert_eq!(views.map_summary.len(), 8);

    let views = session.dispatch(SelectionEvent::DateRangeChanged(date(2), date(1)));
    assert_eq!(views.time_series.len(), 4);
    assert!(views.time_series.iter().all(|p| p.date() == date(2)));
    assert_eq!(views.daily_band.len(), 1);

    let views = session.dispatch(SelectionEvent::RegionClicked(None));
    assert!(views.daily_band.is_empty());
    assert_eq!(views.time_series.len(), 4 * NEW_ENGLAND_REGIONS.len());

    let again = compute_views(&base, session.state());
    assert_eq!(views, again);
}

#[test]
fn views_round_trip_through_csv() {
    let dir = fixtures();
    let base = load(dir.path());
    let mut session = Session::new(&base);
    let views = session.dispatch(SelectionEvent::RegionClicked(Some("Vermont".into())));

    let band_csv = dir.path().join("daily_band.csv");
    convert::write_csv(&band_csv, &views.daily_band).unwrap();
    let series_csv = dir.path().join("time_series.csv");
    convert::write_csv(&series_csv, &views.time_series).unwrap();

    let band: Vec<DailyAggregate> = csv::Reader::from_path(&band_csv)
        .unwrap()
        .deserialize()
        .collect::<Result<_, _>>()
        .unwrap();
    let expected: Vec<DailyAggregate> = views.daily_band.iter().map(|d| (*d).clone()).collect();
    assert_eq!(band, expected);

    let series: Vec<LoadPoint> = csv::Reader::from_path(&series_csv)
        .unwrap()
        .deserialize()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(series.len(), views.time_series.len());
    assert!(series.iter().all(|p| p.region == "Vermont"));
}

#[test]
fn missing_inputs_fail_at_startup() {
    let dir = fixtures();
    let err = BaseTables::load(
        &dir.path().join("nope.csv"),
        &dir.path().join("ne.json"),
        RegionRegistry::new_england(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::DataLoad { .. }));

    let err = BaseTables::load(
        &dir.path().join("load.csv"),
        &dir.path().join("nope.json"),
        RegionRegistry::new_england(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::DataLoad { .. }));

    let err = BaseTables::load(
        &dir.path().join("load.csv"),
        &dir.path().join("ne.json"),
        RegionRegistry::new(["Maine", "Nova Scotia"]),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
}
