use anyhow::{anyhow, bail};
use chrono::NaiveDate;
use clap::Parser;
use load_explorer::{
    compute, convert, geo, graph,
    region::RegionRegistry,
    selection::{BaseTables, SelectionEvent, Session, Views},
};
use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

#[derive(clap::Parser, Debug)]
enum Args {
    /// Cuts a nationwide state boundary GeoJSON (e.g. the Census
    /// `gz_2010_us_040_00_500k.json`) down to the six New England states.
    /*
    cargo run filter-geojson \
        --input data/gz_2010_us_040_00_500k.json \
        --output data/new_england_geojson.json
    */
    FilterGeojson {
        /// A GeoJSON FeatureCollection keyed by `properties.NAME`
        #[clap(short, long)]
        input: PathBuf,

        /// Where the filtered FeatureCollection is written
        #[clap(short, long)]
        output: PathBuf,
    },

    /// Takes the wide hourly load export from
    /// https://www.eia.gov/electricity/wholesalemarkets/data.php?rto=isone
    /// and writes it back out as one (timestamp, region, load_mw) row per
    /// region per interval.
    // cargo run reshape data/megawatt_demand_2024.csv results/load_long.csv
    Reshape {
        /// A csv with a UTC timestamp column and `<Region> Actual Load (MW)` columns
        load_csv: PathBuf,

        /// Where the output csv will be written
        csv_out: PathBuf,
    },

    /// Writes the per-region daily min/avg/max of the load export.
    // cargo run daily data/megawatt_demand_2024.csv results/daily.csv
    Daily {
        /// A csv with a UTC timestamp column and `<Region> Actual Load (MW)` columns
        load_csv: PathBuf,

        /// Where the output csv will be written
        csv_out: PathBuf,
    },

    /// Applies a region click and/or a date range to the initial selection
    /// and writes the three resulting tables and charts into `out_dir`.
    /*
    cargo run views \
        --load-csv data/megawatt_demand_2024.csv \
        --geojson data/new_england_geojson.json \
        --region Maine --start 2024-07-01 --end 2024-07-31 \
        --out-dir results/maine_july
    */
    Views {
        #[clap(long)]
        load_csv: PathBuf,

        #[clap(long)]
        geojson: PathBuf,

        /// Region to filter the charts to. Unknown names show every region.
        #[clap(long)]
        region: Option<String>,

        /// First day shown (YYYY-MM-DD), defaults to the first day of data
        #[clap(long)]
        start: Option<NaiveDate>,

        /// Last day shown (YYYY-MM-DD), defaults to the last day of data
        #[clap(long)]
        end: Option<NaiveDate>,

        /// Directory the csvs and pngs are written to
        #[clap(short, long)]
        out_dir: PathBuf,
    },

    /// Interactive session: reads `region <name>`, `region`, `range <start> <end>`,
    /// `reset`, `show`, `render` and `quit` from stdin.
    // cargo run explore --load-csv data/megawatt_demand_2024.csv --geojson data/new_england_geojson.json --out-dir results/live
    Explore {
        #[clap(long)]
        load_csv: PathBuf,

        #[clap(long)]
        geojson: PathBuf,

        /// Directory `render` writes into
        #[clap(short, long)]
        out_dir: PathBuf,
    },
}

/// One line of input to `explore`.
#[derive(Debug, PartialEq)]
enum Prompt {
    Event(SelectionEvent),
    Reset,
    Show,
    Render,
    Quit,
}

fn parse_prompt(line: &str) -> anyhow::Result<Prompt> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    Ok(match word {
        "region" if rest.is_empty() => Prompt::Event(SelectionEvent::RegionClicked(None)),
        "region" => Prompt::Event(SelectionEvent::RegionClicked(Some(rest.to_string()))),
        "range" => {
            let mut dates = rest.split_whitespace().map(str::parse::<NaiveDate>);
            match (dates.next(), dates.next(), dates.next()) {
                (Some(start), Some(end), None) => {
                    Prompt::Event(SelectionEvent::DateRangeChanged(start?, end?))
                }
                _ => bail!("usage: range <YYYY-MM-DD> <YYYY-MM-DD>"),
            }
        }
        "reset" => Prompt::Reset,
        "show" => Prompt::Show,
        "render" => Prompt::Render,
        "quit" | "exit" => Prompt::Quit,
        other => return Err(anyhow!("unknown command {other:?}")),
    })
}

fn write_views(dir: &Path, base: &BaseTables, views: &Views) -> anyhow::Result<()> {
    fs::create_dir_all(dir)?;
    convert::write_csv(&dir.join("map_summary.csv"), &views.map_summary)?;
    convert::write_csv(&dir.join("time_series.csv"), &views.time_series)?;
    convert::write_csv(&dir.join("daily_band.csv"), &views.daily_band)?;
    graph::render_views(dir, base, views)
}

fn print_views(out: &mut impl Write, views: &Views) -> io::Result<()> {
    writeln!(
        out,
        "region: {}  dates: {} to {}",
        views.selected_region.unwrap_or("(all)"),
        views.date_range.start(),
        views.date_range.end()
    )?;
    for mean in &views.map_summary {
        writeln!(out, "  {:<32} {:>10.1} MW", mean.region, mean.mean_load_mw)?;
    }
    writeln!(
        out,
        "time series: {} points  daily band: {} days",
        views.time_series.len(),
        views.daily_band.len()
    )
}

fn explore(base: &BaseTables, out_dir: &Path) -> anyhow::Result<()> {
    let mut session = Session::new(base);
    let mut views = session.views();
    let mut stdout = io::stdout();
    print_views(&mut stdout, &views)?;

    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_prompt(&line) {
            Ok(Prompt::Event(event)) => {
                views = session.dispatch(event);
                print_views(&mut stdout, &views)?;
            }
            Ok(Prompt::Reset) => {
                views = session.reset();
                print_views(&mut stdout, &views)?;
            }
            Ok(Prompt::Show) => print_views(&mut stdout, &views)?,
            Ok(Prompt::Render) => write_views(out_dir, base, &views)?,
            Ok(Prompt::Quit) => break,
            Err(e) => eprintln!("{e}"),
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    match Args::parse() {
        Args::FilterGeojson { input, output } => {
            geo::filter_geojson_file(&input, &output, &geo::NEW_ENGLAND_STATES)?;
        }
        Args::Reshape { load_csv, csv_out } => {
            let raw = convert::read_load_csv(&load_csv)?;
            let points = convert::reshape(&raw, &RegionRegistry::new_england())?;
            convert::write_csv(&csv_out, &points)?;
        }
        Args::Daily { load_csv, csv_out } => {
            let raw = convert::read_load_csv(&load_csv)?;
            let points = convert::reshape(&raw, &RegionRegistry::new_england())?;
            let daily = compute::daily_aggregates(&points);
            convert::write_csv(&csv_out, &daily)?;
        }
        Args::Views {
            load_csv,
            geojson,
            region,
            start,
            end,
            out_dir,
        } => {
            let base = BaseTables::load(&load_csv, &geojson, RegionRegistry::new_england())?;
            let mut session = Session::new(&base);
            let initial = session.state().date_range;
            if region.is_some() {
                session.dispatch(SelectionEvent::RegionClicked(region.clone()));
            }
            let views = session.dispatch(SelectionEvent::DateRangeChanged(
                start.unwrap_or(initial.start()),
                end.unwrap_or(initial.end()),
            ));
            if let (Some(asked), None) = (&region, views.selected_region) {
                log::warn!("{asked:?} is not a registered region, showing all regions");
            }
            write_views(&out_dir, &base, &views)?;
        }
        Args::Explore {
            load_csv,
            geojson,
            out_dir,
        } => {
            let base = BaseTables::load(&load_csv, &geojson, RegionRegistry::new_england())?;
            explore(&base, &out_dir)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    #[test]
    fn region_prompt_keeps_spaces_and_slashes() {
        assert_eq!(
            parse_prompt("region Western/Central Massachusetts").unwrap(),
            Prompt::Event(SelectionEvent::RegionClicked(Some(
                "Western/Central Massachusetts".into()
            )))
        );
        assert_eq!(
            parse_prompt("  region  ").unwrap(),
            Prompt::Event(SelectionEvent::RegionClicked(None))
        );
    }

    #[test]
    fn range_prompt_passes_inverted_dates_through() {
        assert_eq!(
            parse_prompt("range 2024-01-05 2024-01-02").unwrap(),
            Prompt::Event(SelectionEvent::DateRangeChanged(
                date("2024-01-05"),
                date("2024-01-02")
            ))
        );
        assert!(parse_prompt("range 2024-01-05").is_err());
        assert!(parse_prompt("range 2024-01-05 tomorrow").is_err());
    }

    #[test]
    fn other_prompts() {
        assert_eq!(parse_prompt("show").unwrap(), Prompt::Show);
        assert_eq!(parse_prompt("render").unwrap(), Prompt::Render);
        assert_eq!(parse_prompt("reset").unwrap(), Prompt::Reset);
        assert_eq!(parse_prompt("exit").unwrap(), Prompt::Quit);
        assert!(parse_prompt("zoom 3").is_err());
    }
}
