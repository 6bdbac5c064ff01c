use std::env;

use camino::Utf8PathBuf;
use conjunct::catalog::tle_reader::TleCatalog;
use conjunct::constants::GEO_RADIUS_KM;
use conjunct::conjunct_errors::ConjunctError;
use conjunct::ephemeris::horizons::HorizonsClient;
use conjunct::esa::{default_agent, due_events, fetch_close_approach_list, EsaListKind};
use conjunct::screening::{Screening, ScreeningReport};
use conjunct::search::ranking::CloseApproach;
use conjunct::search::{SearchMode, SearchParams};
use conjunct::time::parse_iso_utc;
use hifitime::{Epoch, Unit};

const TOP: usize = 20;

fn print_table(title: &str, approaches: &[&CloseApproach]) {
    println!("{title}");
    println!(
        "{:>9} {:10} {:25} {:>12}  {}",
        "NORAD", "COSPAR", "NAME", "MISS (km)", "EPOCH (UTC)"
    );
    for approach in approaches.iter().take(TOP) {
        let record = &approach.record;
        println!(
            "{:>9} {:10} {:25} {:>12.1}  {}",
            record.catalog_number(),
            record.designator(),
            record.name(),
            approach.miss_distance,
            approach.epoch
        );
    }
    println!();
}

fn print_report(report: &ScreeningReport) {
    println!(
        "== {} == closest approach {} at {:.0} km{}",
        report.target,
        report.fine.epoch,
        report.fine.distance,
        match report.truncated_at {
            Some(end) => format!(" (ephemeris ends at {end})"),
            None => String::new(),
        }
    );
    println!(
        "{} objects in catalog, {} candidates, {:.4} ms per element-epoch",
        report.catalog_size,
        report.candidates,
        report.propagation.ms_per_element_epoch()
    );

    let (active, debris) = report.result.partition_debris();
    print_table("Closest active objects", &active);
    print_table("Closest debris", &debris);
}

/// Usage:
///
/// ```text
/// screen_event <catalog.tle> <target> <YYYY-MM-DD HH:MM> [mid|end]
/// screen_event <catalog.tle> [upcoming|recent|impacted]
/// ```
///
/// The second form screens every event of an ESA close approach list passing within 1.1 GEO
/// radius. Upcoming encounters more than a week ahead are skipped.
fn main() -> Result<(), ConjunctError> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(path) = args.first() else {
        eprintln!("usage: screen_event <catalog.tle> <target> <YYYY-MM-DD HH:MM> [mid|end]");
        eprintln!("       screen_event <catalog.tle> [upcoming|recent|impacted]");
        return Ok(());
    };

    let catalog = TleCatalog::from_file(&Utf8PathBuf::from(path))?;
    let screening = Screening::new(HorizonsClient::default(), catalog, SearchParams::default());

    if args.len() >= 3 {
        let tca = parse_iso_utc(&args[2]).ok_or_else(|| {
            ConjunctError::InvalidSearchParameter(format!("invalid encounter date {}", args[2]))
        })?;
        let mode = args.get(3).map(String::as_str).unwrap_or("mid");
        let report = screening.screen(&args[1], tca, mode)?;
        print_report(&report);
        return Ok(());
    }

    let kind: EsaListKind = args
        .get(1)
        .map(|k| k.parse())
        .transpose()?
        .unwrap_or(EsaListKind::Upcoming);
    let events = fetch_close_approach_list(&default_agent(), kind, GEO_RADIUS_KM * 1.1)?;
    let now = Epoch::now().map_err(|e| ConjunctError::ClockError(e.to_string()))?;

    for event in due_events(events, now, Unit::Day * 7_i64) {
        let mode: SearchMode = event.search_mode();
        match screening.screen_at(&event.designation, event.tca, mode, now) {
            Ok(report) => print_report(&report),
            Err(e) => eprintln!("{}: screening failed: {e}", event.designation),
        }
    }
    Ok(())
}
