use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hifitime::{Epoch, Unit};

use conjunct::catalog::tle_reader::record_from_elements;
use conjunct::catalog::CatalogRecord;
use conjunct::propagation::{propagate_batch, reconcile_frames};
use conjunct::state::ReferenceFrame;
use conjunct::time::TimeGrid;

const ISS_LINE1: &str = "1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992";
const ISS_LINE2: &str = "2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008";

/// Synthetic catalog spreading copies of one element set over node and mean anomaly.
fn synthetic_catalog(size: usize) -> Vec<CatalogRecord> {
    let base = sgp4::Elements::from_tle(
        Some("ISS (ZARYA)".to_owned()),
        ISS_LINE1.as_bytes(),
        ISS_LINE2.as_bytes(),
    )
    .expect("valid element set");

    (0..size)
        .map(|i| {
            let mut elements = base.clone();
            elements.norad_id = 90_000 + i as u64;
            elements.right_ascension = (base.right_ascension + 7.3 * i as f64) % 360.0;
            elements.mean_anomaly = (base.mean_anomaly + 13.1 * i as f64) % 360.0;
            record_from_elements(&elements).expect("valid record")
        })
        .collect()
}

/// One day of one minute epochs, close to the element epoch.
fn fine_grid() -> TimeGrid {
    TimeGrid::new(
        Epoch::from_gregorian_utc_hms(2020, 7, 13, 0, 0, 0),
        Unit::Minute * 1_i64,
        1440,
    )
    .expect("valid grid")
}

fn bench_propagate_batch(c: &mut Criterion) {
    let grid = fine_grid();
    let mut group = c.benchmark_group("propagate_batch");
    group.sample_size(10);

    for size in [10usize, 100, 500] {
        let records = synthetic_catalog(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| propagate_batch(black_box(records), black_box(&grid)))
        });
    }
    group.finish();
}

fn bench_reconcile_frames(c: &mut Criterion) {
    let grid = fine_grid();
    let batch = propagate_batch(&synthetic_catalog(100), &grid);

    c.bench_function("reconcile_frames/teme_to_gcrs", |b| {
        b.iter(|| reconcile_frames(black_box(&batch), ReferenceFrame::Gcrs))
    });
}

criterion_group!(benches, bench_propagate_batch, bench_reconcile_frames);
criterion_main!(benches);
