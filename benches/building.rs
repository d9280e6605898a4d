//! Benchmarks for grid building and banded emission.
//!
//! Run with: cargo bench
//!
//! Results are saved to `target/criterion/` with HTML reports.
#![allow(
    clippy::expect_used,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap
)]

use bandgrid::{
    AttributeMap, Band, BandedEmitter, CellCollector, Control, ControlAttributes, ControlMatrix,
    GridBuilder,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// A report of `bands` bands, each holding one line of `columns` controls.
/// Every other band nudges its controls by a pixel so normalization has
/// work to do, and every band carries one floating rule.
fn synthetic_report(bands: usize, columns: usize) -> ControlMatrix {
    let band_list = Band::stacked((0..bands).map(|_| ("", 24)));
    let band_list: Vec<Band> = band_list
        .into_iter()
        .enumerate()
        .map(|(index, mut band)| {
            band.name = format!("band_{index}");
            band
        })
        .collect();

    let mut controls = Vec::with_capacity(bands * (columns + 1));
    for (index, band) in band_list.iter().enumerate() {
        let nudge = (index % 2) as i32;
        for column in 0..columns {
            controls.push(Control::new(
                format!("c_{index}_{column}"),
                band.name.as_str(),
                8 + column as i32 * 72 + nudge,
                band.top() + 2,
                64,
                18,
            ));
        }
        controls.push(
            Control::new(
                format!("rule_{index}"),
                band.name.as_str(),
                0,
                band.bound - 2,
                columns as i32 * 72,
                1,
            )
            .floating(),
        );
    }
    ControlMatrix::new(controls, band_list)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for (bands, columns) in [(10, 10), (100, 20), (500, 40)] {
        let matrix = synthetic_report(bands, columns);
        group.throughput(Throughput::Elements(matrix.controls.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{bands}x{columns}")),
            &matrix,
            |b, matrix| {
                b.iter(|| {
                    GridBuilder::new()
                        .build(black_box(matrix))
                        .expect("Failed to build")
                });
            },
        );
    }
    group.finish();
}

fn bench_emit(c: &mut Criterion) {
    let matrix = synthetic_report(20, 20);
    let grid = GridBuilder::new().build(&matrix).expect("Failed to build");
    let rows: Vec<AttributeMap> = (0..200)
        .map(|row| {
            matrix
                .controls
                .iter()
                .map(|control| {
                    let text = format!("{}:{}", control.name, row / 10);
                    (control.name.clone(), ControlAttributes::text(text))
                })
                .collect()
        })
        .collect();

    c.bench_function("emit_200_rows", |b| {
        b.iter(|| {
            let mut emitter = BandedEmitter::new(&grid, CellCollector::new());
            for row in &rows {
                emitter
                    .enter_data(Some(row.clone()))
                    .expect("Failed to emit");
            }
            emitter.enter_data(None).expect("Failed to flush");
            black_box(emitter.into_writer().cells.len())
        });
    });
}

criterion_group!(benches, bench_build, bench_emit);
criterion_main!(benches);
