// Geometry and slice access benchmarks for SeisCube.
//
// Covers the forward and inverse transforms on a rotated survey and an
// inline slice read from a populated in-memory store at several grid sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndarray::Array2;

use seiscube::{Axis, CubeConfig, GridGeometry, SeisCube};

fn config(n_lines: i64, n_depth: i64) -> CubeConfig {
    CubeConfig {
        db_file: "unused".into(),
        inline: [1000, 1000 + n_lines - 1, 1],
        crline: [2000, 2000 + n_lines - 1, 1],
        depth: [0.0, (n_depth - 1) as f64 * 4.0, 4.0],
        coordinate: [
            [1000.0, 2000.0, 431_250.0, 6_478_100.0],
            [1000.0, 2060.0, 430_730.4, 6_478_400.0],
            [1100.0, 2060.0, 431_355.4, 6_479_482.5],
        ],
    }
}

fn geometry() -> GridGeometry {
    let cfg = config(200, 100);
    GridGeometry::new(cfg.bounds(), cfg.control_points()).expect("geometry")
}

fn bench_forward(c: &mut Criterion) {
    let g = geometry();
    c.bench_function("geometry/forward", |b| {
        b.iter(|| g.forward(black_box(1075.0), black_box(2031.0)));
    });
}

fn bench_inverse(c: &mut Criterion) {
    let g = geometry();
    let (east, north) = g.forward(1075.3, 2031.6);
    c.bench_function("geometry/inverse", |b| {
        b.iter(|| g.inverse(black_box(east), black_box(north)));
    });
}

fn bench_full_grid_round_trip(c: &mut Criterion) {
    let g = geometry();
    let nodes = g.axis_range(Axis::Inline).len() * g.axis_range(Axis::Crossline).len();

    let mut group = c.benchmark_group("geometry/round_trip");
    group.throughput(Throughput::Elements(nodes as u64));
    group.bench_function("all_nodes", |b| {
        b.iter(|| {
            for inline in g.axis_range(Axis::Inline).lines() {
                for crline in g.axis_range(Axis::Crossline).lines() {
                    let (e, n) = g.forward(inline as f64, crline as f64);
                    black_box(g.inverse(e, n).ok());
                }
            }
        });
    });
    group.finish();
}

fn bench_inline_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("store/inline_slice");
    for n in [10i64, 30, 60] {
        let cube = SeisCube::temporary(&config(n, 50)).expect("cube");
        cube.populate_grid().expect("populate");
        cube.add_attribute("amp").expect("attribute");
        let e = cube.geometry().extent_counts();
        let data = Array2::from_elem((e.n_north, e.n_depth), 1.0);
        cube.set_inline(1000, "amp", &data).expect("write");

        group.throughput(Throughput::Elements((e.n_north * e.n_depth) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &cube, |b, cube| {
            b.iter(|| cube.inline(1000, "amp"));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_forward,
    bench_inverse,
    bench_full_grid_round_trip,
    bench_inline_read,
);
criterion_main!(benches);
