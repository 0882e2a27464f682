use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use glam::{DQuat, DVec3};
use sublevel_kernel::sublevel::{PlotRegistry, SubLevelQueries, SubLevelQueriesExt, SubLevelState};
use sublevel_kernel::types::{ContinuousBox, GridBox, Pose, SubLevelId};

const PLOT_X: i32 = 1 << 20;

/// `n` 16x16 sub-levels in a row of plots, posed on a grid around the origin.
fn fleet(n: i32) -> PlotRegistry {
    let mut reg = PlotRegistry::default();
    for i in 0..n {
        let x0 = PLOT_X + i * 32;
        let plot = GridBox::new(x0, 0, 0, x0 + 15, 15, 15);
        let pose = Pose {
            position: DVec3::new(f64::from(i % 32) * 20.0, 64.0, f64::from(i / 32) * 20.0),
            orientation: DQuat::from_rotation_y(f64::from(i) * 0.1),
            rotation_point: DVec3::new(f64::from(x0) + 8.0, 0.0, 8.0),
            ..Pose::IDENTITY
        };
        let state = SubLevelState::new(
            SubLevelId::from_u128(i as u128 + 1),
            pose,
            plot.to_continuous_box(),
        );
        reg.insert(state, plot).expect("plots are disjoint");
    }
    reg
}

fn plot_points(n: i32, per_plot: i32) -> Vec<DVec3> {
    (0..n)
        .flat_map(|i| {
            (0..per_plot).map(move |j| {
                DVec3::new(
                    f64::from(PLOT_X + i * 32) + f64::from(j % 16) + 0.5,
                    f64::from(j / 16) + 0.5,
                    4.5,
                )
            })
        })
        .collect()
}

fn bench_containment(c: &mut Criterion) {
    let reg = fleet(256);
    let points = plot_points(256, 16);

    c.bench_function("get_containing_point_4k", |b| {
        b.iter(|| {
            points
                .iter()
                .filter(|p| reg.get_containing_point(**p).is_some())
                .count()
        });
    });
}

fn bench_intersecting(c: &mut Criterion) {
    let reg = fleet(256);
    let query = ContinuousBox::new(100.0, 60.0, 0.0, 260.0, 90.0, 60.0);

    c.bench_function("get_all_intersecting_256", |b| {
        b.iter(|| reg.get_all_intersecting(black_box(&query)).count());
    });
}

fn bench_projection(c: &mut Criterion) {
    let reg = fleet(256);
    let points = plot_points(256, 64);

    c.bench_function("project_out_of_sub_level_16k", |b| {
        b.iter(|| {
            points
                .iter()
                .map(|p| reg.project_out_of_sub_level(*p))
                .fold(DVec3::ZERO, |acc, p| acc + p)
        });
    });

    c.bench_function("project_all_parallel_16k", |b| {
        b.iter(|| reg.project_all(black_box(&points)));
    });
}

criterion_group!(benches, bench_containment, bench_intersecting, bench_projection);
criterion_main!(benches);
