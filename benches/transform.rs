use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use glam::{DQuat, DVec3};
use sublevel_kernel::types::{ContinuousBox, Pose};

fn tilted_pose() -> Pose {
    Pose::new(
        DVec3::new(120.5, 64.0, -33.25),
        DQuat::from_euler(glam::EulerRot::YXZ, 0.7, 0.2, -0.1),
        DVec3::new(8.0, 2.0, 8.0),
        DVec3::new(1.0, 1.5, 0.75),
    )
}

/// Points spread over a 16x16x16 cube.
fn cube_points(n: usize) -> Vec<DVec3> {
    (0..n)
        .map(|i| {
            let f = i as f64;
            DVec3::new(f % 16.0, (f / 16.0) % 16.0, (f / 256.0) % 16.0)
        })
        .collect()
}

fn bench_transform_position(c: &mut Criterion) {
    let pose = tilted_pose();
    let points = cube_points(4096);

    c.bench_function("pose_transform_position_4k", |b| {
        b.iter(|| {
            points
                .iter()
                .map(|p| pose.transform_position(*p))
                .fold(DVec3::ZERO, |acc, p| acc + p)
        });
    });

    c.bench_function("pose_round_trip_4k", |b| {
        b.iter(|| {
            points
                .iter()
                .map(|p| pose.transform_position_inverse(pose.transform_position(*p)))
                .fold(DVec3::ZERO, |acc, p| acc + p)
        });
    });
}

fn bench_baked_matrix(c: &mut Criterion) {
    let pose = tilted_pose();
    let points = cube_points(4096);

    c.bench_function("pose_baked_matrix_4k", |b| {
        b.iter(|| {
            let m = pose.bake_into_matrix();
            points
                .iter()
                .map(|p| m.transform_point3(*p))
                .fold(DVec3::ZERO, |acc, p| acc + p)
        });
    });
}

fn bench_box_refit(c: &mut Criterion) {
    let pose = tilted_pose();
    let local = ContinuousBox::new(0.0, 0.0, 0.0, 16.0, 4.0, 16.0);

    c.bench_function("box_transform_by_pose", |b| {
        b.iter(|| black_box(&local).transformed(black_box(&pose)));
    });

    let m = pose.bake_into_matrix();
    c.bench_function("box_transform_by_matrix", |b| {
        b.iter(|| black_box(&local).transformed_by(black_box(&m)));
    });
}

fn bench_lerp(c: &mut Criterion) {
    let a = tilted_pose();
    let b_pose = Pose {
        orientation: DQuat::from_rotation_y(1.2),
        ..Pose::from_position(DVec3::new(121.0, 64.0, -33.0))
    };

    c.bench_function("pose_lerp", |b| {
        b.iter(|| black_box(&a).lerp(black_box(&b_pose), black_box(0.37)));
    });
}

criterion_group!(
    benches,
    bench_transform_position,
    bench_baked_matrix,
    bench_box_refit,
    bench_lerp
);
criterion_main!(benches);
