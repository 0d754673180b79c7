// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

use criterion::{criterion_group, criterion_main, Criterion};
use nalgebra::Rotation3;
use rand::{rngs::StdRng, Rng, SeedableRng};
use vtraj_rs::prelude::*;

/// Rigidly moved and slightly perturbed copies of the coordinates.
fn perturbed_copies(base: &[Vector3D], n_copies: usize, rng: &mut StdRng) -> Vec<Vec<Vector3D>> {
    (0..n_copies)
        .map(|_| {
            let rotation = Rotation3::from_euler_angles(
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-1.5..1.5),
                rng.gen_range(-3.0..3.0),
            );
            let transform = Transform::new(
                *rotation.matrix(),
                Vector3D::new(
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                ),
            );

            base.iter()
                .map(|p| {
                    transform.apply(p)
                        + Vector3D::new(
                            rng.gen_range(-0.01..0.01),
                            rng.gen_range(-0.01..0.01),
                            rng.gen_range(-0.01..0.01),
                        )
                })
                .collect()
        })
        .collect()
}

fn benchmark(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let model = Model::from_gro("test_files/peptide.gro")
        .unwrap()
        .into_shared();
    let base = model.borrow().get_coordinates().to_vec();
    let copies = perturbed_copies(&base, 200, &mut rng);

    c.bench_function("iterative_alignment (200 x 19 atoms)", |b| {
        b.iter(|| {
            let mut ensemble = copies.clone();
            std::hint::black_box(iterative_alignment(&mut ensemble, 1e-8, 1000).unwrap());
        })
    });

    c.bench_function("superpose (19 atoms)", |b| {
        b.iter(|| {
            std::hint::black_box(superpose(&copies[0], &copies[1]).unwrap());
        })
    });

    let trajectories = || {
        vec![
            SingleTrajectory::new(
                Box::new(MemoryTrajectory::new("first", copies[..100].to_vec()).unwrap()),
                model.clone(),
                TrajectoryOptions::default().with_subset("name CA"),
            )
            .unwrap(),
            SingleTrajectory::new(
                Box::new(MemoryTrajectory::new("second", copies[100..].to_vec()).unwrap()),
                model.clone(),
                TrajectoryOptions::default().with_subset("name CA"),
            )
            .unwrap(),
        ]
    };

    let mut vtraj = VirtualTrajectory::new(trajectories(), FrameSelection::default());
    c.bench_function("VirtualTrajectory::iter (200 frames)", |b| {
        b.iter(|| {
            std::hint::black_box(vtraj.iter().map(|frame| frame.unwrap().len()).sum::<usize>());
        })
    });

    let mut gro = SingleTrajectory::open_gro(
        "test_files/traj1.gro",
        model.clone(),
        TrajectoryOptions::default(),
    )
    .unwrap();
    c.bench_function("SingleTrajectory::iter (gro, 10 frames)", |b| {
        b.iter(|| {
            std::hint::black_box(gro.iter().map(|frame| frame.unwrap().len()).sum::<usize>());
        })
    });

    c.bench_function("AlignedVirtualTrajectory::align (200 frames)", |b| {
        b.iter(|| {
            let mut aligned = AlignedVirtualTrajectory::new(
                trajectories(),
                FrameSelection::default(),
                AlignOptions::default(),
            );
            aligned.align().unwrap();
            std::hint::black_box(aligned.rmsd().unwrap());
        })
    });

    let mut aligned = AlignedVirtualTrajectory::new(
        trajectories(),
        FrameSelection::default(),
        AlignOptions::default(),
    );
    aligned.align().unwrap();
    c.bench_function("svd (aligned, 200 frames)", |b| {
        b.iter(|| {
            std::hint::black_box(svd(&mut aligned).unwrap());
        })
    });
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
