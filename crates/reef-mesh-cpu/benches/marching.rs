use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

use reef_geom::Vec3;
use reef_mesh_cpu::{build_water_plane, extract};
use reef_world::{ChunkCoord, ColumnCoord, DensityField, DensityParams, LatticeResolution, Preset};

fn bench_extract_floor_chunk(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_floor_chunk");
    let field = DensityField::new(DensityParams::default());
    let size = Vec3::splat(10.0);
    for n in [8u32, 16, 21] {
        let res = LatticeResolution::cubic(n);
        group.bench_function(format!("ocean_{n}x{n}x{n}"), |b| {
            b.iter(|| {
                let g = extract(&field, ChunkCoord::new(0, -7, 0), res, size, field.threshold());
                black_box(g)
            })
        });
    }
    group.finish();
}

fn bench_extract_cinematic(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_cinematic");
    group.measurement_time(Duration::from_secs(8));
    let mut params = DensityParams::default();
    Preset::Cinematic.apply(&mut params);
    let field = DensityField::new(params);
    let res = LatticeResolution::cubic(16);
    group.bench_function("cinematic_16", |b| {
        b.iter(|| {
            let g = extract(
                &field,
                ChunkCoord::new(1, -3, 2),
                res,
                Vec3::splat(10.0),
                field.threshold(),
            );
            black_box(g)
        })
    });
    group.finish();
}

fn bench_water_plane(c: &mut Criterion) {
    c.bench_function("water_plane_16", |b| {
        b.iter(|| {
            black_box(build_water_plane(
                ColumnCoord::new(0, 0),
                LatticeResolution::cubic(16),
                Vec3::splat(10.0),
                40.0,
            ))
        })
    });
}

criterion_group!(
    benches,
    bench_extract_floor_chunk,
    bench_extract_cinematic,
    bench_water_plane
);
criterion_main!(benches);
