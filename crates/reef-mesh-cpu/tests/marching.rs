use proptest::prelude::*;
use reef_geom::Vec3;
use reef_mesh_cpu::{ChunkGeometry, MeshError, extract};
use reef_world::{ChunkCoord, DensityField, DensityParams, LatticeResolution};

const SIZE: Vec3 = Vec3::new(10.0, 10.0, 10.0);

fn ocean() -> DensityField {
    DensityField::new(DensityParams::default())
}

fn tri_area_sum(g: &ChunkGeometry) -> f32 {
    g.indices
        .chunks_exact(3)
        .map(|t| {
            let a = g.position(t[0] as usize);
            let b = g.position(t[1] as usize);
            let c = g.position(t[2] as usize);
            0.5 * (b - a).cross(c - a).length()
        })
        .sum()
}

#[test]
fn cap_rejects_22_accepts_21() {
    let f = ocean();
    let c = ChunkCoord::new(0, 0, 0);
    let err = extract(&f, c, LatticeResolution::cubic(22), SIZE, 0.2).unwrap_err();
    assert!(matches!(
        err,
        MeshError::ResolutionTooLarge { cells: 10648, cap: 10000, .. }
    ));
    assert!(extract(&f, c, LatticeResolution::cubic(21), SIZE, 0.2).is_ok());
}

#[test]
fn constant_field_yields_nothing() {
    for v in [-1.0f32, 0.0, 0.7, 1.0] {
        let field = move |_x: f32, _y: f32, _z: f32| v;
        let g = extract(
            &field,
            ChunkCoord::new(2, -1, 3),
            LatticeResolution::cubic(8),
            SIZE,
            0.2,
        )
        .unwrap();
        assert_eq!(g.triangle_count(), 0);
        assert_eq!(g.vertex_count(), 0);
    }
}

#[test]
fn horizontal_plane_area_matches_footprint() {
    // Rock below normalized y = 0.5, water above, inside chunk (0, 0, 0).
    let field = |_x: f32, y: f32, _z: f32| 0.5 - y;
    let g = extract(
        &field,
        ChunkCoord::new(0, 0, 0),
        LatticeResolution::cubic(8),
        SIZE,
        0.0,
    )
    .unwrap();
    assert!(g.is_consistent());
    let area = tri_area_sum(&g);
    assert!((area - 100.0).abs() < 1e-2, "area {area}");
    for i in 0..g.vertex_count() {
        assert!((g.position(i).y - 5.0).abs() < 1e-4);
        // Water is above, so normals point up.
        assert!((g.normal(i).y - 1.0).abs() < 1e-4);
    }
}

#[test]
fn sphere_vertices_lie_on_surface() {
    let center = Vec3::new(0.5, 0.5, 0.5);
    let field = move |x: f32, y: f32, z: f32| (Vec3::new(x, y, z) - center).length() - 0.35;
    let g = extract(
        &field,
        ChunkCoord::new(0, 0, 0),
        LatticeResolution::cubic(16),
        Vec3::splat(1.0),
        0.0,
    )
    .unwrap();
    assert!(g.triangle_count() > 0);
    for i in 0..g.vertex_count() {
        let r = (g.position(i) - center).length();
        assert!((r - 0.35).abs() < 0.01, "r {r}");
        // Inside the sphere samples below threshold, so normals point inward.
        let outward = (g.position(i) - center).normalized();
        assert!(g.normal(i).dot(outward) < -0.9);
    }
}

#[test]
fn vertices_stay_inside_chunk_bounds() {
    let f = ocean();
    let coord = ChunkCoord::new(-1, -1, 2);
    let g = extract(&f, coord, LatticeResolution::cubic(16), SIZE, 0.2).unwrap();
    let b = g.bounds();
    let lo = coord.world_origin(SIZE);
    let hi = lo + SIZE;
    let eps = 1e-3;
    if !g.is_empty() {
        assert!(b.min.x >= lo.x - eps && b.min.y >= lo.y - eps && b.min.z >= lo.z - eps);
        assert!(b.max.x <= hi.x + eps && b.max.y <= hi.y + eps && b.max.z <= hi.z + eps);
    }
}

#[test]
fn ocean_floor_chunk_has_geometry() {
    // The floor band forces a crossing between rock and water somewhere below y = 0.
    let f = ocean();
    let res = LatticeResolution::cubic(12);
    let total: usize = (-8..0)
        .map(|cy| {
            extract(&f, ChunkCoord::new(0, cy, 0), res, SIZE, 0.2)
                .unwrap()
                .triangle_count()
        })
        .sum();
    assert!(total > 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn index_buffers_are_consistent(
        cx in -3i32..3, cy in -9i32..5, cz in -3i32..3,
        rx in 1u32..12, ry in 1u32..12, rz in 1u32..12,
    ) {
        let f = ocean();
        let g = extract(
            &f,
            ChunkCoord::new(cx, cy, cz),
            LatticeResolution::new(rx, ry, rz),
            SIZE,
            f.threshold(),
        ).unwrap();
        prop_assert_eq!(g.indices.len() % 3, 0);
        prop_assert_eq!(g.normals.len(), g.positions.len());
        let n = g.vertex_count() as u32;
        prop_assert!(g.indices.iter().all(|&i| i < n));
        for i in 0..g.vertex_count() {
            let len = g.normal(i).length();
            prop_assert!((len - 1.0).abs() < 1e-4);
        }
    }
}
