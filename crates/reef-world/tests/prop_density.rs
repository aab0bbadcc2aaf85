use proptest::prelude::*;
use reef_geom::Vec3;
use reef_world::{DensityField, DensityParams, Preset, ScalarField};

fn arb_params() -> impl Strategy<Value = DensityParams> {
    (
        0.05f32..2.0,
        1u32..6,
        0.0f32..=1.0,
        1.0f32..4.0,
        -0.5f32..0.5,
        (1.0f32..8.0, 0.25f32..6.0),
        (-10.0f32..-1.0, 0.25f32..3.0),
    )
        .prop_map(
            |(frequency, octave_count, persistence, lacunarity, threshold, (s, sh), (fl, fh))| {
                DensityParams {
                    frequency,
                    octave_count,
                    persistence,
                    lacunarity,
                    threshold,
                    surface_level: s,
                    surface_transition_height: sh,
                    floor_level: fl,
                    floor_transition_height: fh,
                    sea_level: 0.0,
                }
            },
        )
}

fn arb_point() -> impl Strategy<Value = Vec3> {
    (-20.0f32..20.0, -15.0f32..12.0, -20.0f32..20.0).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Samples always stay in [-1, 1].
    #[test]
    fn sample_is_bounded(params in arb_params(), p in arb_point()) {
        prop_assume!(params.validate().is_ok());
        let f = DensityField::new(params);
        let v = f.sample_at(p);
        prop_assert!((-1.0..=1.0).contains(&v), "sample {} out of range", v);
    }

    // Masks stay in [0, 1] for any height.
    #[test]
    fn masks_are_bounded(params in arb_params(), y in -50.0f32..50.0) {
        prop_assume!(params.validate().is_ok());
        let f = DensityField::new(params);
        let s = f.surface_mask(y);
        let fl = f.floor_mask(y);
        prop_assert!((0.0..=1.0).contains(&s));
        prop_assert!((0.0..=1.0).contains(&fl));
    }

    // Rebuilding from the same params reproduces every sample exactly.
    #[test]
    fn rebuild_is_deterministic(params in arb_params(), p in arb_point()) {
        let a = DensityField::new(params.clone());
        let b = DensityField::new(params);
        prop_assert_eq!(a.sample_at(p).to_bits(), b.sample_at(p).to_bits());
    }

    // Normals are unit length wherever the gradient does not vanish.
    #[test]
    fn normals_are_unit(p in arb_point()) {
        let f = DensityField::new(DensityParams::default());
        let n = f.normal_at(p);
        let len = n.length();
        prop_assert!((len - 1.0).abs() < 1e-4);
    }
}

#[test]
fn presets_produce_valid_params() {
    for preset in Preset::ALL {
        let mut p = DensityParams::default();
        preset.apply(&mut p);
        assert!(p.validate().is_ok(), "{} invalid", preset.name());
    }
}
