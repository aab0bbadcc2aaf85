use proptest::prelude::*;
use reef_geom::{Aabb, Vec3};

fn approx(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

fn coord() -> impl Strategy<Value = f32> {
    -1e3f32..1e3
}

fn arb_vec3() -> impl Strategy<Value = Vec3> {
    (coord(), coord(), coord()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

proptest! {
    // Normalizing a non-trivial vector yields unit length.
    #[test]
    fn normalized_is_unit(v in arb_vec3()) {
        prop_assume!(v.length() > 1e-3);
        prop_assert!(approx(v.normalized().length(), 1.0, 1e-4));
    }

    // Cross product is orthogonal to both inputs (scaled tolerance).
    #[test]
    fn cross_orthogonal(a in arb_vec3(), b in arb_vec3()) {
        let c = a.cross(b);
        let scale = a.length() * b.length() * (a.length() + b.length()) + 1.0;
        prop_assert!(c.dot(a).abs() <= 1e-4 * scale);
        prop_assert!(c.dot(b).abs() <= 1e-4 * scale);
    }

    // A box built from points contains every one of them.
    #[test]
    fn aabb_from_points_contains_all(points in prop::collection::vec(arb_vec3(), 1..32)) {
        let b = Aabb::from_points(points.iter().copied());
        prop_assert!(!b.is_empty());
        for p in &points {
            prop_assert!(b.contains(*p));
        }
    }

    // Component-wise min/max bracket both operands.
    #[test]
    fn min_max_bracket(a in arb_vec3(), b in arb_vec3()) {
        let lo = a.min(b);
        let hi = a.max(b);
        let bx = Aabb::new(lo, hi);
        prop_assert!(bx.contains(a));
        prop_assert!(bx.contains(b));
    }
}

#[test]
fn elementwise_ops() {
    let a = Vec3::new(2.0, 4.0, 8.0);
    let b = Vec3::new(2.0, 2.0, 4.0);
    assert_eq!(a.mul_elem(b), Vec3::new(4.0, 8.0, 32.0));
    assert_eq!(a.div_elem(b), Vec3::new(1.0, 2.0, 2.0));
    assert_eq!(-a, Vec3::new(-2.0, -4.0, -8.0));
    assert_eq!(Vec3::from([1.0, 2.0, 3.0]).to_array(), [1.0, 2.0, 3.0]);
}
