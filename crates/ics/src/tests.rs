use approx::assert_abs_diff_eq;
use nalgebra as na;
use test_case::test_case;

use crate::{geom::wrap_angle, *};

fn four_atoms() -> Geom {
    Geom(vec![
        Vec3::new(0.1, 0.2, -0.1),
        Vec3::new(2.6, 0.1, 0.3),
        Vec3::new(-0.7, 1.8, 0.2),
        Vec3::new(3.1, 1.2, 1.9),
    ])
}

fn labels(s: &[&str]) -> Vec<String> {
    s.iter().map(|s| s.to_string()).collect()
}

fn formaldehyde() -> System {
    System::new(
        labels(&["C", "O", "H", "H"]),
        None,
        Geom::from_angstrom(&[
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 1.21],
            [0.0, 0.94, -0.58],
            [0.0, -0.94, -0.58],
        ]),
        None,
    )
    .unwrap()
}

fn peroxide() -> System {
    System::new(
        labels(&["O", "O", "H", "H"]),
        None,
        Geom::from_angstrom(&[
            [0.0, 0.0, 0.0],
            [1.45, 0.0, 0.0],
            [-0.3, 0.92, 0.0],
            [1.75, 0.3, 0.87],
        ]),
        None,
    )
    .unwrap()
}

#[test_case(Siic::Stretch(0, 1); "stretch")]
#[test_case(Siic::Bend(2, 0, 1); "bend")]
#[test_case(Siic::OopDist(0, 1, 2, 3); "opdist")]
#[test_case(Siic::Torsion(2, 0, 1, 3); "torsion")]
fn s_vec_matches_finite_difference(ic: Siic) {
    const H: f64 = 1e-6;
    let geom = four_atoms();
    let got = geom.s_vec(&ic);
    for atom in 0..geom.len() {
        for x in 0..3 {
            let mut fwd = geom.clone();
            fwd[atom][x] += H;
            let mut bwd = geom.clone();
            bwd[atom][x] -= H;
            let want = (ic.value(&fwd) - ic.value(&bwd)) / (2.0 * H);
            assert_abs_diff_eq!(got[3 * atom + x], want, epsilon = 1e-7);
        }
    }
}

#[test]
fn stretch_second_derivative() {
    let geom = four_atoms();
    let got = geom.s_vec2(&Siic::Stretch(0, 1));
    let e = geom.unit(0, 1);
    let r = geom.dist(0, 1);
    let want = (na::Matrix3::identity() - e * e.transpose()) / r;
    for i in 0..3 {
        for j in 0..3 {
            assert_abs_diff_eq!(got[(i, j)], want[(i, j)], epsilon = 1e-7);
            // moving atom 0 against atom 1 flips the sign
            assert_abs_diff_eq!(got[(i, 3 + j)], -want[(i, j)], epsilon = 1e-7);
        }
    }
    // atom 2 is not involved
    assert_abs_diff_eq!(got.row(6).norm(), 0.0, epsilon = 1e-12);
}

#[test]
fn torsion_value() {
    // trans H-O-O-H in the xy plane
    let geom = Geom(vec![
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
    ]);
    let got = Siic::Torsion(0, 1, 2, 3).value(&geom);
    assert_abs_diff_eq!(got.abs(), std::f64::consts::PI, epsilon = 1e-12);

    let geom = Geom(vec![
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 1.0),
    ]);
    let got = Siic::Torsion(0, 1, 2, 3).value(&geom);
    assert_abs_diff_eq!(got.abs(), std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
}

#[test_case(Siic::Stretch(0, 1), 0.2; "stretch")]
#[test_case(Siic::Bend(2, 0, 1), -0.15; "bend")]
#[test_case(Siic::OopDist(0, 1, 2, 3), 0.3; "opdist")]
#[test_case(Siic::Torsion(2, 0, 1, 3), 0.25; "torsion")]
fn displace(ic: Siic, delta: f64) {
    let geom = four_atoms();
    let q = ic.value(&geom);
    let got = geom.displace(&ic, q + delta).unwrap();
    let mut diff = ic.value(&got) - (q + delta);
    if ic.is_torsion() {
        diff = wrap_angle(diff);
    }
    assert_abs_diff_eq!(diff, 0.0, epsilon = 1e-10);
}

#[test]
fn wrap() {
    use std::f64::consts::PI;
    assert_abs_diff_eq!(wrap_angle(1.5 * PI), -0.5 * PI, epsilon = 1e-12);
    assert_abs_diff_eq!(wrap_angle(-PI), PI);
    assert_abs_diff_eq!(wrap_angle(0.25), 0.25, epsilon = 1e-15);
}

#[test]
fn formaldehyde_ics() {
    let sys = formaldehyde();
    assert_eq!(sys.bonds, vec![(0, 1), (0, 2), (0, 3)]);
    let kinds: Vec<_> = sys.ics.keys().cloned().collect();
    assert_eq!(
        kinds,
        vec![
            "bend/H.C.H",
            "bend/H.C.O",
            "bond/C.H",
            "bond/C.O",
            "opdist/H.H.O.C",
        ]
    );
    assert_eq!(sys.ics["bend/H.C.O"].len(), 2);
    assert_eq!(sys.ics["bond/C.H"].len(), 2);
    assert_eq!(
        sys.ics["opdist/H.H.O.C"][0].siic,
        Siic::OopDist(2, 3, 1, 0)
    );
    assert_eq!(sys.ics["bond/C.O"][0].name, "bond/C.O(0,1)");
}

#[test]
fn peroxide_ics() {
    let sys = peroxide();
    assert_eq!(sys.ics["dihed/H.O.O.H"].len(), 1);
    assert_eq!(sys.ics["dihed/H.O.O.H"][0].siic, Siic::Torsion(2, 0, 1, 3));
    assert_eq!(sys.ics["bend/H.O.O"].len(), 2);
    assert_eq!(sys.ics["bond/H.O"].len(), 2);
    assert_eq!(sys.ics["bond/O.O"].len(), 1);
    assert!(!sys.ics.contains_key("opdist/H.H.O.C"));
}

#[test]
fn bad_shape() {
    let got = System::new(
        labels(&["O", "H"]),
        None,
        Geom::from_angstrom(&[[0.0, 0.0, 0.0]]),
        None,
    );
    assert!(matches!(got, Err(IcsError::Shape(_))));

    let got = System::new(
        labels(&["O", "H"]),
        None,
        Geom::from_angstrom(&[[0.0, 0.0, 0.0], [0.0, 0.0, 0.96]]),
        Some(vec![(0, 2)]),
    );
    assert_eq!(got, Err(IcsError::BadIndex(2)));
}

#[test]
fn units() {
    assert_abs_diff_eq!(Unit::Angstrom.to_unit(1.0 / ANGBOHR), 1.0);
    assert_abs_diff_eq!(
        Unit::Deg.to_unit(std::f64::consts::PI),
        180.0,
        epsilon = 1e-12
    );
    assert_abs_diff_eq!(
        Unit::KjmolPerA2.from_unit(Unit::KjmolPerA2.to_unit(0.37)),
        0.37,
        epsilon = 1e-15
    );
    assert_eq!(Siic::Bend(0, 1, 2).kunit().to_string(), "kjmol/rad**2");
}
