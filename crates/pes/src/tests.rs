use approx::assert_abs_diff_eq;
use ics::{Siic, Vec3};
use test_case::test_case;

use super::*;

const R0: f64 = 1.85;
const KR: f64 = 0.5;
const A0: f64 = 1.82;
const KA: f64 = 0.16;

fn water() -> Geom {
    let theta: f64 = 1.9;
    Geom(vec![
        Vec3::zeros(),
        Vec3::new(1.8, 0.0, 0.0),
        Vec3::new(1.8 * theta.cos(), 1.8 * theta.sin(), 0.0),
    ])
}

fn valence() -> Valence {
    let mut ret = Valence::new();
    ret.insert(
        "bond/H.O",
        Term::new(
            Form::Harmonic { q0: R0 },
            KR,
            vec![Siic::Stretch(0, 1), Siic::Stretch(0, 2)],
        ),
    );
    ret.insert(
        "bend/H.O.H",
        Term::new(Form::Harmonic { q0: A0 }, KA, vec![Siic::Bend(1, 0, 2)]),
    );
    ret
}

fn nudge(geom: &Geom, i: usize, h: f64) -> Geom {
    let mut ret = geom.clone();
    ret[i / 3][i % 3] += h;
    ret
}

fn check_derivatives(pot: &dyn Potential, geom: &Geom, eps: f64) {
    const H: f64 = 1e-5;
    let grad = pot.gradient(geom);
    let hess = pot.hessian(geom);
    let n = 3 * geom.len();
    for i in 0..n {
        let fwd = nudge(geom, i, H);
        let bwd = nudge(geom, i, -H);
        let want = (pot.energy(&fwd) - pot.energy(&bwd)) / (2.0 * H);
        assert_abs_diff_eq!(grad[i], want, epsilon = eps);
        let col = (pot.gradient(&fwd) - pot.gradient(&bwd)) / (2.0 * H);
        for j in 0..n {
            assert_abs_diff_eq!(hess[(j, i)], col[j], epsilon = eps);
        }
    }
}

#[test]
fn valence_derivatives() {
    check_derivatives(&valence(), &water(), 1e-6);
}

#[test]
fn taylor_derivatives() {
    let geom = water();
    let v = valence();
    let taylor =
        Taylor::new(&geom, -76.0, v.gradient(&geom), v.hessian(&geom));
    assert_eq!(taylor.energy(&geom), -76.0);
    check_derivatives(&taylor, &nudge(&geom, 4, 0.05), 1e-6);
}

#[test_case(Form::Harmonic { q0: 0.3 }, false; "harmonic")]
#[test_case(Form::Cosine { m: 3, phi0: 0.0 }, true; "threefold")]
#[test_case(Form::Cosine { m: 2, phi0: std::f64::consts::FRAC_PI_2 }, true; "twofold")]
fn form_derivatives(form: Form, periodic: bool) {
    const H: f64 = 1e-5;
    for q in [-2.0, -0.4, 0.1, 1.3] {
        let (_, dv, d2v) = form.eval(q, periodic);
        let (vf, df, _) = form.eval(q + H, periodic);
        let (vb, db, _) = form.eval(q - H, periodic);
        assert_abs_diff_eq!(dv, (vf - vb) / (2.0 * H), epsilon = 1e-8);
        assert_abs_diff_eq!(d2v, (df - db) / (2.0 * H), epsilon = 1e-8);
    }
}

#[test]
fn cosine_minimum() {
    let form = Form::Cosine { m: 3, phi0: 1.0 };
    let (v, dv, d2v) = form.eval(1.0 + 2.0 * std::f64::consts::PI / 3.0, true);
    assert_abs_diff_eq!(v, 0.0, epsilon = 1e-15);
    assert_abs_diff_eq!(dv, 0.0, epsilon = 1e-14);
    assert_abs_diff_eq!(d2v, 4.5, epsilon = 1e-14);
    assert_eq!(form.q0(), None);
}

#[test_case(Siic::Stretch(0, 1), 1.9, 0.5 * KR * (1.9 - R0) * (1.9 - R0); "stretch")]
#[test_case(Siic::Bend(1, 0, 2), 1.7, 0.5 * KA * (1.7 - A0) * (1.7 - A0); "bend")]
fn relax_water(ic: Siic, target: f64, want: f64) {
    let pot = valence();
    let start = water().displace(&ic, target).unwrap();
    let lagrange = Lagrange::new(1e-10, 50);
    let got = lagrange.relax(&pot, &start, &ic, target).unwrap();
    assert_abs_diff_eq!(got.energy, want, epsilon = 1e-10);
    assert_abs_diff_eq!(ic.value(&got.geom), target, epsilon = 1e-10);
    // everything else is free to reach its minimum
    for other in [Siic::Stretch(0, 1), Siic::Stretch(0, 2), Siic::Bend(1, 0, 2)] {
        if other == ic {
            continue;
        }
        let q0 = if matches!(other, Siic::Bend(..)) { A0 } else { R0 };
        assert_abs_diff_eq!(other.value(&got.geom), q0, epsilon = 1e-8);
    }
}

#[test]
fn relax_not_converged() {
    let pot = valence();
    let ic = Siic::Stretch(0, 1);
    let start = water().displace(&ic, 2.0).unwrap();
    let got = Lagrange::new(1e-10, 1).relax(&pot, &start, &ic, 2.0);
    assert!(matches!(got, Err(PesError::ConvergenceFailure(_))));
}
