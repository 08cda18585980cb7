use approx::assert_abs_diff_eq;
use test_case::test_case;

use super::*;

fn sample(xs: &[f64], f: impl Fn(f64) -> f64) -> Vec<f64> {
    xs.iter().map(|&x| f(x)).collect()
}

#[test_case(3; "three points")]
#[test_case(5; "five points")]
#[test_case(11; "eleven points")]
fn harmonic(n: usize) {
    let (k, q0, e0) = (0.42, 0.013, -76.3);
    let xs: Vec<_> = (0..n)
        .map(|i| -0.1 + 0.2 * i as f64 / (n - 1) as f64)
        .collect();
    let es = sample(&xs, |x| e0 + 0.5 * k * (x - q0).powi(2));
    let fit = Polyfit::new(&xs, &es, 2).unwrap().run().unwrap();
    assert_abs_diff_eq!(fit.derivative(2), k, epsilon = 1e-9);
    assert_abs_diff_eq!(fit.bias.disp, q0, epsilon = 1e-9);
    assert_abs_diff_eq!(fit.bias.energy, e0, epsilon = 1e-9);
    assert_abs_diff_eq!(fit.derivative(1), 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(fit.residual, 0.0, epsilon = 1e-16);
    assert_eq!(fit.kind, StatKind::Min);
}

#[test]
fn maximum() {
    let xs = [-0.2, -0.1, 0.0, 0.1, 0.2];
    let es = sample(&xs, |x| 1.0 - 3.0 * (x + 0.05).powi(2));
    let fit = Polyfit::new(&xs, &es, 2).unwrap().run().unwrap();
    assert_eq!(fit.kind, StatKind::Max);
    assert_abs_diff_eq!(fit.bias.disp, -0.05, epsilon = 1e-10);
    assert_abs_diff_eq!(fit.derivative(2), -6.0, epsilon = 1e-9);
}

#[test]
fn quartic() {
    let xs: Vec<_> = (0..9).map(|i| -0.2 + 0.05 * i as f64).collect();
    let es = sample(&xs, |x| 0.5 * x * x + 0.1 * x.powi(3) + 0.02 * x.powi(4));
    let fit = Polyfit::new(&xs, &es, 4).unwrap().run().unwrap();
    assert_abs_diff_eq!(fit.bias.disp, 0.0, epsilon = 1e-8);
    assert_abs_diff_eq!(fit.derivative(2), 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(fit.derivative(3), 0.6, epsilon = 1e-5);
    assert_abs_diff_eq!(fit.derivative(4), 0.48, epsilon = 1e-4);
}

#[test]
fn eval_and_residuals() {
    let xs = [-1.0, 0.0, 1.0, 2.0];
    let es = [2.0, 1.0, 2.0, 5.5];
    let p = Polyfit::new(&xs, &es, 2).unwrap();
    let coeffs = Dvec::from(vec![1.0, 0.0, 1.0]);
    assert_abs_diff_eq!(p.eval(2.0, &coeffs), 5.0);
    let (_, f) = p.fit().unwrap();
    assert_abs_diff_eq!(p.residuals(&coeffs, &f), 0.25);
}

#[test]
fn errors() {
    assert_eq!(
        Polyfit::new(&[0.0, 1.0], &[0.0, 1.0], 2).unwrap_err(),
        FitError::InsufficientData { have: 2, need: 3 }
    );
    assert_eq!(
        Polyfit::new(&[0.0, 1.0, 2.0], &[0.0, 1.0], 2).unwrap_err(),
        FitError::Shape(3, 2)
    );
    let p = Polyfit::new(&[0.0, 1.0, 2.0], &[1.0, 2.0, 3.0], 2).unwrap();
    let line = Dvec::from(vec![1.0, 1.0, 0.0]);
    assert_eq!(p.newton(&line).unwrap_err(), FitError::Flat);
}

#[test]
fn display() {
    let bias = Bias {
        disp: 0.25,
        energy: -1.5,
    };
    assert_eq!(bias.to_string(), "  0.25000000     -1.500000000000");
    assert_eq!(StatKind::Max.to_string(), "maximum");
    assert_eq!(StatKind::Min.to_string(), "minimum");
}
