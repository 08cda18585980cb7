use approx::assert_abs_diff_eq;
use test_case::test_case;

use super::*;

#[test]
fn load() {
    let got = Config::load("testfiles/test.toml");
    let want = Config {
        reference: String::from("water.json"),
        fns_traj: Some(String::from("trajectories.json")),
        skip_dihedrals: true,
        steps: 7,
        plot_steps: 51,
        amplitudes: Amplitudes {
            bond: 0.02 * ANGSTROM,
            dihed: 15.0 * DEG,
            ..Amplitudes::default()
        },
        relax_tol: 1e-9,
        relax_max_iter: 100,
        rcond: 1e-10,
        parallel: true,
        threads: 2,
    };
    assert_eq!(got, want);
}

#[test]
fn defaults() {
    let got: Config = toml::from_str(r#"reference = "ref.json""#).unwrap();
    assert_eq!(got, Config::new("ref.json"));
    assert!(got.validate().is_ok());
    assert_abs_diff_eq!(
        got.amplitudes.get(&Siic::Bend(0, 1, 2)),
        5.0 * std::f64::consts::PI / 180.0,
        epsilon = 1e-15
    );
    assert_abs_diff_eq!(
        got.amplitudes.get(&Siic::Stretch(0, 1)),
        0.094_486_306,
        epsilon = 1e-9
    );
}

#[test]
fn unknown_field() {
    let got: Result<Config, _> = toml::from_str(
        r#"
reference = "ref.json"
step_size = 0.005
"#,
    );
    assert!(got.is_err());
}

#[test]
fn too_few_steps() {
    let got = Config::new("ref.json").steps(2).validate();
    assert!(matches!(got, Err(Error::Config(_))));
    assert!(Config::new("ref.json").steps(3).validate().is_ok());
}

#[test_case(-1e-10, false; "negative")]
#[test_case(0.0, true; "zero")]
#[test_case(1e-10, true; "default")]
#[test_case(1.0, false; "one")]
#[test_case(2.5, false; "above one")]
fn rcond_range(rcond: f64, ok: bool) {
    let got = Config::new("ref.json").rcond(rcond).validate();
    assert_eq!(got.is_ok(), ok);
    if !ok {
        assert!(got.is_err_and(|e| e.to_string().contains("rcond")));
    }
}
