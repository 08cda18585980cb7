//! Plain-text exports of perturbation trajectories for visualization.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use ics::{ANGBOHR, Ic, Unit};

use crate::{perturbation::Estimate, trajectory::Trajectory};

/// `name` with the `/` separating the kind prefix replaced so it can be used
/// in a file name
pub fn file_stem(name: &str) -> String {
    name.replace('/', "-")
}

/// write every sample of `traj` as an XYZ frame in Å
pub fn write_xyz<W: Write>(
    w: &mut W,
    labels: &[String],
    traj: &Trajectory,
) -> std::io::Result<()> {
    for s in &traj.samples {
        writeln!(w, "{}", labels.len())?;
        writeln!(
            w,
            "{} disp = {:.8} q = {:.8} E = {:.12}",
            traj.ic, s.disp, s.q, s.energy
        )?;
        for (label, atom) in labels.iter().zip(&s.geom.0) {
            let a = atom * ANGBOHR;
            writeln!(w, "{label:<2}{:15.10}{:15.10}{:15.10}", a[0], a[1], a[2])?;
        }
    }
    Ok(())
}

/// Write the energy profile of `traj`: displacement and value in the units of
/// `ic`, and the sampled and fitted energies in kJ/mol relative to the lowest
/// sampled energy. The fitted column is left out without an estimate.
pub fn write_energies<W: Write>(
    w: &mut W,
    ic: &Ic,
    traj: &Trajectory,
    est: Option<&Estimate>,
) -> std::io::Result<()> {
    let qu = ic.qunit();
    let emin = traj
        .samples
        .iter()
        .map(|s| s.energy)
        .fold(f64::INFINITY, f64::min);
    write!(
        w,
        "# {:>14} {:>16} {:>16}",
        format!("disp [{qu}]"),
        format!("q [{qu}]"),
        "E [kjmol]"
    )?;
    if est.is_some() {
        write!(w, " {:>16}", "fit [kjmol]")?;
    }
    writeln!(w)?;
    for s in &traj.samples {
        write!(
            w,
            "{:16.8} {:16.8} {:16.8}",
            qu.to_unit(s.disp),
            qu.to_unit(s.q),
            Unit::Kjmol.to_unit(s.energy - emin)
        )?;
        if let Some(est) = est {
            let fit = est.energy(s.disp) - emin;
            write!(w, " {:16.8}", Unit::Kjmol.to_unit(fit))?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// write `trajectory-<name>.xyz` and `energies-<name>.dat` for `ic` into
/// `dir` and return their paths
pub fn export(
    dir: &Path,
    labels: &[String],
    ic: &Ic,
    traj: &Trajectory,
    est: Option<&Estimate>,
) -> std::io::Result<Vec<PathBuf>> {
    let stem = file_stem(&ic.name);
    let xyz = dir.join(format!("trajectory-{stem}.xyz"));
    let mut w = BufWriter::new(File::create(&xyz)?);
    write_xyz(&mut w, labels, traj)?;
    w.flush()?;

    let dat = dir.join(format!("energies-{stem}.dat"));
    let mut w = BufWriter::new(File::create(&dat)?);
    write_energies(&mut w, ic, traj, est)?;
    w.flush()?;
    Ok(vec![xyz, dat])
}
