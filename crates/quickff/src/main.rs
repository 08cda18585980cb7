use std::{
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
};

use anyhow::Context;
use clap::Parser;
use quickff::{Config, LogObserver, Program, Reference, die};

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// set by the SIGINT handler and polled before every relaxed sample
static INTERRUPT: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_: libc::c_int) {
    INTERRUPT.store(true, Ordering::SeqCst);
}

/// harmonic force fields from ab initio reference data
#[derive(Parser, Debug)]
#[command(author, about, long_about = None)]
struct Args {
    /// input file
    #[arg(value_parser, default_value_t = String::from("quickff.toml"))]
    infile: String,

    /// Generate and export the perturbation trajectories of every kind
    /// matching the regular expression PATTERN instead of deriving a force
    /// field.
    #[arg(short, long, value_name = "PATTERN")]
    plot: Option<String>,

    /// Replace an existing trajectory store instead of reading it. Defaults
    /// to false.
    #[arg(short, long, default_value_t = false)]
    overwrite: bool,

    /// Print the git commit hash and exit. Defaults to false.
    #[arg(short, long, default_value_t = false)]
    version: bool,

    /// Set the maximum number of threads to use. Defaults to 0, which means to
    /// use the value in the input file.
    #[arg(short, long, default_value_t = 0)]
    threads: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    if args.version {
        println!("version: {}", version());
        return Ok(());
    }
    let config = Config::load(&args.infile);
    if let Err(e) = config.validate() {
        die!("invalid configuration in {}: {e}", args.infile);
    }
    if args.overwrite
        && args.plot.is_none()
        && let Some(path) = &config.fns_traj
        && Path::new(path).exists()
    {
        std::fs::remove_file(path)
            .with_context(|| format!("failed to remove {path}"))?;
    }
    let threads = if args.threads > 0 {
        args.threads
    } else {
        config.threads
    };
    quickff::max_threads(threads);

    unsafe {
        libc::signal(
            libc::SIGINT,
            on_sigint as *const () as libc::sighandler_t,
        );
    }

    let (system, taylor) = Reference::load(&config.reference)
        .and_then(Reference::build)
        .with_context(|| format!("failed to load {}", config.reference))?;

    println!("version: {}", version());
    print!("{config}");

    let mut program = Program::new(system, taylor, config, &INTERRUPT);
    let mut out = std::io::stdout();
    match args.plot {
        Some(pattern) => {
            let dir = Path::new(".");
            let summary =
                program.plot_pt(&pattern, dir, &mut out, &LogObserver)?;
            if summary.interrupted {
                anyhow::bail!("interrupted, partial results written");
            }
        }
        None => {
            program.run(&mut out, &LogObserver)?;
        }
    }
    Ok(())
}
