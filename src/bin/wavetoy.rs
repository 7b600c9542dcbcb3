//! Command-line driver: decompose the grid, run the wave solver (or the
//! reduce-only check) on every rank and report the global integral on root.
//!
//! Without `mpi-support` the ranks are threads of this process:
//!
//! ```text
//! wavetoy 100 100 --threads 2 --nsteps 10
//! ```
//!
//! With `mpi-support` every MPI process is one rank:
//!
//! ```text
//! cargo mpirun -n 4 --features mpi-support --bin wavetoy -- 100 100
//! ```

use clap::Parser;
use halo_wave::algs::reduction::{expected_rank_fill_sum, rank_fill_reduction};
use halo_wave::prelude::*;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(version, about = "Distributed 2D wave equation with halo exchange", long_about = None)]
struct Args {
    /// Interior points along x
    nx: Option<usize>,
    /// Interior points along y
    ny: Option<usize>,
    /// Time levels to advance, counting the first step
    #[arg(long)]
    nsteps: Option<usize>,
    #[arg(long)]
    wave_speed: Option<f64>,
    /// Fraction of the grid spacing travelled per step
    #[arg(long)]
    courant: Option<f64>,
    /// Workers along x (requires --procs-y)
    #[arg(long, requires = "procs_y")]
    procs_x: Option<usize>,
    /// Workers along y (requires --procs-x)
    #[arg(long, requires = "procs_x")]
    procs_y: Option<usize>,
    /// In-process ranks when running without MPI
    #[arg(short, long, default_value_t = 1)]
    threads: usize,
    #[arg(long, value_enum)]
    mode: Option<RunMode>,
    /// Bound on every neighbor wait, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Args {
    fn solver_config(&self) -> Result<SolverConfig, DecompError> {
        let mut cfg = match &self.config {
            Some(path) => SolverConfig::from_path(path)?,
            None => SolverConfig::default(),
        };
        if let Some(nx) = self.nx {
            cfg.nx = nx;
        }
        if let Some(ny) = self.ny {
            cfg.ny = ny;
        }
        if let Some(n) = self.nsteps {
            cfg.nsteps = n;
        }
        if let Some(c) = self.wave_speed {
            cfg.wave_speed = c;
        }
        if let Some(k) = self.courant {
            cfg.courant = k;
        }
        if let (Some(px), Some(py)) = (self.procs_x, self.procs_y) {
            cfg.proc_grid = Some([px, py]);
        }
        if let Some(mode) = self.mode {
            cfg.mode = mode;
        }
        if let Some(ms) = self.timeout_ms {
            cfg.exchange_timeout_ms = ms;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn init_logger(rank: Option<usize>) {
    let env = env_logger::Env::default().default_filter_or("warn");
    env_logger::Builder::from_env(env)
        .format(move |buf, record| match rank {
            Some(r) => writeln!(buf, "[{} rank {r}] {}", record.level(), record.args()),
            None => writeln!(buf, "[{}] {}", record.level(), record.args()),
        })
        .init();
}

fn banner(cfg: &SolverConfig, topo: &WorkerTopology) {
    println!("------------------------------------------------------------------------");
    println!("Starting Wavetoy");
    println!("------------------------------------------------------------------------");
    println!("-- Decomposition");
    println!("   | Number of points along x = {}", cfg.nx);
    println!("   | Number of points along y = {}", cfg.ny);
    println!("   | Number of procs along x  = {}", topo.nxprocs());
    println!("   | Number of procs along y  = {}", topo.nyprocs());
    println!("   | Mode                     = {:?}", cfg.mode);
}

/// Everything one rank does. Identical on every rank.
fn run_worker<C>(comm: &C, cfg: &SolverConfig) -> Result<(), DecompError>
where
    C: Communicator + ?Sized,
{
    let rank = comm.rank();
    let is_root = rank == cfg.root;
    let topo = cfg.topology(comm.size())?;
    let domain = cfg.domain()?;
    if is_root {
        banner(cfg, &topo);
    }

    let mut solver = WaveSolver::new(comm, &topo, domain, cfg.root)?;
    match cfg.mode {
        RunMode::Wave => {
            solver.run(&Gaussian::centered(cfg.gaussian_width), cfg.nsteps)?;
            if let Some(s) = solver.summary()? {
                println!("-- Steps    = {}", solver.steps_taken());
                println!("-- Sum      = {:e}", s.sum);
                println!("-- Integral = {:e}", s.integral);
            }
        }
        RunMode::ReduceCheck => {
            let reducer = *solver.reducer();
            let got = rank_fill_reduction(solver.grid_mut(), &reducer, comm)?;
            if let Some(sum) = got {
                let (nxnom, nynom) = topo.nominal_size();
                let expected = expected_rank_fill_sum(comm.size(), nxnom, nynom);
                println!("-- Integral = {sum} (expected {expected})");
                if sum != expected {
                    log::error!("reduce check mismatch: got {sum}, expected {expected}");
                    return Err(DecompError::InvalidConfig(format!(
                        "reduce check returned {sum}, expected {expected}"
                    )));
                }
            }
        }
    }

    solver.finish()?;
    if is_root {
        println!("-- All done.");
    } else {
        println!("Process {} of {} finished.", rank + 1, comm.size());
    }
    Ok(())
}

#[cfg(feature = "mpi-support")]
fn main() -> ExitCode {
    let args = Args::parse();
    let cfg = args.solver_config();
    let timeout = cfg
        .as_ref()
        .map(SolverConfig::exchange_timeout)
        .unwrap_or(ThreadComm::DEFAULT_TIMEOUT);
    let comm = match MpiComm::with_timeout(timeout) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logger(Some(comm.rank()));
    match cfg.and_then(|cfg| run_worker(&comm, &cfg)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Configuration errors are identical on every rank; report them once.
            if comm.rank() == 0 || !e.is_configuration() {
                eprintln!("ERROR: {e}");
            }
            comm.abort(1)
        }
    }
}

#[cfg(not(feature = "mpi-support"))]
fn main() -> ExitCode {
    let args = Args::parse();
    init_logger(None);
    let cfg = match args.solver_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::FAILURE;
        }
    };
    if args.threads == 0 {
        eprintln!("ERROR: {}", DecompError::NoWorkers);
        return ExitCode::FAILURE;
    }
    let results = ThreadComm::run(args.threads, cfg.exchange_timeout(), |comm| {
        run_worker(comm, &cfg)
    });
    // Configuration errors are identical on every rank; report them once.
    let mut failed = false;
    for (rank, res) in results.into_iter().enumerate() {
        if let Err(e) = res {
            if !failed || !e.is_configuration() {
                eprintln!("ERROR (rank {rank}): {e}");
            }
            failed = true;
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
