use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::matrix::{Configuration, Matrix};
use crate::steps::{self, BenchmarkResult, Toolchain};
use crate::timing::benchmark_args;
use crate::{Error, Result};

/// Step applied across the whole matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Configure,
    Build,
    Benchmark,
}

impl Action {
    pub fn name(self) -> &'static str {
        match self {
            Action::Configure => "configure",
            Action::Build => "build",
            Action::Benchmark => "benchmark",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Runner {
    pub root: PathBuf,
    pub matrix: Matrix,
    pub toolchain: Toolchain,
    /// Worker count for configure and build. Benchmarks ignore it.
    pub jobs: usize,
}

impl Runner {
    pub fn new(root: PathBuf, matrix: Matrix, toolchain: Toolchain, jobs: usize) -> Self {
        Self {
            root,
            matrix,
            toolchain,
            jobs: jobs.max(1),
        }
    }

    /// Runs configure or build for every configuration on a pool of `jobs`
    /// workers.
    ///
    /// The first failure stops further configurations from being started;
    /// those already running are allowed to finish and the first error is
    /// returned. [`Action::Benchmark`] is delegated to [`Runner::benchmark`]
    /// with the default arguments.
    pub fn run_matrix(&self, action: Action) -> Result<()> {
        self.matrix.validate()?;
        let step: fn(&std::path::Path, &Configuration, &Toolchain) -> Result<()> = match action {
            Action::Configure => {
                let builds = self.root.join("builds");
                std::fs::create_dir_all(&builds)
                    .map_err(|e| Error::io(format!("creating {}", builds.display()), e))?;
                steps::configure
            }
            Action::Build => steps::build,
            Action::Benchmark => return self.benchmark(&benchmark_args(&[])).map(|_| ()),
        };

        let configs = self.matrix.configurations();
        let total = configs.len();
        let workers = self.jobs.min(total.max(1));
        log::info!(
            "[{}] {} configurations on {} worker(s)",
            action.name(),
            total,
            workers
        );

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("multibuild-{i}"))
            .build()?;

        let started = AtomicUsize::new(0);
        pool.install(|| {
            configs.par_iter().try_for_each(|config| {
                let n = started.fetch_add(1, Ordering::Relaxed) + 1;
                log::info!("[{n}/{total}] {} {}", action.name(), config);
                step(&self.root, config, &self.toolchain).inspect_err(|e| {
                    log::error!("{} {} failed: {e}", action.name(), config);
                })
            })
        })?;

        log::info!("[{}] done", action.name());
        Ok(())
    }

    /// Benchmarks every configuration one after another, in matrix order.
    ///
    /// Each result row is printed to stdout as soon as it is known. `jobs`
    /// is ignored so runs never compete for the machine.
    pub fn benchmark(&self, args: &[String]) -> Result<Vec<BenchmarkResult>> {
        self.matrix.validate()?;
        let configs = self.matrix.configurations();
        let total = configs.len();
        if self.jobs > 1 {
            log::warn!("-j {} has no effect when benchmarking", self.jobs);
        }

        let mut results = Vec::with_capacity(total);
        for (i, config) in configs.iter().enumerate() {
            log::info!("[{}/{total}] benchmark {}", i + 1, config);
            let result = steps::benchmark(&self.root, config, &self.toolchain, args)?;
            println!("{result}");
            results.push(result);
        }
        Ok(results)
    }
}
