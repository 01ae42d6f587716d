use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::runner::Action;
use crate::steps::Toolchain;

/// Configure, build and benchmark a CMake project across a matrix of
/// compilers, compiler versions and optimisation flag sets.
#[derive(Parser, Debug)]
#[command(name = "multibuild", version, about)]
#[command(group(ArgGroup::new("action").required(true).args(["cmake", "make", "benchmark"])))]
pub struct Cli {
    /// Run CMake to prepare every build directory
    #[arg(short = 'c', long)]
    pub cmake: bool,

    /// Run make in every build directory
    #[arg(short = 'm', long)]
    pub make: bool,

    /// Run the benchmark in every build directory, one at a time (-j has no effect)
    #[arg(short = 'b', long)]
    pub benchmark: bool,

    /// Number of configurations to configure or build in parallel
    #[arg(short = 'j', long = "jobs", default_value_t = 1, value_parser = parse_jobs)]
    pub jobs: usize,

    /// Project root (defaults to the nearest directory above the current one
    /// containing CMakeLists.txt)
    #[arg(long, env = "MULTIBUILD_ROOT")]
    pub root: Option<PathBuf>,

    /// YAML file replacing the built-in compiler and flag-set tables
    #[arg(long, env = "MULTIBUILD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only use this compiler (repeatable)
    #[arg(long = "compiler", value_name = "NAME")]
    pub compilers: Vec<String>,

    /// Only use this flag set (repeatable)
    #[arg(long = "flagset", value_name = "NAME")]
    pub flagsets: Vec<String>,

    /// Build-configuration tool
    #[arg(long, env = "MULTIBUILD_CMAKE", default_value = "cmake")]
    pub cmake_bin: String,

    /// Build tool
    #[arg(long, env = "MULTIBUILD_MAKE", default_value = "make")]
    pub make_bin: String,

    /// Benchmarked executable, relative to each build directory
    #[arg(long, env = "MULTIBUILD_EXECUTABLE", default_value = "./profit-cli")]
    pub executable: String,

    /// Log every external command
    #[arg(short, long)]
    pub verbose: bool,

    /// Arguments for the benchmarked executable (after `--`)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

fn parse_jobs(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl Cli {
    pub fn action(&self) -> Action {
        if self.cmake {
            Action::Configure
        } else if self.make {
            Action::Build
        } else {
            Action::Benchmark
        }
    }

    pub fn toolchain(&self) -> Toolchain {
        Toolchain {
            cmake: self.cmake_bin.clone().into(),
            make: self.make_bin.clone().into(),
            executable: self.executable.clone().into(),
        }
    }
}
