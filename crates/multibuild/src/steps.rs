use std::ffi::{OsStr, OsString};
use std::path::Path;

use crate::matrix::Configuration;
use crate::sh::{ShOptions, ShOptionsBuilder, StreamMode};
use crate::timing::{parse_ms_per_iteration, MsPerIteration};
use crate::{sh, Error, Result};

/// External programs driven for each configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toolchain {
    /// Build-configuration tool, run as `cmake -DCMAKE_CXX_COMPILER=.. -DCMAKE_CXX_FLAGS=.. <root>`.
    pub cmake: OsString,
    /// Build tool, run without arguments inside the build directory.
    pub make: OsString,
    /// Benchmarked executable, resolved relative to the build directory.
    pub executable: OsString,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            cmake: "cmake".into(),
            make: "make".into(),
            executable: "./profit-cli".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BenchmarkResult {
    pub config: Configuration,
    pub ms_per_iteration: MsPerIteration,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            self.config.compiler, self.config.version, self.config.flagset, self.ms_per_iteration
        )
    }
}

fn in_dir(dir: &Path) -> ShOptions {
    ShOptions {
        cwd: Some(dir.to_path_buf()),
        ..Default::default()
    }
}

/// A relative program path such as `./profit-cli` names a file in `dir`;
/// bare names are left for `PATH` lookup.
fn resolve_in(dir: &Path, program: &OsStr) -> OsString {
    let path = Path::new(program);
    if path.is_relative() && path.components().count() > 1 {
        dir.join(path).into_os_string()
    } else {
        program.to_owned()
    }
}

/// Removes everything inside `dir`, leaving `dir` itself in place.
fn clear_dir(dir: &Path) -> Result<()> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| Error::io(format!("reading {}", dir.display()), e))?;
    for entry in entries {
        let path = entry
            .map_err(|e| Error::io(format!("reading {}", dir.display()), e))?
            .path();
        let removed = if path.is_dir() && !path.is_symlink() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        removed.map_err(|e| Error::io(format!("removing {}", path.display()), e))?;
    }
    Ok(())
}

/// Prepares a fresh build directory for `config` and runs the
/// build-configuration tool in it.
pub fn configure(root: &Path, config: &Configuration, toolchain: &Toolchain) -> Result<()> {
    let dir = config.build_dir(root);
    std::fs::create_dir_all(&dir)
        .map_err(|e| Error::io(format!("creating {}", dir.display()), e))?;
    clear_dir(&dir)?;

    let args: [OsString; 3] = [
        format!("-DCMAKE_CXX_COMPILER={}", config.compiler_command()).into(),
        format!("-DCMAKE_CXX_FLAGS={}", config.flags).into(),
        root.as_os_str().to_owned(),
    ];
    sh!(options(in_dir(&dir)), &toolchain.cmake, &args)?;
    Ok(())
}

/// Runs the build tool in the build directory of `config`.
pub fn build(root: &Path, config: &Configuration, toolchain: &Toolchain) -> Result<()> {
    let dir = config.build_dir(root);
    if !dir.is_dir() {
        return Err(Error::MissingBuildDir(dir));
    }
    sh!(options(in_dir(&dir)), &toolchain.make, std::iter::empty::<&str>())?;
    Ok(())
}

/// Runs the benchmarked executable for `config` and scrapes its timing line.
pub fn benchmark(
    root: &Path,
    config: &Configuration,
    toolchain: &Toolchain,
    args: &[String],
) -> Result<BenchmarkResult> {
    let dir = config.build_dir(root);
    if !dir.is_dir() {
        return Err(Error::MissingBuildDir(dir));
    }

    let program = resolve_in(&dir, &toolchain.executable);
    let opts = ShOptionsBuilder::default()
        .stdout(StreamMode::Pipe)
        .stderr(StreamMode::Pipe)
        .cwd(dir)
        .build()
        .map_err(|e| Error::Config(e.to_string()))?;
    let output = sh!(options(opts), program, args)?;

    let ms_per_iteration = parse_ms_per_iteration(&output.combined())?;
    Ok(BenchmarkResult {
        config: config.clone(),
        ms_per_iteration,
    })
}
