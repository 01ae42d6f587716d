use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;

use multibuild::cli::Cli;
use multibuild::timing::benchmark_args;
use multibuild::{findup, Action, Matrix, Runner};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let root = match cli.root.clone() {
        Some(root) => root,
        None => findup::project_root()?,
    };
    let root = root
        .canonicalize()
        .with_context(|| format!("project root {} is not accessible", root.display()))?;
    log::debug!("project root: {}", root.display());

    let matrix = match &cli.config {
        Some(path) => Matrix::load(path)?,
        None => Matrix::builtin(),
    };
    let matrix = matrix.filter(&cli.compilers, &cli.flagsets)?;

    let runner = Runner::new(root, matrix, cli.toolchain(), cli.jobs);
    let action = cli.action();
    match action {
        Action::Configure | Action::Build => runner
            .run_matrix(action)
            .with_context(|| format!("{} step failed", action.name()))?,
        Action::Benchmark => {
            runner
                .benchmark(&benchmark_args(&cli.args))
                .context("benchmark step failed")?;
        }
    }

    Ok(())
}
