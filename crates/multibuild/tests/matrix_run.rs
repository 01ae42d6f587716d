#![cfg(unix)]

mod common;

use std::collections::BTreeSet;
use std::path::Path;

use multibuild::matrix::{CompilerEntry, FlagSet};
use multibuild::timing::{benchmark_args, DEFAULT_BENCHMARK_ARGS};
use multibuild::{Action, Error, Matrix, Runner, Toolchain};

use common::{project, read, small_matrix, tools};

fn runner(root: &Path, toolchain: Toolchain, jobs: usize) -> Runner {
    Runner::new(root.to_path_buf(), small_matrix(), toolchain, jobs)
}

fn listing(dir: &Path) -> BTreeSet<(String, String)> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| {
            let path = e.unwrap().path();
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            (name, read(&path))
        })
        .collect()
}

#[test]
fn configure_lays_out_build_tree() {
    let root = project();
    let runner = runner(root.path(), tools().toolchain(), 4);

    runner.run_matrix(Action::Configure).unwrap();

    let configs = runner.matrix.configurations();
    assert_eq!(configs.len(), 10);
    for config in &configs {
        let dir = config.build_dir(root.path());
        let args = read(&dir.join("cmake.args"));
        let args: Vec<&str> = args.lines().collect();
        assert_eq!(
            args,
            [
                format!("-DCMAKE_CXX_COMPILER={}-{}", config.compiler, config.version),
                format!("-DCMAKE_CXX_FLAGS={}", config.flags),
                root.path().display().to_string(),
            ]
        );
    }
    assert!(root.path().join("builds/clang++/3.7/o3n/CMakeCache.txt").is_file());
}

#[test]
fn configure_twice_yields_same_contents() {
    let root = project();
    let runner = runner(root.path(), tools().toolchain(), 2);
    let dir = root.path().join("builds/g++/6/o2");

    runner.run_matrix(Action::Configure).unwrap();
    let first = listing(&dir);

    std::fs::write(dir.join("stale.o"), "old object").unwrap();
    std::fs::create_dir(dir.join("CMakeFiles")).unwrap();
    runner.run_matrix(Action::Configure).unwrap();

    assert_eq!(listing(&dir), first);
}

#[test]
fn build_runs_in_every_build_dir() {
    let root = project();
    let runner = runner(root.path(), tools().toolchain(), 3);

    runner.run_matrix(Action::Configure).unwrap();
    runner.run_matrix(Action::Build).unwrap();

    for config in runner.matrix.configurations() {
        assert!(config.build_dir(root.path()).join("profit-cli").is_file());
    }
}

#[test]
fn build_without_configure_fails() {
    let root = project();
    let err = runner(root.path(), tools().toolchain(), 1)
        .run_matrix(Action::Build)
        .unwrap_err();
    assert!(matches!(err, Error::MissingBuildDir(_)));
}

#[test]
fn build_failure_aborts_the_run() {
    let root = project();
    let toolchain = Toolchain {
        make: tools().path("make-fails-for-clang").into(),
        ..tools().toolchain()
    };
    let runner = runner(root.path(), toolchain, 1);

    runner.run_matrix(Action::Configure).unwrap();
    let err = runner.run_matrix(Action::Build).unwrap_err();

    match err {
        Error::CommandFailed { command, code } => {
            assert!(command.ends_with("make-fails-for-clang"), "{command}");
            assert_eq!(code, Some(2));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(root.path().join("builds/g++/4.9/o2/built").is_file());
}

#[test]
fn benchmark_is_sequential_and_uses_default_args() {
    let root = project();
    let setup = runner(root.path(), tools().toolchain(), 4);
    setup.run_matrix(Action::Configure).unwrap();
    setup.run_matrix(Action::Build).unwrap();

    // A high job count must not make benchmarks overlap; the fake
    // executable exits non-zero if it finds another run in progress.
    let results = runner(root.path(), tools().toolchain(), 8)
        .benchmark(&benchmark_args(&[]))
        .unwrap();

    let configs = setup.matrix.configurations();
    assert_eq!(results.len(), configs.len());
    for (result, config) in results.iter().zip(&configs) {
        assert_eq!(&result.config, config);
        assert_eq!(result.ms_per_iteration.value, DEFAULT_BENCHMARK_ARGS.len() as f64);
    }

    let recorded = read(&root.path().join("builds/clang++/3.6/o2/last.args"));
    assert_eq!(recorded.trim(), DEFAULT_BENCHMARK_ARGS.join(" "));
}

#[test]
fn benchmark_forwards_trailing_args() {
    let root = project();
    let runner = runner(root.path(), tools().toolchain(), 1);
    runner.run_matrix(Action::Configure).unwrap();
    runner.run_matrix(Action::Build).unwrap();

    let trailing: Vec<String> = ["--", "-i", "5"].iter().map(|s| s.to_string()).collect();
    let results = runner.benchmark(&benchmark_args(&trailing)).unwrap();

    assert!(results.iter().all(|r| r.ms_per_iteration.value == 2.0));
    let recorded = read(&root.path().join("builds/g++/4.9/o3n/last.args"));
    assert_eq!(recorded.trim(), "-i 5");
}

#[test]
fn benchmark_rejects_output_without_timing_line() {
    let root = project();
    let toolchain = Toolchain {
        executable: "true".into(),
        ..tools().toolchain()
    };
    let runner = runner(root.path(), toolchain, 1);
    runner.run_matrix(Action::Configure).unwrap();

    let err = runner.benchmark(&benchmark_args(&[])).unwrap_err();
    assert!(matches!(err, Error::UnexpectedOutput { .. }));
}

#[test]
fn benchmark_propagates_executable_failure() {
    let root = project();
    let toolchain = Toolchain {
        executable: "false".into(),
        ..tools().toolchain()
    };
    let runner = runner(root.path(), toolchain, 1);
    runner.run_matrix(Action::Configure).unwrap();

    let err = runner.benchmark(&[]).unwrap_err();
    assert!(matches!(err, Error::CommandFailed { .. }));
}

#[test]
fn run_matrix_benchmark_uses_default_args() {
    let root = project();
    let runner = runner(root.path(), tools().toolchain(), 2);
    runner.run_matrix(Action::Configure).unwrap();
    runner.run_matrix(Action::Build).unwrap();

    runner.run_matrix(Action::Benchmark).unwrap();

    for config in runner.matrix.configurations() {
        let recorded = read(&config.build_dir(root.path()).join("last.args"));
        assert_eq!(recorded.trim(), DEFAULT_BENCHMARK_ARGS.join(" "), "{config}");
    }
}

#[test]
fn unsafe_names_never_touch_the_build_tree() {
    let root = project();
    let sibling = root.path().join("builds/g++/7/o2");
    std::fs::create_dir_all(&sibling).unwrap();
    std::fs::write(sibling.join("CMakeCache.txt"), "keep").unwrap();

    let matrix = Matrix {
        compilers: vec![CompilerEntry {
            name: "g++".into(),
            versions: vec!["9".into()],
        }],
        flagsets: vec![FlagSet {
            name: "..".into(),
            flags: "-O2".into(),
        }],
    };
    let runner = Runner::new(root.path().to_path_buf(), matrix, tools().toolchain(), 1);

    let err = runner.run_matrix(Action::Configure).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "{err:?}");
    assert_eq!(read(&sibling.join("CMakeCache.txt")), "keep");
}
