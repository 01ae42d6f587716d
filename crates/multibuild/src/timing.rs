//! Timing line emitted by the benchmarked executable.
//!
//! The executable reports its run as
//! `Ran <N> iterations in <T> [s] (<M> [ms] per iteration)`; `<M>` is the
//! figure collected for each configuration.

use std::sync::OnceLock;

use regex::Regex;

use crate::{Error, Result};

/// Arguments passed to the executable when none are given on the command line.
pub const DEFAULT_BENCHMARK_ARGS: &[&str] = &[
    "-w",
    "400",
    "-H",
    "400",
    "-p",
    "sersic:xcen=201:ycen=201:mag=15.87:re=4.65:nser=4.7:ang=-21:axrat=0.74:box=0",
    "-p",
    "sersic:xcen=201:ycen=201:mag=16.63:re=41:nser=1:axrat=0.29:box=0",
    "-i",
    "100",
];

fn timing_re() -> &'static Regex {
    static TIMING_RE: OnceLock<Regex> = OnceLock::new();
    TIMING_RE.get_or_init(|| {
        Regex::new(
            r"^Ran [0-9]+ iterations in [0-9.]+ \[s\] \(([0-9.]+) \[ms\] per iteration\)",
        )
        .expect("timing pattern is valid")
    })
}

/// Milliseconds per iteration, keeping the figure as the executable wrote it.
#[derive(Clone, Debug, PartialEq)]
pub struct MsPerIteration {
    pub value: f64,
    pub reported: String,
}

impl std::fmt::Display for MsPerIteration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reported)
    }
}

/// Extracts the milliseconds-per-iteration figure from the executable's
/// output. The first line matching the timing format wins.
pub fn parse_ms_per_iteration(output: &str) -> Result<MsPerIteration> {
    let unexpected = || Error::UnexpectedOutput {
        output: output.trim().to_string(),
    };

    let ms = output
        .lines()
        .find_map(|line| timing_re().captures(line.trim()))
        .and_then(|caps| caps.get(1))
        .ok_or_else(unexpected)?;

    let value = ms.as_str().parse::<f64>().map_err(|_| unexpected())?;
    Ok(MsPerIteration {
        value,
        reported: ms.as_str().to_string(),
    })
}

/// Arguments for the benchmarked executable: the user's trailing arguments
/// with one leading `--` removed, or [`DEFAULT_BENCHMARK_ARGS`] if none remain.
pub fn benchmark_args(trailing: &[String]) -> Vec<String> {
    let trailing = match trailing.split_first() {
        Some((first, rest)) if first == "--" => rest,
        _ => trailing,
    };

    if trailing.is_empty() {
        DEFAULT_BENCHMARK_ARGS.iter().map(|a| a.to_string()).collect()
    } else {
        trailing.to_vec()
    }
}
