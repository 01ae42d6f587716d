//! Drives a CMake project through a matrix of compilers, compiler versions
//! and flag sets: configure every build directory, build them, then
//! benchmark the resulting executables one at a time.

pub mod cli;
mod error;
pub mod findup;
pub mod matrix;
pub mod runner;
pub mod sh;
pub mod steps;
pub mod timing;

pub use error::{Error, Result};
pub use matrix::{Configuration, Matrix};
pub use runner::{Action, Runner};
pub use steps::{BenchmarkResult, Toolchain};
