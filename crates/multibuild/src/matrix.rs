//! The compiler x flag-set matrix.
//!
//! A [`Matrix`] holds two ordered tables: compilers with the versions to try,
//! and named flag sets. [`Matrix::configurations`] expands them into the
//! cross-product that every step iterates over.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Deserializer};

use crate::{Error, Result};

/// A compiler family and the versions of it to build with.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct CompilerEntry {
    pub name: String,
    #[serde(deserialize_with = "versions_from_scalars")]
    pub versions: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
}

/// Versions may be written bare (`[4.9, 6]`) as well as quoted.
fn versions_from_scalars<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Scalar>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|v| match v {
            Scalar::Text(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
        })
        .collect())
}

/// Names become build-directory components, so each must be a single plain
/// path segment.
fn check_component(kind: &str, name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(c)), None) if c == OsStr::new(name) => Ok(()),
        _ => Err(Error::Config(format!(
            "{kind} `{name}` is not usable as a directory name"
        ))),
    }
}

fn check_unique<'a>(kind: &str, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        check_component(kind, name)?;
        if !seen.insert(name) {
            return Err(Error::Config(format!("duplicate {kind} `{name}`")));
        }
    }
    Ok(())
}

/// A named set of compiler flags, e.g. `o2` => `-g -O2`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct FlagSet {
    pub name: String,
    pub flags: String,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Matrix {
    pub compilers: Vec<CompilerEntry>,
    pub flagsets: Vec<FlagSet>,
}

/// One point of the matrix.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Configuration {
    pub compiler: String,
    pub version: String,
    pub flagset: String,
    pub flags: String,
}

const BUILTIN_COMPILERS: &[(&str, &[&str])] = &[
    ("g++", &["4.9", "6"]),
    ("clang++", &["3.6", "3.7", "3.8"]),
];

const BUILTIN_FLAGSETS: &[(&str, &str)] = &[
    ("osize", "-g -Os -fPIC"),
    ("o1", "-g -O1"),
    ("o2", "-g -O2"),
    ("o3", "-g -O3"),
    ("o2n", "-g -O2 -march=native"),
    ("o3n", "-g -O3 -march=native"),
];

impl Default for Matrix {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Matrix {
    pub fn builtin() -> Self {
        Self {
            compilers: BUILTIN_COMPILERS
                .iter()
                .map(|(name, versions)| CompilerEntry {
                    name: name.to_string(),
                    versions: versions.iter().map(|v| v.to_string()).collect(),
                })
                .collect(),
            flagsets: BUILTIN_FLAGSETS
                .iter()
                .map(|(name, flags)| FlagSet {
                    name: name.to_string(),
                    flags: flags.to_string(),
                })
                .collect(),
        }
    }

    /// Reads a matrix from YAML. Versions may be quoted or bare numbers;
    /// quote any whose text a float would not keep (e.g. `"3.10"`).
    ///
    /// ```yaml
    /// compilers:
    ///   - name: g++
    ///     versions: ["9", "10"]
    /// flagsets:
    ///   - name: o2
    ///     flags: -g -O2
    /// ```
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
        let matrix: Matrix = serde_yaml::from_slice(&bytes)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        matrix.validate()?;
        Ok(matrix)
    }

    /// Rejects empty tables, repeated names, and names that are not a
    /// single plain directory component.
    pub fn validate(&self) -> Result<()> {
        if self.compilers.iter().all(|c| c.versions.is_empty()) {
            return Err(Error::Config("no compiler versions defined".into()));
        }
        if self.flagsets.is_empty() {
            return Err(Error::Config("no flag sets defined".into()));
        }

        check_unique("compiler", self.compilers.iter().map(|c| c.name.as_str()))?;
        for compiler in &self.compilers {
            check_unique(
                &format!("{} version", compiler.name),
                compiler.versions.iter().map(String::as_str),
            )?;
        }
        check_unique("flag set", self.flagsets.iter().map(|f| f.name.as_str()))?;
        Ok(())
    }

    /// Keeps only the named compilers and flag sets. An empty list keeps
    /// everything on that axis.
    pub fn filter(mut self, compilers: &[String], flagsets: &[String]) -> Result<Self> {
        for wanted in compilers {
            if !self.compilers.iter().any(|c| &c.name == wanted) {
                return Err(Error::Config(format!("unknown compiler `{wanted}`")));
            }
        }
        for wanted in flagsets {
            if !self.flagsets.iter().any(|f| &f.name == wanted) {
                return Err(Error::Config(format!("unknown flag set `{wanted}`")));
            }
        }

        if !compilers.is_empty() {
            self.compilers.retain(|c| compilers.contains(&c.name));
        }
        if !flagsets.is_empty() {
            self.flagsets.retain(|f| flagsets.contains(&f.name));
        }
        Ok(self)
    }

    /// Every (compiler, version) pair crossed with every flag set, in table
    /// order with the flag set varying fastest.
    pub fn configurations(&self) -> Vec<Configuration> {
        let versioned = self
            .compilers
            .iter()
            .flat_map(|c| c.versions.iter().map(move |v| (c.name.as_str(), v.as_str())));

        versioned
            .flat_map(|(compiler, version)| {
                self.flagsets.iter().map(move |f| Configuration {
                    compiler: compiler.to_string(),
                    version: version.to_string(),
                    flagset: f.name.clone(),
                    flags: f.flags.clone(),
                })
            })
            .collect()
    }
}

impl Configuration {
    /// Versioned compiler executable, e.g. `g++-4.9`.
    pub fn compiler_command(&self) -> String {
        format!("{}-{}", self.compiler, self.version)
    }

    /// `<root>/builds/<compiler>/<version>/<flagset>`
    pub fn build_dir(&self, root: &Path) -> PathBuf {
        root.join("builds")
            .join(&self.compiler)
            .join(&self.version)
            .join(&self.flagset)
    }

    pub fn label(&self) -> String {
        format!("{} {} {}", self.compiler, self.version, self.flagset)
    }
}

impl std::fmt::Display for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
