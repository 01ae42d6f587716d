// External command execution

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

use derive_builder::Builder;

use crate::{Error, Result};

/// Trait for types that can configure a `Command` before execution.
pub trait ShConfig {
    /// Apply configuration to the given `Command`.
    fn apply(&self, cmd: &mut Command);
}

// Allow using `&T` where `T: ShConfig`.
impl<T: ShConfig + ?Sized> ShConfig for &T {
    fn apply(&self, cmd: &mut Command) {
        (*self).apply(cmd)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamMode {
    Inherit,
    Pipe,
    Null,
}

impl StreamMode {
    fn stdio(self) -> Stdio {
        match self {
            StreamMode::Inherit => Stdio::inherit(),
            StreamMode::Pipe => Stdio::piped(),
            StreamMode::Null => Stdio::null(),
        }
    }
}

#[derive(Clone, Debug, Builder)]
#[builder(default)]
pub struct ShOptions {
    pub stdout: StreamMode,
    pub stderr: StreamMode,
    /// Working directory of the child process.
    #[builder(setter(into, strip_option))]
    pub cwd: Option<PathBuf>,
}

impl Default for ShOptions {
    fn default() -> Self {
        Self {
            stdout: StreamMode::Inherit,
            stderr: StreamMode::Inherit,
            cwd: None,
        }
    }
}

impl ShOptions {
    /// Options that capture both streams, for commands whose output is parsed.
    pub fn captured() -> Self {
        Self {
            stdout: StreamMode::Pipe,
            stderr: StreamMode::Pipe,
            ..Default::default()
        }
    }
}

impl ShConfig for ShOptions {
    fn apply(&self, cmd: &mut Command) {
        cmd.stdout(self.stdout.stdio());
        cmd.stderr(self.stderr.stdio());

        if let Some(ref dir) = self.cwd {
            cmd.current_dir(dir);
        }
    }
}

#[derive(Debug)]
pub struct ShOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ShOutput {
    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut out = String::with_capacity(self.stdout.len() + self.stderr.len());
        out.push_str(&self.stdout);
        out.push_str(&self.stderr);
        out
    }
}

#[macro_export]
macro_rules! sh {
    // Program and arguments with explicit options
    (options($opts:expr), $program:expr, $args:expr $(,)?) => {{
        $crate::sh::sh($program, $args, $opts)
    }};

    // Program and arguments with default options
    ($program:expr, $args:expr $(,)?) => {{
        $crate::sh::sh($program, $args, $crate::sh::ShOptions::default())
    }};
}

/// Render an argv the way a user would type it, for logs and error messages.
pub fn display_command<P, I, A>(program: P, args: I) -> String
where
    P: AsRef<OsStr>,
    I: IntoIterator<Item = A>,
    A: AsRef<OsStr>,
{
    std::iter::once(program.as_ref().to_string_lossy().into_owned())
        .chain(args.into_iter().map(|a| {
            let a = a.as_ref().to_string_lossy();
            if a.is_empty() || a.contains(char::is_whitespace) {
                format!("\"{a}\"")
            } else {
                a.into_owned()
            }
        }))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `program` with `args` directly (no shell) and waits for it to exit.
///
/// Piped streams are returned in the [`ShOutput`]; inherited or nulled
/// streams come back empty. A non-zero exit status is an error.
pub fn sh<P, I, A, O>(program: P, args: I, opts: O) -> Result<ShOutput>
where
    P: AsRef<OsStr>,
    I: IntoIterator<Item = A>,
    A: AsRef<OsStr>,
    O: ShConfig + std::fmt::Debug,
{
    let program = program.as_ref();
    let args: Vec<A> = args.into_iter().collect();
    let rendered = display_command(program, &args);
    log::debug!("[sh] {} ({:?})", rendered, opts);

    let mut command = Command::new(program);
    command.args(&args).stdin(Stdio::null());
    opts.apply(&mut command);

    let output = command.output().map_err(|source| Error::Spawn {
        command: rendered.clone(),
        source,
    })?;

    if !output.status.success() {
        return Err(Error::CommandFailed {
            command: rendered,
            code: output.status.code(),
        });
    }

    Ok(ShOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
