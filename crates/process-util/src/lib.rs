#![deny(unused_must_use)]

use std::ffi::OsString;
use std::process::{ExitStatus, Stdio};

use envjson_env::Environment;
use slog::{debug, info, Logger};

/// Everything needed to start the child: what to run, with which arguments,
/// and its complete environment.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub env: Environment,
}

#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct SpawnError {
    pub program: OsString,
    #[source]
    pub source: std::io::Error,
}

/// Runs the child to completion and returns the exit code to adopt.
///
/// The child shares stdin, stdout and stderr with this process and sees only
/// the variables in `invocation.env`. Failing to wait for a started child is
/// reported the same way as failing to start it.
pub fn run(log: &Logger, invocation: Invocation) -> Result<i32, SpawnError> {
    let Invocation { program, args, env } = invocation;

    debug!(
        log,
        "Spawning {program:?} with args {args:?} and {} environment variables",
        env.len()
    );

    let spawn_error = |source: std::io::Error| SpawnError {
        program: program.clone(),
        source,
    };

    let mut child = std::process::Command::new(&program)
        .args(&args)
        .env_clear()
        .envs(env)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(spawn_error)?;

    let pid = child.id();
    debug!(log, "Waiting for process {pid} to exit");

    let status = child.wait().map_err(spawn_error)?;

    info!(log, "Process {pid} exited with {status}");

    Ok(exit_code(status))
}

/// Maps how the child terminated onto an exit code for this process.
///
/// On Unix a child killed by a signal yields `128 + signal`.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
