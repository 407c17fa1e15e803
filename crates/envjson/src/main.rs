#![deny(unused_must_use)]

use std::ffi::OsString;

use envjson_process_util::Invocation;
use slog::{debug, o, Drain, Logger};

/// Exit code for failures of envjson itself, as opposed to the child's.
pub const FATAL_EXIT_CODE: i32 = 111;

/// Log filter directives, in `RUST_LOG` syntax.
const LOG_ENV: &str = "ENVJSON_LOG";

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("usage: {}", envjson_args::USAGE)]
    Usage(#[from] envjson_args::Error),
    #[error("fatal: unable to load JSON: {0}")]
    LoadJson(#[from] envjson_env::Error),
    #[error("fatal: failed to run command: {0}")]
    RunCommand(#[from] envjson_process_util::SpawnError),
}

fn logger(inherited: &[(OsString, OsString)]) -> Logger {
    let decorator = slog_term::PlainSyncDecorator::new(std::io::stderr());
    let drain = slog_term::FullFormat::new(decorator).build().fuse();

    let mut builder = slog_envlogger::LogBuilder::new(drain);
    if let Some(filters) = inherited
        .iter()
        .rev()
        .find(|(k, _)| k == LOG_ENV)
        .and_then(|(_, v)| v.to_str())
    {
        builder = builder.parse(filters);
    }

    Logger::root(builder.build().fuse(), o!())
}

fn run(log: &Logger, inherited: Vec<(OsString, OsString)>) -> Result<i32, Error> {
    let command = envjson_args::from_env()?;

    let env = envjson_env::build_environment(std::io::stdin().lock(), inherited)?;
    debug!(log, "Loaded environment with {} variables", env.len());

    let code = envjson_process_util::run(
        log,
        Invocation {
            program: command.program,
            args: command.args,
            env,
        },
    )?;
    Ok(code)
}

fn main() {
    let inherited = envjson_env::inherited();
    let log = logger(&inherited);

    let code = match run(&log, inherited) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("envjson: {e}");
            FATAL_EXIT_CODE
        }
    };

    drop(log);
    std::process::exit(code)
}
