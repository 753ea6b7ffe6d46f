#![deny(unsafe_code)]

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::env;
use std::ffi::OsString;
use std::io::Write;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Arg, ArgAction, Command as ClapCommand, value_parser};
use logging::{LogContext, LogLevel};
use rsync_core::{
    ClientAuth, ClientError, ClientOptions, LocalDirSink, RsyncUrl, TransferSummary,
    connect_daemon, connect_shell,
};

/// Exit status for a run that finished with some files failed.
const EXIT_PARTIAL: u8 = 23;

/// Where to pull from, as given on the command line.
#[derive(Debug, Eq, PartialEq)]
enum Source {
    /// `rsync://[user@]host[:port]/module[/path]`
    Daemon { user: Option<String>, url: RsyncUrl },
    /// `[user@]host:path` reached through `--rsh`.
    Shell {
        program: String,
        host: String,
        path: String,
    },
}

struct Invocation {
    source: Source,
    dest: PathBuf,
    options: ClientOptions,
    verbosity: u8,
}

fn clap_command(program_name: &'static str) -> ClapCommand {
    ClapCommand::new(program_name)
        .version(env!("CARGO_PKG_VERSION"))
        .about("Pull a module or a path inside one from an rsync daemon")
        .arg(
            Arg::new("source")
                .value_name("SRC")
                .help("rsync://[USER@]HOST[:PORT]/MODULE[/PATH], or HOST:PATH with --rsh")
                .required(true),
        )
        .arg(
            Arg::new("dest")
                .value_name("DEST")
                .help("Local directory to pull into")
                .value_parser(value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new("password-env")
                .long("password-env")
                .value_name("VAR")
                .default_value("RSYNC_PASSWORD")
                .help("Environment variable holding the daemon password"),
        )
        .arg(
            Arg::new("exclude")
                .long("exclude")
                .value_name("PATTERN")
                .action(ArgAction::Append)
                .help("Ask the sender to skip files matching PATTERN"),
        )
        .arg(
            Arg::new("delete")
                .long("delete")
                .action(ArgAction::SetTrue)
                .help("Delete local files the sender does not have"),
        )
        .arg(
            Arg::new("block-size")
                .long("block-size")
                .short('B')
                .value_name("SIZE")
                .value_parser(value_parser!(NonZeroU32))
                .help("Force a fixed checksum block size"),
        )
        .arg(
            Arg::new("rsh")
                .long("rsh")
                .short('e')
                .value_name("COMMAND")
                .help("Reach the sender through a remote shell such as ssh"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("Increase verbosity"),
        )
}

fn parse_args<I, T>(args: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut matches = clap_command("rsync-pull").try_get_matches_from(args)?;

    let source = matches.remove_one::<String>("source").unwrap_or_default();
    let dest = matches.remove_one::<PathBuf>("dest").unwrap_or_default();
    let verbosity = matches.get_count("verbose");
    let source = match matches.remove_one::<String>("rsh") {
        Some(program) => parse_shell_source(program, &source)?,
        None => parse_daemon_source(&source)?,
    };

    let mut options = ClientOptions::new()
        .with_delete_extraneous(matches.get_flag("delete"))
        .with_block_size(matches.remove_one::<NonZeroU32>("block-size"));
    for pattern in matches.remove_many::<String>("exclude").into_iter().flatten() {
        options = options.with_exclude(pattern);
    }
    if let Source::Daemon { user, .. } = &source
        && let Some(var) = matches.remove_one::<String>("password-env")
        && let Ok(password) = env::var(&var)
    {
        let user = user.clone().or_else(|| env::var("USER").ok()).unwrap_or_default();
        options = options.with_auth(ClientAuth::new(user, password));
    }

    Ok(Invocation {
        source,
        dest,
        options,
        verbosity,
    })
}

fn invalid_source(message: impl std::fmt::Display) -> clap::Error {
    clap::Error::raw(clap::error::ErrorKind::ValueValidation, format!("{message}\n"))
}

fn parse_daemon_source(source: &str) -> Result<Source, clap::Error> {
    let credentials = source
        .strip_prefix("rsync://")
        .and_then(|rest| rest.split_once('@'));
    let (user, address) = match credentials {
        Some((user, rest)) if !user.contains('/') => {
            (Some(user.to_owned()), format!("rsync://{rest}"))
        }
        _ => (None, source.to_owned()),
    };
    let url = RsyncUrl::parse(&address).map_err(invalid_source)?;
    Ok(Source::Daemon { user, url })
}

fn parse_shell_source(program: String, source: &str) -> Result<Source, clap::Error> {
    match source.split_once(':') {
        Some((host, path)) if !host.is_empty() && !source.starts_with("rsync://") => {
            Ok(Source::Shell {
                program,
                host: host.to_owned(),
                path: path.to_owned(),
            })
        }
        _ => Err(invalid_source(format!(
            "--rsh needs a HOST:PATH source, got {source:?}"
        ))),
    }
}

fn exit_code_from(error: &ClientError) -> u8 {
    match error {
        ClientError::Address(_) => 1,
        ClientError::AuthRequired | ClientError::Daemon(_) => 5,
        ClientError::Io(_) => 10,
        ClientError::Protocol(_) => 12,
    }
}

fn pull(invocation: Invocation) -> Result<TransferSummary, ClientError> {
    let Invocation {
        source,
        dest,
        options,
        ..
    } = invocation;
    let mut sink = LocalDirSink::create(&dest)?;
    match source {
        Source::Daemon { url, .. } => connect_daemon(&url, options)?.run(&mut sink),
        Source::Shell {
            program,
            host,
            path,
        } => connect_shell(program, &host, &path, options)?.run(&mut sink),
    }
}

/// Parses `args`, runs the pull and reports on `stdout`/`stderr`.
fn run_with<I, T, Out, Err>(args: I, stdout: &mut Out, stderr: &mut Err) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    Out: Write,
    Err: Write,
{
    let mut invocation = match parse_args(args) {
        Ok(invocation) => invocation,
        Err(err) => {
            let target: &mut dyn Write = if err.use_stderr() { stderr } else { stdout };
            let _ = write!(target, "{}", err.render());
            return if err.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let level = LogLevel::from_verbosity(invocation.verbosity);
    logging::init_tracing(level);
    invocation.options = invocation
        .options
        .with_log(LogContext::tracing().with_max_level(level));

    match pull(invocation) {
        Ok(summary) => {
            let _ = writeln!(
                stdout,
                "{} transferred, {} created, {} up to date, {} deleted",
                summary.transferred, summary.created, summary.skipped, summary.deleted
            );
            let _ = writeln!(
                stdout,
                "literal data: {} bytes, matched data: {} bytes, total size {}",
                summary.literal_bytes, summary.matched_bytes, summary.stats.total_size
            );
            for failure in &summary.failures {
                let _ = writeln!(stderr, "rsync-pull: {failure}");
            }
            if summary.is_complete() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_PARTIAL)
            }
        }
        Err(err) => {
            let _ = writeln!(stderr, "rsync-pull: {err}");
            ExitCode::from(exit_code_from(&err))
        }
    }
}

fn main() -> ExitCode {
    let mut stdout = std::io::stdout().lock();
    let mut stderr = std::io::stderr().lock();
    run_with(env::args_os(), &mut stdout, &mut stderr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daemon_source_with_user() {
        let invocation =
            parse_args(["rsync-pull", "rsync://ann@host:8730/mod/sub", "out"]).unwrap();
        let Source::Daemon { user, url } = invocation.source else {
            panic!("expected a daemon source");
        };
        assert_eq!(user.as_deref(), Some("ann"));
        assert_eq!(url.address(), "host:8730");
        assert_eq!(url.path(), "/sub");
        assert_eq!(invocation.dest, PathBuf::from("out"));
    }

    #[test]
    fn flags_reach_client_options() {
        let invocation = parse_args([
            "rsync-pull",
            "--exclude",
            "*.o",
            "--exclude",
            "tmp/",
            "--delete",
            "-B",
            "2048",
            "-vv",
            "rsync://host/mod",
            "out",
        ])
        .unwrap();
        let options = invocation.options;
        assert_eq!(options.exclusions().patterns(), ["*.o", "tmp/"]);
        assert!(options.delete_extraneous());
        assert_eq!(options.block_size(), NonZeroU32::new(2048));
        assert_eq!(invocation.verbosity, 2);
    }

    #[test]
    fn rsh_takes_host_colon_path() {
        let invocation =
            parse_args(["rsync-pull", "-e", "ssh", "box:/srv/data", "out"]).unwrap();
        assert_eq!(
            invocation.source,
            Source::Shell {
                program: "ssh".into(),
                host: "box".into(),
                path: "/srv/data".into(),
            }
        );
    }

    #[test]
    fn host_module_syntax_is_rejected() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let code = run_with(["rsync-pull", "host::mod", "out"], &mut stdout, &mut stderr);
        assert_eq!(code, ExitCode::from(1));
        assert!(String::from_utf8_lossy(&stderr).contains("unsupported address syntax"));
    }

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(exit_code_from(&ClientError::AuthRequired), 5);
        assert_eq!(exit_code_from(&ClientError::Protocol("x".into())), 12);
    }
}
