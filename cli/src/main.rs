mod test_runner;

use std::io::{self, Write};
use std::path::Path;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream, WriteColor};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use interpreter::{Executor, Limits, Value};
use strand::loader::{LoadError, Loader};

const SUBCOMMANDS: &[&str] = &["run", "test", "help"];

/// `run` options that take the following argument as their value.
const RUN_VALUE_OPTIONS: &[&str] = &[
    "-i",
    "--initial",
    "--max-steps",
    "--max-depth",
    "--timeout-ms",
];

#[derive(Parser)]
#[command(name = "strand", version, about = "String register machine interpreter")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a JSON-encoded program
    Run(RunArgs),

    /// Run .test.strand fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// JSON program file to execute
    file: String,

    /// Initial register value
    #[arg(short, long, default_value = "")]
    initial: String,

    /// Abort after this many steps
    #[arg(long)]
    max_steps: Option<u64>,

    /// Abort when sub-programs nest deeper than this
    #[arg(long)]
    max_depth: Option<usize>,

    /// Abort after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Print the final value as a JSON record
    #[arg(long)]
    json: bool,

    /// Load only, don't execute (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// Dump the decoded program
    #[arg(long)]
    ast: bool,

    /// Don't print the final value (exit status still reports exceptions)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.strand file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    let cli = Cli::parse_from(with_implicit_run(std::env::args().collect()));
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run(run_args) => {
            let color_choice = if cli.no_color {
                ColorChoice::Never
            } else {
                ColorChoice::Auto
            };
            let stderr = StandardStream::stderr(color_choice);
            let stdout = io::stdout();
            let exit_code = do_run(&run_args, &mut stdout.lock(), &mut stderr.lock())
                .unwrap_or_else(|e| {
                    eprintln!("error: {}", e);
                    1
                });
            process::exit(exit_code);
        }
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

/// Backwards compatibility: if the first positional arg is not a known
/// subcommand, inject "run" so `strand file.json` works like `strand run file.json`.
/// Values of `run` options are not positional, so `strand -i test file.json` is a run.
fn with_implicit_run(mut args: Vec<String>) -> Vec<String> {
    let mut rest = args.iter().skip(1);
    let mut first_positional = None;
    while let Some(arg) = rest.next() {
        if RUN_VALUE_OPTIONS.contains(&arg.as_str()) {
            rest.next();
        } else if !arg.starts_with('-') {
            first_positional = Some(arg.as_str());
            break;
        }
    }
    if first_positional.is_some_and(|arg| !SUBCOMMANDS.contains(&arg)) {
        args.insert(1, "run".to_string());
    }
    args
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Load and run one program file, returning the process exit code:
/// 0 for a string result, 1 for an exception or a load error, 2 for a budget refusal.
fn do_run(args: &RunArgs, out: &mut dyn Write, err: &mut dyn WriteColor) -> io::Result<i32> {
    let config = term::Config::default();

    let source = match std::fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            writeln!(err, "error: cannot read '{}': {}", args.file, e)?;
            return Ok(1);
        }
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.clone(), source.clone());

    let loaded = match Loader::new(source, file_id).load() {
        Ok(loaded) => loaded,
        Err(errors) => {
            emit_load_errors(err, &config, &files, &errors);
            return Ok(1);
        }
    };
    emit_load_errors(err, &config, &files, &loaded.warnings);

    if args.check {
        writeln!(err, "ok: {} loaded successfully", args.file)?;
        return Ok(0);
    }

    if args.ast {
        writeln!(out, "{:#?}", loaded.program)?;
        return Ok(0);
    }

    let mut limits = Limits::new();
    limits.max_steps = args.max_steps;
    limits.max_depth = args.max_depth;
    limits.timeout = args.timeout_ms.map(Duration::from_millis);

    let mut executor = Executor::new(limits);
    let result = executor.run(&loaded.program, args.initial.as_str());
    debug!(steps = executor.steps(), "program finished");

    let value = match result {
        Ok(value) => value,
        Err(error) => {
            writeln!(err, "runtime error: {}", error)?;
            return Ok(2);
        }
    };

    if args.json && !args.quiet {
        writeln!(out, "{}", serde_json::to_string(&value)?)?;
    }
    match value {
        Value::String(s) => {
            if !args.json && !args.quiet {
                writeln!(out, "{}", s)?;
            }
            Ok(0)
        }
        Value::Exception(exception) => {
            if !args.json {
                writeln!(err, "exception: {}", exception)?;
            }
            Ok(1)
        }
    }
}

fn emit_load_errors(
    writer: &mut dyn WriteColor,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    errors: &[LoadError],
) {
    for error in errors {
        let diagnostic = error.to_diagnostic();
        let _ = term::emit_to_write_style(writer, config, files, &diagnostic);
    }
}
