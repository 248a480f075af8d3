use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;

use beauty::{VmConfig, DEFAULT_MAX_CALL_DEPTH};
use clap::Parser;
use console::style;

/// Interpreter for the beauty language.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Source file to run.
    file: PathBuf,

    /// Function calls nested deeper than this abort the program.
    #[arg(long, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
    max_call_depth: usize,

    /// Print the token stream instead of running the program.
    #[arg(long)]
    tokens: bool,

    /// Print the syntax tree instead of running the program.
    #[arg(long, conflicts_with = "tokens")]
    ast: bool,
}

/// Logs go to stderr, and only when `BEAUTY_LOG` holds a filter such as `beauty_vm=trace`.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("BEAUTY_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_env("BEAUTY_LOG"))
            .init();
    }
}

fn main() {
    init_tracing();
    let args = Args::parse();

    let source = fs::read_to_string(&args.file).unwrap_or_else(|err| {
        eprintln!(
            "{} cannot read '{}': {}",
            style("error:").red().bold().for_stderr(),
            args.file.display(),
            err
        );
        process::exit(1);
    });

    let result = if args.tokens {
        beauty::dump_tokens(&source).map(|dump| print!("{}", dump))
    } else if args.ast {
        beauty::dump_ast(&source).map(|dump| print!("{}", dump))
    } else {
        let config = VmConfig {
            max_call_depth: args.max_call_depth,
        };
        let stdin = io::stdin();
        let stdout = io::stdout();
        beauty::run(&source, config, stdin.lock(), stdout.lock())
    };

    if let Err(err) = result {
        eprintln!("{}", style(err).red().for_stderr());
        process::exit(1);
    }
}
