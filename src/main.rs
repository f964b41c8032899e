use campus_fixit::cli::commands::{self, ClientContext, OutputOptions};
use campus_fixit::cli::{Cli, Commands};
use campus_fixit::logging::init_logging;
use campus_fixit::{FixitError, Result, StructuredError};
use clap::Parser;
use std::io::{self, IsTerminal};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.log_json) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let json = cli.json;
    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(FixitError::from)
        .and_then(|runtime| runtime.block_on(run(cli)));

    if let Err(e) = result {
        handle_error(&e, json);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = cli.overrides();
    let output = OutputOptions::detect(cli.json, cli.quiet, cli.no_color);

    match cli.command {
        Commands::Serve(args) => commands::serve::execute(&args, &overrides).await,
        Commands::Completions(args) => commands::completions::execute(&args),
        Commands::Health => {
            let ctx = ClientContext::load(&overrides, output)?;
            commands::health::execute(&ctx).await
        }
        Commands::Register(args) => {
            let mut ctx = ClientContext::load(&overrides, output)?;
            commands::account::register(&mut ctx, args).await
        }
        Commands::Login(args) => {
            let mut ctx = ClientContext::load(&overrides, output)?;
            commands::account::login(&mut ctx, args).await
        }
        Commands::Logout => {
            let mut ctx = ClientContext::load(&overrides, output)?;
            commands::account::logout(&mut ctx).await
        }
        Commands::Whoami => {
            let ctx = ClientContext::load(&overrides, output)?;
            commands::account::whoami(&ctx)
        }
        Commands::Issues { command } => {
            let mut ctx = ClientContext::load(&overrides, output)?;
            commands::issues::execute(&mut ctx, command).await
        }
    }
}

/// Handle errors with structured output support.
///
/// When --json is set or stdout is not a TTY, outputs structured JSON to stderr.
/// Otherwise, outputs human-readable error with optional color.
fn handle_error(err: &FixitError, json_mode: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.code.exit_code();
    if err.is_user_recoverable() {
        tracing::debug!(error = %err, exit_code, "command failed");
    } else {
        tracing::error!(error = %err, exit_code, "command failed");
    }

    let use_json = json_mode || !io::stdout().is_terminal();

    if use_json {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        let use_color = io::stderr().is_terminal();
        eprintln!("{}", structured.to_human(use_color));
    }

    std::process::exit(exit_code);
}
