use std::io::{self, IsTerminal};

use clap::Parser;
use color_eyre::Result;
use condax_core::{CommandInfo, CommandStatus, Config, ExecutionOutcome};
use serde_json::Value;

mod cli;
mod style;

use cli::{build_command, CondaxCli};
use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = CondaxCli::parse();
    init_tracing(cli.trace, cli.verbose, cli.quiet);

    let command = build_command(&cli.command);
    let outcome = match load_config(&cli) {
        Ok(config) => condax_core::execute(&config, &command),
        Err(err) => ExecutionOutcome::from_error(&err),
    };
    let code = emit_output(&cli, command.info(), &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn load_config(cli: &CondaxCli) -> condax_core::Result<Config> {
    let config = Config::from_env()?;
    Ok(match &cli.root {
        Some(root) => config.with_root(root),
        None => config,
    })
}

fn init_tracing(trace: bool, verbose: u8, quiet: bool) {
    let level = if trace {
        "trace"
    } else if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("condax={level},condax_core={level},condax_cli={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn emit_output(cli: &CondaxCli, info: CommandInfo, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = outcome.status.exit_code();

    if cli.json {
        let payload = condax_core::to_json_response(info, outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(code);
    }

    let style = Style::new(cli.no_color, io::stdout().is_terminal());
    if outcome.status != CommandStatus::Ok {
        let message = condax_core::format_status_message(info, &outcome.message);
        eprintln!("{}", style.status(&outcome.status, &message));
        if let Some(cause) = detail_str(&outcome.details, "cause") {
            eprintln!("{}", style.dimmed(&format!("  caused by: {cause}")));
        }
        if let Some(hint) = detail_str(&outcome.details, "hint") {
            eprintln!("{}", style.info(&format!("Hint: {hint}")));
        }
    } else if !cli.quiet {
        if is_passthrough(&outcome.details) {
            if !outcome.message.is_empty() {
                println!("{}", outcome.message);
            }
        } else {
            let message = condax_core::format_status_message(info, &outcome.message);
            println!("{}", style.status(&outcome.status, &message));
        }
    }

    Ok(code)
}

fn detail_str<'a>(details: &'a Value, key: &str) -> Option<&'a str> {
    details
        .as_object()
        .and_then(|map| map.get(key))
        .and_then(Value::as_str)
}

fn is_passthrough(details: &Value) -> bool {
    details
        .as_object()
        .and_then(|map| map.get("passthrough"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
