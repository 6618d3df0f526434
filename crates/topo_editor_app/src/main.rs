// SPDX-License-Identifier: MIT OR Apache-2.0
//! Topo Editor command line.
//!
//! Loads projects headless, over the in-memory renderer:
//! - `inspect` prints a summary, optionally with a saved history attached
//!   or replayed
//! - `exec` runs a list of commands and writes the project and history
//! - `check-link` reports whether two ports may be linked and why not
//! - `eval` evaluates an expression against a JSON state

mod actions;
mod cli;
mod error;

use clap::Parser;
use cli::{Action, Cli};
use error::CliError;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "topo_editor_app=info,topo_editor_engine=info";

fn print<T: Serialize + Display>(json: bool, value: &T) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", value.to_string().trim_end());
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.action {
        Action::Inspect {
            project,
            history,
            replay,
        } => {
            let config = actions::load_config(cli.config.as_deref())?;
            let mut app = actions::open(config, &actions::read_json(&project)?)?;
            if let Some(path) = history {
                actions::attach_history(&mut app, &actions::read_json(&path)?, replay)?;
            }
            print(cli.json, &actions::Summary::of(&app))
        }
        Action::Exec {
            project,
            commands,
            undo,
            output,
            history_out,
        } => {
            let config = actions::load_config(cli.config.as_deref())?;
            let mut app = actions::open(config, &actions::read_json(&project)?)?;
            let commands: Vec<actions::CommandSpec> = actions::read_json(&commands)?;
            actions::execute_all(&mut app, &commands, undo)?;

            let result = app.project().to_json();
            match output {
                Some(path) => actions::write_json(&path, &result)?,
                None => println!("{}", serde_json::to_string_pretty(&result)?),
            }
            if let Some(path) = history_out {
                actions::write_json(&path, &app.history()?)?;
            }
            Ok(())
        }
        Action::CheckLink {
            project,
            source,
            target,
        } => {
            let config = actions::load_config(cli.config.as_deref())?;
            let app = actions::open(config, &actions::read_json(&project)?)?;
            print(cli.json, &actions::check_link(&app, &source.0, &target.0))
        }
        Action::Eval { expression, state } => {
            let state = match state {
                Some(path) => actions::read_json(&path)?,
                None => Value::Object(Default::default()),
            };
            let value = actions::evaluate(&expression, state).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::debug!("Starting Topo Editor v{}", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
