use std::io::Read;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use focusbridge_core::batch::BatchAddItem;
use focusbridge_core::commands::{render_create, render_edit, render_remove};
use focusbridge_core::config::{global_config_path, resolve_config_with_source, BridgeConfig};
use focusbridge_core::mutation::{
    add_project_command, add_tag_command, add_task_command, edit_command, remove_command,
    AddProjectRequest, AddTagRequest, AddTaskRequest, EditItemRequest, MutationResult,
    RemoveItemRequest,
};
use focusbridge_core::query::{query_command, render_query, QueryResult, QuerySpec};
use focusbridge_core::runner::ProcessRunner;
use focusbridge_core::script::{host_script, Program};
use focusbridge_core::{Bridge, BridgeError};

const LOG_ENV: &str = "FOCUSBRIDGE_LOG";

#[derive(Parser)]
#[command(
    name = "focusbridge",
    version,
    about = "Query and edit OmniFocus through generated automation scripts"
)]
struct Cli {
    /// Print the generated script instead of running it.
    #[arg(long, global = true)]
    print_script: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Query tasks, projects or tags. JSON arguments, or stdin when omitted.
    Query { json: Option<String> },
    /// Create a task
    AddTask { json: Option<String> },
    /// Create a project
    AddProject { json: Option<String> },
    /// Create a tag
    AddTag { json: Option<String> },
    /// Edit and/or move a task, project or tag
    Edit { json: Option<String> },
    /// Remove a task, project or tag
    Remove { json: Option<String> },
    /// Create several items, one after another
    BatchAdd { json: Option<String> },
    /// Remove several items, one after another
    BatchRemove { json: Option<String> },
    /// Show the resolved interpreter configuration
    Config,
    /// Print version information
    Version,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_input(json: Option<String>) -> Result<String> {
    match json {
        Some(text) if text != "-" => Ok(text),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("read arguments from stdin")?;
            Ok(text)
        }
    }
}

fn parse<T: DeserializeOwned>(json: Option<String>) -> Result<std::result::Result<T, BridgeError>> {
    let text = read_input(json)?;
    Ok(serde_json::from_str(&text)
        .map_err(|err| BridgeError::validation(format!("invalid arguments: {}", err))))
}

fn emit(value: &impl serde::Serialize, success: bool) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn emit_failure(err: &BridgeError) -> Result<ExitCode> {
    emit(&MutationResult::failure(err), false)
}

/// One runnable command line per program, quoted for a POSIX shell.
fn print_scripts(config: &BridgeConfig, programs: Vec<Program>) -> Result<ExitCode> {
    let runner = ProcessRunner::from_config(config);
    let application = config.application();
    for program in programs {
        println!("{}", runner.command_line(&host_script(&application, &program)));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_preview(config: &BridgeConfig, command: Command) -> Result<ExitCode> {
    let programs: std::result::Result<Vec<Program>, BridgeError> = match command {
        Command::Query { json } => parse::<QuerySpec>(json)?
            .and_then(|spec| query_command(&spec))
            .map(|command| vec![render_query(&command)]),
        Command::AddTask { json } => parse::<AddTaskRequest>(json)?
            .and_then(|request| add_task_command(&request))
            .map(|command| vec![render_create(&command)]),
        Command::AddProject { json } => parse::<AddProjectRequest>(json)?
            .and_then(|request| add_project_command(&request))
            .map(|command| vec![render_create(&command)]),
        Command::AddTag { json } => parse::<AddTagRequest>(json)?
            .and_then(|request| add_tag_command(&request))
            .map(|command| vec![render_create(&command)]),
        Command::Edit { json } => parse::<EditItemRequest>(json)?
            .and_then(|request| edit_command(&request))
            .map(|command| vec![render_edit(&command)]),
        Command::Remove { json } => parse::<RemoveItemRequest>(json)?
            .and_then(|request| remove_command(&request))
            .map(|command| vec![render_remove(&command)]),
        Command::BatchAdd { json } => parse::<Vec<BatchAddItem>>(json)?.and_then(|items| {
            items
                .iter()
                .map(|item| {
                    let command = match item {
                        BatchAddItem::Task(request) => add_task_command(request)?,
                        BatchAddItem::Project(request) => add_project_command(request)?,
                        BatchAddItem::Tag(request) => add_tag_command(request)?,
                    };
                    Ok::<_, BridgeError>(render_create(&command))
                })
                .collect()
        }),
        Command::BatchRemove { json } => parse::<Vec<RemoveItemRequest>>(json)?.and_then(|items| {
            items
                .iter()
                .map(|request| remove_command(request).map(|command| render_remove(&command)))
                .collect()
        }),
        Command::Config | Command::Version => Ok(Vec::new()),
    };
    match programs {
        Ok(programs) => print_scripts(config, programs),
        Err(err) => emit_failure(&err),
    }
}

fn run(config: &BridgeConfig, command: Command) -> Result<ExitCode> {
    let bridge = Bridge::<ProcessRunner>::from_config(config);
    match command {
        Command::Query { json } => {
            let result = QueryResult::from(parse::<QuerySpec>(json)?.and_then(|spec| bridge.query(&spec)));
            let success = result.success;
            emit(&result, success)
        }
        Command::AddTask { json } => {
            let result = MutationResult::from(
                parse::<AddTaskRequest>(json)?.and_then(|request| bridge.add_task(&request)),
            );
            let success = result.success;
            emit(&result, success)
        }
        Command::AddProject { json } => {
            let result = MutationResult::from(
                parse::<AddProjectRequest>(json)?.and_then(|request| bridge.add_project(&request)),
            );
            let success = result.success;
            emit(&result, success)
        }
        Command::AddTag { json } => {
            let result = MutationResult::from(
                parse::<AddTagRequest>(json)?.and_then(|request| bridge.add_tag(&request)),
            );
            let success = result.success;
            emit(&result, success)
        }
        Command::Edit { json } => {
            let result = MutationResult::from(
                parse::<EditItemRequest>(json)?.and_then(|request| bridge.edit_item(&request)),
            );
            let success = result.success;
            emit(&result, success)
        }
        Command::Remove { json } => {
            let result = MutationResult::from(
                parse::<RemoveItemRequest>(json)?.and_then(|request| bridge.remove_item(&request)),
            );
            let success = result.success;
            emit(&result, success)
        }
        Command::BatchAdd { json } => match parse::<Vec<BatchAddItem>>(json)? {
            Ok(items) => {
                let outcome = bridge.batch_add(&items);
                let success = outcome.success;
                emit(&outcome, success)
            }
            Err(err) => emit_failure(&err),
        },
        Command::BatchRemove { json } => match parse::<Vec<RemoveItemRequest>>(json)? {
            Ok(items) => {
                let outcome = bridge.batch_remove(&items);
                let success = outcome.success;
                emit(&outcome, success)
            }
            Err(err) => emit_failure(&err),
        },
        Command::Config | Command::Version => Ok(ExitCode::SUCCESS),
    }
}

fn main() -> Result<ExitCode> {
    init_logging();
    let cli = Cli::parse();

    if let Command::Version = cli.command {
        println!("focusbridge {}", focusbridge_core::version());
        return Ok(ExitCode::SUCCESS);
    }

    let (config, source) = resolve_config_with_source().context("load configuration")?;
    debug!(source, interpreter = %config.interpreter(), "resolved configuration");
    if let Command::Config = cli.command {
        let runner = ProcessRunner::from_config(&config);
        let report = serde_json::json!({
            "interpreter": runner.program(),
            "interpreterArgs": runner.args(),
            "application": config.application(),
            "source": source,
            "configPath": global_config_path().map(|path| path.display().to_string()),
        });
        return emit(&report, true);
    }

    if cli.print_script {
        run_preview(&config, cli.command)
    } else {
        run(&config, cli.command)
    }
}

