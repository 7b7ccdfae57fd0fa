use std::{io::Write, path::PathBuf, process::ExitCode};

use commands::{CommandRegistry, Session};
use config::HeapDumpConfig;
use logger::{
    LogManager,
    loggers::{
        console::ConsoleLogger,
        file::{FileConflictBehavior, FileLogger},
        filter::LogFilter,
        multi::MultiLogger,
    },
};
use presenter::Style;

mod commands;
mod config;
mod error;
mod presenter;
mod target;

static DEFAULT_COMMAND: &str = "heapdump";

fn usage(registry: &CommandRegistry) -> String {
    let mut text =
        String::from("Usage: newlib-heapdump <config.json> [command [args...]]\n\nCommands:\n");
    for command in registry.commands() {
        text.push_str(&format!("  {:<10} {}\n", command.name(), command.help()));
    }
    text
}

fn build_logger(config: &HeapDumpConfig) -> Result<LogFilter, std::io::Error> {
    let console = ConsoleLogger::new();
    Ok(match &config.log_file {
        Some(path) => {
            let file = FileLogger::new(path.clone(), FileConflictBehavior::Append)?;
            LogFilter::new(
                config.log_level,
                MultiLogger::new().with_logger(console).with_logger(file),
            )
        }
        None => LogFilter::new(config.log_level, console),
    })
}

fn main() -> ExitCode {
    let registry = CommandRegistry::builtin();
    let mut args = std::env::args().skip(1);

    let config_path = match args.next() {
        Some(arg) if arg == "-h" || arg == "--help" => {
            print!("{}", usage(&registry));
            return ExitCode::SUCCESS;
        }
        Some(arg) => PathBuf::from(arg),
        None => {
            eprint!("{}", usage(&registry));
            return ExitCode::FAILURE;
        }
    };
    let command = args.next().unwrap_or_else(|| DEFAULT_COMMAND.to_string());
    let command_args: Vec<String> = args.collect();

    let config = match HeapDumpConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error[ConfigError]: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let log_manager = match build_logger(&config) {
        Ok(logger) => LogManager::new(logger),
        Err(e) => {
            eprintln!("error[ConfigError]: Failed to open log file. {}", e);
            return ExitCode::FAILURE;
        }
    };
    log_manager.debug(format!("Loaded configuration from {}", config_path.display()));

    let session = match config.geometry() {
        Ok(geometry) => Session {
            geometry,
            style: Style {
                color: config.color,
            },
            partial_output: config.partial_output,
            log: log_manager.get_log_worker(),
            target: Box::new(config),
        },
        Err(e) => {
            eprintln!("error[ConfigError]: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = std::io::stdout().lock();
    let result = registry
        .dispatch(&command, &command_args, &session, &mut stdout)
        .and_then(|()| stdout.flush().map_err(Into::into));
    let code = match result {
        Ok(()) => {
            log_manager.debug(format!("`{}` finished", command));
            log_manager.verbose(format!(
                "Took {} ms",
                log_manager.time_since_start().num_milliseconds()
            ));
            ExitCode::SUCCESS
        }
        Err(e) => {
            log_manager.error(format!("`{}` failed : {}", command, e));
            eprintln!("error[{}]: {}", e.kind(), e);
            ExitCode::FAILURE
        }
    };

    // Flush queued log lines before reporting the exit status
    drop(session);
    drop(log_manager);
    code
}
