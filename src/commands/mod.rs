use std::io::Write;

use heap_walker::HeapGeometry;
use logger::LogWorker;

use crate::{error::CommandError, presenter::Style, target::TargetSource};

mod heapdump;
mod help;
mod stats;

pub use heapdump::HeapDumpCommand;
pub use help::HelpCommand;
pub use stats::HeapStatsCommand;

/// Everything a command may use. Built once at startup; commands must not stash
/// anything they read from the target in here.
pub struct Session {
    pub target: Box<dyn TargetSource>,
    pub geometry: HeapGeometry,
    pub style: Style,
    pub partial_output: bool,
    pub log: LogWorker,
}

pub struct CommandContext<'a> {
    pub session: &'a Session,
    pub registry: &'a CommandRegistry,
}

pub trait Command {
    fn name(&self) -> &'static str;

    /// One line shown by `help`
    fn help(&self) -> &'static str;

    fn execute(
        &self,
        args: &[String],
        ctx: &CommandContext<'_>,
        out: &mut dyn Write,
    ) -> Result<(), CommandError>;
}

#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Box<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// The registry with every built-in command
    pub fn builtin() -> Self {
        Self::new()
            .with_command(HeapDumpCommand)
            .with_command(HeapStatsCommand)
            .with_command(HelpCommand)
    }

    /// Registers a command, replacing any existing one of the same name
    pub fn with_command<C: Command + 'static>(mut self, command: C) -> Self {
        self.commands.retain(|c| c.name() != command.name());
        self.commands.push(Box::new(command));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    pub fn commands(&self) -> impl Iterator<Item = &dyn Command> {
        self.commands.iter().map(|c| c.as_ref())
    }

    pub fn dispatch(
        &self,
        name: &str,
        args: &[String],
        session: &Session,
        out: &mut dyn Write,
    ) -> Result<(), CommandError> {
        let command = self
            .get(name)
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;
        session.log.debug(format!(
            "Running `{}` against {}",
            command.name(),
            session.target.describe()
        ));
        let ctx = CommandContext {
            session,
            registry: self,
        };
        command.execute(args, &ctx, out)
    }
}

/// Commands in this module take no arguments
fn expect_no_args(command: &dyn Command, args: &[String]) -> Result<(), CommandError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandError::Usage(format!(
            "`{}` takes no arguments, got `{}`",
            command.name(),
            args.join(" ")
        )))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use heap_walker::{Address, image::{MemoryImage, SyntheticHeap}};
    use logger::{LogManager, loggers::null::NullLogger};

    use super::*;

    pub(crate) fn scenario_image() -> MemoryImage {
        SyntheticHeap::new(Address::new(0x1000), 4)
            .chunk(16, true)
            .chunk(32, false)
            .chunk(24, true)
            .with_newlib_statics(Address::new(0x400))
            .build()
    }

    pub(crate) fn session(image: MemoryImage, manager: &LogManager) -> Session {
        Session {
            target: Box::new(image),
            geometry: HeapGeometry::default(),
            style: Style::default(),
            partial_output: true,
            log: manager.get_log_worker(),
        }
    }

    pub(crate) fn run(
        registry: &CommandRegistry,
        session: &Session,
        line: &[&str],
    ) -> (Result<(), CommandError>, String) {
        let args: Vec<String> = line[1..].iter().map(|s| s.to_string()).collect();
        let mut out = Vec::new();
        let res = registry.dispatch(line[0], &args, session, &mut out);
        (res, String::from_utf8(out).unwrap())
    }

    struct Echo;

    impl Command for Echo {
        fn name(&self) -> &'static str {
            "heapdump"
        }

        fn help(&self) -> &'static str {
            "echoes its arguments"
        }

        fn execute(
            &self,
            args: &[String],
            _ctx: &CommandContext<'_>,
            out: &mut dyn Write,
        ) -> Result<(), CommandError> {
            writeln!(out, "{}", args.join(","))?;
            Ok(())
        }
    }

    #[test]
    fn unknown_commands_are_rejected() {
        let manager = LogManager::new(NullLogger::new());
        let session = session(scenario_image(), &manager);
        let (res, out) = run(&CommandRegistry::builtin(), &session, &["defrag"]);
        assert!(matches!(res, Err(CommandError::UnknownCommand(name)) if name == "defrag"));
        assert!(out.is_empty());
    }

    #[test]
    fn later_registration_replaces_by_name() {
        let registry = CommandRegistry::builtin().with_command(Echo);
        assert_eq!(registry.commands().count(), 3);
        assert_eq!(registry.get("heapdump").unwrap().help(), "echoes its arguments");

        let manager = LogManager::new(NullLogger::new());
        let session = session(scenario_image(), &manager);
        let (res, out) = run(&registry, &session, &["heapdump", "a", "b"]);
        assert!(res.is_ok());
        assert_eq!(out, "a,b\n");
    }
}
