use std::io::Write;

use super::{Command, CommandContext};
use crate::error::CommandError;

pub struct HelpCommand;

impl Command for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }

    fn help(&self) -> &'static str {
        "List the available commands, or describe one"
    }

    fn execute(
        &self,
        args: &[String],
        ctx: &CommandContext<'_>,
        out: &mut dyn Write,
    ) -> Result<(), CommandError> {
        match args {
            [] => {
                writeln!(out, "Utility commands for inspecting a newlib heap:")?;
                let width = ctx
                    .registry
                    .commands()
                    .map(|c| c.name().len())
                    .max()
                    .unwrap_or_default();
                for command in ctx.registry.commands() {
                    writeln!(out, "  {:<width$}  {}", command.name(), command.help())?;
                }
            }
            [name] => {
                let command = ctx
                    .registry
                    .get(name)
                    .ok_or_else(|| CommandError::UnknownCommand(name.clone()))?;
                writeln!(out, "{} : {}", command.name(), command.help())?;
            }
            _ => return Err(CommandError::Usage("help [command]".to_string())),
        }
        Ok(())
    }
}
