use std::io::Write;

use heap_walker::{HeapWalker, chunk_layout, locate_region};

use super::{Command, CommandContext, expect_no_args};
use crate::{error::CommandError, presenter};

/// Prints every chunk between the heap base and the top chunk
pub struct HeapDumpCommand;

impl Command for HeapDumpCommand {
    fn name(&self) -> &'static str {
        "heapdump"
    }

    fn help(&self) -> &'static str {
        "Print the chunks that currently make up the newlib heap"
    }

    fn execute(
        &self,
        args: &[String],
        ctx: &CommandContext<'_>,
        out: &mut dyn Write,
    ) -> Result<(), CommandError> {
        expect_no_args(self, args)?;
        let session = ctx.session;
        let target = session.target.open()?;

        let region = locate_region(&*target, &session.geometry)?;
        let layout = chunk_layout(&*target)?;
        session
            .log
            .debug(format!("Heap base {} top chunk {}", region.base, region.top));

        let walker =
            HeapWalker::new(&*target, layout, session.geometry).with_logger(session.log.clone());
        let partial = walker.walk_partial(region);
        match partial.error {
            None => presenter::write_report(out, &partial.report, session.style)?,
            Some(error) => {
                if session.partial_output
                    && error.allows_partial_output()
                    && !partial.report.is_empty()
                {
                    presenter::write_partial(out, &partial.report, session.style)?;
                }
                return Err(error.into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use heap_walker::{Address, HeapError, image::SyntheticHeap};
    use logger::{LogManager, loggers::null::NullLogger};

    use crate::commands::{
        CommandRegistry,
        tests::{run, scenario_image, session},
    };
    use crate::error::CommandError;

    #[test]
    fn dumps_the_scenario_heap() {
        let manager = LogManager::new(NullLogger::new());
        let session = session(scenario_image(), &manager);
        let (res, out) = run(&CommandRegistry::builtin(), &session, &["heapdump"]);
        assert!(res.is_ok());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[3], "| 0x1000        | 0x1008          |                 16 |");
        assert_eq!(lines[4], "| 0x1010        | FREE            |                 32 |");
        assert_eq!(lines[5], "| 0x1030        | 0x1038          |                 24 |");
        assert_eq!(lines[7], "3 blocks: 32/72 bytes free");
    }

    #[test]
    fn corrupt_heap_prints_partial_rows_then_fails() {
        let image = SyntheticHeap::new(Address::new(0x1000), 4)
            .chunk(16, true)
            .chunk(16, false)
            .chunk(16, true)
            .chunk(16, true)
            .corrupt_size(2, 0x16)
            .with_newlib_statics(Address::new(0x400))
            .build();
        let manager = LogManager::new(NullLogger::new());
        let mut session = session(image, &manager);
        let registry = CommandRegistry::builtin();

        let (res, out) = run(&registry, &session, &["heapdump"]);
        match res {
            Err(CommandError::Heap(e @ HeapError::CorruptHeap { .. })) => {
                assert_eq!(e.kind(), "CorruptHeapError");
                assert!(e.to_string().contains("0x1020"));
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(out.starts_with("walk did not finish"));
        assert!(out.contains("2 blocks: 16/32 bytes free"));

        session.partial_output = false;
        let (res, out) = run(&registry, &session, &["heapdump"]);
        assert!(res.is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn missing_symbols_produce_no_output() {
        let image = SyntheticHeap::new(Address::new(0x1000), 4)
            .chunk(16, true)
            .build();
        let manager = LogManager::new(NullLogger::new());
        let session = session(image, &manager);
        let (res, out) = run(&CommandRegistry::builtin(), &session, &["heapdump"]);
        match res {
            Err(CommandError::Heap(e)) => assert_eq!(e.kind(), "SymbolNotFound"),
            other => panic!("unexpected result {:?}", other),
        }
        assert!(out.is_empty());
    }

    #[test]
    fn rejects_arguments() {
        let manager = LogManager::new(NullLogger::new());
        let session = session(scenario_image(), &manager);
        let (res, _) = run(&CommandRegistry::builtin(), &session, &["heapdump", "--all"]);
        assert!(matches!(res, Err(CommandError::Usage(_))));
    }
}
