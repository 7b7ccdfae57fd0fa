use std::io::Write;

use heap_walker::{HeapWalker, chunk_layout, locate_region};

use super::{Command, CommandContext, expect_no_args};
use crate::{error::CommandError, presenter};

/// Fragmentation summary without the per-chunk table
pub struct HeapStatsCommand;

impl Command for HeapStatsCommand {
    fn name(&self) -> &'static str {
        "heapstats"
    }

    fn help(&self) -> &'static str {
        "Summarise free space and fragmentation of the newlib heap"
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
        // Totals from half a heap would be misleading, so no partial output here
        let report = HeapWalker::new(&*target, layout, session.geometry)
            .with_logger(session.log.clone())
            .walk(region)?;
        presenter::write_stats(out, &report)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use logger::{LogManager, loggers::null::NullLogger};

    use crate::commands::{
        CommandRegistry,
        tests::{run, scenario_image, session},
    };

    #[test]
    fn summarises_the_scenario_heap() {
        let manager = LogManager::new(NullLogger::new());
        let session = session(scenario_image(), &manager);
        let (res, out) = run(&CommandRegistry::builtin(), &session, &["heapstats"]);
        assert!(res.is_ok());
        assert_eq!(
            out,
            "\
3 blocks: 32/72 bytes free
in use: 40 bytes in 2 chunks
free: 32 bytes in 1 chunks, largest 32 bytes at 0x1010
fragmentation: 44.44%
"
        );
    }
}
