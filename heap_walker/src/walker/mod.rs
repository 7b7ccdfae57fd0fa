use logger::{LogMessage, LogWorker, severity::LogSeverity};

use crate::{
    accessor::MemoryAccessor,
    address::Address,
    chunk::{Chunk, ChunkHeader, is_in_use},
    error::{Corruption, HeapError},
    layout::ChunkLayout,
    newlib::{HeapGeometry, HeapRegion},
    report::{ReportAggregator, WalkReport},
};

/// Rows gathered by a walk, together with the error that stopped it early (if any)
#[derive(Debug)]
pub struct PartialWalk {
    pub report: WalkReport,
    pub error: Option<HeapError>,
}

impl PartialWalk {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<WalkReport, HeapError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.report),
        }
    }
}

/// Walks a boundary-tag heap chunk by chunk, from the heap base up to the top chunk.
///
/// The walker only ever reads through its accessor. Every read stays inside
/// `[base, top + header]`: a chunk whose size would step past the top chunk is
/// reported as corruption before its successor is touched.
pub struct HeapWalker<A> {
    accessor: A,
    layout: ChunkLayout,
    geometry: HeapGeometry,
    log: Option<LogWorker>,
}

impl<A: MemoryAccessor> HeapWalker<A> {
    pub fn new(accessor: A, layout: ChunkLayout, geometry: HeapGeometry) -> Self {
        Self {
            accessor,
            layout,
            geometry,
            log: None,
        }
    }

    pub fn with_logger(mut self, worker: LogWorker) -> Self {
        self.log = Some(worker);
        self
    }

    pub fn geometry(&self) -> &HeapGeometry {
        &self.geometry
    }

    pub fn walk(&self, region: HeapRegion) -> Result<WalkReport, HeapError> {
        self.walk_partial(region).into_result()
    }

    pub fn walk_partial(&self, region: HeapRegion) -> PartialWalk {
        let mut aggregator = ReportAggregator::new();
        let error = self.walk_into(region, &mut aggregator).err();
        let report = aggregator.finalize();
        match &error {
            None => self.log(LogSeverity::Debug, || {
                format!(
                    "Walked {} chunks, {}/{} bytes free",
                    report.block_count(),
                    report.free_bytes(),
                    report.total_bytes()
                )
            }),
            Some(e) => self.log(LogSeverity::Debug, || {
                format!("Walk stopped after {} chunks : {}", report.block_count(), e)
            }),
        }
        PartialWalk { report, error }
    }

    fn walk_into(
        &self,
        region: HeapRegion,
        aggregator: &mut ReportAggregator,
    ) -> Result<(), HeapError> {
        let HeapRegion { base, top } = region;
        let span = base.bytes_until(top).ok_or(HeapError::CorruptHeap {
            address: base,
            observed: 0,
            corruption: Corruption::TopBelowBase { base, top },
        })?;
        let bound = self.geometry.chunk_bound(span);
        self.log(LogSeverity::Debug, || {
            format!("Walking heap {} to {} (at most {} chunks)", base, top, bound)
        });

        let mut current = base;
        let mut visited = 0u64;
        loop {
            let (raw, header) = self.read_header(current)?;
            self.validate(current, raw, &header)?;

            let corrupt = |corruption| HeapError::CorruptHeap {
                address: current,
                observed: raw,
                corruption,
            };

            if current == top {
                // The top chunk is always reserved and nothing after it is ours to read,
                // but its size must still end inside the address space
                if current.checked_add(header.size).is_none() {
                    return Err(corrupt(Corruption::AddressOverflow));
                }
                aggregator.record(self.chunk(current, raw, header, true)?);
                return Ok(());
            }

            let next = current
                .checked_add(header.size)
                .ok_or_else(|| corrupt(Corruption::AddressOverflow))?;
            match current.bytes_until(top) {
                Some(remaining) if header.size <= remaining => {}
                _ => return Err(corrupt(Corruption::Overshoot { next, top })),
            }

            let (_, next_header) = self.read_header(next)?;
            let chunk = self.chunk(current, raw, header, is_in_use(&next_header))?;
            self.log(LogSeverity::Verbose, || {
                format!(
                    "{} size {} flags {} {}",
                    chunk.address,
                    chunk.size,
                    chunk.flags,
                    if chunk.in_use { "in use" } else { "free" }
                )
            });
            aggregator.record(chunk);

            visited += 1;
            // The top chunk still has to fit inside the bound
            if visited >= bound {
                return Err(corrupt(Corruption::IterationBound { bound }));
            }
            current = next;
        }
    }

    fn read_header(&self, address: Address) -> Result<(u64, ChunkHeader), HeapError> {
        let field = address
            .checked_add(self.layout.size_offset)
            .ok_or_else(|| {
                HeapError::memory_access(
                    address,
                    self.layout.size_width,
                    "header lies past the address space",
                )
            })?;
        let raw = self
            .accessor
            .read_word(field, self.layout.size_width, self.geometry.endian)?;
        Ok((raw, ChunkHeader::decode(raw)))
    }

    fn validate(&self, address: Address, raw: u64, header: &ChunkHeader) -> Result<(), HeapError> {
        let corruption = if header.size == 0 {
            Corruption::ZeroSize
        } else if header.size % self.geometry.alignment.max(1) != 0 {
            Corruption::Misaligned {
                alignment: self.geometry.alignment,
            }
        } else {
            return Ok(());
        };
        Err(HeapError::CorruptHeap {
            address,
            observed: raw,
            corruption,
        })
    }

    fn chunk(
        &self,
        address: Address,
        raw: u64,
        header: ChunkHeader,
        in_use: bool,
    ) -> Result<Chunk, HeapError> {
        let user_data = if in_use {
            Some(address.checked_add(self.layout.user_data_offset).ok_or(
                HeapError::CorruptHeap {
                    address,
                    observed: raw,
                    corruption: Corruption::AddressOverflow,
                },
            )?)
        } else {
            None
        };
        Ok(Chunk {
            address,
            raw_size: raw,
            size: header.size,
            flags: header.flags,
            in_use,
            user_data,
        })
    }

    fn log(&self, severity: LogSeverity, message: impl FnOnce() -> String) {
        if let Some(worker) = &self.log {
            worker.log(LogMessage::new(severity, message()));
        }
    }
}
