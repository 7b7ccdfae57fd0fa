use crate::chunk::Chunk;

/// The finished heap map. Built fresh for every walk and never mutated afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalkReport {
    chunks: Vec<Chunk>,
    block_count: usize,
    total_bytes: u64,
    free_bytes: u64,
}

impl WalkReport {
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn block_count(&self) -> usize {
        self.block_count
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn free_bytes(&self) -> u64 {
        self.free_bytes
    }

    pub fn in_use_bytes(&self) -> u64 {
        self.total_bytes - self.free_bytes
    }

    pub fn free_chunk_count(&self) -> usize {
        self.chunks.iter().filter(|c| c.is_free()).count()
    }

    pub fn largest_free_chunk(&self) -> Option<&Chunk> {
        self.chunks.iter().filter(|c| c.is_free()).max_by_key(|c| c.size)
    }

    /// Share of the heap held in free chunks, 0.0 for an empty report
    pub fn fragmentation(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            self.free_bytes as f64 / self.total_bytes as f64
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ReportAggregator {
    report: WalkReport,
}

impl ReportAggregator {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record(&mut self, chunk: Chunk) {
        let report = &mut self.report;
        report.block_count += 1;
        report.total_bytes += chunk.size;
        if chunk.is_free() {
            report.free_bytes += chunk.size;
        }
        report.chunks.push(chunk);
    }

    pub fn block_count(&self) -> usize {
        self.report.block_count
    }

    pub fn finalize(self) -> WalkReport {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{address::Address, chunk::ChunkFlags};

    fn chunk(address: u64, size: u64, in_use: bool) -> Chunk {
        Chunk {
            address: Address::new(address),
            raw_size: size | 1,
            size,
            flags: ChunkFlags::from_bits(1),
            in_use,
            user_data: in_use.then(|| Address::new(address + 8)),
        }
    }

    #[test]
    fn totals_track_recorded_chunks() {
        let mut agg = ReportAggregator::new();
        agg.record(chunk(0x1000, 16, true));
        agg.record(chunk(0x1010, 32, false));
        agg.record(chunk(0x1030, 24, true));
        assert_eq!(agg.block_count(), 3);

        let report = agg.finalize();
        assert_eq!(report.block_count(), 3);
        assert_eq!(report.total_bytes(), 72);
        assert_eq!(report.free_bytes(), 32);
        assert_eq!(report.in_use_bytes(), 40);
        assert_eq!(report.free_chunk_count(), 1);
        assert_eq!(
            report.largest_free_chunk().map(|c| c.address),
            Some(Address::new(0x1010))
        );
        assert!((report.fragmentation() - 32.0 / 72.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_report_has_no_fragmentation() {
        let report = ReportAggregator::new().finalize();
        assert!(report.is_empty());
        assert_eq!(report.fragmentation(), 0.0);
        assert!(report.largest_free_chunk().is_none());
    }
}
