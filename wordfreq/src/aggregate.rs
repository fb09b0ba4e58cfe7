//! The parallel part of the pipeline: count each chunk of tokens on its own thread (map), then
//! combine the partial counts (reduce).
use crate::chunk::{partition, Chunk};
use crate::error::WorkerStoppedSnafu;
use crate::frequency::FrequencyTable;
use crate::tokenize::TokenSequence;
use crate::util::threading::{StopSignalReceiver, ThreadWorker, WorkerPool};
use crate::Result;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::*;

/// How many tokens a worker counts between checks of its stop signal
const STOP_CHECK_INTERVAL: usize = 4096;

/// Count the tokens in a single chunk.
///
/// This is the body of a map-stage worker.  It only reads `tokens` and has no side effects, and
/// the positions it records are global so the partial tables can be merged directly.
pub fn count_chunk(tokens: &[String], chunk: &Chunk) -> FrequencyTable {
    FrequencyTable::from_tokens(chunk.slice(tokens), chunk.range.start)
}

/// Map-stage worker that counts one chunk of a shared token sequence
struct ChunkCounter {
    tokens: Arc<[String]>,
    chunk: Chunk,
}

impl ThreadWorker for ChunkCounter {
    type FinalOutput = FrequencyTable;

    fn worker_name(&self) -> String {
        format!("count-chunk-{}", self.chunk.index)
    }

    fn run(self, stop_signal: StopSignalReceiver) -> Result<FrequencyTable> {
        debug!(tokens = self.chunk.len(), range = ?self.chunk.range, "Counting chunk");

        let mut table = FrequencyTable::new();
        let end = self.chunk.range.end;

        for start in self.chunk.range.clone().step_by(STOP_CHECK_INTERVAL) {
            if stop_signal.is_stop_signaled() {
                return WorkerStoppedSnafu {
                    worker: self.worker_name(),
                }
                .fail();
            }

            let block = Chunk {
                index: self.chunk.index,
                range: start..end.min(start + STOP_CHECK_INTERVAL),
            };
            table.merge(count_chunk(&self.tokens, &block));
        }

        debug!(distinct = table.len(), "Counted chunk");

        Ok(table)
    }
}

/// Runs the map and reduce stages over a token sequence with a fixed number of workers.
///
/// Each call to [`Self::aggregate`] starts its own pool of worker threads and waits for all of
/// them before returning; no threads outlive the call.
#[derive(Clone, Copy, Debug)]
pub struct Aggregator {
    workers: NonZeroUsize,
}

impl Aggregator {
    pub fn new(workers: NonZeroUsize) -> Self {
        Self { workers }
    }

    /// Map stage: count each chunk on its own thread, returning the partial tables in chunk
    /// order.
    ///
    /// Blocks until every worker is done.  If any worker fails the whole thing fails; there are
    /// no partial results.
    #[instrument(skip_all, fields(tokens = tokens.len(), workers = self.workers.get()))]
    pub fn map(&self, tokens: &TokenSequence) -> Result<Vec<FrequencyTable>> {
        let shared = tokens.shared();
        let chunks = partition(tokens.len(), self.workers);

        let pool = WorkerPool::start(chunks.into_iter().map(|chunk| ChunkCounter {
            tokens: shared.clone(),
            chunk,
        }))?;
        debug!(workers = pool.len(), "Waiting for map-stage workers");

        let partials = pool.join_all()?;
        debug!(partials = partials.len(), "Map stage complete");

        Ok(partials)
    }

    /// Reduce stage: merge the partial tables into one.
    pub fn reduce(partials: impl IntoIterator<Item = FrequencyTable>) -> FrequencyTable {
        FrequencyTable::merge_all(partials)
    }

    /// Count every word in `tokens` using the map and reduce stages.
    pub fn aggregate(&self, tokens: &TokenSequence) -> Result<FrequencyTable> {
        let partials = self.map(tokens)?;
        let table = Self::reduce(partials);

        info!(
            distinct = table.len(),
            total = table.total(),
            "Aggregated word frequencies"
        );

        Ok(table)
    }
}
