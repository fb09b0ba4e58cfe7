//! The whole run end to end: fetch, tokenize, map/reduce, rank, render.
use crate::aggregate::Aggregator;
use crate::config::WordFreqConfig;
use crate::error::TaskJoinSnafu;
use crate::fetch::{Fetcher, TextSource};
use crate::frequency::FrequencyTable;
use crate::report::{top_n, RankedWord, Renderer};
use crate::tokenize::WordMatcher;
use crate::Result;
use snafu::ResultExt;
use tracing::*;

/// Tokenize `text` and count its words with the map and reduce stages.
///
/// This blocks until all of the workers are done, so async callers should use
/// [`count_words`] instead.
pub fn map_reduce(text: &str, config: &WordFreqConfig) -> Result<FrequencyTable> {
    let tokens = WordMatcher::new(config.min_word_len).tokenize(text);
    if tokens.is_empty() {
        warn!("No words to count; the frequency table will be empty");
    }

    Aggregator::new(config.workers).aggregate(&tokens)
}

/// Fetch the text from `source` and count its words.
///
/// The counting runs on the blocking thread pool so it doesn't tie up the async runtime.
pub async fn count_words(
    fetcher: &dyn Fetcher,
    source: &TextSource,
    config: &WordFreqConfig,
) -> Result<FrequencyTable> {
    info!(%source, "Loading text");
    let text = fetcher.fetch(source).await?;

    info!(
        bytes = text.len(),
        workers = config.workers.get(),
        "Performing map/reduce"
    );
    let config = *config;
    tokio::task::spawn_blocking(move || map_reduce(&text, &config))
        .await
        .context(TaskJoinSnafu)?
}

/// Run the whole pipeline, handing the top-N ranking to `renderer`.
///
/// The ranking is also returned, mostly so callers (and tests) can inspect it.
#[instrument(skip_all, fields(source = %source))]
pub async fn run(
    fetcher: &dyn Fetcher,
    renderer: &mut dyn Renderer,
    source: &TextSource,
    config: &WordFreqConfig,
) -> Result<Vec<RankedWord>> {
    let table = count_words(fetcher, source, config).await?;
    let ranked = top_n(&table, config.top_n);

    info!(words = ranked.len(), "Rendering results");
    renderer.render(&ranked, &config.report_params())?;

    info!("Done");

    Ok(ranked)
}
