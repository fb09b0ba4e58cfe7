pub mod aggregate;
pub mod chunk;
pub mod config;
mod error;
pub mod fetch;
pub mod frequency;
pub mod pipeline;
pub mod report;
pub mod tokenize;
mod util;

pub use aggregate::Aggregator;
pub use config::WordFreqConfig;
pub use error::{Result, WordFreqError};
pub use fetch::{Fetcher, SourceFetcher, TextSource};
pub use frequency::{FrequencyTable, WordStats};
pub use report::{OutputFormat, RankedWord, Renderer, ReportParams};
pub use tokenize::{tokenize, TokenSequence};
