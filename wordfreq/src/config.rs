use crate::report::ReportParams;
use std::num::NonZeroUsize;

/// The text analyzed when no source is given: "State of the Union Addresses of Ronald Reagan"
/// from Project Gutenberg
pub const DEFAULT_SOURCE: &str = "https://www.gutenberg.org/cache/epub/5046/pg5046.txt";

pub const DEFAULT_MIN_WORD_LEN: NonZeroUsize = match NonZeroUsize::new(4) {
    Some(n) => n,
    None => unreachable!(),
};

pub const DEFAULT_WORKERS: NonZeroUsize = match NonZeroUsize::new(5) {
    Some(n) => n,
    None => unreachable!(),
};

pub const DEFAULT_TOP_N: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(n) => n,
    None => unreachable!(),
};

/// Parameters of one word frequency run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WordFreqConfig {
    /// Words shorter than this many characters are ignored
    pub min_word_len: NonZeroUsize,

    /// Number of map-stage worker threads, which is also the number of chunks.
    ///
    /// This isn't checked against the number of CPUs; asking for more workers than there are
    /// CPUs works, it just doesn't make anything faster.
    pub workers: NonZeroUsize,

    /// How many of the most frequent words to report
    pub top_n: NonZeroUsize,
}

impl WordFreqConfig {
    pub fn report_params(&self) -> ReportParams {
        ReportParams {
            top_n: self.top_n,
            min_word_len: self.min_word_len,
        }
    }
}

impl Default for WordFreqConfig {
    fn default() -> Self {
        Self {
            min_word_len: DEFAULT_MIN_WORD_LEN,
            workers: DEFAULT_WORKERS,
            top_n: DEFAULT_TOP_N,
        }
    }
}
