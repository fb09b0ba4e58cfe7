//! Tokenization functions which turn raw text into the lowercase word sequence that the
//! map/reduce stages operate on.
use regex::Regex;
use std::num::NonZeroUsize;
use std::ops::Deref;
use std::sync::{Arc, OnceLock};
use tracing::*;

/// An ordered, immutable sequence of lowercase words extracted from some text.
///
/// The words live in an `Arc<[String]>` so the sequence can be handed to many worker threads at
/// once without copying it.  Cloning a `TokenSequence` is cheap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenSequence {
    words: Arc<[String]>,
}

impl TokenSequence {
    pub fn new(words: impl Into<Arc<[String]>>) -> Self {
        Self {
            words: words.into(),
        }
    }

    /// A cheap handle on the shared storage, suitable for moving into another thread
    pub fn shared(&self) -> Arc<[String]> {
        self.words.clone()
    }
}

impl Deref for TokenSequence {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.words
    }
}

/// Matches maximal runs of Unicode word characters (alphanumerics and underscore).
///
/// Runs are found greedily, so a match is always bounded by non-word characters (or the ends of
/// the text) on both sides.
fn word_regex() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();

    WORD.get_or_init(|| Regex::new(r"\w+").expect("BUG: word regex is not valid"))
}

/// Finds qualifying words in text.
///
/// A word is a maximal run of word characters, and it only qualifies if it has at least
/// `min_len` characters.  Length is measured in characters, not bytes.
#[derive(Clone, Copy, Debug)]
pub struct WordMatcher {
    min_len: NonZeroUsize,
}

impl WordMatcher {
    pub fn new(min_len: NonZeroUsize) -> Self {
        Self { min_len }
    }

    pub fn min_len(&self) -> NonZeroUsize {
        self.min_len
    }

    /// Iterate over the qualifying words in `text`, in the order they appear.
    ///
    /// The caller is responsible for lowercasing; this just matches.
    pub fn find_words<'me, 'text>(
        &'me self,
        text: &'text str,
    ) -> impl Iterator<Item = &'text str> + 'text
    where
        'me: 'text,
    {
        let min_len = self.min_len.get();

        word_regex()
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(move |word| word.chars().count() >= min_len)
    }

    /// Lowercase `text` and extract every qualifying word.
    #[instrument(skip_all, fields(bytes = text.len(), min_len = self.min_len.get()))]
    pub fn tokenize(&self, text: &str) -> TokenSequence {
        let lower = text.to_lowercase();
        let words: Vec<String> = self.find_words(&lower).map(str::to_owned).collect();

        debug!(tokens = words.len(), "Tokenized text");

        TokenSequence::new(words)
    }
}

/// Lowercase `text` and extract every word at least `min_len` characters long.
///
/// This is a pure function of its inputs.  Text without any qualifying words yields an empty
/// sequence.
pub fn tokenize(text: &str, min_len: NonZeroUsize) -> TokenSequence {
    WordMatcher::new(min_len).tokenize(text)
}
