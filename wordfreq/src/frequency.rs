//! The word frequency table produced by the map stage and combined by the reduce stage.
use rustc_hash::FxHashMap;
use std::cmp::Ordering;

/// What is known about one word in a [`FrequencyTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WordStats {
    /// Number of times the word occurs
    pub count: u64,

    /// Index in the full token sequence of the first occurrence of the word.
    ///
    /// This is what makes ranking deterministic: words with equal counts are ordered by which
    /// one appeared first in the text.
    pub first_seen: usize,
}

impl WordStats {
    fn merge(&mut self, other: WordStats) {
        self.count += other.count;
        self.first_seen = self.first_seen.min(other.first_seen);
    }
}

/// Mapping from word to its occurrence count (and first occurrence).
///
/// Merging tables is commutative and associative: counts are summed and the earliest first
/// occurrence wins, so partial tables can be combined in any order with the same result.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    words: FxHashMap<String, WordStats>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every token in `tokens`.
    ///
    /// `offset` is the index of `tokens[0]` in the full token sequence, so that first-occurrence
    /// positions are global even when `tokens` is just one chunk.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S], offset: usize) -> Self {
        let mut table = Self::new();
        for (i, token) in tokens.iter().enumerate() {
            table.record(token.as_ref(), offset + i);
        }
        table
    }

    /// Record one occurrence of `word` at global token index `position`
    pub fn record(&mut self, word: &str, position: usize) {
        let occurrence = WordStats {
            count: 1,
            first_seen: position,
        };

        // Avoid allocating a new `String` key for words that are already present, which is the
        // overwhelmingly common case
        match self.words.get_mut(word) {
            Some(stats) => stats.merge(occurrence),
            None => {
                self.words.insert(word.to_owned(), occurrence);
            }
        }
    }

    /// Fold all of the counts in `other` into this table.
    pub fn merge(&mut self, other: FrequencyTable) {
        // Merge the smaller table into the larger one; the result is the same either way
        let (mut target, source) = if self.words.len() >= other.words.len() {
            (std::mem::take(&mut self.words), other.words)
        } else {
            (other.words, std::mem::take(&mut self.words))
        };

        for (word, stats) in source {
            target
                .entry(word)
                .and_modify(|existing| existing.merge(stats))
                .or_insert(stats);
        }

        self.words = target;
    }

    /// Merge any number of partial tables into a single global table
    pub fn merge_all(tables: impl IntoIterator<Item = FrequencyTable>) -> Self {
        tables
            .into_iter()
            .fold(Self::new(), |mut merged, partial| {
                merged.merge(partial);
                merged
            })
    }

    pub fn get(&self, word: &str) -> Option<WordStats> {
        self.words.get(word).copied()
    }

    /// Occurrences of `word`, which is 0 for words that aren't in the table
    pub fn count(&self, word: &str) -> u64 {
        self.get(word).map(|stats| stats.count).unwrap_or(0)
    }

    /// Number of distinct words
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Total number of tokens counted, across all words
    pub fn total(&self) -> u64 {
        self.words.values().map(|stats| stats.count).sum()
    }

    /// Iterate over all words, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, WordStats)> {
        self.words.iter().map(|(word, stats)| (word.as_str(), *stats))
    }

    /// Every word in the table, in rank order.
    ///
    /// Rank order is count descending, then first occurrence ascending.  Two distinct words can
    /// only share a first occurrence if the table was assembled by hand, in which case the words
    /// themselves break the tie so the order is still total.
    pub fn ranked(&self) -> Vec<(&str, WordStats)> {
        let mut ranked: Vec<_> = self.iter().collect();
        ranked.sort_unstable_by(|(a_word, a), (b_word, b)| rank_order(a_word, a, b_word, b));
        ranked
    }
}

fn rank_order(a_word: &str, a: &WordStats, b_word: &str, b: &WordStats) -> Ordering {
    b.count
        .cmp(&a.count)
        .then(a.first_seen.cmp(&b.first_seen))
        .then_with(|| a_word.cmp(b_word))
}

impl<'a> FromIterator<&'a str> for FrequencyTable {
    /// Count a sequence of tokens that starts at global index 0
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        let mut table = Self::new();
        for (i, word) in iter.into_iter().enumerate() {
            table.record(word, i);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stats(count: u64, first_seen: usize) -> WordStats {
        WordStats { count, first_seen }
    }

    #[test]
    fn counts_tokens() {
        let table: FrequencyTable = "the cat sat the cat sat the mat".split(' ').collect();

        assert_eq!(4, table.len());
        assert_eq!(8, table.total());
        assert_eq!(Some(stats(3, 0)), table.get("the"));
        assert_eq!(Some(stats(2, 1)), table.get("cat"));
        assert_eq!(Some(stats(2, 2)), table.get("sat"));
        assert_eq!(Some(stats(1, 7)), table.get("mat"));
        assert_eq!(0, table.count("dog"));
    }

    #[test]
    fn offset_makes_positions_global() {
        let table = FrequencyTable::from_tokens(&["cat", "dog", "cat"], 100);

        assert_eq!(Some(stats(2, 100)), table.get("cat"));
        assert_eq!(Some(stats(1, 101)), table.get("dog"));
    }

    #[test]
    fn merge_sums_counts_and_keeps_earliest_position() {
        let mut left = FrequencyTable::from_tokens(&["cat", "dog"], 10);
        let right = FrequencyTable::from_tokens(&["dog", "cat", "cat", "owl"], 0);

        left.merge(right);

        assert_eq!(Some(stats(3, 1)), left.get("cat"));
        assert_eq!(Some(stats(2, 0)), left.get("dog"));
        assert_eq!(Some(stats(1, 3)), left.get("owl"));
    }

    #[test]
    fn merging_empty_tables() {
        let table = FrequencyTable::from_tokens(&["cat"], 0);

        let mut merged = FrequencyTable::new();
        merged.merge(table.clone());
        merged.merge(FrequencyTable::new());
        assert_eq!(table, merged);

        assert!(FrequencyTable::merge_all(Vec::<FrequencyTable>::new()).is_empty());
    }

    #[test]
    fn ranked_breaks_ties_by_first_occurrence() {
        let table: FrequencyTable = "the cat sat the cat sat the mat".split(' ').collect();
        let ranked: Vec<_> = table.ranked().into_iter().map(|(w, s)| (w, s.count)).collect();

        assert_eq!(vec![("the", 3), ("cat", 2), ("sat", 2), ("mat", 1)], ranked);
    }

    prop_compose! {
        /// A handful of chunks of tokens drawn from a small vocabulary, so there are plenty of
        /// repeated words across chunks
        fn chunked_tokens()(chunks in prop::collection::vec(
            prop::collection::vec("[a-e]{1,2}", 0..40),
            1..8,
        )) -> Vec<Vec<String>> {
            chunks
        }
    }

    /// Count each chunk with the right global offset
    fn partial_tables(chunks: &[Vec<String>]) -> Vec<FrequencyTable> {
        let mut offset = 0;
        chunks
            .iter()
            .map(|chunk| {
                let table = FrequencyTable::from_tokens(chunk.as_slice(), offset);
                offset += chunk.len();
                table
            })
            .collect()
    }

    proptest! {
        /// Merging partial tables in any order gives the same global table
        #[test]
        fn merge_is_order_independent(
            chunks in chunked_tokens(),
            seed in any::<u64>(),
        ) {
            let partials = partial_tables(&chunks);
            let forward = FrequencyTable::merge_all(partials.clone());

            let mut reversed = partials.clone();
            reversed.reverse();
            prop_assert_eq!(&forward, &FrequencyTable::merge_all(reversed));

            // A cheap deterministic shuffle driven by the seed
            let mut shuffled = partials;
            let len = shuffled.len();
            for i in (1..len).rev() {
                let j = (seed.rotate_left(i as u32) as usize) % (i + 1);
                shuffled.swap(i, j);
            }
            prop_assert_eq!(&forward, &FrequencyTable::merge_all(shuffled));
        }

        /// Counting chunk by chunk and merging matches counting everything in one go
        #[test]
        fn chunked_counts_match_serial_counts(chunks in chunked_tokens()) {
            let all: Vec<String> = chunks.concat();
            let serial = FrequencyTable::from_tokens(all.as_slice(), 0);
            let merged = FrequencyTable::merge_all(partial_tables(&chunks));

            prop_assert_eq!(serial.total(), all.len() as u64);
            prop_assert_eq!(serial, merged);
        }
    }
}
