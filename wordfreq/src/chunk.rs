//! Splitting a token sequence into contiguous chunks, one per worker.
use std::num::NonZeroUsize;
use std::ops::Range;

/// A contiguous range of indices into a token sequence, assigned to a single worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk among its siblings, starting at 0
    pub index: usize,

    /// The token indices covered by this chunk
    pub range: Range<usize>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// The tokens in `tokens` that this chunk covers.
    ///
    /// Panics if the chunk doesn't fit in `tokens`, which can only happen if the chunk was made
    /// for a different sequence.
    pub fn slice<'a, T>(&self, tokens: &'a [T]) -> &'a [T] {
        &tokens[self.range.clone()]
    }
}

/// Partition `len` tokens into exactly `workers` contiguous chunks.
///
/// Every chunk gets `len / workers` tokens, except the last one which also gets the remainder, so
/// no token is ever dropped.  When there are fewer tokens than workers, all chunks but the last
/// are empty.
pub fn partition(len: usize, workers: NonZeroUsize) -> Vec<Chunk> {
    let workers = workers.get();
    let chunk_size = len / workers;

    (0..workers)
        .map(|index| {
            let start = index * chunk_size;
            let end = if index + 1 == workers {
                len
            } else {
                start + chunk_size
            };

            Chunk {
                index,
                range: start..end,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn ranges(len: usize, workers: usize) -> Vec<Range<usize>> {
        partition(len, nz(workers))
            .into_iter()
            .map(|chunk| chunk.range)
            .collect()
    }

    #[test]
    fn even_split() {
        assert_eq!(vec![0..3, 3..6, 6..9], ranges(9, 3));
    }

    #[test]
    fn remainder_goes_to_last_chunk() {
        assert_eq!(vec![0..2, 2..4, 4..8], ranges(8, 3));
        assert_eq!(vec![0..2, 2..4, 4..6, 6..8, 8..12], ranges(12, 5));
    }

    #[test]
    fn fewer_tokens_than_workers() {
        assert_eq!(vec![0..0, 0..0, 0..0, 0..0, 0..3], ranges(3, 5));

        let chunks = partition(3, nz(5));
        assert!(chunks[..4].iter().all(Chunk::is_empty));
        assert_eq!(3, chunks[4].len());
    }

    #[test]
    fn no_tokens() {
        let chunks = partition(0, nz(4));
        assert_eq!(4, chunks.len());
        assert!(chunks.iter().all(Chunk::is_empty));
    }

    #[test]
    fn slice_returns_covered_tokens() {
        let tokens = ["a", "b", "c", "d", "e"];
        let chunks = partition(tokens.len(), nz(2));

        assert_eq!(&["a", "b"], chunks[0].slice(&tokens));
        assert_eq!(&["c", "d", "e"], chunks[1].slice(&tokens));
    }

    proptest! {
        /// Chunks are numbered in order, are contiguous, and cover everything exactly once
        #[test]
        fn chunks_cover_sequence(len in 0usize..10_000, workers in 1usize..64) {
            let chunks = partition(len, nz(workers));

            prop_assert_eq!(workers, chunks.len());

            let mut expected_start = 0;
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(i, chunk.index);
                prop_assert_eq!(expected_start, chunk.range.start);
                expected_start = chunk.range.end;
            }
            prop_assert_eq!(len, expected_start);

            // Only the last chunk may be larger than the others
            let base = len / workers;
            for chunk in &chunks[..workers - 1] {
                prop_assert_eq!(base, chunk.len());
            }
            prop_assert_eq!(base + len % workers, chunks[workers - 1].len());
        }
    }
}
