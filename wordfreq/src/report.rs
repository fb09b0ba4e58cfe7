//! Ranking the merged frequency table and presenting the most frequent words.
use crate::error::{RenderSnafu, SerializeSnafu};
use crate::frequency::FrequencyTable;
use crate::Result;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::io::Write;
use std::num::NonZeroUsize;

/// Default width, in characters, of the longest bar in a [`BarChartRenderer`] chart
pub const DEFAULT_BAR_WIDTH: usize = 50;

/// One entry of a top-N ranking
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedWord {
    pub word: String,
    pub count: u64,
}

impl RankedWord {
    pub fn new(word: impl Into<String>, count: u64) -> Self {
        Self {
            word: word.into(),
            count,
        }
    }
}

/// Parameters of the run that a renderer uses for labelling
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ReportParams {
    /// How many words were asked for (the ranking may have fewer)
    pub top_n: NonZeroUsize,

    /// The minimum word length used when tokenizing
    pub min_word_len: NonZeroUsize,
}

/// The `n` most frequent words in `table`, most frequent first.
///
/// Words with the same count are ordered by where they first appeared in the text.  If the table
/// has fewer than `n` words, all of them are returned; an empty table gives an empty ranking.
pub fn top_n(table: &FrequencyTable, n: NonZeroUsize) -> Vec<RankedWord> {
    table
        .ranked()
        .into_iter()
        .take(n.get())
        .map(|(word, stats)| RankedWord::new(word, stats.count))
        .collect()
}

/// Write every word in `table` in rank order, one `word<TAB>count` line per word
pub fn write_counts(table: &FrequencyTable, out: &mut impl Write) -> Result<()> {
    for (word, stats) in table.ranked() {
        writeln!(out, "{word}\t{}", stats.count).context(RenderSnafu)?;
    }
    out.flush().context(RenderSnafu)
}

/// Presents a ranking to the user somehow.
pub trait Renderer {
    fn render(&mut self, ranked: &[RankedWord], params: &ReportParams) -> Result<()>;
}

/// The ways a ranking can be presented
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    /// Horizontal bar chart drawn with text
    #[default]
    Chart,

    /// Machine-readable JSON document
    Json,
}

impl OutputFormat {
    /// Make a renderer for this format that writes to `out`
    pub fn renderer<W: Write + 'static>(self, out: W, bar_width: usize) -> Box<dyn Renderer> {
        match self {
            OutputFormat::Chart => Box::new(BarChartRenderer::new(out).with_bar_width(bar_width)),
            OutputFormat::Json => Box::new(JsonRenderer::new(out)),
        }
    }
}

/// Draws a horizontal bar chart with the most frequent word at the top.
///
/// Bars are scaled so the most frequent word gets a bar exactly `bar_width` characters long.
/// Every word that appears at all gets at least one character of bar, however small its count.
pub struct BarChartRenderer<W> {
    out: W,
    bar_width: usize,
}

impl<W: Write> BarChartRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            bar_width: DEFAULT_BAR_WIDTH,
        }
    }

    pub fn with_bar_width(mut self, bar_width: usize) -> Self {
        self.bar_width = bar_width.max(1);
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn bar_len(&self, count: u64, max_count: u64) -> usize {
        if max_count == 0 {
            return 0;
        }

        // Rounded to the nearest character
        let width = self.bar_width as u64;
        let len = (count * width + max_count / 2) / max_count;
        (len as usize).max(1)
    }

    fn write_chart(&mut self, ranked: &[RankedWord], params: &ReportParams) -> std::io::Result<()> {
        writeln!(
            self.out,
            "Top {} Most Frequently Used Words. Minimum characters={}",
            params.top_n, params.min_word_len
        )?;

        if ranked.is_empty() {
            writeln!(self.out, "(no words to display)")?;
            return self.out.flush();
        }

        const WORDS_LABEL: &str = "Words";
        let label_width = ranked
            .iter()
            .map(|entry| entry.word.chars().count())
            .chain(std::iter::once(WORDS_LABEL.len()))
            .max()
            .unwrap_or(WORDS_LABEL.len());
        let max_count = ranked.iter().map(|entry| entry.count).max().unwrap_or(0);

        writeln!(self.out)?;
        writeln!(self.out, "{WORDS_LABEL:<label_width$} | Frequency")?;
        writeln!(
            self.out,
            "{}-+-{}",
            "-".repeat(label_width),
            "-".repeat(self.bar_width)
        )?;

        for entry in ranked {
            let bar = "#".repeat(self.bar_len(entry.count, max_count));
            writeln!(
                self.out,
                "{:<label_width$} | {bar} {}",
                entry.word, entry.count
            )?;
        }

        self.out.flush()
    }
}

impl<W: Write> Renderer for BarChartRenderer<W> {
    fn render(&mut self, ranked: &[RankedWord], params: &ReportParams) -> Result<()> {
        self.write_chart(ranked, params).context(RenderSnafu)
    }
}

/// The shape of the document written by [`JsonRenderer`]
#[derive(Serialize)]
struct JsonReport<'a> {
    top_n: NonZeroUsize,
    min_word_len: NonZeroUsize,
    words: &'a [RankedWord],
}

/// Writes the ranking as a pretty-printed JSON document
pub struct JsonRenderer<W> {
    out: W,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for JsonRenderer<W> {
    fn render(&mut self, ranked: &[RankedWord], params: &ReportParams) -> Result<()> {
        let report = JsonReport {
            top_n: params.top_n,
            min_word_len: params.min_word_len,
            words: ranked,
        };

        serde_json::to_writer_pretty(&mut self.out, &report).context(SerializeSnafu)?;
        writeln!(self.out).context(RenderSnafu)?;
        self.out.flush().context(RenderSnafu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn example_table() -> FrequencyTable {
        "the cat sat the cat sat the mat".split(' ').collect()
    }

    fn params(top_n: usize, min_word_len: usize) -> ReportParams {
        ReportParams {
            top_n: nz(top_n),
            min_word_len: nz(min_word_len),
        }
    }

    fn render_chart(ranked: &[RankedWord], params: &ReportParams, width: usize) -> String {
        let mut renderer = BarChartRenderer::new(Vec::new()).with_bar_width(width);
        renderer.render(ranked, params).unwrap();
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn top_n_breaks_ties_by_first_occurrence() {
        assert_eq!(
            vec![RankedWord::new("the", 3), RankedWord::new("cat", 2)],
            top_n(&example_table(), nz(2))
        );
    }

    #[test]
    fn top_n_with_fewer_words_than_requested() {
        assert_eq!(4, top_n(&example_table(), nz(10)).len());
        assert!(top_n(&FrequencyTable::new(), nz(10)).is_empty());
    }

    #[test]
    fn bar_chart() {
        let ranked = top_n(&example_table(), nz(4));
        let chart = render_chart(&ranked, &params(4, 3), 12);

        expect_test::expect![[r#"
            Top 4 Most Frequently Used Words. Minimum characters=3

            Words | Frequency
            ------+-------------
            the   | ############ 3
            cat   | ######## 2
            sat   | ######## 2
            mat   | #### 1
        "#]]
        .assert_eq(&chart);
    }

    #[test]
    fn bar_chart_with_long_words_and_tiny_counts() {
        let ranked = vec![
            RankedWord::new("administration", 1000),
            RankedWord::new("year", 1),
        ];
        let chart = render_chart(&ranked, &params(10, 4), 10);

        expect_test::expect![[r#"
            Top 10 Most Frequently Used Words. Minimum characters=4

            Words          | Frequency
            ---------------+-----------
            administration | ########## 1000
            year           | # 1
        "#]]
        .assert_eq(&chart);
    }

    #[test]
    fn empty_bar_chart() {
        let chart = render_chart(&[], &params(10, 4), 10);

        expect_test::expect![[r#"
            Top 10 Most Frequently Used Words. Minimum characters=4
            (no words to display)
        "#]]
        .assert_eq(&chart);
    }

    #[test]
    fn json_report() {
        let ranked = top_n(&example_table(), nz(2));
        let mut renderer = JsonRenderer::new(Vec::new());
        renderer.render(&ranked, &params(2, 3)).unwrap();
        let json = String::from_utf8(renderer.into_inner()).unwrap();

        expect_test::expect![[r#"
            {
              "top_n": 2,
              "min_word_len": 3,
              "words": [
                {
                  "word": "the",
                  "count": 3
                },
                {
                  "word": "cat",
                  "count": 2
                }
              ]
            }
        "#]]
        .assert_eq(&json);
    }

    #[test]
    fn counts_in_rank_order() {
        let mut out = Vec::new();
        write_counts(&example_table(), &mut out).unwrap();

        assert_eq!("the\t3\ncat\t2\nsat\t2\nmat\t1\n", String::from_utf8(out).unwrap());
    }

    #[test]
    fn output_format_names() {
        assert_eq!(OutputFormat::Json, "json".parse().unwrap());
        assert_eq!(OutputFormat::Chart, "chart".parse().unwrap());
        assert_eq!("chart", OutputFormat::Chart.to_string());
        assert!("pie".parse::<OutputFormat>().is_err());
    }
}
