use clap::{Args, Parser, Subcommand};
use std::io::{BufWriter, Write};
use std::num::NonZeroUsize;
use std::process::exit;
use tracing::*;
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};
use wordfreq::config::{self, WordFreqConfig};
use wordfreq::fetch::{Fetcher, SourceFetcher};
use wordfreq::report::{self, OutputFormat, DEFAULT_BAR_WIDTH};
use wordfreq::{pipeline, tokenize, TextSource};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    globals: Globals,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Globals {
    /// Turn debugging information on
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    debug: u8,
}

#[derive(Args)]
struct SourceArgs {
    /// Where to get the text: an http:// or https:// URL, or the path of a local file
    #[arg(env = "WORDFREQ_SOURCE", default_value = config::DEFAULT_SOURCE)]
    source: TextSource,

    /// Ignore words with fewer than this many characters
    #[arg(short, long, env = "WORDFREQ_MIN_CHARS", default_value_t = config::DEFAULT_MIN_WORD_LEN)]
    min_chars: NonZeroUsize,
}

#[derive(Args)]
struct WorkerArgs {
    /// Number of worker threads that count words in parallel
    ///
    /// The text is split into this many chunks, one per worker.
    #[arg(short, long, env = "WORDFREQ_WORKERS", default_value_t = config::DEFAULT_WORKERS)]
    workers: NonZeroUsize,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the most frequently used words as a bar chart (or JSON)
    Top {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        workers: WorkerArgs,

        /// How many words to show
        #[arg(short = 'n', long = "top", env = "WORDFREQ_TOP", default_value_t = config::DEFAULT_TOP_N)]
        top_n: NonZeroUsize,

        /// How to present the results
        #[arg(short, long, env = "WORDFREQ_FORMAT", default_value_t = OutputFormat::Chart)]
        format: OutputFormat,

        /// Length in characters of the longest bar in the chart
        #[arg(long, env = "WORDFREQ_WIDTH", default_value_t = DEFAULT_BAR_WIDTH)]
        width: usize,
    },

    /// Print every word with its count, most frequent first, one `word<TAB>count` per line
    Count {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        workers: WorkerArgs,
    },

    /// Print the words extracted from the text, one per line, in the order they appear
    Tokens {
        #[command(flatten)]
        source: SourceArgs,
    },
}

/// Running with more workers than CPUs is allowed, it just won't go any faster
fn warn_if_oversubscribed(workers: NonZeroUsize) {
    if let Ok(cpus) = std::thread::available_parallelism() {
        if workers > cpus {
            warn!(
                workers = workers.get(),
                cpus = cpus.get(),
                "More workers requested than there are CPUs available"
            );
        }
    }
}

impl Commands {
    async fn execute(self) -> anyhow::Result<()> {
        use Commands::*;

        let fetcher = SourceFetcher::new()?;

        match self {
            Top {
                source,
                workers,
                top_n,
                format,
                width,
            } => {
                let config = WordFreqConfig {
                    min_word_len: source.min_chars,
                    workers: workers.workers,
                    top_n,
                };
                warn_if_oversubscribed(config.workers);

                let mut renderer = format.renderer(std::io::stdout(), width);
                pipeline::run(&fetcher, renderer.as_mut(), &source.source, &config).await?;
            }
            Count { source, workers } => {
                let config = WordFreqConfig {
                    min_word_len: source.min_chars,
                    workers: workers.workers,
                    ..Default::default()
                };
                warn_if_oversubscribed(config.workers);

                let table = pipeline::count_words(&fetcher, &source.source, &config).await?;
                debug!(distinct = table.len(), "Writing counts");

                let mut out = BufWriter::new(std::io::stdout().lock());
                report::write_counts(&table, &mut out)?;
            }
            Tokens { source } => {
                let text = fetcher.fetch(&source.source).await?;
                let tokens = tokenize(&text, source.min_chars);
                debug!(tokens = tokens.len(), "Writing tokens");

                let mut out = BufWriter::new(std::io::stdout().lock());
                for token in tokens.iter() {
                    writeln!(out, "{token}")?;
                }
                out.flush()?;
            }
        }

        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let default_log_directive = match cli.globals.debug {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    // Log as JSON to stderr, so stdout is just the results
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_log_directive.into())
                .from_env_lossy(),
        )
        .json()
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    if let Err(e) = cli.command.execute().await {
        error!("{:#}", e);
        exit(1);
    } else {
        debug!("command executed successfully");
    }
}
