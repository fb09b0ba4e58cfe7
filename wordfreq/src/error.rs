use snafu::Snafu;
use std::path::PathBuf;

/// Error types for the wordfreq crate.
pub type Result<T, E = WordFreqError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum WordFreqError {
    #[snafu(display("The source locator is empty"))]
    InvalidSource,

    #[snafu(display("'{url}' is not a valid URL: {reason}"))]
    InvalidUrl { url: String, reason: String },

    #[snafu(display("Failed to create the HTTP client"))]
    HttpClient { source: reqwest::Error },

    #[snafu(display("Failed to retrieve text from '{url}'"))]
    Retrieval { url: String, source: reqwest::Error },

    #[snafu(display("Retrieving text from '{url}' failed with HTTP status {status}"))]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[snafu(display("File I/O error on file '{}'", path.display()))]
    FileIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to spawn worker thread '{worker}'"))]
    WorkerSpawn {
        worker: String,
        source: std::io::Error,
    },

    #[snafu(display("Worker '{worker}' failed"))]
    WorkerFailed {
        worker: String,
        #[snafu(source(from(WordFreqError, Box::new)))]
        source: Box<WordFreqError>,
    },

    #[snafu(display("Worker '{worker}' exited without producing a result (probably a panic)"))]
    WorkerPanicked { worker: String },

    #[snafu(display("Worker '{worker}' stopped before finishing its work"))]
    WorkerStopped { worker: String },

    #[snafu(display("The map/reduce task was aborted"))]
    TaskJoin { source: tokio::task::JoinError },

    #[snafu(display("Failed to write the report"))]
    Render { source: std::io::Error },

    #[snafu(display("Failed to serialize the report"))]
    Serialize { source: serde_json::Error },
}
