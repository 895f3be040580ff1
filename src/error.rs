use thiserror::Error;

/// Unified application error type to simplify bubbling errors through async flows.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Error talking to the repository API. {0}")]
    Http(#[from] reqwest::Error),
    #[error("Fetching history page {page} failed. {source}")]
    HistoryFetch {
        page: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("Invalid commit filter date '{0}'. Expected TODAY or a YYYY-MM-DD day.")]
    InvalidFilterDate(String),
    #[error("Schedule spec is empty.")]
    EmptySchedule,
    #[error("Invalid schedule spec. {0}")]
    InvalidSchedule(String),
    #[error("Error while writing information to a string. {0}")]
    BufferWrite(#[from] std::fmt::Error),
    #[error("Error formatting a timestamp. {0}")]
    TimeFormat(#[from] time::error::Format),
    #[error("Errored while writing output. {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

/// Convenience alias for results that bubble `AppError`.
pub type AppResult<T> = Result<T, AppError>;
