use thiserror::Error;
use tokio::sync::mpsc;

use crate::record::LookupResult;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Couldn't read input file '{path}': {source}")]
    Input {
        path: String,
        source: std::io::Error,
    },

    #[error("The selector used for scraping is invalid. Selector: {0}")]
    Selector(String),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Csv Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::Error),
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("No CSV or Excel files found in '{0}'")]
    NoInputFiles(String),
    #[error("None of the discovered files could be read")]
    NoReadableFiles,

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),
    #[error("Couldn't acquire a concurrency permit, the semaphore was closed.")]
    RuntimeAcquire(#[from] tokio::sync::AcquireError),
    #[error("Couldn't send a result through a channel.")]
    RuntimeSendError,

    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

impl From<mpsc::error::SendError<LookupResult>> for Error {
    fn from(_value: mpsc::error::SendError<LookupResult>) -> Self {
        Error::RuntimeSendError
    }
}
