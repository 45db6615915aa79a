//! Error type shared by the cache, storage clients, and table loaders.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The document render service answered with an error or an unusable body.
    #[error("render service error: {0}")]
    RenderService(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// A statistic id is absent from the expression or scale tables.
    #[error("no {table} entry for statistic `{stat}`")]
    MissingStatistic { table: &'static str, stat: String },

    #[error("no translations for language `{0}`")]
    MissingLanguage(String),

    #[error("no producer registered for format `{0}`")]
    UnknownFormat(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Render(#[from] anyhow::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;
