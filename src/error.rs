use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatementParseError {
    #[error("No parseable financial statement sheet found among {sheet_count} sheet(s)")]
    NoParseableSheet { sheet_count: usize },

    #[error("No financial data found in the uploaded file: {}", .errors.join("; "))]
    NoFinancialData { errors: Vec<String> },

    #[error("Invalid parser configuration: {0}")]
    InvalidConfig(String),

    #[error("Row '{label}' not found in {statement}")]
    RowNotFound { statement: String, label: String },

    #[error("Row '{0}' is calculated and cannot be edited directly")]
    RowNotEditable(String),

    #[error("Period index {period} is out of range for {column_count} column(s)")]
    PeriodOutOfRange { period: usize, column_count: usize },

    #[error("Ratio computation error: {0}")]
    RatioComputation(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StatementParseError>;
