use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error("Configuration was considered invalid due to error: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("Energy estimate could not be obtained: {0}")]
    EstimateUnavailable(#[from] EstimateError),
    #[error("Manual input was rejected: {0}")]
    ManualInput(#[from] ManualInputError),
    #[error("Error identified during recommendation calculation: {0}")]
    FailureInCalculation(#[from] CalculationError),
    #[error("Error while filling the report: {0}")]
    Report(#[from] ReportError),
    #[error("Error while writing the report: {0}")]
    Output(anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not parse configuration source '{source_name}': {message}")]
    Parse {
        source_name: String,
        message: String,
    },
    #[error("unrecognised site type '{0}', expected one of PA, NJ")]
    UnknownSiteType(String),
    #[error("incentive rate {field} is required for site type {site_type}")]
    MissingIncentiveRate {
        field: &'static str,
        site_type: String,
    },
    #[error("invalid parameters: {0}")]
    InvalidParameters(#[from] serde_json::Error),
}

/// The distinct ways a call to the production estimate service can fail.
#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("request to estimate service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("estimate service rejected the API key (HTTP {0})")]
    Unauthorized(u16),
    #[error("estimate service responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("estimate service reported errors: {}", .0.join("; "))]
    ServiceErrors(Vec<String>),
    #[error("estimate response was malformed: {0}")]
    MalformedPayload(#[from] serde_json::Error),
    #[error("estimate response is missing field '{0}'")]
    MissingField(&'static str),
    #[error("estimate field '{field}' has {actual} monthly values, expected 12")]
    WrongSeriesLength { field: &'static str, actual: usize },
}

#[derive(Debug, Error)]
pub enum ManualInputError {
    #[error("could not read manual input: {0}")]
    Io(#[from] std::io::Error),
    #[error("'{0}' is not a whole number of kWh")]
    NotAnInteger(String),
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("expected 12 monthly values but got {0}")]
    WrongMonthCount(usize),
    #[error("no input was provided")]
    EndOfInput,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum CalculationError {
    #[error("payback period is undefined when total annual savings are {0} (must be positive)")]
    NonPositiveSavings(i64),
    #[error("{0} is too large to calculate; check the roof area and rates")]
    Overflow(&'static str),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("monthly production series is unavailable, so the monthly table cannot be filled")]
    MonthlySeriesUnavailable,
    #[error("template '{name}' could not be loaded: {source}")]
    TemplateUnavailable {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Document(#[from] DocumentError),
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum DocumentError {
    #[error("table starting at line {line} has no delimiter row")]
    MissingDelimiterRow { line: usize },
    #[error("document has no table at index {0}")]
    NoSuchTable(usize),
    #[error("table has no cell at row {row}, column {column}")]
    NoSuchCell { row: usize, column: usize },
    #[error("table needs at least {rows} rows and {columns} columns but has {actual_rows} rows and {actual_columns} columns")]
    TableTooSmall {
        rows: usize,
        columns: usize,
        actual_rows: usize,
        actual_columns: usize,
    },
}
