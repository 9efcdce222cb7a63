use thiserror::Error;

/// Per-record failures of the hourly breakdown.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BreakdownError {
    // malformed or missing timestamp/numeric field
    #[error("record {record}: cannot parse {field} from '{value}'")]
    Parse {
        record: String,
        field: &'static str,
        value: String,
    },
    // retained duration reached zero or below while hours still had to be prorated
    #[error("record {record}: retained duration is {total_duration}s, cannot prorate")]
    DivisionHazard { record: String, total_duration: i64 },
    #[error("record {record}: ends at {end} before it begins at {begin}")]
    ScheduleInconsistency {
        record: String,
        begin: String,
        end: String,
    },
}

impl BreakdownError {
    pub fn record_id(&self) -> &str {
        match self {
            BreakdownError::Parse { record, .. }
            | BreakdownError::DivisionHazard { record, .. }
            | BreakdownError::ScheduleInconsistency { record, .. } => record,
        }
    }
}

/// Failures while reading filings out of a quarter archive.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0} is not a ZIP archive")]
    NotAnArchive(String),
    #[error("ZIP error in {path}: {source}")]
    Zip {
        path: String,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}
