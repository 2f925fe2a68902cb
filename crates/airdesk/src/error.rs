//! Error types for airdesk.
//!
//! Every failure the record store can report is a variant of [`Error`]. Storage
//! failures are unrecoverable for the current operation; everything else is a
//! domain outcome that the presentation layer displays and moves on from.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for airdesk operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// A table file could not be opened, read or written.
    #[error("storage unavailable at {path}: {source}")]
    StorageUnavailable {
        /// Path to the table file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A table file exists but its contents cannot be decoded.
    #[error("malformed table {path}{}: {message}", at_line(.line))]
    MalformedTable {
        /// Path to the table file.
        path: PathBuf,
        /// Line number of the offending row, when known.
        line: Option<u64>,
        /// Description of what went wrong.
        message: String,
    },

    /// Failed to create the data directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Record Errors ===
    /// No record with the given key exists.
    #[error("{entity} '{key}' not found")]
    NotFound {
        /// Kind of record looked up.
        entity: &'static str,
        /// The key that was not found.
        key: String,
    },

    /// A record with the same primary key already exists.
    #[error("{entity} '{key}' already exists")]
    AlreadyExists {
        /// Kind of record inserted.
        entity: &'static str,
        /// The conflicting key.
        key: String,
    },

    /// A field supplied by the caller is empty or malformed.
    #[error("invalid {field}: {message}")]
    InvalidInput {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the problem.
        message: String,
    },

    // === Booking Errors ===
    /// The user already holds a reservation on this flight.
    #[error("'{username}' has already reserved flight '{flight_id}'")]
    AlreadyReserved {
        /// The passenger.
        username: String,
        /// The flight.
        flight_id: String,
    },

    /// The flight to reserve does not exist.
    #[error("flight '{0}' not found")]
    FlightNotFound(String),

    /// Every seat on the flight is taken.
    #[error("flight '{flight_id}' is full ({capacity} seats)")]
    FlightFull {
        /// The flight.
        flight_id: String,
        /// Its capacity.
        capacity: u32,
    },

    /// The stored capacity of a flight is not a non-negative integer.
    #[error("flight '{flight_id}' has invalid capacity '{value}'")]
    InvalidCapacity {
        /// The flight.
        flight_id: String,
        /// The raw stored value.
        value: String,
    },

    /// The target of an administrator booking is not a registered user.
    #[error("no registered user named '{0}'")]
    UnknownUser(String),

    /// A flight search was issued without any criteria.
    #[error("at least one search criterion (origin, destination or date) is required")]
    NoCriteria,

    /// Username and password do not match a registered user.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The session's role does not allow the operation.
    #[error("not permitted: {action} requires an administrator")]
    NotPermitted {
        /// The attempted operation.
        action: &'static str,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Serialization Errors ===
    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn at_line(line: &Option<u64>) -> String {
    line.map(|l| format!(" (line {l})")).unwrap_or_default()
}

/// A specialized Result type for airdesk operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a storage error for the given table path.
    #[must_use]
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageUnavailable {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }

    /// Convert a `csv` error raised while touching `path`.
    ///
    /// I/O failures become [`Error::StorageUnavailable`]; anything else means
    /// the file content itself is bad.
    pub(crate) fn from_csv(path: impl Into<PathBuf>, err: csv::Error) -> Self {
        let path = path.into();
        let line = err.position().map(csv::Position::line);
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(source) => Self::StorageUnavailable { path, source },
            _ => Self::MalformedTable {
                path,
                line,
                message,
            },
        }
    }

    /// Check if this error is an unrecoverable storage failure.
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable { .. }
                | Self::MalformedTable { .. }
                | Self::DirectoryCreate { .. }
        )
    }

    /// Stable machine-readable name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StorageUnavailable { .. } | Self::DirectoryCreate { .. } => "storage_unavailable",
            Self::MalformedTable { .. } => "malformed_table",
            Self::NotFound { .. } => "not_found",
            Self::AlreadyExists { .. } => "already_exists",
            Self::InvalidInput { .. } => "invalid_input",
            Self::AlreadyReserved { .. } => "already_reserved",
            Self::FlightNotFound(_) => "flight_not_found",
            Self::FlightFull { .. } => "flight_full",
            Self::InvalidCapacity { .. } => "invalid_capacity",
            Self::UnknownUser(_) => "unknown_user",
            Self::NoCriteria => "no_criteria",
            Self::InvalidCredentials => "invalid_credentials",
            Self::NotPermitted { .. } => "not_permitted",
            Self::ConfigLoad(_) | Self::ConfigValidation { .. } => "config",
            Self::Json(_) => "json",
        }
    }
}
