//! Definition of errors.

use std::error::Error;
use std::fmt;

pub type Result<T, E = MirepoixError> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum MirepoixError {
    InvalidModel(InvalidModelError),
    InvalidArgument(InvalidArgumentError),
    DataIntegrity(DataIntegrityError),
    DecodeError(bincode::error::DecodeError),
    EncodeError(bincode::error::EncodeError),
    CsvError(csv::Error),
    JsonError(serde_json::Error),
    IOError(std::io::Error),
}

impl MirepoixError {
    pub(crate) fn invalid_model<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidModel(InvalidModelError { msg: msg.into() })
    }

    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }

    pub(crate) fn data_integrity<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::DataIntegrity(DataIntegrityError { msg: msg.into() })
    }
}

impl fmt::Display for MirepoixError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidModel(e) => e.fmt(f),
            Self::InvalidArgument(e) => e.fmt(f),
            Self::DataIntegrity(e) => e.fmt(f),
            Self::DecodeError(e) => e.fmt(f),
            Self::EncodeError(e) => e.fmt(f),
            Self::CsvError(e) => e.fmt(f),
            Self::JsonError(e) => e.fmt(f),
            Self::IOError(e) => e.fmt(f),
        }
    }
}

impl Error for MirepoixError {}

/// Error used when the model is invalid.
#[derive(Debug)]
pub struct InvalidModelError {
    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidModelError: {}", self.msg)
    }
}

impl Error for InvalidModelError {}

/// Error used when the argument is invalid.
#[derive(Debug)]
pub struct InvalidArgumentError {
    /// Name of the argument.
    pub(crate) arg: &'static str,

    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidArgumentError {}

/// Error used when training data is internally inconsistent.
#[derive(Debug)]
pub struct DataIntegrityError {
    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for DataIntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DataIntegrityError: {}", self.msg)
    }
}

impl Error for DataIntegrityError {}

impl From<bincode::error::DecodeError> for MirepoixError {
    fn from(error: bincode::error::DecodeError) -> Self {
        Self::DecodeError(error)
    }
}

impl From<bincode::error::EncodeError> for MirepoixError {
    fn from(error: bincode::error::EncodeError) -> Self {
        Self::EncodeError(error)
    }
}

impl From<csv::Error> for MirepoixError {
    fn from(error: csv::Error) -> Self {
        Self::CsvError(error)
    }
}

impl From<serde_json::Error> for MirepoixError {
    fn from(error: serde_json::Error) -> Self {
        Self::JsonError(error)
    }
}

impl From<std::io::Error> for MirepoixError {
    fn from(error: std::io::Error) -> Self {
        Self::IOError(error)
    }
}
