use std::fmt::{Display, Error as FmtError, Formatter};

#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),

    /// A `javap` listing could not be decoded (`line` is 1-based)
    MalformedListing { line: usize, message: String },

    /// A side-effect verdict file could not be decoded (`line` is 1-based)
    MalformedDatabase { line: usize, message: String },
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Error::IoError(err) => write!(f, "IO - {}", err),
            Error::MalformedListing { line, message } => {
                write!(f, "listing line {}: {}", line, message)
            }
            Error::MalformedDatabase { line, message } => {
                write!(f, "side-effect database line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for Error {}
