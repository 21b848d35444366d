//! Error taxonomy surfaced to the VFS layer as a single negative integer.

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("block device io error on sector {1}")]
    Io(i32, u32),

    #[error("invalid path: {1}")]
    InvalidPath(i32, String),

    #[error("not found: {1}")]
    NotFound(i32, String),

    #[error("already exists: {1}")]
    AlreadyExists(i32, String),

    #[error("not a file: {1}")]
    NotAFile(i32, String),

    #[error("out of space")]
    OutOfSpace(i32),

    #[error("permission denied on {1}")]
    Permission(i32, String),

    #[error("out of bounds: offset {1} len {2} exceeds end {3}")]
    OutOfBounds(i32, u64, u64, u64),

    #[error("unsupported operation: {1}")]
    Unsupported(i32, &'static str),
}

impl Error {
    pub fn io(sector: u32) -> Self {
        Error::Io(-5, sector)
    }

    pub fn invalid_path(path: impl Into<String>) -> Self {
        Error::InvalidPath(-22, path.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Error::NotFound(-2, path.into())
    }

    pub fn already_exists(path: impl Into<String>) -> Self {
        Error::AlreadyExists(-17, path.into())
    }

    pub fn not_a_file(path: impl Into<String>) -> Self {
        Error::NotAFile(-21, path.into())
    }

    pub fn out_of_space() -> Self {
        Error::OutOfSpace(-28)
    }

    pub fn permission(what: impl Into<String>) -> Self {
        Error::Permission(-13, what.into())
    }

    pub fn out_of_bounds(start: u64, len: u64, end: u64) -> Self {
        Error::OutOfBounds(-34, start, len, end)
    }

    pub fn unsupported(op: &'static str) -> Self {
        Error::Unsupported(-38, op)
    }

    /// The single negative integer this error is surfaced to the VFS layer as.
    pub fn error_code(&self) -> i32 {
        match self {
            Error::Io(code, _) => *code,
            Error::InvalidPath(code, _) => *code,
            Error::NotFound(code, _) => *code,
            Error::AlreadyExists(code, _) => *code,
            Error::NotAFile(code, _) => *code,
            Error::OutOfSpace(code) => *code,
            Error::Permission(code, _) => *code,
            Error::OutOfBounds(code, _, _, _) => *code,
            Error::Unsupported(code, _) => *code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_a_distinct_code() {
        let codes = [
            Error::io(0).error_code(),
            Error::invalid_path("").error_code(),
            Error::not_found("").error_code(),
            Error::already_exists("").error_code(),
            Error::not_a_file("").error_code(),
            Error::out_of_space().error_code(),
            Error::permission("").error_code(),
            Error::out_of_bounds(0, 0, 0).error_code(),
            Error::unsupported("").error_code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            for (j, b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "codes at {i} and {j} collide: {a}");
                }
            }
        }
    }

    #[test]
    fn invalid_path_is_not_confused_with_not_found() {
        assert_ne!(
            Error::invalid_path("/a/b/c/d/e/f/g").error_code(),
            Error::not_found("/missing").error_code()
        );
    }
}
