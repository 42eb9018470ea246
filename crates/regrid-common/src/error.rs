//! Error types for grid geometry.

use thiserror::Error;

/// Result type alias using GridError.
pub type GridResult<T> = Result<T, GridError>;

/// Errors raised while describing or querying a grid.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("{what} {value} is not within the grid area")]
    OutsideArea { what: &'static str, value: f64 },

    #[error("Invalid AREA format: {0}. Expected 'north/west/south/east'")]
    InvalidFormat(String),

    #[error("Invalid number in AREA: {0}")]
    InvalidNumber(String),
}

impl GridError {
    pub fn invalid_grid(msg: impl Into<String>) -> Self {
        Self::InvalidGrid(msg.into())
    }

    pub fn outside_area(what: &'static str, value: f64) -> Self {
        Self::OutsideArea { what, value }
    }
}
