//! Errors raised by the recipe engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CraftError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CraftError {
    /// Malformed recipe row found while building a book.
    /// `row` is the zero-based position in the input sequence.
    #[error("bad recipe data in row {row}: {message}")]
    Data { row: usize, message: String },

    /// Requested amount or inventory quantity is unusable
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("recipe cycle detected: {}", .path.join(" -> "))]
    CycleDetected { path: Vec<String> },

    #[error("maximum recipe depth {limit} exceeded at '{item}'")]
    DepthExceeded { item: String, limit: usize },
}
