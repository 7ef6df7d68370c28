use thiserror::Error;

pub type Result<T> = std::result::Result<T, SolveError>;

/// Terminal failures of a solve call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("part {part_id} ({width}cm x {length}m) cannot be placed: {reason}")]
    UnplaceablePart {
        part_id: usize,
        width: f64,
        length: f64,
        reason: String,
    },

    #[error("no table could be built for the remaining {remaining} piece(s)")]
    NoSolution { remaining: u64 },

    #[error("iteration limit of {0} exceeded")]
    IterationLimitExceeded(usize),
}

impl SolveError {
    /// Whether the error was caused by the caller's input rather than the solver.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            SolveError::InvalidInput(_) | SolveError::UnplaceablePart { .. }
        )
    }
}
