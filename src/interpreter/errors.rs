use thiserror::Error;

/// Failure while running scratchpad code. The `Display` text is what the
/// agent sees after the `ERROR: ` prefix.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecError {
    #[error("no code to execute")]
    Empty,

    /// The code did not compile; carries the compiler's message.
    #[error("{0}")]
    Syntax(String),

    /// An exception escaped the code; carries `str(exception)`.
    #[error("{0}")]
    Python(String),

    #[error("{0}")]
    LimitExceeded(String),

    #[error("execution timed out after {0} ms")]
    Timeout(u64),

    #[error("interpreter failed: {0}")]
    Worker(String),
}
