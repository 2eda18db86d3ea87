// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Every failure the evaluation pipeline can surface on purpose.
// Application code wraps these in anyhow with extra context;
// the evaluator matches on ResourceExhausted to drive its
// split-batch retry policy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    /// Missing or invalid inputs, detected before any batch is scored
    #[error("configuration error: {0}")]
    Config(String),

    /// The tokenizer produced something the boundary policy cannot use
    #[error("tokenization error: {0}")]
    Tokenization(String),

    /// A forward pass would not fit the compute budget
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Every paired difference is exactly zero, so the signed-rank
    /// test has nothing to rank and no p-value exists
    #[error("no signal: all {0} paired differences are zero, significance cannot be computed")]
    NoSignal(usize),

    /// Finalize was called before any pair was recorded
    #[error("no pairs were evaluated")]
    EmptyEvaluation,

    /// The model returned an output the scorer cannot interpret
    #[error("model error: {0}")]
    Model(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EvalError {
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, EvalError::ResourceExhausted(_))
    }
}

pub type EvalResult<T> = std::result::Result<T, EvalError>;
