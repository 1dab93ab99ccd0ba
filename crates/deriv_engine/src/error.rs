use thiserror::Error;

/// Runtime failures of the engine.
///
/// There is exactly one: a zero denominator met while building or combining
/// rational coefficients. It aborts the current derivation only; other
/// variables of the same round still produce output.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    #[error("Divided by 0")]
    DividedByZero,
}

pub type EngineResult<T> = Result<T, EngineError>;
