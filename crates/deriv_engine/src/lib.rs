pub mod differentiate;
pub mod error;
pub mod helpers;
pub mod rational;
pub mod simplify;

#[cfg(test)]
mod property_tests;

pub use differentiate::differentiate;
pub use error::{EngineError, EngineResult};
pub use simplify::simplify;
