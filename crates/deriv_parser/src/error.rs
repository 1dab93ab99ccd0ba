use thiserror::Error;

/// Everything the parser can reject. One diagnostic line per round.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing operand")]
    MissingOperand,
    #[error("expected ')' for an unmatched '('")]
    UnclosedBracket,
    #[error("')' without a matching '('")]
    UnmatchedBracket,
    #[error("',' is not inside a '()'")]
    CommaOutsideBrackets,
    #[error("',' is only for functions")]
    CommaWithoutFunction,
    #[error("too many arguments")]
    TooManyArguments,
    #[error("function {name} expected {expected} arguments, found {found}")]
    WrongArity {
        name: &'static str,
        expected: usize,
        found: usize,
    },
}
