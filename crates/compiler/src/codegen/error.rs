//! Code generation error types.

use std::fmt;

/// Error type for the lowering pass.
///
/// Carries structured fields and formats lazily on display, so `?` works
/// uniformly for name-resolution failures, call-shape mismatches and
/// IR-write failures.
#[derive(Debug)]
pub enum CodeGenError {
    /// A name with no variable or constant binding.
    UnknownVar(String),
    /// A call to a function that was never declared.
    UnknownFunction(String),
    /// A call whose argument count differs from the declared arity.
    WrongArgCount {
        name: String,
        got: usize,
        expected: usize,
    },
    /// A structural error in the program being lowered.
    Logic(String),
    /// A formatting error while writing IR text.
    Format(fmt::Error),
}

impl fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeGenError::UnknownVar(name) => write!(f, "Unknown var: \"{}\"", name),
            CodeGenError::UnknownFunction(name) => {
                write!(f, "Call to unknown function \"{}\"", name)
            }
            CodeGenError::WrongArgCount {
                name,
                got,
                expected,
            } => write!(
                f,
                "Call to function \"{}\" with wrong number of parameters. Got {} expected {}",
                name, got, expected
            ),
            CodeGenError::Logic(message) => write!(f, "{}", message),
            CodeGenError::Format(e) => write!(f, "IR generation error: {}", e),
        }
    }
}

impl std::error::Error for CodeGenError {}

impl From<fmt::Error> for CodeGenError {
    fn from(e: fmt::Error) -> Self {
        CodeGenError::Format(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_var_message() {
        let err = CodeGenError::UnknownVar("x".to_string());
        assert_eq!(err.to_string(), "Unknown var: \"x\"");
    }

    #[test]
    fn test_wrong_arg_count_message() {
        let err = CodeGenError::WrongArgCount {
            name: "f".to_string(),
            got: 2,
            expected: 3,
        };
        assert_eq!(
            err.to_string(),
            "Call to function \"f\" with wrong number of parameters. Got 2 expected 3"
        );
    }

    #[test]
    fn test_unknown_function_message() {
        let err = CodeGenError::UnknownFunction("g".to_string());
        assert_eq!(err.to_string(), "Call to unknown function \"g\"");
    }
}
