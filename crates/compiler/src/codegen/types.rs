//! LLVM type text for Mila type descriptors.

use super::CodeGenError;
use crate::ast::Type;

/// Render a type descriptor as LLVM type text.
pub(super) fn llvm_type(ty: &Type) -> String {
    match ty {
        Type::Integer => "i32".to_string(),
        Type::Array { elem, .. } => {
            format!("[{} x {}]", ty.length().unwrap_or(0), llvm_type(elem))
        }
    }
}

/// The default-initializer constant for a type: integers are zero, arrays
/// are zero-filled element-wise.
pub(super) fn zero_initializer(ty: &Type) -> &'static str {
    match ty {
        Type::Integer => "0",
        Type::Array { .. } => "zeroinitializer",
    }
}

/// Declared index ranges must satisfy `lo <= hi` at every nesting level.
pub(super) fn check_bounds(ty: &Type) -> Result<(), CodeGenError> {
    match ty {
        Type::Integer => Ok(()),
        Type::Array { lo, hi, elem } => {
            if lo > hi {
                return Err(CodeGenError::Logic(format!(
                    "array bounds [{}..{}] are reversed",
                    lo, hi
                )));
            }
            check_bounds(elem)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_type_text() {
        assert_eq!(llvm_type(&Type::Integer), "i32");
        assert_eq!(zero_initializer(&Type::Integer), "0");
    }

    #[test]
    fn test_nested_array_type_text() {
        let ty = Type::Array {
            lo: 1,
            hi: 2,
            elem: Box::new(Type::Array {
                lo: 0,
                hi: 9,
                elem: Box::new(Type::Integer),
            }),
        };
        assert_eq!(llvm_type(&ty), "[2 x [10 x i32]]");
        assert_eq!(zero_initializer(&ty), "zeroinitializer");
    }

    #[test]
    fn test_reversed_bounds_are_rejected() {
        let ty = Type::Array {
            lo: 7,
            hi: 5,
            elem: Box::new(Type::Integer),
        };
        assert!(check_bounds(&ty).is_err());
        assert!(check_bounds(&Type::Integer).is_ok());
    }
}
