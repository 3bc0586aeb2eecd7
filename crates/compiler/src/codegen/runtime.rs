//! Runtime shim declarations.
//!
//! The emitted IR calls a tiny I/O runtime that is linked in later; the
//! compiler only declares the signatures, in one data-driven table so the
//! `declare` line and the signature the call lowering consults cannot
//! drift apart.

use super::state::{FuncSig, Param};
use super::{CodeGen, CodeGenError};
use crate::ast::Type;
use std::fmt::Write as _;

/// The runtime functions every program may reference: name, `declare` line,
/// and call-site signature.
pub(super) fn runtime_functions() -> Vec<(&'static str, &'static str, FuncSig)> {
    vec![
        (
            "write",
            "declare i32 @write(i32, ...)",
            FuncSig {
                params: vec![Param::Value(Type::Integer)],
                ret: Some(Type::Integer),
                variadic: true,
            },
        ),
        (
            "writeln",
            "declare i32 @writeln(i32, ...)",
            FuncSig {
                params: vec![Param::Value(Type::Integer)],
                ret: Some(Type::Integer),
                variadic: true,
            },
        ),
        (
            "printf",
            "declare i32 @printf(ptr, ptr, ...)",
            FuncSig {
                params: vec![Param::Pointer, Param::Pointer],
                ret: Some(Type::Integer),
                variadic: true,
            },
        ),
        (
            "readln",
            "declare i32 @readln(ptr)",
            FuncSig {
                params: vec![Param::Pointer],
                ret: Some(Type::Integer),
                variadic: false,
            },
        ),
    ]
}

impl CodeGen {
    /// Declare the runtime shims and install their signatures. Runs when the
    /// program marker lowers, before any user code.
    pub(super) fn declare_runtime(&mut self) -> Result<(), CodeGenError> {
        for (name, decl, sig) in runtime_functions() {
            writeln!(&mut self.decls, "{}", decl)?;
            self.signatures.insert(name.to_string(), sig);
        }
        Ok(())
    }
}
