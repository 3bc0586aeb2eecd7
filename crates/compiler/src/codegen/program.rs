//! Top-level traversal and module assembly.

use super::{CodeGen, CodeGenError};
use crate::ast::{Program, Stmt};
use std::fmt::Write as _;

/// Target triple for the current platform.
pub fn get_target_triple() -> &'static str {
    #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
    {
        "arm64-apple-macosx14.0.0"
    }

    #[cfg(all(target_os = "macos", target_arch = "x86_64"))]
    {
        "x86_64-apple-darwin"
    }

    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    {
        "x86_64-unknown-linux-gnu"
    }

    #[cfg(all(target_os = "linux", target_arch = "aarch64"))]
    {
        "aarch64-unknown-linux-gnu"
    }

    #[cfg(not(any(
        all(target_os = "macos", target_arch = "aarch64"),
        all(target_os = "macos", target_arch = "x86_64"),
        all(target_os = "linux", target_arch = "x86_64"),
        all(target_os = "linux", target_arch = "aarch64")
    )))]
    {
        "unknown"
    }
}

impl CodeGen {
    /// Lower every top-level declaration in source order, then assemble the
    /// final module text.
    pub fn codegen_program(&mut self, program: &Program) -> Result<String, CodeGenError> {
        if self.module_name.is_empty() {
            self.module_name = program.name.clone();
        }
        if self.target_triple.is_empty() {
            self.target_triple = get_target_triple().to_string();
        }

        for stmt in &program.statements {
            match stmt {
                Stmt::Program => self.declare_runtime()?,
                Stmt::Var(decl) => self.lower_var_decl(decl)?,
                Stmt::Const(decl) => self.lower_const_decl(decl),
                Stmt::Routine(routine) => self.lower_routine(routine)?,
                _ => {
                    return Err(CodeGenError::Logic(
                        "statement is only valid inside a routine body".to_string(),
                    ));
                }
            }
        }

        self.assemble()
    }

    /// Concatenate the module: header, globals, string constants, runtime
    /// declarations, then function definitions in creation order.
    fn assemble(&self) -> Result<String, CodeGenError> {
        let mut ir = String::new();
        writeln!(&mut ir, "; ModuleID = '{}'", self.module_name)?;
        writeln!(&mut ir, "source_filename = \"{}\"", self.module_name)?;
        writeln!(&mut ir, "target triple = \"{}\"", self.target_triple)?;
        writeln!(&mut ir)?;

        if !self.globals.is_empty() {
            ir.push_str(&self.globals);
            writeln!(&mut ir)?;
        }
        if !self.string_globals.is_empty() {
            ir.push_str(&self.string_globals);
            writeln!(&mut ir)?;
        }
        if !self.decls.is_empty() {
            ir.push_str(&self.decls);
            writeln!(&mut ir)?;
        }

        for function in &self.functions {
            writeln!(&mut ir, "{} {{", function.header)?;
            writeln!(&mut ir, "{}:", function.entry)?;
            ir.push_str(&function.code);
            writeln!(&mut ir, "}}")?;
            writeln!(&mut ir)?;
        }

        Ok(ir)
    }
}
