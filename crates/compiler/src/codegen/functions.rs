//! Function and procedure lowering.
//!
//! The first encounter of a name installs the signature and emits the
//! prologue (return slot, parameter spills, local allocas) into a fresh
//! per-function buffer; a forward declaration stops there. The defining
//! occurrence appends the body to the same buffer, so declarations may
//! intervene between the two. The entry block is named after the routine.

use super::state::{FuncSig, FunctionIr, Param, Slot};
use super::types::{check_bounds, llvm_type, zero_initializer};
use super::{CodeGen, CodeGenError};
use crate::ast::Routine;
use std::fmt::Write as _;

impl CodeGen {
    pub(super) fn lower_routine(&mut self, routine: &Routine) -> Result<(), CodeGenError> {
        if !self.function_index.contains_key(&routine.name) {
            self.init_routine(routine)?;
        }
        if let Some(body) = &routine.body {
            let idx = self.function_index[&routine.name];
            let saved = self.current.replace(idx);
            let terminated = self.lower_statements(body)?;
            if !terminated {
                // the implicit return: load the named return slot, or void
                self.lower_exit()?;
            }
            self.current = saved;
        }
        Ok(())
    }

    /// Install the signature and emit the prologue.
    ///
    /// Functions get a stack slot named after themselves holding the return
    /// value, zero-initialized on entry. Every formal parameter is spilled
    /// into a local slot so it is addressable like any variable.
    fn init_routine(&mut self, routine: &Routine) -> Result<(), CodeGenError> {
        let mut params = Vec::with_capacity(routine.params.len());
        for param in &routine.params {
            check_bounds(&param.ty)?;
            params.push(Param::Value(param.ty.clone()));
        }
        if let Some(ret) = &routine.ret {
            check_bounds(ret)?;
        }
        self.signatures.insert(
            routine.name.clone(),
            FuncSig {
                params,
                ret: routine.ret.clone(),
                variadic: false,
            },
        );

        let param_text: Vec<String> = routine
            .params
            .iter()
            .map(|p| format!("{} %{}", llvm_type(&p.ty), p.name))
            .collect();
        let ret_text = routine
            .ret
            .as_ref()
            .map(|ty| llvm_type(ty))
            .unwrap_or_else(|| "void".to_string());
        let header = format!(
            "define {} @{}({})",
            ret_text,
            routine.name,
            param_text.join(", ")
        );

        let idx = self.functions.len();
        self.functions.push(FunctionIr {
            name: routine.name.clone(),
            header,
            entry: routine.name.clone(),
            code: String::new(),
            ret: routine.ret.clone(),
        });
        self.function_index.insert(routine.name.clone(), idx);

        let saved = self.current.replace(idx);

        if let Some(ret) = routine.ret.clone() {
            let ret_ty_text = llvm_type(&ret);
            let init = zero_initializer(&ret);
            let slot = self.fresh_temp();
            writeln!(self.out(), "  %{} = alloca {}", slot, ret_ty_text)?;
            writeln!(self.out(), "  store {} {}, ptr %{}", ret_ty_text, init, slot)?;
            self.named_vars.insert(
                routine.name.clone(),
                Slot {
                    ptr: format!("%{}", slot),
                    ty: ret,
                },
            );
        }

        for param in &routine.params {
            self.lower_var_decl(param)?;
            let slot = self.named_vars[&param.name].ptr.clone();
            let ty_text = llvm_type(&param.ty);
            writeln!(
                self.out(),
                "  store {} %{}, ptr {}",
                ty_text, param.name, slot
            )?;
        }
        for local in &routine.locals {
            self.lower_var_decl(local)?;
        }

        self.current = saved;
        Ok(())
    }
}
