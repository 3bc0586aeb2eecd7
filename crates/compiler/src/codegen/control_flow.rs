//! Control flow lowering.
//!
//! Conditionals and loops split the current block into fresh labeled
//! blocks. Conditions are compared non-zero to form the branch predicate.
//! Loop entry saves the enclosing loop's break/continue targets in a local
//! and restores them on exit, so nesting behaves as a stack.

use super::state::{LoopTargets, Slot};
use super::types::llvm_type;
use super::{CodeGen, CodeGenError};
use crate::ast::{Expr, Stmt, Type};
use std::fmt::Write as _;

impl CodeGen {
    /// Lower a condition expression and compare it against zero, returning
    /// the i1 predicate temporary.
    fn lower_condition(&mut self, cond: &Expr) -> Result<String, CodeGenError> {
        let value = self.lower_expr(cond)?;
        let flag = self.fresh_temp();
        writeln!(self.out(), "  %{} = icmp ne i32 {}, 0", flag, value.repr)?;
        Ok(flag)
    }

    /// `if`: branch to a then or else block, each falling through to the
    /// after block unless the arm already terminated. A missing `else` still
    /// gets its block, holding only the fall-through branch.
    pub(super) fn lower_if(
        &mut self,
        cond: &Expr,
        then_body: &[Stmt],
        else_body: Option<&[Stmt]>,
    ) -> Result<bool, CodeGenError> {
        let flag = self.lower_condition(cond)?;
        let then_block = self.fresh_block("if");
        let else_block = self.fresh_block("else");
        let after_block = self.fresh_block("if_after");
        writeln!(
            self.out(),
            "  br i1 %{}, label %{}, label %{}",
            flag, then_block, else_block
        )?;

        writeln!(self.out(), "{}:", then_block)?;
        if !self.lower_statements(then_body)? {
            writeln!(self.out(), "  br label %{}", after_block)?;
        }

        writeln!(self.out(), "{}:", else_block)?;
        let else_terminated = match else_body {
            Some(body) => self.lower_statements(body)?,
            None => false,
        };
        if !else_terminated {
            writeln!(self.out(), "  br label %{}", after_block)?;
        }

        writeln!(self.out(), "{}:", after_block)?;
        Ok(false)
    }

    /// `while`: re-evaluate the condition in its own block each iteration;
    /// `break` jumps past the loop, `continue` back to the condition check.
    pub(super) fn lower_while(&mut self, cond: &Expr, body: &[Stmt]) -> Result<bool, CodeGenError> {
        let cond_block = self.fresh_block("while_condcheck");
        let body_block = self.fresh_block("while_body");
        let after_block = self.fresh_block("while_after");

        let saved = self.loop_targets.replace(LoopTargets {
            break_to: after_block.clone(),
            continue_to: cond_block.clone(),
        });

        writeln!(self.out(), "  br label %{}", cond_block)?;
        writeln!(self.out(), "{}:", cond_block)?;
        let flag = self.lower_condition(cond)?;
        writeln!(
            self.out(),
            "  br i1 %{}, label %{}, label %{}",
            flag, body_block, after_block
        )?;

        writeln!(self.out(), "{}:", body_block)?;
        if !self.lower_statements(body)? {
            writeln!(self.out(), "  br label %{}", cond_block)?;
        }

        writeln!(self.out(), "{}:", after_block)?;
        self.loop_targets = saved;
        Ok(false)
    }

    /// `for`: a fresh slot for the induction variable shadows any existing
    /// binding of that name and the old binding is restored on exit. The
    /// condition block compares `var <= end` (or `>=` counting down) and the
    /// step block adds the signed step; `continue` targets the step block.
    pub(super) fn lower_for(
        &mut self,
        var: &str,
        start: &Expr,
        end: &Expr,
        ascending: bool,
        body: &[Stmt],
    ) -> Result<bool, CodeGenError> {
        let header_block = self.fresh_block("for_header");
        writeln!(self.out(), "  br label %{}", header_block)?;
        writeln!(self.out(), "{}:", header_block)?;

        let shadowed = self.named_vars.get(var).cloned();
        let slot = self.fresh_temp();
        writeln!(self.out(), "  %{} = alloca i32", slot)?;
        self.named_vars.insert(
            var.to_string(),
            Slot {
                ptr: format!("%{}", slot),
                ty: Type::Integer,
            },
        );
        let start_value = self.lower_expr(start)?;
        writeln!(
            self.out(),
            "  store i32 {}, ptr %{}",
            start_value.repr, slot
        )?;

        let cond_block = self.fresh_block("for_condcheck");
        let body_block = self.fresh_block("for_body");
        let next_block = self.fresh_block("for_nextvar");
        let after_block = self.fresh_block("for_after");

        writeln!(self.out(), "  br label %{}", cond_block)?;
        writeln!(self.out(), "{}:", cond_block)?;
        let current = self.fresh_temp();
        writeln!(self.out(), "  %{} = load i32, ptr %{}", current, slot)?;
        let end_value = self.lower_expr(end)?;
        let cc = if ascending { "sle" } else { "sge" };
        let compared = self.fresh_temp();
        writeln!(
            self.out(),
            "  %{} = icmp {} i32 %{}, {}",
            compared, cc, current, end_value.repr
        )?;
        let widened = self.fresh_temp();
        writeln!(self.out(), "  %{} = zext i1 %{} to i32", widened, compared)?;
        let flag = self.fresh_temp();
        writeln!(self.out(), "  %{} = icmp ne i32 %{}, 0", flag, widened)?;
        writeln!(
            self.out(),
            "  br i1 %{}, label %{}, label %{}",
            flag, body_block, after_block
        )?;

        let saved = self.loop_targets.replace(LoopTargets {
            break_to: after_block.clone(),
            continue_to: next_block.clone(),
        });

        writeln!(self.out(), "{}:", body_block)?;
        if !self.lower_statements(body)? {
            writeln!(self.out(), "  br label %{}", next_block)?;
        }

        writeln!(self.out(), "{}:", next_block)?;
        let step = if ascending { 1 } else { -1 };
        let old = self.fresh_temp();
        writeln!(self.out(), "  %{} = load i32, ptr %{}", old, slot)?;
        let stepped = self.fresh_temp();
        writeln!(self.out(), "  %{} = add i32 %{}, {}", stepped, old, step)?;
        writeln!(self.out(), "  store i32 %{}, ptr %{}", stepped, slot)?;
        writeln!(self.out(), "  br label %{}", cond_block)?;

        writeln!(self.out(), "{}:", after_block)?;

        // restore the shadowed binding, invisible outside the loop
        match shadowed {
            Some(old_slot) => {
                self.named_vars.insert(var.to_string(), old_slot);
            }
            None => {
                self.named_vars.remove(var);
            }
        }
        self.loop_targets = saved;
        Ok(false)
    }

    /// `exit`: return the current return-slot value, or void in a
    /// procedure.
    pub(super) fn lower_exit(&mut self) -> Result<bool, CodeGenError> {
        let idx = self
            .current
            .expect("exit lowered outside a function body");
        let name = self.functions[idx].name.clone();
        match self.functions[idx].ret.clone() {
            Some(_) => {
                let slot = self
                    .named_vars
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| CodeGenError::UnknownVar(name.clone()))?;
                let ty_text = llvm_type(&slot.ty);
                let value = self.fresh_temp();
                writeln!(
                    self.out(),
                    "  %{} = load {}, ptr {}",
                    value, ty_text, slot.ptr
                )?;
                writeln!(self.out(), "  ret {} %{}", ty_text, value)?;
            }
            None => writeln!(self.out(), "  ret void")?,
        }
        Ok(true)
    }

    pub(super) fn lower_break(&mut self) -> Result<bool, CodeGenError> {
        let targets = self
            .loop_targets
            .clone()
            .ok_or_else(|| CodeGenError::Logic("'break' used outside of a loop".to_string()))?;
        writeln!(self.out(), "  br label %{}", targets.break_to)?;
        Ok(true)
    }

    pub(super) fn lower_continue(&mut self) -> Result<bool, CodeGenError> {
        let targets = self
            .loop_targets
            .clone()
            .ok_or_else(|| CodeGenError::Logic("'continue' used outside of a loop".to_string()))?;
        writeln!(self.out(), "  br label %{}", targets.continue_to)?;
        Ok(true)
    }
}
