//! Statement lowering.
//!
//! [`CodeGen::lower_statement`] returns whether the statement emitted its
//! own block terminator (`exit`, `break`, `continue`). Callers use that to
//! suppress the fall-through branch a terminated block must not receive,
//! and a statement list stops lowering at the first terminator.

use super::state::Slot;
use super::types::{check_bounds, llvm_type, zero_initializer};
use super::{CodeGen, CodeGenError};
use crate::ast::{ConstDecl, Expr, LValue, Stmt, Type, VarDecl};
use std::fmt::Write as _;

impl CodeGen {
    pub(super) fn lower_statement(&mut self, stmt: &Stmt) -> Result<bool, CodeGenError> {
        match stmt {
            Stmt::Block(stmts) => self.lower_statements(stmts),
            Stmt::Var(decl) => {
                self.lower_var_decl(decl)?;
                Ok(false)
            }
            Stmt::Const(decl) => {
                self.lower_const_decl(decl);
                Ok(false)
            }
            Stmt::Assign { target, value } => {
                self.lower_assign(target, value)?;
                Ok(false)
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => self.lower_if(cond, then_body, else_body.as_deref()),
            Stmt::While { cond, body } => self.lower_while(cond, body),
            Stmt::For {
                var,
                start,
                end,
                ascending,
                body,
            } => self.lower_for(var, start, end, *ascending, body),
            Stmt::Exit => self.lower_exit(),
            Stmt::Break => self.lower_break(),
            Stmt::Continue => self.lower_continue(),
            Stmt::Call { name, args } => {
                self.lower_call(name, args)?;
                Ok(false)
            }
            Stmt::Program | Stmt::Routine(_) => Err(CodeGenError::Logic(
                "declaration is only valid at the top level".to_string(),
            )),
        }
    }

    /// Lower a statement list in order, stopping after the first statement
    /// that terminates the block (anything after it is unreachable).
    pub(super) fn lower_statements(&mut self, stmts: &[Stmt]) -> Result<bool, CodeGenError> {
        for stmt in stmts {
            if self.lower_statement(stmt)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn lower_assign(&mut self, target: &LValue, value: &Expr) -> Result<(), CodeGenError> {
        let value = self.lower_expr(value)?;
        let (ptr, _) = self.lvalue_address(target)?;
        writeln!(self.out(), "  store {} {}, ptr {}", value.ty, value.repr, ptr)?;
        Ok(())
    }

    /// Install a variable: globals become module-level common-linkage
    /// symbols with an explicit zero initializer, locals a stack slot in the
    /// enclosing function. Array names also record their index bounds.
    pub(super) fn lower_var_decl(&mut self, decl: &VarDecl) -> Result<(), CodeGenError> {
        check_bounds(&decl.ty)?;
        let ty_text = llvm_type(&decl.ty);
        let ptr = if decl.global {
            writeln!(
                &mut self.globals,
                "@{} = common global {} {}",
                decl.name,
                ty_text,
                zero_initializer(&decl.ty)
            )?;
            format!("@{}", decl.name)
        } else {
            let slot = self.fresh_temp();
            writeln!(self.out(), "  %{} = alloca {}", slot, ty_text)?;
            format!("%{}", slot)
        };
        self.named_vars.insert(
            decl.name.clone(),
            Slot {
                ptr,
                ty: decl.ty.clone(),
            },
        );
        if let Type::Array { lo, hi, .. } = decl.ty {
            self.array_bounds.insert(decl.name.clone(), (lo, hi));
        }
        Ok(())
    }

    /// Constants bypass memory entirely; the name just maps to its value.
    pub(super) fn lower_const_decl(&mut self, decl: &ConstDecl) {
        self.named_consts.insert(decl.name.clone(), decl.value);
    }
}
