//! Expression and l-value lowering.
//!
//! Expressions lower to an [`Operand`]: an SSA temporary or an immediate
//! constant plus its LLVM type. Number literals and named constants stay
//! immediates, so a constant reference never touches memory.

use super::state::Param;
use super::types::llvm_type;
use super::{CodeGen, CodeGenError};
use crate::ast::{BinOp, Expr, LValue, Type, UnOp};
use std::fmt::Write as _;

/// A lowered expression: operand text plus LLVM type text.
#[derive(Debug, Clone)]
pub(super) struct Operand {
    pub repr: String,
    pub ty: String,
}

impl Operand {
    fn int(repr: impl Into<String>) -> Self {
        Operand {
            repr: repr.into(),
            ty: "i32".to_string(),
        }
    }

    fn void() -> Self {
        Operand {
            repr: String::new(),
            ty: "void".to_string(),
        }
    }
}

impl CodeGen {
    pub(super) fn lower_expr(&mut self, expr: &Expr) -> Result<Operand, CodeGenError> {
        match expr {
            Expr::Number(value) => Ok(Operand::int(value.to_string())),
            Expr::Str(contents) => {
                let global = self.string_global(contents)?;
                Ok(Operand {
                    repr: global,
                    ty: "ptr".to_string(),
                })
            }
            Expr::Ref(lvalue) => self.lower_ref(lvalue),
            Expr::Call { name, args } => self.lower_call(name, args),
            Expr::Unary { op, expr } => self.lower_unary(*op, expr),
            Expr::Binary { op, lhs, rhs } => self.lower_binary(*op, lhs, rhs),
        }
    }

    /// Load a reference. A plain name resolves against the variable slots
    /// first; failing that it may be a constant, which yields the immediate
    /// value with no load.
    fn lower_ref(&mut self, lvalue: &LValue) -> Result<Operand, CodeGenError> {
        if let LValue::Var(name) = lvalue {
            if !self.named_vars.contains_key(name) {
                if let Some(&value) = self.named_consts.get(name) {
                    return Ok(Operand::int(value.to_string()));
                }
                return Err(CodeGenError::UnknownVar(name.clone()));
            }
        }
        let (ptr, ty) = self.lvalue_address(lvalue)?;
        let ty_text = llvm_type(&ty);
        let loaded = self.fresh_temp();
        writeln!(self.out(), "  %{} = load {}, ptr {}", loaded, ty_text, ptr)?;
        Ok(Operand {
            repr: format!("%{}", loaded),
            ty: ty_text,
        })
    }

    /// The address of an l-value, together with the pointee type.
    ///
    /// Index arithmetic subtracts the indexed array's declared lower bound
    /// and selects the element with a two-index GEP (leading zero steps
    /// through the array pointer itself). Nested indexing recurses with the
    /// inner element address as the next base.
    pub(super) fn lvalue_address(
        &mut self,
        lvalue: &LValue,
    ) -> Result<(String, Type), CodeGenError> {
        match lvalue {
            LValue::Var(name) => {
                let slot = self
                    .named_vars
                    .get(name)
                    .cloned()
                    .ok_or_else(|| CodeGenError::UnknownVar(name.clone()))?;
                Ok((slot.ptr, slot.ty))
            }
            LValue::Index { base, index } => {
                let (base_ptr, base_ty) = self.lvalue_address(base)?;
                let Type::Array { lo, elem, .. } = base_ty.clone() else {
                    return Err(CodeGenError::Logic(
                        "array index applied to a non-array value".to_string(),
                    ));
                };
                // Named arrays resolve their bound through the bounds map;
                // inner dimensions carry theirs on the element type.
                let lo = match base.as_ref() {
                    LValue::Var(name) => {
                        self.array_bounds.get(name).map(|b| b.0).unwrap_or(lo)
                    }
                    LValue::Index { .. } => lo,
                };
                let idx = self.lower_expr(index)?;
                let shifted = self.fresh_temp();
                writeln!(self.out(), "  %{} = sub i32 {}, {}", shifted, idx.repr, lo)?;
                let base_ty_text = llvm_type(&base_ty);
                let addr = self.fresh_temp();
                writeln!(
                    self.out(),
                    "  %{} = getelementptr {}, ptr {}, i32 0, i32 %{}",
                    addr, base_ty_text, base_ptr, shifted
                )?;
                Ok((format!("%{}", addr), *elem))
            }
        }
    }

    fn lower_unary(&mut self, op: UnOp, expr: &Expr) -> Result<Operand, CodeGenError> {
        let value = self.lower_expr(expr)?;
        let result = self.fresh_temp();
        match op {
            UnOp::Neg => writeln!(self.out(), "  %{} = sub i32 0, {}", result, value.repr)?,
            // booleans are integers; `not` is the bitwise complement
            UnOp::Not => writeln!(self.out(), "  %{} = xor i32 {}, -1", result, value.repr)?,
        }
        Ok(Operand::int(format!("%{}", result)))
    }

    fn lower_binary(
        &mut self,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
    ) -> Result<Operand, CodeGenError> {
        let left = self.lower_expr(lhs)?;
        let right = self.lower_expr(rhs)?;

        if let Some(cc) = comparison_condition(op) {
            // comparisons produce an i1, immediately widened back to i32
            let bit = self.fresh_temp();
            writeln!(
                self.out(),
                "  %{} = icmp {} i32 {}, {}",
                bit, cc, left.repr, right.repr
            )?;
            let widened = self.fresh_temp();
            writeln!(self.out(), "  %{} = zext i1 %{} to i32", widened, bit)?;
            return Ok(Operand::int(format!("%{}", widened)));
        }

        let instr = match op {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Div => "sdiv",
            BinOp::Mod => "srem",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                unreachable!("comparisons handled above")
            }
        };
        let result = self.fresh_temp();
        writeln!(
            self.out(),
            "  %{} = {} i32 {}, {}",
            result, instr, left.repr, right.repr
        )?;
        Ok(Operand::int(format!("%{}", result)))
    }

    /// Lower a call in either expression or statement position.
    ///
    /// `write`/`writeln` with a single argument and `dec` are intrinsics;
    /// everything else resolves through the signature table, checks arity,
    /// and passes each argument by reference exactly when the formal's
    /// backend type is a pointer.
    pub(super) fn lower_call(
        &mut self,
        name: &str,
        args: &[Expr],
    ) -> Result<Operand, CodeGenError> {
        if (name == "write" || name == "writeln") && args.len() == 1 {
            return self.lower_write(name, &args[0]);
        }
        if name == "dec" && !args.is_empty() {
            return self.lower_dec(&args[0]);
        }

        let sig = self
            .signatures
            .get(name)
            .cloned()
            .ok_or_else(|| CodeGenError::UnknownFunction(name.to_string()))?;
        if args.len() != sig.params.len() {
            return Err(CodeGenError::WrongArgCount {
                name: name.to_string(),
                got: args.len(),
                expected: sig.params.len(),
            });
        }

        let mut lowered = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(&sig.params) {
            match (param, arg) {
                (Param::Pointer, Expr::Ref(lvalue)) => {
                    let (ptr, _) = self.lvalue_address(lvalue)?;
                    lowered.push(format!("ptr {}", ptr));
                }
                _ => {
                    let value = self.lower_expr(arg)?;
                    lowered.push(format!("{} {}", value.ty, value.repr));
                }
            }
        }
        let arg_text = lowered.join(", ");

        let ret_text = sig
            .ret
            .as_ref()
            .map(|ty| llvm_type(ty))
            .unwrap_or_else(|| "void".to_string());
        // variadic callees need the full function type at the call site
        let callee_ty = if sig.variadic {
            let param_tys: Vec<String> = sig
                .params
                .iter()
                .map(|p| match p {
                    Param::Value(ty) => llvm_type(ty),
                    Param::Pointer => "ptr".to_string(),
                })
                .collect();
            format!("{} ({}, ...)", ret_text, param_tys.join(", "))
        } else {
            ret_text.clone()
        };

        if sig.ret.is_some() {
            let result = self.fresh_temp();
            writeln!(
                self.out(),
                "  %{} = call {} @{}({})",
                result, callee_ty, name, arg_text
            )?;
            Ok(Operand {
                repr: format!("%{}", result),
                ty: ret_text,
            })
        } else {
            writeln!(self.out(), "  call {} @{}({})", callee_ty, name, arg_text)?;
            Ok(Operand::void())
        }
    }

    /// `write(x)` / `writeln(x)`: an integer argument calls the runtime shim
    /// of the same name; a string literal goes through `printf` with the
    /// matching format global.
    fn lower_write(&mut self, name: &str, arg: &Expr) -> Result<Operand, CodeGenError> {
        if let Expr::Str(contents) = arg {
            let format = self.string_global(if name == "write" { "%s" } else { "%s\n" })?;
            let text = self.string_global(contents)?;
            let result = self.fresh_temp();
            writeln!(
                self.out(),
                "  %{} = call i32 (ptr, ptr, ...) @printf(ptr {}, ptr {})",
                result, format, text
            )?;
            return Ok(Operand::int(format!("%{}", result)));
        }

        let value = self.lower_expr(arg)?;
        if value.ty != "i32" {
            return Err(CodeGenError::Logic(format!(
                "{} expects an integer value or a string literal",
                name
            )));
        }
        let result = self.fresh_temp();
        writeln!(
            self.out(),
            "  %{} = call i32 (i32, ...) @{}(i32 {})",
            result, name, value.repr
        )?;
        Ok(Operand::int(format!("%{}", result)))
    }

    /// `dec(v)`: in-place decrement of an l-value; no call is emitted.
    fn lower_dec(&mut self, arg: &Expr) -> Result<Operand, CodeGenError> {
        let Expr::Ref(lvalue) = arg else {
            return Err(CodeGenError::Logic(
                "dec expects a variable or array element".to_string(),
            ));
        };
        let (ptr, ty) = self.lvalue_address(lvalue)?;
        let ty_text = llvm_type(&ty);
        let old = self.fresh_temp();
        writeln!(self.out(), "  %{} = load {}, ptr {}", old, ty_text, ptr)?;
        let new = self.fresh_temp();
        writeln!(self.out(), "  %{} = sub i32 %{}, 1", new, old)?;
        writeln!(self.out(), "  store i32 %{}, ptr {}", new, ptr)?;
        Ok(Operand::void())
    }
}

/// The icmp condition code for a comparison operator, `None` for arithmetic.
fn comparison_condition(op: BinOp) -> Option<&'static str> {
    match op {
        BinOp::Eq => Some("eq"),
        BinOp::Ne => Some("ne"),
        BinOp::Lt => Some("slt"),
        BinOp::Le => Some("sle"),
        BinOp::Gt => Some("sgt"),
        BinOp::Ge => Some("sge"),
        _ => None,
    }
}
