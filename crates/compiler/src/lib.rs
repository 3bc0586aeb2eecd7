//! Mila compiler library.
//!
//! Provides compilation from Mila source text to textual LLVM IR. The
//! pipeline is a hand-written scanner, an LL(1) recursive-descent parser
//! producing a tagged AST, and a lowering pass that emits basic blocks as
//! IR text:
//!
//! ```rust
//! let ir = milac::compile_to_ir("program empty; begin end.").unwrap();
//! assert!(ir.contains("define i32 @main()"));
//! ```

pub mod ast;
pub mod codegen;
pub mod config;
pub mod lexer;
pub mod parser;

pub use ast::Program;
pub use codegen::{CodeGen, CodeGenError, get_target_triple};
pub use config::CompilerConfig;
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{ParseError, Parser};

/// Compile Mila source text to LLVM IR text.
pub fn compile_to_ir(source: &str) -> Result<String, String> {
    compile_to_ir_with_config(source, &CompilerConfig::default())
}

/// Compile Mila source text to LLVM IR text with configuration overrides.
pub fn compile_to_ir_with_config(
    source: &str,
    config: &CompilerConfig,
) -> Result<String, String> {
    let mut parser = Parser::new(source);
    let program = parser.parse().map_err(|e| e.to_string())?;

    let mut codegen = CodeGen::new();
    if let Some(name) = &config.module_name {
        codegen.set_module_name(name);
    }
    if let Some(triple) = &config.target_triple {
        codegen.set_target_triple(triple);
    }
    codegen.codegen_program(&program).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_program() {
        let ir = compile_to_ir("program p; begin end.").unwrap();
        // runtime shims are declared even when nothing calls them
        assert!(ir.contains("declare i32 @write(i32, ...)"));
        assert!(ir.contains("declare i32 @writeln(i32, ...)"));
        assert!(ir.contains("declare i32 @printf(ptr, ptr, ...)"));
        assert!(ir.contains("declare i32 @readln(ptr)"));
        // main returns its zero-initialized result slot
        assert!(ir.contains("define i32 @main()"));
        assert!(ir.contains("store i32 0, ptr %t0"));
        assert!(ir.contains("%t1 = load i32, ptr %t0"));
        assert!(ir.contains("ret i32 %t1"));
        assert!(ir.contains("; ModuleID = 'p'"));
    }

    #[test]
    fn test_hex_and_octal_literals_materialize_as_constants() {
        let ir = compile_to_ir("program p; begin writeln($ff + &10) end.").unwrap();
        assert!(ir.contains("add i32 255, 8"));
        assert!(ir.contains("call i32 (i32, ...) @writeln(i32 %t1)"));
    }

    #[test]
    fn test_array_indexing_subtracts_lower_bound() {
        let ir = compile_to_ir(
            "program p;\n\
             var a: array [5..7] of integer;\n\
             begin a[6] := 42; writeln(a[6]) end.",
        )
        .unwrap();
        assert!(ir.contains("@a = common global [3 x i32] zeroinitializer"));
        assert!(ir.contains("%t1 = sub i32 6, 5"));
        assert!(ir.contains("%t2 = getelementptr [3 x i32], ptr @a, i32 0, i32 %t1"));
        assert!(ir.contains("store i32 42, ptr %t2"));
        // the load goes through the same shifted index computation
        assert!(ir.contains("%t3 = sub i32 6, 5"));
    }

    #[test]
    fn test_downto_loop_with_break() {
        let ir = compile_to_ir(
            "program p;\n\
             var i: integer;\n\
             begin\n\
             for i := 10 downto 1 do begin\n\
             if i = 5 then break;\n\
             writeln(i)\n\
             end\n\
             end.",
        )
        .unwrap();
        // counting down compares >= and steps by -1
        assert!(ir.contains("icmp sge i32"));
        assert!(ir.contains(", -1"));
        // break branches straight to the loop's after-block
        assert!(ir.contains("br label %for_after4"));
        assert!(ir.contains("for_after4:"));
    }

    #[test]
    fn test_for_loop_shadowing_is_restored() {
        let ir = compile_to_ir(
            "program p;\n\
             var i: integer;\n\
             begin\n\
             for i := 1 to 3 do begin end;\n\
             i := 99\n\
             end.",
        )
        .unwrap();
        // inside the loop the induction variable lives in a fresh slot,
        // afterwards the name resolves to the global again
        assert!(ir.contains("store i32 99, ptr @i"));
    }

    #[test]
    fn test_forward_declaration_defines_once() {
        let ir = compile_to_ir(
            "program p;\n\
             function f(n: integer): integer;\n\
             forward;\n\
             function f(n: integer): integer;\n\
             begin f := n + 1 end;\n\
             begin writeln(f(41)) end.",
        )
        .unwrap();
        assert_eq!(ir.matches("define i32 @f(i32 %n)").count(), 1);
        assert!(ir.contains("call i32 @f(i32 41)"));
    }

    #[test]
    fn test_dec_is_inline_not_a_call() {
        let ir = compile_to_ir(
            "program p;\n\
             procedure q();\n\
             var x: integer;\n\
             begin x := 5; dec(x) end;\n\
             begin q() end.",
        )
        .unwrap();
        assert!(ir.contains("define void @q()"));
        assert!(ir.contains("%t1 = load i32, ptr %t0"));
        assert!(ir.contains("%t2 = sub i32 %t1, 1"));
        assert!(ir.contains("store i32 %t2, ptr %t0"));
        assert!(ir.contains("call void @q()"));
        assert!(!ir.contains("@dec"));
    }

    #[test]
    fn test_constants_never_occupy_slots() {
        let ir = compile_to_ir("program p; const answer = 42; begin writeln(answer) end.").unwrap();
        assert!(ir.contains("call i32 (i32, ...) @writeln(i32 42)"));
        assert!(!ir.contains("@answer"));
    }

    #[test]
    fn test_while_break_and_continue_targets() {
        let ir = compile_to_ir(
            "program p;\n\
             var i: integer;\n\
             begin\n\
             while 1 do begin\n\
             if i = 0 then break\n\
             else continue\n\
             end\n\
             end.",
        )
        .unwrap();
        // break goes to the after-block, continue back to the cond check
        assert!(ir.contains("br label %while_after2"));
        assert!(ir.contains("br label %while_condcheck0"));
    }

    #[test]
    fn test_string_literals_go_through_printf() {
        let ir = compile_to_ir("program p; begin write('hi'); writeln('hi') end.").unwrap();
        assert!(ir.contains("c\"%s\\00\""));
        assert!(ir.contains("c\"%s\\0A\\00\""));
        assert!(ir.contains("c\"hi\\00\""));
        // the literal is deduplicated between the two calls
        assert!(ir.contains("@printf(ptr @.str.0, ptr @.str.1)"));
        assert!(ir.contains("@printf(ptr @.str.2, ptr @.str.1)"));
    }

    #[test]
    fn test_readln_passes_by_reference() {
        let ir =
            compile_to_ir("program p; var x: integer; begin readln(x) end.").unwrap();
        assert!(ir.contains("call i32 @readln(ptr @x)"));
    }

    #[test]
    fn test_not_is_bitwise_complement() {
        let ir = compile_to_ir("program p; begin writeln(not 1) end.").unwrap();
        assert!(ir.contains("xor i32 1, -1"));
    }

    #[test]
    fn test_comparison_widens_to_i32() {
        let ir = compile_to_ir("program p; begin writeln(1 < 2) end.").unwrap();
        assert!(ir.contains("icmp slt i32 1, 2"));
        assert!(ir.contains("zext i1 %t1 to i32"));
    }

    #[test]
    fn test_unknown_variable_is_reported() {
        let err = compile_to_ir("program p; begin x := 1 end.").unwrap_err();
        assert_eq!(err, "Unknown var: \"x\"");
    }

    #[test]
    fn test_unknown_function_is_reported() {
        let err = compile_to_ir("program p; begin foo(1) end.").unwrap_err();
        assert_eq!(err, "Call to unknown function \"foo\"");
    }

    #[test]
    fn test_wrong_arity_is_reported() {
        let err = compile_to_ir(
            "program p;\n\
             function f(a: integer): integer;\n\
             begin f := a end;\n\
             begin writeln(f(1, 2)) end.",
        )
        .unwrap_err();
        assert_eq!(
            err,
            "Call to function \"f\" with wrong number of parameters. Got 2 expected 1"
        );
    }

    #[test]
    fn test_break_outside_loop_is_reported() {
        let err = compile_to_ir("program p; begin break end.").unwrap_err();
        assert_eq!(err, "'break' used outside of a loop");
    }

    #[test]
    fn test_parse_error_propagates_through_the_pipeline() {
        let err = compile_to_ir("program p; begin x := end.").unwrap_err();
        assert!(err.starts_with("Unexpected token\nGot: \"end\""));
    }

    #[test]
    fn test_nested_array_indexing() {
        let ir = compile_to_ir(
            "program p;\n\
             var m: array [1..2] of array [0..9] of integer;\n\
             begin m[1][3] := 8 end.",
        )
        .unwrap();
        assert!(ir.contains("@m = common global [2 x [10 x i32]] zeroinitializer"));
        // first level shifts by the outer lower bound
        assert!(ir.contains("%t1 = sub i32 1, 1"));
        assert!(ir.contains("%t2 = getelementptr [2 x [10 x i32]], ptr @m, i32 0, i32 %t1"));
        // second level shifts by the element array's bound
        assert!(ir.contains("%t3 = sub i32 3, 0"));
        assert!(ir.contains("%t4 = getelementptr [10 x i32], ptr %t2, i32 0, i32 %t3"));
    }

    #[test]
    fn test_config_overrides_module_header() {
        let config = CompilerConfig {
            module_name: Some("demo".to_string()),
            target_triple: Some("x86_64-unknown-linux-gnu".to_string()),
        };
        let ir = compile_to_ir_with_config("program p; begin end.", &config).unwrap();
        assert!(ir.contains("; ModuleID = 'demo'"));
        assert!(ir.contains("target triple = \"x86_64-unknown-linux-gnu\""));
    }

    #[test]
    fn test_exit_in_procedure_returns_void() {
        let ir = compile_to_ir(
            "program p;\n\
             procedure q();\n\
             begin exit end;\n\
             begin q() end.",
        )
        .unwrap();
        assert!(ir.contains("define void @q()"));
        assert!(ir.contains("ret void"));
    }

    #[test]
    fn test_global_call_chain() {
        let ir = compile_to_ir(
            "program p;\n\
             var total: integer;\n\
             function add(a, b: integer): integer;\n\
             begin add := a + b end;\n\
             begin\n\
             total := add(2, 3);\n\
             writeln(total)\n\
             end.",
        )
        .unwrap();
        assert!(ir.contains("define i32 @add(i32 %a, i32 %b)"));
        assert!(ir.contains("call i32 @add(i32 2, i32 3)"));
        assert!(ir.contains("store i32 %t"));
        assert!(ir.contains("@total = common global i32 0"));
    }
}
