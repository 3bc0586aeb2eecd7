//! Recursive-descent parser for Mila.
//!
//! Pure LL(1): one token of lookahead, no backtracking. Each grammar
//! nonterminal is a method that inspects the current token, selects a
//! production, consumes terminals through [`Parser::expect`] and recurses.
//! The first mismatch aborts the parse with the set of tokens that would
//! have been acceptable.

use crate::ast::{
    BinOp, ConstDecl, Expr, LValue, Program, Routine, Stmt, Type, UnOp, VarDecl,
};
use crate::lexer::{Lexer, Token, TokenKind};
use std::fmt;

/// A token mismatch: what the scanner produced and what the active
/// production would have accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub got: TokenKind,
    pub expected: Vec<TokenKind>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unexpected token\nGot: \"{}\"\nExpected: ", self.got.name())?;
        for (i, kind) in self.expected.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "\"{}\"", kind.name())?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    cur: Token,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let cur = lexer.next_token();
        Parser { lexer, cur }
    }

    /// Parse a complete program: `program Name;` followed by declarations
    /// and the main `begin ... end.` block.
    pub fn parse(&mut self) -> Result<Program, ParseError> {
        self.expect(TokenKind::Program)?;
        let name = self.expect(TokenKind::Identifier)?.text;
        self.expect(TokenKind::Semicolon)?;

        let mut statements = vec![Stmt::Program];
        self.parse_decls(&mut statements)?;
        Ok(Program { name, statements })
    }

    fn advance(&mut self) {
        self.cur = self.lexer.next_token();
    }

    /// Consume the current token if it has the expected kind, returning it;
    /// raise otherwise.
    fn expect(&mut self, expected: TokenKind) -> Result<Token, ParseError> {
        if self.cur.kind != expected {
            return Err(self.unexpected(vec![expected]));
        }
        let next = self.lexer.next_token();
        Ok(std::mem::replace(&mut self.cur, next))
    }

    fn unexpected(&self, expected: Vec<TokenKind>) -> ParseError {
        ParseError {
            got: self.cur.kind,
            expected,
        }
    }

    // Top-level declarations, in any order and number, ending with the main
    // block.
    fn parse_decls(&mut self, out: &mut Vec<Stmt>) -> Result<(), ParseError> {
        loop {
            match self.cur.kind {
                TokenKind::Var => {
                    self.advance();
                    let mut vars = Vec::new();
                    self.parse_var_decls(&mut vars, true)?;
                    out.extend(vars.into_iter().map(Stmt::Var));
                }
                TokenKind::Const => {
                    self.advance();
                    self.parse_const_decls(out)?;
                }
                TokenKind::Function => {
                    let routine = self.parse_function()?;
                    out.push(Stmt::Routine(routine));
                }
                TokenKind::Procedure => {
                    let routine = self.parse_procedure()?;
                    out.push(Stmt::Routine(routine));
                }
                TokenKind::Begin => {
                    let body = self.parse_block()?;
                    self.expect(TokenKind::Dot)?;
                    out.push(Stmt::Routine(Routine {
                        name: "main".to_string(),
                        params: vec![],
                        ret: Some(Type::Integer),
                        locals: vec![],
                        body: Some(body),
                    }));
                    return Ok(());
                }
                _ => {
                    return Err(self.unexpected(vec![
                        TokenKind::Var,
                        TokenKind::Begin,
                        TokenKind::Function,
                        TokenKind::Procedure,
                        TokenKind::Const,
                    ]));
                }
            }
        }
    }

    // One or more `name, name, ...: type;` groups.
    fn parse_var_decls(&mut self, out: &mut Vec<VarDecl>, global: bool) -> Result<(), ParseError> {
        loop {
            let names = self.parse_ident_list()?;
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            for name in names {
                out.push(VarDecl {
                    name,
                    ty: ty.clone(),
                    global,
                });
            }
            self.expect(TokenKind::Semicolon)?;
            if self.cur.kind != TokenKind::Identifier {
                return Ok(());
            }
        }
    }

    fn parse_ident_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut names = vec![self.expect(TokenKind::Identifier)?.text];
        while self.cur.kind == TokenKind::Comma {
            self.advance();
            names.push(self.expect(TokenKind::Identifier)?.text);
        }
        Ok(names)
    }

    // One or more `name = number;` entries.
    fn parse_const_decls(&mut self, out: &mut Vec<Stmt>) -> Result<(), ParseError> {
        loop {
            let name = self.expect(TokenKind::Identifier)?.text;
            self.expect(TokenKind::Equal)?;
            let value = self.expect(TokenKind::Number)?.value;
            self.expect(TokenKind::Semicolon)?;
            out.push(Stmt::Const(ConstDecl { name, value }));
            if self.cur.kind != TokenKind::Identifier {
                return Ok(());
            }
        }
    }

    fn parse_function(&mut self) -> Result<Routine, ParseError> {
        self.expect(TokenKind::Function)?;
        let name = self.expect(TokenKind::Identifier)?.text;
        self.expect(TokenKind::LeftParen)?;
        let params = self.parse_param_decls()?;
        self.expect(TokenKind::RightParen)?;
        self.expect(TokenKind::Colon)?;
        let ret = self.parse_type()?;
        self.expect(TokenKind::Semicolon)?;
        let locals = self.parse_local_vars()?;
        let body = self.parse_body_or_forward()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Routine {
            name,
            params,
            ret: Some(ret),
            locals,
            body,
        })
    }

    fn parse_procedure(&mut self) -> Result<Routine, ParseError> {
        self.expect(TokenKind::Procedure)?;
        let name = self.expect(TokenKind::Identifier)?.text;
        self.expect(TokenKind::LeftParen)?;
        let params = self.parse_param_decls()?;
        self.expect(TokenKind::RightParen)?;
        self.expect(TokenKind::Semicolon)?;
        let locals = self.parse_local_vars()?;
        let body = self.parse_body_or_forward()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Routine {
            name,
            params,
            ret: None,
            locals,
            body,
        })
    }

    // Semicolon-separated groups of comma-separated names with a shared
    // type. The list may be empty.
    fn parse_param_decls(&mut self) -> Result<Vec<VarDecl>, ParseError> {
        let mut params = Vec::new();
        if self.cur.kind != TokenKind::Identifier {
            return Ok(params);
        }
        loop {
            let names = self.parse_ident_list()?;
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            for name in names {
                params.push(VarDecl {
                    name,
                    ty: ty.clone(),
                    global: false,
                });
            }
            if self.cur.kind != TokenKind::Semicolon {
                return Ok(params);
            }
            self.advance();
        }
    }

    // Zero or more `var` sections before a routine body.
    fn parse_local_vars(&mut self) -> Result<Vec<VarDecl>, ParseError> {
        let mut locals = Vec::new();
        while self.cur.kind == TokenKind::Var {
            self.advance();
            self.parse_var_decls(&mut locals, false)?;
        }
        Ok(locals)
    }

    // A routine body is either a block or the keyword `forward`.
    fn parse_body_or_forward(&mut self) -> Result<Option<Vec<Stmt>>, ParseError> {
        match self.cur.kind {
            TokenKind::Begin => Ok(Some(self.parse_block()?)),
            TokenKind::Forward => {
                self.advance();
                Ok(None)
            }
            _ => Err(self.unexpected(vec![TokenKind::Begin, TokenKind::Forward])),
        }
    }

    fn parse_type(&mut self) -> Result<Type, ParseError> {
        match self.cur.kind {
            TokenKind::Integer => {
                self.advance();
                Ok(Type::Integer)
            }
            TokenKind::Array => {
                self.advance();
                self.expect(TokenKind::LeftBracket)?;
                let lo = self.parse_bound()?;
                // the range operator is two consecutive dot tokens
                self.expect(TokenKind::Dot)?;
                self.expect(TokenKind::Dot)?;
                let hi = self.parse_bound()?;
                self.expect(TokenKind::RightBracket)?;
                self.expect(TokenKind::Of)?;
                let elem = self.parse_type()?;
                Ok(Type::Array {
                    lo,
                    hi,
                    elem: Box::new(elem),
                })
            }
            _ => Err(self.unexpected(vec![TokenKind::Integer, TokenKind::Array])),
        }
    }

    // An optionally negated number literal (array bounds).
    fn parse_bound(&mut self) -> Result<i32, ParseError> {
        match self.cur.kind {
            TokenKind::Minus => {
                self.advance();
                Ok(self.parse_bound()?.wrapping_neg())
            }
            TokenKind::Number => Ok(self.expect(TokenKind::Number)?.value),
            _ => Err(self.unexpected(vec![TokenKind::Minus, TokenKind::Number])),
        }
    }

    // `begin ... end`; statements are semicolon-separated and the separator
    // is optional after the last one. The block may be empty.
    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(TokenKind::Begin)?;
        let mut statements = Vec::new();
        if self.cur.kind != TokenKind::End {
            self.parse_statement(&mut statements)?;
        }
        self.expect(TokenKind::End)?;
        Ok(statements)
    }

    // One statement plus any semicolon-chained successors.
    fn parse_statement(&mut self, out: &mut Vec<Stmt>) -> Result<(), ParseError> {
        match self.cur.kind {
            TokenKind::Identifier => {
                let stmt = self.parse_ident_line()?;
                out.push(stmt);
            }
            TokenKind::Begin => {
                let block = self.parse_block()?;
                out.push(Stmt::Block(block));
            }
            TokenKind::For => {
                let stmt = self.parse_for()?;
                out.push(stmt);
            }
            TokenKind::While => {
                self.advance();
                let cond = self.parse_expression()?;
                self.expect(TokenKind::Do)?;
                let body = self.parse_block()?;
                out.push(Stmt::While { cond, body });
            }
            TokenKind::Exit => {
                self.advance();
                out.push(Stmt::Exit);
            }
            TokenKind::Break => {
                self.advance();
                out.push(Stmt::Break);
            }
            TokenKind::Continue => {
                self.advance();
                out.push(Stmt::Continue);
            }
            TokenKind::If => {
                let stmt = self.parse_if()?;
                out.push(stmt);
            }
            _ => {
                return Err(self.unexpected(vec![
                    TokenKind::Identifier,
                    TokenKind::Begin,
                    TokenKind::For,
                    TokenKind::While,
                    TokenKind::Exit,
                    TokenKind::Break,
                    TokenKind::If,
                    TokenKind::Continue,
                ]));
            }
        }
        self.parse_next_statement(out)
    }

    // After a statement: an optional semicolon, then optionally the next
    // statement (so a trailing semicolon before `end` is fine).
    fn parse_next_statement(&mut self, out: &mut Vec<Stmt>) -> Result<(), ParseError> {
        if self.cur.kind != TokenKind::Semicolon {
            return Ok(());
        }
        self.advance();
        match self.cur.kind {
            TokenKind::Begin
            | TokenKind::For
            | TokenKind::While
            | TokenKind::Exit
            | TokenKind::Continue
            | TokenKind::Break
            | TokenKind::Identifier
            | TokenKind::If => self.parse_statement(out),
            _ => Ok(()),
        }
    }

    // `for i := start (to|downto) end do begin ... end`
    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::For)?;
        let var = self.expect(TokenKind::Identifier)?.text;
        self.expect(TokenKind::Assign)?;
        let start = self.parse_expression()?;
        let ascending = match self.cur.kind {
            TokenKind::To => {
                self.advance();
                true
            }
            TokenKind::Downto => {
                self.advance();
                false
            }
            _ => return Err(self.unexpected(vec![TokenKind::To, TokenKind::Downto])),
        };
        let end = self.parse_expression()?;
        self.expect(TokenKind::Do)?;
        let body = self.parse_block()?;
        Ok(Stmt::For {
            var,
            start,
            end,
            ascending,
            body,
        })
    }

    // A statement starting with an identifier: assignment, array-element
    // assignment, or procedure call, decided by the following token.
    fn parse_ident_line(&mut self) -> Result<Stmt, ParseError> {
        let name = self.expect(TokenKind::Identifier)?.text;
        match self.cur.kind {
            TokenKind::Assign => {
                self.advance();
                let value = self.parse_expression()?;
                Ok(Stmt::Assign {
                    target: LValue::Var(name),
                    value,
                })
            }
            TokenKind::LeftBracket => {
                self.advance();
                let index = self.parse_expression()?;
                self.expect(TokenKind::RightBracket)?;
                let target = LValue::Index {
                    base: Box::new(LValue::Var(name)),
                    index: Box::new(index),
                };
                self.parse_element_target(target)
            }
            TokenKind::LeftParen => {
                self.advance();
                let args = self.parse_call_args()?;
                self.expect(TokenKind::RightParen)?;
                Ok(Stmt::Call { name, args })
            }
            _ => Err(self.unexpected(vec![
                TokenKind::Assign,
                TokenKind::LeftBracket,
                TokenKind::LeftParen,
            ])),
        }
    }

    // Further `[index]` levels on an assignment target, then `:=`.
    fn parse_element_target(&mut self, target: LValue) -> Result<Stmt, ParseError> {
        match self.cur.kind {
            TokenKind::Assign => {
                self.advance();
                let value = self.parse_expression()?;
                Ok(Stmt::Assign { target, value })
            }
            TokenKind::LeftBracket => {
                self.advance();
                let index = self.parse_expression()?;
                self.expect(TokenKind::RightBracket)?;
                self.parse_element_target(LValue::Index {
                    base: Box::new(target),
                    index: Box::new(index),
                })
            }
            _ => Err(self.unexpected(vec![TokenKind::Assign, TokenKind::LeftBracket])),
        }
    }

    // Comma-separated call arguments; string literals are valid only here.
    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        loop {
            match self.cur.kind {
                TokenKind::Number
                | TokenKind::Not
                | TokenKind::Minus
                | TokenKind::LeftParen
                | TokenKind::Identifier => args.push(self.parse_expression()?),
                TokenKind::Str => {
                    let tok = self.expect(TokenKind::Str)?;
                    args.push(Expr::Str(tok.text));
                }
                _ => return Ok(args),
            }
            if self.cur.kind != TokenKind::Comma {
                return Ok(args);
            }
            self.advance();
        }
    }

    // `if cond then arm [else arm]`; an arm is a block or one of the
    // single-statement forms.
    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::If)?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::Then)?;
        let then_body = self.parse_if_arm()?;
        let else_body = if self.cur.kind == TokenKind::Else {
            self.advance();
            Some(self.parse_if_arm()?)
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_body,
            else_body,
        })
    }

    fn parse_if_arm(&mut self) -> Result<Vec<Stmt>, ParseError> {
        match self.cur.kind {
            TokenKind::Begin => self.parse_block(),
            TokenKind::Identifier => Ok(vec![self.parse_ident_line()?]),
            TokenKind::Exit => {
                self.advance();
                Ok(vec![Stmt::Exit])
            }
            TokenKind::Continue => {
                self.advance();
                Ok(vec![Stmt::Continue])
            }
            TokenKind::Break => {
                self.advance();
                Ok(vec![Stmt::Break])
            }
            _ => Err(self.unexpected(vec![
                TokenKind::Begin,
                TokenKind::Identifier,
                TokenKind::Exit,
                TokenKind::Continue,
                TokenKind::Break,
            ])),
        }
    }

    // Expression grammar, lowest precedence first. All binary levels are
    // left-associative; `not` and sign are right-recursive.
    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_additive()?;
        loop {
            let op = match self.cur.kind {
                TokenKind::Equal => BinOp::Eq,
                TokenKind::NotEqual => BinOp::Ne,
                TokenKind::Less => BinOp::Lt,
                TokenKind::LessEqual => BinOp::Le,
                TokenKind::Greater => BinOp::Gt,
                TokenKind::GreaterEqual => BinOp::Ge,
                _ => return Ok(expr),
            };
            self.advance();
            let rhs = self.parse_additive()?;
            expr = Expr::Binary {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_multiplicative()?;
        loop {
            let op = match self.cur.kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                TokenKind::Or => BinOp::Or,
                _ => return Ok(expr),
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            expr = Expr::Binary {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.cur.kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Div => BinOp::Div,
                TokenKind::Mod => BinOp::Mod,
                TokenKind::And => BinOp::And,
                TokenKind::Xor => BinOp::Xor,
                _ => return Ok(expr),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            expr = Expr::Binary {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
    }

    // `not` binds looser than sign, and both nest (`not not x`, `--x`).
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.cur.kind {
            TokenKind::Not => {
                self.advance();
                let expr = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnOp::Not,
                    expr: Box::new(expr),
                })
            }
            TokenKind::Minus
            | TokenKind::LeftParen
            | TokenKind::Number
            | TokenKind::Identifier => self.parse_signed(),
            _ => Err(self.unexpected(vec![
                TokenKind::Not,
                TokenKind::Minus,
                TokenKind::LeftParen,
                TokenKind::Number,
                TokenKind::Identifier,
            ])),
        }
    }

    fn parse_signed(&mut self) -> Result<Expr, ParseError> {
        match self.cur.kind {
            TokenKind::Minus => {
                self.advance();
                let expr = self.parse_signed()?;
                Ok(Expr::Unary {
                    op: UnOp::Neg,
                    expr: Box::new(expr),
                })
            }
            TokenKind::Number | TokenKind::Identifier => self.parse_atom(),
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RightParen)?;
                Ok(expr)
            }
            _ => Err(self.unexpected(vec![
                TokenKind::Minus,
                TokenKind::Number,
                TokenKind::Identifier,
                TokenKind::LeftParen,
            ])),
        }
    }

    // A literal, or an identifier resolved to a call, an indexed reference
    // or a plain variable by the token after it.
    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        match self.cur.kind {
            TokenKind::Number => {
                let value = self.expect(TokenKind::Number)?.value;
                Ok(Expr::Number(value))
            }
            TokenKind::Identifier => {
                let name = self.expect(TokenKind::Identifier)?.text;
                if self.cur.kind == TokenKind::LeftParen {
                    self.advance();
                    let args = self.parse_call_args()?;
                    self.expect(TokenKind::RightParen)?;
                    return Ok(Expr::Call { name, args });
                }
                let mut lvalue = LValue::Var(name);
                while self.cur.kind == TokenKind::LeftBracket {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RightBracket)?;
                    lvalue = LValue::Index {
                        base: Box::new(lvalue),
                        index: Box::new(index),
                    };
                }
                Ok(Expr::Ref(lvalue))
            }
            _ => Err(self.unexpected(vec![TokenKind::Number, TokenKind::Identifier])),
        }
    }
}
