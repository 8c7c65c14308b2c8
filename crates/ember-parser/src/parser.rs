//! Recursive-descent parser with Pratt-style precedence climbing for
//! expressions.

use crate::ast::{BinOp, Block, DeclKind, Expr, Literal, Pos, Program, Stmt, UnOp};
use ember_lexer::{Lexer, Token, TokenKind};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub pos: Pos,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.pos.line, self.pos.column, self.message)
    }
}

impl std::error::Error for ParseError {}

type PResult<T> = Result<T, ParseError>;

/// Binding power of a binary operator; higher binds tighter.
/// Assignment is handled separately since it is right-associative and
/// only valid with a variable on the left.
fn precedence(op: &str) -> Option<(u8, BinOp)> {
    Some(match op {
        "||" => (1, BinOp::Or),
        "&&" => (2, BinOp::And),
        "==" => (3, BinOp::Eq),
        "!=" => (3, BinOp::Neq),
        "<" => (4, BinOp::Lt),
        "<=" => (4, BinOp::Lte),
        ">" => (4, BinOp::Gt),
        ">=" => (4, BinOp::Gte),
        "+" => (5, BinOp::Add),
        "-" => (5, BinOp::Sub),
        "*" => (6, BinOp::Mul),
        "/" => (6, BinOp::Div),
        "%" => (6, BinOp::Mod),
        _ => return None,
    })
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        let tokens = Lexer::new(source).tokenize();
        Parser {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// Parses the whole token stream into a [`Program`].
    ///
    /// On any statement-level parse error the parser resynchronizes at the
    /// next `;` or `}` and keeps going, but the overall result is `Err` -
    /// a [`Program`] is never returned alongside accumulated errors.
    pub fn parse(&mut self) -> Result<Program, Vec<ParseError>> {
        let mut statements = Vec::new();
        while !self.at_eof() {
            statements.push(self.statement());
        }
        if self.errors.is_empty() {
            Ok(Program { statements })
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    // ---- token stream plumbing ----------------------------------------

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn at_eof(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn check_lexeme(&self, lexeme: &str) -> bool {
        self.current().kind != TokenKind::Eof && self.current().lexeme == lexeme
    }

    fn match_lexeme(&mut self, lexeme: &str) -> bool {
        if self.check_lexeme(lexeme) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_lexeme(&mut self, lexeme: &str) -> PResult<()> {
        if self.match_lexeme(lexeme) {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected '{lexeme}', found '{}'",
                self.current().lexeme
            )))
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let tok = self.current();
        ParseError {
            message: message.into(),
            pos: Pos::new(tok.line, tok.column),
        }
    }

    /// Recover from a statement-level parse error by skipping tokens until
    /// just past the next `;` or `}`.
    fn synchronize(&mut self) {
        while !self.at_eof() {
            let tok = self.advance();
            if tok.lexeme == ";" || tok.lexeme == "}" {
                return;
            }
        }
    }

    // ---- statements ------------------------------------------------------

    fn statement(&mut self) -> Stmt {
        let result = self.statement_inner();
        match result {
            Ok(stmt) => stmt,
            Err(e) => {
                let pos = e.pos;
                let message = e.message.clone();
                self.errors.push(e);
                self.synchronize();
                Stmt::Error { message, pos }
            }
        }
    }

    fn statement_inner(&mut self) -> PResult<Stmt> {
        let tok = self.current().clone();
        let pos = Pos::new(tok.line, tok.column);

        if tok.kind == TokenKind::Keyword {
            match tok.lexeme.as_str() {
                "var" | "let" | "const" => return self.var_decl(),
                "if" => return self.if_stmt(),
                "while" => return self.while_stmt(),
                "for" => return self.for_stmt(),
                "function" => return self.function_def(),
                _ => {}
            }
        }
        if tok.kind == TokenKind::Identifier && tok.lexeme == "switch" {
            return self.switch_stmt();
        }
        if tok.kind == TokenKind::Identifier && tok.lexeme == "import" {
            return self.import_stmt();
        }
        if self.check_lexeme("{") {
            let body = self.block()?;
            return Ok(Stmt::Block { body, pos });
        }

        // Assignment statement: NAME = expr ;  (distinguished from a plain
        // expression statement so the compiler does not double-pop, see
        // ast::Stmt::Assign doc comment).
        if tok.kind == TokenKind::Identifier
            && self.tokens.get(self.pos + 1).map(|t| t.lexeme.as_str()) == Some("=")
        {
            let name = self.advance().lexeme;
            self.expect_lexeme("=")?;
            let value = self.expression()?;
            self.expect_lexeme(";")?;
            return Ok(Stmt::Assign { name, value, pos });
        }

        let expr = self.expression()?;
        self.expect_lexeme(";")?;
        Ok(Stmt::ExprStmt { expr, pos })
    }

    fn block(&mut self) -> PResult<Block> {
        self.expect_lexeme("{")?;
        let mut stmts = Vec::new();
        while !self.check_lexeme("}") && !self.at_eof() {
            stmts.push(self.statement());
        }
        self.expect_lexeme("}")?;
        Ok(stmts)
    }

    fn var_decl(&mut self) -> PResult<Stmt> {
        let tok = self.advance();
        let pos = Pos::new(tok.line, tok.column);
        let kind = match tok.lexeme.as_str() {
            "var" => DeclKind::Var,
            "let" => DeclKind::Let,
            "const" => DeclKind::Const,
            _ => unreachable!(),
        };
        let name_tok = self.advance();
        if name_tok.kind != TokenKind::Identifier {
            return Err(ParseError {
                message: format!("expected identifier after '{}'", tok.lexeme),
                pos: Pos::new(name_tok.line, name_tok.column),
            });
        }
        let init = if self.match_lexeme("=") {
            Some(self.expression()?)
        } else {
            None
        };
        self.expect_lexeme(";")?;
        Ok(Stmt::VarDecl {
            kind,
            name: name_tok.lexeme,
            init,
            pos,
        })
    }

    fn if_stmt(&mut self) -> PResult<Stmt> {
        let tok = self.advance();
        let pos = Pos::new(tok.line, tok.column);
        self.expect_lexeme("(")?;
        let cond = self.expression()?;
        self.expect_lexeme(")")?;
        let then_branch = self.block()?;
        let else_branch = if self.match_lexeme("else") {
            if self.check_lexeme("if") {
                Some(Box::new(self.if_stmt()?))
            } else {
                let else_pos_tok = self.current().clone();
                let body = self.block()?;
                Some(Box::new(Stmt::Block {
                    body,
                    pos: Pos::new(else_pos_tok.line, else_pos_tok.column),
                }))
            }
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
            pos,
        })
    }

    fn while_stmt(&mut self) -> PResult<Stmt> {
        let tok = self.advance();
        let pos = Pos::new(tok.line, tok.column);
        self.expect_lexeme("(")?;
        let cond = self.expression()?;
        self.expect_lexeme(")")?;
        let body = self.block()?;
        Ok(Stmt::While { cond, body, pos })
    }

    fn for_stmt(&mut self) -> PResult<Stmt> {
        let tok = self.advance();
        let pos = Pos::new(tok.line, tok.column);
        self.expect_lexeme("(")?;

        let init = if self.check_lexeme(";") {
            None
        } else if self.check_lexeme("var") || self.check_lexeme("let") || self.check_lexeme("const") {
            Some(Box::new(self.var_decl()?))
        } else {
            let expr_pos = self.current().clone();
            let expr = self.expression()?;
            self.expect_lexeme(";")?;
            Some(Box::new(Stmt::ExprStmt {
                expr,
                pos: Pos::new(expr_pos.line, expr_pos.column),
            }))
        };
        if init.is_none() {
            self.expect_lexeme(";")?;
        }

        let cond = if self.check_lexeme(";") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_lexeme(";")?;

        let increment = if self.check_lexeme(")") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_lexeme(")")?;

        let body = self.block()?;
        Ok(Stmt::For {
            init,
            cond,
            increment,
            body,
            pos,
        })
    }

    fn function_def(&mut self) -> PResult<Stmt> {
        let tok = self.advance();
        let pos = Pos::new(tok.line, tok.column);
        let name_tok = self.advance();
        if name_tok.kind != TokenKind::Identifier {
            return Err(ParseError {
                message: "expected function name".to_string(),
                pos: Pos::new(name_tok.line, name_tok.column),
            });
        }
        self.expect_lexeme("(")?;
        let mut params = Vec::new();
        if !self.check_lexeme(")") {
            loop {
                let p = self.advance();
                if p.kind != TokenKind::Identifier {
                    return Err(ParseError {
                        message: "expected parameter name".to_string(),
                        pos: Pos::new(p.line, p.column),
                    });
                }
                params.push(p.lexeme);
                if !self.match_lexeme(",") {
                    break;
                }
            }
        }
        self.expect_lexeme(")")?;
        let body = self.block()?;
        Ok(Stmt::FunctionDef {
            name: name_tok.lexeme,
            params,
            body,
            pos,
        })
    }

    fn switch_stmt(&mut self) -> PResult<Stmt> {
        let tok = self.advance();
        let pos = Pos::new(tok.line, tok.column);
        self.expect_lexeme("(")?;
        let subject = self.expression()?;
        self.expect_lexeme(")")?;
        self.expect_lexeme("{")?;

        let mut cases = Vec::new();
        let mut default = None;
        while !self.check_lexeme("}") && !self.at_eof() {
            if self.match_lexeme("case") {
                let literal = self.literal_value()?;
                self.expect_lexeme(":")?;
                let mut body = Vec::new();
                while !self.check_lexeme("case")
                    && !self.check_lexeme("default")
                    && !self.check_lexeme("}")
                {
                    body.push(self.statement());
                }
                cases.push((literal, body));
            } else if self.match_lexeme("default") {
                self.expect_lexeme(":")?;
                let mut body = Vec::new();
                while !self.check_lexeme("case")
                    && !self.check_lexeme("default")
                    && !self.check_lexeme("}")
                {
                    body.push(self.statement());
                }
                default = Some(body);
            } else {
                return Err(self.error("expected 'case' or 'default' in switch body"));
            }
        }
        self.expect_lexeme("}")?;
        Ok(Stmt::Switch {
            subject,
            cases,
            default,
            pos,
        })
    }

    fn literal_value(&mut self) -> PResult<Literal> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Number => Ok(Literal::Number(tok.lexeme.parse().map_err(|_| ParseError {
                message: format!("invalid numeric literal '{}'", tok.lexeme),
                pos: Pos::new(tok.line, tok.column),
            })?)),
            TokenKind::String => Ok(Literal::String(tok.lexeme)),
            TokenKind::Boolean => Ok(Literal::Boolean(tok.lexeme == "true")),
            TokenKind::Null => Ok(Literal::Null),
            _ => Err(ParseError {
                message: format!("expected a literal, found '{}'", tok.lexeme),
                pos: Pos::new(tok.line, tok.column),
            }),
        }
    }

    fn import_stmt(&mut self) -> PResult<Stmt> {
        let tok = self.advance();
        let pos = Pos::new(tok.line, tok.column);
        let path_tok = self.advance();
        if path_tok.kind != TokenKind::String {
            return Err(ParseError {
                message: "expected a string path after 'import'".to_string(),
                pos: Pos::new(path_tok.line, path_tok.column),
            });
        }
        self.expect_lexeme(";")?;
        Ok(Stmt::Import {
            path: path_tok.lexeme,
            pos,
        })
    }

    // ---- expressions -------------------------------------------------

    fn expression(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> PResult<Expr> {
        let left = self.binary(0)?;
        if self.check_lexeme("=") {
            let pos = left.pos();
            match &left {
                Expr::Variable { name, .. } => {
                    self.advance();
                    let value = self.assignment()?;
                    return Ok(Expr::Assign {
                        name: name.clone(),
                        value: Box::new(value),
                        pos,
                    });
                }
                _ => return Err(self.error("invalid assignment target")),
            }
        }
        Ok(left)
    }

    fn binary(&mut self, min_prec: u8) -> PResult<Expr> {
        let mut left = self.unary()?;
        loop {
            let cur = self.current();
            if cur.kind != TokenKind::Operator {
                break;
            }
            let Some((prec, op)) = precedence(&cur.lexeme) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            let pos = left.pos();
            self.advance();
            let right = self.binary(prec + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                pos,
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> PResult<Expr> {
        let tok = self.current().clone();
        if tok.kind == TokenKind::Operator && (tok.lexeme == "-" || tok.lexeme == "!") {
            let pos = Pos::new(tok.line, tok.column);
            self.advance();
            let operand = self.unary()?;
            let op = if tok.lexeme == "-" { UnOp::Neg } else { UnOp::Not };
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
                pos,
            });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.check_lexeme("[") {
                let pos = expr.pos();
                self.advance();
                let index = self.expression()?;
                self.expect_lexeme("]")?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                    pos,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> PResult<Expr> {
        let tok = self.advance();
        let pos = Pos::new(tok.line, tok.column);
        match tok.kind {
            TokenKind::Number => Ok(Expr::Literal {
                value: Literal::Number(tok.lexeme.parse().map_err(|_| ParseError {
                    message: format!("invalid numeric literal '{}'", tok.lexeme),
                    pos,
                })?),
                pos,
            }),
            TokenKind::String => Ok(Expr::Literal {
                value: Literal::String(tok.lexeme),
                pos,
            }),
            TokenKind::Boolean => Ok(Expr::Literal {
                value: Literal::Boolean(tok.lexeme == "true"),
                pos,
            }),
            TokenKind::Null => Ok(Expr::Literal {
                value: Literal::Null,
                pos,
            }),
            TokenKind::Punctuation if tok.lexeme == "(" => {
                let inner = self.expression()?;
                self.expect_lexeme(")")?;
                Ok(inner)
            }
            TokenKind::Punctuation if tok.lexeme == "[" => {
                let mut elements = Vec::new();
                if !self.check_lexeme("]") {
                    loop {
                        elements.push(self.expression()?);
                        if !self.match_lexeme(",") {
                            break;
                        }
                    }
                }
                self.expect_lexeme("]")?;
                Ok(Expr::ArrayLiteral { elements, pos })
            }
            TokenKind::Identifier => {
                if self.check_lexeme("(") {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check_lexeme(")") {
                        loop {
                            args.push(self.expression()?);
                            if !self.match_lexeme(",") {
                                break;
                            }
                        }
                    }
                    self.expect_lexeme(")")?;
                    Ok(Expr::Call {
                        callee: tok.lexeme,
                        args,
                        pos,
                    })
                } else {
                    Ok(Expr::Variable {
                        name: tok.lexeme,
                        pos,
                    })
                }
            }
            _ => Err(ParseError {
                message: format!("unexpected token '{}'", tok.lexeme),
                pos,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Program {
        Parser::new(src).parse().expect("expected successful parse")
    }

    #[test]
    fn parses_arithmetic_with_precedence() {
        let program = parse_ok("var x = 2 + 3 * 4;");
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0] {
            Stmt::VarDecl { init: Some(Expr::Binary { op: BinOp::Add, right, .. }), .. } => {
                assert!(matches!(**right, Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_if_else_chain() {
        let program = parse_ok("if (x) { y = 1; } else if (z) { y = 2; } else { y = 3; }");
        assert!(matches!(program.statements[0], Stmt::If { .. }));
    }

    #[test]
    fn parses_for_loop_with_optional_clauses() {
        let program = parse_ok("for (;;) { }");
        match &program.statements[0] {
            Stmt::For { init, cond, increment, .. } => {
                assert!(init.is_none());
                assert!(cond.is_none());
                assert!(increment.is_none());
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_array_literal_and_index() {
        let program = parse_ok("var a = [1, 2, 3]; print(a[1]);");
        assert!(matches!(
            &program.statements[0],
            Stmt::VarDecl { init: Some(Expr::ArrayLiteral { .. }), .. }
        ));
    }

    #[test]
    fn rejects_assignment_to_non_variable() {
        let result = Parser::new("1 = 2;").parse();
        assert!(result.is_err());
    }

    #[test]
    fn assignment_is_right_associative() {
        let program = parse_ok("x = y = 1;");
        match &program.statements[0] {
            Stmt::Assign { value, .. } => {
                assert!(matches!(value, Expr::Assign { .. }));
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn recovers_after_error_and_reports_failure() {
        let result = Parser::new("var x = ; var y = 2;").parse();
        assert!(result.is_err());
    }
}
