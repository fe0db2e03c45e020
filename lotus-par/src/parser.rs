//! Recursive-descent parser with panic-mode statement recovery.

use lotus_lex::{Token, TokenKind};
use lotus_util::Handler;

use crate::ast::{Expr, LiteralKind, Operator, Stmt};

pub struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    handler: &'a Handler,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, handler: &'a Handler) -> Self {
        Parser { tokens, current: 0, handler }
    }

    /// Parses the whole token stream into an ordered list of top-level
    /// statements. A statement that fails to parse is dropped; parsing
    /// resumes at the next synchronization point, so the result never
    /// contains a `PanicSentinel`.
    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        while !self.is_at_end() {
            match self.statement() {
                Some(stmt) => stmts.push(stmt),
                None => self.synchronize(),
            }
        }
        stmts
    }

    // ---- statements ----------------------------------------------------

    fn statement(&mut self) -> Option<Stmt> {
        match self.peek().kind {
            TokenKind::Let => self.declaration_stmt(),
            TokenKind::Fun => self.function_stmt(),
            TokenKind::LeftBrace => self.block_stmt(),
            TokenKind::If => self.if_stmt(),
            TokenKind::Print => self.print_stmt(),
            TokenKind::Return => self.return_stmt(),
            TokenKind::Identifier if self.check_next(TokenKind::Equal) => self.assignment_stmt(),
            _ => self.expr_stmt(),
        }
    }

    fn declaration_stmt(&mut self) -> Option<Stmt> {
        let line = self.peek().line;
        self.advance(); // 'let'
        let name = self.consume_identifier("expected identifier after 'let'")?;
        self.consume(TokenKind::Equal, "expected '=' after identifier")?;
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "expected ';' after declaration")?;
        Some(Stmt::Declaration { name, expr, line })
    }

    fn function_stmt(&mut self) -> Option<Stmt> {
        let line = self.peek().line;
        self.advance(); // 'fun'
        let name = self.consume_identifier("expected function name after 'fun'")?;
        self.consume(TokenKind::LeftParen, "expected '(' after function name")?;
        let mut formals = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                formals.push(self.consume_identifier("expected parameter name")?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "expected ')' after parameters")?;
        let body = self.statement()?;
        Some(Stmt::Function { name, formals, body: Box::new(body), line })
    }

    fn block_stmt(&mut self) -> Option<Stmt> {
        let line = self.peek().line;
        self.consume(TokenKind::LeftBrace, "expected '{'")?;
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            match self.statement() {
                Some(stmt) => stmts.push(stmt),
                None => self.synchronize(),
            }
        }
        self.consume(TokenKind::RightBrace, "expected '}' after block")?;
        Some(Stmt::Block { stmts, line })
    }

    fn if_stmt(&mut self) -> Option<Stmt> {
        let line = self.peek().line;
        self.advance(); // 'if'
        self.consume(TokenKind::LeftParen, "expected '(' after 'if'")?;
        let cond = self.expression()?;
        self.consume(TokenKind::RightParen, "expected ')' after condition")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_token(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Some(Stmt::If { cond, then_branch, else_branch, line })
    }

    fn print_stmt(&mut self) -> Option<Stmt> {
        let line = self.peek().line;
        self.advance(); // 'print'
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "expected ';' after print statement")?;
        Some(Stmt::Print { expr, line })
    }

    fn return_stmt(&mut self) -> Option<Stmt> {
        let line = self.peek().line;
        self.advance(); // 'return'
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "expected ';' after return statement")?;
        Some(Stmt::Return { expr, line })
    }

    fn assignment_stmt(&mut self) -> Option<Stmt> {
        let line = self.peek().line;
        let name = self.consume_identifier("expected identifier")?;
        self.consume(TokenKind::Equal, "expected '=' in assignment")?;
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "expected ';' after assignment")?;
        Some(Stmt::Assignment { name, expr, line })
    }

    fn expr_stmt(&mut self) -> Option<Stmt> {
        let line = self.peek().line;
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "expected ';' after expression")?;
        Some(Stmt::Expr { expr, line })
    }

    // ---- expressions (precedence low -> high) ---------------------------

    fn expression(&mut self) -> Option<Expr> {
        self.forwarding()
    }

    fn forwarding(&mut self) -> Option<Expr> {
        let mut expr = self.equality()?;
        while self.match_token(TokenKind::ForwardPipe) {
            let right = self.equality()?;
            expr = Expr::Binary { left: Box::new(expr), op: Operator::Forward, right: Box::new(right) };
        }
        Some(expr)
    }

    fn equality(&mut self) -> Option<Expr> {
        let mut expr = self.bool_alg()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqualEqual => Operator::Equal,
                TokenKind::BangEqual => Operator::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.bool_alg()?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }
        Some(expr)
    }

    fn bool_alg(&mut self) -> Option<Expr> {
        let mut expr = self.comparison()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::And => Operator::And,
                TokenKind::Or => Operator::Or,
                _ => break,
            };
            self.advance();
            let right = self.comparison()?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }
        Some(expr)
    }

    fn comparison(&mut self) -> Option<Expr> {
        let mut expr = self.term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Greater => Operator::Greater,
                TokenKind::GreaterEqual => Operator::GreaterEqual,
                TokenKind::Less => Operator::Less,
                TokenKind::LessEqual => Operator::LessEqual,
                _ => break,
            };
            self.advance();
            let right = self.term()?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }
        Some(expr)
    }

    fn term(&mut self) -> Option<Expr> {
        let mut expr = self.factor()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => Operator::Plus,
                TokenKind::Minus => Operator::Minus,
                _ => break,
            };
            self.advance();
            let right = self.factor()?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }
        Some(expr)
    }

    fn factor(&mut self) -> Option<Expr> {
        let mut expr = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Slash => Operator::Slash,
                TokenKind::Star => Operator::Star,
                TokenKind::Percent => Operator::Mod,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }
        Some(expr)
    }

    fn unary(&mut self) -> Option<Expr> {
        let op = match self.peek().kind {
            TokenKind::Bang => Some(Operator::Not),
            TokenKind::Minus => Some(Operator::Minus),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let right = self.unary()?;
            return Some(Expr::Unary { op, right: Box::new(right) });
        }
        self.call()
    }

    fn call(&mut self) -> Option<Expr> {
        if self.check(TokenKind::Identifier) && self.check_next(TokenKind::LeftParen) {
            let name = self.consume_identifier("expected function name")?;
            self.consume(TokenKind::LeftParen, "expected '(' after function name")?;
            let mut actuals = Vec::new();
            if !self.check(TokenKind::RightParen) {
                loop {
                    actuals.push(self.expression()?);
                    if !self.match_token(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.consume(TokenKind::RightParen, "expected ')' after arguments")?;
            return Some(Expr::Call { name, actuals });
        }
        self.primary()
    }

    fn primary(&mut self) -> Option<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::False => {
                self.advance();
                Some(Expr::Literal { kind: LiteralKind::Boolean, payload: "false".into() })
            }
            TokenKind::True => {
                self.advance();
                Some(Expr::Literal { kind: LiteralKind::Boolean, payload: "true".into() })
            }
            TokenKind::Nil => {
                self.advance();
                Some(Expr::Literal { kind: LiteralKind::Nil, payload: String::new() })
            }
            TokenKind::Number => {
                self.advance();
                Some(Expr::Literal { kind: LiteralKind::Number, payload: token.literal.unwrap_or(token.lexeme) })
            }
            TokenKind::String => {
                self.advance();
                Some(Expr::Literal { kind: LiteralKind::String, payload: token.literal.unwrap_or_default() })
            }
            TokenKind::Identifier => {
                self.advance();
                Some(Expr::Identifier { name: token.literal.unwrap_or(token.lexeme) })
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.expression()?;
                self.consume(TokenKind::RightParen, "expected ')' after expression")?;
                Some(Expr::Grouping { inner: Box::new(inner) })
            }
            _ => {
                self.error("expected expression");
                None
            }
        }
    }

    // ---- error recovery --------------------------------------------------

    fn synchronize(&mut self) {
        while !self.is_at_end() {
            match self.peek().kind {
                TokenKind::Fun | TokenKind::Let | TokenKind::If | TokenKind::Print | TokenKind::Return => return,
                _ => {}
            }
            self.advance();
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
        }
    }

    fn error(&mut self, message: &str) {
        let token = self.peek();
        if token.kind == TokenKind::End {
            self.handler.error(format!("at end: {message}"), Some(token.line));
        } else {
            self.handler.error(format!("at '{}': {message}", token.lexeme), Some(token.line));
        }
    }

    // ---- token stream primitives ------------------------------------------

    fn consume_identifier(&mut self, message: &str) -> Option<String> {
        if self.check(TokenKind::Identifier) {
            let token = self.advance_token();
            Some(token.literal.unwrap_or(token.lexeme))
        } else {
            self.error(message);
            None
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Option<()> {
        if self.check(kind) {
            self.advance();
            Some(())
        } else {
            self.error(message);
            None
        }
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn check_next(&self, kind: TokenKind) -> bool {
        match self.tokens.get(self.current + 1) {
            Some(token) => token.kind == kind,
            None => false,
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn advance_token(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::End
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lotus_lex::Scanner;
    use lotus_util::{Handler, Level};

    fn parse(src: &str) -> (Vec<Stmt>, Handler) {
        let handler = Handler::new(Level::Info);
        let tokens = Scanner::new(src, &handler).scan_tokens();
        let stmts = Parser::new(tokens, &handler).parse();
        (stmts, handler)
    }

    #[test]
    fn parses_arithmetic_precedence() {
        let (stmts, handler) = parse("print 1 + 2 * 3;");
        assert_eq!(handler.error_count(), 0);
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Stmt::Print { expr, .. } => match expr {
                Expr::Binary { op: Operator::Plus, right, .. } => {
                    assert!(matches!(**right, Expr::Binary { op: Operator::Star, .. }));
                }
                other => panic!("unexpected expr {other:?}"),
            },
            other => panic!("unexpected stmt {other:?}"),
        }
    }

    #[test]
    fn forwarding_is_left_associative() {
        let (stmts, handler) = parse("print 3 |> inc() |> dbl();");
        assert_eq!(handler.error_count(), 0);
        match &stmts[0] {
            Stmt::Print { expr: Expr::Binary { op: Operator::Forward, left, .. }, .. } => {
                assert!(matches!(**left, Expr::Binary { op: Operator::Forward, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_semicolon_recovers_at_next_statement() {
        let (stmts, handler) = parse("let a = 1 print a;");
        assert_eq!(handler.error_count(), 1);
        assert_eq!(stmts.len(), 1);
        assert!(matches!(stmts[0], Stmt::Print { .. }));
        assert!(!stmts[0].contains_panic_sentinel());
    }

    #[test]
    fn unknown_primary_is_dropped_not_propagated() {
        let (stmts, handler) = parse("print ; print 1;");
        assert_eq!(handler.error_count(), 1);
        for s in &stmts {
            assert!(!s.contains_panic_sentinel());
        }
    }

    #[test]
    fn identifier_followed_by_equal_is_assignment() {
        let (stmts, handler) = parse("a = 2;");
        assert_eq!(handler.error_count(), 0);
        assert!(matches!(stmts[0], Stmt::Assignment { .. }));
    }

    #[test]
    fn call_expression_parses_as_expr_stmt() {
        let (stmts, handler) = parse("foo();");
        assert_eq!(handler.error_count(), 0);
        assert!(matches!(stmts[0], Stmt::Expr { expr: Expr::Call { .. }, .. }));
    }
}
