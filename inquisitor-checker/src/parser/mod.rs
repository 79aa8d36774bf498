use anyhow::{anyhow, bail, Result};

use crate::ast::*;
use crate::lexer::{Keyword, Token, TokenKind};

#[derive(Copy, Clone, PartialEq, PartialOrd)]
enum Precedence {
    Lowest = 0,
    Or,
    And,
    Not,
    Comparison,
    BitOr,
    BitXor,
    BitAnd,
    Shift,
    Term,
    Factor,
    Unary,
    Power,
}

impl Precedence {
    fn of(kind: &TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Keyword(Keyword::Or) => Some(Precedence::Or),
            TokenKind::Keyword(Keyword::And) => Some(Precedence::And),
            TokenKind::DoubleEqual
            | TokenKind::BangEqual
            | TokenKind::Greater
            | TokenKind::GreaterEqual
            | TokenKind::Less
            | TokenKind::LessEqual
            | TokenKind::Keyword(Keyword::In)
            | TokenKind::Keyword(Keyword::Not)
            | TokenKind::Keyword(Keyword::Is) => Some(Precedence::Comparison),
            TokenKind::Pipe => Some(Precedence::BitOr),
            TokenKind::Caret => Some(Precedence::BitXor),
            TokenKind::Ampersand => Some(Precedence::BitAnd),
            TokenKind::LessLess | TokenKind::GreaterGreater => Some(Precedence::Shift),
            TokenKind::Plus | TokenKind::Minus => Some(Precedence::Term),
            TokenKind::Star
            | TokenKind::Slash
            | TokenKind::DoubleSlash
            | TokenKind::Percent
            | TokenKind::At => Some(Precedence::Factor),
            TokenKind::DoubleStar => Some(Precedence::Power),
            _ => None,
        }
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last().map(|token| &token.kind), Some(TokenKind::Eof)) {
            let (line, column) = tokens
                .last()
                .map(|token| (token.line, token.column + 1))
                .unwrap_or((1, 1));
            tokens.push(Token {
                kind: TokenKind::Eof,
                lexeme: String::new(),
                line,
                column,
            });
        }
        Self { tokens, current: 0 }
    }

    fn span_from_token(token: &Token) -> SourceSpan {
        let len = token.lexeme.chars().count().max(1);
        SourceSpan::new(
            token.line,
            token.column,
            token.line,
            token.column + len.saturating_sub(1),
        )
    }

    fn make_expression(span: SourceSpan, kind: ExpressionKind) -> Expression {
        Expression { span, kind }
    }

    fn unsupported(span: SourceSpan, construct: &'static str) -> Expression {
        Self::make_expression(
            span,
            ExpressionKind::Unsupported(UnsupportedExpression { construct }),
        )
    }

    fn union_spans(a: &SourceSpan, b: &SourceSpan) -> SourceSpan {
        SourceSpan::union(a, b)
    }

    pub fn parse(&mut self) -> Result<Module> {
        let mut statements = Vec::new();

        loop {
            self.skip_newlines();
            if self.is_at_end() {
                break;
            }
            if matches!(self.peek_kind(), TokenKind::Indent | TokenKind::Dedent) {
                return Err(self.error_at_current("unexpected indent"));
            }
            statements.push(self.parse_statement()?);
        }

        Ok(Module::new(statements))
    }

    /// Parses a standalone annotation such as the text of a `#::` comment.
    pub fn parse_annotation(&mut self) -> Result<Expression> {
        let expression = self.parse_expression()?;
        self.skip_newlines();
        if !self.is_at_end() {
            return Err(self.error_at_current("unexpected trailing tokens in annotation"));
        }
        Ok(expression)
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek_kind() {
            TokenKind::Keyword(Keyword::Def) => self.parse_function(),
            TokenKind::Keyword(Keyword::If) => self.parse_conditional(ConditionalKind::If),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::Pass) => {
                let token = self.advance();
                self.finish_simple_statement()?;
                Ok(Statement::Pass(Self::span_from_token(&token)))
            }
            TokenKind::Keyword(keyword)
                if keyword.starts_unsupported_statement() || *keyword == Keyword::Elif =>
            {
                let keyword = *keyword;
                self.skip_unsupported_statement(keyword)
            }
            TokenKind::At => {
                let token = self.advance();
                self.skip_to_line_end();
                self.consume_newline();
                Ok(Statement::Unsupported(UnsupportedStatement {
                    span: Self::span_from_token(&token),
                    construct: "decorator".to_string(),
                }))
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_function(&mut self) -> Result<Statement> {
        let def_token = self.advance(); // consume 'def'
        let name_token = self.expect_identifier("expected function name after 'def'")?;
        self.expect(TokenKind::LParen, "expected '(' after function name")?;

        let mut parameters = Vec::new();
        while !self.check(&TokenKind::RParen) {
            if let Some(parameter) = self.parse_parameter()? {
                parameters.push(parameter);
            }
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "expected ')' after parameters")?;

        let return_annotation = if self.match_kind(&TokenKind::Arrow) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let colon = self.expect(TokenKind::Colon, "expected ':' after function signature")?;
        let span = Self::union_spans(
            &Self::span_from_token(&def_token),
            &Self::span_from_token(&colon),
        );
        let body = self.parse_suite()?;

        Ok(Statement::Function(FunctionStatement {
            name: name_token.lexeme.clone(),
            name_span: Self::span_from_token(&name_token),
            span,
            parameters,
            return_annotation,
            body,
        }))
    }

    /// Returns `None` for the positional-only marker `/`.
    fn parse_parameter(&mut self) -> Result<Option<FunctionParameter>> {
        if self.match_kind(&TokenKind::Slash) {
            return Ok(None);
        }

        let kind = if self.match_kind(&TokenKind::DoubleStar) {
            ParameterKind::VarKeyword
        } else if self.match_kind(&TokenKind::Star) {
            ParameterKind::VarPositional
        } else {
            ParameterKind::Positional
        };

        if kind == ParameterKind::VarPositional
            && matches!(self.peek_kind(), TokenKind::Comma | TokenKind::RParen)
        {
            let marker = self.previous().clone();
            return Ok(Some(FunctionParameter {
                name: "*".to_string(),
                span: Self::span_from_token(&marker),
                kind,
                annotation: None,
                default_value: None,
            }));
        }

        let name_token = self.expect_identifier("expected parameter name")?;
        let annotation = if self.match_kind(&TokenKind::Colon) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let default_value = if self.match_kind(&TokenKind::Equal) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(Some(FunctionParameter {
            name: name_token.lexeme.clone(),
            span: Self::span_from_token(&name_token),
            kind,
            annotation,
            default_value,
        }))
    }

    fn parse_conditional(&mut self, kind: ConditionalKind) -> Result<Statement> {
        let keyword_token = self.advance(); // consume 'if' / 'elif'
        let condition = self.parse_expression()?;
        let colon = self.expect(TokenKind::Colon, "expected ':' after condition")?;
        let span = Self::union_spans(
            &Self::span_from_token(&keyword_token),
            &Self::span_from_token(&colon),
        );
        let consequent = self.parse_suite()?;

        let alternative = match self.peek_kind() {
            TokenKind::Keyword(Keyword::Elif) => Some(Block {
                statements: vec![self.parse_conditional(ConditionalKind::Elif)?],
            }),
            TokenKind::Keyword(Keyword::Else) => {
                self.advance();
                self.expect(TokenKind::Colon, "expected ':' after 'else'")?;
                Some(self.parse_suite()?)
            }
            _ => None,
        };

        Ok(Statement::Conditional(ConditionalStatement {
            span,
            kind,
            condition,
            consequent,
            alternative,
        }))
    }

    fn parse_return(&mut self) -> Result<Statement> {
        let return_token = self.advance(); // consume 'return'
        let mut span = Self::span_from_token(&return_token);
        let expression = if self.at_simple_statement_end() {
            None
        } else {
            let expression = self.parse_expression_list()?;
            span = Self::union_spans(&span, &expression.span);
            Some(expression)
        };
        self.finish_simple_statement()?;
        Ok(Statement::Return(ReturnStatement { span, expression }))
    }

    fn parse_expression_statement(&mut self) -> Result<Statement> {
        let first = self.parse_expression_list()?;

        if self.match_kind(&TokenKind::Colon) {
            let annotation = self.parse_expression()?;
            let value = if self.match_kind(&TokenKind::Equal) {
                Some(self.parse_expression_list()?)
            } else {
                None
            };
            let end = value.as_ref().map(|v| v.span).unwrap_or(annotation.span);
            self.finish_simple_statement()?;
            return Ok(Statement::Assignment(AssignmentStatement {
                span: Self::union_spans(&first.span, &end),
                targets: vec![first],
                annotation: Some(annotation),
                value,
            }));
        }

        if self.check(&TokenKind::AugmentedAssign) {
            self.advance();
            let value = self.parse_expression_list()?;
            self.finish_simple_statement()?;
            return Ok(Statement::Unsupported(UnsupportedStatement {
                span: Self::union_spans(&first.span, &value.span),
                construct: "augmented assignment".to_string(),
            }));
        }

        if self.check(&TokenKind::Equal) {
            let mut chain = vec![first];
            while self.match_kind(&TokenKind::Equal) {
                chain.push(self.parse_expression_list()?);
            }
            self.finish_simple_statement()?;
            let value = chain
                .pop()
                .ok_or_else(|| anyhow!("assignment without a value"))?;
            let span = Self::union_spans(&chain[0].span, &value.span);
            return Ok(Statement::Assignment(AssignmentStatement {
                span,
                targets: chain,
                annotation: None,
                value: Some(value),
            }));
        }

        self.finish_simple_statement()?;
        Ok(Statement::Expression(ExpressionStatement { expression: first }))
    }

    fn parse_suite(&mut self) -> Result<Block> {
        let mut statements = Vec::new();

        if !self.check(&TokenKind::Newline) {
            // Simple statements on the header line, e.g. `if x: return 1`.
            loop {
                statements.push(self.parse_statement()?);
                if matches!(self.previous().kind, TokenKind::Newline) || self.is_at_end() {
                    break;
                }
            }
            return Ok(Block { statements });
        }

        self.advance(); // consume newline
        self.skip_newlines();
        self.expect(TokenKind::Indent, "expected an indented block")?;
        loop {
            self.skip_newlines();
            if matches!(self.peek_kind(), TokenKind::Dedent | TokenKind::Eof) {
                break;
            }
            statements.push(self.parse_statement()?);
        }
        self.match_kind(&TokenKind::Dedent);

        Ok(Block { statements })
    }

    fn skip_unsupported_statement(&mut self, keyword: Keyword) -> Result<Statement> {
        let start = self.advance();
        let compound = matches!(
            keyword,
            Keyword::For
                | Keyword::While
                | Keyword::Class
                | Keyword::Try
                | Keyword::Except
                | Keyword::Finally
                | Keyword::With
                | Keyword::Async
                | Keyword::Else
                | Keyword::Elif
        );

        if compound {
            self.skip_to_line_end();
            self.consume_newline();
            if self.check(&TokenKind::Indent) {
                self.skip_indented_block();
            }
        } else {
            while !self.at_simple_statement_end() {
                self.advance();
            }
            self.finish_simple_statement()?;
        }

        Ok(Statement::Unsupported(UnsupportedStatement {
            span: Self::span_from_token(&start),
            construct: format!("'{}' statement", start.lexeme),
        }))
    }

    fn skip_indented_block(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                TokenKind::Indent => depth += 1,
                TokenKind::Dedent => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                TokenKind::Eof => return,
                _ => {}
            }
            self.advance();
        }
    }

    fn skip_to_line_end(&mut self) {
        while !matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Eof) {
            self.advance();
        }
    }

    fn consume_newline(&mut self) {
        self.match_kind(&TokenKind::Newline);
    }

    fn at_simple_statement_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof
        )
    }

    fn finish_simple_statement(&mut self) -> Result<()> {
        if self.match_kind(&TokenKind::Semicolon) {
            self.consume_newline();
            return Ok(());
        }
        match self.peek_kind() {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof => Ok(()),
            _ => Err(self.error_at_current("expected end of statement")),
        }
    }

    /// `a, b, c` without brackets forms a tuple.
    fn parse_expression_list(&mut self) -> Result<Expression> {
        let first = self.parse_expression()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut elements = vec![first];
        while self.match_kind(&TokenKind::Comma) {
            if !self.starts_expression() {
                break;
            }
            elements.push(self.parse_expression()?);
        }
        let span = elements
            .iter()
            .fold(SourceSpan::default(), |acc, e| Self::union_spans(&acc, &e.span));
        Ok(Self::make_expression(
            span,
            ExpressionKind::Tuple(ListLiteral { elements }),
        ))
    }

    fn parse_expression(&mut self) -> Result<Expression> {
        if self.check(&TokenKind::Keyword(Keyword::Lambda)) {
            return self.parse_lambda();
        }

        let expression = self.parse_precedence(Precedence::Lowest)?;
        if self.check(&TokenKind::Keyword(Keyword::If)) {
            self.advance();
            self.parse_precedence(Precedence::Lowest)?;
            self.expect(
                TokenKind::Keyword(Keyword::Else),
                "expected 'else' in conditional expression",
            )?;
            let otherwise = self.parse_expression()?;
            let span = Self::union_spans(&expression.span, &otherwise.span);
            return Ok(Self::unsupported(span, "conditional expression"));
        }
        if self.check(&TokenKind::ColonEqual) {
            self.advance();
            let value = self.parse_expression()?;
            let span = Self::union_spans(&expression.span, &value.span);
            return Ok(Self::unsupported(span, "assignment expression"));
        }
        Ok(expression)
    }

    fn parse_lambda(&mut self) -> Result<Expression> {
        let lambda_token = self.advance(); // consume 'lambda'
        while !self.check(&TokenKind::Colon) {
            if self.is_at_end() {
                return Err(self.error_at_current("expected ':' in lambda"));
            }
            self.advance();
        }
        self.advance(); // consume ':'
        let body = self.parse_expression()?;
        let span = Self::union_spans(&Self::span_from_token(&lambda_token), &body.span);
        Ok(Self::unsupported(span, "lambda"))
    }

    fn parse_precedence(&mut self, precedence: Precedence) -> Result<Expression> {
        let mut left = self.parse_prefix()?;

        while let Some(next) = Precedence::of(self.peek_kind()) {
            if next <= precedence {
                break;
            }
            // `not` only continues an expression as part of `not in`.
            if self.check(&TokenKind::Keyword(Keyword::Not))
                && !matches!(self.peek_nth_kind(1), TokenKind::Keyword(Keyword::In))
            {
                break;
            }
            let operator = self.parse_binary_operator()?;
            let right = if operator == BinaryOperator::Power {
                self.parse_precedence(Precedence::Unary)?
            } else {
                self.parse_precedence(next)?
            };
            let span = Self::union_spans(&left.span, &right.span);
            left = Self::make_expression(
                span,
                ExpressionKind::Binary(BinaryExpression {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                }),
            );
        }

        Ok(left)
    }

    fn parse_binary_operator(&mut self) -> Result<BinaryOperator> {
        let token = self.advance();
        let operator = match token.kind {
            TokenKind::Keyword(Keyword::Or) => BinaryOperator::Or,
            TokenKind::Keyword(Keyword::And) => BinaryOperator::And,
            TokenKind::DoubleEqual => BinaryOperator::Equal,
            TokenKind::BangEqual => BinaryOperator::NotEqual,
            TokenKind::Greater => BinaryOperator::Greater,
            TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
            TokenKind::Less => BinaryOperator::Less,
            TokenKind::LessEqual => BinaryOperator::LessEqual,
            TokenKind::Keyword(Keyword::In) => BinaryOperator::In,
            TokenKind::Keyword(Keyword::Not) => {
                self.expect(TokenKind::Keyword(Keyword::In), "expected 'in' after 'not'")?;
                BinaryOperator::NotIn
            }
            TokenKind::Keyword(Keyword::Is) => {
                if self.match_kind(&TokenKind::Keyword(Keyword::Not)) {
                    BinaryOperator::IsNot
                } else {
                    BinaryOperator::Is
                }
            }
            TokenKind::Pipe => BinaryOperator::BitOr,
            TokenKind::Caret => BinaryOperator::BitXor,
            TokenKind::Ampersand => BinaryOperator::BitAnd,
            TokenKind::LessLess => BinaryOperator::ShiftLeft,
            TokenKind::GreaterGreater => BinaryOperator::ShiftRight,
            TokenKind::Plus => BinaryOperator::Add,
            TokenKind::Minus => BinaryOperator::Subtract,
            TokenKind::Star => BinaryOperator::Multiply,
            TokenKind::Slash => BinaryOperator::Divide,
            TokenKind::DoubleSlash => BinaryOperator::FloorDivide,
            TokenKind::Percent => BinaryOperator::Modulo,
            TokenKind::At => BinaryOperator::MatrixMultiply,
            TokenKind::DoubleStar => BinaryOperator::Power,
            _ => bail!(
                "expected binary operator, found '{}' at line {}, column {}",
                token.lexeme,
                token.line,
                token.column
            ),
        };
        Ok(operator)
    }

    fn parse_prefix(&mut self) -> Result<Expression> {
        let token = self.peek().clone();
        let span = Self::span_from_token(&token);

        let expression = match &token.kind {
            TokenKind::Identifier => {
                self.advance();
                Self::make_expression(
                    span,
                    ExpressionKind::Identifier(Identifier {
                        name: token.lexeme.clone(),
                        span,
                    }),
                )
            }
            TokenKind::IntegerLiteral(value) => {
                self.advance();
                Self::make_expression(span, ExpressionKind::Literal(Literal::Integer(*value)))
            }
            TokenKind::FloatLiteral(value) => {
                self.advance();
                Self::make_expression(span, ExpressionKind::Literal(Literal::Float(*value)))
            }
            TokenKind::ImaginaryLiteral(value) => {
                self.advance();
                Self::make_expression(span, ExpressionKind::Literal(Literal::Imaginary(*value)))
            }
            TokenKind::StringLiteral(_) | TokenKind::BytesLiteral(_) => {
                self.parse_string_concatenation()?
            }
            TokenKind::Minus | TokenKind::Plus | TokenKind::Tilde => {
                self.advance();
                let operator = match token.kind {
                    TokenKind::Minus => UnaryOperator::Negative,
                    TokenKind::Plus => UnaryOperator::Positive,
                    _ => UnaryOperator::Invert,
                };
                let operand = self.parse_precedence(Precedence::Unary)?;
                self.make_unary(span, operator, operand)
            }
            TokenKind::Keyword(Keyword::Not) => {
                self.advance();
                let operand = self.parse_precedence(Precedence::Not)?;
                self.make_unary(span, UnaryOperator::Not, operand)
            }
            TokenKind::Keyword(Keyword::Await) => {
                self.advance();
                let operand = self.parse_precedence(Precedence::Unary)?;
                Self::unsupported(Self::union_spans(&span, &operand.span), "await expression")
            }
            TokenKind::Keyword(Keyword::Yield) => {
                self.advance();
                self.match_kind(&TokenKind::Keyword(Keyword::From));
                let mut yield_span = span;
                if self.starts_expression() {
                    let value = self.parse_expression_list()?;
                    yield_span = Self::union_spans(&span, &value.span);
                }
                Self::unsupported(yield_span, "yield expression")
            }
            TokenKind::Star | TokenKind::DoubleStar => {
                self.advance();
                let operand = self.parse_precedence(Precedence::BitOr)?;
                Self::unsupported(Self::union_spans(&span, &operand.span), "starred expression")
            }
            TokenKind::Ellipsis => {
                self.advance();
                Self::unsupported(span, "ellipsis")
            }
            TokenKind::LParen => self.parse_parenthesized()?,
            TokenKind::LBracket => self.parse_list_literal()?,
            TokenKind::LBrace => self.parse_brace_literal()?,
            _ => {
                return Err(self.error_at_current(&format!(
                    "unexpected '{}' in expression",
                    token.lexeme.escape_debug()
                )))
            }
        };

        self.parse_postfix(expression)
    }

    fn make_unary(
        &self,
        span: SourceSpan,
        operator: UnaryOperator,
        operand: Expression,
    ) -> Expression {
        Self::make_expression(
            Self::union_spans(&span, &operand.span),
            ExpressionKind::Unary(UnaryExpression {
                operator,
                operand: Box::new(operand),
            }),
        )
    }

    fn parse_string_concatenation(&mut self) -> Result<Expression> {
        let first = self.advance();
        let mut span = Self::span_from_token(&first);
        let (mut text, bytes) = match first.kind {
            TokenKind::StringLiteral(value) => (value, false),
            TokenKind::BytesLiteral(value) => (value, true),
            _ => bail!("expected string literal"),
        };

        while let TokenKind::StringLiteral(value) | TokenKind::BytesLiteral(value) =
            self.peek_kind().clone()
        {
            let token = self.advance();
            span = Self::union_spans(&span, &Self::span_from_token(&token));
            text.push_str(&value);
        }

        let literal = if bytes {
            Literal::Bytes(text)
        } else {
            Literal::String(text)
        };
        Ok(Self::make_expression(span, ExpressionKind::Literal(literal)))
    }

    fn parse_parenthesized(&mut self) -> Result<Expression> {
        let open = self.advance(); // consume '('
        let open_span = Self::span_from_token(&open);

        if self.check(&TokenKind::RParen) {
            let close = self.advance();
            return Ok(Self::make_expression(
                Self::union_spans(&open_span, &Self::span_from_token(&close)),
                ExpressionKind::Tuple(ListLiteral {
                    elements: Vec::new(),
                }),
            ));
        }

        let first = self.parse_expression()?;
        if self.check(&TokenKind::Keyword(Keyword::For)) {
            self.skip_until_closer()?;
            let close = self.expect(TokenKind::RParen, "expected ')' after generator")?;
            return Ok(Self::unsupported(
                Self::union_spans(&open_span, &Self::span_from_token(&close)),
                "generator expression",
            ));
        }

        if !self.check(&TokenKind::Comma) {
            let close = self.expect(TokenKind::RParen, "expected ')' after expression")?;
            let span = Self::union_spans(&open_span, &Self::span_from_token(&close));
            return Ok(Self::make_expression(span, first.kind));
        }

        let mut elements = vec![first];
        while self.match_kind(&TokenKind::Comma) {
            if self.check(&TokenKind::RParen) {
                break;
            }
            elements.push(self.parse_expression()?);
        }
        let close = self.expect(TokenKind::RParen, "expected ')' after tuple")?;
        Ok(Self::make_expression(
            Self::union_spans(&open_span, &Self::span_from_token(&close)),
            ExpressionKind::Tuple(ListLiteral { elements }),
        ))
    }

    fn parse_list_literal(&mut self) -> Result<Expression> {
        let open = self.advance(); // consume '['
        let open_span = Self::span_from_token(&open);
        let mut elements = Vec::new();

        if !self.check(&TokenKind::RBracket) {
            let first = self.parse_expression()?;
            if self.check(&TokenKind::Keyword(Keyword::For)) {
                self.skip_until_closer()?;
                let close = self.expect(TokenKind::RBracket, "expected ']' after comprehension")?;
                return Ok(Self::unsupported(
                    Self::union_spans(&open_span, &Self::span_from_token(&close)),
                    "list comprehension",
                ));
            }
            elements.push(first);
            while self.match_kind(&TokenKind::Comma) {
                if self.check(&TokenKind::RBracket) {
                    break;
                }
                elements.push(self.parse_expression()?);
            }
        }

        let close = self.expect(TokenKind::RBracket, "expected ']' after list elements")?;
        Ok(Self::make_expression(
            Self::union_spans(&open_span, &Self::span_from_token(&close)),
            ExpressionKind::List(ListLiteral { elements }),
        ))
    }

    fn parse_brace_literal(&mut self) -> Result<Expression> {
        let open = self.advance(); // consume '{'
        let open_span = Self::span_from_token(&open);

        if let Some(close) = self.take(&TokenKind::RBrace) {
            return Ok(Self::make_expression(
                Self::union_spans(&open_span, &Self::span_from_token(&close)),
                ExpressionKind::Dict(DictLiteral {
                    entries: Vec::new(),
                }),
            ));
        }

        let first = self.parse_expression()?;
        if !self.check(&TokenKind::Colon) {
            // Set literal, set comprehension or `**mapping` unpacking.
            self.skip_until_closer()?;
            let close = self.expect(TokenKind::RBrace, "expected '}' after set elements")?;
            return Ok(Self::unsupported(
                Self::union_spans(&open_span, &Self::span_from_token(&close)),
                "set literal",
            ));
        }

        self.advance(); // consume ':'
        let value = self.parse_expression()?;
        if self.check(&TokenKind::Keyword(Keyword::For)) {
            self.skip_until_closer()?;
            let close = self.expect(TokenKind::RBrace, "expected '}' after comprehension")?;
            return Ok(Self::unsupported(
                Self::union_spans(&open_span, &Self::span_from_token(&close)),
                "dict comprehension",
            ));
        }

        let mut entries = vec![DictEntry { key: first, value }];
        while self.match_kind(&TokenKind::Comma) {
            if self.check(&TokenKind::RBrace) {
                break;
            }
            if self.check(&TokenKind::DoubleStar) {
                self.skip_until_closer()?;
                let close = self.expect(TokenKind::RBrace, "expected '}' after dict entries")?;
                return Ok(Self::unsupported(
                    Self::union_spans(&open_span, &Self::span_from_token(&close)),
                    "dict unpacking",
                ));
            }
            let key = self.parse_expression()?;
            self.expect(TokenKind::Colon, "expected ':' after dict key")?;
            let value = self.parse_expression()?;
            entries.push(DictEntry { key, value });
        }

        let close = self.expect(TokenKind::RBrace, "expected '}' after dict entries")?;
        Ok(Self::make_expression(
            Self::union_spans(&open_span, &Self::span_from_token(&close)),
            ExpressionKind::Dict(DictLiteral { entries }),
        ))
    }

    fn parse_postfix(&mut self, mut expression: Expression) -> Result<Expression> {
        loop {
            match self.peek_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let arguments = self.parse_call_arguments()?;
                    let close = self.expect(TokenKind::RParen, "expected ')' after arguments")?;
                    let span =
                        Self::union_spans(&expression.span, &Self::span_from_token(&close));
                    expression = Self::make_expression(
                        span,
                        ExpressionKind::Call(CallExpression {
                            callee: Box::new(expression),
                            arguments,
                        }),
                    );
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_subscript()?;
                    let close = self.expect(TokenKind::RBracket, "expected ']' after index")?;
                    let span =
                        Self::union_spans(&expression.span, &Self::span_from_token(&close));
                    expression = Self::make_expression(
                        span,
                        ExpressionKind::Index(IndexExpression {
                            object: Box::new(expression),
                            index: Box::new(index),
                        }),
                    );
                }
                TokenKind::Dot => {
                    self.advance();
                    let property = self.expect_identifier("expected attribute name after '.'")?;
                    let property_span = Self::span_from_token(&property);
                    let span = Self::union_spans(&expression.span, &property_span);
                    expression = Self::make_expression(
                        span,
                        ExpressionKind::Member(MemberExpression {
                            object: Box::new(expression),
                            property: property.lexeme,
                            property_span,
                        }),
                    );
                }
                _ => return Ok(expression),
            }
        }
    }

    fn parse_subscript(&mut self) -> Result<Expression> {
        let start = self.peek().clone();
        if self.check(&TokenKind::Colon) {
            self.skip_until_closer()?;
            return Ok(Self::unsupported(Self::span_from_token(&start), "slice"));
        }

        let index = self.parse_expression_list()?;
        if self.check(&TokenKind::Colon) {
            self.skip_until_closer()?;
            return Ok(Self::unsupported(index.span, "slice"));
        }
        Ok(index)
    }

    fn parse_call_arguments(&mut self) -> Result<Vec<CallArgument>> {
        let mut arguments = Vec::new();

        while !self.check(&TokenKind::RParen) {
            let is_keyword = matches!(self.peek_kind(), TokenKind::Identifier)
                && matches!(self.peek_nth_kind(1), TokenKind::Equal);

            if is_keyword {
                let name = self.advance();
                self.advance(); // consume '='
                let expression = self.parse_expression()?;
                arguments.push(CallArgument {
                    name: Some(name.lexeme.clone()),
                    name_span: Some(Self::span_from_token(&name)),
                    expression,
                });
            } else {
                let expression = self.parse_expression()?;
                if self.check(&TokenKind::Keyword(Keyword::For)) {
                    let span = expression.span;
                    self.skip_until_closer()?;
                    arguments.push(CallArgument {
                        name: None,
                        name_span: None,
                        expression: Self::unsupported(span, "generator expression"),
                    });
                    break;
                }
                arguments.push(CallArgument {
                    name: None,
                    name_span: None,
                    expression,
                });
            }

            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }

        Ok(arguments)
    }

    /// Skips to the closing bracket of the current nesting level without consuming it.
    fn skip_until_closer(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                }
                TokenKind::Eof => return Err(self.error_at_current("unclosed bracket")),
                _ => {}
            }
            self.advance();
        }
    }

    fn starts_expression(&self) -> bool {
        !matches!(
            self.peek_kind(),
            TokenKind::Newline
                | TokenKind::Semicolon
                | TokenKind::Eof
                | TokenKind::Equal
                | TokenKind::AugmentedAssign
                | TokenKind::Colon
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::Indent
                | TokenKind::Dedent
        )
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(message))
        }
    }

    fn expect_identifier(&mut self, message: &str) -> Result<Token> {
        if matches!(self.peek_kind(), TokenKind::Identifier) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(message))
        }
    }

    fn error_at_current(&self, message: &str) -> anyhow::Error {
        let token = self.peek();
        anyhow!(
            "{} at line {}, column {}",
            message,
            token.line,
            token.column
        )
    }

    fn skip_newlines(&mut self) {
        while self.match_kind(&TokenKind::Newline) || self.match_kind(&TokenKind::Semicolon) {}
    }

    fn take(&mut self, kind: &TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn match_kind(&mut self, kind: &TokenKind) -> bool {
        self.take(kind).is_some()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
            && match (self.peek_kind(), kind) {
                (TokenKind::Keyword(a), TokenKind::Keyword(b)) => a == b,
                _ => true,
            }
    }

    fn peek(&self) -> &Token {
        let index = self.current.min(self.tokens.len().saturating_sub(1));
        &self.tokens[index]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_nth_kind(&self, offset: usize) -> &TokenKind {
        let index = (self.current + offset).min(self.tokens.len().saturating_sub(1));
        &self.tokens[index].kind
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }
}
