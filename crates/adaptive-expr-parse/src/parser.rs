use std::error::Error;
use std::fmt::{self, Display};

use adaptive_expr_common::Value;

use crate::ast::AstNode;
use crate::tokenizer::{TemplatePart, Token, Tokenizer, TokenizerError};

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub pos: usize,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at char {})", self.message, self.pos)
    }
}

impl Error for ParseError {}

impl From<TokenizerError> for ParseError {
    fn from(e: TokenizerError) -> Self {
        ParseError {
            message: e.message,
            pos: e.pos,
        }
    }
}

/// Recursive-descent parser over the flat token stream: one method per
/// precedence level, falling through to the next-tighter level when no
/// operator at the current level matches.
pub struct Parser<'a> {
    src: &'a str,
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Result<Self, ParseError> {
        let tokens = Tokenizer::new(src).tokenize()?;
        Ok(Parser {
            src,
            tokens,
            pos: 0,
        })
    }

    pub fn parse(mut self) -> Result<AstNode, ParseError> {
        let node = self.parse_or()?;
        self.expect_eof()?;
        Ok(node)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    fn peek_pos(&self) -> usize {
        self.tokens[self.pos].1
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos].0.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn text_from(&self, start: usize) -> String {
        let end = self.peek_pos().min(self.src.chars().count());
        self.src
            .chars()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect::<String>()
            .trim()
            .to_string()
    }

    fn expect_eof(&mut self) -> Result<(), ParseError> {
        if matches!(self.peek(), Token::Eof) {
            Ok(())
        } else {
            Err(ParseError {
                message: format!("unexpected trailing token {:?}", self.peek()),
                pos: self.peek_pos(),
            })
        }
    }

    fn expect(&mut self, want: &Token) -> Result<(), ParseError> {
        if self.peek() == want {
            self.bump();
            Ok(())
        } else {
            Err(ParseError {
                message: format!("expected {:?}, found {:?}", want, self.peek()),
                pos: self.peek_pos(),
            })
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.bump() {
            Token::Ident(name) => Ok(name),
            other => Err(ParseError {
                message: format!("expected identifier, found {other:?}"),
                pos: self.peek_pos(),
            }),
        }
    }

    // ---- precedence climbing, loosest to tightest ----

    fn parse_or(&mut self) -> Result<AstNode, ParseError> {
        let start = self.peek_pos();
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Token::Op(op) if op == "||") {
            self.bump();
            let rhs = self.parse_and()?;
            lhs = AstNode::call("or", vec![lhs, rhs], self.text_from(start));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<AstNode, ParseError> {
        let start = self.peek_pos();
        let mut lhs = self.parse_comparison()?;
        while matches!(self.peek(), Token::Op(op) if op == "&&") {
            self.bump();
            let rhs = self.parse_comparison()?;
            lhs = AstNode::call("and", vec![lhs, rhs], self.text_from(start));
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<AstNode, ParseError> {
        let start = self.peek_pos();
        let mut lhs = self.parse_additive()?;
        loop {
            let name = match self.peek() {
                Token::Op(op) if op == "==" => "equals",
                Token::Op(op) if op == "!=" => "notEquals",
                Token::Op(op) if op == "<=" => "lessOrEquals",
                Token::Op(op) if op == ">=" => "greaterOrEquals",
                Token::Op(op) if op == "<" => "less",
                Token::Op(op) if op == ">" => "greater",
                _ => break,
            };
            self.bump();
            let rhs = self.parse_additive()?;
            lhs = AstNode::call(name, vec![lhs, rhs], self.text_from(start));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<AstNode, ParseError> {
        let start = self.peek_pos();
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let name = match self.peek() {
                Token::Op(op) if op == "+" => "add",
                Token::Op(op) if op == "-" => "sub",
                Token::Op(op) if op == "&" => "concat",
                _ => break,
            };
            self.bump();
            let rhs = self.parse_multiplicative()?;
            lhs = AstNode::call(name, vec![lhs, rhs], self.text_from(start));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<AstNode, ParseError> {
        let start = self.peek_pos();
        let mut lhs = self.parse_unary()?;
        loop {
            let name = match self.peek() {
                Token::Op(op) if op == "*" => "mul",
                Token::Op(op) if op == "/" => "div",
                Token::Op(op) if op == "%" => "mod",
                _ => break,
            };
            self.bump();
            let rhs = self.parse_unary()?;
            lhs = AstNode::call(name, vec![lhs, rhs], self.text_from(start));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<AstNode, ParseError> {
        let start = self.peek_pos();
        match self.peek() {
            Token::Op(op) if op == "-" => {
                self.bump();
                let operand = self.parse_unary()?;
                Ok(AstNode::call("negate", vec![operand], self.text_from(start)))
            }
            Token::Op(op) if op == "!" => {
                self.bump();
                let operand = self.parse_unary()?;
                Ok(AstNode::call("not", vec![operand], self.text_from(start)))
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<AstNode, ParseError> {
        let start = self.peek_pos();
        let base = self.parse_postfix()?;
        if matches!(self.peek(), Token::Op(op) if op == "^") {
            self.bump();
            // right associative: the exponent itself may contain further `^`
            let exponent = self.parse_unary()?;
            Ok(AstNode::call("exp", vec![base, exponent], self.text_from(start)))
        } else {
            Ok(base)
        }
    }

    // ---- postfix: dotted/indexed accessor chains and calls ----

    fn parse_postfix(&mut self) -> Result<AstNode, ParseError> {
        let start = self.peek_pos();
        let mut node = self.parse_primary()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.bump();
                    let name = self.expect_ident()?;
                    node = AstNode::call(
                        "accessor",
                        vec![AstNode::literal(Value::String(name), ""), node],
                        self.text_from(start),
                    );
                }
                Token::LBracket => {
                    self.bump();
                    let index = self.parse_or()?;
                    self.expect(&Token::RBracket)?;
                    node = AstNode::call("element", vec![node, index], self.text_from(start));
                }
                _ => break,
            }
        }
        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<AstNode, ParseError> {
        let start = self.peek_pos();
        match self.peek().clone() {
            Token::Number(n, is_integer) => {
                self.bump();
                let v = if is_integer && n.fract() == 0.0 {
                    Value::Int(n as i64)
                } else {
                    Value::Number(n)
                };
                Ok(AstNode::literal(v, self.text_from(start)))
            }
            Token::String(s) => {
                self.bump();
                Ok(AstNode::literal(Value::String(s), self.text_from(start)))
            }
            Token::TemplateString(parts) => {
                self.bump();
                self.build_template(parts, self.text_from(start))
            }
            Token::True => {
                self.bump();
                Ok(AstNode::literal(Value::Boolean(true), self.text_from(start)))
            }
            Token::False => {
                self.bump();
                Ok(AstNode::literal(Value::Boolean(false), self.text_from(start)))
            }
            Token::Null => {
                self.bump();
                Ok(AstNode::literal(Value::Null, self.text_from(start)))
            }
            Token::LBracket => self.parse_array_literal(),
            Token::LBrace => self.parse_object_literal(),
            Token::LParen => self.parse_paren_or_lambda(),
            Token::Ident(name) => {
                self.bump();
                if matches!(self.peek(), Token::Arrow) {
                    self.bump();
                    let body = self.parse_or()?;
                    return Ok(AstNode::lambda(name, body, self.text_from(start)));
                }
                if matches!(self.peek(), Token::LParen) {
                    let args = self.parse_call_args()?;
                    Ok(AstNode::call(name, args, self.text_from(start)))
                } else {
                    Ok(AstNode::call(
                        "accessor",
                        vec![AstNode::literal(Value::String(name), "")],
                        self.text_from(start),
                    ))
                }
            }
            other => Err(ParseError {
                message: format!("unexpected token {other:?}"),
                pos: start,
            }),
        }
    }

    fn parse_paren_or_lambda(&mut self) -> Result<AstNode, ParseError> {
        let start = self.peek_pos();
        // lookahead for `( ident ) =>`
        let is_lambda = matches!(
            (
                self.tokens.get(self.pos + 1).map(|(t, _)| t),
                self.tokens.get(self.pos + 2).map(|(t, _)| t),
                self.tokens.get(self.pos + 3).map(|(t, _)| t),
            ),
            (Some(Token::Ident(_)), Some(Token::RParen), Some(Token::Arrow))
        );
        if is_lambda {
            {
                self.bump(); // (
                let name = self.expect_ident()?;
                self.expect(&Token::RParen)?;
                self.expect(&Token::Arrow)?;
                let body = self.parse_or()?;
                return Ok(AstNode::lambda(name, body, self.text_from(start)));
            }
        }
        self.bump(); // (
        let inner = self.parse_or()?;
        self.expect(&Token::RParen)?;
        Ok(inner)
    }

    fn parse_call_args(&mut self) -> Result<Vec<AstNode>, ParseError> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if !matches!(self.peek(), Token::RParen) {
            loop {
                args.push(self.parse_or()?);
                if matches!(self.peek(), Token::Comma) {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        self.expect(&Token::RParen)?;
        Ok(args)
    }

    fn parse_array_literal(&mut self) -> Result<AstNode, ParseError> {
        let start = self.peek_pos();
        self.expect(&Token::LBracket)?;
        let mut items = Vec::new();
        if !matches!(self.peek(), Token::RBracket) {
            loop {
                items.push(self.parse_or()?);
                if matches!(self.peek(), Token::Comma) {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        self.expect(&Token::RBracket)?;
        Ok(AstNode::call("createArray", items, self.text_from(start)))
    }

    /// `{'k': v, ...}` parses to a `json` node: alternating literal-key,
    /// value children, built the same shape `createArray`'s variadic
    /// children use so the evaluator can fold them pairwise.
    fn parse_object_literal(&mut self) -> Result<AstNode, ParseError> {
        let start = self.peek_pos();
        self.expect(&Token::LBrace)?;
        let mut children = Vec::new();
        if !matches!(self.peek(), Token::RBrace) {
            loop {
                let key_pos = self.peek_pos();
                let key = match self.bump() {
                    Token::String(s) => s,
                    Token::Ident(s) => s,
                    other => {
                        return Err(ParseError {
                            message: format!("expected object key, found {other:?}"),
                            pos: key_pos,
                        });
                    }
                };
                self.expect(&Token::Colon)?;
                let value = self.parse_or()?;
                children.push(AstNode::literal(Value::String(key), ""));
                children.push(value);
                if matches!(self.peek(), Token::Comma) {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        self.expect(&Token::RBrace)?;
        Ok(AstNode::call("json", children, self.text_from(start)))
    }

    fn build_template(
        &self,
        parts: Vec<TemplatePart>,
        source_text: String,
    ) -> Result<AstNode, ParseError> {
        let mut children = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                TemplatePart::Text(t) => children.push(AstNode::literal(Value::String(t), "")),
                TemplatePart::Splice(src) => {
                    let sub = Parser::new(&src)?.parse()?;
                    children.push(sub);
                }
            }
        }
        if children.len() == 1 && children[0].expr_type == "literal" {
            return Ok(AstNode::literal(
                children.remove(0).literal.unwrap(),
                source_text,
            ));
        }
        Ok(AstNode::call("concat", children, source_text))
    }
}
