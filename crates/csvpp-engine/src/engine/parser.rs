//! Recursive descent parsers for the code section and for cell formulas.
//!
//! GRAMMAR (shared expression rules, lowest precedence first):
//!   code_section   --> definition*
//!   definition     --> IDENT ":=" expression
//!                    | "def" IDENT "(" (IDENT ("," IDENT)*)? ")" expression
//!   formula        --> "=" expression
//!   expression     --> comparison
//!   comparison     --> concatenation (("=" | "<>" | "<" | ">" | "<=" | ">=") concatenation)*
//!   concatenation  --> additive ("&" additive)*
//!   additive       --> multiplicative (("+" | "-") multiplicative)*
//!   multiplicative --> power (("*" | "/") power)*
//!   power          --> unary ("^" unary)*
//!   unary          --> ("-" | "+") unary | primary
//!   primary        --> NUMBER | STRING | BOOLEAN | DATE | CELL_REF | "$$" IDENT
//!                    | IDENT "(" arguments? ")" | IDENT | "(" expression ")"
//!
//! Bare identifiers become [`Entity::Reference`]s in both grammars: whether
//! `a1` is a variable or a cell is only known once the scope is, so that
//! decision belongs to the resolver.

use chrono::NaiveDate;

use super::entity::{CellReference, Entity, Function};
use super::error::{EngineError, Result};
use super::lexer::{Grammar, tokenize};
use super::token::{Token, TokenKind};

/// Definitions found in a code section, in source order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CodeSection {
    pub variables: Vec<(String, Entity)>,
    pub functions: Vec<Function>,
}

/// Parse the code section of a source file.
pub fn parse_code_section(input: &str) -> Result<CodeSection> {
    Parser::new(input, Grammar::CodeSection)?.parse_code_section()
}

/// Parse a cell formula. The text must start with `=`.
pub fn parse_formula(input: &str) -> Result<Entity> {
    let Some(body) = input.trim_start().strip_prefix('=') else {
        return Err(EngineError::syntax("a formula must start with `=`", input, 0));
    };
    let mut parser = Parser::new(body, Grammar::CellFormula)?;
    if parser.current().kind == TokenKind::Eof {
        return Err(parser.error("empty formula"));
    }
    let expression = parser.parse_expression()?;
    parser.expect_end()?;
    Ok(expression)
}

pub struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str, grammar: Grammar) -> Result<Self> {
        Ok(Parser {
            input,
            tokens: tokenize(input, grammar)?,
            pos: 0,
        })
    }

    fn current(&self) -> &Token {
        // The stream always ends with Eof and `advance` never steps past it.
        &self.tokens[self.pos]
    }

    fn peek(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> EngineError {
        EngineError::syntax(message, self.input, self.current().offset)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        if self.current().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error(format!("expected {}, found {}", what, self.current())))
        }
    }

    fn expect_end(&self) -> Result<()> {
        if self.current().kind == TokenKind::Eof {
            Ok(())
        } else {
            Err(self.error(format!("unexpected {} after expression", self.current())))
        }
    }

    pub fn parse_code_section(&mut self) -> Result<CodeSection> {
        let mut section = CodeSection::default();
        loop {
            let kind = self.current().kind;
            match kind {
                TokenKind::Eof => break,
                TokenKind::Def => section.functions.push(self.parse_function_definition()?),
                TokenKind::Identifier if self.peek().kind == TokenKind::Assign => {
                    let id = self.advance().text.to_lowercase();
                    self.advance();
                    let value = self.parse_expression()?;
                    section.variables.push((id, value));
                }
                _ => {
                    return Err(self.error(format!(
                        "expected a variable or function definition, found {}",
                        self.current()
                    )));
                }
            }
        }
        Ok(section)
    }

    fn parse_function_definition(&mut self) -> Result<Function> {
        self.expect(TokenKind::Def, "`def`")?;
        let id = self.expect(TokenKind::Identifier, "a function name")?.text;
        self.expect(TokenKind::LParen, "`(`")?;

        let mut arguments: Vec<String> = Vec::new();
        if self.current().kind != TokenKind::RParen {
            loop {
                let name = self.expect(TokenKind::Identifier, "an argument name")?;
                let folded = name.text.to_lowercase();
                if arguments.contains(&folded) {
                    return Err(EngineError::syntax(
                        format!("duplicate argument `{}` in function {}", name.text, id),
                        self.input,
                        name.offset,
                    ));
                }
                arguments.push(folded);
                if self.current().kind != TokenKind::Comma {
                    break;
                }
                self.advance();
            }
        }
        self.expect(TokenKind::RParen, "`)`")?;

        let body = self.parse_expression()?;
        Ok(Function::new(&id, arguments, body))
    }

    pub fn parse_expression(&mut self) -> Result<Entity> {
        self.parse_comparison()
    }

    /// One left-associative precedence level.
    fn parse_binary(
        &mut self,
        operators: &[&str],
        operand: fn(&mut Self) -> Result<Entity>,
    ) -> Result<Entity> {
        let mut left = operand(self)?;
        while self.current().kind == TokenKind::Operator
            && operators.contains(&self.current().text.as_str())
        {
            let operator = self.advance().text;
            let right = operand(self)?;
            left = Entity::infix(&operator, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Entity> {
        self.parse_binary(&["=", "<>", "<", ">", "<=", ">="], Self::parse_concatenation)
    }

    fn parse_concatenation(&mut self) -> Result<Entity> {
        self.parse_binary(&["&"], Self::parse_additive)
    }

    fn parse_additive(&mut self) -> Result<Entity> {
        self.parse_binary(&["+", "-"], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> Result<Entity> {
        self.parse_binary(&["*", "/"], Self::parse_power)
    }

    fn parse_power(&mut self) -> Result<Entity> {
        self.parse_binary(&["^"], Self::parse_unary)
    }

    // Negation binds tighter than `^`: `-2^2` is `(-2)^2`.
    fn parse_unary(&mut self) -> Result<Entity> {
        if self.current().is(TokenKind::Operator, "-") {
            self.advance();
            return Ok(match self.parse_unary()? {
                Entity::Number(n) => Entity::Number(-n),
                operand => Entity::prefix("-", operand),
            });
        }
        if self.current().is(TokenKind::Operator, "+") {
            self.advance();
            return self.parse_unary();
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Entity> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                token
                    .text
                    .parse::<f64>()
                    .map(Entity::Number)
                    .map_err(|e| EngineError::syntax(format!("invalid number: {e}"), self.input, token.offset))
            }
            TokenKind::String => {
                self.advance();
                let inner = &token.text[1..token.text.len() - 1];
                Ok(Entity::String(inner.replace("\"\"", "\"")))
            }
            TokenKind::Boolean => {
                self.advance();
                Ok(Entity::Boolean(token.text.eq_ignore_ascii_case("true")))
            }
            TokenKind::Date => {
                self.advance();
                NaiveDate::parse_from_str(&token.text, "%Y-%m-%d")
                    .map(Entity::Date)
                    .map_err(|e| EngineError::syntax(format!("invalid date: {e}"), self.input, token.offset))
            }
            TokenKind::CellRef => {
                self.advance();
                CellReference::parse(&token.text)
                    .map(Entity::CellReference)
                    .map_err(|e| EngineError::syntax(e.to_string(), self.input, token.offset))
            }
            TokenKind::Variable => {
                self.advance();
                Ok(Entity::reference(&token.text[2..]))
            }
            TokenKind::Identifier => {
                self.advance();
                if self.current().kind == TokenKind::LParen {
                    self.advance();
                    let arguments = self.parse_arguments()?;
                    Ok(Entity::function_call(&token.text, arguments))
                } else {
                    Ok(Entity::reference(&token.text))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            _ => Err(self.error(format!("unexpected {}", token))),
        }
    }

    /// Arguments after an opening paren, consuming the closing one.
    fn parse_arguments(&mut self) -> Result<Vec<Entity>> {
        let mut arguments = Vec::new();
        if self.current().kind == TokenKind::RParen {
            self.advance();
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_expression()?);
            let kind = self.current().kind;
            match kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {
                    self.advance();
                    return Ok(arguments);
                }
                _ => {
                    return Err(self.error(format!(
                        "expected `,` or `)` in argument list, found {}",
                        self.current()
                    )));
                }
            }
        }
    }
}
