//! Plural-Forms rule extraction, sanitization, parsing and evaluation.
//!
//! Catalog metadata carries a C-style expression choosing a plural form
//! from a count `n`, e.g. for Polish:
//! `nplurals=3; plural=(n==1 ? 0 : n%10>=2 && n%10<=4 && (n%100<10 || n%100>=20) ? 1 : 2);`
//!
//! The expression comes from file content, so it is never handed to any
//! dynamic evaluation facility. It is stripped down to a safe character
//! set, re-parenthesized, and run through a small hand-written
//! lexer/parser/AST evaluator restricted to integer arithmetic,
//! comparisons, `&&`/`||`, `%` and the ternary operator.

use std::iter::Peekable;
use std::str::Chars;
use std::sync::OnceLock;

use log::warn;
use regex::Regex;

use super::error::{MoError, Result};

/// The standard two-form English rule, used whenever a catalog carries no
/// usable Plural-Forms header.
pub const DEFAULT_PLURAL_FORMS: &str = "nplurals=2; plural=n==1?0:1;";

/// A parsed, ready-to-evaluate plural rule.
#[derive(Debug, Clone)]
pub struct PluralRule {
    /// Number of plural forms the language distinguishes.
    pub nplurals: usize,
    expr: Expr,
}

impl PluralRule {
    /// Build a rule from the catalog's metadata entry (the `key: value`
    /// header stored as entry 0's translation).
    ///
    /// Never fails: a missing `Plural-Forms` line or an unparseable
    /// expression falls back to the default English rule.
    pub fn from_metadata(metadata: &str) -> Self {
        let raw = extract_plural_forms(metadata);
        match Self::parse(&raw) {
            Ok(rule) => rule,
            Err(e) => {
                warn!("Falling back to default plural rule: {}", e);
                Self::parse(DEFAULT_PLURAL_FORMS)
                    .unwrap_or(Self {
                        nplurals: 2,
                        expr: Expr::BinaryOp(
                            Box::new(Expr::N),
                            BinaryOp::Ne,
                            Box::new(Expr::Literal(1)),
                        ),
                    })
            }
        }
    }

    /// Parse a raw `nplurals=N; plural=EXPR;` rule string.
    pub fn parse(raw: &str) -> Result<Self> {
        let sanitized = sanitize_expression(raw);

        let mut nplurals = None;
        let mut expr = None;
        for part in sanitized.split(';') {
            if let Some(val) = part.strip_prefix("nplurals=") {
                nplurals = val.parse::<usize>().ok();
            } else if let Some(val) = part.strip_prefix("plural=") {
                expr = Some(Parser::new(val)?.parse()?);
            }
        }

        match (nplurals, expr) {
            (Some(nplurals), Some(expr)) if nplurals > 0 => Ok(Self { nplurals, expr }),
            _ => Err(MoError::PluralParse(format!(
                "missing nplurals or plural in {:?}",
                raw
            ))),
        }
    }

    /// Select the plural-form index for a quantity.
    ///
    /// The result is clamped into `[0, nplurals - 1]`; a rule can never
    /// send a lookup out of range.
    pub fn select(&self, n: u64) -> usize {
        let index = self.expr.evaluate(n) as usize;
        index.min(self.nplurals - 1)
    }
}

/// Pull the `plural-forms:` line out of a catalog metadata header,
/// case-insensitively. Absent lines yield the default English rule.
fn extract_plural_forms(metadata: &str) -> String {
    static PLURAL_FORMS_LINE: OnceLock<Regex> = OnceLock::new();
    let re = PLURAL_FORMS_LINE
        .get_or_init(|| Regex::new(r"(?im)^plural-forms:[ \t]*(.*)$").unwrap());

    match re.captures(metadata) {
        Some(caps) => caps[1].to_string(),
        None => DEFAULT_PLURAL_FORMS.to_string(),
    }
}

/// Strip an expression down to the safe character set and fully
/// parenthesize its ternaries.
///
/// After each `?` a `(` is opened, each `:` becomes `):(`, and each `;`
/// closes every paren still open. The rewritten form nests ternaries
/// explicitly, so evaluation order no longer depends on the grammar's
/// ternary associativity.
fn sanitize_expression(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    let mut open = 0usize;

    let filtered = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || "_:;()?|&=!<>+*/%-".contains(*c));

    for ch in filtered.chain(std::iter::once(';')) {
        match ch {
            '?' => {
                out.push_str("?(");
                open += 1;
            }
            ':' => out.push_str("):("),
            ';' => {
                for _ in 0..open {
                    out.push(')');
                }
                out.push(';');
                open = 0;
            }
            _ => out.push(ch),
        }
    }
    out
}

/// A parsed plural expression.
#[derive(Debug, Clone, PartialEq)]
enum Expr {
    /// The count variable `n`.
    N,
    /// A numeric literal.
    Literal(u64),
    BinaryOp(Box<Expr>, BinaryOp, Box<Expr>),
    /// `condition ? if_true : if_false`
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
}

impl Expr {
    /// Evaluate with the given count. Comparison and logical operators
    /// yield 0 or 1; division and modulo by zero yield 0 so no catalog
    /// content can make evaluation fail.
    fn evaluate(&self, n: u64) -> u64 {
        match self {
            Expr::N => n,
            Expr::Literal(v) => *v,
            Expr::BinaryOp(left, op, right) => {
                let l = left.evaluate(n);
                let r = right.evaluate(n);
                match op {
                    BinaryOp::Eq => u64::from(l == r),
                    BinaryOp::Ne => u64::from(l != r),
                    BinaryOp::Lt => u64::from(l < r),
                    BinaryOp::Le => u64::from(l <= r),
                    BinaryOp::Gt => u64::from(l > r),
                    BinaryOp::Ge => u64::from(l >= r),
                    BinaryOp::Add => l.saturating_add(r),
                    BinaryOp::Sub => l.saturating_sub(r),
                    BinaryOp::Mul => l.saturating_mul(r),
                    BinaryOp::Div => l.checked_div(r).unwrap_or(0),
                    BinaryOp::Mod => l.checked_rem(r).unwrap_or(0),
                    BinaryOp::And => u64::from(l != 0 && r != 0),
                    BinaryOp::Or => u64::from(l != 0 || r != 0),
                }
            }
            Expr::Ternary(cond, if_true, if_false) => {
                if cond.evaluate(n) != 0 {
                    if_true.evaluate(n)
                } else {
                    if_false.evaluate(n)
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    N,
    Number(u64),
    LParen,
    RParen,
    Question,
    Colon,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    And,
    Or,
    Eof,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer {
            chars: input.chars().peekable(),
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        match self.chars.peek().copied() {
            None | Some(';') => Ok(Token::Eof),
            Some(c) => match c {
                'n' => {
                    self.chars.next();
                    Ok(Token::N)
                }
                '0'..='9' => self.read_number(),
                '(' => self.single(Token::LParen),
                ')' => self.single(Token::RParen),
                '?' => self.single(Token::Question),
                ':' => self.single(Token::Colon),
                '+' => self.single(Token::Plus),
                '-' => self.single(Token::Minus),
                '*' => self.single(Token::Star),
                '/' => self.single(Token::Slash),
                '%' => self.single(Token::Percent),
                '=' => self.pair('=', Token::Eq),
                '!' => self.pair('=', Token::Ne),
                '&' => self.pair('&', Token::And),
                '|' => self.pair('|', Token::Or),
                '<' => self.maybe_eq(Token::Lt, Token::Le),
                '>' => self.maybe_eq(Token::Gt, Token::Ge),
                _ => Err(MoError::PluralParse(format!("unexpected character '{}'", c))),
            },
        }
    }

    fn single(&mut self, token: Token) -> Result<Token> {
        self.chars.next();
        Ok(token)
    }

    fn pair(&mut self, second: char, token: Token) -> Result<Token> {
        let first = self.chars.next();
        if self.chars.peek() == Some(&second) {
            self.chars.next();
            Ok(token)
        } else {
            Err(MoError::PluralParse(format!(
                "expected '{}' after '{}'",
                second,
                first.unwrap_or('?')
            )))
        }
    }

    fn maybe_eq(&mut self, bare: Token, with_eq: Token) -> Result<Token> {
        self.chars.next();
        if self.chars.peek() == Some(&'=') {
            self.chars.next();
            Ok(with_eq)
        } else {
            Ok(bare)
        }
    }

    fn read_number(&mut self) -> Result<Token> {
        let mut value: u64 = 0;
        while let Some(&c) = self.chars.peek() {
            if let Some(digit) = c.to_digit(10) {
                value = value.saturating_mul(10).saturating_add(digit as u64);
                self.chars.next();
            } else {
                break;
            }
        }
        Ok(Token::Number(value))
    }
}

/// Recursive-descent parser.
///
/// Precedence, lowest to highest: ternary, `||`, `&&`, `==`/`!=`,
/// relational, additive, multiplicative, primary.
struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Parser { lexer, current })
    }

    fn parse(&mut self) -> Result<Expr> {
        let expr = self.parse_ternary()?;
        if self.current != Token::Eof {
            return Err(MoError::PluralParse(format!(
                "trailing token {:?}",
                self.current
            )));
        }
        Ok(expr)
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        if self.current == expected {
            self.advance()
        } else {
            Err(MoError::PluralParse(format!(
                "expected {:?}, found {:?}",
                expected, self.current
            )))
        }
    }

    fn parse_ternary(&mut self) -> Result<Expr> {
        let cond = self.parse_or()?;
        if self.current == Token::Question {
            self.advance()?;
            let if_true = self.parse_ternary()?;
            self.expect(Token::Colon)?;
            let if_false = self.parse_ternary()?;
            Ok(Expr::Ternary(
                Box::new(cond),
                Box::new(if_true),
                Box::new(if_false),
            ))
        } else {
            Ok(cond)
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.current == Token::Or {
            self.advance()?;
            let right = self.parse_and()?;
            left = Expr::BinaryOp(Box::new(left), BinaryOp::Or, Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_equality()?;
        while self.current == Token::And {
            self.advance()?;
            let right = self.parse_equality()?;
            left = Expr::BinaryOp(Box::new(left), BinaryOp::And, Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.current {
                Token::Eq => BinaryOp::Eq,
                Token::Ne => BinaryOp::Ne,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_relational()?;
            left = Expr::BinaryOp(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current {
                Token::Lt => BinaryOp::Lt,
                Token::Le => BinaryOp::Le,
                Token::Gt => BinaryOp::Gt,
                Token::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_additive()?;
            left = Expr::BinaryOp(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = Expr::BinaryOp(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_primary()?;
        loop {
            let op = match self.current {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_primary()?;
            left = Expr::BinaryOp(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.current.clone() {
            Token::N => {
                self.advance()?;
                Ok(Expr::N)
            }
            Token::Number(v) => {
                self.advance()?;
                Ok(Expr::Literal(v))
            }
            Token::LParen => {
                self.advance()?;
                let expr = self.parse_ternary()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            other => Err(MoError::PluralParse(format!(
                "expected n, number or '(', found {:?}",
                other
            ))),
        }
    }
}
