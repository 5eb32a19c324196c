//! Boolean expressions for the `conditional` node.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! or       := and ( "||" and )*
//! and      := equality ( "&&" equality )*
//! equality := relation ( ( "==" | "!=" | "===" | "!==" ) relation )*
//! relation := unary ( ( "<" | "<=" | ">" | ">=" ) unary )*
//! unary    := ( "!" | "-" ) unary | primary
//! primary  := number | string | "true" | "false" | "null" | "undefined"
//!           | "data" accessor* | "(" or ")"
//! accessor := "." ident | "[" number "]" | "[" string "]"
//! ```
//!
//! `data` is the only bound variable. Expressions are parsed once into an
//! [`Expr`] tree and interpreted; nothing is ever compiled or executed.
//! Reading a property of `undefined` or `null` is an evaluation error.
//! Trees deeper than [`MAX_DEPTH`] are rejected at parse time.

use std::cmp::Ordering;

use serde_json::Value;

use crate::value::{compare, loose_equals, strict_equals, to_number, truthy};
use crate::NodeError;

const BOUND_VARIABLE: &str = "data";

/// Maximum nesting of parentheses, prefix operators and binary operators.
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Not,
    Minus,
    And,
    Or,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
    Key(String),
    Index(usize),
}

/// Parsed expression tree. A `Literal(None)` is `undefined`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Option<Value>),
    Data(Vec<Accessor>),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Logical {
        op: LogicalOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn parse(source: &str) -> Result<Self, NodeError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens, pos: 0, depth: 0 };
        let (expr, _) = parser.or()?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(syntax(format!("unexpected token {tok:?}"))),
        }
    }

    /// Evaluate with `data` bound to `data`. `Ok(None)` is `undefined`.
    pub fn evaluate(&self, data: Option<&Value>) -> Result<Option<Value>, NodeError> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Data(path) => {
                let mut current = data.cloned();
                for accessor in path {
                    current = match current.as_ref() {
                        None => return Err(unreadable(accessor, "undefined")),
                        Some(Value::Null) => return Err(unreadable(accessor, "null")),
                        Some(value) => access(value, accessor),
                    };
                }
                Ok(current)
            }
            Expr::Not(inner) => Ok(Some(Value::Bool(!truthy(inner.evaluate(data)?.as_ref())))),
            Expr::Neg(inner) => {
                let n = to_number(inner.evaluate(data)?.as_ref());
                Ok(n.map(|n| Value::from(-n)))
            }
            Expr::Logical { op, lhs, rhs } => {
                let left = lhs.evaluate(data)?;
                let short_circuits = match op {
                    LogicalOp::And => !truthy(left.as_ref()),
                    LogicalOp::Or => truthy(left.as_ref()),
                };
                if short_circuits {
                    Ok(left)
                } else {
                    rhs.evaluate(data)
                }
            }
            Expr::Compare { op, lhs, rhs } => {
                let left = lhs.evaluate(data)?;
                let right = rhs.evaluate(data)?;
                Ok(Some(Value::Bool(apply(*op, left.as_ref(), right.as_ref()))))
            }
        }
    }

    /// Evaluate and reduce to a boolean by truthiness.
    pub fn test(&self, data: Option<&Value>) -> Result<bool, NodeError> {
        Ok(truthy(self.evaluate(data)?.as_ref()))
    }
}

fn unreadable(accessor: &Accessor, target: &str) -> NodeError {
    let property = match accessor {
        Accessor::Key(k) => k.clone(),
        Accessor::Index(i) => i.to_string(),
    };
    NodeError::Expression(format!("cannot read property '{property}' of {target}"))
}

fn apply(op: CompareOp, a: Option<&Value>, b: Option<&Value>) -> bool {
    match op {
        CompareOp::Eq => loose_equals(a, b),
        CompareOp::NotEq => !loose_equals(a, b),
        CompareOp::StrictEq => strict_equals(a, b),
        CompareOp::StrictNotEq => !strict_equals(a, b),
        CompareOp::Lt => compare(a, b) == Some(Ordering::Less),
        CompareOp::Le => matches!(compare(a, b), Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Gt => compare(a, b) == Some(Ordering::Greater),
        CompareOp::Ge => matches!(compare(a, b), Some(Ordering::Greater | Ordering::Equal)),
    }
}

fn access(value: &Value, accessor: &Accessor) -> Option<Value> {
    match (value, accessor) {
        (Value::Array(items), Accessor::Key(k)) if k == "length" => Some(Value::from(items.len())),
        (Value::String(s), Accessor::Key(k)) if k == "length" => {
            Some(Value::from(s.chars().count()))
        }
        (Value::Object(map), Accessor::Key(k)) => map.get(k).cloned(),
        (Value::Object(map), Accessor::Index(i)) => map.get(&i.to_string()).cloned(),
        (Value::Array(items), Accessor::Index(i)) => items.get(*i).cloned(),
        _ => None,
    }
}

fn syntax(msg: impl Into<String>) -> NodeError {
    NodeError::Expression(msg.into())
}

fn within_depth(height: usize) -> Result<usize, NodeError> {
    if height > MAX_DEPTH {
        Err(syntax("expression nested too deeply"))
    } else {
        Ok(height)
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

fn tokenize(source: &str) -> Result<Vec<Token>, NodeError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '&' | '|' => {
                chars.next();
                if chars.next() != Some(ch) {
                    return Err(syntax(format!("expected '{ch}{ch}'")));
                }
                tokens.push(if ch == '&' { Token::And } else { Token::Or });
            }
            '=' | '!' => {
                chars.next();
                let mut eq_count = 0;
                while eq_count < 2 && chars.peek() == Some(&'=') {
                    chars.next();
                    eq_count += 1;
                }
                let token = match (ch, eq_count) {
                    ('!', 0) => Token::Not,
                    ('!', 1) => Token::NotEq,
                    ('!', _) => Token::StrictNotEq,
                    ('=', 1) => Token::Eq,
                    ('=', 2) => Token::StrictEq,
                    _ => return Err(syntax("assignment is not allowed")),
                };
                tokens.push(token);
            }
            '<' | '>' => {
                chars.next();
                let or_equal = chars.peek() == Some(&'=');
                if or_equal {
                    chars.next();
                }
                tokens.push(match (ch, or_equal) {
                    ('<', false) => Token::Lt,
                    ('<', true) => Token::Le,
                    (_, false) => Token::Gt,
                    (_, true) => Token::Ge,
                });
            }
            '\'' | '"' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == ch => break,
                        Some('\\') => match chars.next() {
                            Some(escaped) => s.push(escaped),
                            None => return Err(syntax("unterminated string literal")),
                        },
                        Some(c) => s.push(c),
                        None => return Err(syntax("unterminated string literal")),
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_ascii_digit() => {
                let mut num = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let n = num
                    .parse::<f64>()
                    .map_err(|_| syntax(format!("invalid number '{num}'")))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' || d == '$' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(syntax(format!("unexpected character '{other}'"))),
        }
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Every production returns the parsed tree with its height.
type Parsed = (Expr, usize);

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Current recursion depth through `unary`.
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: Token) -> Result<(), NodeError> {
        match self.next() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(syntax(format!("expected {expected:?}, found {tok:?}"))),
            None => Err(syntax(format!("expected {expected:?}, found end of expression"))),
        }
    }

    /// One left-associative precedence level.
    fn binary_level<Op>(
        &mut self,
        next: fn(&mut Self) -> Result<Parsed, NodeError>,
        op_for: fn(&Token) -> Option<Op>,
        build: fn(Op, Box<Expr>, Box<Expr>) -> Expr,
    ) -> Result<Parsed, NodeError> {
        let (mut lhs, mut height) = next(self)?;
        while let Some(op) = self.peek().and_then(op_for) {
            self.pos += 1;
            let (rhs, rhs_height) = next(self)?;
            height = within_depth(height.max(rhs_height) + 1)?;
            lhs = build(op, Box::new(lhs), Box::new(rhs));
        }
        Ok((lhs, height))
    }

    fn or(&mut self) -> Result<Parsed, NodeError> {
        self.binary_level(
            Self::and,
            |t| (*t == Token::Or).then_some(LogicalOp::Or),
            |op, lhs, rhs| Expr::Logical { op, lhs, rhs },
        )
    }

    fn and(&mut self) -> Result<Parsed, NodeError> {
        self.binary_level(
            Self::equality,
            |t| (*t == Token::And).then_some(LogicalOp::And),
            |op, lhs, rhs| Expr::Logical { op, lhs, rhs },
        )
    }

    fn equality(&mut self) -> Result<Parsed, NodeError> {
        self.binary_level(
            Self::relation,
            |t| match t {
                Token::Eq => Some(CompareOp::Eq),
                Token::NotEq => Some(CompareOp::NotEq),
                Token::StrictEq => Some(CompareOp::StrictEq),
                Token::StrictNotEq => Some(CompareOp::StrictNotEq),
                _ => None,
            },
            |op, lhs, rhs| Expr::Compare { op, lhs, rhs },
        )
    }

    fn relation(&mut self) -> Result<Parsed, NodeError> {
        self.binary_level(
            Self::unary,
            |t| match t {
                Token::Lt => Some(CompareOp::Lt),
                Token::Le => Some(CompareOp::Le),
                Token::Gt => Some(CompareOp::Gt),
                Token::Ge => Some(CompareOp::Ge),
                _ => None,
            },
            |op, lhs, rhs| Expr::Compare { op, lhs, rhs },
        )
    }

    /// Every nested production passes through here, so the depth check
    /// bounds the parser's own recursion.
    fn unary(&mut self) -> Result<Parsed, NodeError> {
        self.depth += 1;
        let parsed = within_depth(self.depth).and_then(|_| self.prefixed());
        self.depth -= 1;
        parsed
    }

    fn prefixed(&mut self) -> Result<Parsed, NodeError> {
        match self.peek() {
            Some(Token::Not) => {
                self.pos += 1;
                let (inner, height) = self.unary()?;
                Ok((Expr::Not(Box::new(inner)), within_depth(height + 1)?))
            }
            Some(Token::Minus) => {
                self.pos += 1;
                let (inner, height) = self.unary()?;
                Ok((Expr::Neg(Box::new(inner)), within_depth(height + 1)?))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Parsed, NodeError> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.or()?;
            self.expect(Token::RParen)?;
            return Ok(inner);
        }
        let leaf = match self.next() {
            Some(Token::Number(n)) => Expr::Literal(Some(Value::from(n))),
            Some(Token::Str(s)) => Expr::Literal(Some(Value::String(s))),
            Some(Token::Ident(ident)) => match ident.as_str() {
                "true" => Expr::Literal(Some(Value::Bool(true))),
                "false" => Expr::Literal(Some(Value::Bool(false))),
                "null" => Expr::Literal(Some(Value::Null)),
                "undefined" => Expr::Literal(None),
                BOUND_VARIABLE => Expr::Data(self.accessors()?),
                other => {
                    return Err(syntax(format!(
                        "unknown identifier '{other}'; only '{BOUND_VARIABLE}' is bound"
                    )))
                }
            },
            Some(tok) => return Err(syntax(format!("unexpected token {tok:?}"))),
            None => return Err(syntax("unexpected end of expression")),
        };
        Ok((leaf, 1))
    }

    fn accessors(&mut self) -> Result<Vec<Accessor>, NodeError> {
        let mut path = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    match self.next() {
                        Some(Token::Ident(name)) => path.push(Accessor::Key(name)),
                        _ => return Err(syntax("expected property name after '.'")),
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let accessor = match self.next() {
                        Some(Token::Number(n)) if n >= 0.0 && n.fract() == 0.0 => {
                            Accessor::Index(n as usize)
                        }
                        Some(Token::Str(key)) => Accessor::Key(key),
                        _ => return Err(syntax("expected index or quoted key inside '[]'")),
                    };
                    self.expect(Token::RBracket)?;
                    path.push(accessor);
                }
                _ => return Ok(path),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(src: &str, data: Value) -> bool {
        Expr::parse(src)
            .expect("should parse")
            .test(Some(&data))
            .expect("should evaluate")
    }

    #[test]
    fn comparisons_on_properties() {
        let data = json!({ "price": 15, "name": "widget" });
        assert!(eval("data.price > 10", data.clone()));
        assert!(!eval("data.price <= 10", data.clone()));
        assert!(eval("data.name === 'widget'", data.clone()));
        assert!(eval("data.name !== \"gadget\"", data));
    }

    #[test]
    fn boolean_operators_and_grouping() {
        let data = json!({ "a": true, "b": false, "n": 3 });
        assert!(eval("data.a && !data.b", data.clone()));
        assert!(eval("data.b || data.n == 3", data.clone()));
        assert!(!eval("!(data.a || data.b)", data.clone()));
        assert!(eval("data.n > 1 && data.n < 5 || data.b", data));
    }

    #[test]
    fn indexing_and_length() {
        let data = json!({ "items": [{ "ok": true }, { "ok": false }], "tag": "abc" });
        assert!(eval("data.items.length === 2", data.clone()));
        assert!(eval("data.items[0].ok", data.clone()));
        assert!(!eval("data.items[1]['ok']", data.clone()));
        assert!(eval("data.tag.length == 3", data));
        assert!(eval("data.length > 0", json!([1])));
    }

    #[test]
    fn missing_properties_are_undefined() {
        let data = json!({});
        assert!(eval("data.missing === undefined", data.clone()));
        assert!(eval("data.missing == null", data.clone()));
        assert!(!eval("data.missing > 0", data.clone()));
        assert!(!eval("data.missing && data.missing.deeper", data));
    }

    #[test]
    fn reading_through_undefined_or_null_fails() {
        let deeper = Expr::parse("data.missing.deeper").unwrap();
        let err = deeper.test(Some(&json!({}))).unwrap_err();
        assert_eq!(
            err,
            NodeError::Expression("cannot read property 'deeper' of undefined".into())
        );

        let indexed = Expr::parse("data.items[0] > 1").unwrap();
        assert!(indexed.test(Some(&json!({ "items": null }))).is_err());
        assert!(Expr::parse("data.total").unwrap().test(None).is_err());
        assert_eq!(Expr::parse("data === undefined").unwrap().test(None), Ok(true));
    }

    #[test]
    fn deep_nesting_is_rejected_without_overflowing() {
        let too_deep = NodeError::Expression("expression nested too deeply".into());
        let parens = format!("{}data{}", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(Expr::parse(&parens).unwrap_err(), too_deep);
        assert_eq!(Expr::parse(&format!("{}data", "!".repeat(100_000))).unwrap_err(), too_deep);
        let chain = vec!["data"; 100_000].join(" || ");
        assert_eq!(Expr::parse(&chain).unwrap_err(), too_deep);

        let nested = format!("{}data.ok{}", "(".repeat(32), ")".repeat(32));
        assert!(eval(&nested, json!({ "ok": true })));
        assert!(eval(&format!("{}data", "!".repeat(20)), json!(1)));
    }

    #[test]
    fn negative_numbers() {
        assert!(eval("data.delta < -1.5", json!({ "delta": -2 })));
    }

    #[test]
    fn unbound_identifiers_are_rejected() {
        let err = Expr::parse("process.exit").unwrap_err();
        assert!(matches!(err, NodeError::Expression(msg) if msg.contains("process")));
    }

    #[test]
    fn syntax_errors() {
        for src in ["data.a =", "data.a = 1", "(data.a", "data.", "data[x]", "'open", "data.a & b", ""] {
            assert!(Expr::parse(src).is_err(), "{src:?} should not parse");
        }
    }
}
