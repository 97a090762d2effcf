// ABOUTME: Restricted XPath 1.0 subset compiled to location steps and evaluated over a scraper tree.
// ABOUTME: Supports / and // steps, name tests, positional and attribute/text predicates.

//! XPath subset for the `xpath` selector kind.
//!
//! Grammar (whitespace between tokens is ignored):
//!
//! ```text
//! path       := ('/' | '//') step (('/' | '//') step)*
//! step       := (NAME | '*') ('[' or_expr ']')*
//! or_expr    := and_expr ('or' and_expr)*
//! and_expr   := term ('and' term)*
//! term       := NUMBER | 'last()' | '(' or_expr ')' | 'not(' or_expr ')'
//!             | 'contains(' value ',' value ')' | 'starts-with(' value ',' value ')'
//!             | value (('=' | '!=') value)?
//! value      := LITERAL | NUMBER | '@' NAME | 'text()' | '.'
//!             | 'normalize-space(' value? ')' | 'concat(' value (',' value)+ ')'
//! ```
//!
//! Only elements are selected. Axes, unions, parent steps and node-selecting
//! `text()` steps are rejected when the expression is compiled.

use std::collections::HashSet;
use std::fmt;

use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Html, Node};

use crate::error::CaptureError;

/// A compiled XPath location path.
#[derive(Debug, Clone, PartialEq)]
pub struct XPath {
    source: String,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq)]
enum NodeTest {
    Any,
    Name(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Literal(String),
    Number(f64),
    Attr(String),
    Text,
    Context,
    NormalizeSpace(Box<Value>),
    Concat(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Position(usize),
    Last,
    Exists(Value),
    Equals(Value, Value),
    NotEquals(Value, Value),
    Contains(Value, Value),
    StartsWith(Value, Value),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl XPath {
    /// Compile an expression. Unsupported syntax is an `invalid_selector` error.
    pub fn parse(source: &str) -> Result<Self, CaptureError> {
        let steps = tokenize(source)
            .and_then(|tokens| Parser { tokens, pos: 0 }.parse_path())
            .map_err(|msg| {
                CaptureError::invalid_selector(source, "XPath", Some(anyhow::anyhow!(msg)))
            })?;
        Ok(Self {
            source: source.to_string(),
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluate against a parsed document, returning matches in document order.
    pub fn select<'a>(&self, doc: &'a Html) -> Vec<ElementRef<'a>> {
        let mut context: Vec<NodeRef<'a, Node>> = vec![doc.tree.root()];

        for step in &self.steps {
            let parents = match step.axis {
                Axis::Child => context,
                Axis::Descendant => descendant_or_self(&context),
            };

            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for parent in parents {
                let candidates: Vec<ElementRef<'a>> = parent
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|el| step.test.matches(el))
                    .collect();
                for el in step.filter(candidates) {
                    let node: NodeRef<'a, Node> = *el;
                    if seen.insert(node.id()) {
                        next.push(node);
                    }
                }
            }

            context = next;
            if context.is_empty() {
                break;
            }
        }

        let matched: HashSet<NodeId> = context.iter().map(|n| n.id()).collect();
        doc.tree
            .root()
            .descendants()
            .filter(|n| matched.contains(&n.id()))
            .filter_map(ElementRef::wrap)
            .collect()
    }
}

impl fmt::Display for XPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn descendant_or_self<'a>(nodes: &[NodeRef<'a, Node>]) -> Vec<NodeRef<'a, Node>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for node in nodes {
        for d in node.descendants() {
            if seen.insert(d.id()) {
                out.push(d);
            }
        }
    }
    out
}

impl NodeTest {
    fn matches(&self, el: &ElementRef) -> bool {
        match self {
            NodeTest::Any => true,
            NodeTest::Name(name) => el.value().name().eq_ignore_ascii_case(name),
        }
    }
}

impl Step {
    /// Apply predicates in order; positions are relative to the list each predicate sees.
    fn filter<'a>(&self, mut candidates: Vec<ElementRef<'a>>) -> Vec<ElementRef<'a>> {
        for pred in &self.predicates {
            let size = candidates.len();
            candidates = candidates
                .into_iter()
                .enumerate()
                .filter(|(i, el)| pred.matches(el, i + 1, size))
                .map(|(_, el)| el)
                .collect();
        }
        candidates
    }
}

/// An evaluated predicate operand.
///
/// `@name`, `text()` and `.` are node-sets: a missing attribute or an element
/// without text children is an empty set, which never compares true.
#[derive(Debug)]
enum Operand {
    Nodes(Vec<String>),
    Str(String),
    Num(f64),
}

impl Operand {
    fn truthy(&self) -> bool {
        match self {
            Operand::Nodes(nodes) => !nodes.is_empty(),
            Operand::Str(s) => !s.is_empty(),
            Operand::Num(n) => *n != 0.0 && !n.is_nan(),
        }
    }

    fn number(&self) -> f64 {
        match self {
            Operand::Num(n) => *n,
            Operand::Str(s) => to_number(s),
            Operand::Nodes(nodes) => nodes.first().map_or(f64::NAN, |s| to_number(s)),
        }
    }
}

/// XPath `number()` of a string: optional minus, digits and one dot; anything else is NaN.
fn to_number(s: &str) -> f64 {
    let t = s.trim();
    let digits = t.strip_prefix('-').unwrap_or(t);
    let valid = digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1;
    if valid {
        t.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// `=` / `!=` with XPath 1.0 rules: node-sets compare existentially, and a
/// number on either side makes the comparison numeric.
fn compare(left: &Operand, right: &Operand, equal: bool) -> bool {
    match (left, right) {
        (Operand::Nodes(xs), other) => xs
            .iter()
            .any(|x| compare(&Operand::Str(x.clone()), other, equal)),
        (other, Operand::Nodes(ys)) => ys
            .iter()
            .any(|y| compare(other, &Operand::Str(y.clone()), equal)),
        (Operand::Num(x), other) | (other, Operand::Num(x)) => {
            let y = other.number();
            if equal {
                *x == y
            } else {
                *x != y
            }
        }
        (Operand::Str(x), Operand::Str(y)) => (x == y) == equal,
    }
}

fn text_nodes(el: &ElementRef) -> Vec<String> {
    el.children()
        .filter_map(|child| child.value().as_text())
        .map(|text| text.text.to_string())
        .collect()
}

impl Value {
    fn operand(&self, el: &ElementRef) -> Operand {
        match self {
            Value::Attr(name) => {
                Operand::Nodes(el.value().attr(name).map(str::to_string).into_iter().collect())
            }
            Value::Text => Operand::Nodes(text_nodes(el)),
            Value::Context => Operand::Nodes(vec![el.text().collect()]),
            Value::Number(n) => Operand::Num(*n),
            other => Operand::Str(other.string(el)),
        }
    }

    /// String value; a node-set yields its first node.
    fn string(&self, el: &ElementRef) -> String {
        match self {
            Value::Literal(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Attr(name) => el.value().attr(name).unwrap_or_default().to_string(),
            Value::Text => text_nodes(el).into_iter().next().unwrap_or_default(),
            Value::Context => el.text().collect(),
            Value::NormalizeSpace(inner) => inner
                .string(el)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" "),
            Value::Concat(parts) => parts.iter().map(|p| p.string(el)).collect(),
        }
    }
}

impl Expr {
    fn matches(&self, el: &ElementRef, position: usize, size: usize) -> bool {
        match self {
            Expr::Position(n) => position == *n,
            Expr::Last => position == size,
            Expr::Exists(v) => v.operand(el).truthy(),
            Expr::Equals(a, b) => compare(&a.operand(el), &b.operand(el), true),
            Expr::NotEquals(a, b) => compare(&a.operand(el), &b.operand(el), false),
            Expr::Contains(a, b) => a.string(el).contains(&b.string(el)),
            Expr::StartsWith(a, b) => a.string(el).starts_with(&b.string(el)),
            Expr::Not(inner) => !inner.matches(el, position, size),
            Expr::And(l, r) => l.matches(el, position, size) && r.matches(el, position, size),
            Expr::Or(l, r) => l.matches(el, position, size) || r.matches(el, position, size),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Star,
    Dot,
    Comma,
    Eq,
    NotEq,
    Name(String),
    Literal(String),
    Number(usize),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Slash => f.write_str("'/'"),
            Token::DoubleSlash => f.write_str("'//'"),
            Token::LBracket => f.write_str("'['"),
            Token::RBracket => f.write_str("']'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::At => f.write_str("'@'"),
            Token::Star => f.write_str("'*'"),
            Token::Dot => f.write_str("'.'"),
            Token::Comma => f.write_str("','"),
            Token::Eq => f.write_str("'='"),
            Token::NotEq => f.write_str("'!='"),
            Token::Name(n) => write!(f, "'{}'", n),
            Token::Literal(s) => write!(f, "\"{}\"", s),
            Token::Number(n) => write!(f, "{}", n),
        }
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '/' => {
                if chars.get(i + 1) == Some(&'/') {
                    tokens.push(Token::DoubleSlash);
                    i += 2;
                } else {
                    tokens.push(Token::Slash);
                    i += 1;
                }
            }
            '[' | ']' | '(' | ')' | '@' | '*' | ',' | '=' => {
                tokens.push(match c {
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '@' => Token::At,
                    '*' => Token::Star,
                    ',' => Token::Comma,
                    _ => Token::Eq,
                });
                i += 1;
            }
            '!' => {
                if chars.get(i + 1) != Some(&'=') {
                    return Err("unexpected '!'".to_string());
                }
                tokens.push(Token::NotEq);
                i += 2;
            }
            '.' => {
                if chars.get(i + 1) == Some(&'.') {
                    return Err("parent steps ('..') are not supported".to_string());
                }
                tokens.push(Token::Dot);
                i += 1;
            }
            '"' | '\'' => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|&ch| ch == c)
                    .map(|offset| start + offset)
                    .ok_or_else(|| "unterminated string literal".to_string())?;
                tokens.push(Token::Literal(chars[start..end].iter().collect()));
                i = end + 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let digits: String = chars[start..i].iter().collect();
                let n = digits
                    .parse::<usize>()
                    .map_err(|_| format!("number out of range: {}", digits))?;
                tokens.push(Token::Number(n));
            }
            c if is_name_start(c) => {
                let start = i;
                while i < chars.len() && is_name_char(chars[i]) {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                if name.contains("::") {
                    return Err(format!("axes are not supported: {}", name));
                }
                tokens.push(Token::Name(name));
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.advance() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(format!("expected {}, found {}", expected, tok)),
            None => Err(format!("expected {}, found end of expression", expected)),
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Name(n)) if n == keyword)
    }

    /// True when the next tokens are `name(`.
    fn peek_call(&self, name: &str) -> bool {
        self.peek_keyword(name) && self.tokens.get(self.pos + 1) == Some(&Token::LParen)
    }

    fn parse_path(mut self) -> Result<Vec<Step>, String> {
        let mut steps = Vec::new();
        while let Some(tok) = self.advance() {
            let axis = match tok {
                Token::Slash => Axis::Child,
                Token::DoubleSlash => Axis::Descendant,
                other if steps.is_empty() => {
                    return Err(format!("expression must start with '/', found {}", other));
                }
                other => return Err(format!("unexpected {} after step", other)),
            };
            steps.push(self.parse_step(axis)?);
        }

        if steps.is_empty() {
            return Err("empty expression".to_string());
        }
        Ok(steps)
    }

    fn parse_step(&mut self, axis: Axis) -> Result<Step, String> {
        let test = match self.advance() {
            Some(Token::Star) => NodeTest::Any,
            Some(Token::Name(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    return Err(format!("node test {}() is not supported", name));
                }
                NodeTest::Name(name.to_ascii_lowercase())
            }
            Some(other) => return Err(format!("expected an element name, found {}", other)),
            None => return Err("expression ends with a separator".to_string()),
        };

        let mut predicates = Vec::new();
        while self.peek() == Some(&Token::LBracket) {
            self.advance();
            predicates.push(self.parse_or()?);
            self.expect(Token::RBracket)?;
        }

        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while self.peek_keyword("or") {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_term()?;
        while self.peek_keyword("and") {
            self.advance();
            let right = self.parse_term()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, String> {
        if let Some(Token::Number(n)) = self.peek() {
            let n = *n;
            if !matches!(self.tokens.get(self.pos + 1), Some(Token::Eq | Token::NotEq)) {
                self.advance();
                return Ok(Expr::Position(n));
            }
        }

        if self.peek_call("last") {
            self.advance();
            self.expect(Token::LParen)?;
            self.expect(Token::RParen)?;
            return Ok(Expr::Last);
        }

        if self.peek() == Some(&Token::LParen) {
            self.advance();
            let inner = self.parse_or()?;
            self.expect(Token::RParen)?;
            return Ok(inner);
        }

        if self.peek_call("not") {
            self.advance();
            self.expect(Token::LParen)?;
            let inner = self.parse_or()?;
            self.expect(Token::RParen)?;
            return Ok(Expr::Not(Box::new(inner)));
        }

        for func in ["contains", "starts-with"] {
            if self.peek_call(func) {
                self.advance();
                self.expect(Token::LParen)?;
                let haystack = self.parse_value()?;
                self.expect(Token::Comma)?;
                let needle = self.parse_value()?;
                self.expect(Token::RParen)?;
                return Ok(if func == "contains" {
                    Expr::Contains(haystack, needle)
                } else {
                    Expr::StartsWith(haystack, needle)
                });
            }
        }

        let left = self.parse_value()?;
        match self.peek() {
            Some(Token::Eq) => {
                self.advance();
                Ok(Expr::Equals(left, self.parse_value()?))
            }
            Some(Token::NotEq) => {
                self.advance();
                Ok(Expr::NotEquals(left, self.parse_value()?))
            }
            _ => Ok(Expr::Exists(left)),
        }
    }

    fn parse_value(&mut self) -> Result<Value, String> {
        if self.peek_call("text") {
            self.advance();
            self.expect(Token::LParen)?;
            self.expect(Token::RParen)?;
            return Ok(Value::Text);
        }

        if self.peek_call("normalize-space") {
            self.advance();
            self.expect(Token::LParen)?;
            if self.peek() == Some(&Token::RParen) {
                self.advance();
                return Ok(Value::NormalizeSpace(Box::new(Value::Context)));
            }
            let inner = self.parse_value()?;
            self.expect(Token::RParen)?;
            return Ok(Value::NormalizeSpace(Box::new(inner)));
        }

        if self.peek_call("concat") {
            self.advance();
            self.expect(Token::LParen)?;
            let mut parts = vec![self.parse_value()?];
            while self.peek() == Some(&Token::Comma) {
                self.advance();
                parts.push(self.parse_value()?);
            }
            self.expect(Token::RParen)?;
            if parts.len() < 2 {
                return Err("concat() needs at least two arguments".to_string());
            }
            return Ok(Value::Concat(parts));
        }

        match self.advance() {
            Some(Token::Literal(s)) => Ok(Value::Literal(s)),
            Some(Token::Number(n)) => Ok(Value::Number(n as f64)),
            Some(Token::Dot) => Ok(Value::Context),
            Some(Token::At) => match self.advance() {
                Some(Token::Name(name)) => Ok(Value::Attr(name.to_ascii_lowercase())),
                Some(other) => Err(format!("expected an attribute name, found {}", other)),
                None => Err("expected an attribute name after '@'".to_string()),
            },
            Some(Token::Name(name)) => Err(format!("unsupported expression '{}'", name)),
            Some(other) => Err(format!("unexpected {} in predicate", other)),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}
