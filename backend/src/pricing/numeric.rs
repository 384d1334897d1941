//! Price string parsing
//!
//! Spreadsheet exports quote prices as `"1,090.00"`, `"$350"`, `"TTD 95"`, and
//! sometimes as a formula such as `"390*1.308"` (list price times markup).

use once_cell::sync::Lazy;
use regex::Regex;

static FORMULA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d.\s/*+\-]+$").expect("valid formula regex"));
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\d.]+").expect("valid number regex"));

/// Parse a listed price.
///
/// Currency symbols, `TTD` and thousands separators are stripped. A residue
/// made only of digits, dots, whitespace and `+-*/` is evaluated as an
/// arithmetic expression; otherwise the last number-like token wins. Returns
/// `None` when nothing numeric is found.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned = raw.replace([',', '$'], "").replace("TTD", "");
    let s = cleaned.trim();
    if s.is_empty() {
        return None;
    }

    if s.contains(['/', '*', '+', '-']) && FORMULA_RE.is_match(s) {
        if let Some(value) = eval_expression(s) {
            return Some(value);
        }
    }

    NUMBER_RE
        .find_iter(s)
        .last()
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Op(char),
}

fn tokenize(expr: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut literal = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    literal.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Num(literal.parse().ok()?));
        } else if matches!(c, '+' | '-' | '*' | '/') {
            tokens.push(Token::Op(c));
            chars.next();
        } else {
            return None;
        }
    }
    Some(tokens)
}

/// Evaluate `+-*/` with the usual precedence and unary signs. Anything else,
/// including division by zero, yields `None`.
fn eval_expression(expr: &str) -> Option<f64> {
    let tokens = tokenize(expr)?;
    let mut pos = 0;
    let value = parse_sum(&tokens, &mut pos)?;
    if pos != tokens.len() || !value.is_finite() {
        return None;
    }
    Some(value)
}

fn parse_sum(tokens: &[Token], pos: &mut usize) -> Option<f64> {
    let mut acc = parse_product(tokens, pos)?;
    while let Some(Token::Op(op @ ('+' | '-'))) = tokens.get(*pos).copied() {
        *pos += 1;
        let rhs = parse_product(tokens, pos)?;
        acc = if op == '+' { acc + rhs } else { acc - rhs };
    }
    Some(acc)
}

fn parse_product(tokens: &[Token], pos: &mut usize) -> Option<f64> {
    let mut acc = parse_unary(tokens, pos)?;
    while let Some(Token::Op(op @ ('*' | '/'))) = tokens.get(*pos).copied() {
        *pos += 1;
        let rhs = parse_unary(tokens, pos)?;
        if op == '*' {
            acc *= rhs;
        } else {
            if rhs == 0.0 {
                return None;
            }
            acc /= rhs;
        }
    }
    Some(acc)
}

fn parse_unary(tokens: &[Token], pos: &mut usize) -> Option<f64> {
    match tokens.get(*pos).copied()? {
        Token::Op('-') => {
            *pos += 1;
            parse_unary(tokens, pos).map(|v| -v)
        }
        Token::Op('+') => {
            *pos += 1;
            parse_unary(tokens, pos)
        }
        Token::Num(v) => {
            *pos += 1;
            Some(v)
        }
        Token::Op(_) => None,
    }
}
