//! The algebra text syntax shared with model builders and deck emission:
//! space-separated signed integers intersect, `:` unions, parentheses
//! group. [`parse`] is the exact inverse of [`RuleTree::display`].

use crate::error::{ConstructionError, Result};

use super::rule::{BoolOp, RuleTree};
use super::SignedSurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Surface(SignedSurface),
    Colon,
    Open,
    Close,
}

fn unexpected(token: impl Into<String>) -> ConstructionError {
    ConstructionError::UnexpectedToken {
        token: token.into(),
        context: "algebra expression",
    }
}

fn lex(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            ':' => {
                chars.next();
                tokens.push(Token::Colon);
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '-' | '0'..='9' => {
                let mut word = String::new();
                word.push(c);
                chars.next();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        word.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value: SignedSurface =
                    word.parse().map_err(|_| unexpected(word.clone()))?;
                if value == 0 {
                    return Err(ConstructionError::ZeroSurfaceId.into());
                }
                tokens.push(Token::Surface(value));
            }
            other => return Err(unexpected(other.to_string()).into()),
        }
    }
    Ok(tokens)
}

/// Parses an algebra expression into a rule tree.
///
/// Grammar: `expr := term (':' term)*`, `term := factor+`,
/// `factor := SIGNED_INT | '(' expr ')'`.
///
/// # Errors
///
/// Returns an error naming the offending token for malformed input, and
/// rejects surface id 0 and empty expressions.
pub fn parse(text: &str) -> Result<RuleTree> {
    let tokens = lex(text)?;
    if tokens.is_empty() {
        return Err(ConstructionError::EmptyExpression.into());
    }
    let mut pos = 0;
    let tree = parse_expr(&tokens, &mut pos)?;
    if pos != tokens.len() {
        return Err(unexpected(describe(tokens.get(pos))).into());
    }
    Ok(tree)
}

fn describe(token: Option<&Token>) -> String {
    match token {
        None => "<end>".into(),
        Some(Token::Surface(s)) => s.to_string(),
        Some(Token::Colon) => ":".into(),
        Some(Token::Open) => "(".into(),
        Some(Token::Close) => ")".into(),
    }
}

fn parse_expr(tokens: &[Token], pos: &mut usize) -> Result<RuleTree> {
    let mut tree = parse_term(tokens, pos)?;
    while tokens.get(*pos) == Some(&Token::Colon) {
        *pos += 1;
        let rhs = parse_term(tokens, pos)?;
        tree = RuleTree::combine(BoolOp::Union, tree, rhs);
    }
    Ok(tree)
}

fn parse_term(tokens: &[Token], pos: &mut usize) -> Result<RuleTree> {
    let mut tree = parse_factor(tokens, pos)?;
    loop {
        match tokens.get(*pos) {
            Some(Token::Surface(_) | Token::Open) => {
                let rhs = parse_factor(tokens, pos)?;
                tree = RuleTree::combine(BoolOp::Intersection, tree, rhs);
            }
            _ => return Ok(tree),
        }
    }
}

fn parse_factor(tokens: &[Token], pos: &mut usize) -> Result<RuleTree> {
    match tokens.get(*pos) {
        Some(&Token::Surface(s)) => {
            *pos += 1;
            RuleTree::leaf(s)
        }
        Some(Token::Open) => {
            *pos += 1;
            let tree = parse_expr(tokens, pos)?;
            if tokens.get(*pos) != Some(&Token::Close) {
                return Err(unexpected(describe(tokens.get(*pos))).into());
            }
            *pos += 1;
            Ok(tree)
        }
        other => Err(unexpected(describe(other)).into()),
    }
}
