//! Rewrite `:name` placeholders into MySQL's positional `?` markers.
//!
//! The MySQL protocol only knows positional parameters, so the named map is
//! flattened in token order. The scan skips string literals, quoted identifiers
//! and comments, and checks that tokens and parameters match one-to-one.

use crate::error::BindingError;
use crate::sql::params::{BindValue, Params};
use std::collections::HashSet;
use std::iter::Peekable;
use std::str::Chars;

/// Returns the rewritten SQL and the values in bind order.
pub fn to_positional<'p>(sql: &str, params: &'p Params) -> Result<(String, Vec<&'p BindValue>), BindingError> {
    let mut out = String::with_capacity(sql.len());
    let mut values = Vec::with_capacity(params.len());
    let mut seen: HashSet<String> = HashSet::new();
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                out.push(c);
                copy_quoted(c, &mut chars, &mut out);
            }
            '#' => {
                out.push(c);
                copy_line(&mut chars, &mut out);
            }
            '-' if chars.peek() == Some(&'-') => {
                out.push(c);
                out.push('-');
                chars.next();
                if chars.peek().map_or(true, |n| n.is_whitespace()) {
                    copy_line(&mut chars, &mut out);
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                out.push(c);
                out.push('*');
                chars.next();
                copy_block_comment(&mut chars, &mut out);
            }
            ':' if chars.peek().is_some_and(|n| n.is_ascii_alphabetic() || *n == '_') => {
                let mut name = String::new();
                while let Some(&n) = chars.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        name.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = params
                    .get(&name)
                    .ok_or_else(|| BindingError::Unbound(name.clone()))?;
                if !seen.insert(name.clone()) {
                    return Err(BindingError::Repeated(name));
                }
                values.push(value);
                out.push('?');
            }
            _ => out.push(c),
        }
    }

    if let Some(unused) = params.keys().find(|k| !seen.contains(k.as_str())) {
        return Err(BindingError::Unused(unused.clone()));
    }
    Ok((out, values))
}

fn copy_quoted(quote: char, chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '\\' && quote != '`' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else if c == quote {
            // doubled quote stays inside the literal
            if chars.peek() == Some(&quote) {
                out.push(quote);
                chars.next();
            } else {
                return;
            }
        }
    }
}

fn copy_line(chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    for c in chars.by_ref() {
        out.push(c);
        if c == '\n' {
            return;
        }
    }
}

fn copy_block_comment(chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '*' && chars.peek() == Some(&'/') {
            out.push('/');
            chars.next();
            return;
        }
    }
}
