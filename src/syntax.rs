//! Shorthand-syntax normalization
//!
//! Cartridge scripts are written in a superset of the base scripting
//! language with two line-oriented shorthands that have to be rewritten
//! before the engine will parse them:
//!
//! - compound assignment: `x += expr` (also `-=`, `*=`, `/=`, `%=`)
//!   becomes `x = x + (expr)`, where `expr` is the shortest valid
//!   expression after the operator
//! - if shorthand: `if (cond) stmt` with no `then` becomes
//!   `if (cond) then stmt end`
//!
//! The alternate not-equal token `!=` is mapped to `~=` first.
//!
//! Every rewrite is fail-safe: unbalanced brackets or an expression that
//! cannot be tokenized leave the line untouched rather than erroring.

/// Normalize shorthand syntax into plain base-language source.
pub fn normalize(source: &str) -> String {
    let source = source.replace("!=", "~=");
    let source = for_each_line(&source, rewrite_compound_line);
    for_each_line(&source, rewrite_if_line)
}

fn for_each_line(source: &str, rewrite: fn(&str) -> String) -> String {
    let mut out = String::with_capacity(source.len());
    for (i, line) in source.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&rewrite(line));
    }
    out
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Skip a balanced parenthesized group starting at `start` (which must be
/// an opening paren). Returns the index one past the matching close, or
/// `None` when the group never closes.
fn skip_parens(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut pos = start + 1;
    while depth != 0 {
        if pos >= chars.len() {
            return None;
        }
        match chars[pos] {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        pos += 1;
    }
    Some(pos)
}

// ---------------------------------------------------------------------
// Compound assignment
// ---------------------------------------------------------------------

/// Rewrite the first `target OP= expr` construct on a line. Whatever
/// trails the detected expression is re-normalized recursively, so
/// several statements jammed onto one physical line all expand.
fn rewrite_compound_line(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut start = 0;
    while start < chars.len() {
        if is_ident_start(chars[start])
            && (start == 0 || !is_ident_char(chars[start - 1]))
        {
            if let Some(rewritten) = try_compound_at(&chars, start) {
                return rewritten;
            }
        }
        start += 1;
    }
    line.to_string()
}

fn try_compound_at(chars: &[char], start: usize) -> Option<String> {
    let target_end = scan_assignment_target(chars, start)?;

    let mut pos = target_end;
    while pos < chars.len() && chars[pos].is_whitespace() {
        pos += 1;
    }
    let op = *chars.get(pos)?;
    if !matches!(op, '+' | '-' | '*' | '/' | '%') || chars.get(pos + 1) != Some(&'=') {
        return None;
    }
    let mut rest_start = pos + 2;
    while rest_start < chars.len() && chars[rest_start].is_whitespace() {
        rest_start += 1;
    }

    // The scanner works on the remainder with whitespace after dots
    // collapsed, mirroring the field-access forgiveness of the dialect.
    let potential = collapse_dot_spaces(&chars[rest_start..]);
    let split = scan_expression(&potential)?;
    let expr: String = potential[..split].iter().collect::<String>().trim().to_string();
    if expr.is_empty() {
        return None;
    }
    let leftover: String = potential[split..].iter().collect();

    let prefix: String = chars[..start].iter().collect();
    let target: String = chars[start..target_end].iter().collect();
    Some(format!(
        "{prefix}{target} = {target} {op} ({expr}) {}",
        rewrite_compound_line(&leftover)
    ))
}

/// Scan an assignment target: an identifier with optional dotted fields
/// and bracketed index groups.
fn scan_assignment_target(chars: &[char], start: usize) -> Option<usize> {
    let mut pos = start + 1;
    while pos < chars.len() {
        let c = chars[pos];
        if is_ident_char(c) {
            pos += 1;
        } else if c == '.' {
            pos += 1;
            while pos < chars.len() && chars[pos].is_whitespace() {
                pos += 1;
            }
        } else {
            break;
        }
    }
    if pos < chars.len() && chars[pos] == '[' {
        let mut depth = 1usize;
        let mut scan = pos + 1;
        while depth != 0 {
            if scan >= chars.len() {
                return None;
            }
            match chars[scan] {
                '[' => depth += 1,
                ']' => depth -= 1,
                _ => {}
            }
            scan += 1;
        }
        pos = scan;
    }
    Some(pos)
}

/// Remove whitespace that follows a dot, so `a. b` reads as `a.b`.
fn collapse_dot_spaces(chars: &[char]) -> Vec<char> {
    let mut out = Vec::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        out.push(chars[i]);
        if chars[i] == '.' {
            i += 1;
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
        } else {
            i += 1;
        }
    }
    out
}

/// A numeric or identifier term inside a candidate expression.
#[derive(Debug, Clone, Copy)]
struct Term {
    start: usize,
    end: usize,
}

/// Tokenize every term in the candidate expression, leftmost first,
/// non-overlapping.
fn find_terms(chars: &[char]) -> Vec<Term> {
    let mut terms = Vec::new();
    let mut pos = 0;
    while pos < chars.len() {
        if let Some(end) = term_at(chars, pos) {
            terms.push(Term { start: pos, end });
            pos = end;
        } else {
            pos += 1;
        }
    }
    terms
}

/// Try to match a term starting exactly at `pos`: an optionally negated
/// number (with an optional `0x` prefix) or an optionally negated
/// identifier with dotted fields and single-character index groups.
fn term_at(chars: &[char], pos: usize) -> Option<usize> {
    let mut p = pos;
    if chars.get(p) == Some(&'-') {
        p += 1;
    }
    // Number branch first.
    {
        let mut q = p;
        if chars.get(q) == Some(&'0')
            && chars.get(q + 1) == Some(&'x')
            && chars
                .get(q + 2)
                .is_some_and(|c| c.is_ascii_digit() || *c == '.')
        {
            q += 2;
        }
        let digits_start = q;
        while chars
            .get(q)
            .is_some_and(|c| c.is_ascii_digit() || *c == '.')
        {
            q += 1;
        }
        if q > digits_start {
            return Some(q);
        }
    }
    // Identifier branch.
    if chars.get(p).copied().is_some_and(is_ident_start) {
        let mut q = p + 1;
        while q < chars.len() {
            let c = chars[q];
            if is_ident_char(c) {
                q += 1;
            } else if c == '.' {
                q += 1;
                while q < chars.len() && chars[q].is_whitespace() {
                    q += 1;
                }
            } else {
                break;
            }
        }
        while chars.get(q) == Some(&'[')
            && chars.get(q + 1).is_some_and(|c| *c != ']')
            && chars.get(q + 2) == Some(&']')
        {
            q += 3;
        }
        return Some(q);
    }
    None
}

/// Walk the candidate expression and find where it stops being one.
///
/// Alternates between expecting a term and expecting glue (an operator or
/// a parenthesized group, skipped as an opaque unit). The walk stops at
/// the first term that shows up where glue was expected; that is where a
/// new statement begins. Returns `None` when nothing parses, leaving the
/// line untouched.
fn scan_expression(chars: &[char]) -> Option<usize> {
    let terms = find_terms(chars);
    if terms.is_empty() {
        return None;
    }

    let mut term_index = 0;
    let mut next_term: Option<Term> = Some(terms[0]);
    let mut pos = 0;
    let mut expect_term = true;

    while pos < chars.len() {
        match next_term {
            Some(term) if pos == term.start => {
                if !expect_term {
                    break;
                }
                pos = term.end;
                term_index += 1;
                if term_index >= terms.len() {
                    break;
                }
                next_term = Some(terms[term_index]);
                expect_term = false;
            }
            Some(term) if pos > term.start => {
                term_index += 1;
                next_term = terms.get(term_index).copied();
            }
            _ => {
                let c = chars[pos];
                if c == '(' {
                    pos = skip_parens(chars, pos)?;
                    expect_term = false;
                } else if c.is_whitespace() {
                    pos += 1;
                } else if matches!(c, '+' | '-' | '*' | '/' | '%' | '^') {
                    pos += 1;
                    expect_term = true;
                } else {
                    break;
                }
            }
        }
    }
    Some(pos.min(chars.len()))
}

// ---------------------------------------------------------------------
// If shorthand
// ---------------------------------------------------------------------

/// Rewrite the first `if (cond) stmt` construct on a line into
/// `if (cond) then stmt end`. Lines that already carry a `then` are
/// assumed well-formed and left alone. The body is re-normalized so
/// chained shorthands expand too.
fn rewrite_if_line(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut search = 0;
    while search + 1 < chars.len() {
        let boundary = search == 0 || !is_ident_char(chars[search - 1]);
        if boundary
            && chars[search].eq_ignore_ascii_case(&'i')
            && chars[search + 1].eq_ignore_ascii_case(&'f')
        {
            let mut open = search + 2;
            while open < chars.len() && chars[open].is_whitespace() {
                open += 1;
            }
            if chars.get(open) == Some(&'(') {
                let tail: String = chars[open..].iter().collect();
                if tail.contains("then") {
                    return line.to_string();
                }
                let close = match skip_parens(&chars, open) {
                    Some(close) => close,
                    None => return line.to_string(),
                };
                let prefix: String = chars[..search].iter().collect();
                let cond: String = chars[open..close].iter().collect();
                let body: String =
                    chars[close..].iter().collect::<String>().trim().to_string();
                return format!("{prefix}if {cond} then {} end", rewrite_if_line(&body));
            }
        }
        search += 1;
    }
    line.to_string()
}
