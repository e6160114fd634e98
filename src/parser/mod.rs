//! Recursive pattern parser.
//!
//! Turns a pattern string into a flat sequence of [`RegexToken`]s inside a
//! [`ParsingContext`]. Supported syntax:
//! - literals (printable ASCII) and `\`-escapes
//! - `.` wildcard
//! - `[...]` / `[^...]` character classes with ranges
//! - `|` alternation
//! - `(...)` capturing groups, `(?<name>...)` named groups
//! - `^` / `$` anchors
//! - `*` `+` `?` and `{m}` `{m,}` `{m,n}` repetition
//! - `\1` numeric and `\k<name>` named backreferences
//!
//! Nested constructs (groups, alternation operands) parse into a
//! sub-context sharing the parent's cursor, so a group body never sees
//! tokens emitted outside it.

mod tokens;

pub(crate) use tokens::RegexToken;

use std::collections::BTreeSet;
use std::mem;

use rustc_hash::FxHashSet;

use crate::error::RegexError;

/// Mutable parse state threaded through the recursive parser.
///
/// `next_group` and `captured_groups` belong to the compile stage: numeric
/// group names are assigned in left-to-right order of `(` while the token
/// tree is compiled, not while it is parsed.
pub(crate) struct ParsingContext {
    pos: usize,
    tokens: Vec<RegexToken>,
    pub(crate) next_group: usize,
    pub(crate) captured_groups: FxHashSet<String>,
}

impl ParsingContext {
    pub(crate) fn new() -> Self {
        Self {
            pos: 0,
            tokens: Vec::new(),
            next_group: 1,
            captured_groups: FxHashSet::default(),
        }
    }

    /// Sub-context for a nested construct, continuing at `pos`.
    fn nested(pos: usize) -> Self {
        Self {
            pos,
            tokens: Vec::new(),
            next_group: 1,
            captured_groups: FxHashSet::default(),
        }
    }

    pub(crate) fn take_tokens(&mut self) -> Vec<RegexToken> {
        mem::take(&mut self.tokens)
    }

    fn push(&mut self, token: RegexToken) {
        self.tokens.push(token);
    }
}

/// Parse `pattern` to completion, accumulating tokens in `ctx`.
pub(crate) fn parse(pattern: &str, ctx: &mut ParsingContext) -> Result<(), RegexError> {
    let bytes = pattern.as_bytes();
    while ctx.pos < bytes.len() {
        process_char(bytes, ctx)?;
    }
    Ok(())
}

/// Dispatch on the byte at the cursor and emit the token(s) it begins.
/// Every arm leaves the cursor one past the construct it consumed.
fn process_char(pattern: &[u8], ctx: &mut ParsingContext) -> Result<(), RegexError> {
    let at = ctx.pos;
    match pattern[at] {
        b'(' => {
            ctx.pos += 1;
            parse_group(pattern, ctx)
        }
        b'[' => {
            ctx.pos += 1;
            parse_bracket(pattern, ctx)
        }
        b'*' => {
            ctx.pos += 1;
            wrap_last(ctx, 0, None, at)
        }
        b'+' => {
            ctx.pos += 1;
            wrap_last(ctx, 1, None, at)
        }
        b'?' => {
            ctx.pos += 1;
            wrap_last(ctx, 0, Some(1), at)
        }
        b'{' => parse_bounded_quantifier(pattern, ctx),
        b'\\' => parse_backslash(pattern, ctx),
        b'.' => {
            ctx.push(RegexToken::Wildcard);
            ctx.pos += 1;
            Ok(())
        }
        b'^' => {
            ctx.push(RegexToken::TextBeginning);
            ctx.pos += 1;
            Ok(())
        }
        b'$' => {
            ctx.push(RegexToken::TextEnd);
            ctx.pos += 1;
            Ok(())
        }
        b'|' => parse_or(pattern, ctx),
        c if c.is_ascii_graphic() || c == b' ' => {
            ctx.push(RegexToken::Literal(c));
            ctx.pos += 1;
            Ok(())
        }
        c => Err(RegexError::syntax(
            format!("unsupported character 0x{c:02x}"),
            at,
        )),
    }
}

/// Pop the last token and re-wrap it in a quantifier.
fn wrap_last(
    ctx: &mut ParsingContext,
    min: usize,
    max: Option<usize>,
    at: usize,
) -> Result<(), RegexError> {
    let inner = ctx
        .tokens
        .pop()
        .ok_or_else(|| RegexError::syntax("quantifier with nothing to repeat", at))?;
    ctx.push(RegexToken::Quantifier {
        min,
        max,
        inner: Box::new(inner),
    });
    Ok(())
}

/// Group parser, entered with the cursor one past `(`.
///
/// An optional `?<name>` header assigns the user-set name. The body is
/// parsed into a sub-context until the matching `)`.
fn parse_group(pattern: &[u8], ctx: &mut ParsingContext) -> Result<(), RegexError> {
    let opened_at = ctx.pos - 1;

    let mut name = None;
    if pattern.get(ctx.pos) == Some(&b'?') {
        if pattern.get(ctx.pos + 1) != Some(&b'<') {
            return Err(RegexError::syntax(
                "expected '<name>' after '(?'",
                ctx.pos,
            ));
        }
        ctx.pos += 2;
        let start = ctx.pos;
        while pattern.get(ctx.pos) != Some(&b'>') {
            if ctx.pos >= pattern.len() {
                return Err(RegexError::syntax("unclosed group name", start));
            }
            ctx.pos += 1;
        }
        if ctx.pos > start {
            name = Some(String::from_utf8_lossy(&pattern[start..ctx.pos]).into_owned());
        }
        ctx.pos += 1;
    }

    let mut sub = ParsingContext::nested(ctx.pos);
    loop {
        match pattern.get(sub.pos) {
            None => return Err(RegexError::syntax("unclosed group", opened_at)),
            Some(b')') => break,
            Some(_) => process_char(pattern, &mut sub)?,
        }
    }
    ctx.pos = sub.pos + 1;
    ctx.push(RegexToken::GroupCaptured {
        tokens: sub.tokens,
        name,
    });
    Ok(())
}

/// Pieces accumulated inside a bracket before expansion into a byte set.
enum Piece {
    One(u8),
    Span(u8, u8),
}

/// Bracket parser, entered with the cursor one past `[`.
///
/// A `-` forms a range only between two one-character pieces; at position
/// 0, immediately before `]`, or after a range piece it is a literal.
fn parse_bracket(pattern: &[u8], ctx: &mut ParsingContext) -> Result<(), RegexError> {
    let opened_at = ctx.pos - 1;

    let negated = pattern.get(ctx.pos) == Some(&b'^');
    if negated {
        ctx.pos += 1;
    }

    let mut pieces: Vec<Piece> = Vec::new();
    loop {
        match pattern.get(ctx.pos) {
            None => return Err(RegexError::syntax("unclosed bracket", opened_at)),
            Some(b']') => {
                ctx.pos += 1;
                break;
            }
            Some(b'\\') => {
                let escaped = *pattern
                    .get(ctx.pos + 1)
                    .ok_or_else(|| RegexError::syntax("dangling escape", ctx.pos))?;
                pieces.push(Piece::One(escaped));
                ctx.pos += 2;
            }
            Some(b'-') => {
                let next = pattern.get(ctx.pos + 1).copied();
                let prev_single = match pieces.last() {
                    Some(&Piece::One(c)) => Some(c),
                    _ => None,
                };
                match (prev_single, next) {
                    (Some(lo), Some(hi)) if hi != b']' => {
                        if lo > hi {
                            return Err(RegexError::syntax(
                                format!("'{}-{}' range is invalid", lo as char, hi as char),
                                ctx.pos,
                            ));
                        }
                        pieces.pop();
                        pieces.push(Piece::Span(lo, hi));
                        ctx.pos += 2;
                    }
                    _ => {
                        pieces.push(Piece::One(b'-'));
                        ctx.pos += 1;
                    }
                }
            }
            Some(&c) => {
                pieces.push(Piece::One(c));
                ctx.pos += 1;
            }
        }
    }

    if pieces.is_empty() {
        return Err(RegexError::syntax("empty bracket", opened_at));
    }

    let mut set = BTreeSet::new();
    for piece in &pieces {
        match *piece {
            Piece::One(c) => {
                set.insert(c);
            }
            Piece::Span(lo, hi) => {
                for c in lo..=hi {
                    set.insert(c);
                }
            }
        }
    }

    ctx.push(if negated {
        RegexToken::BracketNot(set)
    } else {
        RegexToken::Bracket(set)
    });
    Ok(())
}

/// `{m}` / `{m,}` / `{m,n}` parser, entered with the cursor on `{`.
fn parse_bounded_quantifier(pattern: &[u8], ctx: &mut ParsingContext) -> Result<(), RegexError> {
    let opened_at = ctx.pos;
    ctx.pos += 1;
    let start = ctx.pos;
    while pattern.get(ctx.pos) != Some(&b'}') {
        if ctx.pos >= pattern.len() {
            return Err(RegexError::syntax("unclosed quantifier", opened_at));
        }
        ctx.pos += 1;
    }
    let body = &pattern[start..ctx.pos];
    ctx.pos += 1;

    let parse_bound = |digits: &[u8]| -> Result<usize, RegexError> {
        std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                RegexError::syntax("quantifier bound is not an integer", opened_at)
            })
    };

    let mut parts = body.splitn(2, |&c| c == b',');
    let min_part = parts.next().unwrap_or_default();
    let (min, max) = match parts.next() {
        None => {
            let n = parse_bound(min_part)?;
            (n, Some(n))
        }
        Some([]) => (parse_bound(min_part)?, None),
        Some(max_part) => {
            let min = parse_bound(min_part)?;
            let max = parse_bound(max_part)?;
            if max < min {
                return Err(RegexError::syntax(
                    "quantifier bounds are inverted",
                    opened_at,
                ));
            }
            (min, Some(max))
        }
    };
    wrap_last(ctx, min, max, opened_at)
}

/// Escape parser, entered with the cursor on `\`.
///
/// A digit is a numeric backreference, `k<name>` a named one, `n` and `t`
/// the usual control literals, anything else a literal of that byte.
fn parse_backslash(pattern: &[u8], ctx: &mut ParsingContext) -> Result<(), RegexError> {
    let at = ctx.pos;
    let next = *pattern
        .get(at + 1)
        .ok_or_else(|| RegexError::syntax("dangling escape", at))?;
    match next {
        b'0'..=b'9' => {
            ctx.push(RegexToken::BackReference((next as char).to_string()));
            ctx.pos += 2;
        }
        b'k' => {
            if pattern.get(at + 2) != Some(&b'<') {
                return Err(RegexError::syntax("expected '<name>' after '\\k'", at));
            }
            ctx.pos = at + 3;
            let start = ctx.pos;
            while pattern.get(ctx.pos) != Some(&b'>') {
                if ctx.pos >= pattern.len() {
                    return Err(RegexError::syntax("unclosed backreference name", start));
                }
                ctx.pos += 1;
            }
            let name = String::from_utf8_lossy(&pattern[start..ctx.pos]).into_owned();
            ctx.pos += 1;
            ctx.push(RegexToken::BackReference(name));
        }
        b'n' => {
            ctx.push(RegexToken::Literal(b'\n'));
            ctx.pos += 2;
        }
        b't' => {
            ctx.push(RegexToken::Literal(b'\t'));
            ctx.pos += 2;
        }
        c => {
            ctx.push(RegexToken::Literal(c));
            ctx.pos += 2;
        }
    }
    Ok(())
}

/// Alternation, entered with the cursor on `|`.
///
/// Everything emitted so far in this context becomes the left operand;
/// the right operand parses into a fresh sub-context until `)` or end of
/// pattern. The `)` is left for the enclosing group parser to consume.
fn parse_or(pattern: &[u8], ctx: &mut ParsingContext) -> Result<(), RegexError> {
    let left = RegexToken::GroupUncaptured(ctx.take_tokens());
    ctx.pos += 1;

    let mut sub = ParsingContext::nested(ctx.pos);
    while let Some(&c) = pattern.get(sub.pos) {
        if c == b')' {
            break;
        }
        process_char(pattern, &mut sub)?;
    }
    ctx.pos = sub.pos;

    let right = RegexToken::GroupUncaptured(sub.tokens);
    ctx.push(RegexToken::Or(Box::new(left), Box::new(right)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(pattern: &str) -> Vec<RegexToken> {
        let mut ctx = ParsingContext::new();
        parse(pattern, &mut ctx).expect(pattern);
        ctx.tokens
    }

    fn parse_err(pattern: &str) -> RegexError {
        let mut ctx = ParsingContext::new();
        parse(pattern, &mut ctx).expect_err(pattern)
    }

    #[test]
    fn test_parse_literals() {
        let tokens = parse_ok("ab c");
        assert_eq!(
            tokens,
            vec![
                RegexToken::Literal(b'a'),
                RegexToken::Literal(b'b'),
                RegexToken::Literal(b' '),
                RegexToken::Literal(b'c'),
            ]
        );
    }

    #[test]
    fn test_parse_wildcard_and_anchors() {
        let tokens = parse_ok("^a.$");
        assert_eq!(
            tokens,
            vec![
                RegexToken::TextBeginning,
                RegexToken::Literal(b'a'),
                RegexToken::Wildcard,
                RegexToken::TextEnd,
            ]
        );
    }

    #[test]
    fn test_parse_quantifier_shorthand() {
        let tokens = parse_ok("a*b+c?");
        assert_eq!(tokens.len(), 3);
        match &tokens[0] {
            RegexToken::Quantifier { min: 0, max: None, inner } => {
                assert_eq!(**inner, RegexToken::Literal(b'a'));
            }
            other => panic!("expected quantifier, got {other:?}"),
        }
        assert!(matches!(
            tokens[1],
            RegexToken::Quantifier { min: 1, max: None, .. }
        ));
        assert!(matches!(
            tokens[2],
            RegexToken::Quantifier { min: 0, max: Some(1), .. }
        ));
    }

    #[test]
    fn test_parse_bounded_quantifier() {
        assert!(matches!(
            parse_ok("a{3}")[0],
            RegexToken::Quantifier { min: 3, max: Some(3), .. }
        ));
        assert!(matches!(
            parse_ok("a{2,}")[0],
            RegexToken::Quantifier { min: 2, max: None, .. }
        ));
        assert!(matches!(
            parse_ok("a{2,5}")[0],
            RegexToken::Quantifier { min: 2, max: Some(5), .. }
        ));
    }

    #[test]
    fn test_parse_bracket_range() {
        let tokens = parse_ok("[a-cx]");
        match &tokens[0] {
            RegexToken::Bracket(set) => {
                let bytes: Vec<u8> = set.iter().copied().collect();
                assert_eq!(bytes, vec![b'a', b'b', b'c', b'x']);
            }
            other => panic!("expected bracket, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_bracket_negated() {
        assert!(matches!(parse_ok("[^ab]")[0], RegexToken::BracketNot(_)));
    }

    #[test]
    fn test_parse_bracket_literal_dash() {
        // Leading, trailing and post-range dashes are all literal.
        for pattern in ["[-a]", "[a-]", "[0-c-^]"] {
            match &parse_ok(pattern)[0] {
                RegexToken::Bracket(set) => assert!(set.contains(&b'-'), "{pattern}"),
                other => panic!("expected bracket, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_bracket_escapes() {
        match &parse_ok(r"[[\]-]")[0] {
            RegexToken::Bracket(set) => {
                let bytes: Vec<u8> = set.iter().copied().collect();
                assert_eq!(bytes, vec![b'-', b'[', b']']);
            }
            other => panic!("expected bracket, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_group_named() {
        let tokens = parse_ok("(?<letter>ab)");
        match &tokens[0] {
            RegexToken::GroupCaptured { tokens, name } => {
                assert_eq!(name.as_deref(), Some("letter"));
                assert_eq!(tokens.len(), 2);
            }
            other => panic!("expected group, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_alternation_nests_to_the_right() {
        let tokens = parse_ok("a|b|c");
        assert_eq!(tokens.len(), 1);
        match &tokens[0] {
            RegexToken::Or(left, right) => {
                assert_eq!(**left, RegexToken::GroupUncaptured(vec![RegexToken::Literal(b'a')]));
                match &**right {
                    RegexToken::GroupUncaptured(inner) => {
                        assert!(matches!(inner[0], RegexToken::Or(_, _)));
                    }
                    other => panic!("expected uncaptured group, got {other:?}"),
                }
            }
            other => panic!("expected alternation, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_alternation_leaves_group_close() {
        // The `)` after the right operand still closes the enclosing group.
        let tokens = parse_ok("x(a|b)y");
        assert_eq!(tokens.len(), 3);
        assert!(matches!(tokens[1], RegexToken::GroupCaptured { .. }));
    }

    #[test]
    fn test_parse_backreferences() {
        let tokens = parse_ok(r"(a)\1\k<name>");
        assert_eq!(tokens[1], RegexToken::BackReference("1".into()));
        assert_eq!(tokens[2], RegexToken::BackReference("name".into()));
    }

    #[test]
    fn test_parse_escaped_metacharacters() {
        let tokens = parse_ok(r"\\\^\$\.\|\?\*\+\(\)\{\}\n\t");
        let expected: Vec<u8> = br"\^$.|?*+(){}".iter().copied().chain([b'\n', b'\t']).collect();
        let got: Vec<u8> = tokens
            .iter()
            .map(|t| match t {
                RegexToken::Literal(c) => *c,
                other => panic!("expected literal, got {other:?}"),
            })
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_err("[b-a]").message, "'b-a' range is invalid");
        assert_eq!(parse_err("[]").message, "empty bracket");
        assert_eq!(parse_err("[abc").message, "unclosed bracket");
        assert_eq!(parse_err("(abc").message, "unclosed group");
        assert_eq!(parse_err("(?:abc)").message, "expected '<name>' after '(?'");
        assert_eq!(parse_err("a{x}").message, "quantifier bound is not an integer");
        assert_eq!(parse_err("a{3,1}").message, "quantifier bounds are inverted");
        assert_eq!(parse_err("a{3").message, "unclosed quantifier");
        assert_eq!(parse_err("*a").message, "quantifier with nothing to repeat");
        assert_eq!(parse_err("ab\\").message, "dangling escape");
    }

    #[test]
    fn test_parse_error_positions() {
        assert_eq!(parse_err("ab[cd").pos, 2);
        assert_eq!(parse_err("a(b(c)").pos, 1);
    }
}
