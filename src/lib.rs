//! rgx: a backtracking regular-expression engine with capture groups and
//! backreferences.
//!
//! A pattern compiles into an ε-NFA which a depth-first backtracking
//! matcher executes against byte strings. Supported syntax:
//! - literals and `\`-escapes, `.` wildcard
//! - `[...]` / `[^...]` character classes with ranges
//! - `|` alternation, `(...)` and `(?<name>...)` capturing groups
//! - `^` / `$` anchors
//! - `*` `+` `?` and `{m}` `{m,}` `{m,n}` repetition
//! - `\1` numeric and `\k<name>` named backreferences
//!
//! The engine operates on a byte alphabet; multi-byte characters match
//! bytewise. Matching is deliberately backtracking: ambiguous patterns
//! can take exponential time, so callers should cap input size.
//!
//! ```
//! use rgx::Regex;
//!
//! let regex = Regex::compile(r"(?<letter>[cxv])-[a-z]+-\k<letter>").unwrap();
//! let result = regex.test("c-abcd-c");
//! assert!(result.matched);
//! assert_eq!(result.groups["letter"], "c");
//! ```

mod automaton;
mod error;
mod parser;

pub use automaton::thread_safe::SharedRegex;
pub use error::{ErrorCode, RegexError};

use std::collections::HashMap;

use automaton::arena::{StateArena, StateId};
use automaton::compiler::{self, WHOLE_MATCH_GROUP};
use automaton::dot;
use automaton::matcher::{CheckContext, Matcher};
use parser::ParsingContext;

/// A compiled pattern.
///
/// Immutable after compilation; matching keeps all per-attempt state in
/// its own context, so one `Regex` can serve concurrent readers (wrap it
/// in `Arc`, or see [`SharedRegex`] for hot-swapping).
#[derive(Clone, Debug)]
pub struct Regex {
    arena: StateArena,
    start: StateId,
}

/// Outcome of one match attempt.
///
/// On a match, `groups` holds the substring bound to each group alias:
/// the synthetic group `"0"` spans the whole match, capturing groups
/// appear under their number (in left-to-right order of `(`) and, if
/// named, under their user-set name as well.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub matched: bool,
    pub groups: HashMap<String, String>,
}

impl Regex {
    /// Compile `pattern` into an executable automaton.
    pub fn compile(pattern: &str) -> Result<Self, RegexError> {
        let mut ctx = ParsingContext::new();
        parser::parse(pattern, &mut ctx)?;
        let (arena, start) = compiler::to_nfa(&mut ctx)?;
        Ok(Self { arena, start })
    }

    /// Match `input` from any position (unanchored unless the pattern
    /// starts with `^`). Cannot fail: a non-match is a result, not an
    /// error.
    pub fn test(&self, input: &str) -> MatchResult {
        let bytes = input.as_bytes();
        let mut ctx = CheckContext::new();
        let matched = Matcher::new(&self.arena, bytes).check(self.start, -1, false, &mut ctx);
        MatchResult {
            matched,
            groups: if matched {
                materialize_groups(&ctx, bytes)
            } else {
                HashMap::new()
            },
        }
    }

    /// Shorthand for `test(input).matched`.
    pub fn is_match(&self, input: &str) -> bool {
        self.test(input).matched
    }

    /// Iterator over non-overlapping matches, scanning left to right.
    /// Each attempt starts one past the previous match's end; iteration
    /// stops at the first failed attempt.
    pub fn find_matches<'r, 'i>(&'r self, input: &'i str) -> Matches<'r, 'i> {
        Matches {
            regex: self,
            input,
            at: -1,
            done: false,
        }
    }

    /// DOT rendition of the automaton, for debugging with graphviz.
    pub fn to_dot(&self) -> String {
        dot::dump(&self.arena, self.start)
    }
}

/// Compile `pattern` and test `input` against it in one step.
pub fn check(pattern: &str, input: &str) -> Result<MatchResult, RegexError> {
    Ok(Regex::compile(pattern)?.test(input))
}

/// Iterator returned by [`Regex::find_matches`].
pub struct Matches<'r, 'i> {
    regex: &'r Regex,
    input: &'i str,
    at: isize,
    done: bool,
}

impl Iterator for Matches<'_, '_> {
    type Item = MatchResult;

    fn next(&mut self) -> Option<MatchResult> {
        if self.done || self.at >= self.input.len() as isize {
            return None;
        }
        let bytes = self.input.as_bytes();
        let mut ctx = CheckContext::new();
        let matched =
            Matcher::new(&self.regex.arena, bytes).check(self.regex.start, self.at, false, &mut ctx);
        if !matched {
            self.done = true;
            return None;
        }
        let end = ctx
            .groups
            .get(WHOLE_MATCH_GROUP)
            .map(|capture| capture.end)
            .unwrap_or(-1);
        self.at = end + 1;
        Some(MatchResult {
            matched: true,
            groups: materialize_groups(&ctx, bytes),
        })
    }
}

fn materialize_groups(ctx: &CheckContext, input: &[u8]) -> HashMap<String, String> {
    ctx.groups
        .iter()
        .map(|(name, capture)| (name.clone(), capture.materialize(input)))
        .collect()
}
