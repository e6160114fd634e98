//! Depth-first backtracking execution of the automaton.
//!
//! One `check` call evaluates a single state against a position in the
//! input. Positions are `isize`: -1 stands for "before the first byte",
//! `len` for "past the last byte". Per-attempt state (the captures) lives
//! in a [`CheckContext`]; the automaton itself is never mutated, so a
//! compiled pattern can serve concurrent matchers.

use rustc_hash::FxHashMap;

use super::arena::{MarkerKind, StateArena, StateId};
use super::{Symbol, ANY_CHAR, END_OF_TEXT, NEWLINE, START_OF_TEXT};

/// Recorded span of a capture group. `end` of -1 means the group is still
/// open; materialization then runs to the end of the input.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Capture {
    pub(crate) start: isize,
    pub(crate) end: isize,
}

impl Capture {
    /// Clamped byte bounds within an input of length `len`.
    fn bounds(&self, len: usize) -> (usize, usize) {
        let start = self.start.max(0) as usize;
        let end = if self.end < 0 || self.end as usize > len {
            len
        } else {
            self.end as usize
        };
        (start, end)
    }

    /// The captured substring.
    pub(crate) fn materialize(&self, input: &[u8]) -> String {
        let (start, end) = self.bounds(input.len());
        input
            .get(start..end)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }
}

/// Per-attempt capture state, keyed by group name. Numeric and user-set
/// aliases of one group are kept in lockstep by the marker handling.
#[derive(Debug, Default)]
pub(crate) struct CheckContext {
    pub(crate) groups: FxHashMap<String, Capture>,
}

impl CheckContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

/// Symbol visible at `pos`: the raw byte inside the input, the
/// start-of-text sentinel before it, the end-of-text sentinel past it.
#[inline]
pub(crate) fn symbol_at(input: &[u8], pos: isize) -> Symbol {
    if pos >= 0 && (pos as usize) < input.len() {
        Symbol::from(input[pos as usize])
    } else if pos >= input.len() as isize {
        END_OF_TEXT
    } else {
        START_OF_TEXT
    }
}

/// Executes one compiled automaton against one input.
pub(crate) struct Matcher<'a> {
    arena: &'a StateArena,
    input: &'a [u8],
}

impl<'a> Matcher<'a> {
    pub(crate) fn new(arena: &'a StateArena, input: &'a [u8]) -> Self {
        Self { arena, input }
    }

    /// Does the automaton accept the input starting from `id` at `pos`?
    ///
    /// `started` records whether the attempt has committed to a starting
    /// offset; while it is false, a failed state may retry itself one
    /// byte further, which implements unanchored search.
    pub(crate) fn check(
        &self,
        id: StateId,
        pos: isize,
        started: bool,
        ctx: &mut CheckContext,
    ) -> bool {
        let state = self.arena.state(id);

        for marker in &state.markers {
            match marker.kind {
                MarkerKind::Open => {
                    let capture = Capture { start: pos, end: -1 };
                    for name in &marker.names {
                        ctx.groups.insert(name.clone(), capture);
                    }
                }
                MarkerKind::Close => {
                    // Only ever move the end forward, so repeated passes
                    // under a quantifier keep the first start and the
                    // furthest end.
                    for name in &marker.names {
                        if let Some(capture) = ctx.groups.get_mut(name) {
                            if capture.end < pos {
                                capture.end = pos;
                            }
                        }
                    }
                }
            }
        }

        let current = symbol_at(self.input, pos);

        // `$` holds at the end of text and right before a newline.
        if state.end_of_text && current != END_OF_TEXT && current != NEWLINE {
            return false;
        }
        // `^` holds at the start of text and right after a newline.
        if state.start_of_text {
            let previous = symbol_at(self.input, pos - 1);
            if current != START_OF_TEXT && previous != NEWLINE {
                return false;
            }
        }

        if state.terminal {
            return true;
        }

        if let Some(backref) = &state.backreference {
            // A group that never captured, or captured text that does not
            // line up here, does not veto the state: the ordinary
            // transitions below still get their chance.
            if let Some(capture) = ctx.groups.get(&backref.name).copied() {
                let (start, end) = capture.bounds(self.input.len());
                let captured = &self.input[start..end];
                let lined_up = if pos < 0 {
                    captured.is_empty()
                } else {
                    self.input.get(pos as usize..pos as usize + captured.len())
                        == Some(captured)
                };
                if lined_up {
                    let landing = pos + captured.len() as isize;
                    return self.check(backref.target, landing, true, ctx);
                }
            }
        }

        let mut next = state.next_state_with(current);
        // No transition for the byte itself: fall back to the wildcard
        // edge, which never consumes end-of-text or a newline.
        if next.is_none() && current != END_OF_TEXT && current != NEWLINE {
            next = state.next_state_with(ANY_CHAR);
        }

        let mut result = match next {
            Some(next_id) => self.check(next_id, pos + 1, true, ctx),
            None => false,
        };

        // Every epsilon alternative is evaluated, not short-circuited:
        // each one updates captures in the shared context, and a later
        // alternative can still flip the overall result. Before the first
        // byte, each alternative is additionally tried one step in, past
        // the start-of-text sentinel.
        for &eps in state.epsilons() {
            result = self.check(eps, pos, true, ctx) || result;
            if current == START_OF_TEXT {
                result = self.check(eps, pos + 1, true, ctx) || result;
            }
        }

        if result {
            return true;
        }

        // Not committed to a start offset yet: slide one byte forward and
        // retry this same state.
        if !started && pos + 1 < self.input.len() as isize {
            return self.check(id, pos + 1, false, ctx);
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_at_sentinels() {
        let input = b"ab";
        assert_eq!(symbol_at(input, -1), START_OF_TEXT);
        assert_eq!(symbol_at(input, 0), Symbol::from(b'a'));
        assert_eq!(symbol_at(input, 1), Symbol::from(b'b'));
        assert_eq!(symbol_at(input, 2), END_OF_TEXT);
        // Before the first byte always reads as start of text, even when
        // the input is empty.
        assert_eq!(symbol_at(b"", -1), START_OF_TEXT);
        assert_eq!(symbol_at(b"", 0), END_OF_TEXT);
    }

    #[test]
    fn test_capture_materialize_clamps() {
        let input = b"hello";
        let open = Capture { start: -1, end: -1 };
        assert_eq!(open.materialize(input), "hello");
        let span = Capture { start: 1, end: 3 };
        assert_eq!(span.materialize(input), "el");
        let past = Capture { start: 2, end: 99 };
        assert_eq!(past.materialize(input), "llo");
    }
}
