//! Token tree to ε-NFA compilation.
//!
//! Thompson-style construction extended with capture-group markers and
//! backreference edges. The machine grows as a single chain: each token
//! compiles starting from the previous token's end state, so adjacent
//! tokens are concatenated by sharing a state rather than by an extra
//! epsilon. A synthetic start state (group-start marker for `"0"`) and a
//! synthetic terminal state (group-end marker for `"0"`) wrap the chain.

use smallvec::{smallvec, SmallVec};

use crate::error::RegexError;
use crate::parser::{ParsingContext, RegexToken};

use super::arena::{Backreference, GroupMarker, MarkerKind, StateArena, StateId};
use super::{Symbol, ANY_CHAR, EPSILON};

/// The synthetic group wrapping the whole pattern.
pub(crate) const WHOLE_MATCH_GROUP: &str = "0";

struct Compiler<'a> {
    arena: StateArena,
    ctx: &'a mut ParsingContext,
}

/// Compile the tokens accumulated in `ctx` into an automaton.
///
/// Numeric group names are assigned here, in left-to-right order of `(`,
/// and recorded in the context so backreferences can be validated.
pub(crate) fn to_nfa(ctx: &mut ParsingContext) -> Result<(StateArena, StateId), RegexError> {
    let tokens = ctx.take_tokens();
    let mut compiler = Compiler {
        arena: StateArena::new(),
        ctx,
    };

    let chain_start = compiler.arena.alloc();
    let mut chain_end = chain_start;
    for token in &tokens {
        chain_end = compiler.token_to_nfa(token, chain_end)?;
    }

    let start = compiler.arena.alloc();
    compiler.arena.state_mut(start).markers.push(GroupMarker {
        kind: MarkerKind::Open,
        names: smallvec![WHOLE_MATCH_GROUP.to_string()],
    });
    compiler.arena.add_transition(start, EPSILON, chain_start);

    let terminal = compiler.arena.alloc();
    let terminal_state = compiler.arena.state_mut(terminal);
    terminal_state.terminal = true;
    terminal_state.markers.push(GroupMarker {
        kind: MarkerKind::Close,
        names: smallvec![WHOLE_MATCH_GROUP.to_string()],
    });
    compiler.arena.add_transition(chain_end, EPSILON, terminal);

    Ok((compiler.arena, start))
}

impl Compiler<'_> {
    /// Compile one token starting at `start_from`; returns the end state
    /// the next token chains from.
    fn token_to_nfa(
        &mut self,
        token: &RegexToken,
        start_from: StateId,
    ) -> Result<StateId, RegexError> {
        match token {
            RegexToken::Literal(c) => {
                let to = self.arena.alloc();
                self.arena.add_transition(start_from, Symbol::from(*c), to);
                Ok(to)
            }
            RegexToken::Wildcard => {
                let to = self.arena.alloc();
                self.arena.add_transition(start_from, ANY_CHAR, to);
                Ok(to)
            }
            RegexToken::Or(left, right) => {
                let end_left = self.token_to_nfa(left, start_from)?;
                let end_right = self.token_to_nfa(right, start_from)?;
                let to = self.arena.alloc();
                self.arena.add_transition(end_left, EPSILON, to);
                self.arena.add_transition(end_right, EPSILON, to);
                Ok(to)
            }
            RegexToken::Bracket(set) => {
                let to = self.arena.alloc();
                for &c in set {
                    self.arena.add_transition(start_from, Symbol::from(c), to);
                }
                Ok(to)
            }
            RegexToken::BracketNot(set) => {
                // Listed bytes land on a state with no way out; everything
                // else rides the wildcard edge to the exit.
                let to = self.arena.alloc();
                let dead_end = self.arena.alloc();
                for &c in set {
                    self.arena
                        .add_transition(start_from, Symbol::from(c), dead_end);
                }
                self.arena.add_transition(start_from, ANY_CHAR, to);
                Ok(to)
            }
            RegexToken::TextBeginning => {
                self.arena.state_mut(start_from).start_of_text = true;
                let to = self.arena.alloc();
                self.arena.add_transition(start_from, EPSILON, to);
                Ok(to)
            }
            RegexToken::TextEnd => {
                // Pass-through at the chain level; the flag acts as a
                // terminal guard during matching.
                self.arena.state_mut(start_from).end_of_text = true;
                Ok(start_from)
            }
            RegexToken::GroupCaptured { tokens, name } => {
                let numeric_name = self.ctx.next_group.to_string();
                self.ctx.next_group += 1;

                let mut aliases: SmallVec<[String; 2]> = smallvec![numeric_name];
                if let Some(user_name) = name {
                    aliases.push(user_name.clone());
                }
                for alias in &aliases {
                    self.ctx.captured_groups.insert(alias.clone());
                }

                let sub_end = self.compile_chain(tokens, start_from, Some(aliases))?;
                Ok(sub_end)
            }
            RegexToken::GroupUncaptured(tokens) => self.compile_chain(tokens, start_from, None),
            RegexToken::BackReference(name) => {
                if !self.ctx.captured_groups.contains(name) {
                    return Err(RegexError::compilation(
                        format!("backreference to unknown group '{name}'"),
                        0,
                    ));
                }
                let to = self.arena.alloc();
                self.arena.state_mut(start_from).backreference = Some(Backreference {
                    name: name.clone(),
                    target: to,
                });
                Ok(to)
            }
            RegexToken::Quantifier { min, max, inner } => {
                self.quantifier_to_nfa(*min, *max, inner, start_from)
            }
        }
    }

    /// Compile a token list as a sub-chain hanging off `start_from` by an
    /// epsilon. With `aliases` set, the entry state gets a group-open
    /// marker and the sub-chain's end a group-close marker.
    fn compile_chain(
        &mut self,
        tokens: &[RegexToken],
        start_from: StateId,
        aliases: Option<SmallVec<[String; 2]>>,
    ) -> Result<StateId, RegexError> {
        let sub_start = self.arena.alloc();
        let mut sub_end = sub_start;
        for token in tokens {
            sub_end = self.token_to_nfa(token, sub_end)?;
        }

        if let Some(names) = aliases {
            self.arena.state_mut(start_from).markers.push(GroupMarker {
                kind: MarkerKind::Open,
                names: names.clone(),
            });
            self.arena.state_mut(sub_end).markers.push(GroupMarker {
                kind: MarkerKind::Close,
                names,
            });
        }

        self.arena.add_transition(start_from, EPSILON, sub_start);
        Ok(sub_end)
    }

    /// Unroll a quantifier into a linear chain of copies of the inner
    /// token.
    ///
    /// A finite bound unrolls `max` copies, with every copy past the
    /// `min`-th skippable through an epsilon to the shared exit. An
    /// unbounded quantifier unrolls `max(min, 1)` copies and loops the
    /// exit back to the last copy's entry; the per-copy skip edges are
    /// omitted there, since together with the loop-back they would form
    /// an epsilon cycle that the recursive matcher cannot traverse, and
    /// the `min = 0` skip edge from `start_from` already covers the
    /// zero-repetition case.
    fn quantifier_to_nfa(
        &mut self,
        min: usize,
        max: Option<usize>,
        inner: &RegexToken,
        start_from: StateId,
    ) -> Result<StateId, RegexError> {
        let to = self.arena.alloc();
        if min == 0 {
            self.arena.add_transition(start_from, EPSILON, to);
        }

        let copies = max.unwrap_or(min.max(1));
        let mut previous_end = start_from;
        let mut last_start = start_from;
        for i in 1..=copies {
            let copy_start = self.arena.alloc();
            self.arena.add_transition(previous_end, EPSILON, copy_start);
            if max.is_some() && i > min {
                self.arena.add_transition(copy_start, EPSILON, to);
            }
            previous_end = self.token_to_nfa(inner, copy_start)?;
            last_start = copy_start;
        }
        self.arena.add_transition(previous_end, EPSILON, to);
        if max.is_none() {
            self.arena.add_transition(to, EPSILON, last_start);
        }
        Ok(to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn compile(pattern: &str) -> (ParsingContext, StateArena, StateId) {
        let mut ctx = ParsingContext::new();
        parse(pattern, &mut ctx).expect(pattern);
        let (arena, start) = to_nfa(&mut ctx).expect(pattern);
        (ctx, arena, start)
    }

    #[test]
    fn test_start_state_opens_whole_match_group() {
        let (_, arena, start) = compile("ab");
        let markers = &arena.state(start).markers;
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].kind, MarkerKind::Open);
        assert_eq!(markers[0].names[0], WHOLE_MATCH_GROUP);
    }

    #[test]
    fn test_groups_number_outer_first() {
        let (ctx, _, _) = compile("((a)(b))");
        assert_eq!(ctx.next_group, 4);
        for name in ["1", "2", "3"] {
            assert!(ctx.captured_groups.contains(name), "missing group {name}");
        }
    }

    #[test]
    fn test_named_group_registers_both_aliases() {
        let (ctx, _, _) = compile("(?<animal>cat)");
        assert!(ctx.captured_groups.contains("1"));
        assert!(ctx.captured_groups.contains("animal"));
    }

    #[test]
    fn test_backreference_to_unknown_group_fails() {
        let mut ctx = ParsingContext::new();
        parse(r"(a)\2", &mut ctx).unwrap();
        let err = to_nfa(&mut ctx).unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::CompilationError);
        assert!(err.message.contains("'2'"));
    }

    #[test]
    fn test_backreference_before_group_fails() {
        // The referenced group must be captured before the token is reached.
        let mut ctx = ParsingContext::new();
        parse(r"\1(a)", &mut ctx).unwrap();
        assert!(to_nfa(&mut ctx).is_err());
    }

    #[test]
    fn test_empty_pattern_compiles() {
        let (_, arena, _) = compile("");
        // Chain state plus the two synthetic states.
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn test_unbounded_quantifier_loops_back() {
        let (_, arena, _) = compile("a+");
        // Some state must have an epsilon pointing at an earlier state.
        let has_back_edge = (0..arena.len()).any(|i| {
            let id = StateId::from_index(i);
            arena.state(id).epsilons().iter().any(|t| t.index() < i)
        });
        assert!(has_back_edge);
    }
}
