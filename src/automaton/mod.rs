//! ε-NFA construction and execution.
//!
//! The token tree from the parser is compiled into a graph of states with
//! character, wildcard, anchor, epsilon and backreference edges, then
//! executed by a depth-first backtracking matcher. Key components:
//!
//! - `arena`: index-based state storage (`StateArena`, `StateId`)
//! - `compiler`: Thompson-style construction with capture-group markers
//! - `matcher`: recursive backtracking `check` with capture tracking
//! - `dot`: DOT-graph dump of a compiled automaton for debugging
//! - `thread_safe`: lock-free hot-swapping of a shared compiled pattern

pub(crate) mod arena;
pub(crate) mod compiler;
pub(crate) mod dot;
pub(crate) mod matcher;
pub(crate) mod thread_safe;


/// Transition alphabet symbol.
///
/// Input bytes occupy 0..=255. The reserved codes live above the byte
/// range so no input byte can collide with them.
pub(crate) type Symbol = u16;

/// Edge taken without consuming input.
pub(crate) const EPSILON: Symbol = 256;
/// Synthetic symbol read before the first input byte.
pub(crate) const START_OF_TEXT: Symbol = 257;
/// Synthetic symbol read past the last input byte.
pub(crate) const END_OF_TEXT: Symbol = 258;
/// Edge matching any input byte except newline; produced by `.` and `[^...]`.
pub(crate) const ANY_CHAR: Symbol = 259;
/// Plain `\n` byte; the `$` anchor also accepts a position right before it.
pub(crate) const NEWLINE: Symbol = b'\n' as Symbol;
