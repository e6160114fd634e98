//! Arena-based state allocation for the NFA.
//!
//! Unbounded quantifiers introduce cycles, so states cannot own each
//! other. A `StateId` is just an index into the arena; states reference
//! each other freely and the arena owns all of them for the lifetime of
//! the compiled pattern.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::{Symbol, EPSILON};

/// A state identifier: an index into the owning [`StateArena`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct StateId(u32);

impl StateId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

/// Whether a marker opens or closes its group when the state is entered.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum MarkerKind {
    Open,
    Close,
}

/// Capture-group marker attached to a state.
///
/// One marker carries every alias of its group: the compile-assigned
/// numeric name and, for named groups, the user-set name. All aliases
/// record the same span.
#[derive(Clone, Debug)]
pub(crate) struct GroupMarker {
    pub(crate) kind: MarkerKind,
    pub(crate) names: SmallVec<[String; 2]>,
}

/// Backreference edge: on a textual match of the named group's capture,
/// control jumps to `target` past the matched bytes.
#[derive(Clone, Debug)]
pub(crate) struct Backreference {
    pub(crate) name: String,
    pub(crate) target: StateId,
}

/// A node of the automaton.
#[derive(Clone, Debug, Default)]
pub(crate) struct State {
    pub(crate) terminal: bool,
    pub(crate) start_of_text: bool,
    pub(crate) end_of_text: bool,
    pub(crate) transitions: FxHashMap<Symbol, SmallVec<[StateId; 2]>>,
    pub(crate) markers: Vec<GroupMarker>,
    pub(crate) backreference: Option<Backreference>,
}

impl State {
    /// First state reachable on `symbol`, if any.
    #[inline]
    pub(crate) fn next_state_with(&self, symbol: Symbol) -> Option<StateId> {
        self.transitions
            .get(&symbol)
            .and_then(|targets| targets.first())
            .copied()
    }

    /// All epsilon targets of this state.
    #[inline]
    pub(crate) fn epsilons(&self) -> &[StateId] {
        self.transitions
            .get(&EPSILON)
            .map(|targets| targets.as_slice())
            .unwrap_or_default()
    }
}

/// Owns every state allocated while compiling one pattern.
#[derive(Clone, Debug, Default)]
pub(crate) struct StateArena {
    states: Vec<State>,
}

impl StateArena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn alloc(&mut self) -> StateId {
        let id = StateId(self.states.len() as u32);
        self.states.push(State::default());
        id
    }

    #[inline]
    pub(crate) fn state(&self, id: StateId) -> &State {
        &self.states[id.index()]
    }

    #[inline]
    pub(crate) fn state_mut(&mut self, id: StateId) -> &mut State {
        &mut self.states[id.index()]
    }

    pub(crate) fn add_transition(&mut self, from: StateId, on: Symbol, to: StateId) {
        self.state_mut(from)
            .transitions
            .entry(on)
            .or_default()
            .push(to);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }
}
