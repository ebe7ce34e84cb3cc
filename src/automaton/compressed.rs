//! Sparse run form.
//!
//! Dictionary automata are very sparse: most states have one or two live
//! classes out of dozens. For each state only the run of classes between the
//! first and the last live transition is kept:
//!
//! ```text
//! dense row:   [DEAD, DEAD, 4, DEAD, 7, DEAD]
//! first_class: 2
//! run:         [4, DEAD, 7]        offsets[s]..offsets[s + 1] in `runs`
//! ```
//!
//! Stepping costs two extra bounds checks over the dense table.

use super::arena::StateId;
use super::run_form::{check_header, check_targets, CharClasses, Dfa, RunForm, DEAD};
use crate::error::DecodeError;

#[derive(Clone, Debug)]
pub struct CompressedRunForm {
    pub(crate) size: usize,
    pub(crate) initial: u32,
    pub(crate) accept: Vec<bool>,
    pub(crate) classes: CharClasses,
    /// First live class per state (0 for states without transitions)
    pub(crate) first_class: Vec<u32>,
    /// `size + 1` offsets into `runs`
    pub(crate) offsets: Vec<u32>,
    pub(crate) runs: Vec<u32>,
}

impl CompressedRunForm {
    pub fn new(form: &RunForm) -> Self {
        let classes = form.classes.len();
        let mut first_class = Vec::with_capacity(form.size);
        let mut offsets = Vec::with_capacity(form.size + 1);
        let mut runs = Vec::new();

        for row in form.transitions.chunks_exact(classes) {
            offsets.push(runs.len() as u32);
            match row.iter().position(|&t| t != DEAD) {
                Some(begin) => {
                    let end = row.iter().rposition(|&t| t != DEAD).map_or(begin, |e| e + 1);
                    first_class.push(begin as u32);
                    runs.extend_from_slice(&row[begin..end]);
                }
                None => first_class.push(0),
            }
        }
        offsets.push(runs.len() as u32);

        Self {
            size: form.size,
            initial: form.initial,
            accept: form.accept.clone(),
            classes: form.classes.clone(),
            first_class,
            offsets,
            runs,
        }
    }

    pub(crate) fn from_parts(
        size: usize,
        initial: u32,
        accept: Vec<bool>,
        points: Vec<u32>,
        first_class: Vec<u32>,
        offsets: Vec<u32>,
        runs: Vec<u32>,
    ) -> Result<Self, DecodeError> {
        check_header(size, initial, &accept)?;
        let classes = CharClasses::from_points(points)?;
        if first_class.len() != size {
            return Err(DecodeError::Invalid(format!(
                "{} first-class entries for {size} states",
                first_class.len()
            )));
        }
        if offsets.len() != size + 1 {
            return Err(DecodeError::Invalid(format!(
                "{} offsets for {size} states",
                offsets.len()
            )));
        }
        if offsets[0] != 0 || offsets[size] as usize != runs.len() {
            return Err(DecodeError::Invalid(
                "offsets do not span the transition runs".to_string(),
            ));
        }
        for (s, w) in offsets.windows(2).enumerate() {
            if w[0] > w[1] {
                return Err(DecodeError::Invalid(format!(
                    "offsets decrease at state {s}"
                )));
            }
            let run = (w[1] - w[0]) as usize;
            if first_class[s] as usize + run > classes.len() {
                return Err(DecodeError::Invalid(format!(
                    "run of state {s} extends past the last class"
                )));
            }
        }
        check_targets(&runs, size)?;
        Ok(Self {
            size,
            initial,
            accept,
            classes,
            first_class,
            offsets,
            runs,
        })
    }

    /// Expand back into a dense run form.
    pub fn decompress(&self) -> RunForm {
        let classes = self.classes.len();
        let mut transitions = vec![DEAD; self.size * classes];
        for state in 0..self.size {
            let run = &self.runs[self.offsets[state] as usize..self.offsets[state + 1] as usize];
            let begin = state * classes + self.first_class[state] as usize;
            transitions[begin..begin + run.len()].copy_from_slice(run);
        }
        RunForm {
            size: self.size,
            initial: self.initial,
            accept: self.accept.clone(),
            classes: self.classes.clone(),
            transitions,
        }
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Approximate heap size of the tables, in bytes.
    pub fn memory_usage(&self) -> usize {
        (self.runs.len() + self.offsets.len() + self.first_class.len() + self.classes.len())
            * std::mem::size_of::<u32>()
            + self.accept.len()
    }
}

impl From<&RunForm> for CompressedRunForm {
    fn from(form: &RunForm) -> Self {
        CompressedRunForm::new(form)
    }
}

impl Dfa for CompressedRunForm {
    #[inline]
    fn initial_state(&self) -> StateId {
        StateId::from_raw(self.initial)
    }

    #[inline]
    fn step(&self, state: StateId, c: char) -> Option<StateId> {
        self.step_class(state, self.classes.class(c))
    }

    #[inline]
    fn is_accepting(&self, state: StateId) -> bool {
        self.accept[state.index()]
    }

    fn state_count(&self) -> usize {
        self.size
    }

    fn break_points(&self) -> &[u32] {
        self.classes.points()
    }

    #[inline]
    fn step_class(&self, state: StateId, class: usize) -> Option<StateId> {
        let s = state.index();
        let delta = class.checked_sub(self.first_class[s] as usize)?;
        let pos = self.offsets[s] as usize + delta;
        if pos >= self.offsets[s + 1] as usize {
            return None;
        }
        let next = self.runs[pos];
        (next != DEAD).then_some(StateId::from_raw(next))
    }
}
