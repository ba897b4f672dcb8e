//! Values yielded to the host by a running dialogue.

use std::cell::Cell;
use std::rc::Rc;

use crate::runner::RunError;

/// One step of dialogue output.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogueResult {
    Text(TextResult),
    Command(CommandResult),
    Options(OptionsResult),
    NodeComplete(NodeCompleteResult),
}

impl DialogueResult {
    #[must_use]
    pub const fn as_text(&self) -> Option<&TextResult> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_command(&self) -> Option<&CommandResult> {
        match self {
            Self::Command(command) => Some(command),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_options(&self) -> Option<&OptionsResult> {
        match self {
            Self::Options(options) => Some(options),
            _ => None,
        }
    }
}

/// A line of dialogue to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResult {
    pub text: String,
    pub node: String,
    pub line: usize,
}

/// A `<<command>>` for the host to interpret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub text: String,
    pub node: String,
    pub line: usize,
}

/// Emitted when a node's statements are exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCompleteResult {
    pub title: String,
}

/// A set of choices. The run does not advance until `select` is called.
///
/// Clones share the same selection slot, so selecting through any clone
/// resolves the pending choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsResult {
    pub options: Vec<String>,
    pub lines: Vec<usize>,
    selection: Rc<Cell<Option<usize>>>,
}

impl OptionsResult {
    pub(crate) fn new(options: Vec<String>, lines: Vec<usize>) -> Self {
        Self {
            options,
            lines,
            selection: Rc::new(Cell::new(None)),
        }
    }

    pub(crate) fn slot(&self) -> Rc<Cell<Option<usize>>> {
        Rc::clone(&self.selection)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// The chosen index, once `select` has succeeded.
    #[must_use]
    pub fn selection(&self) -> Option<usize> {
        self.selection.get()
    }

    /// Choose an option by position.
    ///
    /// # Errors
    ///
    /// `InvalidSelection` if `index` is out of range, `AlreadySelected` if a
    /// choice was already made.
    pub fn select(&self, index: usize) -> Result<(), RunError> {
        if let Some(index) = self.selection.get() {
            return Err(RunError::AlreadySelected { index });
        }
        if index >= self.options.len() {
            return Err(RunError::InvalidSelection {
                index,
                count: self.options.len(),
            });
        }
        self.selection.set(Some(index));
        Ok(())
    }
}
