use std::cell::Cell;
use std::collections::HashMap;
use std::iter::FusedIterator;
use std::rc::Rc;

use crate::ast::{Branch, Statement, StatementKind};
use crate::eval::{self, evaluate};
use crate::node::YarnNode;
use crate::result::{
    CommandResult, DialogueResult, NodeCompleteResult, OptionsResult, TextResult,
};
use crate::state::{Session, VariableStorage};
use crate::value::Value;
use crate::Error;

/// Node entered by [`Runner::run_default`].
pub const DEFAULT_START_NODE: &str = "Start";

/// Command that halts the whole run.
const STOP_COMMAND: &str = "stop";

/// Error raised while running dialogue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    #[error("node '{title}' not found")]
    NodeNotFound { title: String },
    #[error("node '{node}': {source}")]
    Parse { node: String, source: Error },
    #[error("variable '${name}' is not set at line {line}")]
    UnsetVariable { name: String, line: usize },
    #[error("unknown function '{name}' at line {line}")]
    UnknownFunction { name: String, line: usize },
    #[error("option {index} is out of range for {count} options")]
    InvalidSelection { index: usize, count: usize },
    #[error("option {index} was already selected")]
    AlreadySelected { index: usize },
    #[error("options must be selected before continuing")]
    UnresolvedChoice,
    #[error("cannot apply '{operator}' to {left} and {right} at line {line}")]
    TypeMismatch {
        operator: String,
        left: String,
        right: String,
        line: usize,
    },
    #[error("cannot apply '{operator}' to {operand} at line {line}")]
    InvalidOperand {
        operator: String,
        operand: String,
        line: usize,
    },
    #[error("'{function}' takes {expected} argument(s), found {found} at line {line}")]
    InvalidArguments {
        function: String,
        expected: usize,
        found: usize,
        line: usize,
    },
}

/// Holds loaded nodes and the session state shared by every run.
#[derive(Debug, Default)]
pub struct Runner {
    nodes: HashMap<String, YarnNode>,
    cache: HashMap<String, Rc<[Statement]>>,
    session: Session,
}

impl Runner {
    /// Add or replace nodes by title. Other titles are untouched.
    pub fn load(&mut self, nodes: impl IntoIterator<Item = YarnNode>) {
        let mut loaded = 0_usize;
        let mut replaced = 0_usize;
        for node in nodes {
            loaded += 1;
            if self.nodes.get(&node.title) == Some(&node) {
                continue;
            }
            self.cache.remove(&node.title);
            if self.nodes.insert(node.title.clone(), node).is_some() {
                replaced += 1;
            }
        }
        tracing::debug!(loaded, replaced, total = self.nodes.len(), "loaded nodes");
    }

    /// Start running from `title`.
    ///
    /// Nothing is evaluated until the returned iterator is advanced; an
    /// unknown title surfaces as the first item.
    ///
    /// A jump runs the destination node on top of the current one, and the
    /// current node continues once the destination completes. Dialogue that
    /// loops back through a hub node therefore keeps every visit open: the
    /// stack grows with each jump and, when the innermost node finally ends
    /// without jumping, one `NodeComplete` is emitted per open visit, most
    /// recent first. Hosts that checkpoint on `NodeComplete` see that
    /// trailing run of completions at the end. Ending a loop with
    /// `<<stop>>` closes every open visit without emitting them.
    #[must_use]
    pub fn run(&mut self, title: impl Into<String>) -> Run<'_> {
        Run {
            runner: self,
            start: Some(title.into()),
            frames: Vec::new(),
            pending: None,
            done: false,
        }
    }

    #[must_use]
    pub fn run_default(&mut self) -> Run<'_> {
        self.run(DEFAULT_START_NODE)
    }

    /// Replace the variable backing. Existing values are not copied over.
    pub fn set_variable_storage(&mut self, storage: impl VariableStorage + 'static) {
        self.session.set_variables(storage);
    }

    /// Make a host function callable from expressions.
    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        function: impl FnMut(&[Value]) -> Value + 'static,
    ) {
        self.session.functions_mut().register(name, function);
    }

    #[must_use]
    pub fn variables(&self) -> &dyn VariableStorage {
        self.session.variables()
    }

    #[must_use]
    pub fn has_visited(&self, title: &str) -> bool {
        self.session.has_visited(title)
    }

    #[must_use]
    pub fn node(&self, title: &str) -> Option<&YarnNode> {
        self.nodes.get(title)
    }

    /// Loaded titles in sorted order.
    #[must_use]
    pub fn node_titles(&self) -> Vec<&str> {
        let mut titles: Vec<_> = self.nodes.keys().map(String::as_str).collect();
        titles.sort_unstable();
        titles
    }

    fn statements(&mut self, title: &str) -> Result<Rc<[Statement]>, RunError> {
        if let Some(statements) = self.cache.get(title) {
            return Ok(Rc::clone(statements));
        }
        let node = self.nodes.get(title).ok_or_else(|| RunError::NodeNotFound {
            title: title.to_string(),
        })?;
        let statements: Rc<[Statement]> = crate::parse_str(&node.body)
            .map_err(|source| RunError::Parse {
                node: title.to_string(),
                source,
            })?
            .into();
        self.cache.insert(title.to_string(), Rc::clone(&statements));
        Ok(statements)
    }
}

#[derive(Debug)]
enum Target {
    /// Bare `[[dest]]`, followed without asking when it stands alone.
    Link(String),
    Node(String),
    Body(Rc<[Statement]>),
}

#[derive(Debug)]
struct Choice {
    text: String,
    line: usize,
    target: Target,
}

impl Choice {
    const fn is_shortcut(&self) -> bool {
        matches!(self.target, Target::Body(_))
    }
}

/// Statements remaining at one nesting level.
#[derive(Debug)]
struct Frame {
    node: String,
    statements: Rc<[Statement]>,
    pos: usize,
    choices: Vec<Choice>,
    /// Node bodies emit `NodeComplete`; `<<if>>` and shortcut bodies do not.
    ends_node: bool,
}

#[derive(Debug)]
struct Pending {
    slot: Rc<Cell<Option<usize>>>,
    choices: Vec<Choice>,
}

/// A suspended run. Each `next` does work up to the following result.
///
/// After an [`DialogueResult::Options`] the run yields
/// [`RunError::UnresolvedChoice`] until one of the options is selected.
/// Any other error ends the run.
#[derive(Debug)]
pub struct Run<'r> {
    runner: &'r mut Runner,
    start: Option<String>,
    frames: Vec<Frame>,
    pending: Option<Pending>,
    done: bool,
}

impl Run<'_> {
    #[must_use]
    pub fn variables(&self) -> &dyn VariableStorage {
        self.runner.variables()
    }

    #[must_use]
    pub fn has_visited(&self, title: &str) -> bool {
        self.runner.has_visited(title)
    }

    fn step(&mut self) -> Result<Option<DialogueResult>, RunError> {
        if let Some(title) = self.start.take() {
            self.enter_node(&title)?;
        }

        if let Some(pending) = self.pending.take() {
            let Some(index) = pending.slot.get() else {
                self.pending = Some(pending);
                return Err(RunError::UnresolvedChoice);
            };
            let count = pending.choices.len();
            let choice = pending
                .choices
                .into_iter()
                .nth(index)
                .ok_or(RunError::InvalidSelection { index, count })?;
            self.follow(choice)?;
        }

        loop {
            let Some(frame) = self.frames.last() else {
                return Ok(None);
            };
            let statements = Rc::clone(&frame.statements);
            let has_choices = !frame.choices.is_empty();

            let Some(statement) = statements.get(frame.pos) else {
                if has_choices {
                    let choices = self.take_choices();
                    if let Some(result) = self.resolve(choices)? {
                        return Ok(Some(result));
                    }
                } else if let Some(frame) = self.frames.pop() {
                    if frame.ends_node {
                        tracing::debug!(node = %frame.node, "node complete");
                        return Ok(Some(DialogueResult::NodeComplete(NodeCompleteResult {
                            title: frame.node,
                        })));
                    }
                }
                continue;
            };

            if statement.kind.is_selectable() {
                self.advance();
                if let Some(choice) = self.choice(statement)? {
                    if let Some(result) = self.accumulate(choice)? {
                        return Ok(Some(result));
                    }
                }
                continue;
            }

            // The statement stays put until the options before it resolve.
            if has_choices {
                let choices = self.take_choices();
                if let Some(result) = self.resolve(choices)? {
                    return Ok(Some(result));
                }
                continue;
            }

            self.advance();
            if let Some(result) = self.execute(statement)? {
                return Ok(Some(result));
            }
        }
    }

    fn execute(&mut self, statement: &Statement) -> Result<Option<DialogueResult>, RunError> {
        let line = statement.line;
        match &statement.kind {
            StatementKind::Text(text) => Ok(Some(DialogueResult::Text(TextResult {
                text: text.clone(),
                node: self.current_node(),
                line,
            }))),
            StatementKind::Command(text) if text == STOP_COMMAND => {
                tracing::debug!(node = %self.current_node(), line, "stopped");
                self.frames.clear();
                Ok(None)
            }
            StatementKind::Command(text) => Ok(Some(DialogueResult::Command(CommandResult {
                text: text.clone(),
                node: self.current_node(),
                line,
            }))),
            StatementKind::Assignment {
                variable,
                op,
                value,
            } => {
                let session = &mut self.runner.session;
                let value = evaluate(value, session)?;
                let value = eval::assign(*op, variable, session.get(variable), value, line)?;
                session.set(variable, value);
                Ok(None)
            }
            StatementKind::Conditional(branches) => {
                if let Some(body) = self.choose_branch(branches)? {
                    self.push_block(Rc::from(body));
                }
                Ok(None)
            }
            // Collected into the option accumulator by `step`.
            StatementKind::Link(_)
            | StatementKind::NamedOption { .. }
            | StatementKind::ShortcutOption { .. } => Ok(None),
        }
    }

    fn choose_branch<'b>(
        &mut self,
        branches: &'b [Branch],
    ) -> Result<Option<&'b [Statement]>, RunError> {
        for branch in branches {
            let taken = match &branch.condition {
                Some(condition) => evaluate(condition, &mut self.runner.session)?.is_truthy(),
                None => true,
            };
            if taken {
                return Ok(Some(&branch.body));
            }
        }
        Ok(None)
    }

    /// Build a choice for a selectable statement, or `None` if its
    /// condition is false.
    fn choice(&mut self, statement: &Statement) -> Result<Option<Choice>, RunError> {
        let condition = match &statement.kind {
            StatementKind::NamedOption { condition, .. }
            | StatementKind::ShortcutOption { condition, .. } => condition.as_ref(),
            _ => None,
        };
        if let Some(condition) = condition {
            if !evaluate(condition, &mut self.runner.session)?.is_truthy() {
                return Ok(None);
            }
        }

        let (text, target) = match &statement.kind {
            StatementKind::Link(destination) => {
                (destination.clone(), Target::Link(destination.clone()))
            }
            StatementKind::NamedOption {
                text, destination, ..
            } => (text.clone(), Target::Node(destination.clone())),
            StatementKind::ShortcutOption { text, body, .. } => {
                (text.clone(), Target::Body(Rc::from(body.as_slice())))
            }
            _ => return Ok(None),
        };
        Ok(Some(Choice {
            text,
            line: statement.line,
            target,
        }))
    }

    /// Add a choice to the top frame's option set. Shortcut options and
    /// node options never share a set, so a change of kind resolves the
    /// set collected so far.
    fn accumulate(&mut self, choice: Choice) -> Result<Option<DialogueResult>, RunError> {
        let Some(frame) = self.frames.last_mut() else {
            return Ok(None);
        };
        let same_kind = frame
            .choices
            .last()
            .is_none_or(|last| last.is_shortcut() == choice.is_shortcut());
        if same_kind {
            frame.choices.push(choice);
            return Ok(None);
        }
        let previous = std::mem::replace(&mut frame.choices, vec![choice]);
        self.resolve(previous)
    }

    fn take_choices(&mut self) -> Vec<Choice> {
        self.frames
            .last_mut()
            .map(|frame| std::mem::take(&mut frame.choices))
            .unwrap_or_default()
    }

    /// Turn accumulated choices into an options result, or follow a lone
    /// link directly.
    fn resolve(&mut self, mut choices: Vec<Choice>) -> Result<Option<DialogueResult>, RunError> {
        if matches!(choices.as_slice(), [Choice { target: Target::Link(_), .. }]) {
            if let Some(choice) = choices.pop() {
                self.follow(choice)?;
            }
            return Ok(None);
        }
        if choices.is_empty() {
            return Ok(None);
        }

        let (texts, lines): (Vec<_>, Vec<_>) = choices
            .iter()
            .map(|choice| (choice.text.clone(), choice.line))
            .unzip();
        let options = OptionsResult::new(texts, lines);
        tracing::debug!(node = %self.current_node(), count = choices.len(), "presenting options");
        self.pending = Some(Pending {
            slot: options.slot(),
            choices,
        });
        Ok(Some(DialogueResult::Options(options)))
    }

    fn follow(&mut self, choice: Choice) -> Result<(), RunError> {
        match choice.target {
            Target::Link(destination) | Target::Node(destination) => {
                tracing::debug!(from = %self.current_node(), to = %destination, "jumping");
                self.enter_node(&destination)
            }
            Target::Body(body) => {
                self.push_block(body);
                Ok(())
            }
        }
    }

    fn enter_node(&mut self, title: &str) -> Result<(), RunError> {
        let statements = self.runner.statements(title)?;
        tracing::debug!(node = title, "entering node");
        self.runner.session.mark_visited(title);
        self.frames.push(Frame {
            node: title.to_string(),
            statements,
            pos: 0,
            choices: Vec::new(),
            ends_node: true,
        });
        Ok(())
    }

    fn push_block(&mut self, statements: Rc<[Statement]>) {
        if statements.is_empty() {
            return;
        }
        let node = self.current_node();
        self.frames.push(Frame {
            node,
            statements,
            pos: 0,
            choices: Vec::new(),
            ends_node: false,
        });
    }

    fn advance(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.pos += 1;
        }
    }

    fn current_node(&self) -> String {
        self.frames
            .last()
            .map(|frame| frame.node.clone())
            .unwrap_or_default()
    }
}

impl Iterator for Run<'_> {
    type Item = Result<DialogueResult, RunError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(result)) => Some(Ok(result)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(RunError::UnresolvedChoice) => Some(Err(RunError::UnresolvedChoice)),
            Err(err) => {
                self.done = true;
                self.frames.clear();
                self.pending = None;
                Some(Err(err))
            }
        }
    }
}

impl FusedIterator for Run<'_> {}
