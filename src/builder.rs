use crate::node::YarnNode;
use crate::runner::Runner;
use crate::state::VariableStorage;
use crate::value::Value;

impl YarnNode {
    /// Create an untagged node.
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tags: String::new(),
            body: body.into(),
        }
    }

    /// Set the space-separated tag list.
    #[must_use]
    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    /// Replace the body text.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

impl Runner {
    /// Create a runner with no nodes and in-memory variables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load nodes, replacing any with the same title.
    #[must_use]
    pub fn with_nodes(mut self, nodes: impl IntoIterator<Item = YarnNode>) -> Self {
        self.load(nodes);
        self
    }

    /// Use `storage` for dialogue variables.
    #[must_use]
    pub fn with_variable_storage(mut self, storage: impl VariableStorage + 'static) -> Self {
        self.set_variable_storage(storage);
        self
    }

    /// Register a host function.
    #[must_use]
    pub fn with_function(
        mut self,
        name: impl Into<String>,
        function: impl FnMut(&[Value]) -> Value + 'static,
    ) -> Self {
        self.register_function(name, function);
        self
    }
}
