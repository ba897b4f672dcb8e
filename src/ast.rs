/// A parsed statement with the source line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub line: usize,
}

/// Statement kinds of a node body.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// Line of dialogue.
    Text(String),
    /// `[[dest]]`: jump candidate with no separate display text.
    Link(String),
    /// `[[text|dest]]`, optionally `<<if expr>>` on the same line.
    NamedOption {
        text: String,
        destination: String,
        condition: Option<Expr>,
    },
    /// `-> text` with an indented body, optionally `<<if expr>>`.
    ShortcutOption {
        text: String,
        body: Vec<Statement>,
        condition: Option<Expr>,
    },
    /// `<<if>>` / `<<elseif>>` / `<<else>>` / `<<endif>>` chain.
    Conditional(Vec<Branch>),
    /// `<<set $variable OP expr>>`.
    Assignment {
        variable: String,
        op: AssignOp,
        value: Expr,
    },
    /// Any other `<<...>>`, inner text trimmed.
    Command(String),
}

impl StatementKind {
    /// Whether the statement takes part in option coalescing.
    #[must_use]
    pub const fn is_selectable(&self) -> bool {
        matches!(
            self,
            Self::Link(_) | Self::NamedOption { .. } | Self::ShortcutOption { .. }
        )
    }
}

/// One arm of a conditional chain; `condition` is `None` for `<<else>>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: Option<Expr>,
    pub body: Vec<Statement>,
    pub line: usize,
}

/// Assignment operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl AssignOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Set => "=",
            Self::Add => "+=",
            Self::Subtract => "-=",
            Self::Multiply => "*=",
            Self::Divide => "/=",
        }
    }
}

/// Expression with the source line it appears on.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
}

/// Leaf value of an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    /// `$name`, stored without the sigil.
    Variable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    Xor,
    And,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    /// Binding strength; all binary operators are left-associative.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Or | Self::Xor => 1,
            Self::And => 2,
            Self::Equal | Self::NotEqual => 3,
            Self::Less | Self::LessEqual | Self::Greater | Self::GreaterEqual => 4,
            Self::Add | Self::Subtract => 5,
            Self::Multiply | Self::Divide => 6,
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Or => "||",
            Self::Xor => "^",
            Self::And => "&&",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl UnaryOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Negate => "-",
            Self::Not => "!",
        }
    }
}

impl Expr {
    #[must_use]
    pub const fn new(kind: ExprKind, line: usize) -> Self {
        Self { kind, line }
    }

    #[must_use]
    pub const fn literal(literal: Literal, line: usize) -> Self {
        Self::new(ExprKind::Literal(literal), line)
    }
}
