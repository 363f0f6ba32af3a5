//! Parsed Python sources and the node views handed to folds.
//!
//! A [`Module`] owns its source text together with the concrete syntax tree
//! tree-sitter built for it. Printing returns the text itself, so a module no
//! pass has edited comes back byte for byte, comments and blank lines
//! included. Passes never edit a module in place: they describe byte-range
//! edits of the old text and the result is parsed into a new module.

use std::fmt;

use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Tree};

#[derive(Clone)]
pub struct Module {
    source: String,
    tree: Tree,
}

impl Module {
    pub(crate) fn new(source: String, tree: Tree) -> Self {
        Self { source, tree }
    }

    /// Print the module back to source text.
    pub fn code(&self) -> String {
        self.source.clone()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }
}

/// Equal text parses to an equal tree, so the text alone decides.
impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Module {}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Source text of one statement, ready to be spliced into a block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statement {
    text: String,
    compound: bool,
    /// Continuation lines already carry the indentation of their block.
    anchored: bool,
}

impl Statement {
    /// A statement parsed on its own, written at column zero.
    pub(crate) fn snippet(text: impl Into<String>, compound: bool) -> Self {
        Self {
            text: text.into(),
            compound,
            anchored: false,
        }
    }

    /// A line cut out of a module, indentation and all.
    pub(crate) fn anchored(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            compound: false,
            anchored: true,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_compound(&self) -> bool {
        self.compound
    }

    /// Text to splice at a position already indented by `indent`.
    pub(crate) fn render(&self, indent: &str, newline: &str) -> String {
        if self.anchored {
            return self.text.clone();
        }
        let mut lines = self.text.lines();
        let mut out = lines.next().unwrap_or_default().to_string();
        for line in lines {
            out.push_str(newline);
            if !line.is_empty() {
                out.push_str(indent);
            }
            out.push_str(line);
        }
        out
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Kind of a literal value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiteralKind {
    Integer,
    Float,
    Imaginary,
    String,
    Bytes,
    #[serde(rename = "fstring")]
    FormattedString,
}

/// A compound statement (`def`, `class`, `if`, `try`, `with`, ...) as seen by a fold.
pub struct Compound<'t> {
    node: Node<'t>,
}

impl<'t> Compound<'t> {
    pub(crate) fn new(node: Node<'t>) -> Self {
        Self { node }
    }

    /// Grammar name of the statement, e.g. `function_definition`.
    pub fn kind(&self) -> &'static str {
        self.node.kind()
    }
}

/// One or more `;`-separated simple statements sharing a physical line.
pub struct SimpleLine<'t> {
    statements: Vec<Node<'t>>,
    text: String,
}

impl<'t> SimpleLine<'t> {
    pub(crate) fn new(statements: Vec<Node<'t>>, text: String) -> Self {
        Self { statements, text }
    }

    /// Current text of the line, with edits made inside it applied.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.statements.iter().map(|s| s.kind()).collect()
    }

    /// A line holding nothing but a string, as docstrings do.
    pub fn is_docstring(&self) -> bool {
        let [statement] = self.statements.as_slice() else {
            return false;
        };
        statement.kind() == "expression_statement"
            && statement.named_child_count() == 1
            && statement
                .named_child(0)
                .is_some_and(|child| matches!(child.kind(), "string" | "concatenated_string"))
    }

    /// The line as a statement, for splicing it back next to new ones.
    pub fn to_statement(&self) -> Statement {
        Statement::anchored(self.text.clone())
    }
}

/// An expression node as seen by a fold.
pub struct Expr<'t> {
    node: Node<'t>,
    text: String,
}

impl<'t> Expr<'t> {
    pub(crate) fn new(node: Node<'t>, text: String) -> Self {
        Self { node, text }
    }

    pub fn kind(&self) -> &'static str {
        self.node.kind()
    }

    /// Current text of the expression, with edits made inside it applied.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The literal this expression is, if it is a single literal.
    ///
    /// Implicit concatenations are not literals; neither are `True`, `False`
    /// and `None`.
    pub fn literal_kind(&self) -> Option<LiteralKind> {
        match self.node.kind() {
            "integer" | "float" if self.text.ends_with(['j', 'J']) => Some(LiteralKind::Imaginary),
            "integer" => Some(LiteralKind::Integer),
            "float" => Some(LiteralKind::Float),
            "string" => {
                let prefix = self
                    .text
                    .split(['"', '\''])
                    .next()
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                Some(if prefix.contains(['f', 't']) {
                    LiteralKind::FormattedString
                } else if prefix.contains('b') {
                    LiteralKind::Bytes
                } else {
                    LiteralKind::String
                })
            }
            _ => None,
        }
    }

    /// `(lambda: <expr>)()`
    pub fn identity_lambda(&self) -> String {
        format!("(lambda: {})()", self.text)
    }
}
