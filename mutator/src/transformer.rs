use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tree::Module;

/// Classification tag attached to a transformer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Naming,
    Smell,
    Structure,
    Lambda,
    Controlflow,
    Comment,
    Nlp,
    Bytecode,
    Testing,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Naming => "naming",
            Category::Smell => "smell",
            Category::Structure => "structure",
            Category::Lambda => "lambda",
            Category::Controlflow => "controlflow",
            Category::Comment => "comment",
            Category::Nlp => "nlp",
            Category::Bytecode => "bytecode",
            Category::Testing => "testing",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mutation operator over a [`Module`].
///
/// One call to [`apply`](Transformer::apply) is one traversal pass that
/// changes at most one location. The pass state survives between calls, so a
/// transformer that already worked keeps returning its input unchanged until
/// [`reset`](Transformer::reset) starts an independent pass.
pub trait Transformer {
    /// Run one pass. Never modifies `module`.
    fn apply(&mut self, module: &Module) -> Result<Module>;

    fn reset(&mut self);

    /// Whether the current pass committed a mutation.
    fn worked(&self) -> bool;

    fn categories(&self) -> BTreeSet<Category>;

    /// Unique key under which the transformer is registered.
    fn name(&self) -> &'static str;

    /// Called by the engine after a successful pass.
    fn postprocessing(&mut self) {
        self.reset();
    }
}

/// Per-pass bookkeeping shared by the concrete transformers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TraversalState {
    pub depth: usize,
    pub visited: usize,
    pub worked: bool,
}

impl TraversalState {
    pub fn enter(&mut self) {
        self.depth += 1;
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
