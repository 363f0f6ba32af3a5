use std::collections::BTreeSet;

use tracing::debug;

use crate::config::AddVariableConfig;
use crate::error::{MutatorError, Result};
use crate::generator::{DeclarationGenerator, Generator};
use crate::parser::parse_statement;
use crate::random::RandomSource;
use crate::transformer::{Category, TraversalState, Transformer};
use crate::tree::{Compound, Module, SimpleLine, Statement};
use crate::visit::{fold_module, Fold, Replacement};

/// Inserts an unused, randomly named variable declaration in front of one
/// simple-statement line.
///
/// Every visited line is a candidate with the configured probability; the
/// first line that wins the draw gets the declaration and the rest of the
/// pass is a no-op. Lines are decided when they are left, so lines early in
/// the file are favoured. Docstrings and `from __future__` imports have to
/// lead their scope and are never candidates.
pub struct AddVariable {
    probability: f64,
    generator: DeclarationGenerator,
    rng: RandomSource,
    state: TraversalState,
    applications: usize,
}

impl AddVariable {
    pub const NAME: &'static str = "add_variable";

    pub fn new(config: &AddVariableConfig, rng: RandomSource) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            probability: config.probability,
            generator: DeclarationGenerator::new(
                config.name_length,
                config.supported_kinds.iter().copied().collect(),
                config.annotate_types,
            ),
            rng,
            state: TraversalState::default(),
            applications: 0,
        })
    }

    /// Successful passes acknowledged through `postprocessing`.
    pub fn applications(&self) -> usize {
        self.applications
    }

    pub fn state(&self) -> &TraversalState {
        &self.state
    }

    fn synthesize(&mut self) -> Result<Statement> {
        let decl = self.generator.generate(&mut self.rng)?;
        parse_declaration(&decl.to_string())
    }
}

/// Parse a synthesized declaration, which must be a single simple line.
fn parse_declaration(snippet: &str) -> Result<Statement> {
    match parse_statement(snippet) {
        Ok(stmt) if !stmt.is_compound() => Ok(stmt),
        Ok(_) => Err(MutatorError::StructuralMismatch {
            snippet: snippet.to_string(),
            reason: "not a simple statement".to_string(),
        }),
        Err(e) => Err(MutatorError::StructuralMismatch {
            snippet: snippet.to_string(),
            reason: e.to_string(),
        }),
    }
}

impl Fold for AddVariable {
    fn enter_compound(&mut self, _node: &Compound<'_>) {
        self.state.enter();
    }

    fn leave_compound(&mut self, _node: &Compound<'_>) {
        self.state.leave();
    }

    fn enter_simple_line(&mut self, _line: &SimpleLine<'_>) {
        self.state.enter();
    }

    fn leave_simple_line(&mut self, line: &SimpleLine<'_>) -> Result<Replacement<Statement>> {
        if self.state.worked {
            return Ok(Replacement::Keep);
        }
        self.state.leave();
        if line.is_docstring() || line.kinds().contains(&"future_import_statement") {
            return Ok(Replacement::Keep);
        }
        self.state.visited += 1;

        let declaration = self.synthesize()?;
        if !self.rng.chance(self.probability) {
            return Ok(Replacement::Keep);
        }

        self.state.worked = true;
        debug!(
            site = self.state.visited,
            depth = self.state.depth,
            "inserting unused variable"
        );
        Ok(Replacement::Flatten(vec![declaration, line.to_statement()]))
    }
}

impl Transformer for AddVariable {
    fn apply(&mut self, module: &Module) -> Result<Module> {
        fold_module(self, module)
    }

    fn reset(&mut self) {
        self.state.reset();
    }

    fn worked(&self) -> bool {
        self.state.worked
    }

    fn categories(&self) -> BTreeSet<Category> {
        BTreeSet::from([Category::Naming, Category::Smell])
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn postprocessing(&mut self) {
        self.applications += 1;
        self.reset();
    }
}
