//! Single-site mutation of Python sources.
//!
//! Sources are parsed with tree-sitter-python into a [`Module`], handed to
//! [`Transformer`]s that each change at most one location per pass, and
//! printed back with [`Module::code`]. Text outside the changed location is
//! kept byte for byte. The [`Engine`] picks transformers by weight and retries
//! them until they find a site.

mod random;

pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod parser;
pub mod transformer;
pub mod transformers;
pub mod tree;
pub mod visit;

pub use crate::config::{AddVariableConfig, EngineConfig, LambdaIdentityConfig, MutatorConfig};
pub use crate::engine::{run, Engine, Outcome, TransformationResult, TransformerRegistry};
pub use crate::error::{MutatorError, ParseError, Result};
pub use crate::parser::{parse_module, parse_statement};
pub use crate::random::RandomSource;
pub use crate::transformer::{Category, TraversalState, Transformer};
pub use crate::transformers::{AddVariable, LambdaIdentity};
pub use crate::tree::{LiteralKind, Module, Statement};

/// Master random source for a configuration: its seed if set, otherwise OS entropy.
pub fn random_source(config: &MutatorConfig) -> RandomSource {
    match config.seed {
        Some(seed) => RandomSource::seeded(seed),
        None => RandomSource::from_entropy(),
    }
}

/// Build an engine with the built-in transformers.
pub fn default_engine(config: &MutatorConfig, mut rng: RandomSource) -> Result<Engine> {
    config.validate()?;
    let registry = TransformerRegistry::with_defaults(config, &mut rng)?;
    Engine::new(registry, config.engine.clone(), rng)
}

/// Parse `source`, run the configured transformations and print the result.
pub fn mutate_source(source: &str, config: &MutatorConfig) -> Result<String> {
    let module = parse_module(source)?;
    let mut engine = default_engine(config, random_source(config))?;
    Ok(engine.transform(None, module)?.code())
}
