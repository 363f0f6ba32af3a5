//! Retry loop and the weighted multi-transformer engine on top of it.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, MutatorConfig};
use crate::error::{MutatorError, Result};
use crate::random::RandomSource;
use crate::transformer::{Category, Transformer};
use crate::transformers::{AddVariable, LambdaIdentity};
use crate::tree::Module;

/// Result of [`run`].
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    pub module: Module,
    pub worked: bool,
    /// `apply` calls spent.
    pub attempts: usize,
}

/// Drive `transformer` over `module` until one pass works or `max_attempts`
/// passes have been spent.
///
/// The transformer is reset once up front. On success its `postprocessing`
/// runs and the mutated tree is returned; otherwise the original tree comes
/// back unchanged. Errors from `apply` abort immediately.
pub fn run(
    transformer: &mut dyn Transformer,
    module: Module,
    max_attempts: usize,
) -> Result<Outcome> {
    transformer.reset();
    let mut attempts = 0;
    while attempts < max_attempts {
        attempts += 1;
        let candidate = transformer.apply(&module)?;
        debug!(transformer = transformer.name(), attempt = attempts, "pass finished");
        if transformer.worked() {
            transformer.postprocessing();
            return Ok(Outcome {
                module: candidate,
                worked: true,
                attempts,
            });
        }
    }
    warn!(
        transformer = transformer.name(),
        attempts, "no mutation site accepted"
    );
    Ok(Outcome {
        module,
        worked: false,
        attempts,
    })
}

/// Transformers known to an [`Engine`], kept in registration order.
#[derive(Default)]
pub struct TransformerRegistry {
    transformers: Vec<Box<dyn Transformer + Send>>,
}

impl TransformerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Both built-in transformers, each with a generator forked from `rng`.
    pub fn with_defaults(config: &MutatorConfig, rng: &mut RandomSource) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Box::new(AddVariable::new(&config.add_variable, rng.fork())?))?;
        registry.register(Box::new(LambdaIdentity::new(&config.lambda_identity)?))?;
        Ok(registry)
    }

    pub fn register(&mut self, transformer: Box<dyn Transformer + Send>) -> Result<()> {
        let name = transformer.name();
        if self.position(name).is_some() {
            return Err(MutatorError::config(format!(
                "transformer `{name}` is already registered"
            )));
        }
        self.transformers.push(transformer);
        Ok(())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn Transformer + Send)> {
        let index = self.position(name)?;
        Some(self.transformers[index].as_mut())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.transformers.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.transformers.iter().position(|t| t.name() == name)
    }
}

/// One requested transformation of one tree.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransformationResult {
    pub label: Option<String>,
    pub transformer: String,
    pub categories: BTreeSet<Category>,
    pub attempts: usize,
    pub applied: bool,
}

/// Applies a configured number of weighted-random transformations to a tree.
pub struct Engine {
    registry: TransformerRegistry,
    config: EngineConfig,
    rng: RandomSource,
    weights: Vec<u32>,
    results: Vec<TransformationResult>,
}

impl Engine {
    pub fn new(
        registry: TransformerRegistry,
        config: EngineConfig,
        rng: RandomSource,
    ) -> Result<Self> {
        config.validate()?;
        if registry.is_empty() {
            return Err(MutatorError::config("no transformers registered"));
        }
        let weights = vec![1; registry.len()];
        let distribution = config.distribution.clone();
        let mut engine = Self {
            registry,
            config,
            rng,
            weights,
            results: Vec::new(),
        };
        if !distribution.is_empty() {
            engine.set_distribution(&distribution)?;
        }
        Ok(engine)
    }

    /// Replace the selection weights. Transformers missing from the map are
    /// never selected.
    pub fn set_distribution(&mut self, distribution: &BTreeMap<String, u32>) -> Result<()> {
        let names = self.registry.names();
        if let Some(unknown) = distribution
            .keys()
            .find(|k| !names.iter().any(|n| *n == k.as_str()))
        {
            return Err(MutatorError::config(format!(
                "unknown transformer `{unknown}` in distribution"
            )));
        }
        let weights: Vec<u32> = names
            .iter()
            .map(|n| distribution.get(*n).copied().unwrap_or(0))
            .collect();
        if weights.iter().all(|w| *w == 0) {
            return Err(MutatorError::config(
                "distribution needs at least one non-zero weight",
            ));
        }
        self.weights = weights;
        Ok(())
    }

    /// Run `config.transformations` selections over `module`, threading the
    /// tree through each one.
    pub fn transform(&mut self, label: Option<&str>, module: Module) -> Result<Module> {
        let mut module = module;
        for _ in 0..self.config.transformations {
            let index = self.rng.weighted(&self.weights)?;
            let transformer = self.registry.transformers[index].as_mut();
            let outcome = run(&mut *transformer, module, self.config.max_attempts)?;
            if outcome.worked {
                info!(
                    transformer = transformer.name(),
                    attempts = outcome.attempts,
                    label = label.unwrap_or("<anonymous>"),
                    "applied transformation"
                );
            }
            self.results.push(TransformationResult {
                label: label.map(str::to_string),
                transformer: transformer.name().to_string(),
                categories: transformer.categories(),
                attempts: outcome.attempts,
                applied: outcome.worked,
            });
            module = outcome.module;
        }
        Ok(module)
    }

    pub fn finished_results(&self) -> &[TransformationResult] {
        &self.results
    }
}
