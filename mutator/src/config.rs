use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MutatorError, Result};
use crate::generator::ValueKind;
use crate::tree::LiteralKind;

/// Literal kinds the identity wrap knows how to handle.
pub const WRAPPABLE_KINDS: [LiteralKind; 3] =
    [LiteralKind::Integer, LiteralKind::Float, LiteralKind::String];

/// Root of the `.toml` configuration. Every section is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MutatorConfig {
    /// Master seed; absent means seeding from the operating system.
    pub seed: Option<u64>,
    pub engine: EngineConfig,
    pub add_variable: AddVariableConfig,
    pub lambda_identity: LambdaIdentityConfig,
}

impl MutatorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.add_variable.validate()?;
        self.lambda_identity.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Transformations applied to each tree.
    pub transformations: usize,
    /// `apply` calls allowed per transformation before giving up.
    pub max_attempts: usize,
    /// Relative weight per transformer name. Empty means uniform.
    pub distribution: BTreeMap<String, u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transformations: 1,
            max_attempts: 100,
            distribution: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts < 1 {
            return Err(MutatorError::config("engine.max_attempts must be at least 1"));
        }
        if !self.distribution.is_empty() && self.distribution.values().all(|w| *w == 0) {
            return Err(MutatorError::config(
                "engine.distribution needs at least one non-zero weight",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AddVariableConfig {
    /// Chance of inserting at each visited line.
    pub probability: f64,
    /// Emit `name: kind = value` instead of `name = value`.
    pub annotate_types: bool,
    pub supported_kinds: BTreeSet<ValueKind>,
    pub name_length: usize,
}

impl Default for AddVariableConfig {
    fn default() -> Self {
        Self {
            probability: 0.05,
            annotate_types: true,
            supported_kinds: ValueKind::ALL.into_iter().collect(),
            name_length: 10,
        }
    }
}

impl AddVariableConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(MutatorError::config(format!(
                "add_variable.probability must be within [0, 1], got {}",
                self.probability
            )));
        }
        if self.supported_kinds.is_empty() {
            return Err(MutatorError::config(
                "add_variable.supported_kinds must not be empty",
            ));
        }
        if self.name_length < 1 {
            return Err(MutatorError::InvalidLength {
                length: self.name_length,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LambdaIdentityConfig {
    pub supported_kinds: BTreeSet<LiteralKind>,
}

impl Default for LambdaIdentityConfig {
    fn default() -> Self {
        Self {
            supported_kinds: WRAPPABLE_KINDS.into_iter().collect(),
        }
    }
}

impl LambdaIdentityConfig {
    pub fn validate(&self) -> Result<()> {
        if self.supported_kinds.is_empty() {
            return Err(MutatorError::config(
                "lambda_identity.supported_kinds must not be empty",
            ));
        }
        if let Some(kind) = self
            .supported_kinds
            .iter()
            .find(|k| !WRAPPABLE_KINDS.contains(*k))
        {
            return Err(MutatorError::config(format!(
                "lambda_identity cannot wrap {kind:?} literals"
            )));
        }
        Ok(())
    }
}
