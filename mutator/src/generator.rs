//! Random snippet generators used by the inserting transformers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::random::RandomSource;

/// Kind annotation of a synthesized declaration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Int,
    Float,
    Double,
    Str,
}

impl ValueKind {
    pub const ALL: [ValueKind; 4] = [
        ValueKind::Int,
        ValueKind::Float,
        ValueKind::Double,
        ValueKind::Str,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::Str => "str",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that can be drawn from a random source.
pub trait Generator {
    type Output;

    fn generate(&self, rng: &mut RandomSource) -> Result<Self::Output>;
}

/// Random identifiers of a fixed length.
pub struct NameGenerator {
    length: usize,
}

impl NameGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

/// Lowercase words a declaration cannot be named after. `print` and `exec`
/// are statements to the grammar.
const RESERVED: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "exec", "finally", "for", "from", "global", "if", "import", "in", "is",
    "lambda", "nonlocal", "not", "or", "pass", "print", "raise", "return", "try", "while",
    "with", "yield",
];

impl Generator for NameGenerator {
    type Output = String;

    fn generate(&self, rng: &mut RandomSource) -> Result<String> {
        loop {
            let name = rng.identifier(self.length)?;
            if !RESERVED.contains(&name.as_str()) {
                return Ok(name);
            }
        }
    }
}

/// Source text of a literal of the given kind.
pub struct ValueGenerator {
    kind: ValueKind,
}

impl ValueGenerator {
    pub fn new(kind: ValueKind) -> Self {
        Self { kind }
    }
}

impl Generator for ValueGenerator {
    type Output = String;

    fn generate(&self, rng: &mut RandomSource) -> Result<String> {
        Ok(match self.kind {
            ValueKind::Int => rng.int_in(2..=1000).to_string(),
            ValueKind::Float | ValueKind::Double => float_literal(rng.unit()),
            ValueKind::Str => {
                let length = rng.int_in(3..=30) as usize;
                format!("\"{}\"", rng.identifier(length)?)
            }
        })
    }
}

/// `f64` display drops the fraction for whole numbers; keep it a float literal.
fn float_literal(value: f64) -> String {
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

/// A synthesized `name[: kind] = value` line.
#[derive(Clone, Debug, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub kind: ValueKind,
    pub value: String,
    pub annotated: bool,
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.annotated {
            write!(f, "{}: {} = {}", self.name, self.kind, self.value)
        } else {
            write!(f, "{} = {}", self.name, self.value)
        }
    }
}

pub struct DeclarationGenerator {
    names: NameGenerator,
    kinds: Vec<ValueKind>,
    annotate: bool,
}

impl DeclarationGenerator {
    pub fn new(name_length: usize, kinds: Vec<ValueKind>, annotate: bool) -> Self {
        Self {
            names: NameGenerator::new(name_length),
            kinds,
            annotate,
        }
    }
}

impl Generator for DeclarationGenerator {
    type Output = Declaration;

    fn generate(&self, rng: &mut RandomSource) -> Result<Declaration> {
        let name = self.names.generate(rng)?;
        // An empty kind list falls back to int; configs reject it earlier.
        let kind = rng.choose(&self.kinds).copied().unwrap_or(ValueKind::Int);
        let value = ValueGenerator::new(kind).generate(rng)?;
        Ok(Declaration {
            name,
            kind,
            value,
            annotated: self.annotate,
        })
    }
}
