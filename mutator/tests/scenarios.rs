use std::collections::{BTreeMap, BTreeSet};

use cst_mutator::{
    default_engine, mutate_source, parse_module, run, AddVariable, AddVariableConfig, Category,
    LambdaIdentity, LambdaIdentityConfig, MutatorConfig, RandomSource, Transformer,
};
use pretty_assertions::assert_eq;

const SAMPLE: &str = "def f():\n    a = 5\n    return a\n";

#[test]
fn lambda_identity_wraps_the_assigned_int_once() {
    let mut t = LambdaIdentity::new(&LambdaIdentityConfig::default()).unwrap();
    let outcome = run(&mut t, parse_module(SAMPLE).unwrap(), 10).unwrap();
    assert!(outcome.worked);
    assert_eq!(outcome.attempts, 1);
    let code = outcome.module.code();
    assert_eq!(code.matches("lambda: 5").count(), 1);
    assert_eq!(code, "def f():\n    a = (lambda: 5)()\n    return a\n");
    assert_eq!(t.applications(), 1);
}

#[test]
fn add_variable_declares_before_the_first_line() {
    let config = AddVariableConfig {
        probability: 1.0,
        ..AddVariableConfig::default()
    };
    let mut t = AddVariable::new(&config, RandomSource::seeded(31)).unwrap();
    let outcome = run(&mut t, parse_module(SAMPLE).unwrap(), 10).unwrap();
    assert!(outcome.worked);

    let code = outcome.module.code();
    let lines: Vec<&str> = code.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[2], "    a = 5");
    assert_eq!(lines[3], "    return a");

    let declaration = lines[1].trim_start();
    let (name, rest) = declaration.split_once(": ").unwrap();
    assert_eq!(name.len(), 10);
    let (kind, _value) = rest.split_once(" = ").unwrap();
    assert!(["int", "float", "double", "str"].contains(&kind));
}

#[test]
fn identical_floats_get_one_wrap_on_the_first() {
    let src = "def some():\n    a = 0.5\n    b = 0.5\n    return a + b\n";
    let mut t = LambdaIdentity::new(&LambdaIdentityConfig::default()).unwrap();
    let out = t.apply(&parse_module(src).unwrap()).unwrap();
    assert_eq!(
        out.code(),
        "def some():\n    a = (lambda: 0.5)()\n    b = 0.5\n    return a + b\n"
    );
}

#[test]
fn two_engine_runs_accumulate_two_lambdas() {
    let mut t = LambdaIdentity::new(&LambdaIdentityConfig::default()).unwrap();
    let once = run(&mut t, parse_module(SAMPLE).unwrap(), 1).unwrap();
    let twice = run(&mut t, once.module, 1).unwrap();
    assert!(twice.worked);
    assert_eq!(twice.module.code().matches("lambda").count(), 2);
    assert_eq!(t.applications(), 2);
}

#[test]
fn engine_reports_categories_per_transformation() {
    let mut config = MutatorConfig {
        seed: Some(3),
        ..MutatorConfig::default()
    };
    config.engine.transformations = 4;
    config.add_variable.probability = 1.0;
    let mut engine = default_engine(&config, RandomSource::seeded(3)).unwrap();
    let out = engine
        .transform(Some("sample.py"), parse_module(SAMPLE).unwrap())
        .unwrap();

    let results = engine.finished_results();
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r.applied));
    for r in results {
        let expected = match r.transformer.as_str() {
            "add_variable" => [Category::Naming, Category::Smell],
            "lambda_identity" => [Category::Lambda, Category::Structure],
            other => panic!("unexpected transformer {other}"),
        };
        assert_eq!(r.categories, expected.into_iter().collect::<BTreeSet<_>>());
    }

    let inserted = results
        .iter()
        .filter(|r| r.transformer == "add_variable")
        .count();
    assert_eq!(out.code().lines().count(), 3 + inserted);
}

#[test]
fn seeded_config_reproduces_output() {
    let config = MutatorConfig::from_toml_str(
        r#"
seed = 99

[engine]
transformations = 3

[add_variable]
probability = 0.5
"#,
    )
    .unwrap();
    let src = "x = 1\nfor i in range(x):\n    print(i)\n    x += i\n";
    let first = mutate_source(src, &config).unwrap();
    for _ in 0..3 {
        assert_eq!(mutate_source(src, &config).unwrap(), first);
    }
}

#[test]
fn lambda_only_distribution_leaves_statements_alone() {
    let mut config = MutatorConfig {
        seed: Some(8),
        ..MutatorConfig::default()
    };
    config.engine.distribution = BTreeMap::from([
        ("add_variable".to_string(), 0),
        ("lambda_identity".to_string(), 1),
    ]);
    let out = mutate_source("def f(x=1):\n    return x\n", &config).unwrap();
    assert_eq!(out, "def f(x=(lambda: 1)()):\n    return x\n");
}

const SERVICE: &str = r#"#!/usr/bin/env python3
"""Tiny service module."""
from __future__ import annotations

import functools


@functools.lru_cache(maxsize=None)
def lookup(key: str, *args, retries: int = 3, **kwargs) -> str | None:
    try:
        with open(key) as fh:  # may be missing
            return fh.read()
    except OSError:
        pass
    return None


class Registry:
    entries = {1, 2}

    def names(self):
        return [n.upper() for n in self.entries if n]
"#;

#[test]
fn everyday_module_gets_one_local_change() {
    let mut config = MutatorConfig {
        seed: Some(17),
        ..MutatorConfig::default()
    };
    config.engine.distribution = BTreeMap::from([("lambda_identity".to_string(), 1)]);
    let out = mutate_source(SERVICE, &config).unwrap();
    assert_eq!(
        out,
        SERVICE.replace("retries: int = 3", "retries: int = (lambda: 3)()")
    );
}

#[test]
fn everyday_module_gets_one_declaration() {
    let mut config = MutatorConfig {
        seed: Some(4),
        ..MutatorConfig::default()
    };
    config.engine.distribution = BTreeMap::from([("add_variable".to_string(), 1)]);
    config.add_variable.probability = 1.0;
    let out = mutate_source(SERVICE, &config).unwrap();

    let before: Vec<&str> = SERVICE.lines().collect();
    let after: Vec<&str> = out.lines().collect();
    assert_eq!(after.len(), before.len() + 1);
    // Shebang, docstring and the future import keep their places.
    assert_eq!(after[..4].to_vec(), before[..4].to_vec());
    assert!(after[4].contains(" = "));
    assert_eq!(after[5], "import functools");
    assert_eq!(after[5..].to_vec(), before[4..].to_vec());
}
