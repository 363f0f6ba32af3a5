use std::collections::BTreeSet;

use tracing::debug;

use crate::config::LambdaIdentityConfig;
use crate::error::Result;
use crate::transformer::{Category, TraversalState, Transformer};
use crate::tree::{Compound, Expr, LiteralKind, Module};
use crate::visit::{fold_module, Fold, ValueSite};

/// Wraps the first literal found in a value position into `(lambda: V)()`.
///
/// Value positions are assignment right-hand sides, `return` values and
/// parameter defaults. The pass is deterministic: it always picks the first
/// eligible literal in source order, and after a reset that literal may be the
/// one already sitting inside an earlier wrap.
pub struct LambdaIdentity {
    kinds: BTreeSet<LiteralKind>,
    state: TraversalState,
    value_depth: usize,
    applications: usize,
}

impl LambdaIdentity {
    pub const NAME: &'static str = "lambda_identity";

    pub fn new(config: &LambdaIdentityConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            kinds: config.supported_kinds.clone(),
            state: TraversalState::default(),
            value_depth: 0,
            applications: 0,
        })
    }

    pub fn applications(&self) -> usize {
        self.applications
    }

    fn eligible(&self, expr: &Expr<'_>) -> bool {
        self.value_depth > 0
            && expr
                .literal_kind()
                .is_some_and(|kind| self.kinds.contains(&kind))
    }
}

impl Fold for LambdaIdentity {
    fn enter_compound(&mut self, _node: &Compound<'_>) {
        self.state.enter();
    }

    fn leave_compound(&mut self, _node: &Compound<'_>) {
        self.state.leave();
    }

    fn enter_value(&mut self, _site: ValueSite) {
        self.value_depth += 1;
    }

    fn leave_value(&mut self, _site: ValueSite) {
        self.value_depth = self.value_depth.saturating_sub(1);
    }

    fn leave_expr(&mut self, expr: &Expr<'_>) -> Result<Option<String>> {
        if self.state.worked || !self.eligible(expr) {
            return Ok(None);
        }
        self.state.visited += 1;
        self.state.worked = true;
        debug!(
            depth = self.state.depth,
            literal = expr.text(),
            "wrapping literal in identity lambda"
        );
        Ok(Some(expr.identity_lambda()))
    }
}

impl Transformer for LambdaIdentity {
    fn apply(&mut self, module: &Module) -> Result<Module> {
        self.value_depth = 0;
        fold_module(self, module)
    }

    fn reset(&mut self) {
        self.state.reset();
        self.value_depth = 0;
    }

    fn worked(&self) -> bool {
        self.state.worked
    }

    fn categories(&self) -> BTreeSet<Category> {
        BTreeSet::from([Category::Structure, Category::Lambda])
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn postprocessing(&mut self) {
        self.applications += 1;
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;
    use pretty_assertions::assert_eq;

    fn transformer() -> LambdaIdentity {
        LambdaIdentity::new(&LambdaIdentityConfig::default()).unwrap()
    }

    fn wrap(src: &str) -> (String, bool) {
        let mut t = transformer();
        let out = t.apply(&parse_module(src).unwrap()).unwrap();
        (out.code(), t.worked())
    }

    #[test]
    fn wraps_float_assignment() {
        let (code, worked) = wrap("def some(): \n\ta = 0.5 \n\treturn a");
        assert!(worked);
        assert_eq!(code, "def some(): \n\ta = (lambda: 0.5)() \n\treturn a");
    }

    #[test]
    fn wraps_int_assignment() {
        let (code, worked) = wrap("def some(): \n\ta = 5 \n\treturn a");
        assert!(worked);
        assert_eq!(code.matches("lambda: 5").count(), 1);
    }

    #[test]
    fn wraps_string_assignment() {
        let (code, _) = wrap("def some():\n    a = \"hello\"\n    return a\n");
        assert_eq!(
            code,
            "def some():\n    a = (lambda: \"hello\")()\n    return a\n"
        );
    }

    #[test]
    fn wraps_returned_literal() {
        let (code, worked) = wrap("def some(): \n\treturn 0.5");
        assert!(worked);
        assert_eq!(code, "def some(): \n\treturn (lambda: 0.5)()");
    }

    #[test]
    fn wraps_inline_return() {
        let (code, worked) = wrap("def some(): return 1\n");
        assert!(worked);
        assert_eq!(code, "def some(): return (lambda: 1)()\n");
    }

    #[test]
    fn identical_literals_wrap_only_the_first() {
        let (code, _) = wrap("def some(): \n\ta = 0.5 \n\tb = 0.5 \n\treturn a");
        assert_eq!(code.matches("lambda").count(), 1);
        assert_eq!(
            code,
            "def some(): \n\ta = (lambda: 0.5)() \n\tb = 0.5 \n\treturn a"
        );
    }

    #[test]
    fn second_pass_after_reset_nests() {
        let module = parse_module("def some(): \n\ta = 0.5 \n\treturn a").unwrap();
        let mut t = transformer();
        let once = t.apply(&module).unwrap();
        t.reset();
        let twice = t.apply(&once).unwrap();
        assert!(t.worked());
        let code = twice.code();
        assert_eq!(code.matches("lambda").count(), 2);
        assert!(code.contains("(lambda: (lambda: 0.5)())()"));
    }

    #[test]
    fn second_pass_without_reset_is_a_no_op() {
        let module = parse_module("a = 1\nb = 2\n").unwrap();
        let mut t = transformer();
        let once = t.apply(&module).unwrap();
        let twice = t.apply(&once).unwrap();
        assert_eq!(twice, once);
    }

    #[test]
    fn default_parameters_are_value_sites() {
        let (code, worked) = wrap("def some(a = 0.5): \n\treturn a");
        assert!(worked);
        assert!(code.starts_with("def some(a = (lambda: 0.5)()):"));
    }

    #[test]
    fn nested_literals_in_value_expressions() {
        let (code, _) = wrap("x = foo(bar, 3) + 4\n");
        assert_eq!(code, "x = foo(bar, (lambda: 3)()) + 4\n");
    }

    #[test]
    fn comprehensions_and_sets_are_values_too() {
        let (code, _) = wrap("s = {x for x in range(7)}\n");
        assert_eq!(code, "s = {x for x in range((lambda: 7)())}\n");
        let (code, _) = wrap("f = lambda x=1: x\n");
        assert_eq!(code, "f = lambda x=(lambda: 1)(): x\n");
    }

    #[test]
    fn no_literal_is_a_deterministic_no_op() {
        for _ in 0..3 {
            let (code, worked) = wrap("def some(a):\n\treturn a  # same\n");
            assert!(!worked);
            assert_eq!(code, "def some(a):\n\treturn a  # same\n");
        }
    }

    #[test]
    fn excluded_forms_are_left_alone() {
        let src = "\
def some():
    \"\"\"docstring\"\"\"
    print(5)
    if 3 > x:
        pass
    a = \"a\" \"b\"
    b = f\"{a}\"
    c = b\"raw\"
    d = 2j
    e: Literal[5]
    return a
";
        let (code, worked) = wrap(src);
        assert!(!worked);
        assert_eq!(code, src);
    }

    #[test]
    fn supported_kinds_restrict_wrapping() {
        let config = LambdaIdentityConfig {
            supported_kinds: [LiteralKind::String].into_iter().collect(),
        };
        let mut t = LambdaIdentity::new(&config).unwrap();
        let out = t
            .apply(&parse_module("a = 1\nb = 'x'\n").unwrap())
            .unwrap();
        assert_eq!(out.code(), "a = 1\nb = (lambda: 'x')()\n");
    }

    #[test]
    fn metadata() {
        let t = transformer();
        assert_eq!(t.name(), "lambda_identity");
        assert_eq!(
            t.categories(),
            BTreeSet::from([Category::Structure, Category::Lambda])
        );
    }
}
