//! Python front-end on top of tree-sitter-python.
//!
//! tree-sitter recovers from syntax errors by inserting `ERROR` and missing
//! nodes; a tree holding either is rejected here with the location of the
//! first one, so the rest of the crate only ever sees valid sources.

use tree_sitter::{Language, Node, Parser};

use crate::error::{ParseError, Result};
use crate::tree::{Module, Statement};

const SIMPLE_STATEMENTS: &[&str] = &[
    "future_import_statement",
    "import_statement",
    "import_from_statement",
    "print_statement",
    "assert_statement",
    "expression_statement",
    "return_statement",
    "delete_statement",
    "raise_statement",
    "pass_statement",
    "break_statement",
    "continue_statement",
    "global_statement",
    "nonlocal_statement",
    "exec_statement",
    "type_alias_statement",
];

const COMPOUND_STATEMENTS: &[&str] = &[
    "if_statement",
    "for_statement",
    "while_statement",
    "try_statement",
    "with_statement",
    "function_definition",
    "class_definition",
    "decorated_definition",
    "match_statement",
];

pub(crate) fn is_simple_statement(kind: &str) -> bool {
    SIMPLE_STATEMENTS.contains(&kind)
}

pub(crate) fn is_compound_statement(kind: &str) -> bool {
    COMPOUND_STATEMENTS.contains(&kind)
}

fn python() -> Language {
    tree_sitter_python::LANGUAGE.into()
}

/// Parse a whole source file.
pub fn parse_module(source: &str) -> Result<Module> {
    let mut parser = Parser::new();
    parser.set_language(&python())?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ParseError::new(1, 1, "parser produced no tree"))?;
    if let Some(error) = first_error(tree.root_node(), source) {
        return Err(error.into());
    }
    Ok(Module::new(source.to_string(), tree))
}

/// Parse exactly one statement, as used to synthesize snippets.
pub fn parse_statement(source: &str) -> Result<Statement> {
    let module = parse_module(source)?;
    let root = module.root();
    let mut cursor = root.walk();
    let statements: Vec<Node<'_>> = root
        .named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect();
    match statements.as_slice() {
        [only] => {
            let text = only.utf8_text(source.as_bytes()).unwrap_or_default();
            Ok(Statement::snippet(text, is_compound_statement(only.kind())))
        }
        [] => Err(ParseError::new(1, 1, "expected a statement").into()),
        [_, second, ..] => Err(located(*second, "expected a single statement").into()),
    }
}

fn located(node: Node<'_>, message: impl Into<String>) -> ParseError {
    let at = node.start_position();
    ParseError::new(at.row + 1, at.column + 1, message)
}

/// Depth-first search for the first node tree-sitter had to invent or skip.
fn first_error(node: Node<'_>, source: &str) -> Option<ParseError> {
    if node.is_missing() {
        return Some(located(node, format!("missing `{}`", node.kind())));
    }
    if node.is_error() {
        let text = node.utf8_text(source.as_bytes()).unwrap_or_default();
        let first_line: String = text.lines().next().unwrap_or_default().chars().take(24).collect();
        return Some(located(node, format!("unexpected `{first_line}`")));
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .find_map(|child| first_error(child, source));
    found
}
