//! Depth-first folding over a [`Module`].
//!
//! A [`Fold`] receives enter hooks in pre-order and leave hooks in post-order.
//! Leave hooks see each node with the edits already made inside it and answer
//! with what takes its place. The walker keeps those answers as byte-range
//! edits of the source; when there are any, the edited text is parsed into a
//! fresh module, otherwise the input comes back as it was.

use std::ops::Range;

use tree_sitter::Node;

use crate::error::{MutatorError, Result};
use crate::parser::{is_compound_statement, is_simple_statement, parse_module};
use crate::tree::{Compound, Expr, Module, SimpleLine, Statement};

/// What a leave hook puts in place of the node it was given.
#[derive(Clone, Debug, PartialEq)]
pub enum Replacement<T> {
    Keep,
    Remove,
    /// Splice several nodes into the enclosing sequence, in order.
    Flatten(Vec<T>),
}

/// Positions whose expression is a value being bound or returned.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueSite {
    Assign,
    AnnAssign,
    AugAssign,
    Return,
    ParamDefault,
}

pub trait Fold {
    fn enter_compound(&mut self, _node: &Compound<'_>) {}

    fn leave_compound(&mut self, _node: &Compound<'_>) {}

    /// Simple lines of indented blocks and of the module. Statements of an
    /// inline suite (`if x: y = 1`) belong to their header and are not lines.
    fn enter_simple_line(&mut self, _line: &SimpleLine<'_>) {}

    fn leave_simple_line(&mut self, _line: &SimpleLine<'_>) -> Result<Replacement<Statement>> {
        Ok(Replacement::Keep)
    }

    fn enter_value(&mut self, _site: ValueSite) {}

    fn leave_value(&mut self, _site: ValueSite) {}

    /// `Some(text)` replaces the expression with `text`.
    fn leave_expr(&mut self, _expr: &Expr<'_>) -> Result<Option<String>> {
        Ok(None)
    }
}

pub fn fold_module<F: Fold + ?Sized>(f: &mut F, module: &Module) -> Result<Module> {
    let source = module.source();
    let mut walker = Walker {
        fold: f,
        source,
        newline: if source.contains("\r\n") { "\r\n" } else { "\n" },
        edits: Vec::new(),
    };
    walker.block(module.root())?;
    if walker.edits.is_empty() {
        return Ok(module.clone());
    }
    let text = walker.render(0..source.len());
    parse_module(&text).map_err(|e| MutatorError::StructuralMismatch {
        snippet: walker
            .edits
            .iter()
            .map(|edit| edit.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        reason: e.to_string(),
    })
}

struct Edit {
    range: Range<usize>,
    text: String,
}

struct Walker<'w, F: ?Sized> {
    fold: &'w mut F,
    source: &'w str,
    newline: &'static str,
    /// Disjoint, sorted by start.
    edits: Vec<Edit>,
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect()
}

impl<'w, F: Fold + ?Sized> Walker<'w, F> {
    /// Source text of `range` with the edits inside it applied.
    fn render(&self, range: Range<usize>) -> String {
        let mut out = String::with_capacity(range.len());
        let mut at = range.start;
        for edit in self
            .edits
            .iter()
            .filter(|e| e.range.start >= range.start && e.range.end <= range.end)
        {
            out.push_str(&self.source[at..edit.range.start]);
            out.push_str(&edit.text);
            at = edit.range.end;
        }
        out.push_str(&self.source[at..range.end]);
        out
    }

    /// Record a replacement; it supersedes every edit made inside `range`.
    fn replace(&mut self, range: Range<usize>, text: String) {
        self.edits
            .retain(|e| e.range.start < range.start || e.range.end > range.end);
        let at = self.edits.partition_point(|e| e.range.start < range.start);
        self.edits.insert(at, Edit { range, text });
    }

    /// Whitespace in front of `start` on its physical line.
    fn indent_before(&self, start: usize) -> String {
        let line_start = self.source[..start].rfind('\n').map_or(0, |i| i + 1);
        let prefix = &self.source[line_start..start];
        if prefix.chars().all(char::is_whitespace) {
            prefix.to_string()
        } else {
            " ".repeat(prefix.chars().count())
        }
    }

    /// Whether `first`, the first statement of a block, follows the header's
    /// colon on the same line.
    fn is_inline(&self, first: Node<'_>) -> bool {
        let before = self.source[..first.start_byte()].trim_end_matches([' ', '\t']);
        !before.is_empty() && !before.ends_with('\n')
    }

    /// Statements of the module or of an indented block, grouped into lines.
    fn block(&mut self, node: Node<'_>) -> Result<()> {
        let children = named_children(node);
        let inline = node.kind() == "block"
            && children.first().is_some_and(|first| self.is_inline(*first));
        let mut line: Vec<Node<'_>> = Vec::new();
        let mut kept = 0;
        let mut vacated = None;
        for child in children {
            let kind = child.kind();
            if is_simple_statement(kind) {
                let same_line = line
                    .last()
                    .is_some_and(|last| last.end_position().row == child.start_position().row);
                if !same_line && !line.is_empty() {
                    self.simple_line(&std::mem::take(&mut line), inline, &mut kept, &mut vacated)?;
                }
                line.push(child);
                continue;
            }
            if !line.is_empty() {
                self.simple_line(&std::mem::take(&mut line), inline, &mut kept, &mut vacated)?;
            }
            kept += 1;
            if is_compound_statement(kind) {
                self.compound(child)?;
            } else {
                self.clause(child)?;
            }
        }
        if !line.is_empty() {
            self.simple_line(&line, inline, &mut kept, &mut vacated)?;
        }
        // An indented block may not end up empty.
        if kept == 0 && node.kind() == "block" {
            if let Some(edit) = vacated {
                self.replace(edit.range, edit.text);
            }
        }
        Ok(())
    }

    fn simple_line(
        &mut self,
        statements: &[Node<'_>],
        inline: bool,
        kept: &mut usize,
        vacated: &mut Option<Edit>,
    ) -> Result<()> {
        if inline {
            *kept += 1;
            for stmt in statements {
                self.statement(*stmt)?;
            }
            return Ok(());
        }
        let (Some(first), Some(last)) = (statements.first(), statements.last()) else {
            return Ok(());
        };
        let range = first.start_byte()..last.end_byte();

        let before = SimpleLine::new(statements.to_vec(), self.render(range.clone()));
        self.fold.enter_simple_line(&before);
        for stmt in statements {
            self.statement(*stmt)?;
        }
        let after = SimpleLine::new(statements.to_vec(), self.render(range.clone()));
        match self.fold.leave_simple_line(&after)? {
            Replacement::Keep => *kept += 1,
            Replacement::Flatten(replacement) if !replacement.is_empty() => {
                let indent = self.indent_before(range.start);
                let separator = format!("{}{indent}", self.newline);
                let text = replacement
                    .iter()
                    .map(|s| s.render(&indent, self.newline))
                    .collect::<Vec<_>>()
                    .join(&separator);
                self.replace(range, text);
                *kept += 1;
            }
            Replacement::Flatten(_) | Replacement::Remove => {
                let fallback = self.remove_line(range);
                vacated.get_or_insert(fallback);
            }
        }
        Ok(())
    }

    /// Delete a line, and the whole physical line when nothing else is on
    /// it. Returns the edit that would put `pass` there instead.
    fn remove_line(&mut self, range: Range<usize>) -> Edit {
        let line_start = self.source[..range.start].rfind('\n').map_or(0, |i| i + 1);
        let rest = &self.source[range.end..];
        let line_end = rest.find('\n').map_or(self.source.len(), |i| range.end + i + 1);
        let alone = self.source[line_start..range.start].trim().is_empty()
            && self.source[range.end..line_end].trim().is_empty();
        let (range, pass) = if alone {
            let indent = &self.source[line_start..range.start];
            let ending = &self.source[range.end..line_end];
            let newline = if ending.ends_with('\n') { self.newline } else { "" };
            (line_start..line_end, format!("{indent}pass{newline}"))
        } else {
            (range, "pass".to_string())
        };
        self.replace(range.clone(), String::new());
        Edit { range, text: pass }
    }

    fn statement(&mut self, node: Node<'_>) -> Result<()> {
        match node.kind() {
            "expression_statement" => {
                for child in named_children(node) {
                    match child.kind() {
                        "assignment" => self.assignment(child)?,
                        "augmented_assignment" => {
                            if let Some(left) = child.child_by_field_name("left") {
                                self.expr(left)?;
                            }
                            if let Some(right) = child.child_by_field_name("right") {
                                self.value(ValueSite::AugAssign, right)?;
                            }
                        }
                        _ => self.expr(child)?,
                    }
                }
            }
            "return_statement" => {
                for child in named_children(node) {
                    self.value(ValueSite::Return, child)?;
                }
            }
            _ => {
                for child in named_children(node) {
                    self.expr(child)?;
                }
            }
        }
        Ok(())
    }

    /// `a = b = value` nests assignments; only the innermost right side is
    /// the value.
    fn assignment(&mut self, node: Node<'_>) -> Result<()> {
        let annotation = node.child_by_field_name("type");
        if let Some(left) = node.child_by_field_name("left") {
            self.expr(left)?;
        }
        if let Some(annotation) = annotation {
            self.expr(annotation)?;
        }
        if let Some(right) = node.child_by_field_name("right") {
            if right.kind() == "assignment" {
                self.assignment(right)?;
            } else {
                let site = if annotation.is_some() {
                    ValueSite::AnnAssign
                } else {
                    ValueSite::Assign
                };
                self.value(site, right)?;
            }
        }
        Ok(())
    }

    fn value(&mut self, site: ValueSite, node: Node<'_>) -> Result<()> {
        self.fold.enter_value(site);
        let folded = self.expr(node);
        self.fold.leave_value(site);
        folded
    }

    fn compound(&mut self, node: Node<'_>) -> Result<()> {
        if node.kind() == "decorated_definition" {
            for child in named_children(node) {
                if is_compound_statement(child.kind()) {
                    self.compound(child)?;
                } else {
                    self.expr(child)?;
                }
            }
            return Ok(());
        }
        let view = Compound::new(node);
        self.fold.enter_compound(&view);
        let folded = self.clause(node);
        self.fold.leave_compound(&view);
        folded
    }

    /// Header expressions and bodies of a compound statement or one of its
    /// clauses (`elif`, `except`, `case`, ...).
    fn clause(&mut self, node: Node<'_>) -> Result<()> {
        let definition = node.kind() == "function_definition";
        for child in named_children(node) {
            match child.kind() {
                "block" => self.block(child)?,
                "parameters" if definition => self.parameters(child)?,
                kind if kind.ends_with("_clause") => self.clause(child)?,
                _ => self.expr(child)?,
            }
        }
        Ok(())
    }

    fn parameters(&mut self, node: Node<'_>) -> Result<()> {
        for param in named_children(node) {
            match param.kind() {
                "default_parameter" | "typed_default_parameter" => {
                    if let Some(name) = param.child_by_field_name("name") {
                        self.expr(name)?;
                    }
                    if let Some(annotation) = param.child_by_field_name("type") {
                        self.expr(annotation)?;
                    }
                    if let Some(default) = param.child_by_field_name("value") {
                        self.value(ValueSite::ParamDefault, default)?;
                    }
                }
                _ => self.expr(param)?,
            }
        }
        Ok(())
    }

    /// Children left to right, then the node itself. Strings are leaves.
    fn expr(&mut self, node: Node<'_>) -> Result<()> {
        if !matches!(node.kind(), "string" | "concatenated_string") {
            for child in named_children(node) {
                self.expr(child)?;
            }
        }
        let range = node.byte_range();
        let view = Expr::new(node, self.render(range.clone()));
        if let Some(text) = self.fold.leave_expr(&view)? {
            self.replace(range, text);
        }
        Ok(())
    }
}
