//! Consistency checks over a built catalogue.
//!
//! Every type expression is walked and each named reference is resolved
//! lexically: inside `A::B` a reference `C` tries `A::B::C`, `A::C` and then
//! `C`, each against the catalogue first and the external table second. A
//! leading `::` skips the lexical search. Findings are accumulated, one per
//! line and name.

use crate::catalog::model::ROOT_OWNER;
use crate::catalog::{
    Callable, ExternalTypeTable, MemberBody, MemberKey, TypeCatalogue, TypeDecl, TypeExpr,
    TypeKind, TypeName,
};
use crate::report::{Finding, FindingKind, Note};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Types that always resolve and take no arguments.
const KEYWORD_TYPES: &[&str] = &[
    "void", "nil", "bool", "boolish", "self", "instance", "class", "top", "bot", "untyped",
];

#[derive(Debug, Default)]
pub struct CheckOutcome {
    pub findings: Vec<Finding>,
    pub notes: Vec<Note>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Resolution {
    /// Resolved with the given arity, `None` when the arity is unknown.
    Found(Option<usize>),
    Unresolved,
}

/// Lexical context for one type expression.
struct Scope<'s> {
    namespace: Option<&'s TypeName>,
    params: Vec<&'s str>,
}

/// Check every reference in `catalogue` against itself and `external`.
pub fn check_catalogue(catalogue: &TypeCatalogue, external: &ExternalTypeTable) -> CheckOutcome {
    let mut checker = Checker {
        catalogue,
        external,
        outcome: CheckOutcome::default(),
        seen: BTreeSet::new(),
    };
    for decl in catalogue.types() {
        checker.check_type_decl(decl);
    }
    debug!(
        findings = checker.outcome.findings.len(),
        notes = checker.outcome.notes.len(),
        "checked catalogue"
    );
    checker.outcome
}

struct Checker<'a> {
    catalogue: &'a TypeCatalogue,
    external: &'a ExternalTypeTable,
    outcome: CheckOutcome,
    seen: BTreeSet<(FindingKind, usize, String)>,
}

impl<'a> Checker<'a> {
    fn check_type_decl(&mut self, decl: &'a TypeDecl) {
        if !decl.declared
            && decl.name.as_str() != ROOT_OWNER
            && !self.external.contains(&decl.name)
        {
            let message = format!(
                "`{}` owns constants but is not declared in the catalogue or the external type table",
                decl.name
            );
            self.push(Finding::unresolved(decl.line, decl.name.as_str(), message));
        }

        let parent = decl.name.parent();
        let namespace = if decl.kind == TypeKind::Alias {
            parent.as_ref()
        } else {
            Some(&decl.name)
        };
        let type_params: Vec<&str> = decl.type_params.iter().map(|p| p.name.as_str()).collect();
        let scope = Scope {
            namespace,
            params: type_params.clone(),
        };

        if let Some(heritage) = &decl.superclass {
            // The superclass is resolved outside the class body.
            let outer = Scope {
                namespace: parent.as_ref(),
                params: type_params.clone(),
            };
            self.check_expr(&heritage.ty, heritage.line, &outer);
        }
        for mixin in &decl.mixins {
            self.check_expr(&mixin.ty, mixin.line, &scope);
        }
        if let Some(target) = &decl.alias_of {
            self.check_expr(target, decl.line, &scope);
        }

        for member in &decl.members {
            match &member.body {
                MemberBody::Method { overloads } => {
                    for overload in overloads {
                        let mut params = type_params.clone();
                        params.extend(overload.type_params.iter().map(|p| p.name.as_str()));
                        let method_scope = Scope { namespace, params };
                        self.check_callable(&overload.callable, overload.line, &method_scope);
                    }
                }
                MemberBody::Constant { ty } => self.check_expr(ty, member.line, &scope),
                MemberBody::Alias { target } => {
                    let key = MemberKey::new(target.clone(), member.kind);
                    if decl.member(&key).is_none() {
                        let alias = MemberKey::new(member.name.clone(), member.kind);
                        let message = format!(
                            "alias `{}{alias}` refers to undefined `{}{key}`",
                            decl.name, decl.name
                        );
                        self.push(Finding::unresolved(
                            member.line,
                            format!("{}{key}", decl.name),
                            message,
                        ));
                    }
                }
            }
        }
    }

    fn check_callable(&mut self, callable: &Callable, line: usize, scope: &Scope<'_>) {
        for param in &callable.params {
            self.check_expr(&param.ty, line, scope);
        }
        if let Some(block) = &callable.block {
            self.check_callable(&block.callable, line, scope);
        }
        self.check_expr(&callable.returns, line, scope);
    }

    fn check_expr(&mut self, expr: &TypeExpr, line: usize, scope: &Scope<'_>) {
        match expr {
            TypeExpr::Untyped | TypeExpr::Literal { .. } => {}
            TypeExpr::Named { name } => match self.resolve(name, scope) {
                Resolution::Found(Some(arity)) if arity > 0 => {
                    let message = format!(
                        "`{name}` expects {arity} type argument(s) but is used without any"
                    );
                    self.push(Finding::arity(line, name.as_str(), message));
                }
                Resolution::Found(_) => {}
                Resolution::Unresolved => self.unresolved(line, name),
            },
            TypeExpr::Generic { base, args } => {
                match self.resolve(base, scope) {
                    Resolution::Found(Some(arity)) if arity != args.len() => {
                        let message = format!(
                            "`{base}` expects {arity} type argument(s), got {}",
                            args.len()
                        );
                        self.push(Finding::arity(line, base.as_str(), message));
                    }
                    Resolution::Found(Some(_)) => {}
                    Resolution::Found(None) => {
                        warn!(line, name = %base, "type argument count not checked: arity unknown");
                        self.outcome.notes.push(Note {
                            line,
                            subject: base.clone(),
                            message: format!(
                                "cannot check type arguments of `{base}`: its arity is unknown"
                            ),
                        });
                    }
                    Resolution::Unresolved => self.unresolved(line, base),
                }
                for arg in args {
                    self.check_expr(arg, line, scope);
                }
            }
            TypeExpr::Union {
                alternatives: items,
            }
            | TypeExpr::Tuple { items } => {
                for item in items {
                    self.check_expr(item, line, scope);
                }
            }
            TypeExpr::Proc { callable } => self.check_callable(callable, line, scope),
        }
    }

    fn resolve(&self, written: &str, scope: &Scope<'_>) -> Resolution {
        if let Some(absolute) = written.strip_prefix("::") {
            return self.lookup(&TypeName::new(absolute));
        }
        if !written.contains("::")
            && (KEYWORD_TYPES.contains(&written) || scope.params.contains(&written))
        {
            return Resolution::Found(Some(0));
        }
        if let Some(namespace) = scope.namespace {
            for ancestor in namespace.ancestors() {
                let found = self.lookup(&ancestor.join(written));
                if found != Resolution::Unresolved {
                    return found;
                }
            }
        }
        self.lookup(&TypeName::new(written))
    }

    fn lookup(&self, name: &TypeName) -> Resolution {
        if let Some(decl) = self.catalogue.get(name) {
            if decl.declared {
                return Resolution::Found(Some(decl.arity()));
            }
            return match self.external.arity(name) {
                Some(arity) => Resolution::Found(arity),
                None => Resolution::Found(Some(0)),
            };
        }
        match self.external.arity(name) {
            Some(arity) => Resolution::Found(arity),
            None => Resolution::Unresolved,
        }
    }

    fn unresolved(&mut self, line: usize, name: &str) {
        let message = format!(
            "`{name}` is not declared in the catalogue or the external type table"
        );
        self.push(Finding::unresolved(line, name, message));
    }

    fn push(&mut self, finding: Finding) {
        let subject = finding.subject.clone().unwrap_or_default();
        if self.seen.insert((finding.kind, finding.line, subject)) {
            self.outcome.findings.push(finding);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::build_catalogue;
    use crate::signature::parse_source;
    use pretty_assertions::assert_eq;

    fn check_with(text: &str, external: &ExternalTypeTable) -> CheckOutcome {
        let parsed = parse_source(text).expect("parse");
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let built = build_catalogue(parsed.declarations);
        assert!(built.findings.is_empty(), "{:?}", built.findings);
        check_catalogue(&built.catalogue, external)
    }

    fn check(text: &str) -> CheckOutcome {
        check_with(text, &ExternalTypeTable::core())
    }

    fn summary(outcome: &CheckOutcome) -> Vec<(FindingKind, usize, String)> {
        outcome
            .findings
            .iter()
            .map(|f| (f.kind, f.line, f.subject.clone().unwrap_or_default()))
            .collect()
    }

    #[test]
    fn consistent_catalogue_has_no_findings() {
        let outcome = check(
            "\
class IO < Object
  include Enumerable[String]
  class Buffer
    def size: () -> Integer
  end
  SEEK_SET: Integer
  def self.open: (String path, ?String mode) -> IO
  def read: () -> String
          | (Integer length) -> String?
  def buffer: () -> Buffer
  def each_line: [U] (U sep) { (String line) -> void } -> self
  def map: [T] () { (String) -> T } -> Array[T]
  alias each each_line
end
type IO::mode = :r | :w | Integer
",
        );
        assert_eq!(summary(&outcome), Vec::new());
        assert!(outcome.notes.is_empty());
    }

    #[test]
    fn undeclared_type_is_reported_once_per_line() {
        let outcome = check(
            "\
class IO
  def read: (Strng a, Strng b) -> Strng
  def write: (Strng data) -> Integer
end
",
        );
        assert_eq!(
            summary(&outcome),
            vec![
                (FindingKind::UnresolvedReference, 2, "Strng".to_string()),
                (FindingKind::UnresolvedReference, 3, "Strng".to_string()),
            ]
        );
    }

    #[test]
    fn every_union_alternative_is_checked() {
        let outcome = check("class IO\n  def read: () -> (String | Bytes | nil)\nend\n");
        assert_eq!(
            summary(&outcome),
            vec![(FindingKind::UnresolvedReference, 2, "Bytes".to_string())]
        );
    }

    #[test]
    fn generic_argument_counts_are_enforced() {
        let outcome = check(
            "\
class Box[T]
  def pair: () -> Hash[T]
  def list: () -> Array
  def nested: () -> Box[Box[T]]
  def wrong: () -> T[Integer]
end
",
        );
        assert_eq!(
            summary(&outcome),
            vec![
                (FindingKind::ArityMismatch, 2, "Hash".to_string()),
                (FindingKind::ArityMismatch, 3, "Array".to_string()),
                (FindingKind::ArityMismatch, 5, "T".to_string()),
            ]
        );
    }

    #[test]
    fn unknown_arity_produces_a_note_not_a_finding() {
        let mut external = ExternalTypeTable::core();
        external.insert("Concurrent::Map", None);
        let outcome = check_with(
            "class Cache\n  def store: () -> Concurrent::Map[Symbol, String]\nend\n",
            &external,
        );
        assert!(outcome.findings.is_empty());
        assert_eq!(outcome.notes.len(), 1);
        assert_eq!(outcome.notes[0].subject, "Concurrent::Map");
    }

    #[test]
    fn lexical_lookup_prefers_inner_scopes() {
        let text = "\
module Outer
  class Inner
  end
  class User
    def inner: () -> Inner
    def absolute: () -> ::Inner
  end
end
";
        let outcome = check(text);
        assert_eq!(
            summary(&outcome),
            vec![(FindingKind::UnresolvedReference, 6, "::Inner".to_string())]
        );
    }

    #[test]
    fn method_type_params_are_scoped_to_their_overload() {
        let outcome = check(
            "\
class IO
  def first: [U] () -> U
  def second: () -> U
end
",
        );
        assert_eq!(
            summary(&outcome),
            vec![(FindingKind::UnresolvedReference, 3, "U".to_string())]
        );
    }

    #[test]
    fn alias_target_must_exist_with_the_same_kind() {
        let outcome = check(
            "\
class IO
  def self.open: () -> IO
  alias reopen open
end
",
        );
        assert_eq!(
            summary(&outcome),
            vec![(FindingKind::UnresolvedReference, 3, "IO#open".to_string())]
        );
    }

    #[test]
    fn implicit_owner_must_be_known_externally() {
        let outcome = check_with(
            "IO::SEEK_SET: Integer\nStringIO::MODE: Integer\nLIMIT: Integer\n",
            &ExternalTypeTable::core(),
        );
        assert_eq!(
            summary(&outcome),
            vec![(FindingKind::UnresolvedReference, 2, "StringIO".to_string())]
        );
    }

    #[test]
    fn empty_external_table_leaves_core_names_unresolved() {
        let outcome = check_with(
            "class IO\n  def read: () -> String\nend\n",
            &ExternalTypeTable::empty(),
        );
        assert_eq!(
            summary(&outcome),
            vec![(FindingKind::UnresolvedReference, 2, "String".to_string())]
        );
    }
}
