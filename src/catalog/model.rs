//! In-memory model of a declaration catalogue.
//!
//! Every type here renders back to catalogue text through `Display`; parsing
//! that text yields an equal value. Method return types print at the tight
//! precedence level, so a union return is always wrapped in parentheses.

use crate::catalog::identity::{MemberKey, MemberKind, TypeKind, TypeName};
use serde::Serialize;
use std::fmt;

/// Owner of constants declared at the top level without a qualifier.
pub const ROOT_OWNER: &str = "Object";

/// Type expression attached to parameters, returns, constants and aliases.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypeExpr {
    /// The `untyped` marker; always resolves.
    Untyped,
    /// Reference to a named type as written (`String`, `::IO::Buffer`, `nil`).
    Named { name: String },
    /// Generic instantiation such as `Hash[Symbol, String]`.
    Generic { base: String, args: Vec<TypeExpr> },
    /// Two or more distinct alternatives. Never nested.
    Union { alternatives: Vec<TypeExpr> },
    Tuple { items: Vec<TypeExpr> },
    Literal { value: Literal },
    Proc { callable: Box<Callable> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Literal {
    Symbol(String),
    Str(String),
    Int(i64),
    Bool(bool),
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named { name: name.into() }
    }

    pub fn nil() -> Self {
        TypeExpr::named("nil")
    }

    /// Visit every named reference (plain or generic base) in this expression.
    pub fn references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references<'a>(&'a self, acc: &mut Vec<&'a str>) {
        match self {
            TypeExpr::Untyped | TypeExpr::Literal { .. } => {}
            TypeExpr::Named { name } => acc.push(name),
            TypeExpr::Generic { base, args } => {
                acc.push(base);
                for arg in args {
                    arg.collect_references(acc);
                }
            }
            TypeExpr::Union { alternatives: items } | TypeExpr::Tuple { items } => {
                for item in items {
                    item.collect_references(acc);
                }
            }
            TypeExpr::Proc { callable } => callable.collect_references(acc),
        }
    }
}

/// One parameter of a call signature.
///
/// `keyword` + `variadic` together describe `**rest`; `variadic` alone is a
/// positional `*rest`. Optional and variadic are never both set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: Option<String>,
    pub ty: TypeExpr,
    pub optional: bool,
    pub variadic: bool,
    pub keyword: bool,
}

impl Parameter {
    pub fn required(name: Option<&str>, ty: TypeExpr) -> Self {
        Self {
            name: name.map(str::to_string),
            ty,
            optional: false,
            variadic: false,
            keyword: false,
        }
    }

    /// Label used in diagnostics: the name when present, else the type.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.ty.to_string(),
        }
    }
}

/// Parameters, optional block and return type shared by methods, blocks and procs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Callable {
    pub params: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<Box<Block>>,
    pub returns: TypeExpr,
}

impl Callable {
    fn collect_references<'a>(&'a self, acc: &mut Vec<&'a str>) {
        for param in &self.params {
            param.ty.collect_references(acc);
        }
        if let Some(block) = &self.block {
            block.callable.collect_references(acc);
        }
        self.returns.collect_references(acc);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Block {
    pub required: bool,
    pub callable: Callable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variance {
    Invariant,
    Covariant,
    Contravariant,
}

/// Type parameter declared on a type (`class Array[out Elem]`) or a method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TypeParam {
    pub name: String,
    pub variance: Variance,
}

/// One call signature of a method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Overload {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub type_params: Vec<TypeParam>,
    pub callable: Callable,
    pub line: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum MemberBody {
    Method { overloads: Vec<Overload> },
    Constant { ty: TypeExpr },
    Alias { target: String },
}

/// Named operation or constant belonging to a catalogue type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
    pub body: MemberBody,
    /// Line of the first declaration.
    pub line: usize,
}

impl Member {
    pub fn key(&self) -> MemberKey {
        MemberKey::new(self.name.clone(), self.kind)
    }

    /// Overload variants in declaration order; empty for constants and aliases.
    pub fn overloads(&self) -> &[Overload] {
        match &self.body {
            MemberBody::Method { overloads } => overloads,
            _ => &[],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MixinMode {
    Include,
    Extend,
    Prepend,
}

impl MixinMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MixinMode::Include => "include",
            MixinMode::Extend => "extend",
            MixinMode::Prepend => "prepend",
        }
    }
}

/// Included-capability reference (`include Enumerable[String]`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Mixin {
    pub mode: MixinMode,
    pub ty: TypeExpr,
    pub line: usize,
}

/// Supertype reference (`class File < IO`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Heritage {
    pub ty: TypeExpr,
    pub line: usize,
}

/// Everything the catalogue knows about one fully-qualified type.
///
/// `declared` is false for owners that only appear as the qualifier of a
/// top-level constant (`IO::SEEK_SET: Integer` without a `class IO` block).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TypeDecl {
    pub name: TypeName,
    pub kind: TypeKind,
    pub declared: bool,
    pub type_params: Vec<TypeParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superclass: Option<Heritage>,
    pub mixins: Vec<Mixin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_of: Option<TypeExpr>,
    pub members: Vec<Member>,
    pub line: usize,
}

impl TypeDecl {
    pub fn arity(&self) -> usize {
        self.type_params.len()
    }

    pub fn member(&self, key: &MemberKey) -> Option<&Member> {
        self.members
            .iter()
            .find(|member| member.name == key.name && member.kind == key.kind)
    }

    pub(crate) fn member_mut(&mut self, key: &MemberKey) -> Option<&mut Member> {
        self.members
            .iter_mut()
            .find(|member| member.name == key.name && member.kind == key.kind)
    }
}

/// Render a type at the tight precedence level used for return types.
struct Tight<'a>(&'a TypeExpr);

impl fmt::Display for Tight<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            TypeExpr::Union { .. } => write!(f, "({})", self.0),
            other => write!(f, "{other}"),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Untyped => f.write_str("untyped"),
            TypeExpr::Named { name } => f.write_str(name),
            TypeExpr::Generic { base, args } => {
                write!(f, "{base}[")?;
                write_list(f, args)?;
                f.write_str("]")
            }
            TypeExpr::Union { alternatives } => {
                for (idx, alt) in alternatives.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{alt}")?;
                }
                Ok(())
            }
            TypeExpr::Tuple { items } => {
                f.write_str("[")?;
                write_list(f, items)?;
                f.write_str("]")
            }
            TypeExpr::Literal { value } => write!(f, "{value}"),
            TypeExpr::Proc { callable } => write!(f, "^{callable}"),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Symbol(name) => write!(f, ":{name}"),
            Literal::Str(raw) if has_unescaped(raw, '"') => write!(f, "'{raw}'"),
            Literal::Str(raw) => write!(f, "\"{raw}\""),
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Bool(value) => write!(f, "{value}"),
        }
    }
}

/// Whether `quote` appears in a literal body without a preceding backslash.
/// A body read from one quote style never holds its own quote unescaped.
fn has_unescaped(raw: &str, quote: char) -> bool {
    let mut escaped = false;
    for ch in raw.chars() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            c if c == quote => return true,
            _ => {}
        }
    }
    false
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.keyword && !self.variadic {
            if self.optional {
                f.write_str("?")?;
            }
            let name = self.name.as_deref().unwrap_or("_");
            return write!(f, "{name}: {}", self.ty);
        }
        match (self.keyword, self.variadic, self.optional) {
            (true, true, _) => f.write_str("**")?,
            (false, true, _) => f.write_str("*")?,
            (false, false, true) => f.write_str("?")?,
            _ => {}
        }
        write!(f, "{}", self.ty)?;
        if let Some(name) = &self.name {
            write!(f, " {name}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        write_list(f, &self.params)?;
        f.write_str(")")?;
        if let Some(block) = &self.block {
            write!(f, " {block}")?;
        }
        write!(f, " -> {}", Tight(&self.returns))
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.required {
            f.write_str("?")?;
        }
        write!(f, "{{ {} }}", self.callable)
    }
}

impl fmt::Display for TypeParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variance {
            Variance::Invariant => {}
            Variance::Covariant => f.write_str("out ")?,
            Variance::Contravariant => f.write_str("in ")?,
        }
        f.write_str(&self.name)
    }
}

pub(crate) struct TypeParams<'a>(pub &'a [TypeParam]);

impl fmt::Display for TypeParams<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        f.write_str("[")?;
        write_list(f, self.0)?;
        f.write_str("]")
    }
}

impl fmt::Display for Overload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.type_params.is_empty() {
            write!(f, "{} ", TypeParams(&self.type_params))?;
        }
        write!(f, "{}", self.callable)
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.kind == MemberKind::Singleton {
            "self."
        } else {
            ""
        };
        match &self.body {
            MemberBody::Method { overloads } => {
                write!(f, "def {prefix}{}: ", self.name)?;
                for (idx, overload) in overloads.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{overload}")?;
                }
                Ok(())
            }
            MemberBody::Constant { ty } => write!(f, "{}: {ty}", self.name),
            MemberBody::Alias { target } => {
                write!(f, "alias {prefix}{} {prefix}{target}", self.name)
            }
        }
    }
}

impl fmt::Display for Mixin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.mode.as_str(), self.ty)
    }
}

impl fmt::Display for TypeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.declared {
            for member in &self.members {
                if self.name.as_str() == ROOT_OWNER {
                    writeln!(f, "{member}")?;
                } else {
                    writeln!(f, "{}::{member}", self.name)?;
                }
            }
            return Ok(());
        }
        if let Some(target) = &self.alias_of {
            return writeln!(
                f,
                "type {}{} = {target}",
                self.name,
                TypeParams(&self.type_params)
            );
        }
        write!(
            f,
            "{} {}{}",
            self.kind.as_str(),
            self.name,
            TypeParams(&self.type_params)
        )?;
        if let Some(heritage) = &self.superclass {
            write!(f, " < {}", heritage.ty)?;
        }
        writeln!(f)?;
        for mixin in &self.mixins {
            writeln!(f, "  {mixin}")?;
        }
        for member in &self.members {
            writeln!(f, "  {member}")?;
        }
        writeln!(f, "end")
    }
}
