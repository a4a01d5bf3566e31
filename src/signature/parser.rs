//! Recursive-descent parser for one logical declaration line.
//!
//! Precedence, loosest first: union `A | B`, postfix optional `T?`, primary
//! (names, generics, tuples, literals, procs, parentheses). Method return types
//! are parsed at the optional level so that a top-level `|` after a return type
//! always starts the next overload.

use crate::catalog::{
    Block, Callable, Literal, MemberKind, MixinMode, Overload, Parameter, TypeExpr, TypeKind,
    TypeParam, Variance,
};
use crate::catalog::{Member, MemberBody};
use crate::error::ParseError;
use crate::signature::declaration::{
    AliasDecl, AttributeDecl, AttributeMode, ConstantDecl, Declaration, MethodDecl, MixinDecl,
    TypeAliasDecl, TypeHeader,
};
use crate::signature::lexer::{Tok, Token, describe, tokenize};
use std::collections::BTreeSet;

/// Deepest nesting of brackets, blocks and procs accepted in one declaration.
pub const MAX_TYPE_DEPTH: usize = 128;

const OPERATOR_METHODS: &[&str] = &[
    "+", "-", "*", "/", "%", "**", "==", "!=", "===", "=~", "!~", "<", ">", "<=", ">=", "<=>",
    "<<", ">>", "&", "|", "^", "~", "!", "[]", "[]=", "+@", "-@", "`",
];

/// Declaration text assembled from one or more physical lines.
///
/// Physical lines are joined with `\n`; `segments` maps the byte offset where
/// each physical line starts back to its 1-based line number.
#[derive(Clone, Debug)]
pub struct LogicalLine {
    pub(crate) text: String,
    segments: Vec<(usize, usize)>,
}

impl LogicalLine {
    pub fn single(text: &str, line: usize) -> Self {
        Self {
            text: text.to_string(),
            segments: vec![(0, line)],
        }
    }

    pub(crate) fn empty() -> Self {
        Self {
            text: String::new(),
            segments: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, text: &str, line: usize) {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.segments.push((self.text.len(), line));
        self.text.push_str(text);
    }

    pub fn first_line(&self) -> usize {
        self.segments.first().map(|(_, line)| *line).unwrap_or(1)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    fn line_at(&self, offset: usize) -> usize {
        self.segments
            .iter()
            .rev()
            .find(|(start, _)| *start <= offset)
            .map(|(_, line)| *line)
            .unwrap_or_else(|| self.first_line())
    }
}

/// Parse one declaration line.
pub fn parse_declaration(text: &str, line: usize) -> Result<Declaration, ParseError> {
    parse_logical(&LogicalLine::single(text, line))
}

/// Parse a line that declares exactly one member: a method, a constant or a
/// member alias. Qualified constant names keep only their last segment.
pub fn parse_member(text: &str, line: usize) -> Result<Member, ParseError> {
    let fail = |reason: &str| ParseError::new(line, text, reason);
    match parse_declaration(text, line)? {
        Declaration::Method(method) => {
            if method.extends_earlier {
                return Err(fail("`...` only extends a member inside a catalogue"));
            }
            Ok(method.into_member(line))
        }
        Declaration::Constant(constant) => Ok(Member {
            name: constant
                .name
                .rsplit("::")
                .next()
                .unwrap_or(&constant.name)
                .to_string(),
            kind: MemberKind::Constant,
            body: MemberBody::Constant { ty: constant.ty },
            line,
        }),
        Declaration::Alias(alias) => Ok(Member {
            name: alias.name,
            kind: alias.kind,
            body: MemberBody::Alias {
                target: alias.target,
            },
            line,
        }),
        _ => Err(fail("expected a method, constant or alias declaration")),
    }
}

/// Parse a standalone type expression.
pub fn parse_type(text: &str, line: usize) -> Result<TypeExpr, ParseError> {
    let source = LogicalLine::single(text, line);
    let result = Parser::new(&source).and_then(|mut parser| {
        let ty = parser.union_type()?;
        parser.expect_end()?;
        Ok(ty)
    });
    result.map_err(|reason| ParseError::new(line, text, reason))
}

pub(crate) fn parse_logical(source: &LogicalLine) -> Result<Declaration, ParseError> {
    Parser::new(source)
        .and_then(|mut parser| parser.declaration())
        .map_err(|reason| ParseError::new(source.first_line(), source.text.clone(), reason))
}

type Parsed<T> = Result<T, String>;

struct Parser<'a> {
    source: &'a LogicalLine,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a LogicalLine) -> Parsed<Self> {
        let tokens = tokenize(&source.text, 0).map_err(|err| err.reason)?;
        Ok(Self {
            source,
            tokens,
            pos: 0,
            depth: 0,
        })
    }

    fn peek(&self) -> Option<&Tok> {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Tok> {
        self.tokens.get(self.pos + ahead).map(|token| &token.tok)
    }

    fn peek_ident(&self) -> Option<&str> {
        match self.peek() {
            Some(Tok::Ident(word)) => Some(word.as_str()),
            _ => None,
        }
    }

    fn eat(&mut self, expected: &Tok) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Tok) -> Parsed<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(format!(
                "expected {}, found {}",
                describe(Some(expected)),
                describe(self.peek())
            ))
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn expect_end(&self) -> Parsed<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(format!(
                "unexpected {} after declaration",
                describe(self.peek())
            ))
        }
    }

    fn ident(&mut self, what: &str) -> Parsed<String> {
        match self.peek() {
            Some(Tok::Ident(word)) => {
                let word = word.clone();
                self.pos += 1;
                Ok(word)
            }
            other => Err(format!("expected {what}, found {}", describe(other))),
        }
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|token| token.offset)
            .unwrap_or(self.source.text.len())
    }

    fn current_line(&self) -> usize {
        self.source.line_at(self.offset())
    }

    fn skip_to_offset(&mut self, offset: usize) {
        while self.pos < self.tokens.len() && self.tokens[self.pos].offset < offset {
            self.pos += 1;
        }
    }

    fn declaration(&mut self) -> Parsed<Declaration> {
        let keyword = match self.peek() {
            Some(Tok::Ident(word)) => word.clone(),
            Some(Tok::ColonColon) => return self.constant(),
            other => return Err(format!("expected a declaration, found {}", describe(other))),
        };
        match keyword.as_str() {
            "class" => self.type_header(TypeKind::Class),
            "module" => self.type_header(TypeKind::Module),
            "interface" => self.type_header(TypeKind::Interface),
            "end" => {
                self.pos += 1;
                self.expect_end()?;
                Ok(Declaration::End)
            }
            "def" => self.method(),
            "include" => self.mixin(MixinMode::Include),
            "extend" => self.mixin(MixinMode::Extend),
            "prepend" => self.mixin(MixinMode::Prepend),
            "alias" => self.alias(),
            "attr_reader" => self.attribute(AttributeMode::Reader),
            "attr_writer" => self.attribute(AttributeMode::Writer),
            "attr_accessor" => self.attribute(AttributeMode::Accessor),
            "type" => self.type_alias(),
            word if is_constant_name(word) => self.constant(),
            word => Err(format!("unrecognized declaration starting with `{word}`")),
        }
    }

    fn type_header(&mut self, kind: TypeKind) -> Parsed<Declaration> {
        self.pos += 1;
        let name = self.type_path()?;
        let simple = last_segment(&name);
        if kind == TypeKind::Interface {
            if !is_interface_name(simple) {
                return Err(format!(
                    "interface name `{simple}` must start with `_` followed by an uppercase letter"
                ));
            }
        } else if !is_constant_name(simple) {
            return Err(format!(
                "{} name `{simple}` must start with an uppercase letter",
                kind.as_str()
            ));
        }

        let type_params = if self.peek() == Some(&Tok::LBracket) {
            self.type_params()?
        } else {
            Vec::new()
        };

        let superclass = if self.eat(&Tok::Lt) {
            if kind != TypeKind::Class {
                return Err(format!("a {} cannot declare a superclass", kind.as_str()));
            }
            Some(self.nominal_type()?)
        } else {
            None
        };

        if self.peek() == Some(&Tok::Colon) {
            return Err("module self-type constraints are not supported".to_string());
        }

        let closed = self.peek_ident() == Some("end");
        if closed {
            self.pos += 1;
        }
        self.expect_end()?;

        Ok(Declaration::TypeHeader(TypeHeader {
            kind,
            name,
            type_params,
            superclass,
            closed,
        }))
    }

    fn method(&mut self) -> Parsed<Declaration> {
        let source = self.source;
        let text = source.text.as_str();
        let mut start = self.offset() + "def".len();
        let bytes = text.as_bytes();
        while start < bytes.len() && bytes[start].is_ascii_whitespace() {
            start += 1;
        }

        let rest = &text[start..];
        let (kind, name_start) = if rest.starts_with("self?.") {
            return Err(
                "module functions (`self?.`) are not supported; declare the instance and `self.` methods separately"
                    .to_string(),
            );
        } else if rest.starts_with("self.") {
            (MemberKind::Singleton, start + "self.".len())
        } else {
            (MemberKind::Instance, start)
        };

        let colon = name_terminator(text, name_start)
            .ok_or_else(|| "expected `:` followed by whitespace after the method name".to_string())?;
        let name = text[name_start..colon].trim().to_string();
        validate_method_name(&name)?;
        self.skip_to_offset(colon + 1);

        let mut overloads = Vec::new();
        let mut extends_earlier = false;
        loop {
            if self.eat(&Tok::Ellipsis) {
                if overloads.is_empty() {
                    return Err("`...` must follow at least one signature".to_string());
                }
                if !self.at_end() {
                    return Err("`...` must be the last alternative".to_string());
                }
                extends_earlier = true;
                break;
            }

            let line = self.current_line();
            let (type_params, callable) = self.callable(true)?;
            overloads.push(Overload {
                type_params,
                callable,
                line,
            });

            if self.at_end() {
                break;
            }
            if !self.eat(&Tok::Pipe) {
                return Err(format!(
                    "unexpected {} after return type",
                    describe(self.peek())
                ));
            }
            if !self.starts_overload() {
                return Err(
                    "union return types must be parenthesised, e.g. `-> (String | nil)`"
                        .to_string(),
                );
            }
        }

        Ok(Declaration::Method(MethodDecl {
            name,
            kind,
            overloads,
            extends_earlier,
        }))
    }

    fn starts_overload(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Tok::LParen
                    | Tok::LBracket
                    | Tok::LBrace
                    | Tok::Question
                    | Tok::Arrow
                    | Tok::Ellipsis
            )
        )
    }

    /// Run `parse` one nesting level deeper, failing past `MAX_TYPE_DEPTH`.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Parsed<T>) -> Parsed<T> {
        if self.depth >= MAX_TYPE_DEPTH {
            return Err(format!(
                "type expression nested too deeply (limit {MAX_TYPE_DEPTH})"
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn callable(&mut self, allow_type_params: bool) -> Parsed<(Vec<TypeParam>, Callable)> {
        self.nested(|parser| parser.callable_body(allow_type_params))
    }

    fn callable_body(&mut self, allow_type_params: bool) -> Parsed<(Vec<TypeParam>, Callable)> {
        let type_params = if allow_type_params && self.peek() == Some(&Tok::LBracket) {
            self.type_params()?
        } else {
            Vec::new()
        };
        let params = if self.peek() == Some(&Tok::LParen) {
            self.params()?
        } else {
            Vec::new()
        };
        let block = self.block()?;
        self.expect(&Tok::Arrow)?;
        let returns = self.optional_type()?;
        Ok((
            type_params,
            Callable {
                params,
                block: block.map(Box::new),
                returns,
            },
        ))
    }

    fn block(&mut self) -> Parsed<Option<Block>> {
        let optional_block =
            self.peek() == Some(&Tok::Question) && self.peek_at(1) == Some(&Tok::LBrace);
        let required = if self.peek() == Some(&Tok::LBrace) {
            true
        } else if optional_block {
            self.pos += 1;
            false
        } else {
            return Ok(None);
        };
        self.expect(&Tok::LBrace)?;
        let (_, callable) = self.callable(false)?;
        self.expect(&Tok::RBrace)?;
        Ok(Some(Block { required, callable }))
    }

    fn params(&mut self) -> Parsed<Vec<Parameter>> {
        self.expect(&Tok::LParen)?;
        let mut params = Vec::new();
        if self.eat(&Tok::RParen) {
            return Ok(params);
        }
        loop {
            params.push(self.param()?);
            if self.eat(&Tok::Comma) {
                continue;
            }
            self.expect(&Tok::RParen)?;
            break;
        }
        check_parameter_order(&params)?;
        Ok(params)
    }

    fn param(&mut self) -> Parsed<Parameter> {
        if self.eat(&Tok::StarStar) {
            let ty = self.union_type()?;
            let name = self.param_name()?;
            return Ok(Parameter {
                name,
                ty,
                optional: false,
                variadic: true,
                keyword: true,
            });
        }
        if self.eat(&Tok::Star) {
            let ty = self.union_type()?;
            let name = self.param_name()?;
            return Ok(Parameter {
                name,
                ty,
                optional: false,
                variadic: true,
                keyword: false,
            });
        }

        let optional = self.eat(&Tok::Question);
        let keyword_ahead =
            self.peek_ident().is_some() && self.peek_at(1) == Some(&Tok::Colon);
        if keyword_ahead {
            let name = self.ident("a keyword name")?;
            self.expect(&Tok::Colon)?;
            let ty = self.union_type()?;
            return Ok(Parameter {
                name: Some(name),
                ty,
                optional,
                variadic: false,
                keyword: true,
            });
        }

        let ty = self.union_type()?;
        let name = self.param_name()?;
        Ok(Parameter {
            name,
            ty,
            optional,
            variadic: false,
            keyword: false,
        })
    }

    fn param_name(&mut self) -> Parsed<Option<String>> {
        let Some(word) = self.peek_ident().map(str::to_string) else {
            return Ok(None);
        };
        if !is_param_name(&word) {
            return Err(format!(
                "parameter name `{word}` must start with a lowercase letter or `_`"
            ));
        }
        self.pos += 1;
        Ok(Some(word))
    }

    fn type_params(&mut self) -> Parsed<Vec<TypeParam>> {
        self.expect(&Tok::LBracket)?;
        if self.peek() == Some(&Tok::RBracket) {
            return Err("type parameter list is empty".to_string());
        }
        let mut params: Vec<TypeParam> = Vec::new();
        loop {
            let modifier_ahead = matches!(self.peek_at(1), Some(Tok::Ident(_)));
            let variance = if modifier_ahead && self.peek_ident() == Some("out") {
                self.pos += 1;
                Variance::Covariant
            } else if modifier_ahead && self.peek_ident() == Some("in") {
                self.pos += 1;
                Variance::Contravariant
            } else {
                Variance::Invariant
            };
            let name = self.ident("a type parameter name")?;
            if !is_constant_name(&name) {
                return Err(format!(
                    "type parameter `{name}` must start with an uppercase letter"
                ));
            }
            if params.iter().any(|param| param.name == name) {
                return Err(format!("type parameter `{name}` is declared twice"));
            }
            params.push(TypeParam { name, variance });
            if self.eat(&Tok::Comma) {
                continue;
            }
            self.expect(&Tok::RBracket)?;
            return Ok(params);
        }
    }

    fn type_path(&mut self) -> Parsed<String> {
        let mut path = String::new();
        if self.eat(&Tok::ColonColon) {
            path.push_str("::");
        }
        path.push_str(&self.ident("a type name")?);
        while self.peek() == Some(&Tok::ColonColon) && matches!(self.peek_at(1), Some(Tok::Ident(_)))
        {
            self.pos += 1;
            path.push_str("::");
            path.push_str(&self.ident("a type name")?);
        }
        Ok(path)
    }

    fn type_args(&mut self) -> Parsed<Vec<TypeExpr>> {
        self.expect(&Tok::LBracket)?;
        if self.peek() == Some(&Tok::RBracket) {
            return Err("type argument list is empty".to_string());
        }
        let mut args = Vec::new();
        loop {
            args.push(self.union_type()?);
            if self.eat(&Tok::Comma) {
                continue;
            }
            self.expect(&Tok::RBracket)?;
            return Ok(args);
        }
    }

    /// A named type with optional arguments; used for supertypes and mixins.
    fn nominal_type(&mut self) -> Parsed<TypeExpr> {
        let base = self.type_path()?;
        if self.peek() == Some(&Tok::LBracket) {
            let args = self.type_args()?;
            Ok(TypeExpr::Generic { base, args })
        } else {
            Ok(TypeExpr::Named { name: base })
        }
    }

    fn union_type(&mut self) -> Parsed<TypeExpr> {
        let first = self.optional_type()?;
        if self.peek() != Some(&Tok::Pipe) {
            return Ok(first);
        }
        let mut alternatives = Vec::new();
        push_alternative(&mut alternatives, first)?;
        while self.eat(&Tok::Pipe) {
            let next = self.optional_type()?;
            push_alternative(&mut alternatives, next)?;
        }
        Ok(TypeExpr::Union { alternatives })
    }

    fn optional_type(&mut self) -> Parsed<TypeExpr> {
        let mut ty = self.primary_type()?;
        while self.peek() == Some(&Tok::Question) && self.peek_at(1) != Some(&Tok::LBrace) {
            self.pos += 1;
            let mut alternatives = Vec::new();
            push_alternative(&mut alternatives, ty)?;
            push_alternative(&mut alternatives, TypeExpr::nil())?;
            ty = TypeExpr::Union { alternatives };
        }
        Ok(ty)
    }

    fn primary_type(&mut self) -> Parsed<TypeExpr> {
        self.nested(Self::primary_term)
    }

    fn primary_term(&mut self) -> Parsed<TypeExpr> {
        let Some(tok) = self.peek().cloned() else {
            return Err("expected a type, found end of line".to_string());
        };
        match tok {
            Tok::LParen => {
                self.pos += 1;
                let inner = self.union_type()?;
                self.expect(&Tok::RParen)?;
                Ok(inner)
            }
            Tok::LBracket => {
                self.pos += 1;
                let mut items = Vec::new();
                if self.eat(&Tok::RBracket) {
                    return Ok(TypeExpr::Tuple { items });
                }
                loop {
                    items.push(self.union_type()?);
                    if self.eat(&Tok::Comma) {
                        continue;
                    }
                    self.expect(&Tok::RBracket)?;
                    return Ok(TypeExpr::Tuple { items });
                }
            }
            Tok::Caret => {
                self.pos += 1;
                let (_, callable) = self.callable(false)?;
                Ok(TypeExpr::Proc {
                    callable: Box::new(callable),
                })
            }
            Tok::Str(raw) => {
                self.pos += 1;
                Ok(TypeExpr::Literal {
                    value: Literal::Str(raw),
                })
            }
            Tok::Int(value) => {
                self.pos += 1;
                Ok(TypeExpr::Literal {
                    value: Literal::Int(value),
                })
            }
            Tok::Symbol(name) => {
                self.pos += 1;
                Ok(TypeExpr::Literal {
                    value: Literal::Symbol(name),
                })
            }
            Tok::Ident(word) if word == "untyped" => {
                self.pos += 1;
                Ok(TypeExpr::Untyped)
            }
            Tok::Ident(word) if word == "true" || word == "false" => {
                self.pos += 1;
                Ok(TypeExpr::Literal {
                    value: Literal::Bool(word == "true"),
                })
            }
            Tok::Ident(_) | Tok::ColonColon => self.nominal_type(),
            other => Err(format!("expected a type, found {}", describe(Some(&other)))),
        }
    }

    fn constant(&mut self) -> Parsed<Declaration> {
        let name = self.type_path()?;
        let simple = last_segment(&name);
        if !is_constant_name(simple) {
            return Err(format!(
                "constant name `{simple}` must start with an uppercase letter"
            ));
        }
        if self.peek() != Some(&Tok::Colon) {
            return Err(format!(
                "expected `:` after constant `{name}`, found {}",
                describe(self.peek())
            ));
        }
        self.pos += 1;
        let ty = self.union_type()?;
        self.expect_end()?;
        Ok(Declaration::Constant(ConstantDecl { name, ty }))
    }

    fn mixin(&mut self, mode: MixinMode) -> Parsed<Declaration> {
        self.pos += 1;
        let ty = self.nominal_type()?;
        self.expect_end()?;
        Ok(Declaration::Mixin(MixinDecl { mode, ty }))
    }

    fn alias(&mut self) -> Parsed<Declaration> {
        let source = self.source;
        let text = source.text.as_str();
        let start = self.offset() + "alias".len();
        let parts: Vec<&str> = text[start..].split_whitespace().collect();
        let [new_name, old_name] = parts.as_slice() else {
            return Err("expected `alias new_name old_name`".to_string());
        };
        let (new_kind, new_name) = split_singleton(new_name);
        let (old_kind, old_name) = split_singleton(old_name);
        if new_kind != old_kind {
            return Err("alias must connect two instance or two `self.` methods".to_string());
        }
        validate_method_name(new_name)?;
        validate_method_name(old_name)?;
        self.pos = self.tokens.len();
        Ok(Declaration::Alias(AliasDecl {
            kind: new_kind,
            name: new_name.to_string(),
            target: old_name.to_string(),
        }))
    }

    fn attribute(&mut self, mode: AttributeMode) -> Parsed<Declaration> {
        self.pos += 1;
        if self.peek_ident() == Some("self") && self.peek_at(1) == Some(&Tok::Dot) {
            return Err("singleton attributes are not supported".to_string());
        }
        let name = self.ident("an attribute name")?;
        if !is_param_name(&name) {
            return Err(format!(
                "attribute name `{name}` must start with a lowercase letter or `_`"
            ));
        }
        self.expect(&Tok::Colon)?;
        let ty = self.union_type()?;
        self.expect_end()?;
        Ok(Declaration::Attribute(AttributeDecl { mode, name, ty }))
    }

    fn type_alias(&mut self) -> Parsed<Declaration> {
        self.pos += 1;
        let name = self.type_path()?;
        let simple = last_segment(&name);
        if !simple.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Err(format!(
                "type alias name `{simple}` must start with a lowercase letter"
            ));
        }
        let type_params = if self.peek() == Some(&Tok::LBracket) {
            self.type_params()?
        } else {
            Vec::new()
        };
        self.expect(&Tok::Eq)?;
        let ty = self.union_type()?;
        self.expect_end()?;
        Ok(Declaration::TypeAlias(TypeAliasDecl {
            name,
            type_params,
            ty,
        }))
    }
}

fn push_alternative(alternatives: &mut Vec<TypeExpr>, ty: TypeExpr) -> Parsed<()> {
    match ty {
        TypeExpr::Union {
            alternatives: nested,
        } => {
            for alt in nested {
                push_alternative(alternatives, alt)?;
            }
        }
        other => {
            if alternatives.contains(&other) {
                return Err(format!(
                    "union alternative `{other}` appears more than once"
                ));
            }
            alternatives.push(other);
        }
    }
    Ok(())
}

/// Enforce positional-then-keyword ordering.
///
/// Required positionals come first, then optionals, then one `*rest`; keyword
/// parameters follow every positional and at most one `**rest` closes the list.
fn check_parameter_order(params: &[Parameter]) -> Parsed<()> {
    let mut names = BTreeSet::new();
    let mut seen_optional = false;
    let mut seen_rest = false;
    let mut seen_keyword = false;
    let mut seen_keyword_rest = false;

    for param in params {
        if let Some(name) = &param.name {
            if !names.insert(name.as_str()) {
                return Err(format!("parameter `{name}` is declared twice"));
            }
        }
        let label = param.label();
        if !param.keyword && (seen_keyword || seen_keyword_rest) {
            return Err(format!(
                "positional parameter `{label}` follows a keyword parameter"
            ));
        }
        match (param.keyword, param.variadic, param.optional) {
            (false, false, false) => {
                if seen_optional || seen_rest {
                    return Err(format!(
                        "required parameter `{label}` follows an optional or rest parameter"
                    ));
                }
            }
            (false, false, true) => {
                if seen_rest {
                    return Err(format!(
                        "optional parameter `{label}` follows a rest parameter"
                    ));
                }
                seen_optional = true;
            }
            (false, true, _) => {
                if seen_rest {
                    return Err("only one `*` rest parameter is allowed".to_string());
                }
                seen_rest = true;
            }
            (true, false, _) => {
                if seen_keyword_rest {
                    return Err(format!(
                        "keyword parameter `{label}` follows the `**` rest parameter"
                    ));
                }
                seen_keyword = true;
            }
            (true, true, _) => {
                if seen_keyword_rest {
                    return Err("only one `**` rest parameter is allowed".to_string());
                }
                seen_keyword_rest = true;
            }
        }
    }
    Ok(())
}

// The method name ends at the first `:` that is followed by whitespace, which
// keeps operator names such as `==` and `[]=` intact.
fn name_terminator(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    (start..bytes.len()).find(|&idx| {
        idx > start
            && bytes[idx] == b':'
            && bytes.get(idx + 1).is_none_or(|next| next.is_ascii_whitespace())
    })
}

fn validate_method_name(name: &str) -> Parsed<()> {
    if OPERATOR_METHODS.contains(&name) {
        return Ok(());
    }
    let body = name.strip_suffix(['?', '!', '=']).unwrap_or(name);
    let valid = body
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && body.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(format!("`{name}` is not a valid method name"))
    }
}

fn split_singleton(name: &str) -> (MemberKind, &str) {
    match name.strip_prefix("self.") {
        Some(rest) => (MemberKind::Singleton, rest),
        None => (MemberKind::Instance, name),
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

fn is_constant_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_uppercase())
}

fn is_interface_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next() == Some('_') && chars.next().is_some_and(|c| c.is_ascii_uppercase())
}

fn is_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some('_') => !chars.next().is_some_and(|c| c.is_ascii_uppercase()),
        Some(first) => first.is_ascii_lowercase(),
        None => false,
    }
}
