//! Parsed form of one logical declaration line.
//!
//! Names are kept as written; the file driver qualifies them against the
//! enclosing block before the builder sees them.

use crate::catalog::model::TypeParams;
use crate::catalog::{
    Member, MemberBody, MemberKind, MixinMode, Overload, TypeExpr, TypeKind, TypeParam,
};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Declaration {
    TypeHeader(TypeHeader),
    End,
    Method(MethodDecl),
    Constant(ConstantDecl),
    Mixin(MixinDecl),
    Alias(AliasDecl),
    Attribute(AttributeDecl),
    TypeAlias(TypeAliasDecl),
}

/// `class Name[Params] < Super`, `module Name`, `interface _Name`.
///
/// `closed` marks the one-line form `module Kernel end`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeHeader {
    pub kind: TypeKind,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub superclass: Option<TypeExpr>,
    pub closed: bool,
}

/// `def name: sig | sig`, optionally ending in the `...` extension marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDecl {
    pub name: String,
    pub kind: MemberKind,
    pub overloads: Vec<Overload>,
    pub extends_earlier: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstantDecl {
    pub name: String,
    pub ty: TypeExpr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MixinDecl {
    pub mode: MixinMode,
    pub ty: TypeExpr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AliasDecl {
    pub kind: MemberKind,
    pub name: String,
    pub target: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeMode {
    Reader,
    Writer,
    Accessor,
}

impl AttributeMode {
    pub fn keyword(&self) -> &'static str {
        match self {
            AttributeMode::Reader => "attr_reader",
            AttributeMode::Writer => "attr_writer",
            AttributeMode::Accessor => "attr_accessor",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeDecl {
    pub mode: AttributeMode,
    pub name: String,
    pub ty: TypeExpr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeAliasDecl {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub ty: TypeExpr,
}

impl MethodDecl {
    pub fn into_member(self, line: usize) -> Member {
        Member {
            name: self.name,
            kind: self.kind,
            body: MemberBody::Method {
                overloads: self.overloads,
            },
            line,
        }
    }
}

impl AttributeDecl {
    /// Desugar into the reader and/or writer instance methods.
    pub fn into_members(self, line: usize) -> Vec<Member> {
        use crate::catalog::{Callable, Parameter};

        let reader = Member {
            name: self.name.clone(),
            kind: MemberKind::Instance,
            body: MemberBody::Method {
                overloads: vec![Overload {
                    type_params: Vec::new(),
                    callable: Callable {
                        params: Vec::new(),
                        block: None,
                        returns: self.ty.clone(),
                    },
                    line,
                }],
            },
            line,
        };
        let writer = Member {
            name: format!("{}=", self.name),
            kind: MemberKind::Instance,
            body: MemberBody::Method {
                overloads: vec![Overload {
                    type_params: Vec::new(),
                    callable: Callable {
                        params: vec![Parameter::required(Some(&self.name), self.ty.clone())],
                        block: None,
                        returns: self.ty,
                    },
                    line,
                }],
            },
            line,
        };
        match self.mode {
            AttributeMode::Reader => vec![reader],
            AttributeMode::Writer => vec![writer],
            AttributeMode::Accessor => vec![reader, writer],
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Declaration::TypeHeader(header) => {
                write!(
                    f,
                    "{} {}{}",
                    header.kind.as_str(),
                    header.name,
                    TypeParams(&header.type_params)
                )?;
                if let Some(superclass) = &header.superclass {
                    write!(f, " < {superclass}")?;
                }
                if header.closed {
                    f.write_str(" end")?;
                }
                Ok(())
            }
            Declaration::End => f.write_str("end"),
            Declaration::Method(method) => {
                let member = method.clone().into_member(0);
                write!(f, "{member}")?;
                if method.extends_earlier {
                    f.write_str(" | ...")?;
                }
                Ok(())
            }
            Declaration::Constant(constant) => write!(f, "{}: {}", constant.name, constant.ty),
            Declaration::Mixin(mixin) => write!(f, "{} {}", mixin.mode.as_str(), mixin.ty),
            Declaration::Alias(alias) => {
                let prefix = if alias.kind == MemberKind::Singleton {
                    "self."
                } else {
                    ""
                };
                write!(f, "alias {prefix}{} {prefix}{}", alias.name, alias.target)
            }
            Declaration::Attribute(attr) => {
                write!(f, "{} {}: {}", attr.mode.keyword(), attr.name, attr.ty)
            }
            Declaration::TypeAlias(alias) => write!(
                f,
                "type {}{} = {}",
                alias.name,
                TypeParams(&alias.type_params),
                alias.ty
            ),
        }
    }
}
