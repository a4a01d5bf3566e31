//! Signature parsing.
//!
//! `parser` handles a single declaration line; `source` drives a whole file
//! through it, joining continuation lines and tracking block structure.

pub mod declaration;
mod lexer;
pub mod parser;
pub mod source;

pub use declaration::{
    AliasDecl, AttributeDecl, AttributeMode, ConstantDecl, Declaration, MethodDecl, MixinDecl,
    TypeAliasDecl, TypeHeader,
};
pub use parser::{LogicalLine, parse_declaration, parse_member, parse_type};
pub use source::{ParsedSource, SourceDecl, parse_source};
