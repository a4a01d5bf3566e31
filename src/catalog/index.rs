//! Indexed view of a built catalogue.
//!
//! Types keep their declaration order for reporting; the name index gives
//! deterministic lookup by fully-qualified name.

use crate::catalog::{Member, MemberKey, TypeDecl, TypeName};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Debug, Default, Serialize)]
/// Catalogue types plus a derived index keyed by fully-qualified name.
pub struct TypeCatalogue {
    types: Vec<TypeDecl>,
    #[serde(skip)]
    by_name: BTreeMap<TypeName, usize>,
}

impl TypeCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a type by fully-qualified name.
    pub fn get(&self, name: &TypeName) -> Option<&TypeDecl> {
        self.by_name.get(name).map(|idx| &self.types[*idx])
    }

    pub fn contains(&self, name: &TypeName) -> bool {
        self.by_name.contains_key(name)
    }

    /// Types in the order they were first mentioned.
    pub fn types(&self) -> impl Iterator<Item = &TypeDecl> {
        self.types.iter()
    }

    /// Fully-qualified names in stable sorted order.
    pub fn names(&self) -> impl Iterator<Item = &TypeName> {
        self.by_name.keys()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn member_count(&self) -> usize {
        self.types.iter().map(|decl| decl.members.len()).sum()
    }

    /// Shortcut for `get(owner)?.member(key)`.
    pub fn member(&self, owner: &TypeName, key: &MemberKey) -> Option<&Member> {
        self.get(owner)?.member(key)
    }

    pub(crate) fn get_mut(&mut self, name: &TypeName) -> Option<&mut TypeDecl> {
        let idx = *self.by_name.get(name)?;
        self.types.get_mut(idx)
    }

    /// Add a type that is not yet present. An existing entry with the same
    /// name is replaced in place so indices stay stable.
    pub(crate) fn insert(&mut self, decl: TypeDecl) {
        match self.by_name.get(&decl.name) {
            Some(idx) => self.types[*idx] = decl,
            None => {
                self.by_name.insert(decl.name.clone(), self.types.len());
                self.types.push(decl);
            }
        }
    }
}

impl fmt::Display for TypeCatalogue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for decl in &self.types {
            write!(f, "{decl}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TypeKind;

    fn decl(name: &str) -> TypeDecl {
        TypeDecl {
            name: TypeName::new(name),
            kind: TypeKind::Class,
            declared: true,
            type_params: Vec::new(),
            superclass: None,
            mixins: Vec::new(),
            alias_of: None,
            members: Vec::new(),
            line: 1,
        }
    }

    #[test]
    fn keeps_declaration_order_and_sorted_names() {
        let mut catalogue = TypeCatalogue::new();
        catalogue.insert(decl("IO"));
        catalogue.insert(decl("File"));
        catalogue.insert(decl("Dir"));

        let order: Vec<&str> = catalogue.types().map(|d| d.name.as_str()).collect();
        assert_eq!(order, vec!["IO", "File", "Dir"]);
        let sorted: Vec<&str> = catalogue.names().map(TypeName::as_str).collect();
        assert_eq!(sorted, vec!["Dir", "File", "IO"]);
        assert!(catalogue.contains(&TypeName::new("::File")));
    }

    #[test]
    fn insert_replaces_existing_entry_in_place() {
        let mut catalogue = TypeCatalogue::new();
        catalogue.insert(decl("IO"));
        catalogue.insert(decl("File"));
        let mut replacement = decl("IO");
        replacement.line = 9;
        catalogue.insert(replacement);

        assert_eq!(catalogue.len(), 2);
        assert_eq!(catalogue.get(&TypeName::new("IO")).map(|d| d.line), Some(9));
        assert_eq!(catalogue.types().next().map(|d| d.line), Some(9));
    }
}
