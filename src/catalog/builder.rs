//! Folds parsed declarations into a `TypeCatalogue`.
//!
//! Conflicts are accumulated as findings; the builder never stops early. A
//! method declaration extends an existing member only when it directly follows
//! the previous declaration of that member in the same block, or when it ends
//! with the `...` marker.

use crate::catalog::{
    Heritage, Member, MemberBody, MemberKey, MemberKind, Mixin, TypeCatalogue, TypeDecl,
    TypeKind, TypeName,
};
use crate::report::Finding;
use crate::signature::{
    AliasDecl, AttributeDecl, ConstantDecl, Declaration, MethodDecl, SourceDecl, TypeAliasDecl,
    TypeHeader,
};
use tracing::debug;

#[derive(Debug, Default)]
pub struct BuildOutcome {
    pub catalogue: TypeCatalogue,
    pub findings: Vec<Finding>,
}

struct LastMethod {
    index: usize,
    owner: TypeName,
    key: MemberKey,
}

#[derive(Default)]
pub struct CatalogueBuilder {
    catalogue: TypeCatalogue,
    findings: Vec<Finding>,
    last_method: Option<LastMethod>,
}

/// Build a catalogue from declarations in file order.
pub fn build_catalogue(declarations: impl IntoIterator<Item = SourceDecl>) -> BuildOutcome {
    let mut builder = CatalogueBuilder::new();
    for decl in declarations {
        builder.add(decl);
    }
    builder.finish()
}

impl CatalogueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, source: SourceDecl) {
        let SourceDecl {
            index,
            line,
            owner,
            decl,
        } = source;
        let Some(owner) = owner else {
            debug!(line, "skipping declaration inside a malformed block");
            return;
        };

        let mut last_method = None;
        match decl {
            Declaration::TypeHeader(header) => self.open_type(owner, header, line),
            Declaration::TypeAlias(alias) => self.add_type_alias(owner, alias, line),
            Declaration::Constant(constant) => self.add_constant(owner, constant, line),
            Declaration::Method(method) => {
                if let Some(key) = self.add_method(&owner, method, index, line) {
                    last_method = Some(LastMethod { index, owner, key });
                }
            }
            Declaration::Alias(alias) => self.add_member_alias(&owner, alias, line),
            Declaration::Attribute(attr) => self.add_attribute(&owner, attr, line),
            Declaration::Mixin(mixin) => {
                if let Some(decl) = self.member_owner(&owner, line) {
                    decl.mixins.push(Mixin {
                        mode: mixin.mode,
                        ty: mixin.ty,
                        line,
                    });
                }
            }
            Declaration::End => {}
        }
        self.last_method = last_method;
    }

    pub fn finish(self) -> BuildOutcome {
        debug!(
            types = self.catalogue.len(),
            members = self.catalogue.member_count(),
            conflicts = self.findings.len(),
            "built catalogue"
        );
        BuildOutcome {
            catalogue: self.catalogue,
            findings: self.findings,
        }
    }

    fn open_type(&mut self, name: TypeName, header: TypeHeader, line: usize) {
        let superclass = header.superclass.map(|ty| Heritage { ty, line });
        let Some(existing) = self.catalogue.get_mut(&name) else {
            self.catalogue.insert(TypeDecl {
                name,
                kind: header.kind,
                declared: true,
                type_params: header.type_params,
                superclass,
                mixins: Vec::new(),
                alias_of: None,
                members: Vec::new(),
                line,
            });
            return;
        };

        if !existing.declared {
            existing.declared = true;
            existing.kind = header.kind;
            existing.type_params = header.type_params;
            existing.superclass = superclass;
            existing.line = line;
            return;
        }

        let first_line = existing.line;
        if existing.kind != header.kind {
            let message = format!(
                "`{name}` is re-opened as {} but was declared as {}",
                header.kind.as_str(),
                existing.kind.as_str()
            );
            self.findings
                .push(Finding::conflict(line, first_line, name.as_str(), message));
            return;
        }
        if existing.type_params.len() != header.type_params.len() {
            let message = format!(
                "`{name}` is re-opened with {} type parameter(s) but was declared with {}",
                header.type_params.len(),
                existing.type_params.len()
            );
            self.findings
                .push(Finding::conflict(line, first_line, name.as_str(), message));
            return;
        }
        let first_superclass = existing
            .superclass
            .as_ref()
            .map(|first| (first.line, first.ty.clone()));
        match (first_superclass, superclass) {
            (Some((related, first)), Some(second)) if first != second.ty => {
                let message = format!(
                    "`{name}` is re-opened with superclass `{}` but was declared with `{first}`",
                    second.ty
                );
                self.findings
                    .push(Finding::conflict(line, related, name.as_str(), message));
            }
            (None, Some(second)) => existing.superclass = Some(second),
            _ => {}
        }
    }

    fn add_type_alias(&mut self, name: TypeName, alias: TypeAliasDecl, line: usize) {
        if let Some(existing) = self.catalogue.get(&name) {
            let message = format!(
                "type `{name}` is already declared as {} `{name}`",
                existing.kind.as_str()
            );
            let related = existing.line;
            self.findings
                .push(Finding::conflict(line, related, name.as_str(), message));
            return;
        }
        self.catalogue.insert(TypeDecl {
            name,
            kind: TypeKind::Alias,
            declared: true,
            type_params: alias.type_params,
            superclass: None,
            mixins: Vec::new(),
            alias_of: Some(alias.ty),
            members: Vec::new(),
            line,
        });
    }

    fn add_constant(&mut self, owner: TypeName, constant: ConstantDecl, line: usize) {
        let simple = constant
            .name
            .rsplit("::")
            .next()
            .unwrap_or(&constant.name)
            .to_string();
        if !self.catalogue.contains(&owner) {
            self.catalogue.insert(TypeDecl {
                name: owner.clone(),
                kind: TypeKind::Module,
                declared: false,
                type_params: Vec::new(),
                superclass: None,
                mixins: Vec::new(),
                alias_of: None,
                members: Vec::new(),
                line,
            });
        }
        self.insert_member(
            &owner,
            Member {
                name: simple,
                kind: MemberKind::Constant,
                body: MemberBody::Constant { ty: constant.ty },
                line,
            },
        );
    }

    /// Returns the member key when the declaration was accepted.
    fn add_method(
        &mut self,
        owner: &TypeName,
        method: MethodDecl,
        index: usize,
        line: usize,
    ) -> Option<MemberKey> {
        let key = MemberKey::new(method.name.clone(), method.kind);
        let subject = qualified(owner, &key);
        let adjacent = self.last_method.as_ref().is_some_and(|last| {
            last.index + 1 == index && &last.owner == owner && last.key == key
        });
        let extends_earlier = method.extends_earlier;

        let findings = &mut self.findings;
        let decl = member_owner(&mut self.catalogue, findings, owner, line)?;
        match decl.member_mut(&key) {
            Some(existing) => {
                let first_line = existing.line;
                match &mut existing.body {
                    MemberBody::Method { overloads } if adjacent || extends_earlier => {
                        overloads.extend(method.overloads);
                        Some(key)
                    }
                    MemberBody::Method { .. } => {
                        let message = format!(
                            "`{subject}` is already declared; stack overloads with `|` or end the signature with `| ...`"
                        );
                        findings.push(Finding::conflict(line, first_line, subject, message));
                        None
                    }
                    _ => {
                        let message = format!("`{subject}` is already declared as an alias");
                        findings.push(Finding::conflict(line, first_line, subject, message));
                        None
                    }
                }
            }
            None if extends_earlier => {
                let message =
                    format!("nothing to overload: `{subject}` has no earlier declaration");
                findings.push(Finding::orphan_conflict(line, subject, message));
                None
            }
            None => {
                decl.members.push(method.into_member(line));
                Some(key)
            }
        }
    }

    fn add_member_alias(&mut self, owner: &TypeName, alias: AliasDecl, line: usize) {
        self.insert_member(
            owner,
            Member {
                name: alias.name,
                kind: alias.kind,
                body: MemberBody::Alias {
                    target: alias.target,
                },
                line,
            },
        );
    }

    fn add_attribute(&mut self, owner: &TypeName, attr: AttributeDecl, line: usize) {
        for member in attr.into_members(line) {
            self.insert_member(owner, member);
        }
    }

    fn insert_member(&mut self, owner: &TypeName, member: Member) {
        let findings = &mut self.findings;
        let Some(decl) = member_owner(&mut self.catalogue, findings, owner, member.line) else {
            return;
        };
        let key = member.key();
        if let Some(existing) = decl.member(&key) {
            let subject = qualified(owner, &key);
            let what = match member.body {
                MemberBody::Constant { .. } => "constant",
                MemberBody::Alias { .. } => "alias",
                MemberBody::Method { .. } => "method",
            };
            let message = format!("{what} `{subject}` is already declared");
            findings.push(Finding::conflict(member.line, existing.line, subject, message));
            return;
        }
        decl.members.push(member);
    }

    fn member_owner(&mut self, owner: &TypeName, line: usize) -> Option<&mut TypeDecl> {
        member_owner(&mut self.catalogue, &mut self.findings, owner, line)
    }
}

/// The type that members are added to, rejecting type aliases.
fn member_owner<'a>(
    catalogue: &'a mut TypeCatalogue,
    findings: &mut Vec<Finding>,
    owner: &TypeName,
    line: usize,
) -> Option<&'a mut TypeDecl> {
    let decl = catalogue.get_mut(owner)?;
    if decl.kind == TypeKind::Alias {
        let message = format!("`{owner}` is a type alias and cannot hold members");
        findings.push(Finding::conflict(line, decl.line, owner.as_str(), message));
        return None;
    }
    Some(decl)
}

fn qualified(owner: &TypeName, key: &MemberKey) -> String {
    format!("{owner}{key}")
}
