use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Fully-qualified type name inside a catalogue (e.g. `IO::Buffer`).
///
/// Stored without a leading `::`; the root namespace has no name of its own.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(pub String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.strip_prefix("::") {
            Some(stripped) => Self(stripped.to_string()),
            None => Self(name),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append a (possibly qualified) relative name.
    pub fn join(&self, child: &str) -> TypeName {
        TypeName(format!("{}::{child}", self.0))
    }

    pub fn parent(&self) -> Option<TypeName> {
        self.0
            .rsplit_once("::")
            .map(|(parent, _)| TypeName(parent.to_string()))
    }

    /// Last path segment (`Buffer` for `IO::Buffer`).
    pub fn simple_name(&self) -> &str {
        self.0.rsplit("::").next().unwrap_or(&self.0)
    }

    /// This name followed by each enclosing namespace, innermost first.
    pub fn ancestors(&self) -> impl Iterator<Item = TypeName> {
        let mut next = Some(self.clone());
        std::iter::from_fn(move || {
            let current = next.take()?;
            next = current.parent();
            Some(current)
        })
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which side of a type a member belongs to.
///
/// Members are unique per `(name, kind)` pair, so an instance `open` and a
/// class-level `self.open` can coexist.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum MemberKind {
    Instance,
    Singleton,
    Constant,
}

/// Declared shape of a catalogue type.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TypeKind {
    Class,
    Module,
    Interface,
    Alias,
}

/// Identity of a member inside one type.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MemberKey {
    pub name: String,
    pub kind: MemberKind,
}

impl MemberKey {
    pub fn new(name: impl Into<String>, kind: MemberKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MemberKind::Instance => write!(f, "#{}", self.name),
            MemberKind::Singleton => write!(f, ".{}", self.name),
            MemberKind::Constant => write!(f, "::{}", self.name),
        }
    }
}

impl MemberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberKind::Instance => "instance",
            MemberKind::Singleton => "singleton",
            MemberKind::Constant => "constant",
        }
    }

    fn from_str(value: &str) -> Option<Self> {
        match value {
            "instance" => Some(MemberKind::Instance),
            "singleton" => Some(MemberKind::Singleton),
            "constant" => Some(MemberKind::Constant),
            _ => None,
        }
    }
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Module => "module",
            TypeKind::Interface => "interface",
            TypeKind::Alias => "type",
        }
    }

    fn from_str(value: &str) -> Option<Self> {
        match value {
            "class" => Some(TypeKind::Class),
            "module" => Some(TypeKind::Module),
            "interface" => Some(TypeKind::Interface),
            "type" => Some(TypeKind::Alias),
            _ => None,
        }
    }
}

impl Serialize for MemberKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MemberKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::from_str(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown member kind '{value}'")))
    }
}

impl Serialize for TypeKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TypeKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::from_str(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown type kind '{value}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_kind_serializes_as_lowercase_label() {
        let json = serde_json::to_string(&MemberKind::Singleton).unwrap();
        assert_eq!(json, "\"singleton\"");
        let back: MemberKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MemberKind::Singleton);

        let err = serde_json::from_str::<MemberKind>("\"static\"").unwrap_err();
        assert!(err.to_string().contains("unknown member kind"));
    }

    #[test]
    fn type_alias_kind_uses_declaration_keyword() {
        let json = serde_json::to_string(&TypeKind::Alias).unwrap();
        assert_eq!(json, "\"type\"");
        let back: TypeKind = serde_json::from_str("\"interface\"").unwrap();
        assert_eq!(back, TypeKind::Interface);
    }

    #[test]
    fn type_name_strips_root_prefix_and_walks_ancestors() {
        let name = TypeName::new("::IO::Buffer");
        assert_eq!(name.as_str(), "IO::Buffer");
        assert_eq!(name.simple_name(), "Buffer");
        assert_eq!(name.parent(), Some(TypeName::new("IO")));

        let chain: Vec<String> = name.join("Flags").ancestors().map(|n| n.0).collect();
        assert_eq!(chain, vec!["IO::Buffer::Flags", "IO::Buffer", "IO"]);
    }

    #[test]
    fn member_key_display_marks_kind() {
        assert_eq!(MemberKey::new("read", MemberKind::Instance).to_string(), "#read");
        assert_eq!(MemberKey::new("open", MemberKind::Singleton).to_string(), ".open");
        assert_eq!(
            MemberKey::new("SEEK_SET", MemberKind::Constant).to_string(),
            "::SEEK_SET"
        );
    }
}
