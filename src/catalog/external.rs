//! Names a catalogue may reference without declaring them.
//!
//! Tables are loaded from JSON files validated against the bundled
//! `schema/external_types.schema.json` and merged with the built-in core
//! table unless the caller opts out. An arity of `null` means the name is
//! known but its generic parameter count is not.

use crate::catalog::TypeName;
use anyhow::{Context, Result, anyhow, bail};
use jsonschema::JSONSchema;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::OnceLock;

pub const EXTERNAL_TYPES_SCHEMA_VERSION: &str = "sigcat_external_types_v1";

const EXTERNAL_TYPES_SCHEMA: &str = include_str!("../../schema/external_types.schema.json");

// Core classes, modules, interfaces and aliases a catalogue of the standard
// library can lean on.
const CORE_TYPES: &[(&str, usize)] = &[
    ("BasicObject", 0),
    ("Object", 0),
    ("Kernel", 0),
    ("Module", 0),
    ("Class", 0),
    ("Comparable", 0),
    ("Integer", 0),
    ("Float", 0),
    ("Numeric", 0),
    ("Rational", 0),
    ("Complex", 0),
    ("String", 0),
    ("Symbol", 0),
    ("NilClass", 0),
    ("TrueClass", 0),
    ("FalseClass", 0),
    ("Encoding", 0),
    ("Regexp", 0),
    ("MatchData", 0),
    ("Proc", 0),
    ("Method", 0),
    ("UnboundMethod", 0),
    ("Binding", 0),
    ("Time", 0),
    ("Random", 0),
    ("Thread", 0),
    ("Fiber", 0),
    ("Mutex", 0),
    ("Process", 0),
    ("Signal", 0),
    ("IO", 0),
    ("File", 0),
    ("Dir", 0),
    ("Marshal", 0),
    ("Math", 0),
    ("GC", 0),
    ("ObjectSpace", 0),
    ("Errno", 0),
    ("Warning", 0),
    ("Exception", 0),
    ("StandardError", 0),
    ("ScriptError", 0),
    ("LoadError", 0),
    ("NotImplementedError", 0),
    ("ArgumentError", 0),
    ("TypeError", 0),
    ("NameError", 0),
    ("NoMethodError", 0),
    ("RuntimeError", 0),
    ("FrozenError", 0),
    ("IOError", 0),
    ("EOFError", 0),
    ("SystemCallError", 0),
    ("IndexError", 0),
    ("KeyError", 0),
    ("StopIteration", 0),
    ("RangeError", 0),
    ("FloatDomainError", 0),
    ("ZeroDivisionError", 0),
    ("Interrupt", 0),
    ("SignalException", 0),
    ("SystemExit", 0),
    ("Array", 1),
    ("Enumerable", 1),
    ("Range", 1),
    ("Set", 1),
    ("Struct", 1),
    ("Hash", 2),
    ("Enumerator", 2),
    ("_ToS", 0),
    ("_ToStr", 0),
    ("_ToInt", 0),
    ("_ToI", 0),
    ("_ToF", 0),
    ("_ToR", 0),
    ("_ToC", 0),
    ("_ToProc", 0),
    ("_ToPath", 0),
    ("_ToIO", 0),
    ("_Reader", 0),
    ("_Writer", 0),
    ("_Inspect", 0),
    ("_ToA", 1),
    ("_ToAry", 1),
    ("_Each", 1),
    ("_ToHash", 2),
    ("int", 0),
    ("real", 0),
    ("string", 0),
    ("path", 0),
    ("io", 0),
    ("interned", 0),
    ("encoding", 0),
    ("array", 1),
    ("range", 1),
    ("hash", 2),
];

#[derive(Deserialize)]
struct TableFile {
    schema_version: String,
    types: BTreeMap<String, Option<usize>>,
}

/// Mapping from external type name to arity (`None` when unknown).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExternalTypeTable {
    entries: BTreeMap<TypeName, Option<usize>>,
}

impl ExternalTypeTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in core table.
    pub fn core() -> Self {
        let mut table = Self::empty();
        for (name, arity) in CORE_TYPES {
            table.insert(name, Some(*arity));
        }
        table
    }

    pub fn insert(&mut self, name: &str, arity: Option<usize>) {
        self.entries.insert(TypeName::new(name), arity);
    }

    /// Add every entry of `other`; its arities win on overlap.
    pub fn merge(&mut self, other: ExternalTypeTable) {
        self.entries.extend(other.entries);
    }

    pub fn contains(&self, name: &TypeName) -> bool {
        self.entries.contains_key(name)
    }

    /// `None` when the name is not in the table, `Some(None)` when its arity
    /// is unknown.
    pub fn arity(&self, name: &TypeName) -> Option<Option<usize>> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load and validate a table file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("opening external type table {}", path.display()))?;
        let value: Value = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing external type table {}", path.display()))?;
        Self::from_value(value)
            .with_context(|| format!("loading external type table {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).context("parsing external type table")?;
        Self::from_value(value)
    }

    fn from_value(value: Value) -> Result<Self> {
        let schema = external_types_schema()?;
        if let Err(errors) = schema.validate(&value) {
            let details = errors
                .map(|err| err.to_string())
                .collect::<Vec<_>>()
                .join("\n");
            bail!("external type table failed schema validation:\n{details}");
        }

        let file: TableFile =
            serde_json::from_value(value).context("decoding external type table")?;
        if file.schema_version != EXTERNAL_TYPES_SCHEMA_VERSION {
            bail!(
                "schema_version '{}' is not {}",
                file.schema_version,
                EXTERNAL_TYPES_SCHEMA_VERSION
            );
        }

        let mut table = Self::empty();
        for (name, arity) in file.types {
            table.insert(&name, arity);
        }
        Ok(table)
    }
}

fn external_types_schema() -> Result<&'static JSONSchema> {
    static SCHEMA: OnceLock<JSONSchema> = OnceLock::new();
    if let Some(schema) = SCHEMA.get() {
        return Ok(schema);
    }
    let value: Value =
        serde_json::from_str(EXTERNAL_TYPES_SCHEMA).context("parsing bundled external type schema")?;
    let compiled = JSONSchema::compile(&value)
        .map_err(|err| anyhow!("compiling bundled external type schema: {err}"))?;
    Ok(SCHEMA.get_or_init(|| compiled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn core_table_knows_generic_arity() {
        let core = ExternalTypeTable::core();
        assert_eq!(core.arity(&TypeName::new("Integer")), Some(Some(0)));
        assert_eq!(core.arity(&TypeName::new("::Hash")), Some(Some(2)));
        assert_eq!(core.arity(&TypeName::new("Strng")), None);
    }

    #[test]
    fn loads_valid_table_with_unknown_arity() {
        let mut file = NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{"schema_version": "sigcat_external_types_v1",
                "types": {{"Pathname": 0, "Concurrent::Map": null}}}}"#
        )
        .expect("write");
        let table = ExternalTypeTable::load(file.path()).expect("load table");
        assert_eq!(table.len(), 2);
        assert_eq!(table.arity(&TypeName::new("Concurrent::Map")), Some(None));
    }

    #[test]
    fn rejects_tables_that_break_the_schema() {
        let wrong_version =
            ExternalTypeTable::from_json_str(r#"{"schema_version": "v0", "types": {}}"#);
        assert!(wrong_version.is_err());

        let negative = ExternalTypeTable::from_json_str(
            r#"{"schema_version": "sigcat_external_types_v1", "types": {"Foo": -1}}"#,
        );
        let message = format!("{:#}", negative.unwrap_err());
        assert!(message.contains("schema validation"), "{message}");

        let bad_name = ExternalTypeTable::from_json_str(
            r#"{"schema_version": "sigcat_external_types_v1", "types": {"Foo Bar": 0}}"#,
        );
        assert!(bad_name.is_err());
    }

    #[test]
    fn merge_prefers_incoming_arity() {
        let mut table = ExternalTypeTable::core();
        let mut extra = ExternalTypeTable::empty();
        extra.insert("Set", None);
        table.merge(extra);
        assert_eq!(table.arity(&TypeName::new("Set")), Some(None));
    }
}
