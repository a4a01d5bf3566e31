//! Shared library for the sigcat declaration catalogue validator.
//!
//! A catalogue file is parsed into positioned declarations, folded into a
//! `TypeCatalogue`, and checked for references that do not resolve. Each phase
//! accumulates findings; only a broken block structure or undecodable input
//! stops a file. Public functions here form the contract the `sigcat` binary
//! depends on.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug_span;

pub mod catalog;
pub mod config;
pub mod consistency;
pub mod error;
pub mod logging;
pub mod report;
pub mod signature;

pub use catalog::{
    CatalogueBuilder, ExternalTypeTable, Member, MemberKey, MemberKind, TypeCatalogue, TypeDecl,
    TypeExpr, TypeKind, TypeName, build_catalogue,
};
pub use config::ValidatorOptions;
pub use consistency::{CheckOutcome, check_catalogue};
pub use error::{ParseError, UnrecoverableInput};
pub use report::{FileOutcome, Finding, FindingKind, Note, Report, exit_status, summary_json};
pub use signature::{parse_declaration, parse_member, parse_source, parse_type};

/// Catalogue and report produced for one input.
#[derive(Debug)]
pub struct Analysis {
    pub catalogue: TypeCatalogue,
    pub report: Report,
}

/// Run parse, build and check over catalogue text.
pub fn analyze_source(
    text: &str,
    options: &ValidatorOptions,
) -> Result<Analysis, UnrecoverableInput> {
    let parsed = parse_source(text)?;
    let mut report = Report::new(None);
    report.extend(parsed.errors.iter().map(Finding::malformed));

    let built = build_catalogue(parsed.declarations);
    report.extend(built.findings);

    let checked = check_catalogue(&built.catalogue, &options.external);
    report.extend(checked.findings);
    report.notes = checked.notes;

    Ok(Analysis {
        catalogue: built.catalogue,
        report,
    })
}

pub fn validate_source(text: &str, options: &ValidatorOptions) -> Result<Report, UnrecoverableInput> {
    analyze_source(text, options).map(|analysis| analysis.report)
}

/// Interpret raw file contents as UTF-8 catalogue text.
pub fn decode_source(bytes: &[u8]) -> Result<&str, UnrecoverableInput> {
    std::str::from_utf8(bytes).map_err(|err| UnrecoverableInput::InvalidEncoding {
        offset: err.valid_up_to(),
    })
}

pub fn analyze_path(path: &Path, options: &ValidatorOptions) -> Result<Analysis> {
    let _span = debug_span!("validate", path = %path.display()).entered();
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let text = decode_source(&bytes).with_context(|| format!("validating {}", path.display()))?;
    let mut analysis =
        analyze_source(text, options).with_context(|| format!("validating {}", path.display()))?;
    analysis.report.path = Some(path.display().to_string());
    Ok(analysis)
}

pub fn validate_path(path: &Path, options: &ValidatorOptions) -> Result<Report> {
    analyze_path(path, options).map(|analysis| analysis.report)
}

/// Validate files in parallel; outcomes keep the order of `paths`.
pub fn validate_paths(paths: &[PathBuf], options: &ValidatorOptions) -> Vec<FileOutcome> {
    paths
        .par_iter()
        .map(|path| match validate_path(path, options) {
            Ok(report) => FileOutcome::Checked(report),
            Err(err) => FileOutcome::Fatal {
                path: path.display().to_string(),
                error: format!("{err:#}"),
            },
        })
        .collect()
}

/// Split comma- or whitespace-delimited configuration lists into tokens.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .replace(',', " ")
        .split_whitespace()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
