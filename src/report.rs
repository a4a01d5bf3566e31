//! Validation findings and their rendering.
//!
//! A `Report` belongs to one input file. Findings are kept sorted by line,
//! stable within a line by the phase that produced them (parse, build,
//! check). Notes are informational and never make a file fail.

use crate::error::ParseError;
use serde::Serialize;
use std::fmt;

pub const REPORT_SCHEMA_VERSION: &str = "sigcat_report_v1";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FindingKind {
    MalformedSignature,
    ConflictingDeclaration,
    UnresolvedReference,
    ArityMismatch,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::MalformedSignature => "MalformedSignature",
            FindingKind::ConflictingDeclaration => "ConflictingDeclaration",
            FindingKind::UnresolvedReference => "UnresolvedReference",
            FindingKind::ArityMismatch => "ArityMismatch",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub line: usize,
    /// Earlier declaration a conflict points back to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_line: Option<usize>,
    /// Member or type name the finding is about, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
}

impl Finding {
    pub fn malformed(err: &ParseError) -> Self {
        Self {
            kind: FindingKind::MalformedSignature,
            line: err.line,
            related_line: None,
            subject: None,
            message: format!("{} (in `{}`)", err.reason, err.text.replace('\n', " ")),
        }
    }

    pub fn conflict(
        line: usize,
        related_line: usize,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: FindingKind::ConflictingDeclaration,
            line,
            related_line: Some(related_line),
            subject: Some(subject.into()),
            message: message.into(),
        }
    }

    /// A conflict with no earlier declaration to point at.
    pub fn orphan_conflict(
        line: usize,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: FindingKind::ConflictingDeclaration,
            line,
            related_line: None,
            subject: Some(subject.into()),
            message: message.into(),
        }
    }

    pub fn unresolved(line: usize, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: FindingKind::UnresolvedReference,
            line,
            related_line: None,
            subject: Some(subject.into()),
            message: message.into(),
        }
    }

    pub fn arity(line: usize, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: FindingKind::ArityMismatch,
            line,
            related_line: None,
            subject: Some(subject.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.line, self.kind, self.message)?;
        if let Some(related) = self.related_line {
            write!(f, " (see line {related})")?;
        }
        Ok(())
    }
}

/// Warning-level remark, e.g. a generic argument count that could not be
/// checked because the base type's arity is unknown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Note {
    pub line: usize,
    pub subject: String,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub findings: Vec<Finding>,
    pub notes: Vec<Note>,
}

impl Report {
    pub fn new(path: Option<String>) -> Self {
        Self {
            path,
            ..Self::default()
        }
    }

    /// Merge findings from one phase, keeping line order stable.
    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.findings.extend(findings);
        self.findings.sort_by_key(|finding| finding.line);
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    /// One `path:line: Kind: message` line per finding.
    pub fn render_text(&self) -> String {
        let prefix = self.path.as_deref().unwrap_or("<input>");
        let mut out = String::new();
        for finding in &self.findings {
            out.push_str(&format!("{prefix}:{finding}\n"));
        }
        for note in &self.notes {
            out.push_str(&format!("{prefix}:{}: note: {}\n", note.line, note.message));
        }
        out
    }
}

/// Outcome of validating one file in a multi-file run.
#[derive(Debug)]
pub enum FileOutcome {
    Checked(Report),
    Fatal { path: String, error: String },
}

impl FileOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            FileOutcome::Checked(report) if report.is_clean() => "clean",
            FileOutcome::Checked(_) => "findings",
            FileOutcome::Fatal { .. } => "fatal",
        }
    }
}

/// Process exit status for a run: 2 when any file was unreadable, 1 when any
/// file has findings, 0 otherwise.
pub fn exit_status(outcomes: &[FileOutcome]) -> i32 {
    if outcomes
        .iter()
        .any(|outcome| matches!(outcome, FileOutcome::Fatal { .. }))
    {
        2
    } else if outcomes
        .iter()
        .any(|outcome| matches!(outcome, FileOutcome::Checked(report) if !report.is_clean()))
    {
        1
    } else {
        0
    }
}

#[derive(Debug, Serialize)]
struct FileEntry<'a> {
    path: &'a str,
    status: &'static str,
    findings: &'a [Finding],
    notes: &'a [Note],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Debug, Default, Serialize)]
struct Totals {
    files: usize,
    clean: usize,
    fatal: usize,
    findings: usize,
    notes: usize,
}

#[derive(Debug, Serialize)]
struct Summary<'a> {
    schema_version: &'static str,
    files: Vec<FileEntry<'a>>,
    totals: Totals,
}

/// JSON summary of a multi-file run, in input order.
pub fn summary_json(outcomes: &[FileOutcome]) -> serde_json::Value {
    let mut totals = Totals::default();
    let mut files = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        totals.files += 1;
        let entry = match outcome {
            FileOutcome::Checked(report) => {
                if report.is_clean() {
                    totals.clean += 1;
                }
                totals.findings += report.findings.len();
                totals.notes += report.notes.len();
                FileEntry {
                    path: report.path.as_deref().unwrap_or("<input>"),
                    status: outcome.status(),
                    findings: &report.findings,
                    notes: &report.notes,
                    error: None,
                }
            }
            FileOutcome::Fatal { path, error } => {
                totals.fatal += 1;
                FileEntry {
                    path,
                    status: outcome.status(),
                    findings: &[],
                    notes: &[],
                    error: Some(error),
                }
            }
        };
        files.push(entry);
    }
    let summary = Summary {
        schema_version: REPORT_SCHEMA_VERSION,
        files,
        totals,
    };
    serde_json::to_value(&summary).unwrap_or(serde_json::Value::Null)
}
