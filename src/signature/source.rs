//! File-level driver for catalogue text.
//!
//! Splits the input into logical lines, tracks the `class ... end` block
//! structure, and hands every declaration to the builder together with the
//! fully-qualified type it applies to. Malformed lines are collected and
//! skipped; only a broken block structure aborts the file.

use crate::catalog::TypeName;
use crate::catalog::model::ROOT_OWNER;
use crate::error::{ParseError, UnrecoverableInput};
use crate::signature::declaration::Declaration;
use crate::signature::parser::{LogicalLine, parse_logical};
use tracing::debug;

const VISIBILITY_MODIFIERS: &[&str] = &["private", "public"];

const DECLARATION_KEYWORDS: &[&str] = &[
    "def",
    "end",
    "class",
    "module",
    "interface",
    "type",
    "alias",
    "include",
    "extend",
    "prepend",
    "attr_reader",
    "attr_writer",
    "attr_accessor",
    "private",
    "public",
];

/// A parsed declaration with its position and resolved owner.
///
/// `index` counts logical declaration lines (documentation, blank lines and
/// bare modifiers excluded); two declarations are adjacent when their indices
/// differ by one. `owner` is the opened type for headers, the alias name for
/// type aliases, and the enclosing or qualifying type for everything else. It
/// is `None` inside a block whose header failed to parse.
#[derive(Clone, Debug)]
pub struct SourceDecl {
    pub index: usize,
    pub line: usize,
    pub owner: Option<TypeName>,
    pub decl: Declaration,
}

#[derive(Clone, Debug, Default)]
pub struct ParsedSource {
    pub declarations: Vec<SourceDecl>,
    pub errors: Vec<ParseError>,
}

struct OpenBlock {
    name: Option<TypeName>,
    label: String,
    line: usize,
}

/// Parse a whole catalogue file.
pub fn parse_source(text: &str) -> Result<ParsedSource, UnrecoverableInput> {
    let physical: Vec<(usize, String)> = text
        .lines()
        .enumerate()
        .map(|(idx, raw)| (idx + 1, strip_comment(raw).trim().to_string()))
        .collect();
    let logical = assemble_logical_lines(&physical);

    let mut parsed = ParsedSource::default();
    let mut stack: Vec<OpenBlock> = Vec::new();
    let mut index = 0;

    for source in logical {
        let Some(source) = blank_modifiers(source) else {
            continue;
        };
        index += 1;
        let line = source.first_line();

        let decl = match parse_logical(&source) {
            Ok(decl) => decl,
            Err(err) => {
                // Keep the block structure intact so the matching `end` still
                // pairs up with this header.
                if let Some(keyword) = block_keyword(source.text()) {
                    stack.push(OpenBlock {
                        name: None,
                        label: keyword.to_string(),
                        line,
                    });
                }
                parsed.errors.push(err);
                continue;
            }
        };

        if decl == Declaration::End {
            if stack.pop().is_none() {
                return Err(UnrecoverableInput::UnmatchedEnd { line });
            }
            continue;
        }

        let enclosing = stack.last();
        let detached = enclosing.is_some_and(|block| block.name.is_none());
        let current = enclosing.and_then(|block| block.name.as_ref());

        let owner = match &decl {
            Declaration::TypeHeader(header) => {
                let name = qualify(current, &header.name);
                let owner = (!detached).then(|| name.clone());
                if !header.closed {
                    stack.push(OpenBlock {
                        name: owner.clone(),
                        label: name.to_string(),
                        line,
                    });
                }
                owner
            }
            Declaration::TypeAlias(alias) => (!detached).then(|| qualify(current, &alias.name)),
            Declaration::Constant(constant) => {
                (!detached).then(|| constant_owner(current, &constant.name))
            }
            Declaration::Method(_)
            | Declaration::Mixin(_)
            | Declaration::Alias(_)
            | Declaration::Attribute(_) => {
                if enclosing.is_none() {
                    parsed.errors.push(ParseError::new(
                        line,
                        source.text(),
                        "member declared outside of a class, module or interface",
                    ));
                    continue;
                }
                current.cloned()
            }
            Declaration::End => None,
        };

        parsed.declarations.push(SourceDecl {
            index,
            line,
            owner,
            decl,
        });
    }

    if let Some(block) = stack.last() {
        return Err(UnrecoverableInput::UnterminatedBlock {
            name: block.label.clone(),
            line: block.line,
        });
    }

    debug!(
        logical_lines = index,
        declarations = parsed.declarations.len(),
        malformed = parsed.errors.len(),
        "parsed catalogue source"
    );
    Ok(parsed)
}

fn qualify(current: Option<&TypeName>, written: &str) -> TypeName {
    if written.starts_with("::") {
        return TypeName::new(written);
    }
    match current {
        Some(scope) => scope.join(written),
        None => TypeName::new(written),
    }
}

fn constant_owner(current: Option<&TypeName>, written: &str) -> TypeName {
    match written.rsplit_once("::") {
        Some(("", _)) => TypeName::new(ROOT_OWNER),
        Some((qualifier, _)) => qualify(current, qualifier),
        None => current
            .cloned()
            .unwrap_or_else(|| TypeName::new(ROOT_OWNER)),
    }
}

fn block_keyword(text: &str) -> Option<&str> {
    let mut words = text.split_whitespace();
    let keyword = words.next()?;
    if !matches!(keyword, "class" | "module" | "interface") {
        return None;
    }
    if words.last() == Some("end") {
        return None;
    }
    Some(keyword)
}

/// Drop a trailing `#` comment, ignoring `#` inside string literals and
/// annotation bodies.
fn strip_comment(raw: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut skip_until = 0;
    for (idx, ch) in raw.char_indices() {
        if idx < skip_until {
            continue;
        }
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, ch) {
            (Some(_), '\\') => escaped = true,
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '%') => {
                if let Some(len) = annotation_len(&raw[idx..]) {
                    skip_until = idx + len;
                }
            }
            (None, '#') => return &raw[..idx],
            (None, _) => {}
        }
    }
    raw
}

/// Net bracket depth of one physical line. Brackets inside string literals
/// and annotation bodies do not count.
fn bracket_delta(text: &str) -> i32 {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut skip_until = 0;
    for (idx, ch) in text.char_indices() {
        if idx < skip_until {
            continue;
        }
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, ch) {
            (Some(_), '\\') => escaped = true,
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '%') => {
                if let Some(len) = annotation_len(&text[idx..]) {
                    skip_until = idx + len;
                }
            }
            (None, '(' | '[' | '{') => depth += 1,
            (None, ')' | ']' | '}') => depth -= 1,
            (None, _) => {}
        }
    }
    depth
}

/// Whether a physical line opens a declaration of its own. Such a line never
/// continues an unclosed bracket from the line before.
fn starts_declaration(text: &str) -> bool {
    if text.starts_with("%a") {
        return true;
    }
    let first = text.split_whitespace().next().unwrap_or_default();
    if DECLARATION_KEYWORDS.contains(&first) {
        return true;
    }
    // `Name: Type` or `Outer::Name: Type`
    let path = text.strip_prefix("::").unwrap_or(text);
    let colon = path.char_indices().find(|&(idx, ch)| {
        ch == ':' && path[idx + 1..].chars().next().is_none_or(char::is_whitespace)
    });
    let Some((colon, _)) = colon else {
        return false;
    };
    let name = &path[..colon];
    !name.is_empty()
        && name.split("::").all(|segment| {
            segment.starts_with(|c: char| c.is_ascii_uppercase())
                && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Join physical lines into logical declaration lines.
///
/// A line with unclosed brackets continues onto the next one, and a line
/// starting with `|` continues the previous declaration (blank and comment
/// lines in between are skipped). An unclosed bracket stops at the next line
/// that starts a declaration, or at end of input; the truncated line is left
/// for the parser to report as malformed.
fn assemble_logical_lines(physical: &[(usize, String)]) -> Vec<LogicalLine> {
    let mut lines = Vec::new();
    let mut idx = 0;

    while idx < physical.len() {
        let (line_no, text) = &physical[idx];
        idx += 1;
        if text.is_empty() {
            continue;
        }

        let mut logical = LogicalLine::empty();
        logical.push(text, *line_no);
        let mut depth = bracket_delta(text);

        loop {
            while depth > 0 {
                let Some((next_no, next_text)) = physical.get(idx) else {
                    break;
                };
                if next_text.is_empty() {
                    idx += 1;
                    continue;
                }
                if starts_declaration(next_text) {
                    debug!(
                        line = logical.first_line(),
                        "unclosed bracket ends at the next declaration"
                    );
                    break;
                }
                idx += 1;
                logical.push(next_text, *next_no);
                depth += bracket_delta(next_text);
            }
            if depth > 0 {
                break;
            }

            let mut look = idx;
            while look < physical.len() && physical[look].1.is_empty() {
                look += 1;
            }
            match physical.get(look) {
                Some((next_no, next_text)) if next_text.starts_with('|') => {
                    logical.push(next_text, *next_no);
                    depth += bracket_delta(next_text);
                    idx = look + 1;
                }
                _ => break,
            }
        }

        lines.push(logical);
    }

    lines
}

/// Blank out annotations (`%a{...}`) and visibility modifiers at the start of
/// a logical line. Returns `None` when nothing else is left.
fn blank_modifiers(mut source: LogicalLine) -> Option<LogicalLine> {
    loop {
        let start = source.text.len() - source.text.trim_start().len();
        let rest = &source.text[start..];
        let cut = if rest.starts_with("%a") {
            annotation_len(rest)
        } else {
            VISIBILITY_MODIFIERS
                .iter()
                .find(|word| {
                    rest.starts_with(**word)
                        && rest[word.len()..]
                            .chars()
                            .next()
                            .is_none_or(char::is_whitespace)
                })
                .map(|word| word.len())
        };
        let Some(len) = cut else {
            break;
        };
        source
            .text
            .replace_range(start..start + len, &" ".repeat(len));
    }
    if source.is_empty() { None } else { Some(source) }
}

/// Byte length of a `%a{...}` annotation at the start of `rest`.
fn annotation_len(rest: &str) -> Option<usize> {
    let open = rest.strip_prefix("%a")?.chars().next()?;
    let close = match open {
        '{' => '}',
        '(' => ')',
        '[' => ']',
        '<' => '>',
        '|' => '|',
        _ => return None,
    };
    let body_start = 2 + open.len_utf8();
    let mut depth = 1;
    for (idx, ch) in rest[body_start..].char_indices() {
        if ch == close {
            depth -= 1;
            if depth == 0 {
                return Some(body_start + idx + ch.len_utf8());
            }
        } else if ch == open {
            depth += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::declaration::ConstantDecl;

    fn owners(parsed: &ParsedSource) -> Vec<Option<String>> {
        parsed
            .declarations
            .iter()
            .map(|decl| decl.owner.as_ref().map(|o| o.0.clone()))
            .collect()
    }

    #[test]
    fn nested_blocks_qualify_owners() {
        let source = "\
class IO
  class Buffer
    def size: () -> Integer
  end
  SEEK_SET: Integer
end
IO::SEEK_CUR: Integer
LIMIT: Integer
";
        let parsed = parse_source(source).expect("parse");
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        assert_eq!(
            owners(&parsed),
            vec![
                Some("IO".to_string()),
                Some("IO::Buffer".to_string()),
                Some("IO::Buffer".to_string()),
                Some("IO".to_string()),
                Some("IO".to_string()),
                Some("Object".to_string()),
            ]
        );
        let lines: Vec<usize> = parsed.declarations.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![1, 2, 3, 5, 7, 8]);
    }

    #[test]
    fn comments_annotations_and_visibility_are_skipped() {
        let source = "\
# Documentation for IO.
# It mentions (unbalanced brackets and 'quotes.
class IO # trailing comment
  %a{annotate:rdoc:skip}
  private

  private def initialize: (Integer fd) -> void
  SEP: String # \"#\" inside a comment
end
";
        let parsed = parse_source(source).expect("parse");
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        assert_eq!(parsed.declarations.len(), 3);
        assert_eq!(parsed.declarations[1].line, 7);
        assert_eq!(parsed.declarations[1].index, 2);
    }

    #[test]
    fn continuation_lines_join_into_one_declaration() {
        let source = "\
class IO
  def read: () -> String

          # one-argument form
          | (Integer length) -> String?
  def each_line: (
    ?String sep,
    ?Integer limit
  ) { (String line) -> void } -> self
end
";
        let parsed = parse_source(source).expect("parse");
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let Declaration::Method(read) = &parsed.declarations[1].decl else {
            panic!("expected method");
        };
        assert_eq!(read.overloads.len(), 2);
        assert_eq!(read.overloads[1].line, 5);
        assert_eq!(parsed.declarations[2].line, 6);
        assert_eq!(parsed.declarations[2].index, 3);
    }

    #[test]
    fn malformed_lines_are_collected_and_parsing_continues() {
        let source = "\
class IO
  def read: (Integer a, -> String
  )
  def write: -> Integer
  SEEK_SET: Integer
end
";
        let parsed = parse_source(source).expect("parse");
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].line, 2);
        assert_eq!(parsed.declarations.len(), 3);
    }

    #[test]
    fn malformed_header_keeps_block_balanced() {
        let source = "\
class io
  def read: () -> String
end
class IO
end
";
        let parsed = parse_source(source).expect("parse");
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.declarations[0].owner, None);
        assert_eq!(parsed.declarations[1].owner, Some(TypeName::new("IO")));
    }

    #[test]
    fn members_outside_blocks_are_malformed() {
        let parsed = parse_source("def read: () -> String\n").expect("parse");
        assert!(parsed.declarations.is_empty());
        assert!(parsed.errors[0].reason.contains("outside of a class"));
    }

    #[test]
    fn broken_block_structure_is_unrecoverable() {
        assert_eq!(
            parse_source("class IO\n  def read: () -> String\n").unwrap_err(),
            UnrecoverableInput::UnterminatedBlock {
                name: "IO".to_string(),
                line: 1
            }
        );
        assert_eq!(
            parse_source("module Kernel end\nend\n").unwrap_err(),
            UnrecoverableInput::UnmatchedEnd { line: 2 }
        );
        // The unclosed bracket is line-local; the open block is what aborts.
        assert_eq!(
            parse_source("class IO\n  def read: (Integer\n").unwrap_err(),
            UnrecoverableInput::UnterminatedBlock {
                name: "IO".to_string(),
                line: 1
            }
        );
    }

    #[test]
    fn annotation_bodies_may_contain_hash_and_brackets() {
        let source = "\
class IO
  %a{annotate:rdoc:copy:Kernel#open}
  def read: () -> String
  %a(pure) def fileno: () -> Integer # fd
  %a{implicitly-returns-nil(} def getc: () -> String?
end
";
        let parsed = parse_source(source).expect("parse");
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let lines: Vec<usize> = parsed.declarations.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![1, 3, 4, 5]);
        assert_eq!(strip_comment("%a{a#b} def x: () -> void # doc"), "%a{a#b} def x: () -> void ");
    }

    #[test]
    fn unclosed_bracket_stops_at_next_declaration() {
        let source = "\
class IO
  def read: (Integer -> String
  def write: () -> Strng
  SEEK_SET: Integer
end
";
        let parsed = parse_source(source).expect("parse");
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].line, 2);
        assert!(!parsed.errors[0].text.contains("write"), "{:?}", parsed.errors[0]);
        let lines: Vec<usize> = parsed.declarations.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![1, 3, 4]);
    }

    #[test]
    fn declaration_starts_are_recognised() {
        assert!(starts_declaration("def write: () -> void"));
        assert!(starts_declaration("end"));
        assert!(starts_declaration("attr_reader path: String"));
        assert!(starts_declaration("IO::SEEK_CUR: Integer"));
        assert!(starts_declaration("::LIMIT: Integer"));
        assert!(!starts_declaration("chomp: bool,"));
        assert!(!starts_declaration("type: String"));
        assert!(!starts_declaration("?Integer limit"));
        assert!(!starts_declaration(") -> self"));
    }

    #[test]
    fn escaped_quotes_do_not_hide_brackets() {
        assert_eq!(bracket_delta(r#"SEP: "\"(""#), 0);
        assert_eq!(bracket_delta(r#"def x: ("\\" a"#), 1);
        assert_eq!(bracket_delta("%a{(} def x: ("), 1);
    }

    #[test]
    fn absolute_constant_owner_ignores_enclosing_block() {
        let parsed = parse_source("class IO\n  ::File::SEPARATOR: String\nend\n").expect("parse");
        assert_eq!(parsed.declarations[1].owner, Some(TypeName::new("File")));
        assert_eq!(
            parsed.declarations[1].decl,
            Declaration::Constant(ConstantDecl {
                name: "::File::SEPARATOR".to_string(),
                ty: crate::catalog::TypeExpr::named("String"),
            })
        );
    }
}
