//! Tokenizer for a single logical declaration line.
//!
//! Offsets are byte positions into the logical line text; the parser maps them
//! back to physical line numbers. Method names are sliced from the raw text by
//! the parser, so operator characters only need to survive as `Punct`.

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Tok {
    Ident(String),
    Str(String),
    Int(i64),
    Symbol(String),
    ColonColon,
    Colon,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Pipe,
    Arrow,
    Question,
    Star,
    StarStar,
    Caret,
    Lt,
    Eq,
    Dot,
    Ellipsis,
    Punct(char),
}

#[derive(Clone, Debug)]
pub(crate) struct Token {
    pub tok: Tok,
    pub offset: usize,
}

#[derive(Debug)]
pub(crate) struct LexError {
    pub reason: String,
}

pub(crate) fn describe(tok: Option<&Tok>) -> String {
    let Some(tok) = tok else {
        return "end of line".to_string();
    };
    let text = match tok {
        Tok::Ident(word) => return format!("`{word}`"),
        Tok::Str(raw) => return format!("string literal \"{raw}\""),
        Tok::Int(value) => return format!("integer literal {value}"),
        Tok::Symbol(name) => return format!("symbol :{name}"),
        Tok::Punct(ch) => return format!("`{ch}`"),
        Tok::ColonColon => "::",
        Tok::Colon => ":",
        Tok::Comma => ",",
        Tok::LParen => "(",
        Tok::RParen => ")",
        Tok::LBracket => "[",
        Tok::RBracket => "]",
        Tok::LBrace => "{",
        Tok::RBrace => "}",
        Tok::Pipe => "|",
        Tok::Arrow => "->",
        Tok::Question => "?",
        Tok::Star => "*",
        Tok::StarStar => "**",
        Tok::Caret => "^",
        Tok::Lt => "<",
        Tok::Eq => "=",
        Tok::Dot => ".",
        Tok::Ellipsis => "...",
    };
    format!("`{text}`")
}

fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

fn is_ident_continue(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

// `:name` is a symbol literal only where a value may start; `key:Type`
// written without a space stays a keyword colon.
fn symbol_allowed(bytes: &[u8], idx: usize) -> bool {
    idx == 0
        || matches!(
            bytes[idx - 1],
            b' ' | b'\t' | b'\n' | b'(' | b',' | b'[' | b'|' | b'{' | b'<' | b'=' | b'?' | b'*'
        )
}

fn take_ident(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && is_ident_continue(bytes[end]) {
        end += 1;
    }
    end
}

pub(crate) fn tokenize(text: &str, start: usize) -> Result<Vec<Token>, LexError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut idx = start;

    while idx < bytes.len() {
        let byte = bytes[idx];
        if byte.is_ascii_whitespace() {
            idx += 1;
            continue;
        }
        let offset = idx;
        let next = bytes.get(idx + 1).copied();
        let tok = match byte {
            b'(' => single(&mut idx, Tok::LParen),
            b')' => single(&mut idx, Tok::RParen),
            b'[' => single(&mut idx, Tok::LBracket),
            b']' => single(&mut idx, Tok::RBracket),
            b'{' => single(&mut idx, Tok::LBrace),
            b'}' => single(&mut idx, Tok::RBrace),
            b',' => single(&mut idx, Tok::Comma),
            b'|' => single(&mut idx, Tok::Pipe),
            b'?' => single(&mut idx, Tok::Question),
            b'^' => single(&mut idx, Tok::Caret),
            b'<' => single(&mut idx, Tok::Lt),
            b'=' => single(&mut idx, Tok::Eq),
            b':' if next == Some(b':') => {
                idx += 2;
                Tok::ColonColon
            }
            b':' if next.is_some_and(is_ident_start) && symbol_allowed(bytes, idx) => {
                let end = take_ident(bytes, idx + 1);
                let mut end_with_suffix = end;
                if matches!(bytes.get(end), Some(b'?' | b'!' | b'=')) {
                    end_with_suffix += 1;
                }
                idx = end_with_suffix;
                Tok::Symbol(text[offset + 1..end_with_suffix].to_string())
            }
            b':' => single(&mut idx, Tok::Colon),
            b'*' if next == Some(b'*') => {
                idx += 2;
                Tok::StarStar
            }
            b'*' => single(&mut idx, Tok::Star),
            b'.' if text[idx..].starts_with("...") => {
                idx += 3;
                Tok::Ellipsis
            }
            b'.' => single(&mut idx, Tok::Dot),
            b'-' if next == Some(b'>') => {
                idx += 2;
                Tok::Arrow
            }
            b'-' if next.is_some_and(|b| b.is_ascii_digit()) => {
                idx += 1;
                lex_int(text, &mut idx, offset)?
            }
            b'0'..=b'9' => lex_int(text, &mut idx, offset)?,
            b'"' | b'\'' => lex_string(text, &mut idx, byte)?,
            b if is_ident_start(b) => {
                let end = take_ident(bytes, idx);
                idx = end;
                Tok::Ident(text[offset..end].to_string())
            }
            _ => {
                let ch = text[idx..].chars().next().unwrap_or('\u{fffd}');
                idx += ch.len_utf8();
                Tok::Punct(ch)
            }
        };
        tokens.push(Token { tok, offset });
    }

    Ok(tokens)
}

fn single(idx: &mut usize, tok: Tok) -> Tok {
    *idx += 1;
    tok
}

fn lex_int(text: &str, idx: &mut usize, offset: usize) -> Result<Tok, LexError> {
    let bytes = text.as_bytes();
    while *idx < bytes.len() && (bytes[*idx].is_ascii_digit() || bytes[*idx] == b'_') {
        *idx += 1;
    }
    let digits: String = text[offset..*idx].chars().filter(|c| *c != '_').collect();
    digits
        .parse::<i64>()
        .map(Tok::Int)
        .map_err(|_| LexError {
            reason: format!("integer literal `{}` is out of range", &text[offset..*idx]),
        })
}

fn lex_string(text: &str, idx: &mut usize, quote: u8) -> Result<Tok, LexError> {
    let bytes = text.as_bytes();
    let start = *idx + 1;
    let mut cursor = start;
    while cursor < bytes.len() {
        match bytes[cursor] {
            b'\\' => cursor += 2,
            b if b == quote => {
                *idx = cursor + 1;
                return Ok(Tok::Str(text[start..cursor].to_string()));
            }
            _ => cursor += 1,
        }
    }
    Err(LexError {
        reason: "unterminated string literal".to_string(),
    })
}
