//! Embedded literal extraction
//!
//! Scans host source text for tagged template literals whose tag is an identifier chain
//! rooted at `graphql` (`graphql`, `graphql.experimental`, ...). Validation of the tag name is
//! left to [parsing](crate::tagql::parsing); this module only reports what it finds.
//!
//! Code inside `${ ... }` holes of any template is scanned like top-level code, so a tag
//! nested in another template's substitution is reported too.
//!
//! # Example
//!
//! ```rust,ignore
//! let tags = find_graphql_tags("graphql`fragment F on User { id }`", Path::new("a.js"))?;
//! assert_eq!(tags[0].tag, "graphql");
//! ```

pub mod tokens;

use logos::Logos;
use once_cell::sync::Lazy;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::tagql::filter::GRAPHQL_KEYWORD;
use tokens::JsToken;

/// Where a literal's body starts in the host file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    /// Byte offset of the first body character
    pub offset: usize,
    /// 1-based line
    pub line: usize,
    /// 1-based column, in characters
    pub column: usize,
}

impl SourceLocation {
    /// Host file location of the 1-based `line:column` inside `body`, a literal body that
    /// starts at `self`. Positions past the end of `body` clamp to its end.
    pub fn within(&self, body: &str, line: usize, column: usize) -> SourceLocation {
        let mut offset = 0;
        for _ in 1..line {
            match body[offset..].find('\n') {
                Some(newline) => offset += newline + 1,
                None => {
                    offset = body.len();
                    break;
                }
            }
        }
        offset += body[offset..]
            .char_indices()
            .take_while(|(_, c)| *c != '\n')
            .nth(column.saturating_sub(1))
            .map(|(i, _)| i)
            .unwrap_or_else(|| body[offset..].find('\n').unwrap_or(body.len() - offset));

        let before = &body[..offset];
        let newlines = before.matches('\n').count();
        let line_chars = before[before.rfind('\n').map(|i| i + 1).unwrap_or(0)..].chars().count();
        SourceLocation {
            offset: self.offset + offset,
            line: self.line + newlines,
            column: if newlines == 0 {
                self.column + line_chars
            } else {
                line_chars + 1
            },
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A literal found in a host file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedTag {
    /// The full tag expression, e.g. `graphql.experimental`
    pub tag: String,
    /// Raw template text between the backticks
    pub body: String,
    pub location: SourceLocation,
}

/// Errors raised while scanning a host file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The template interpolates a value, which can't be compiled ahead of time
    Substitution { file: PathBuf, location: SourceLocation },
    /// A tagged template that never closes
    Unterminated { file: PathBuf, location: SourceLocation },
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::Substitution { file, location } => write!(
                f,
                "Substitutions are not allowed in graphql literals ({}:{}).",
                file.display(),
                location
            ),
            ExtractError::Unterminated { file, location } => write!(
                f,
                "Unterminated graphql literal ({}:{}).",
                file.display(),
                location
            ),
        }
    }
}

impl std::error::Error for ExtractError {}

struct PendingTag {
    name: String,
    awaiting_member: bool,
}

/// A closed template literal
struct TemplateSpan {
    /// Offset of the closing backtick
    body_end: usize,
    /// Offset just past the closing backtick
    end: usize,
    has_substitution: bool,
}

struct Scanner<'a> {
    text: &'a str,
    filename: &'a Path,
    found: Vec<EmbeddedTag>,
}

impl<'a> Scanner<'a> {
    /// Scan code from `start`.
    ///
    /// Inside a `${` hole, returns the offset just past the `}` closing it. `None` means the
    /// text ended first, either at top level or inside a literal that never closes.
    fn scan_code(&mut self, start: usize, in_hole: bool) -> Result<Option<usize>, ExtractError> {
        let text = self.text;
        let mut lexer = JsToken::lexer(&text[start..]);
        let mut pending: Option<PendingTag> = None;
        let mut after_dot = false;
        let mut depth = 0usize;

        while let Some(token) = lexer.next() {
            let token = token.ok();
            match token {
                Some(JsToken::Ident) => {
                    let ident = lexer.slice();
                    pending = match pending.take() {
                        Some(mut chain) if chain.awaiting_member => {
                            chain.name.push_str(ident);
                            chain.awaiting_member = false;
                            Some(chain)
                        }
                        // `foo.graphql` is a property, not the tag
                        _ if after_dot => None,
                        _ if ident == GRAPHQL_KEYWORD => Some(PendingTag {
                            name: ident.to_string(),
                            awaiting_member: false,
                        }),
                        _ => None,
                    };
                }
                Some(JsToken::Dot) => {
                    pending = match pending.take() {
                        Some(mut chain) if !chain.awaiting_member => {
                            chain.name.push('.');
                            chain.awaiting_member = true;
                            Some(chain)
                        }
                        _ => None,
                    };
                }
                Some(JsToken::LBrace) => {
                    depth += 1;
                    pending = None;
                }
                Some(JsToken::RBrace) => {
                    if in_hole && depth == 0 {
                        return Ok(Some(start + lexer.span().end));
                    }
                    depth = depth.saturating_sub(1);
                    pending = None;
                }
                Some(JsToken::Backtick) => {
                    let body_start = start + lexer.span().end;
                    let chain = pending.take().filter(|chain| !chain.awaiting_member);
                    let Some(template) = self.scan_template(body_start)? else {
                        return match chain {
                            Some(_) => Err(ExtractError::Unterminated {
                                file: self.filename.to_path_buf(),
                                location: locate(text, body_start),
                            }),
                            None => Ok(None),
                        };
                    };
                    if let Some(chain) = chain {
                        let location = locate(text, body_start);
                        if template.has_substitution {
                            return Err(ExtractError::Substitution {
                                file: self.filename.to_path_buf(),
                                location,
                            });
                        }
                        self.found.push(EmbeddedTag {
                            tag: chain.name,
                            body: text[body_start..template.body_end].to_string(),
                            location,
                        });
                    }
                    lexer.bump(template.end - body_start);
                }
                Some(JsToken::Str) | None => pending = None,
            }
            after_dot = token == Some(JsToken::Dot);
        }

        Ok(None)
    }

    /// Scan a template body starting at `body_start`, descending into `${` holes
    fn scan_template(&mut self, body_start: usize) -> Result<Option<TemplateSpan>, ExtractError> {
        let text = self.text;
        let bytes = text.as_bytes();
        let mut has_substitution = false;
        let mut i = body_start;

        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'`' => {
                    return Ok(Some(TemplateSpan {
                        body_end: i,
                        end: i + 1,
                        has_substitution,
                    }))
                }
                b'$' if bytes.get(i + 1) == Some(&b'{') => {
                    has_substitution = true;
                    match self.scan_code(i + 2, true)? {
                        Some(resume) => i = resume,
                        None => return Ok(None),
                    }
                }
                _ => i += 1,
            }
        }

        Ok(None)
    }
}

/// Find every embedded literal in `text`, in source order.
pub fn find_graphql_tags(text: &str, filename: &Path) -> Result<Vec<EmbeddedTag>, ExtractError> {
    let mut scanner = Scanner {
        text,
        filename,
        found: Vec::new(),
    };
    scanner.scan_code(0, false)?;
    Ok(scanner.found)
}

/// Latest scan per file: text hash and tags
static MEMO: Lazy<Mutex<HashMap<PathBuf, (u64, Vec<EmbeddedTag>)>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn text_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Cached [find_graphql_tags]. Only the latest text of each file is kept; failures are
/// never cached.
pub fn memoized_find(text: &str, filename: &Path) -> Result<Vec<EmbeddedTag>, ExtractError> {
    let hash = text_hash(text);

    if let Ok(memo) = MEMO.lock() {
        if let Some((cached, tags)) = memo.get(filename) {
            if *cached == hash {
                return Ok(tags.clone());
            }
        }
    }

    let tags = find_graphql_tags(text, filename)?;
    if let Ok(mut memo) = MEMO.lock() {
        memo.insert(filename.to_path_buf(), (hash, tags.clone()));
    }
    Ok(tags)
}

fn locate(text: &str, offset: usize) -> SourceLocation {
    let before = &text[..offset];
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    SourceLocation {
        offset,
        line: before.matches('\n').count() + 1,
        column: before[line_start..].chars().count() + 1,
    }
}
