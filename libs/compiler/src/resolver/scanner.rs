//! Minimal tokenizer that finds single-line import statements.
//!
//! Comments and string literals are skipped before the `import` keyword is matched, so commented
//! out imports or `"import ..."` inside a string never reach the resolver.

use std::ops::Range;

/// One `import ... "<specifier>";` statement found in a source body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
  /// Raw specifier text between the quotes.
  pub specifier: String,
  /// Named-import clause (`{A, B as C}`, `* as X`, `X`), kept only for re-emission.
  pub clause: Option<String>,
  /// Byte range of the specifier text, quotes excluded.
  pub specifier_span: Range<usize>,
  /// Byte range of the whole statement, terminating `;` included.
  pub span: Range<usize>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportScan {
  pub imports: Vec<ImportStatement>,
  /// Import statements that could not be matched as a single-line form.
  pub unsupported: Vec<Range<usize>>,
}

pub fn scan_imports(source: &str) -> ImportScan {
  let bytes = source.as_bytes();
  let mut scan = ImportScan::default();
  let mut index = 0;

  while index < bytes.len() {
    match bytes[index] {
      b'/' if bytes.get(index + 1) == Some(&b'/') => {
        index = skip_line_comment(bytes, index);
      }
      b'/' if bytes.get(index + 1) == Some(&b'*') => {
        index = skip_block_comment(bytes, index);
      }
      b'"' | b'\'' => {
        index = skip_string(bytes, index).map_or(bytes.len(), |range| range.end + 1);
      }
      byte if is_ident_start(byte) => {
        let end = ident_end(bytes, index);
        if &source[index..end] == "import" {
          match parse_import(source, index, end) {
            Ok(statement) => {
              index = statement.span.end;
              scan.imports.push(statement);
              continue;
            }
            Err(unsupported) => scan.unsupported.push(unsupported),
          }
        }
        index = end;
      }
      _ => index += 1,
    }
  }

  scan
}

/// Replace every import specifier with the value chosen by `rename`, leaving the rest of the
/// statement (quote style, named-import clause, aliases) untouched.
pub fn rewrite_specifiers<'a>(
  source: &str,
  imports: &'a [ImportStatement],
  mut rename: impl FnMut(&'a ImportStatement) -> String,
) -> String {
  let mut rewritten = String::with_capacity(source.len());
  let mut cursor = 0;
  for statement in imports {
    rewritten.push_str(&source[cursor..statement.specifier_span.start]);
    rewritten.push_str(&rename(statement));
    cursor = statement.specifier_span.end;
  }
  rewritten.push_str(&source[cursor..]);
  rewritten
}

fn parse_import(
  source: &str,
  start: usize,
  keyword_end: usize,
) -> Result<ImportStatement, Range<usize>> {
  let bytes = source.as_bytes();
  let unsupported = || start..statement_end(bytes, keyword_end);
  let mut cursor = Cursor {
    bytes,
    position: keyword_end,
  };

  cursor.skip_inline_whitespace();
  let (clause, specifier_span) = if cursor.peek_quote() {
    (None, cursor.string().ok_or_else(unsupported)?)
  } else {
    let clause_start = cursor.position;
    match cursor.peek() {
      Some(b'{') => cursor.braces().ok_or_else(unsupported)?,
      Some(b'*') => {
        cursor.position += 1;
        cursor.skip_inline_whitespace();
        cursor.keyword("as").ok_or_else(unsupported)?;
        cursor.skip_inline_whitespace();
        cursor.identifier().ok_or_else(unsupported)?;
      }
      Some(byte) if is_ident_start(byte) => {
        cursor.identifier().ok_or_else(unsupported)?;
      }
      _ => return Err(unsupported()),
    }
    let clause_end = cursor.position;
    cursor.skip_inline_whitespace();
    cursor.keyword("from").ok_or_else(unsupported)?;
    cursor.skip_inline_whitespace();
    let span = cursor.string().ok_or_else(unsupported)?;
    (Some(source[clause_start..clause_end].to_string()), span)
  };

  cursor.skip_inline_whitespace();
  if cursor.keyword("as").is_some() {
    cursor.skip_inline_whitespace();
    cursor.identifier().ok_or_else(unsupported)?;
    cursor.skip_inline_whitespace();
  }
  if cursor.peek() != Some(b';') {
    return Err(unsupported());
  }

  Ok(ImportStatement {
    specifier: source[specifier_span.clone()].to_string(),
    clause,
    specifier_span,
    span: start..cursor.position + 1,
  })
}

struct Cursor<'a> {
  bytes: &'a [u8],
  position: usize,
}

impl Cursor<'_> {
  fn peek(&self) -> Option<u8> {
    self.bytes.get(self.position).copied()
  }

  fn peek_quote(&self) -> bool {
    matches!(self.peek(), Some(b'"' | b'\''))
  }

  fn skip_inline_whitespace(&mut self) {
    while matches!(self.peek(), Some(b' ' | b'\t')) {
      self.position += 1;
    }
  }

  fn identifier(&mut self) -> Option<Range<usize>> {
    let byte = self.peek()?;
    if !is_ident_start(byte) {
      return None;
    }
    let start = self.position;
    self.position = ident_end(self.bytes, start);
    Some(start..self.position)
  }

  fn keyword(&mut self, keyword: &str) -> Option<()> {
    let saved = self.position;
    let range = self.identifier()?;
    if &self.bytes[range] == keyword.as_bytes() {
      Some(())
    } else {
      self.position = saved;
      None
    }
  }

  /// Consumes a quoted literal on the current line, returning the span between the quotes.
  fn string(&mut self) -> Option<Range<usize>> {
    if !self.peek_quote() {
      return None;
    }
    let range = skip_string(self.bytes, self.position)?;
    if self.bytes[range.clone()].contains(&b'\n') {
      return None;
    }
    self.position = range.end + 1;
    Some(range)
  }

  fn braces(&mut self) -> Option<()> {
    while let Some(byte) = self.peek() {
      self.position += 1;
      match byte {
        b'}' => return Some(()),
        b'\n' => return None,
        _ => {}
      }
    }
    None
  }
}

fn is_ident_start(byte: u8) -> bool {
  byte.is_ascii_alphabetic() || byte == b'_' || byte == b'$'
}

fn ident_end(bytes: &[u8], start: usize) -> usize {
  let mut end = start;
  while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || matches!(bytes[end], b'_' | b'$'))
  {
    end += 1;
  }
  end
}

fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
  bytes[start..]
    .iter()
    .position(|&byte| byte == b'\n')
    .map_or(bytes.len(), |offset| start + offset + 1)
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
  bytes[start + 2..]
    .windows(2)
    .position(|window| window == b"*/")
    .map_or(bytes.len(), |offset| start + 2 + offset + 2)
}

/// Given the index of an opening quote, returns the span of the literal's contents.
fn skip_string(bytes: &[u8], start: usize) -> Option<Range<usize>> {
  let quote = *bytes.get(start)?;
  let mut index = start + 1;
  while index < bytes.len() {
    match bytes[index] {
      b'\\' => index += 2,
      byte if byte == quote => return Some(start + 1..index),
      _ => index += 1,
    }
  }
  None
}

fn statement_end(bytes: &[u8], from: usize) -> usize {
  bytes[from..]
    .iter()
    .position(|&byte| byte == b';')
    .map_or(bytes.len(), |offset| from + offset + 1)
}
