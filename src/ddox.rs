//! Reader and writer for the `symbols.js` index emitted by the DDOX
//! documentation generator.
//!
//! The generated file is line oriented: a header comment, `var symbols = [`,
//! one object literal per symbol, and a closing `];`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::SymbolError;
use crate::symbols::{SymbolEntry, SymbolKind, SymbolTable};

pub const HEADER_COMMENT: &str = "// symbol index generated by DDOX - do not edit";

/// A single- or double-quoted JS string literal, backslash escapes allowed.
const STRING_PATTERN: &str = r#"(?:'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*")"#;

static OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^var\s+symbols\s*=\s*\[$").expect("valid header pattern"));

static RECORD_RE: Lazy<Regex> = Lazy::new(|| {
    let s = STRING_PATTERN;
    Regex::new(&format!(
        concat!(
            r"^\{{\s*name:\s*(?P<name>{s})\s*,",
            r"\s*kind:\s*(?P<kind>{s})\s*,",
            r"\s*path:\s*(?P<path>{s})\s*,",
            r#"\s*attributes:\s*\[(?P<attrs>(?:{s}|[^\]'"])*)\]\s*\}}\s*,?$"#,
        ),
        s = s
    ))
    .expect("valid record pattern")
});

static ATTRIBUTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^\s*(?P<value>{})\s*(?:,|$)", STRING_PATTERN))
        .expect("valid attribute pattern")
});

static QUOTED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:'(?P<single>(?:[^'\\]|\\.)*)'|"(?P<double>(?:[^"\\]|\\.)*)")$"#)
        .expect("valid string pattern")
});

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Preamble,
    Records,
    Closed,
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn unquote(literal: &str) -> Option<String> {
    let caps = QUOTED_RE.captures(literal)?;
    caps.name("single")
        .or_else(|| caps.name("double"))
        .map(|m| unescape(m.as_str()))
}

/// Single-quoted JS literal for `value`, the quoting DDOX uses for names and paths.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn malformed(line: usize, content: &str) -> SymbolError {
    SymbolError::Malformed {
        line,
        content: content.to_string(),
    }
}

fn parse_attributes(raw: &str, line: usize, content: &str) -> Result<Vec<String>, SymbolError> {
    let mut attributes = Vec::new();
    let mut rest = raw.trim_start();
    while !rest.is_empty() {
        let caps = ATTRIBUTE_RE
            .captures(rest)
            .ok_or_else(|| malformed(line, content))?;
        let value = caps
            .name("value")
            .and_then(|m| unquote(m.as_str()))
            .ok_or_else(|| malformed(line, content))?;
        attributes.push(value);
        let consumed = caps.get(0).map_or(rest.len(), |m| m.end());
        rest = rest[consumed..].trim_start();
    }
    Ok(attributes)
}

fn parse_record(text: &str, line: usize) -> Result<SymbolEntry, SymbolError> {
    let caps = RECORD_RE
        .captures(text)
        .ok_or_else(|| malformed(line, text))?;
    let field = |key: &str| {
        caps.name(key)
            .and_then(|m| unquote(m.as_str()))
            .ok_or_else(|| malformed(line, text))
    };

    let kind_tag = field("kind")?;
    let kind = kind_tag
        .parse::<SymbolKind>()
        .map_err(|_| SymbolError::UnknownKind {
            kind: kind_tag.clone(),
            line,
        })?;
    let raw_attributes = caps.name("attrs").map_or("", |m| m.as_str());
    let attributes = parse_attributes(raw_attributes, line, text)?;

    Ok(SymbolEntry {
        name: field("name")?,
        kind,
        path: field("path")?,
        attributes,
    })
}

/// Parse the text of a `symbols.js` file into its entries, in file order.
pub fn parse(source: &str) -> Result<Vec<SymbolEntry>, SymbolError> {
    let mut state = State::Preamble;
    let mut entries = Vec::new();
    let mut last_line = 0;

    for (idx, raw) in source.lines().enumerate() {
        let line = idx + 1;
        last_line = line;
        let text = raw.trim();
        if text.is_empty() || text.starts_with("//") {
            continue;
        }
        match state {
            State::Preamble if OPEN_RE.is_match(text) => state = State::Records,
            State::Records if text == "];" || text == "]" => state = State::Closed,
            State::Records => entries.push(parse_record(text, line)?),
            State::Preamble | State::Closed => return Err(malformed(line, text)),
        }
    }

    match state {
        State::Closed => Ok(entries),
        State::Preamble => Err(malformed(last_line, "missing `var symbols = [`")),
        State::Records => Err(malformed(last_line, "missing closing `];`")),
    }
}

/// Read and parse a `symbols.js` file into a table.
pub fn load_file(path: impl AsRef<Path>) -> Result<SymbolTable, SymbolError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| SymbolError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&source).map(SymbolTable::from_entries)
}

/// Render entries in the exact layout DDOX generates.
pub fn render<'a>(entries: impl IntoIterator<Item = &'a SymbolEntry>) -> String {
    let mut out = String::new();
    out.push_str(HEADER_COMMENT);
    out.push('\n');
    out.push_str("var symbols = [\n");
    for entry in entries {
        let attributes = entry
            .attributes
            .iter()
            .map(|a| quote(a))
            .collect::<Vec<_>>()
            .join(", ");
        // writing into a String cannot fail
        let _ = writeln!(
            out,
            "{{name: {}, kind: \"{}\", path: {}, attributes: [{}]}},",
            quote(&entry.name),
            entry.kind,
            quote(&entry.path),
            attributes
        );
    }
    out.push_str("];");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERATED: &str = include_str!("../docs/v0.1.0/symbols.js");

    #[test]
    fn render_builtin_matches_generated_file() {
        assert_eq!(render(SymbolTable::builtin()), GENERATED);
    }

    #[test]
    fn parse_generated_file_matches_builtin() {
        let parsed = parse(GENERATED).unwrap();
        assert_eq!(parsed.as_slice(), SymbolTable::builtin().entries());
    }

    #[test]
    fn parse_accepts_quotes_and_attributes() {
        let src = concat!(
            "var symbols = [\n",
            "{name: \"a.b\", kind: 'enumdeclaration', path: \"./a/b.html\", ",
            "attributes: ['deprecated', \"public\"]}\n",
            "];\n",
        );
        let entries = parse(src).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a.b");
        assert_eq!(entries[0].kind, SymbolKind::EnumDeclaration);
        assert_eq!(entries[0].attributes, vec!["deprecated", "public"]);
    }

    #[test]
    fn attributes_may_hold_commas_and_brackets() {
        let src = concat!(
            "var symbols = [\n",
            "{name: 'a', kind: \"module\", path: './a.html', ",
            "attributes: ['since 1, 2', \"a]b\", 'x\\'y',]},\n",
            "];",
        );
        let entries = parse(src).unwrap();
        assert_eq!(entries[0].attributes, vec!["since 1, 2", "a]b", "x'y"]);
    }

    #[test]
    fn stray_text_in_attributes_is_malformed() {
        let src = concat!(
            "var symbols = [\n",
            "{name: 'a', kind: \"module\", path: './a.html', attributes: ['a' 'b']},\n",
            "];",
        );
        assert!(matches!(parse(src), Err(SymbolError::Malformed { line: 2, .. })));
    }

    #[test]
    fn render_escapes_quotes_and_backslashes() {
        let entry = SymbolEntry {
            name: "quill.it's".into(),
            kind: SymbolKind::FunctionDeclaration,
            path: "./quill\\it's.html".into(),
            attributes: vec!["it's".into(), "a, b]".into()],
        };
        let text = render([&entry]);
        assert!(text.contains("name: 'quill.it\\'s'"));
        assert_eq!(parse(&text).unwrap(), vec![entry]);
    }

    #[test]
    fn render_then_parse_keeps_attributes() {
        let entry = SymbolEntry {
            name: "x.y".into(),
            kind: SymbolKind::ClassDeclaration,
            path: "./x/y.html".into(),
            attributes: vec!["deprecated".into()],
        };
        let text = render([&entry]);
        assert!(text.contains("attributes: ['deprecated']"));
        assert_eq!(parse(&text).unwrap(), vec![entry]);
    }

    #[test]
    fn malformed_record_reports_line() {
        let src = concat!(
            "// c\nvar symbols = [\n",
            "{name: 'a', kind: \"module\", path: './a.html', attributes: []},\n",
            "{name: 'b'},\n",
            "];",
        );
        match parse(src) {
            Err(SymbolError::Malformed { line, content }) => {
                assert_eq!(line, 4);
                assert_eq!(content, "{name: 'b'},");
            }
            other => panic!("expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn unknown_kind_reports_line() {
        let src = concat!(
            "var symbols = [\n",
            "{name: 'a', kind: \"interfacedeclaration\", path: './a.html', attributes: []},\n",
            "];",
        );
        match parse(src) {
            Err(SymbolError::UnknownKind { kind, line }) => {
                assert_eq!(kind, "interfacedeclaration");
                assert_eq!(line, 2);
            }
            other => panic!("expected UnknownKind, got {:?}", other),
        }
    }

    #[test]
    fn missing_header_or_terminator_is_malformed() {
        assert!(matches!(parse("// only a comment\n"), Err(SymbolError::Malformed { .. })));
        let unterminated = concat!(
            "var symbols = [\n",
            "{name: 'a', kind: \"module\", path: './a.html', attributes: []},",
        );
        assert!(matches!(parse(unterminated), Err(SymbolError::Malformed { .. })));
        assert!(matches!(
            parse("var symbols = [\n];\nalert(1);"),
            Err(SymbolError::Malformed { line: 3, .. })
        ));
    }

    #[test]
    fn empty_index_parses() {
        assert!(parse("var symbols = [\n];").unwrap().is_empty());
    }

    #[test]
    fn load_file_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("symbols.js");
        assert!(matches!(load_file(&missing), Err(SymbolError::Io { .. })));

        std::fs::write(&missing, GENERATED).unwrap();
        let table = load_file(&missing).unwrap();
        assert_eq!(table.len(), SymbolTable::builtin().len());
    }
}
