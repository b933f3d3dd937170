//! Externalized test properties
//!
//! Two property sets live next to the suite: `public.properties` (checked in,
//! environment-agnostic values such as the base URL and sample data) and
//! `private.properties` (local overrides, never committed). Each set is read
//! lazily on first lookup and memoised for the lifetime of the [`Properties`]
//! value that owns it.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};

/// Which property file a lookup reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertySet {
    Public,
    Private,
}

impl PropertySet {
    pub fn file_name(&self) -> &'static str {
        match self {
            PropertySet::Public => "public.properties",
            PropertySet::Private => "private.properties",
        }
    }
}

impl fmt::Display for PropertySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertySet::Public => f.write_str("public"),
            PropertySet::Private => f.write_str("private"),
        }
    }
}

/// Every key the suite knows how to look up.
///
/// Lookups only accept this enum, so a typo in a key is a compile error
/// rather than a silently absent value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyName {
    BaseUrl,
    SampleTodoOne,
    SampleTodoTwo,
    SampleTodoThree,
}

impl PropertyName {
    pub fn key(&self) -> &'static str {
        match self {
            PropertyName::BaseUrl => "BASE_URL",
            PropertyName::SampleTodoOne => "SAMPLE_TODO_ONE",
            PropertyName::SampleTodoTwo => "SAMPLE_TODO_TWO",
            PropertyName::SampleTodoThree => "SAMPLE_TODO_THREE",
        }
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Lazily loaded public and private property sets rooted at one directory
#[derive(Debug)]
pub struct Properties {
    dir: PathBuf,
    public: OnceCell<HashMap<String, String>>,
    private: OnceCell<HashMap<String, String>>,
}

impl Properties {
    /// Properties read from `dir`. Nothing touches the filesystem until the
    /// first lookup.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            public: OnceCell::new(),
            private: OnceCell::new(),
        }
    }

    /// Look up `name` in `set`.
    ///
    /// A set whose file cannot be read is logged once and then behaves as
    /// empty, so every lookup in it is `None`.
    pub fn get(&self, set: PropertySet, name: PropertyName) -> Option<&str> {
        self.loaded(set).get(name.key()).map(String::as_str)
    }

    /// Like [`Properties::get`], but absence is an error.
    pub fn require(&self, set: PropertySet, name: PropertyName) -> E2eResult<&str> {
        self.get(set, name).ok_or_else(|| E2eError::MissingProperty {
            set: set.to_string(),
            name: name.to_string(),
        })
    }

    pub fn public(&self, name: PropertyName) -> Option<&str> {
        self.get(PropertySet::Public, name)
    }

    pub fn private(&self, name: PropertyName) -> Option<&str> {
        self.get(PropertySet::Private, name)
    }

    fn loaded(&self, set: PropertySet) -> &HashMap<String, String> {
        let cell = match set {
            PropertySet::Public => &self.public,
            PropertySet::Private => &self.private,
        };
        cell.get_or_init(|| {
            let path = self.dir.join(set.file_name());
            match load_file(&path) {
                Ok(map) => {
                    debug!("Loaded {} {} properties from {}", map.len(), set, path.display());
                    map
                }
                Err(e) => {
                    warn!("{}", e);
                    HashMap::new()
                }
            }
        })
    }
}

fn load_file(path: &Path) -> E2eResult<HashMap<String, String>> {
    let content = std::fs::read_to_string(path).map_err(|e| E2eError::PropertiesLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse(&content).map_err(|e| E2eError::PropertiesLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Parse properties-file text.
///
/// Supports `key=value`, `key: value` and `key value` forms, `#` and `!`
/// comments, backslash line continuations and the usual escapes, including
/// `\uXXXX` (surrogate pairs combine). Later keys overwrite earlier ones.
/// A malformed escape fails the whole file.
pub fn parse(content: &str) -> E2eResult<HashMap<String, String>> {
    let mut map = HashMap::new();
    let mut lines = content.lines().enumerate();

    while let Some((index, line)) = lines.next() {
        let mut logical = line.trim_start().to_string();
        if logical.is_empty() || logical.starts_with('#') || logical.starts_with('!') {
            continue;
        }

        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        let syntax = |reason| E2eError::PropertiesSyntax {
            line: index + 1,
            reason,
        };
        map.insert(unescape(key).map_err(syntax)?, unescape(value).map_err(syntax)?);
    }

    Ok(map)
}

/// An odd number of trailing backslashes continues the line
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..i], line[i + 1..].trim_start()),
            c if c.is_whitespace() => {
                let rest = line[i..].trim_start();
                let rest = rest
                    .strip_prefix('=')
                    .or_else(|| rest.strip_prefix(':'))
                    .unwrap_or(rest);
                return (&line[..i], rest.trim_start());
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    // UTF-16 code units from consecutive \u escapes, decoded together
    let mut units: Vec<u16> = Vec::new();
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.as_str().starts_with('u') {
            chars.next();
            let hex: String = chars.by_ref().take(4).collect();
            if hex.len() != 4 || !hex.chars().all(|h| h.is_ascii_hexdigit()) {
                return Err(format!("malformed \\u escape '\\u{}'", hex));
            }
            let unit = u16::from_str_radix(&hex, 16).map_err(|e| e.to_string())?;
            units.push(unit);
            continue;
        }

        flush_units(&mut units, &mut out)?;
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some(other) => out.push(other),
            None => {}
        }
    }

    flush_units(&mut units, &mut out)?;
    Ok(out)
}

fn flush_units(units: &mut Vec<u16>, out: &mut String) -> Result<(), String> {
    for decoded in char::decode_utf16(units.drain(..)) {
        let c = decoded
            .map_err(|e| format!("unpaired surrogate \\u{:04X}", e.unpaired_surrogate()))?;
        out.push(c);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("BASE_URL=http://todo.test/", "BASE_URL", "http://todo.test/" ; "equals")]
    #[test_case("BASE_URL: http://todo.test/", "BASE_URL", "http://todo.test/" ; "colon")]
    #[test_case("BASE_URL http://todo.test/", "BASE_URL", "http://todo.test/" ; "whitespace")]
    #[test_case("BASE_URL = http://todo.test/", "BASE_URL", "http://todo.test/" ; "padded equals")]
    #[test_case("  SAMPLE_TODO_ONE=Buy milk", "SAMPLE_TODO_ONE", "Buy milk" ; "indented key")]
    #[test_case("KEY\\=WITH\\:SEPS=v", "KEY=WITH:SEPS", "v" ; "escaped separators")]
    #[test_case("TABBED=a\\tb", "TABBED", "a\tb" ; "tab escape")]
    #[test_case("EMPTY=", "EMPTY", "" ; "empty value")]
    #[test_case("BARE", "BARE", "" ; "bare key")]
    #[test_case("CAFE=caf\\u00e9", "CAFE", "caf\u{e9}" ; "unicode escape")]
    #[test_case("CAFE=caf\\u00E9s", "CAFE", "caf\u{e9}s" ; "unicode escape upper hex")]
    #[test_case("SMILE=\\uD83D\\uDE00!", "SMILE", "\u{1F600}!" ; "surrogate pair")]
    #[test_case("\\u0041KEY=v", "AKEY", "v" ; "unicode escape in key")]
    #[test_case("LITERAL=\\\\u0041", "LITERAL", "\\u0041" ; "escaped backslash before u")]
    fn test_parse_single_entry(input: &str, key: &str, value: &str) {
        let map = parse(input).unwrap();
        assert_eq!(map.get(key).map(String::as_str), Some(value));
    }

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let map = parse("# comment\n! also a comment\n\n   \nA=1\n").unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["A"], "1");
    }

    #[test]
    fn test_parse_line_continuation() {
        let map = parse("LIST=one, \\\n    two, \\\n    three\nNEXT=x").unwrap();
        assert_eq!(map["LIST"], "one, two, three");
        assert_eq!(map["NEXT"], "x");
    }

    #[test]
    fn test_escaped_backslash_is_not_continuation() {
        let map = parse("PATH=C:\\\\\nNEXT=x").unwrap();
        assert_eq!(map["PATH"], "C:\\");
        assert_eq!(map["NEXT"], "x");
    }

    #[test]
    fn test_later_duplicate_wins() {
        let map = parse("A=1\nA=2").unwrap();
        assert_eq!(map["A"], "2");
    }

    #[test_case("BAD=\\u00zz" ; "non hex digits")]
    #[test_case("BAD=\\u12" ; "truncated")]
    #[test_case("BAD=\\uD83D" ; "unpaired high surrogate")]
    #[test_case("BAD=\\uDE00x" ; "lone low surrogate")]
    fn test_malformed_unicode_escape_rejected(input: &str) {
        let content = format!("GOOD=1\n{}\n", input);
        assert!(matches!(
            parse(&content),
            Err(E2eError::PropertiesSyntax { line: 2, .. })
        ));
    }

    #[test]
    fn test_malformed_file_degrades_to_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("public.properties"),
            "BASE_URL=http://todo.test/\nSAMPLE_TODO_ONE=caf\\u00zz\n",
        )
        .unwrap();

        let props = Properties::new(dir.path());
        assert_eq!(props.public(PropertyName::BaseUrl), None);
        assert_eq!(props.public(PropertyName::SampleTodoOne), None);
    }

    #[test]
    fn test_lookup_reads_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("public.properties");
        std::fs::write(&path, "SAMPLE_TODO_ONE=Buy milk\n").unwrap();

        let props = Properties::new(dir.path());
        assert_eq!(props.public(PropertyName::SampleTodoOne), Some("Buy milk"));

        // Memoised: rewriting the file is not observed
        std::fs::write(&path, "SAMPLE_TODO_ONE=Walk dog\n").unwrap();
        assert_eq!(props.public(PropertyName::SampleTodoOne), Some("Buy milk"));
    }

    #[test]
    fn test_missing_file_degrades_to_absent() {
        let dir = tempfile::tempdir().unwrap();
        let props = Properties::new(dir.path());

        assert_eq!(props.private(PropertyName::BaseUrl), None);
        assert!(matches!(
            props.require(PropertySet::Private, PropertyName::BaseUrl),
            Err(E2eError::MissingProperty { .. })
        ));
    }

    #[test]
    fn test_sets_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("public.properties"), "BASE_URL=http://public/").unwrap();
        std::fs::write(dir.path().join("private.properties"), "BASE_URL=http://private/").unwrap();

        let props = Properties::new(dir.path());
        assert_eq!(props.public(PropertyName::BaseUrl), Some("http://public/"));
        assert_eq!(props.private(PropertyName::BaseUrl), Some("http://private/"));
    }

    #[test]
    fn test_property_keys() {
        assert_eq!(PropertyName::BaseUrl.to_string(), "BASE_URL");
        assert_eq!(PropertyName::SampleTodoThree.key(), "SAMPLE_TODO_THREE");
        assert_eq!(PropertySet::Private.file_name(), "private.properties");
    }
}
