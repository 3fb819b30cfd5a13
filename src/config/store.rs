//! INI-style filter configuration
//!
//! Parses the PreviewHTML-compatible filter file into typed sections and
//! builds the language and extension lookup tables. Values are kept raw:
//! there is no `%` interpolation, so command templates pass through untouched.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::constants::{config::DEFAULT_SECTION, keys};
use crate::error::{ConfigError, ParseError};

/// One `[Name]` block of the config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    /// Lowercased key → raw value, in file order
    entries: Vec<(String, String)>,
    /// Line of the `[Name]` header, for diagnostics
    line: usize,
}

impl Section {
    fn new(name: &str, line: usize) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
            line,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-insensitive key lookup
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn command(&self) -> Option<&str> {
        self.get(keys::COMMAND)
    }

    /// Later assignments of the same key replace the earlier value in place
    fn set(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    fn append_continuation(&mut self, key: &str, text: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            entry.1.push('\n');
            entry.1.push_str(text);
        }
    }

    fn inherit(&mut self, defaults: &Section) {
        for (key, value) in &defaults.entries {
            if self.get(key).is_none() {
                self.entries.push((key.clone(), value.clone()));
            }
        }
    }

    fn require(&self, key: &str) -> Result<&str, ParseError> {
        self.get(key).ok_or_else(|| {
            ParseError::new(
                self.line,
                format!("section [{}] is missing the `{key}` option", self.name),
            )
        })
    }
}

/// Parsed config with its lookup tables.
///
/// Every name stored in the indexes refers to an entry of `sections`.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    sections: Vec<Section>,
    language_index: HashMap<String, String>,
    extension_index: HashMap<String, String>,
}

/// Where parsed `key=value` lines are currently going
enum Target {
    Nothing,
    Defaults,
    Section(usize),
}

impl Configuration {
    /// Read and parse a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&contents).map_err(|e| ConfigError::Malformed {
            path: path.to_path_buf(),
            line: e.line,
            message: e.message,
        })?;
        debug!(
            path = %path.display(),
            sections = config.sections.len(),
            languages = ?config.language_index,
            extensions = ?config.extension_index,
            "Loaded filter config"
        );
        Ok(config)
    }

    /// Parse config text
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut sections: Vec<Section> = Vec::new();
        let mut defaults = Section::new(DEFAULT_SECTION, 0);
        let mut target = Target::Nothing;
        let mut last_key: Option<String> = None;

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() || raw.starts_with(';') || raw.starts_with('#') {
                continue;
            }

            // Indented line continues the previous value
            if raw.starts_with(char::is_whitespace)
                && let Some(key) = last_key.as_deref()
            {
                let text = strip_inline_comment(trimmed);
                if !text.is_empty() && !text.starts_with([';', '#']) {
                    match target {
                        Target::Defaults => defaults.append_continuation(key, text),
                        Target::Section(i) => sections[i].append_continuation(key, text),
                        Target::Nothing => {}
                    }
                }
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix('[') {
                let Some(end) = rest.find(']') else {
                    return Err(ParseError::new(line, "section header is missing `]`"));
                };
                let name = rest[..end].trim();
                if name.is_empty() {
                    return Err(ParseError::new(line, "empty section name"));
                }
                last_key = None;
                if name == DEFAULT_SECTION {
                    target = Target::Defaults;
                    continue;
                }
                if sections.iter().any(|s| s.name == name) {
                    return Err(ParseError::new(line, format!("duplicate section [{name}]")));
                }
                sections.push(Section::new(name, line));
                target = Target::Section(sections.len() - 1);
                continue;
            }

            let Some((key, value)) = split_option(trimmed) else {
                return Err(ParseError::new(
                    line,
                    format!("expected `key=value`, found `{trimmed}`"),
                ));
            };
            let key = key.trim().to_ascii_lowercase();
            if key.is_empty() {
                return Err(ParseError::new(line, "option with an empty name"));
            }
            let mut value = strip_inline_comment(value.trim()).to_string();
            if value == "\"\"" {
                value.clear();
            }

            match target {
                Target::Nothing => {
                    return Err(ParseError::new(
                        line,
                        format!("option `{key}` appears before any [section] header"),
                    ));
                }
                Target::Defaults => defaults.set(key.clone(), value),
                Target::Section(i) => sections[i].set(key.clone(), value),
            }
            last_key = Some(key);
        }

        for section in &mut sections {
            section.inherit(&defaults);
        }
        Self::from_sections(sections)
    }

    /// Build the lookup tables; sections are walked in file order so later ones win
    fn from_sections(sections: Vec<Section>) -> Result<Self, ParseError> {
        let mut language_index = HashMap::new();
        let mut extension_index = HashMap::new();

        for section in &sections {
            let language = section.require(keys::LANGUAGE)?;
            language_index.insert(language.to_string(), section.name.clone());

            let extensions = section.require(keys::EXTENSION)?;
            for ext in extensions.split_whitespace() {
                extension_index.insert(ext.to_string(), section.name.clone());
            }
        }

        Ok(Self {
            sections,
            language_index,
            extension_index,
        })
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    pub fn section_for_language(&self, language: &str) -> Option<&str> {
        self.language_index.get(language).map(String::as_str)
    }

    pub fn section_for_extension(&self, extension: &str) -> Option<&str> {
        self.extension_index.get(extension).map(String::as_str)
    }
}

/// Split `key=value` or `key: value` at whichever delimiter comes first
fn split_option(line: &str) -> Option<(&str, &str)> {
    let pos = line.find(['=', ':'])?;
    Some((&line[..pos], &line[pos + 1..]))
}

/// Drop a trailing `; comment`. Only the first `;` is considered, and only
/// when whitespace precedes it; a later `;` is part of the value.
fn strip_inline_comment(value: &str) -> &str {
    match value.find(';') {
        Some(pos) if value[..pos].ends_with(char::is_whitespace) => value[..pos].trim_end(),
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"; filter config
[Markdown]
Extension=.md .markdown
Language=Markdown
Command="pandoc" -f markdown "%1"

[Text]
Extension=.txt
Language=Normal text
Command=cat "%1"
"#;

    #[test]
    fn test_parse_sections_in_file_order() {
        let config = Configuration::parse(SAMPLE).unwrap();
        let names: Vec<_> = config.sections().map(Section::name).collect();
        assert_eq!(names, vec!["Markdown", "Text"]);
    }

    #[test]
    fn test_indexes_cover_every_extension_token() {
        let config = Configuration::parse(SAMPLE).unwrap();
        assert_eq!(config.section_for_extension(".md"), Some("Markdown"));
        assert_eq!(config.section_for_extension(".markdown"), Some("Markdown"));
        assert_eq!(config.section_for_extension(".txt"), Some("Text"));
        assert_eq!(config.section_for_language("Normal text"), Some("Text"));
        assert_eq!(config.section_for_extension(".rs"), None);
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let config = Configuration::parse(SAMPLE).unwrap();
        let section = config.section("Markdown").unwrap();
        assert_eq!(section.get("COMMAND"), section.get("command"));
        assert!(section.command().is_some());
    }

    #[test]
    fn test_percent_signs_pass_through_unchanged() {
        let text = "[A]\nExtension=.a\nLanguage=A\nCommand=fmt --width=100% --title \"%(name)s\" \"%1\" %%\n";
        let config = Configuration::parse(text).unwrap();
        assert_eq!(
            config.section("A").unwrap().command(),
            Some("fmt --width=100% --title \"%(name)s\" \"%1\" %%")
        );
    }

    #[test]
    fn test_last_section_wins_on_collision() {
        let text = "[First]\nExtension=.x .y\nLanguage=Same\n\n[Second]\nExtension=.y\nLanguage=Same\n";
        let config = Configuration::parse(text).unwrap();
        assert_eq!(config.section_for_language("Same"), Some("Second"));
        assert_eq!(config.section_for_extension(".y"), Some("Second"));
        assert_eq!(config.section_for_extension(".x"), Some("First"));
    }

    #[test]
    fn test_missing_language_is_malformed() {
        let text = "[A]\nExtension=.a\n";
        let err = Configuration::parse(text).unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("language"));
    }

    #[test]
    fn test_missing_extension_is_malformed() {
        let text = "[A]\nLanguage=A\n";
        let err = Configuration::parse(text).unwrap_err();
        assert!(err.message.contains("extension"));
    }

    #[test]
    fn test_missing_command_is_allowed() {
        let text = "[A]\nExtension=.a\nLanguage=A\n";
        let config = Configuration::parse(text).unwrap();
        assert_eq!(config.section("A").unwrap().command(), None);
    }

    #[test]
    fn test_inline_comments_are_stripped() {
        let text = "[IniFile]     ; section comment\nExtension=.ini .cfg    ;   => extensions\nLanguage=INI ; name\nCommand=a;b \"%1\"\n";
        let config = Configuration::parse(text).unwrap();
        let section = config.section("IniFile").unwrap();
        assert_eq!(section.get("extension"), Some(".ini .cfg"));
        assert_eq!(section.get("language"), Some("INI"));
        // no whitespace before `;`, so it stays
        assert_eq!(section.command(), Some("a;b \"%1\""));
    }

    #[test]
    fn test_only_first_semicolon_can_start_a_comment() {
        let text = "[A]\nExtension=.a\nLanguage=A\nCommand=a;b \"%1\" ;note\n";
        let config = Configuration::parse(text).unwrap();
        assert_eq!(config.section("A").unwrap().command(), Some("a;b \"%1\" ;note"));
    }

    #[test]
    fn test_colon_delimiter_and_continuation_lines() {
        let text = "[A]\nExtension: .a\n  .b\nLanguage: A\n";
        let config = Configuration::parse(text).unwrap();
        assert_eq!(config.section("A").unwrap().get("extension"), Some(".a\n.b"));
        assert_eq!(config.section_for_extension(".b"), Some("A"));
    }

    #[test]
    fn test_default_section_is_inherited() {
        let text = "[DEFAULT]\nCommand=cat \"%1\"\n\n[A]\nExtension=.a\nLanguage=A\n\n[B]\nExtension=.b\nLanguage=B\nCommand=other\n";
        let config = Configuration::parse(text).unwrap();
        assert!(config.section("DEFAULT").is_none());
        assert_eq!(config.section("A").unwrap().command(), Some("cat \"%1\""));
        assert_eq!(config.section("B").unwrap().command(), Some("other"));
    }

    #[test]
    fn test_option_before_section_is_rejected() {
        let err = Configuration::parse("Language=A\n[A]\n").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_duplicate_section_is_rejected() {
        let text = "[A]\nExtension=.a\nLanguage=A\n[A]\nExtension=.b\nLanguage=B\n";
        let err = Configuration::parse(text).unwrap_err();
        assert_eq!(err.line, 4);
    }

    #[test]
    fn test_line_without_delimiter_is_rejected() {
        let err = Configuration::parse("[A]\njust some words\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_empty_quotes_become_empty_value() {
        let text = "[A]\nExtension=.a\nLanguage=A\nCommand=\"\"\n";
        let config = Configuration::parse(text).unwrap();
        assert_eq!(config.section("A").unwrap().command(), Some(""));
    }

    #[test]
    fn test_load_reports_path_and_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ini");
        fs::write(&path, "[A]\nExtension=.a\n").unwrap();

        match Configuration::load(&path) {
            Err(ConfigError::Malformed { path: p, line, .. }) => {
                assert_eq!(p, path);
                assert_eq!(line, 1);
            }
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_load_missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let result = Configuration::load(&dir.path().join("nope.ini"));
        assert!(matches!(result, Err(ConfigError::Unreadable { .. })));
    }
}
