//! Section selection for the active document
//!
//! Priority: exact language match > filename extension > no match.
//! A no-match result carries a message telling the user which
//! `Language=`/`Extension=` lines would have matched.

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::config::Configuration;
use crate::constants::{filter::EXAMPLE_FILTER, host::UDL_PREFIX, host::UDL_SEPARATOR};
use crate::error::SectionMissingCommand;

/// How a section was picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Language,
    Extension,
}

impl MatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Language => "language",
            Self::Extension => "extension",
        }
    }
}

/// Outcome of looking up the section for a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolvedSection {
    Found {
        section: String,
        matched_by: MatchKind,
    },
    NoMatch {
        language: String,
        extension: String,
        diagnostic: String,
    },
}

impl ResolvedSection {
    pub fn section(&self) -> Option<&str> {
        match self {
            Self::Found { section, .. } => Some(section),
            Self::NoMatch { .. } => None,
        }
    }
}

/// User-defined languages are reported as `"udf - Name"`; return `Name`
pub fn unwrap_user_language(language: &str) -> &str {
    match language.split_once(UDL_SEPARATOR) {
        Some((prefix, name)) if prefix.trim() == UDL_PREFIX => name,
        _ => language,
    }
}

/// Final `.ext` segment of the file name, dot included; empty when there is none
pub fn file_extension(filename: &Path) -> String {
    filename
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Pick the config section for a document
pub fn resolve(config: &Configuration, language: Option<&str>, filename: &Path) -> ResolvedSection {
    let language = language.map(unwrap_user_language).unwrap_or_default();
    debug!(file = %filename.display(), language = %language, "Resolving filter section");

    // An empty language name never selects a section, even if one declares `Language=`
    if !language.is_empty()
        && let Some(section) = config.section_for_language(language)
    {
        return ResolvedSection::Found {
            section: section.to_string(),
            matched_by: MatchKind::Language,
        };
    }

    let extension = file_extension(filename);
    debug!(extension = %extension, "No language match, trying extension");
    if let Some(section) = config.section_for_extension(&extension) {
        return ResolvedSection::Found {
            section: section.to_string(),
            matched_by: MatchKind::Extension,
        };
    }

    let diagnostic = format!(
        "Could not find an appropriate configuration section for\n\n\
         \"{}\"\n\n\
         in the filtered-viewer configuration file.\n\n\
         Need a [SECTION] that contains at least one of\n    \
         Language={language}\n    \
         Extension={extension}\n    \
         Command={EXAMPLE_FILTER} \"%1\"\n",
        filename.display()
    );
    ResolvedSection::NoMatch {
        language: language.to_string(),
        extension,
        diagnostic,
    }
}

/// Command template of a resolved section, or an explanation of what is missing
pub fn ensure_command<'a>(
    config: &'a Configuration,
    section_name: &str,
) -> Result<&'a str, SectionMissingCommand> {
    let section = config.section(section_name);
    if let Some(command) = section.and_then(|s| s.command()) {
        return Ok(command);
    }

    let mut diagnostic = String::from(
        "Please ensure that your filtered-viewer config file contains the Command option: \
         it should look like\n\n",
    );
    diagnostic.push_str(&format!("    [{section_name}]\n"));
    for (key, value) in section.into_iter().flat_map(|s| s.entries()) {
        diagnostic.push_str(&format!("    {}={value}\n", capitalize(key)));
    }
    diagnostic.push_str(&format!("    Command={EXAMPLE_FILTER} \"%1\"\n"));

    Err(SectionMissingCommand {
        section: section_name.to_string(),
        diagnostic,
    })
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Configuration {
        Configuration::parse(
            "[A]\nExtension=.foo\nLanguage=Foo\nCommand=\"echo\" \"%1\"\n\n\
             [B]\nExtension=.bar .baz\nLanguage=Bar\nCommand=cat \"%1\"\n\n\
             [NoCmd]\nExtension=.nc\nLanguage=NoCmd\n",
        )
        .unwrap()
    }

    #[test]
    fn test_language_beats_extension() {
        let resolved = resolve(&config(), Some("Bar"), Path::new("/tmp/test.foo"));
        assert_eq!(
            resolved,
            ResolvedSection::Found {
                section: "B".to_string(),
                matched_by: MatchKind::Language,
            }
        );
    }

    #[test]
    fn test_every_language_resolves_to_its_section() {
        let config = config();
        for section in config.sections() {
            let language = section.get("language").unwrap();
            let resolved = resolve(&config, Some(language), Path::new("whatever.unknown"));
            assert_eq!(resolved.section(), Some(section.name()));
        }
    }

    #[test]
    fn test_unknown_language_falls_back_to_extension() {
        let resolved = resolve(&config(), Some("Bar2"), Path::new("test.foo"));
        assert_eq!(resolved.section(), Some("A"));

        let resolved = resolve(&config(), Some("Baz"), Path::new("dir/notes.baz"));
        assert_eq!(
            resolved,
            ResolvedSection::Found {
                section: "B".to_string(),
                matched_by: MatchKind::Extension,
            }
        );
    }

    #[test]
    fn test_no_language_uses_extension() {
        let resolved = resolve(&config(), None, Path::new("test.foo"));
        assert_eq!(resolved.section(), Some("A"));
    }

    #[test]
    fn test_no_match_diagnostic_names_language_and_extension() {
        let resolved = resolve(&config(), Some("Baz"), Path::new("/work/file.xyz"));
        let ResolvedSection::NoMatch {
            language,
            extension,
            diagnostic,
        } = resolved
        else {
            panic!("expected NoMatch");
        };
        assert_eq!(language, "Baz");
        assert_eq!(extension, ".xyz");
        assert!(diagnostic.contains("Language=Baz"));
        assert!(diagnostic.contains("Extension=.xyz"));
        assert!(diagnostic.contains("\"%1\""));
    }

    #[test]
    fn test_user_defined_language_is_unwrapped() {
        assert_eq!(unwrap_user_language("udf - Foo"), "Foo");
        assert_eq!(unwrap_user_language("udf - Foo - Bar"), "Foo - Bar");
        assert_eq!(unwrap_user_language("Markdown"), "Markdown");
        assert_eq!(unwrap_user_language("C - like"), "C - like");

        let resolved = resolve(&config(), Some("udf - Foo"), Path::new("x.unknown"));
        assert_eq!(resolved.section(), Some("A"));
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension(Path::new("a/b/c.tar.gz")), ".gz");
        assert_eq!(file_extension(Path::new("Makefile")), "");
        assert_eq!(file_extension(Path::new(".bashrc")), "");
    }

    #[test]
    fn test_extensionless_file_with_no_match() {
        let resolved = resolve(&config(), Some("Makefile"), Path::new("Makefile"));
        assert!(matches!(resolved, ResolvedSection::NoMatch { ref extension, .. } if extension.is_empty()));
    }

    #[test]
    fn test_ensure_command_found() {
        let config = config();
        assert_eq!(ensure_command(&config, "B"), Ok("cat \"%1\""));
    }

    #[test]
    fn test_ensure_command_missing_lists_current_keys() {
        let err = ensure_command(&config(), "NoCmd").unwrap_err();
        assert_eq!(err.section, "NoCmd");
        assert!(err.diagnostic.contains("[NoCmd]"));
        assert!(err.diagnostic.contains("Extension=.nc"));
        assert!(err.diagnostic.contains("Language=NoCmd"));
        assert!(err.diagnostic.contains("Command="));
    }
}
