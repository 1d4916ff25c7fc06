//! Built-in output parsers selectable from configuration.
//!
//! The aggregator core ships no parsers; these live outside it and are
//! attached to checks by the configuration layer through [`ParserSpec`].
//!
//! | `kind`           | Tool output                          |
//! |------------------|--------------------------------------|
//! | `eslint-json`    | `eslint --format=json`               |
//! | `tsc`            | `tsc --noEmit` text diagnostics      |
//! | `jest-json`      | `jest --json`                        |
//! | `prettier-check` | `prettier --check`                   |
//! | `regex`          | any text, counted by user patterns   |

pub mod pattern;
pub mod typescript;

pub use pattern::RegexCountParser;
pub use typescript::{EslintJsonParser, JestJsonParser, PrettierCheckParser, TscParser};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::quality::OutputParser;

/// Parser selection as written in `zerogate.toml`, e.g.
/// `parser = { kind = "regex", error_pattern = "^ERROR" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ParserSpec {
    EslintJson,
    Tsc,
    JestJson,
    PrettierCheck,
    Regex {
        error_pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        warning_pattern: Option<String>,
    },
}

impl ParserSpec {
    /// Instantiate the parser.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid regex patterns.
    pub fn build(&self) -> Result<Arc<dyn OutputParser>> {
        let parser: Arc<dyn OutputParser> = match self {
            Self::EslintJson => Arc::new(EslintJsonParser),
            Self::Tsc => Arc::new(TscParser),
            Self::JestJson => Arc::new(JestJsonParser),
            Self::PrettierCheck => Arc::new(PrettierCheckParser),
            Self::Regex {
                error_pattern,
                warning_pattern,
            } => Arc::new(RegexCountParser::new(
                error_pattern,
                warning_pattern.as_deref(),
            )?),
        };
        Ok(parser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Holder {
        parser: ParserSpec,
    }

    #[test]
    fn test_parser_spec_from_toml() {
        let holder: Holder = toml::from_str(r#"parser = { kind = "eslint-json" }"#).unwrap();
        assert_eq!(holder.parser, ParserSpec::EslintJson);

        let holder: Holder =
            toml::from_str(r#"parser = { kind = "regex", error_pattern = "^E" }"#).unwrap();
        assert_eq!(
            holder.parser,
            ParserSpec::Regex {
                error_pattern: "^E".into(),
                warning_pattern: None
            }
        );
    }

    #[test]
    fn test_build_names() {
        let cases = [
            (ParserSpec::EslintJson, "eslint-json"),
            (ParserSpec::Tsc, "tsc"),
            (ParserSpec::JestJson, "jest-json"),
            (ParserSpec::PrettierCheck, "prettier-check"),
        ];
        for (spec, name) in cases {
            assert_eq!(spec.build().unwrap().name(), name);
        }
    }

    #[test]
    fn test_build_rejects_bad_regex() {
        let spec = ParserSpec::Regex {
            error_pattern: "[".into(),
            warning_pattern: None,
        };
        assert!(spec.build().is_err());
    }
}
