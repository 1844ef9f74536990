//! Output formats for the master's tracing subscriber.
//!
//! The format is chosen once at bootstrap from `log_format` (or
//! `KEEL_LOG_FORMAT`) and cannot change while the master runs.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How master log lines are rendered on stderr.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One flattened JSON object per event, for log shippers.
    #[default]
    Json,
    /// Single-line text for operators watching a terminal.
    #[serde(alias = "text")]
    #[strum(to_string = "compact", serialize = "text")]
    Compact,
}

impl LogFormat {
    /// Whether ANSI colour may be used when stderr is a terminal.
    ///
    /// JSON lines never carry escape codes.
    #[must_use]
    pub const fn uses_colour(self, terminal: bool) -> bool {
        matches!(self, Self::Compact) && terminal
    }
}

/// Returned when `log_format` names neither `json` nor `compact`.
pub type LogFormatParseError = strum::ParseError;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("text", LogFormat::Compact)]
    #[case("Text", LogFormat::Compact)]
    fn text_is_an_alias_for_compact(#[case] raw: &str, #[case] expected: LogFormat) {
        let parsed: LogFormat = raw.parse().expect("alias should parse");
        assert_eq!(parsed, expected);
        assert_eq!(parsed.to_string(), "compact");
    }

    #[rstest]
    fn unknown_formats_are_rejected() {
        let error = "pretty".parse::<LogFormat>().expect_err("pretty is unsupported");
        assert_eq!(error, LogFormatParseError::VariantNotFound);
    }

    #[rstest]
    #[case(LogFormat::Json, true, false)]
    #[case(LogFormat::Compact, true, true)]
    #[case(LogFormat::Compact, false, false)]
    fn colour_follows_format_and_terminal(
        #[case] format: LogFormat,
        #[case] terminal: bool,
        #[case] expected: bool,
    ) {
        assert_eq!(format.uses_colour(terminal), expected);
    }
}
