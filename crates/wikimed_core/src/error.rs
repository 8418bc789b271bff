use miette::Diagnostic;
use thiserror::Error;

use crate::normalize::XmlError;

/// Coarse classification of a failed call, mirrored in the rendered error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-supplied arguments were missing or invalid; nothing was sent.
    Validation,
    /// Connection, timeout or HTTP status failure.
    Transport,
    /// Anything else that went wrong while dispatching.
    Unexpected,
    /// The upstream body looked like XML but did not parse.
    Format,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Transport => "transport",
            Self::Unexpected => "unexpected",
            Self::Format => "format",
        }
    }
}

#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error("{}", missing_field_message(.field, .hint.as_deref()))]
    #[diagnostic(
        code(wikimed_core::missing_field),
        help("Provide a non-empty value for '{field}'")
    )]
    MissingField { field: String, hint: Option<String> },

    #[error("At least one identifier required: {}", join_alternatives(.fields))]
    #[diagnostic(
        code(wikimed_core::missing_identifier),
        help("Supply any one of the listed identifiers")
    )]
    MissingIdentifier { fields: Vec<String> },

    #[error("{field} must be one of: {}", .allowed.join(", "))]
    #[diagnostic(
        code(wikimed_core::invalid_choice),
        help("'{value}' is not accepted for '{field}'")
    )]
    InvalidChoice {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("Request failed: {message}")]
    #[diagnostic(
        code(wikimed_core::request_failed),
        help("Check that the WikiMed endpoint is reachable and the credential code is valid")
    )]
    RequestFailed { message: String },

    #[error("Unexpected error: {message}")]
    #[diagnostic(code(wikimed_core::unexpected))]
    Unexpected { message: String },

    #[error("Failed to parse XML response")]
    #[diagnostic(
        code(wikimed_core::xml_parse_failed),
        help("The upstream body was detected as XML but is not well-formed")
    )]
    XmlParse {
        raw: String,
        #[source]
        cause: XmlError,
    },

    #[error("Failed to build HTTP client")]
    #[diagnostic(code(wikimed_core::http_client_init))]
    HttpClientInit {
        #[source]
        cause: reqwest::Error,
    },
}

impl CoreError {
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
            hint: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField { .. }
            | Self::MissingIdentifier { .. }
            | Self::InvalidChoice { .. } => ErrorKind::Validation,
            Self::RequestFailed { .. } => ErrorKind::Transport,
            Self::Unexpected { .. } | Self::HttpClientInit { .. } => ErrorKind::Unexpected,
            Self::XmlParse { .. } => ErrorKind::Format,
        }
    }

    /// The outward JSON shape: `{"error": ...}`, plus `raw` for format errors.
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            Self::XmlParse { raw, .. } => serde_json::json!({
                "error": self.to_string(),
                "raw": raw,
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        }
    }

    pub fn to_json(&self) -> String {
        self.to_json_value().to_string()
    }
}

fn missing_field_message(field: &str, hint: Option<&str>) -> String {
    match hint {
        Some(hint) => format!("{field} is required {hint}"),
        None => format!("{field} is required"),
    }
}

/// "a", "a or b", "a, b, or c"
fn join_alternatives(fields: &[String]) -> String {
    match fields {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} or {second}"),
        [head @ .., last] => format!("{}, or {last}", head.join(", ")),
    }
}

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file")]
    #[diagnostic(
        code(wikimed_core::config_io),
        help("Check that {path} exists and is readable")
    )]
    Io {
        path: String,
        #[source]
        cause: std::io::Error,
    },

    #[error("Invalid configuration TOML")]
    #[diagnostic(
        code(wikimed_core::config_parse),
        help("Fix the syntax in {path}")
    )]
    Parse {
        path: String,
        #[source]
        cause: toml::de::Error,
    },

    #[error("Failed to serialize configuration")]
    #[diagnostic(code(wikimed_core::config_serialize))]
    Serialize {
        #[source]
        cause: toml::ser::Error,
    },

    #[error("Invalid configuration value for {field}")]
    #[diagnostic(code(wikimed_core::config_invalid), help("{reason}"))]
    Invalid { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
