use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ServerError {
    #[error("Transport initialization failed")]
    #[diagnostic(
        code(wikimed::mcp::transport_init_failed),
        help("Failed to initialize {transport} transport on {endpoint}")
    )]
    TransportInitFailed {
        transport: String,
        endpoint: String,
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("MCP service stopped with an error")]
    #[diagnostic(code(wikimed::mcp::service_failed))]
    ServiceFailed {
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Unknown MCP transport: {value}")]
    #[diagnostic(
        code(wikimed::mcp::unknown_transport),
        help("Use one of: stdio, http")
    )]
    UnknownTransport { value: String },

    #[error("HTTP transport not available")]
    #[diagnostic(
        code(wikimed::mcp::http_disabled),
        help("Rebuild wikimed-mcp with the `http` feature enabled")
    )]
    HttpDisabled,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] wikimed_core::ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Core(#[from] wikimed_core::CoreError),
}

pub type Result<T> = std::result::Result<T, ServerError>;
