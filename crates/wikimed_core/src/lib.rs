//! WikiMed Core - Clinic API translation layer
//!
//! This crate turns named tool arguments into WikiMed's single-endpoint
//! query protocol and turns the endpoint's XML answers back into JSON.
//! It knows nothing about MCP; the server crate wires it to a transport.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod normalize;
pub mod operation;
pub mod registry;

pub use config::{ServerConfig, WikimedConfig};
pub use dispatch::{DEFAULT_REQUEST_TIMEOUT, Dispatcher, NormalizedResponse};
pub use error::{ConfigError, CoreError, ErrorKind, Result};
pub use normalize::{normalize, xml_to_json};
pub use operation::{Arguments, OperationCode, OperationRequest, OperationSpec};
pub use registry::{ClientConfig, ClientRegistry, ConfigureAck};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        Arguments, ClientConfig, ClientRegistry, ConfigureAck, CoreError, Dispatcher, ErrorKind,
        NormalizedResponse, OperationSpec, Result, WikimedConfig,
    };
}
