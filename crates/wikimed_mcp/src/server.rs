use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use serde::Serialize;
use tracing::{debug, info, warn};
use wikimed_core::operation::{self, OperationSpec};
use wikimed_core::{
    Arguments, ClientRegistry, CoreError, Dispatcher, NormalizedResponse, WikimedConfig,
};

use crate::error::ServerError;
use crate::requests::{
    ClientRequest, ConfigureClientRequest, ConfirmAppointmentRequest, CreateAppointmentRequest,
    FindDoctorByCodeRequest, FindDoctorByNameRequest, FindNearestSlotRequest,
    GetAppointmentRequest, GetDailyIncomeRequest, GetPatientInvoiceRequest,
    ListAppointmentsRequest, SearchPatientRequest,
};

const CLIENT_ID_ARG: &str = "client_id";

const INSTRUCTIONS: &str = "Tools for the WikiMed clinic management system: doctors, \
appointments, patients and finance reports. Call configure_client first to point a \
client_id at a clinic endpoint; calls without a client_id use the default endpoint. \
Dates are DD/MM/YYYY. Results are JSON converted from the clinic's XML, or an \
{\"error\": ...} object.";

/// MCP server exposing the WikiMed operations as tools
#[derive(Clone)]
pub struct WikimedMcpServer {
    dispatcher: Arc<Dispatcher>,
    tool_router: ToolRouter<Self>,
}

impl WikimedMcpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        let tool_router = Self::tool_router();
        info!(
            "Tool router initialized with {} tools",
            tool_router.list_all().len()
        );

        Self {
            dispatcher: Arc::new(dispatcher),
            tool_router,
        }
    }

    /// Build the registry and dispatcher described by `config`.
    pub fn from_config(config: &WikimedConfig) -> crate::Result<Self> {
        let registry = Arc::new(config.build_registry());
        let dispatcher = Dispatcher::with_timeout(registry, config.request_timeout())?;
        Ok(Self::new(dispatcher))
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        self.dispatcher.registry()
    }

    /// Names of every registered tool.
    pub fn tool_names(&self) -> Vec<String> {
        self.tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect()
    }

    /// Run the MCP server on stdio transport
    pub async fn run_stdio(self) -> crate::Result<()> {
        info!("Starting MCP server on stdio transport");

        let service = self
            .serve(rmcp::transport::stdio())
            .await
            .map_err(|e| ServerError::TransportInitFailed {
                transport: "stdio".to_string(),
                endpoint: "stdin/stdout".to_string(),
                cause: Box::new(e),
            })?;

        let quit_reason = service
            .waiting()
            .await
            .map_err(|e| ServerError::ServiceFailed { cause: Box::new(e) })?;

        info!("Server stopped: {:?}", quit_reason);
        Ok(())
    }

    /// Run the MCP server on HTTP transport (streamable) at `/mcp`
    #[cfg(feature = "http")]
    pub async fn run_http(self, bind: &str) -> crate::Result<()> {
        use rmcp::transport::streamable_http_server::{
            StreamableHttpService, session::local::LocalSessionManager,
        };
        use tokio::net::TcpListener;

        info!("Starting MCP server on HTTP transport at {}", bind);

        let server = self;
        let service = StreamableHttpService::new(
            move || Ok(server.clone()),
            LocalSessionManager::default().into(),
            Default::default(),
        );
        let router = axum::Router::new().nest_service("/mcp", service);

        let listener = TcpListener::bind(bind)
            .await
            .map_err(|e| ServerError::TransportInitFailed {
                transport: "http".to_string(),
                endpoint: bind.to_string(),
                cause: Box::new(e),
            })?;

        info!("MCP HTTP server listening on http://{}/mcp", bind);

        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Shutdown signal received");
            })
            .await
            .map_err(|e| ServerError::ServiceFailed { cause: Box::new(e) })
    }

    /// Validate, dispatch and render one operation call.
    async fn call<T: Serialize>(&self, spec: &OperationSpec, params: &T) -> CallToolResult {
        let outcome = match Arguments::from_serialize(params) {
            Ok(args) => {
                let client_id = args.get(CLIENT_ID_ARG).unwrap_or_default();
                info!(tool = spec.tool, client_id, "Tool call");
                self.dispatcher.invoke(spec, &args, client_id).await
            }
            Err(e) => Err(e),
        };
        render(spec.tool, outcome)
    }
}

fn render(tool: &str, outcome: wikimed_core::Result<NormalizedResponse>) -> CallToolResult {
    match outcome {
        Ok(response) => {
            debug!(tool, "Tool call succeeded");
            CallToolResult::success(vec![Content::text(response.into_string())])
        }
        Err(e) => {
            warn!(tool, kind = e.kind().as_str(), "Tool call failed: {}", e);
            error_result(&e)
        }
    }
}

fn error_result(e: &CoreError) -> CallToolResult {
    CallToolResult::error(vec![Content::text(e.to_json())])
}

// Tool implementations for the WikiMed operations
#[tool_router]
impl WikimedMcpServer {
    #[tool(
        description = "Register or replace the WikiMed endpoint and credential code used for a client_id"
    )]
    pub async fn configure_client(
        &self,
        Parameters(params): Parameters<ConfigureClientRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ack = self.registry().configure(
            params.client_id.as_deref().unwrap_or_default(),
            params.base_url.as_deref().unwrap_or_default(),
            params.credential_code.as_deref().unwrap_or_default(),
        );

        let result = match ack {
            Ok(ack) => match serde_json::to_string_pretty(&ack) {
                Ok(text) => CallToolResult::success(vec![Content::text(text)]),
                Err(e) => error_result(&CoreError::Unexpected {
                    message: e.to_string(),
                }),
            },
            Err(e) => {
                warn!("configure_client rejected: {}", e);
                error_result(&e)
            }
        };
        Ok(result)
    }

    #[tool(description = "Get WikiMed system information and version")]
    pub async fn get_wikimed_info(
        &self,
        Parameters(params): Parameters<ClientRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.call(&operation::GET_WIKIMED_INFO, &params).await)
    }

    #[tool(description = "List all doctors with their codes and specialties")]
    pub async fn list_doctors(
        &self,
        Parameters(params): Parameters<ClientRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.call(&operation::LIST_DOCTORS, &params).await)
    }

    #[tool(description = "Find a doctor by name")]
    pub async fn find_doctor_by_name(
        &self,
        Parameters(params): Parameters<FindDoctorByNameRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.call(&operation::FIND_DOCTOR_BY_NAME, &params).await)
    }

    #[tool(description = "Find a doctor by doctor code")]
    pub async fn find_doctor_by_code(
        &self,
        Parameters(params): Parameters<FindDoctorByCodeRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.call(&operation::FIND_DOCTOR_BY_CODE, &params).await)
    }

    #[tool(description = "Book a new appointment with a doctor")]
    pub async fn create_appointment(
        &self,
        Parameters(params): Parameters<CreateAppointmentRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.call(&operation::CREATE_APPOINTMENT, &params).await)
    }

    #[tool(description = "Find the nearest available appointment slot for a doctor")]
    pub async fn find_nearest_slot(
        &self,
        Parameters(params): Parameters<FindNearestSlotRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.call(&operation::FIND_NEAREST_SLOT, &params).await)
    }

    #[tool(description = "Confirm, cancel or update an existing appointment")]
    pub async fn confirm_appointment(
        &self,
        Parameters(params): Parameters<ConfirmAppointmentRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.call(&operation::CONFIRM_APPOINTMENT, &params).await)
    }

    #[tool(description = "Get the details of an appointment by number")]
    pub async fn get_appointment(
        &self,
        Parameters(params): Parameters<GetAppointmentRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.call(&operation::GET_APPOINTMENT, &params).await)
    }

    #[tool(description = "List the appointments for a day, optionally by doctor or branch")]
    pub async fn list_appointments(
        &self,
        Parameters(params): Parameters<ListAppointmentsRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.call(&operation::LIST_APPOINTMENTS, &params).await)
    }

    #[tool(description = "Search for a patient by file number, phone or national id")]
    pub async fn search_patient(
        &self,
        Parameters(params): Parameters<SearchPatientRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.call(&operation::SEARCH_PATIENT, &params).await)
    }

    #[tool(description = "Get a patient's invoices and balance")]
    pub async fn get_patient_invoice(
        &self,
        Parameters(params): Parameters<GetPatientInvoiceRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.call(&operation::GET_PATIENT_INVOICE, &params).await)
    }

    #[tool(description = "Get the daily income report for a date")]
    pub async fn get_daily_income(
        &self,
        Parameters(params): Parameters<GetDailyIncomeRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.call(&operation::GET_DAILY_INCOME, &params).await)
    }

    #[tool(description = "Restart the WikiMed service on the clinic server")]
    pub async fn restart_service(
        &self,
        Parameters(params): Parameters<ClientRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.call(&operation::RESTART_SERVICE, &params).await)
    }
}

#[tool_handler]
impl ServerHandler for WikimedMcpServer {
    fn get_info(&self) -> ServerInfo {
        debug!("MCP server get_info called");
        ServerInfo {
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
