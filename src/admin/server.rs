

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    service::RequestContext,
    tool, tool_handler, tool_router,
    transport::stdio,
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cascade::{CascadeError, CascadeManager};
use crate::core::config::CoachConfig;
use crate::core::error::{CoachError, Result as CoachResult};
use crate::db::{HelixClient, HelixStore};
use crate::storage::S3BlobStore;


#[derive(Debug, Deserialize, rmcp::schemars::JsonSchema)]
pub struct DeleteTeacherParams {
    #[schemars(description = "Teacher identifier (_id)")]
    pub teacher_id: String,
}

#[derive(Debug, Deserialize, rmcp::schemars::JsonSchema)]
pub struct DeleteBatchParams {
    #[schemars(description = "Batch identifier (_id)")]
    pub batch_id: String,
}

#[derive(Debug, Deserialize, rmcp::schemars::JsonSchema)]
pub struct DeleteStudentParams {
    #[schemars(description = "Student identifier (_id)")]
    pub student_id: String,
}

#[derive(Debug, Deserialize, rmcp::schemars::JsonSchema)]
pub struct SweepOrphansParams {
    #[schemars(description = "Only report what would be removed (default: true)")]
    pub dry_run: Option<bool>,
}

/// Body returned by every deletion tool.
#[derive(Debug, Serialize)]
pub struct DeletionResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub report: T,
}


#[derive(Clone)]
pub struct CoachAdminServer {
    manager: Arc<CascadeManager>,
    config: Arc<CoachConfig>,
    tool_router: ToolRouter<Self>,
}

impl CoachAdminServer {

    pub fn new(manager: CascadeManager, config: CoachConfig) -> Self {
        Self {
            manager: Arc::new(manager),
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        }
    }


    fn convert_error(err: CascadeError) -> McpError {
        match err {
            CascadeError::NotFound { .. } => McpError::invalid_params(err.to_string(), None),
            CascadeError::Store { .. } => McpError::internal_error(err.to_string(), None),
        }
    }


    fn result_to_json<T: Serialize>(result: T) -> Result<String, McpError> {
        serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))
    }
}

#[tool_router]
impl CoachAdminServer {

    #[tool(description = "Delete a teacher and everything it owns: batches, notes, assignments, quizzes, messages, sole-member students and all their files. Students in other batches are detached, not deleted. Returns: {success, message, report}")]
    async fn delete_teacher(
        &self,
        Parameters(params): Parameters<DeleteTeacherParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("Deleting teacher {}", params.teacher_id);

        let report = self
            .manager
            .delete_teacher(&params.teacher_id)
            .await
            .map_err(Self::convert_error)?;

        if !report.is_clean() {
            warn!(
                "Teacher {} cascade finished with {} blob failure(s) and {} warning(s)",
                params.teacher_id,
                report.failed_blobs().len(),
                report.warnings.len()
            );
        }

        let json = Self::result_to_json(DeletionResponse {
            success: true,
            message: report.message(),
            report,
        })?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }


    #[tool(description = "Delete one batch with its notes, assignments, quizzes, messages and files; detaches or deletes its students. Returns: {success, message, report}")]
    async fn delete_batch(
        &self,
        Parameters(params): Parameters<DeleteBatchParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("Deleting batch {}", params.batch_id);

        let report = self
            .manager
            .delete_batch(&params.batch_id)
            .await
            .map_err(Self::convert_error)?;

        let json = Self::result_to_json(DeletionResponse {
            success: report.root_deleted,
            message: report.message(),
            report,
        })?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }


    #[tool(description = "Delete a student with profile picture, payment receipts and assignment submissions. Returns: {success, message, report}")]
    async fn delete_student(
        &self,
        Parameters(params): Parameters<DeleteStudentParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("Deleting student {}", params.student_id);

        let report = self
            .manager
            .delete_student(&params.student_id)
            .await
            .map_err(Self::convert_error)?;

        let json = Self::result_to_json(DeletionResponse {
            success: true,
            message: report.message(),
            report,
        })?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }


    #[tool(description = "Dry run of delete_teacher: lists batches, students to delete or detach, child record counts and blob keys. No side effects.")]
    async fn preview_teacher_deletion(
        &self,
        Parameters(params): Parameters<DeleteTeacherParams>,
    ) -> Result<CallToolResult, McpError> {
        let plan = self
            .manager
            .plan_teacher_deletion(&params.teacher_id)
            .await
            .map_err(Self::convert_error)?;

        info!(
            "Preview for teacher {}: {} batch(es), {} blob(s)",
            params.teacher_id,
            plan.batches.len(),
            plan.blob_keys.len()
        );

        let json = Self::result_to_json(&plan)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }


    #[tool(description = "Find and remove students with no batch and batches whose teacher is gone. Defaults to a dry run.")]
    async fn sweep_orphans(
        &self,
        Parameters(params): Parameters<SweepOrphansParams>,
    ) -> Result<CallToolResult, McpError> {
        let dry_run = params.dry_run.unwrap_or(true);
        info!("Sweeping orphans (dry_run: {})", dry_run);

        let stats = self
            .manager
            .sweep_orphans(dry_run)
            .await
            .map_err(Self::convert_error)?;

        let json = Self::result_to_json(&stats)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}


#[tool_handler]
impl ServerHandler for CoachAdminServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "coachhub-admin".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "Coaching-center administration. Use preview_teacher_deletion before \
                 delete_teacher; deletions are irreversible. sweep_orphans reconciles \
                 leftovers from interrupted runs."
                    .to_string(),
            ),
        }
    }


    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            resources: vec![
                RawResource::new("config://coachhub", "coachhub-config".to_string()).no_annotation(),
                RawResource::new("status://coachhub", "coachhub-status".to_string()).no_annotation(),
            ],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let body = match uri.as_str() {
            "config://coachhub" => json!({
                "version": env!("CARGO_PKG_VERSION"),
                "helixdb": {
                    "host": self.config.helix_host,
                    "port": self.config.helix_port,
                },
                "storage": {
                    "bucket": self.config.s3_bucket,
                    "region": self.config.s3_region,
                    "endpoint": self.config.s3_endpoint,
                },
                "tools": [
                    "delete_teacher",
                    "delete_batch",
                    "delete_student",
                    "preview_teacher_deletion",
                    "sweep_orphans",
                ],
            }),
            "status://coachhub" => {
                let options = self.manager.options();
                json!({
                    "status": "ready",
                    "blob_delete_concurrency": options.blob_concurrency,
                    "retain_teacher_on_partial_failure": options.retain_owner_on_partial_failure,
                })
            }
            _ => {
                return Err(McpError::resource_not_found(
                    format!("Unknown resource: {}", uri),
                    Some(json!({ "uri": uri })),
                ));
            }
        };

        let content = serde_json::to_string_pretty(&body).unwrap_or_default();
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(content, uri)],
        })
    }
}


pub async fn run_server() -> CoachResult<()> {
    info!("Initializing coachhub admin server...");

    let config = CoachConfig::load()?;
    let client = Arc::new(HelixClient::from_config(&config));
    if let Err(e) = client.health_check().await {
        warn!("HelixDB at {} not answering yet: {}", client.base_url(), e);
    }

    let docs = Arc::new(HelixStore::new(client));
    let blobs = Arc::new(S3BlobStore::from_config(&config).await);
    let manager = CascadeManager::from_config(docs, blobs, &config);

    info!("coachhub admin server ready");
    info!("   HelixDB: {}", config.helix_url());
    info!("   Bucket: {} ({})", config.s3_bucket, config.s3_region);

    let server = CoachAdminServer::new(manager, config);
    let service = server
        .serve(stdio())
        .await
        .map_err(|e| CoachError::Transport(e.to_string()))?;
    service
        .waiting()
        .await
        .map_err(|e| CoachError::Transport(e.to_string()))?;

    Ok(())
}
