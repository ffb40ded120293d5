use db::DBService;
use rmcp::{ServiceExt, transport::stdio};
use server::mcp::task_server::TaskServer;
use tracing_subscriber::{EnvFilter, prelude::*};

fn main() -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
        .block_on(async {
            dotenv::dotenv().ok();

            // stdout is the MCP transport; logs go to stderr.
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_filter(EnvFilter::new("info")),
                )
                .init();

            let version = env!("CARGO_PKG_VERSION");
            tracing::debug!("[MCP] Starting MCP task server version {version}...");

            // The serving identity is fixed at process start; tool
            // arguments never carry a user id.
            let user_id = std::env::var("AGENT_USER_ID").unwrap_or_else(|_| "local".to_string());

            let db_service = DBService::new().await?;
            let pool = db_service.pool.clone();

            let service = TaskServer::new(pool, user_id)
                .serve(stdio())
                .await
                .inspect_err(|e| {
                    tracing::error!("serving error: {:?}", e);
                })?;

            service.waiting().await?;
            Ok(())
        })
}
