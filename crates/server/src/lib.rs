use std::sync::Arc;

use db::DBService;
use services::services::{config::AgentConfig, dispatcher::Dispatcher};

use crate::middleware::auth::AuthVerifier;

pub mod error;
pub mod mcp;
pub mod middleware;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub db: DBService,
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<AgentConfig>,
    pub auth: Arc<AuthVerifier>,
}
