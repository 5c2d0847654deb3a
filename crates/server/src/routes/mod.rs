pub mod analyze;
pub mod health;
pub mod tools;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::cors::{Any, CorsLayer};

use babelfish_mcp::ToolRouter;
use chess_analysis::Engine;

use crate::clients::openrouter::ChatModel;

/// Shared state of the web interface.
pub struct WebState<E, M> {
    pub router: ToolRouter<E>,
    /// `None` when no API key is configured; `/analyze` then reports an error
    pub model: Option<Arc<M>>,
    pub model_name: String,
}

impl<E, M> Clone for WebState<E, M> {
    fn clone(&self) -> Self {
        Self {
            router: self.router.clone(),
            model: self.model.clone(),
            model_name: self.model_name.clone(),
        }
    }
}

pub fn app<E: Engine, M: ChatModel>(state: WebState<E, M>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(analyze::index))
        .route("/analyze", post(analyze::analyze::<E, M>))
        .route("/api/tools", get(tools::list_tools::<E, M>))
        .route("/api/tools/{name}", post(tools::call_tool::<E, M>))
        .route("/health", get(health::health_check))
        .layer(Extension(state))
        .layer(cors)
}
