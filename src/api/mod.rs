pub mod analytics;
pub mod handlers;
pub mod ingest;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
