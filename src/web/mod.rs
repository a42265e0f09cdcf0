pub mod admin;
pub mod dashboard;
pub mod middleware;
pub mod proxy_handler;
pub mod routes;
pub mod status;

pub use routes::build_router;
