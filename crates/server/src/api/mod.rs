pub mod handlers;
pub mod matches;
pub mod middleware;
pub mod routes;

pub use matches::ErrorResponse;
pub use routes::create_router;
