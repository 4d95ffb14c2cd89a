pub mod cache;
pub mod conversions;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod ws;

pub use routes::create_router;
pub use ws::WsBroadcaster;
