//! API Module
//!
//! Admin HTTP handlers and routing, served next to the text protocol.
//!
//! # Endpoints
//! - `PUT /set` - Store a key-value pair (`put`, `add` or `replace`)
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /del/:key` - Delete a key
//! - `GET /stats` - Get cache and executor statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
