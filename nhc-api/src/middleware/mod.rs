/// Middleware modules for the API server
///
/// Session authentication lives in `nhc_shared::auth::middleware`; this
/// module holds the HTTP-only layers.

pub mod security;
