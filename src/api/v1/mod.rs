/*
 * Responsibility
 * - v1 public surface (routes(), extractors for handlers)
 */
pub mod extractors;
pub mod handlers;
mod routes;

pub use routes::routes;
