/*
 * Responsibility
 * - Public entry points of the middleware layers
 */
pub mod auth;
pub mod http;
