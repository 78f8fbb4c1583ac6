/*
 * Responsibility
 * - Domain services: extension registry, schema synthesis, token validation
 */
pub mod auth;
pub mod extensions;
pub mod schema;
