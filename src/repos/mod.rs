/*
 * Responsibility
 * - Catalog storage seam (trait) と参照実装 (in-memory)
 */
pub mod catalog;
pub mod memory;
