pub mod collections;
pub mod items;
pub mod root;
pub mod search;
pub mod transactions;
