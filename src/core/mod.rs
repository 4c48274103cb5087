pub mod config;
pub mod database;
pub mod error;

// Civic hierarchy
pub mod civic_store;
pub mod civic_api;
pub mod data_loader;

// Live pose and gesture validation
pub mod frame_decoder;
pub mod validators;
pub mod validation_session;
pub mod validation_socket;

#[cfg(test)]
pub(crate) mod test_support;
