pub mod aggregation;
pub mod collaborators;
pub mod config;
pub mod currency;
pub mod error;
pub mod ingestion;
pub mod model;
pub mod pipeline;
pub mod rates;
pub mod validation;

#[cfg(feature = "runtime")]
pub mod api_client;
