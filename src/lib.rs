pub mod config;
pub mod constants;
pub mod extractors;
pub mod learning;
pub mod logging;
pub mod response;
pub mod routes;
pub mod state;
pub mod store;
pub mod validation;
