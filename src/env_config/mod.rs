pub mod build_config;
pub mod build_env;
pub mod error;
pub mod models;
