//! HTTP API handlers for suzuani-web

pub mod account;
pub mod admin;
pub mod catalog;
pub mod health;
pub mod social;

pub use account::{account_routes, profile_routes};
pub use admin::admin_routes;
pub use catalog::catalog_routes;
pub use health::health_routes;
pub use social::social_routes;
