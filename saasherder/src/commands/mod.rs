/// Changelog command handler
pub mod changelog;

/// Image verification command handler
pub mod check_image;

/// Config command handlers
pub mod config;

/// Service field lookup handler
pub mod get;

/// Template validation command handler
pub mod validate;
