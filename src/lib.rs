// Library exports for Agora
// This allows integration tests and external code to use Agora modules

pub mod api;
pub mod auth;
pub mod commands;
pub mod comments;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod models;
pub mod navigation;
pub mod normalize;
pub mod render;
pub mod state;
pub mod votes;
