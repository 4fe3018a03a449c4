pub mod app_state;
pub mod clients;
pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

pub use app_state::AppState;
