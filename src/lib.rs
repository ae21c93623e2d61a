pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middlewares;
pub mod models;
pub mod routes;
pub mod state;
pub mod structs;
pub mod tracker;
pub mod utils;
