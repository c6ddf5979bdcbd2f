pub mod app;
pub mod config;
pub mod favorites;
pub mod models;
pub mod omdb;
pub mod search;
pub mod selection;
pub mod suggestions;
