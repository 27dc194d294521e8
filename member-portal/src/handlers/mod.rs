pub mod admin;
pub mod auth;
pub mod download;
pub mod members;
pub mod metrics;
pub mod pages;
