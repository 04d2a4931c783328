pub mod api;
pub mod clock;
pub mod config;
pub mod models;
pub mod registry;
pub mod reports;
pub mod service;
pub mod storage;
pub mod whatsapp;
