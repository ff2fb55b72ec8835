pub mod agent;
pub mod app;
