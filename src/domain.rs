pub mod connection;
pub mod descriptor;
pub mod models;
pub mod report;
pub mod settings;
