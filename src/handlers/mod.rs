// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod college;
pub mod student;
pub mod test_session;
