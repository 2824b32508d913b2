// src/models/mod.rs

pub mod college;
pub mod question;
pub mod student;
pub mod test_result;
pub mod user;
