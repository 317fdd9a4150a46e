// src/models/mod.rs

pub mod comment;
pub mod post;
pub mod rich_text;
pub mod user;
pub mod vote;
