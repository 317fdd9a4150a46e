// src/utils/mod.rs

pub mod client;
pub mod html;
pub mod index_id;
pub mod jwt;
