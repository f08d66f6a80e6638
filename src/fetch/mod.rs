// src/fetch/mod.rs
pub mod client;

pub use client::{load_page, request_delay, PageCache};
