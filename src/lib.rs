//! kindle-courier - Deliver EPUB books to a Kindle address over SMTP
//!
//! This crate provides the core functionality for kindle-courier, including
//! settings persistence, SMTP delivery through Gmail or QQ Mail, and the
//! bookkeeping that files each book under a delivered or failed directory.

pub mod app;
pub mod config;
pub mod domain;
pub mod providers;
pub mod services;
pub mod storage;

pub use app::App;
