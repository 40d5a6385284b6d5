pub mod api;
pub mod app;
pub mod classify;
pub mod config;
pub mod discover;
pub mod domain;
pub mod download;
pub mod error;
pub mod fs_util;
pub mod layout;
pub mod metadata;
pub mod output;
pub mod query;
