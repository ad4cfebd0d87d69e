pub mod api;
pub mod catalog;
pub mod config;
pub mod control;
pub mod discovery;
pub mod download;
pub mod extract;
pub mod humanize;
pub mod observability;
pub mod queue;
pub mod storage;
pub mod worker;
