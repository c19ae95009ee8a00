#[macro_use]
extern crate log;
#[macro_use]
extern crate derive_builder;

pub mod browser_controller;
pub mod config;
pub mod page_query;
pub mod queries;
pub mod reader;
pub mod scraper;
pub mod session;
pub mod sink;
pub mod types;
pub mod utils;
pub mod writer;
