pub mod app;
pub mod browser;
pub mod config;
pub mod domain;
pub mod error;
pub mod output;
pub mod site;
pub mod store;
pub mod template;
pub mod wait;
pub mod webdriver;
