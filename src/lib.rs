//! DublinPad: turns a traveller's preferences into follow-up questions,
//! accommodation suggestions, images and inquiry emails.

pub mod api;
pub mod config;
pub mod error;
pub mod flows;
pub mod llm;
pub mod prompts;
pub mod safety;
pub mod schema;
pub mod wizard;
