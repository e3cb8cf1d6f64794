//! Domain services: analysis pipeline, aggregation, rendering and storage

pub mod aggregation;
pub mod archive;
pub mod blob_store;
pub mod catalog;
pub mod llm;
pub mod parser;
pub mod pdf;
pub mod prompt;
pub mod recommendations;
pub mod report;
