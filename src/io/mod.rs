//! Storage collaborators and body encoding.

pub mod cloud;
pub mod compression;
pub mod tsv;
