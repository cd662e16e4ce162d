pub mod config;
pub mod dedup;
pub mod domain;
pub mod error;
pub mod fasta;
pub mod output;
pub mod pipeline;
