pub mod backend;
pub mod cli_runner;
pub mod encoder;
