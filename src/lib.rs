pub mod config;
pub mod fetch;
pub mod load;
pub mod pipeline;
pub mod resolve;
pub mod table;
pub mod write;
