pub mod core;
pub mod table;
pub mod yaml;
