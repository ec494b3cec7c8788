pub mod parser;
pub mod render;
