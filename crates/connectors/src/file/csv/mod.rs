pub mod bom;
pub mod coercion;
pub mod cursor;
pub mod error;
pub mod header;
pub mod page;
pub mod reader;
pub mod settings;
pub mod source;
pub mod tokenizer;
