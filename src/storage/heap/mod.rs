pub mod table;
pub mod tuple;
