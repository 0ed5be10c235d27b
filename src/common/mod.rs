pub mod frequency;
pub mod grouping;
pub mod params;
pub mod table;
pub mod table_reader;
pub mod time_grid;
pub mod types;
