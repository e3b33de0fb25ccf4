pub mod check;
pub mod report;
pub mod scan;
pub mod schema;
pub mod sync_names;
