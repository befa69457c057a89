// Persistence module: PostgreSQL schema bootstrap
pub mod schema;

pub use schema::init_schema;
