//! PostgreSQL infrastructure module

mod migrations;
mod repositories;
mod rows;
mod store;

pub use migrations::{platform_migrations, run_migrations, Migration, PostgresMigrator};
pub use store::{PgStore, PgStoreTx};
