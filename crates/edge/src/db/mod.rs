mod postgres;

pub use postgres::PgEventStore;
