mod models;

pub use models::StoredSession;
