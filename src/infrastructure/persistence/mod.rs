pub mod memory;
pub mod postgres;
pub mod redis_sessions;

pub use memory::{MemorySessionRepository, MemoryUserProvider};
pub use postgres::PostgresUserProvider;
pub use redis_sessions::RedisSessionRepository;
