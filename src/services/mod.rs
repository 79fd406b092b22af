// Service exports
pub mod cache;
pub mod postgres;
pub mod supabase;

pub use cache::{CacheError, CacheKey, CacheManager};
pub use postgres::{PostgresClient, PostgresError};
pub use supabase::{SupabaseClient, SupabaseError, SupabaseTables};
