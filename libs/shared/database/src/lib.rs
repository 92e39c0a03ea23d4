pub mod supabase;

pub use supabase::{SupabaseClient, SupabaseApiError, is_conflict};
