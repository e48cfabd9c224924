mod response_cache_memory;
mod session_store_memory;
mod subject_directory_static;

pub use response_cache_memory::*;
pub use session_store_memory::*;
pub use subject_directory_static::*;
