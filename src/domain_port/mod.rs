// store

mod response_cache;
mod session_store;

pub use response_cache::*;
pub use session_store::*;

// directory

mod subject_directory;

pub use subject_directory::*;

mod clock;

pub use clock::*;
