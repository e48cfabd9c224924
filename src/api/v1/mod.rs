mod cache;
mod error;
mod gate;
mod handler;
mod router;

pub use cache::*;
pub use error::*;
pub use gate::*;
pub use handler::ApiResponse;
pub use router::routes;
