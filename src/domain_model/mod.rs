mod session;
mod subject;
mod token;

pub use session::*;
pub use subject::*;
pub use token::*;
