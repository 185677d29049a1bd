pub mod token;
pub mod util;
