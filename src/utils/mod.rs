pub mod fs;
pub mod http;
pub mod logging;
pub mod time;
