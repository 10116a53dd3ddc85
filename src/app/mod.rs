//! Process-wide plumbing shared by the library and the binary front-ends.

mod logging;

pub use logging::{init_logging, log_debug, log_debug_content, log_file_path, log_panic};
