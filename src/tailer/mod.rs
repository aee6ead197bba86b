pub mod cursor;
pub mod tail;
pub mod watch;

pub use cursor::ActiveFile;
pub use tail::{Tailer, TailerBuilder, TailerError};
pub use watch::{DirWatcher, WatchEvent};
