mod check;
mod printer;
mod watch;

pub use check::{run_validate, LoadedTree, EXIT_INVALID, EXIT_IO, EXIT_OK};
pub use printer::{render_orphans, render_outline, render_topic};
pub use watch::{rebuild, run_watch};
