//! linetail: follow one growing, rotating file and hand its new lines to a
//! consumer under bounded memory.
//!
//! A [`LineTail`] owns a reader task that pushes complete lines into a bounded
//! buffer, and a [`LineTail::drain`] step the host calls to deliver them.

pub mod buffer;
pub mod config;
pub mod error;
pub mod fs;
pub mod reader;
pub mod state;
pub mod tail;

pub use config::{FailurePolicy, ShrinkPolicy, TailConfig};
pub use error::{TailError, TailResult};
pub use fs::{LocalFs, TailFs};
pub use state::LifecycleState;
pub use tail::{LineHandler, LineTail};
