//! Block log adapters.

pub mod file;
pub mod memory;

pub use file::FileLog;
pub use memory::MemoryLog;
