use crate::domain::{SkipBlock, StoreError};
use crate::ports::outbound::BlockLog;

/// In-memory block log for tests and ephemeral nodes.
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    blocks: Vec<SkipBlock>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log that already holds `blocks`, as if appended earlier.
    pub fn with_blocks(blocks: Vec<SkipBlock>) -> Self {
        Self { blocks }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl BlockLog for MemoryLog {
    fn load(&mut self) -> Result<Vec<SkipBlock>, StoreError> {
        Ok(self.blocks.clone())
    }

    fn append(&mut self, block: &SkipBlock) -> Result<(), StoreError> {
        self.blocks.push(block.clone());
        Ok(())
    }
}
