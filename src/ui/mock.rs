use std::collections::VecDeque;

use super::SyncUi;

/// Scripted answers for driving the state machine in tests. Once a script
/// runs out, directory prompts give up and the continue prompt says stop.
#[derive(Debug, Default)]
pub struct MockUi {
    directories: VecDeque<String>,
    continues: VecDeque<bool>,
    pub directory_prompts: usize,
    pub continue_prompts: usize,
}

impl MockUi {
    pub fn new(directories: &[&str], continues: &[bool]) -> Self {
        Self {
            directories: directories.iter().map(|dir| dir.to_string()).collect(),
            continues: continues.iter().copied().collect(),
            ..Self::default()
        }
    }
}

impl SyncUi for MockUi {
    async fn directory_prompt(&mut self, _valid: usize, _minimum: usize) -> Option<String> {
        self.directory_prompts += 1;
        self.directories.pop_front()
    }

    async fn continue_prompt(&mut self) -> bool {
        self.continue_prompts += 1;
        self.continues.pop_front().unwrap_or(false)
    }
}
