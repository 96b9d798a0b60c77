//! Prompts shown to the user while the synchronizer runs.

mod console;
#[cfg(test)]
mod mock;

pub use console::ConsoleUi;
#[cfg(test)]
pub use mock::MockUi;

pub trait SyncUi {
    /// Asks for one more directory to synchronize, telling the user how many
    /// valid ones exist and how many are needed. `None` means no answer will
    /// come and the program should shut down.
    async fn directory_prompt(&mut self, valid: usize, minimum: usize) -> Option<String>;

    /// Whether to keep running. Must not block waiting for the user.
    async fn continue_prompt(&mut self) -> bool;
}
