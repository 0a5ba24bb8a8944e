use std::collections::VecDeque;

/// Most prompts kept for recall
pub const MAX_HISTORY: usize = 30;

/// Sent prompts, newest first, with an up/down recall cursor
#[derive(Debug, Clone, Default)]
pub struct MessageHistory {
    entries: VecDeque<String>,
    cursor: Option<usize>,
}

impl MessageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sent prompt. Blank prompts are ignored; the recall cursor
    /// resets.
    pub fn push(&mut self, message: &str) {
        let message = message.trim();
        if message.is_empty() {
            return;
        }
        self.entries.push_front(message.to_string());
        self.entries.truncate(MAX_HISTORY);
        self.cursor = None;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry `pos` steps back, 0 being the newest
    pub fn get(&self, pos: usize) -> Option<&str> {
        self.entries.get(pos).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Step to an older entry. Stays on the oldest once reached.
    pub fn older(&mut self) -> Option<&str> {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next < self.entries.len() {
            self.cursor = Some(next);
        }
        self.cursor.and_then(|c| self.get(c))
    }

    /// Step to a newer entry. `None` means back past the newest, to an empty
    /// input line.
    pub fn newer(&mut self) -> Option<&str> {
        match self.cursor {
            Some(0) | None => {
                self.cursor = None;
                None
            }
            Some(c) => {
                self.cursor = Some(c - 1);
                self.get(c - 1)
            }
        }
    }

    /// Read-only view for a line editor's up/down recall
    pub fn recall(&self) -> Recall<'_> {
        Recall(self)
    }
}

/// Prompts are recorded when sent, not when typed, so writes are dropped.
pub struct Recall<'a>(&'a MessageHistory);

impl<T> dialoguer::History<T> for Recall<'_> {
    fn read(&self, pos: usize) -> Option<String> {
        self.0.get(pos).map(str::to_string)
    }

    fn write(&mut self, _val: &T) {}
}
