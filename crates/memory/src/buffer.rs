//! Rolling buffer of finalized answers.

use std::collections::VecDeque;
use streamgate_core::is_greeting;

/// Answers kept per conversation unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 9;

/// Bounded FIFO of prior answers.
#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    turns: VecDeque<String>,
    capacity: usize,
}

impl Default for ConversationBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ConversationBuffer {
    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            turns: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append `answer` unless it is blank or a greeting. Returns whether the
    /// answer was recorded.
    pub fn record_if_eligible(&mut self, answer: &str) -> bool {
        if answer.trim().is_empty() || is_greeting(answer) {
            return false;
        }

        self.turns.push_back(answer.to_string());
        while self.turns.len() > self.capacity {
            self.turns.pop_front();
        }
        true
    }

    /// Render the previous-conversation hint from the last two turns.
    pub fn summarize(&self) -> String {
        let n = self.turns.len();
        match n {
            0 => String::new(),
            1 => format!("Previously, we discussed: {}", self.turns[0]),
            _ => format!(
                "Previously, we discussed: {}. Additionally, we covered: {}",
                self.turns[n - 2],
                self.turns[n - 1]
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn turns(&self) -> impl Iterator<Item = &str> {
        self.turns.iter().map(String::as_str)
    }
}
