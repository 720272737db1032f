#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::Author;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    Normal,
    Error,
}

/// A status or content update shown to the user, labelled with its sender.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub author: Author,
    /// Sender name as it read when the message was created.
    label: String,
    pub text: String,
    mtype: MessageType,
}

impl Message {
    pub fn new(author: Author, text: &str) -> Message {
        return Message::new_with_type(author, MessageType::Normal, text);
    }

    pub fn new_with_type(author: Author, mtype: MessageType, text: &str) -> Message {
        return Message {
            author,
            label: author.to_string(),
            text: text.to_string().replace('\t', "  "),
            mtype,
        };
    }

    pub fn with_label(mut self, label: &str) -> Message {
        self.label = label.to_string();
        return self;
    }

    pub fn label(&self) -> &str {
        return &self.label;
    }

    pub fn message_type(&self) -> MessageType {
        return self.mtype;
    }

    /// One flag per line, set for lines inside a fenced block. Fence lines
    /// themselves are not flagged.
    pub fn fenced_lines(&self) -> Vec<bool> {
        let mut in_codeblock = false;

        return self
            .text
            .lines()
            .map(|line| {
                if line.trim().starts_with("```") {
                    in_codeblock = !in_codeblock;
                    return false;
                }

                return in_codeblock;
            })
            .collect();
    }
}
