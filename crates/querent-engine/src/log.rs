use querent_core::messages::Message;

/// Ordered, append-only message history for one pipeline run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    /// A log holding only the user's question.
    pub fn seeded(question: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::human(question)],
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Text of the first human message, if any.
    pub fn question(&self) -> Option<&str> {
        self.messages.iter().find_map(|m| match m {
            Message::Human(h) => Some(h.content.as_str()),
            _ => None,
        })
    }
}

impl<'a> IntoIterator for &'a ConversationLog {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_log_holds_question() {
        let log = ConversationLog::seeded("how many users?");
        assert_eq!(log.len(), 1);
        assert_eq!(log.question(), Some("how many users?"));
        assert_eq!(log.last(), Some(&Message::human("how many users?")));
    }

    #[test]
    fn appends_preserve_order() {
        let mut log = ConversationLog::seeded("q");
        log.push(Message::answer("a"));
        log.extend([Message::answer("b"), Message::answer("c")]);

        let texts: Vec<String> = log.iter().map(Message::text).collect();
        assert_eq!(texts, vec!["q", "a", "b", "c"]);
    }

    #[test]
    fn empty_log() {
        let log = ConversationLog::default();
        assert!(log.is_empty());
        assert!(log.last().is_none());
        assert!(log.question().is_none());
    }
}
