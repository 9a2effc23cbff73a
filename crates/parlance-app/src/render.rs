//! Incremental terminal rendering of a streamed reply.
//!
//! The controller exposes the cumulative reply text; only the part not yet
//! printed is written, so the reply appears to type itself out.

use std::io::{self, Write};

use parlance_chat::{ConversationId, Message, MessageId, Role};

struct Tracked {
    conversation: ConversationId,
    pending: MessageId,
    /// Messages that existed when the request started.
    mark: usize,
    printed: String,
}

pub struct Renderer<W: Write> {
    out: W,
    tracked: Option<Tracked>,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, tracked: None }
    }

    /// Start following a request whose reply will land after `mark` messages.
    pub fn begin(&mut self, conversation: ConversationId, pending: MessageId, mark: usize) {
        self.tracked = Some(Tracked {
            conversation,
            pending,
            mark,
            printed: String::new(),
        });
    }

    pub fn conversation(&self) -> Option<ConversationId> {
        self.tracked.as_ref().map(|t| t.conversation)
    }

    /// Print whatever `text` adds to what is already on screen.
    pub fn progress(&mut self, text: &str) -> io::Result<()> {
        let Some(tracked) = self.tracked.as_mut() else {
            return Ok(());
        };
        write_delta(&mut self.out, &tracked.printed, text)?;
        tracked.printed = text.to_string();
        self.out.flush()
    }

    /// Print the rest of the reply and any notices the request left behind.
    pub fn finish(&mut self, messages: &[Message]) -> io::Result<()> {
        let Some(tracked) = self.tracked.take() else {
            return Ok(());
        };
        let mut on_line = !tracked.printed.is_empty();
        for message in messages.iter().skip(tracked.mark) {
            if message.id == tracked.pending {
                write_delta(&mut self.out, &tracked.printed, &message.text)?;
                on_line = true;
                continue;
            }
            if on_line {
                writeln!(self.out)?;
            }
            write_message(&mut self.out, message)?;
            on_line = false;
        }
        if on_line {
            writeln!(self.out)?;
        }
        self.out.flush()
    }

    /// Print a full transcript.
    pub fn transcript(&mut self, messages: &[Message]) -> io::Result<()> {
        for message in messages {
            let who = match message.role {
                Role::User => "you",
                Role::Assistant => "assistant",
            };
            write!(self.out, "{who}> ")?;
            write_message(&mut self.out, message)?;
        }
        self.out.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

fn write_delta(out: &mut impl Write, printed: &str, text: &str) -> io::Result<()> {
    match text.strip_prefix(printed) {
        Some(rest) => write!(out, "{rest}"),
        // Not an extension of what is on screen; start over on a new line.
        None => write!(out, "\n{text}"),
    }
}

fn write_message(out: &mut impl Write, message: &Message) -> io::Result<()> {
    match &message.image_url {
        Some(url) => writeln!(out, "{} <{url}>", message.text),
        None => writeln!(out, "{}", message.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(renderer: Renderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn prints_only_new_text() {
        let mut r = Renderer::new(Vec::new());
        r.begin(ConversationId(1), MessageId(3), 1);
        r.progress("Hi").unwrap();
        r.progress("Hi there").unwrap();
        r.progress("Hi there").unwrap();
        r.progress("Hi there!").unwrap();

        let messages = vec![
            Message::user(MessageId(2), "hello"),
            Message::assistant(MessageId(3), "Hi there!"),
        ];
        r.finish(&messages).unwrap();
        assert_eq!(output(r), "Hi there!\n");
    }

    #[test]
    fn finish_prints_unstreamed_reply_and_notices() {
        let mut r = Renderer::new(Vec::new());
        r.begin(ConversationId(1), MessageId(3), 1);
        r.progress("Part").unwrap();

        let messages = vec![
            Message::user(MessageId(2), "hello"),
            Message::assistant(MessageId(3), "Part"),
            Message::assistant(MessageId(4), "[stream aborted]"),
        ];
        r.finish(&messages).unwrap();
        assert_eq!(output(r), "Part\n[stream aborted]\n");
    }

    #[test]
    fn finish_without_streamed_text() {
        let mut r = Renderer::new(Vec::new());
        r.begin(ConversationId(1), MessageId(3), 1);
        let messages = vec![
            Message::user(MessageId(2), "hello"),
            Message::assistant(MessageId(4), "[IMAGE]").with_image("/img/1.png"),
            Message::assistant(MessageId(3), "All at once"),
        ];
        r.finish(&messages).unwrap();
        assert_eq!(output(r), "[IMAGE] </img/1.png>\nAll at once\n");
    }

    #[test]
    fn idle_renderer_prints_nothing() {
        let mut r = Renderer::new(Vec::new());
        r.progress("ignored").unwrap();
        r.finish(&[]).unwrap();
        assert!(r.conversation().is_none());
        assert_eq!(output(r), "");
    }

    #[test]
    fn transcript_labels_roles() {
        let mut r = Renderer::new(Vec::new());
        r.transcript(&[
            Message::user(MessageId(1), "hi"),
            Message::assistant(MessageId(2), "hello"),
        ])
        .unwrap();
        assert_eq!(output(r), "you> hi\nassistant> hello\n");
    }
}
