use flume::{Receiver, Sender};

/// Something the interactive loop should show the operator.
///
/// Producers on any thread send notices over a flume channel; only the
/// interactive loop holds the receiving side and renders them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A reply, report or event worth a message dialog.
    Message { title: String, body: String },
    /// A failure surfaced as an error dialog.
    Error { title: String, body: String },
}

impl Notice {
    pub fn message(title: impl Into<String>, body: impl Into<String>) -> Self {
        Notice::Message {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Notice::Error {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Notice::Message { title, .. } | Notice::Error { title, .. } => title,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Notice::Message { body, .. } | Notice::Error { body, .. } => body,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error { .. })
    }
}

#[derive(Debug, Clone)]
pub struct NoticeSender(Sender<Notice>);

impl NoticeSender {
    /// Queue `notice` for display. A closed loop means the console is shutting
    /// down, so the notice is dropped.
    pub fn send(&self, notice: Notice) {
        if let Err(err) = self.0.send(notice) {
            log::debug!("interactive loop gone, dropping notice: {:?}", err.0.title());
        }
    }
}

pub fn notice_channel() -> (NoticeSender, Receiver<Notice>) {
    let (tx, rx) = flume::unbounded();
    (NoticeSender(tx), rx)
}
