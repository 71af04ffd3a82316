use super::{MessageStream, SharedStream};

/// Formats a message with a template before forwarding it to an inner stream.
///
/// Every `{}` in the template is replaced by the message:
///
/// ```
/// use metadata_import::{FormattedMessageStream, MemoryStream, MessageStream};
///
/// let inner = MemoryStream::new();
/// let stream = FormattedMessageStream::new(inner.clone(), "Message received: {}");
/// stream.write_message("a message");
/// assert_eq!(inner.messages(), vec!["Message received: a message"]);
/// ```
pub struct FormattedMessageStream {
    stream: SharedStream,
    template: String,
}

impl FormattedMessageStream {
    pub fn new(stream: SharedStream, template: impl Into<String>) -> Self {
        Self {
            stream,
            template: template.into(),
        }
    }

    pub fn format_message(&self, message: &str) -> String {
        if self.template.contains("{}") {
            self.template.replace("{}", message)
        } else {
            format!("{}{}", self.template, message)
        }
    }
}

impl MessageStream for FormattedMessageStream {
    fn write_message(&self, message: &str) {
        self.stream.write_message(&self.format_message(message));
    }
}
