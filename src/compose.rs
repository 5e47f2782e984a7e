//! Renders a classified item into a MIME message: an encoded-word subject
//! split into bounded chunks and a base64-encoded HTML body.

use crate::config::SmtpConfig;
use crate::timefmt;
use crate::types::FeedItem;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

const SUBJECT_PREFIX: &str = "feedmail: ";

/// Mail headers cap the practical length of a single encoded-word, so long
/// titles are split into runs of this many code points, each run carried by
/// its own encoded-word on its own folded header line.
const SUBJECT_CHUNK_CODEPOINTS: usize = 13;

#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// Unencoded subject text, prefix included.
    pub subject: String,
    /// HTML fragment before transfer encoding.
    pub html_body: String,
}

pub fn compose(item: &FeedItem) -> EmailMessage {
    EmailMessage {
        subject: format!("{}{}", SUBJECT_PREFIX, item.title),
        html_body: render_body(item),
    }
}

/// Splits `text` into successive runs of at most `SUBJECT_CHUNK_CODEPOINTS`
/// Unicode code points.
fn split_subject(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for (i, c) in text.chars().enumerate() {
        current.push(c);
        if i % SUBJECT_CHUNK_CODEPOINTS == SUBJECT_CHUNK_CODEPOINTS - 1 {
            chunks.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Builds the folded `Subject:` header block, one encoded-word per line,
/// trailing CRLF included.
pub fn encode_subject(subject: &str) -> String {
    let mut header = String::from("Subject:");

    for chunk in split_subject(subject) {
        header.push_str(" =?utf-8?B?");
        header.push_str(&BASE64.encode(chunk.as_bytes()));
        header.push_str("?=\r\n");
    }

    header
}

fn render_body(item: &FeedItem) -> String {
    let mut body = String::new();

    body.push_str("Title: ");
    body.push_str(&item.title);
    body.push_str("<br />\r\n");

    body.push_str("Author: ");
    body.push_str(&item.author.name);
    if let Some(email) = &item.author.email {
        body.push_str(" <");
        body.push_str(email);
        body.push_str("> ");
    }
    body.push_str("<br />\r\n");

    if let Some(published_at) = item.published_at {
        body.push_str("Publish Date: ");
        body.push_str(&timefmt::to_display_string(published_at));
        body.push_str("<br />\r\n");
    }

    if let Some(updated_at) = item.updated_at {
        body.push_str("Update Date: ");
        body.push_str(&timefmt::to_display_string(updated_at));
        body.push_str("<br />\r\n");
    }

    for link in &item.links {
        body.push_str("URL: ");
        body.push_str(link);
        body.push_str("<br />\r\n");
    }

    for category in &item.categories {
        body.push_str("Category: ");
        body.push_str(category);
        body.push_str("<br />\r\n");
    }

    body.push_str("---<br />\r\n");
    body.push_str(&item.content);

    body
}

impl EmailMessage {
    /// Assembles the complete wire message: recipient headers (first recipient
    /// as `To:`, the rest as `Bcc:`), the folded encoded subject, MIME
    /// headers, a blank line, then the base64 transfer-encoded body.
    pub fn to_wire(&self, smtp: &SmtpConfig) -> String {
        let mut wire = String::new();

        for (i, recipient) in smtp.recipients.iter().enumerate() {
            if i == 0 {
                wire.push_str("To: ");
            } else {
                wire.push_str("Bcc: ");
            }
            wire.push_str(&recipient.to);
            wire.push_str("\r\n");
        }

        wire.push_str(&encode_subject(&self.subject));
        wire.push_str("MIME-Version: 1.0\r\n");
        wire.push_str("Content-Type: text/html; charset=\"utf-8\"\r\n");
        wire.push_str("Content-Transfer-Encoding: base64\r\n");
        wire.push_str("\r\n");
        wire.push_str(&BASE64.encode(self.html_body.as_bytes()));

        wire
    }
}
