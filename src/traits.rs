/*!
 * Copyright (c) 2026 Ming Lyu, aka mingcheng
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: traits.rs
 * Author: mingcheng <mingcheng@apache.org>
 * File Created: 2026-02-12 15:38:23
 *
 * Modified By: mingcheng <mingcheng@apache.org>
 * Last Modified: 2026-03-04 17:40:02
 */

use async_trait::async_trait;
use mail_parser::MessageParser;

/// A message retrieved from the server, kept as raw RFC 822 bytes.
#[derive(Debug, Clone)]
pub struct Message {
    /// UIDL for POP3 (falls back to the message number), sequence number for IMAP
    pub id: String,
    /// Protocol message number used for retrieval and deletion
    pub number: u32,
    pub content: Vec<u8>,
}

impl Message {
    pub fn subject(&self) -> Option<String> {
        let parsed = MessageParser::default().parse(self.content.as_slice())?;
        parsed.subject().map(str::to_string)
    }

    pub fn message_id(&self) -> Option<String> {
        let parsed = MessageParser::default().parse(self.content.as_slice())?;
        parsed.message_id().map(str::to_string)
    }

    pub fn sender(&self) -> Option<String> {
        let parsed = MessageParser::default().parse(self.content.as_slice())?;
        parsed
            .from()
            .and_then(|from| from.first())
            .and_then(|addr| addr.address())
            .map(str::to_string)
    }
}

/// What a consumer operation is invoked with.
pub enum Payload<'a> {
    Message(&'a Message),
    /// The open IMAP connection, handed over in live-session mode
    Session(&'a mut dyn ImapConnection),
}

/// Receiver of fetched mail, resolved by name outside the fetch cycle.
#[async_trait]
pub trait Consumer: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the consumer declares the named operation
    fn responds_to(&self, operation: &str) -> bool;

    async fn invoke(&self, operation: &str, payload: Payload<'_>) -> anyhow::Result<()>;
}

/// An authenticated IMAP connection. Exposed to consumers in live-session
/// mode, so it covers more than the default fetch path needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImapConnection: Send {
    async fn select(&mut self, folder: &str) -> anyhow::Result<()>;

    async fn search(&mut self, query: &str) -> anyhow::Result<Vec<u32>>;

    /// Full raw content (`RFC822`) of the message with sequence number `seq`
    async fn fetch_rfc822(&mut self, seq: u32) -> anyhow::Result<Vec<u8>>;

    /// Sets `\Deleted` on `seq`; removal happens on close
    async fn flag_deleted(&mut self, seq: u32) -> anyhow::Result<()>;

    async fn list_folders(&mut self) -> anyhow::Result<Vec<String>>;

    /// Closes the selected folder, expunging flagged messages
    async fn close(&mut self) -> anyhow::Result<()>;

    async fn logout(&mut self) -> anyhow::Result<()>;
}

/// One open mail session, driven through the same sequence for both protocols.
#[async_trait]
pub trait MailSession: Send {
    /// Snapshot of the message numbers pending at cycle start, in order
    async fn enumerate(&mut self) -> anyhow::Result<Vec<u32>>;

    async fn retrieve(&mut self, number: u32) -> anyhow::Result<Message>;

    /// Deletes (POP3) or flags for deletion (IMAP) a single message
    async fn remove(&mut self, number: u32) -> anyhow::Result<()>;

    /// Normal end of a cycle
    async fn close(&mut self) -> anyhow::Result<()>;

    /// Tears the session down without committing anything. Used on failure
    /// and after live-session dispatch.
    async fn release(&mut self) -> anyhow::Result<()>;

    /// The underlying connection, for sessions that support live dispatch
    fn live_handle(&mut self) -> Option<&mut dyn ImapConnection> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_accessors() {
        let message = Message {
            id: "1".to_string(),
            number: 1,
            content: b"From: Alice <alice@example.com>\r\n\
                       Message-ID: <abc@example.com>\r\n\
                       Subject: Hello there\r\n\
                       \r\n\
                       body"
                .to_vec(),
        };

        assert_eq!(message.subject().as_deref(), Some("Hello there"));
        assert_eq!(message.message_id().as_deref(), Some("abc@example.com"));
        assert_eq!(message.sender().as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn test_headerless_message() {
        let message = Message {
            id: "2".to_string(),
            number: 2,
            content: Vec::new(),
        };
        assert!(message.subject().is_none());
    }
}
