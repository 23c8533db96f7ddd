//! Polls a POP3 or IMAP mailbox, hands every message to a consumer and
//! deletes the server-side copy according to a keep/delete policy.

pub mod config;
pub mod consumers;
pub mod dispatcher;
pub mod error;
pub mod fetcher;
pub mod imap_session;
pub mod options;
pub mod policy;
pub mod pop3_session;
pub mod traits;

pub use config::{AccountConfig, AppConfig, Protocol};
pub use consumers::ConsumerRegistry;
pub use error::FetchError;
pub use fetcher::{FetchReport, MailFetcher};
pub use options::{DEFAULT_OPERATION, DeletePredicate, FetchOptions};
pub use traits::{Consumer, ImapConnection, MailSession, Message, Payload};
