use crate::config::AccountConfig;
use crate::traits::{ImapConnection, MailSession, Message};
use async_imap::{Client, Session};
use async_native_tls::TlsConnector;
use async_trait::async_trait;
use futures::{AsyncRead, AsyncWrite, StreamExt, pin_mut};
use log::debug;
use std::fmt::Debug;
use tokio::net::TcpStream;
use tokio_util::compat::TokioAsyncReadCompatExt;

/// The only folder the default fetch path reads
pub const INBOX_FOLDER: &str = "INBOX";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImapConnectionFactory: Send + Sync {
    async fn connect(&self, config: &AccountConfig) -> anyhow::Result<Box<dyn ImapConnection>>;
}

pub struct RealImapConnectionFactory;

#[async_trait]
impl ImapConnectionFactory for RealImapConnectionFactory {
    async fn connect(&self, config: &AccountConfig) -> anyhow::Result<Box<dyn ImapConnection>> {
        let addr = format!("{}:{}", config.server, config.port());
        let tcp_stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to {}: {}", addr, e))?;

        if config.use_tls() {
            let tls = TlsConnector::new();
            let tls_stream = tls
                .connect(&config.server, tcp_stream.compat())
                .await
                .map_err(|e| anyhow::anyhow!("TLS connection failed: {}", e))?;
            login(Client::new(tls_stream), config).await
        } else {
            login(Client::new(tcp_stream.compat()), config).await
        }
    }
}

async fn login<T>(client: Client<T>, config: &AccountConfig) -> anyhow::Result<Box<dyn ImapConnection>>
where
    T: AsyncRead + AsyncWrite + Unpin + Debug + Send + 'static,
{
    let session = client
        .login(&config.username, &config.password)
        .await
        .map_err(|e| anyhow::anyhow!("Login failed: {:?}", e.0))?;

    Ok(Box::new(RealImapConnection { session }))
}

/// `ImapConnection` over an async-imap session.
pub struct RealImapConnection<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Debug + Send,
{
    session: Session<T>,
}

#[async_trait]
impl<T> ImapConnection for RealImapConnection<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Debug + Send,
{
    async fn select(&mut self, folder: &str) -> anyhow::Result<()> {
        self.session
            .select(folder)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to select mailbox {}: {}", folder, e))?;
        Ok(())
    }

    async fn search(&mut self, query: &str) -> anyhow::Result<Vec<u32>> {
        let found = self
            .session
            .search(query)
            .await
            .map_err(|e| anyhow::anyhow!("Search failed: {}", e))?;
        Ok(found.into_iter().collect())
    }

    async fn fetch_rfc822(&mut self, seq: u32) -> anyhow::Result<Vec<u8>> {
        let fetch_stream = self
            .session
            .fetch(seq.to_string(), "RFC822")
            .await
            .map_err(|e| anyhow::anyhow!("Fetch failed for message {}: {}", seq, e))?;
        pin_mut!(fetch_stream);

        // Drain the whole response even after the body is found
        let mut content = None;
        while let Some(fetch_result) = fetch_stream.next().await {
            let message = fetch_result
                .map_err(|e| anyhow::anyhow!("Error reading fetch result: {}", e))?;
            if content.is_none() {
                content = message.body().map(<[u8]>::to_vec);
            }
        }

        content.ok_or_else(|| anyhow::anyhow!("Message {} has no RFC822 body", seq))
    }

    async fn flag_deleted(&mut self, seq: u32) -> anyhow::Result<()> {
        let store_stream = self
            .session
            .store(seq.to_string(), "+FLAGS (\\Deleted)")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to mark message {} as deleted: {}", seq, e))?;
        pin_mut!(store_stream);

        // Consume the stream
        while let Some(result) = store_stream.next().await {
            result.map_err(|e| anyhow::anyhow!("Error reading store result: {}", e))?;
        }
        Ok(())
    }

    async fn list_folders(&mut self) -> anyhow::Result<Vec<String>> {
        let names = self
            .session
            .list(Some(""), Some("*"))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to list folders: {}", e))?;
        pin_mut!(names);

        let mut folders = Vec::new();
        while let Some(name) = names.next().await {
            let name = name.map_err(|e| anyhow::anyhow!("Error reading folder list: {}", e))?;
            folders.push(name.name().to_string());
        }
        Ok(folders)
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.session
            .close()
            .await
            .map_err(|e| anyhow::anyhow!("Close failed: {}", e))
    }

    async fn logout(&mut self) -> anyhow::Result<()> {
        self.session
            .logout()
            .await
            .map_err(|e| anyhow::anyhow!("Logout failed: {}", e))
    }
}

/// An IMAP session over `INBOX`. Deletion flags are committed when the
/// folder is closed.
pub struct ImapSession {
    conn: Box<dyn ImapConnection>,
}

impl ImapSession {
    pub fn new(conn: Box<dyn ImapConnection>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl MailSession for ImapSession {
    async fn enumerate(&mut self) -> anyhow::Result<Vec<u32>> {
        // Read-write, so that deletion flags can be stored
        self.conn.select(INBOX_FOLDER).await?;

        let mut ids = self.conn.search("ALL").await?;
        ids.sort_unstable();
        debug!("{} messages in {}", ids.len(), INBOX_FOLDER);
        Ok(ids)
    }

    async fn retrieve(&mut self, number: u32) -> anyhow::Result<Message> {
        let content = self.conn.fetch_rfc822(number).await?;
        Ok(Message {
            id: number.to_string(),
            number,
            content,
        })
    }

    async fn remove(&mut self, number: u32) -> anyhow::Result<()> {
        self.conn.flag_deleted(number).await
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.conn.close().await?;
        self.conn.logout().await
    }

    async fn release(&mut self) -> anyhow::Result<()> {
        self.conn.logout().await
    }

    fn live_handle(&mut self) -> Option<&mut dyn ImapConnection> {
        let conn: &mut dyn ImapConnection = self.conn.as_mut();
        Some(conn)
    }
}
