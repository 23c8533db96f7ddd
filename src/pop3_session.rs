use crate::config::AccountConfig;
use crate::traits::{MailSession, Message};
use async_trait::async_trait;
use log::debug;
use pop3::{Pop3Connection, Pop3ConnectionFactory};
use std::sync::Arc;

pub type BoxedPop3Connection = Box<dyn Pop3Connection + Send>;

// Factory trait for creating connections
#[cfg_attr(test, mockall::automock)]
pub trait Pop3ConnectionFactoryTrait: Send + Sync {
    fn create(&self, config: &AccountConfig) -> anyhow::Result<BoxedPop3Connection>;
}

pub struct RealPop3ConnectionFactory;

impl Pop3ConnectionFactoryTrait for RealPop3ConnectionFactory {
    fn create(&self, config: &AccountConfig) -> anyhow::Result<BoxedPop3Connection> {
        let port = config.port();

        let mut client: BoxedPop3Connection = if config.use_tls() {
            let conn = Pop3ConnectionFactory::new(&config.server, port)
                .map_err(|e| anyhow::anyhow!("TLS Connection error: {:?}", e))?;
            Box::new(conn)
        } else {
            let conn = Pop3ConnectionFactory::without_tls(&config.server, port)
                .map_err(|e| anyhow::anyhow!("Connection error: {:?}", e))?;
            Box::new(conn)
        };

        client
            .login(&config.username, &config.password)
            .map_err(|e| anyhow::anyhow!("Login error: {:?}", e))?;

        Ok(client)
    }
}

#[cfg(test)]
#[path = "./pop3_session_tests.rs"]
pub(crate) mod pop3_session_tests;

/// Opens POP3 sessions on the blocking thread pool.
pub async fn open(
    factory: Arc<dyn Pop3ConnectionFactoryTrait>,
    config: &AccountConfig,
    finish: bool,
) -> anyhow::Result<Pop3Session> {
    let config = config.clone();
    let conn = tokio::task::spawn_blocking(move || factory.create(&config)).await??;
    Ok(Pop3Session::new(conn, finish))
}

/// A POP3 session. Each message is deleted as soon as it is marked. QUIT is
/// only sent on close when `finish` is set, and always on release.
pub struct Pop3Session {
    // Moved into the blocking task for the duration of each command
    conn: Option<BoxedPop3Connection>,
    finish: bool,
}

impl Pop3Session {
    pub fn new(conn: BoxedPop3Connection, finish: bool) -> Self {
        Self {
            conn: Some(conn),
            finish,
        }
    }

    async fn with_connection<T, F>(&mut self, op: F) -> anyhow::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut (dyn Pop3Connection + Send)) -> anyhow::Result<T> + Send + 'static,
    {
        let mut conn = self
            .conn
            .take()
            .ok_or_else(|| anyhow::anyhow!("POP3 session is already closed"))?;

        let (conn, result) = tokio::task::spawn_blocking(move || {
            let result = op(conn.as_mut());
            (conn, result)
        })
        .await?;

        self.conn = Some(conn);
        result
    }

    /// Sends QUIT, which commits the deletions of this session.
    async fn terminate(&mut self) -> anyhow::Result<()> {
        if let Some(conn) = self.conn.take() {
            // The pop3 crate sends QUIT when the connection is dropped
            tokio::task::spawn_blocking(move || drop(conn)).await?;
        }
        Ok(())
    }

    /// Lets go of the connection without sending QUIT. The socket is left
    /// for the OS to tear down.
    fn detach(&mut self) {
        if let Some(conn) = self.conn.take() {
            std::mem::forget(conn);
        }
    }
}

#[async_trait]
impl MailSession for Pop3Session {
    async fn enumerate(&mut self) -> anyhow::Result<Vec<u32>> {
        self.with_connection(|client| {
            let list = client
                .list()
                .map_err(|e| anyhow::anyhow!("List error: {:?}", e))?;
            Ok(list.into_iter().map(|msg| msg.message_id).collect())
        })
        .await
    }

    async fn retrieve(&mut self, number: u32) -> anyhow::Result<Message> {
        self.with_connection(move |client| {
            // Get UIDL for unique ID
            let id = client
                .get_unique_id(number)
                .unwrap_or_else(|_| number.to_string());

            let mut content = Vec::new();
            client
                .retrieve(number, &mut content)
                .map_err(|e| anyhow::anyhow!("Retr error: {:?}", e))?;

            Ok(Message {
                id,
                number,
                content,
            })
        })
        .await
    }

    async fn remove(&mut self, number: u32) -> anyhow::Result<()> {
        self.with_connection(move |client| {
            client
                .delete(number)
                .map_err(|e| anyhow::anyhow!("Delete error: {:?}", e))
        })
        .await
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        if self.finish {
            debug!("Terminating POP3 session");
            self.terminate().await
        } else {
            // Some servers (GMail) reset POP3 access when the session is
            // terminated explicitly
            debug!("Detaching POP3 session without QUIT");
            self.detach();
            Ok(())
        }
    }

    async fn release(&mut self) -> anyhow::Result<()> {
        self.terminate().await
    }
}
