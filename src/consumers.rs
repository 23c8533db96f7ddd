/*!
 * Copyright (c) 2026 Ming Lyu, aka mingcheng
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: consumers.rs
 * Author: mingcheng <mingcheng@apache.org>
 * File Created: 2026-03-03 14:02:51
 *
 * Modified By: mingcheng <mingcheng@apache.org>
 * Last Modified: 2026-03-05 09:48:20
 */

use crate::options::DEFAULT_OPERATION;
use crate::traits::{Consumer, Payload};
use async_trait::async_trait;
use log::info;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Live-session operation of the `folders` consumer
pub const LIST_FOLDERS_OPERATION: &str = "list_folders";

/// Consumers available by name.
#[derive(Default)]
pub struct ConsumerRegistry {
    consumers: HashMap<String, Arc<dyn Consumer>>,
}

impl ConsumerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `log`, `folders` and, when a directory is
    /// given, `save` consumers.
    pub fn with_builtins(save_dir: Option<&str>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LogConsumer));
        registry.register(Arc::new(FolderListConsumer));
        if let Some(dir) = save_dir {
            registry.register(Arc::new(SaveConsumer::new(dir)));
        }
        registry
    }

    pub fn register(&mut self, consumer: Arc<dyn Consumer>) {
        self.consumers.insert(consumer.name().to_string(), consumer);
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Consumer>> {
        self.consumers.get(name).cloned()
    }
}

/// Logs a one-line summary of every message.
pub struct LogConsumer;

#[async_trait]
impl Consumer for LogConsumer {
    fn name(&self) -> &str {
        "log"
    }

    fn responds_to(&self, operation: &str) -> bool {
        operation == DEFAULT_OPERATION
    }

    async fn invoke(&self, _operation: &str, payload: Payload<'_>) -> anyhow::Result<()> {
        match payload {
            Payload::Message(message) => {
                info!(
                    "Received message {} from {} ({} bytes): {}",
                    message.id,
                    message.sender().unwrap_or_else(|| "<unknown>".to_string()),
                    message.content.len(),
                    message.subject().unwrap_or_default()
                );
                Ok(())
            }
            Payload::Session(_) => Err(anyhow::anyhow!("log consumer expects a message")),
        }
    }
}

/// Writes each message to `<dir>/<timestamp>-<id>.eml`, never overwriting
/// an existing file.
pub struct SaveConsumer {
    dir: PathBuf,
}

impl SaveConsumer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Consumer for SaveConsumer {
    fn name(&self) -> &str {
        "save"
    }

    fn responds_to(&self, operation: &str) -> bool {
        operation == DEFAULT_OPERATION
    }

    async fn invoke(&self, _operation: &str, payload: Payload<'_>) -> anyhow::Result<()> {
        let Payload::Message(message) = payload else {
            anyhow::bail!("save consumer expects a message");
        };

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", self.dir.display(), e))?;

        let timestamp = chrono::Local::now().format("%Y%m%d%H%M%S");
        // UIDLs may contain characters that are not valid in file names
        let id: String = message
            .id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let stem = format!("{}-{}", timestamp, id);

        // Same id saved twice within a second gets a numeric suffix
        let mut attempt = 0;
        let (mut file, path) = loop {
            let path = match attempt {
                0 => self.dir.join(format!("{}.eml", stem)),
                n => self.dir.join(format!("{}-{}.eml", stem, n)),
            };
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => break (file, path),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        };
        file.write_all(&message.content).await?;
        file.flush().await?;

        info!("Saved message {} to {}", message.id, path.display());
        Ok(())
    }
}

/// Live-session consumer that walks the folder list.
pub struct FolderListConsumer;

#[async_trait]
impl Consumer for FolderListConsumer {
    fn name(&self) -> &str {
        "folders"
    }

    fn responds_to(&self, operation: &str) -> bool {
        operation == LIST_FOLDERS_OPERATION
    }

    async fn invoke(&self, _operation: &str, payload: Payload<'_>) -> anyhow::Result<()> {
        let Payload::Session(conn) = payload else {
            anyhow::bail!("folders consumer expects a live session");
        };

        for folder in conn.list_folders().await? {
            info!("Folder: {}", folder);
        }
        Ok(())
    }
}
