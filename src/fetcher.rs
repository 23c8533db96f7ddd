/*!
 * Copyright (c) 2026 Ming Lyu, aka mingcheng
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: fetcher.rs
 * Author: mingcheng <mingcheng@apache.org>
 * File Created: 2026-03-02 13:47:05
 *
 * Modified By: mingcheng <mingcheng@apache.org>
 * Last Modified: 2026-03-05 10:31:44
 */

use crate::config::{AccountConfig, Protocol};
use crate::dispatcher::{dispatch_message, dispatch_session};
use crate::error::{FetchError, Result};
use crate::imap_session::{ImapConnectionFactory, ImapSession, RealImapConnectionFactory};
use crate::options::{DEFAULT_OPERATION, FetchOptions};
use crate::policy::DeletionPolicy;
use crate::pop3_session::{self, Pop3ConnectionFactoryTrait, RealPop3ConnectionFactory};
use crate::traits::{Consumer, MailSession};
use log::{debug, info, warn};
use std::sync::Arc;

#[cfg(test)]
#[path = "./fetcher_tests.rs"]
mod fetcher_tests;

/// Counts of a completed cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    pub dispatched: usize,
    pub deleted: usize,
}

/// Runs fetch-dispatch-delete cycles against one account.
pub struct MailFetcher {
    config: AccountConfig,
    consumer: Option<Arc<dyn Consumer>>,
    pop3_factory: Arc<dyn Pop3ConnectionFactoryTrait>,
    imap_factory: Arc<dyn ImapConnectionFactory>,
}

impl MailFetcher {
    pub fn new(config: AccountConfig, consumer: Option<Arc<dyn Consumer>>) -> Self {
        Self {
            config,
            consumer,
            pop3_factory: Arc::new(RealPop3ConnectionFactory),
            imap_factory: Arc::new(RealImapConnectionFactory),
        }
    }

    // For testing
    #[allow(dead_code)]
    pub fn new_with_factories(
        config: AccountConfig,
        consumer: Option<Arc<dyn Consumer>>,
        pop3_factory: Arc<dyn Pop3ConnectionFactoryTrait>,
        imap_factory: Arc<dyn ImapConnectionFactory>,
    ) -> Self {
        Self {
            config,
            consumer,
            pop3_factory,
            imap_factory,
        }
    }

    /// Fetches every pending message, hands it to the consumer and applies
    /// the deletion policy.
    ///
    /// Consumer validation happens before any connection is opened. Any
    /// later failure aborts the rest of the cycle.
    pub async fn fetch(&self, options: FetchOptions) -> Result<FetchReport> {
        let options = options.resolve();
        let consumer = self.check_consumer(&options)?;

        info!(
            "Fetching mail for {} from {}:{} over {}",
            self.config.username,
            self.config.server,
            self.config.port(),
            self.config.protocol
        );

        let mut session: Box<dyn MailSession> = match self.config.protocol {
            Protocol::Pop => Box::new(
                pop3_session::open(self.pop3_factory.clone(), &self.config, options.finish)
                    .await?,
            ),
            Protocol::Imap => Box::new(ImapSession::new(
                self.imap_factory.connect(&self.config).await?,
            )),
        };

        let report = drive(session.as_mut(), consumer, &options).await?;

        info!(
            "[{}] Dispatched {} messages, deleted {}",
            self.config.username, report.dispatched, report.deleted
        );
        Ok(report)
    }

    fn check_consumer(&self, options: &FetchOptions) -> Result<&dyn Consumer> {
        let consumer = self.consumer.as_deref().ok_or(FetchError::NoConsumer)?;

        // Only the lone default operation is checked up front; custom
        // operation lists are resolved at dispatch time.
        if options.is_default_operation() && !consumer.responds_to(DEFAULT_OPERATION) {
            return Err(FetchError::ConsumerInterface {
                consumer: consumer.name().to_string(),
            });
        }

        Ok(consumer)
    }
}

async fn drive(
    session: &mut dyn MailSession,
    consumer: &dyn Consumer,
    options: &FetchOptions,
) -> Result<FetchReport> {
    if options.use_live_session {
        if let Some(handle) = session.live_handle() {
            let outcome = dispatch_session(consumer, &options.operations, handle).await;

            // The consumer owns the session; all that is left is to let go of it
            if let Err(e) = session.release().await {
                warn!("Failed to release session after live dispatch: {:#}", e);
            }
            return outcome.map(|_| FetchReport::default());
        }
        warn!("Live-session mode is only available over IMAP, iterating messages instead");
    }

    match process_messages(session, consumer, options).await {
        Ok(report) => {
            if let Err(e) = session.close().await {
                release_after_failure(session).await;
                return Err(e.into());
            }
            Ok(report)
        }
        Err(e) => {
            release_after_failure(session).await;
            Err(e)
        }
    }
}

async fn process_messages(
    session: &mut dyn MailSession,
    consumer: &dyn Consumer,
    options: &FetchOptions,
) -> Result<FetchReport> {
    let policy = DeletionPolicy::from_options(options);
    let numbers = session.enumerate().await?;
    debug!("{} messages pending", numbers.len());

    let mut report = FetchReport::default();
    for number in numbers {
        let message = session.retrieve(number).await?;

        dispatch_message(consumer, &options.operations, &message).await?;
        report.dispatched += 1;

        if policy.should_delete(&message) {
            session.remove(number).await?;
            report.deleted += 1;
            debug!("Deleted message {}", message.id);
        }
    }

    Ok(report)
}

async fn release_after_failure(session: &mut dyn MailSession) {
    if let Err(e) = session.release().await {
        warn!("Failed to release session after error: {:#}", e);
    }
}
