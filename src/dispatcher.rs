/*!
 * Copyright (c) 2026 Ming Lyu, aka mingcheng
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: dispatcher.rs
 * Author: mingcheng <mingcheng@apache.org>
 * File Created: 2026-03-02 11:21:09
 *
 * Modified By: mingcheng <mingcheng@apache.org>
 * Last Modified: 2026-03-04 17:52:36
 */

use crate::error::{FetchError, Result};
use crate::traits::{Consumer, ImapConnection, Message, Payload};
use log::debug;

/// Invokes every operation on the consumer with the message, in order.
pub async fn dispatch_message(
    consumer: &dyn Consumer,
    operations: &[String],
    message: &Message,
) -> Result<()> {
    for operation in operations {
        debug!(
            "Dispatching message {} to {}::{}",
            message.id,
            consumer.name(),
            operation
        );
        invoke(consumer, operation, Payload::Message(message)).await?;
    }
    Ok(())
}

/// Hands the open session to every operation on the consumer, in order.
pub async fn dispatch_session(
    consumer: &dyn Consumer,
    operations: &[String],
    session: &mut dyn ImapConnection,
) -> Result<()> {
    for operation in operations {
        debug!(
            "Dispatching live session to {}::{}",
            consumer.name(),
            operation
        );
        let handle: &mut dyn ImapConnection = &mut *session;
        invoke(consumer, operation, Payload::Session(handle)).await?;
    }
    Ok(())
}

async fn invoke(consumer: &dyn Consumer, operation: &str, payload: Payload<'_>) -> Result<()> {
    if !consumer.responds_to(operation) {
        return Err(FetchError::UnknownOperation {
            consumer: consumer.name().to_string(),
            operation: operation.to_string(),
        });
    }

    consumer
        .invoke(operation, payload)
        .await
        .map_err(|reason| FetchError::Consumer {
            operation: operation.to_string(),
            reason,
        })
}
