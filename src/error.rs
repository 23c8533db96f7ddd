/*!
 * Copyright (c) 2026 Ming Lyu, aka mingcheng
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: error.rs
 * Author: mingcheng <mingcheng@apache.org>
 * File Created: 2026-03-02 10:12:40
 *
 * Modified By: mingcheng <mingcheng@apache.org>
 * Last Modified: 2026-03-04 18:03:11
 */

use thiserror::Error;

/// Errors surfaced by a fetch cycle.
///
/// The first two variants are raised before any network I/O takes place.
/// Everything else aborts the cycle midway, without telling the caller how
/// many messages were already dispatched or deleted.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("A consumer must be resolved before mail can be fetched")]
    NoConsumer,

    #[error(
        "Consumer `{consumer}` should at least respond to `receive`. \
         Alternately, configure the operations to invoke on each message explicitly"
    )]
    ConsumerInterface { consumer: String },

    #[error("Consumer `{consumer}` does not respond to `{operation}`")]
    UnknownOperation { consumer: String, operation: String },

    #[error("Consumer operation `{operation}` failed: {reason:#}")]
    Consumer {
        operation: String,
        reason: anyhow::Error,
    },

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FetchError>;
