/*!
 * Copyright (c) 2026 Ming Lyu, aka mingcheng
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: options.rs
 * Author: mingcheng <mingcheng@apache.org>
 * File Created: 2026-03-02 11:05:17
 *
 * Modified By: mingcheng <mingcheng@apache.org>
 * Last Modified: 2026-03-04 16:22:48
 */

use crate::traits::Message;
use std::fmt;
use std::sync::Arc;

/// Operation invoked on each message when none is configured
pub const DEFAULT_OPERATION: &str = "receive";

pub type DeletePredicate = Arc<dyn Fn(&Message) -> bool + Send + Sync>;

/// Per-invocation options of a fetch cycle.
#[derive(Clone)]
pub struct FetchOptions {
    pub operations: Vec<String>,
    /// Keep messages on the server. Forced on when `delete_if` is set.
    pub keep: bool,
    pub delete_if: Option<DeletePredicate>,
    /// POP3 only: explicitly terminate the session after the cycle
    pub finish: bool,
    /// IMAP only: hand the open session to the consumer instead of iterating
    pub use_live_session: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            operations: vec![DEFAULT_OPERATION.to_string()],
            keep: false,
            delete_if: None,
            finish: false,
            use_live_session: false,
        }
    }
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("operations", &self.operations)
            .field("keep", &self.keep)
            .field("delete_if", &self.delete_if.as_ref().map(|_| "<predicate>"))
            .field("finish", &self.finish)
            .field("use_live_session", &self.use_live_session)
            .finish()
    }
}

impl FetchOptions {
    pub fn operations<I, S>(mut self, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operations = operations.into_iter().map(Into::into).collect();
        self
    }

    pub fn keep(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    pub fn delete_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        self.delete_if = Some(Arc::new(predicate));
        self
    }

    pub fn finish(mut self, finish: bool) -> Self {
        self.finish = finish;
        self
    }

    pub fn use_live_session(mut self, enabled: bool) -> Self {
        self.use_live_session = enabled;
        self
    }

    /// Fills in defaults. A delete predicate always implies `keep`.
    pub fn resolve(mut self) -> Self {
        if self.operations.is_empty() {
            self.operations = vec![DEFAULT_OPERATION.to_string()];
        }
        if self.delete_if.is_some() {
            self.keep = true;
        }
        self
    }

    /// True when the only configured operation is the default one
    pub fn is_default_operation(&self) -> bool {
        self.operations.len() == 1 && self.operations[0] == DEFAULT_OPERATION
    }
}
