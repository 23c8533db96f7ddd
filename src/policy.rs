/*!
 * Copyright (c) 2026 Ming Lyu, aka mingcheng
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: policy.rs
 * Author: mingcheng <mingcheng@apache.org>
 * File Created: 2026-03-02 11:40:55
 *
 * Modified By: mingcheng <mingcheng@apache.org>
 * Last Modified: 2026-03-03 09:14:31
 */

use crate::options::{DeletePredicate, FetchOptions};
use crate::traits::Message;

/// Decides whether a processed message is removed from the server.
#[derive(Clone)]
pub struct DeletionPolicy {
    keep: bool,
    delete_if: Option<DeletePredicate>,
}

impl DeletionPolicy {
    pub fn new(keep: bool, delete_if: Option<DeletePredicate>) -> Self {
        Self { keep, delete_if }
    }

    pub fn from_options(options: &FetchOptions) -> Self {
        Self::new(options.keep, options.delete_if.clone())
    }

    pub fn should_delete(&self, message: &Message) -> bool {
        match &self.delete_if {
            Some(predicate) => predicate(message),
            None => !self.keep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn message(subject: &str) -> Message {
        Message {
            id: "1".to_string(),
            number: 1,
            content: format!("Subject: {}\r\n\r\nbody", subject).into_bytes(),
        }
    }

    #[test]
    fn test_delete_unless_keep() {
        assert!(DeletionPolicy::new(false, None).should_delete(&message("a")));
        assert!(!DeletionPolicy::new(true, None).should_delete(&message("a")));
    }

    #[test]
    fn test_predicate_is_sole_authority() {
        let predicate: DeletePredicate =
            Arc::new(|m: &Message| m.subject().as_deref() == Some("drop me"));

        for keep in [true, false] {
            let policy = DeletionPolicy::new(keep, Some(predicate.clone()));
            assert!(policy.should_delete(&message("drop me")));
            assert!(!policy.should_delete(&message("keep me")));
        }
    }

    #[test]
    fn test_from_resolved_options() {
        let options = FetchOptions::default().delete_if(|_| false).resolve();
        let policy = DeletionPolicy::from_options(&options);
        assert!(!policy.should_delete(&message("anything")));
    }
}
