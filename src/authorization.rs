//! Review authorization. Staff identity comes from configuration; the
//! check is a plain membership test.

use std::collections::HashSet;

pub trait Authorizer: Send + Sync {
    fn can_review(&self, actor_id: &str) -> bool;
}

pub struct StaffRoster {
    reviewers: HashSet<String>,
}

impl StaffRoster {
    pub fn new(reviewer_ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            reviewers: reviewer_ids.into_iter().collect(),
        }
    }
}

impl Authorizer for StaffRoster {
    fn can_review(&self, actor_id: &str) -> bool {
        self.reviewers.contains(actor_id)
    }
}

/// Test double that accepts everyone.
#[cfg(test)]
pub struct AllowAll;

#[cfg(test)]
impl Authorizer for AllowAll {
    fn can_review(&self, _actor_id: &str) -> bool {
        true
    }
}
