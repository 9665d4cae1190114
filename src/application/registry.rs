use crate::domain::order::{Decision, PendingApproval, RequestId};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::warn;

/// Outcome of a reviewer decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// This call won the request; the caller owns its context now.
    Resolved(PendingApproval),
    /// Unknown id, or another decision got there first.
    NotFound,
}

/// Requests waiting for a reviewer, keyed by the reviewer channel's id.
///
/// An entry's presence is what marks it unresolved: `resolve` removes it
/// under the lock, so at most one caller ever receives a given context.
#[derive(Default)]
pub struct ApprovalRegistry {
    pending: Mutex<HashMap<RequestId, PendingApproval>>,
}

impl ApprovalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pending request. Returns `false` and leaves the existing
    /// entry untouched when the id is already taken.
    pub async fn submit(&self, approval: PendingApproval) -> bool {
        let mut pending = self.pending.lock().await;
        if pending.contains_key(&approval.request_id) {
            warn!(
                request_id = approval.request_id,
                user = approval.user,
                "Duplicate approval request id, ignoring"
            );
            return false;
        }
        pending.insert(approval.request_id, approval);
        true
    }

    pub async fn resolve(&self, request_id: RequestId, decision: Decision) -> Resolution {
        match self.pending.lock().await.remove(&request_id) {
            Some(approval) => Resolution::Resolved(approval),
            None => {
                warn!(request_id, ?decision, "No pending request for decision");
                Resolution::NotFound
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, request_id: RequestId) -> bool {
        self.pending.lock().await.contains_key(&request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asset::{Asset, Direction, Language};
    use crate::domain::quote::{Amount, Quote};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn approval(request_id: RequestId, user: u64) -> PendingApproval {
        PendingApproval {
            request_id,
            user,
            username: None,
            language: Language::English,
            direction: Direction::Buy,
            asset: Asset::new("BTC"),
            amount: Amount::new(dec!(0.01)).unwrap(),
            quote: Quote {
                price: dec!(60000),
                base: dec!(600),
                fee: dec!(18),
                total: dec!(618),
            },
            payout_wallet: "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".to_string(),
        }
    }

    #[tokio::test]
    async fn test_resolve_twice_delivers_once() {
        let registry = ApprovalRegistry::new();
        assert!(registry.submit(approval(1, 7)).await);

        let first = registry.resolve(1, Decision::Approve).await;
        assert_eq!(first, Resolution::Resolved(approval(1, 7)));
        assert_eq!(
            registry.resolve(1, Decision::Reject).await,
            Resolution::NotFound
        );
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_duplicate_submit_is_noop() {
        let registry = ApprovalRegistry::new();
        assert!(registry.submit(approval(5, 1)).await);
        assert!(!registry.submit(approval(5, 2)).await);

        match registry.resolve(5, Decision::Approve).await {
            Resolution::Resolved(ctx) => assert_eq!(ctx.user, 1),
            Resolution::NotFound => panic!("expected the first submission"),
        }
    }

    #[tokio::test]
    async fn test_unknown_id_not_found() {
        let registry = ApprovalRegistry::new();
        assert_eq!(
            registry.resolve(99, Decision::Reject).await,
            Resolution::NotFound
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_resolution_single_winner() {
        let registry = Arc::new(ApprovalRegistry::new());
        registry.submit(approval(3, 7)).await;

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let registry = Arc::clone(&registry);
                let decision = if i % 2 == 0 {
                    Decision::Approve
                } else {
                    Decision::Reject
                };
                tokio::spawn(async move { registry.resolve(3, decision).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if let Resolution::Resolved(_) = handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
