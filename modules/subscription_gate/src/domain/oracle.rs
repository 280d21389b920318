use std::sync::Arc;

use tracing::{debug, error, instrument};

use crate::contract::UserId;
use crate::domain::ports::MembershipDirectory;

/// Answers whether a user is subscribed to the gated channel.
///
/// Fails closed: when the lookup itself fails, the user is treated as not
/// subscribed and the failure is logged, never returned.
#[derive(Clone)]
pub struct SubscriptionOracle {
    directory: Arc<dyn MembershipDirectory>,
}

impl SubscriptionOracle {
    pub fn new(directory: Arc<dyn MembershipDirectory>) -> Self {
        Self { directory }
    }

    #[instrument(
        name = "subscription_gate.oracle.is_subscribed",
        skip(self),
        fields(user_id = %user)
    )]
    pub async fn is_subscribed(&self, user: UserId) -> bool {
        match self.directory.member_status(user).await {
            Ok(status) => {
                debug!(status = status.as_str(), "membership resolved");
                status.grants_access()
            }
            Err(e) => {
                error!(error = %e, "subscription check failed, treating as not subscribed");
                false
            }
        }
    }
}
