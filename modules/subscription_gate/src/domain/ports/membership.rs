use async_trait::async_trait;

use crate::contract::{MemberStatus, TransportError, UserId};

/// Membership lookup in the gated channel, provided by the messaging platform.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    async fn member_status(&self, user: UserId) -> Result<MemberStatus, TransportError>;
}
