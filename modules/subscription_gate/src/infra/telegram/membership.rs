use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatMemberStatus, Recipient};

use crate::config::ChannelRef;
use crate::contract::{MemberStatus, TransportError, UserId};
use crate::domain::ports::MembershipDirectory;

/// Membership lookup through `getChatMember`. The bot must be an
/// administrator of the channel for the call to succeed.
pub struct TelegramMembership {
    bot: Bot,
    channel: Recipient,
}

impl TelegramMembership {
    pub fn new(bot: Bot, channel: &ChannelRef) -> Self {
        Self {
            bot,
            channel: recipient(channel),
        }
    }
}

pub fn recipient(channel: &ChannelRef) -> Recipient {
    match channel {
        ChannelRef::Id(id) => Recipient::Id(ChatId(*id)),
        ChannelRef::Username(name) => Recipient::ChannelUsername(name.clone()),
    }
}

fn member_status(status: ChatMemberStatus) -> MemberStatus {
    match status {
        ChatMemberStatus::Owner => MemberStatus::Creator,
        ChatMemberStatus::Administrator => MemberStatus::Administrator,
        ChatMemberStatus::Member => MemberStatus::Member,
        ChatMemberStatus::Restricted => MemberStatus::Restricted,
        ChatMemberStatus::Left => MemberStatus::Left,
        ChatMemberStatus::Banned => MemberStatus::Kicked,
    }
}

#[async_trait]
impl MembershipDirectory for TelegramMembership {
    async fn member_status(&self, user: UserId) -> Result<MemberStatus, TransportError> {
        let member = self
            .bot
            .get_chat_member(self.channel.clone(), teloxide::types::UserId(user.0))
            .await?;
        Ok(member_status(member.status()))
    }
}
