use async_trait::async_trait;

use crate::contract::{ConversationId, MessageRef, Screen, TransportError};

/// Outbound side of the conversation. Implementations render the screen and
/// deliver it through the platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_screen(&self, chat: ConversationId, screen: &Screen)
        -> Result<(), TransportError>;

    async fn edit_screen(&self, message: MessageRef, screen: &Screen)
        -> Result<(), TransportError>;

    /// Answer a button press. With `alert`, the user sees a dismissible popup.
    async fn answer_callback(&self, query_id: &str, alert: Option<&str>)
        -> Result<(), TransportError>;
}
