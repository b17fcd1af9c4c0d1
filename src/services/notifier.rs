//! Alert delivery interface.

use crate::error::NotifyError;
use crate::models::position::MessageHandle;

#[async_trait::async_trait]
pub trait Notifier {
    /// Send a new message, returning a handle that allows editing it later
    async fn send(&self, chat_id: &str, text: &str) -> Result<MessageHandle, NotifyError>;

    /// Replace the text of a previously sent message
    async fn edit(&self, chat_id: &str, handle: MessageHandle, text: &str)
        -> Result<(), NotifyError>;
}
