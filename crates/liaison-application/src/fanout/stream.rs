//! Receiving end of one live session.

use futures::StreamExt;
use futures::stream::BoxStream;
use liaison_core::notification::Notification;
use liaison_core::{ChannelId, UserId};
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// Notifications for one connected session, in commit order.
///
/// The underlying channel is bounded: when the session falls behind, the
/// oldest undelivered notifications are overwritten and counted in
/// [`SessionStream::dropped`]. The stream ends once the session is
/// unregistered.
pub struct SessionStream {
    channel_id: ChannelId,
    user_id: UserId,
    receiver: Receiver<Notification>,
    dropped: u64,
}

impl SessionStream {
    pub(crate) fn new(channel_id: ChannelId, user_id: UserId, receiver: Receiver<Notification>) -> Self {
        Self {
            channel_id,
            user_id,
            receiver,
            dropped: 0,
        }
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Notifications lost to back-pressure so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Waits for the next notification; `None` once the session is closed.
    pub async fn next(&mut self) -> Option<Notification> {
        loop {
            match self.receiver.recv().await {
                Ok(notification) => return Some(notification),
                Err(RecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns an already-buffered notification without waiting.
    pub fn try_next(&mut self) -> Option<Notification> {
        loop {
            match self.receiver.try_recv() {
                Ok(notification) => return Some(notification),
                Err(TryRecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Adapts the session into a `Stream`.
    pub fn into_stream(self) -> BoxStream<'static, Notification> {
        futures::stream::unfold(self, |mut session| async move {
            session.next().await.map(|notification| (notification, session))
        })
        .boxed()
    }

    fn record_lag(&mut self, skipped: u64) {
        self.dropped += skipped;
        tracing::warn!(
            user_id = %self.user_id,
            channel_id = %self.channel_id,
            skipped,
            "Session lagged; oldest notifications dropped"
        );
    }
}
