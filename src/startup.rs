//! One-off work done before polling starts.

use crate::error::{ErrorKind, Result};
use drivebot_cache::SubscriberSet;
use drivebot_render::{Language, Localizer, MessageKey};
use drivebot_telegram::{BotCommand, OutgoingText, Transport};
use exn::ResultExt;
use std::time::Duration;

/// Publishes the command menu and discards updates queued while offline.
pub async fn prepare(transport: &dyn Transport, localizer: &Localizer) -> Result<()> {
    let commands = [
        BotCommand::new("start", localizer.get(Language::English, MessageKey::CommandHome)),
        BotCommand::new("search", localizer.get(Language::English, MessageKey::CommandSearch)),
    ];
    transport.set_commands(&commands).await.or_raise(|| ErrorKind::Transport)?;
    transport.drop_pending_updates().await.or_raise(|| ErrorKind::Transport)?;
    Ok(())
}

/// Sends `message` to every known subscriber, pausing between sends.
/// Failed sends are skipped. Returns how many were delivered.
pub async fn broadcast(transport: &dyn Transport, subscribers: &SubscriberSet, message: &str, pause: Duration) -> usize {
    let recipients = subscribers.snapshot();
    if recipients.is_empty() {
        return 0;
    }
    tracing::info!(subscribers = recipients.len(), "Broadcasting startup message");
    let text = OutgoingText::plain(message);
    let mut delivered = 0;
    for chat_id in recipients {
        match transport.send_message(chat_id, &text).await {
            Ok(_) => delivered += 1,
            Err(err) => tracing::debug!(chat_id, error = %err, "Broadcast send failed"),
        }
        tokio::time::sleep(pause).await;
    }
    tracing::info!(delivered, "Broadcast complete");
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivebot_telegram::{MockTransport, Recorded};

    #[tokio::test]
    async fn test_prepare_sets_commands_then_drops_pending() {
        let transport = MockTransport::default();
        let localizer = Localizer::new(Language::English).unwrap();
        prepare(&transport, &localizer).await.unwrap();
        assert_eq!(
            transport.recorded().await,
            vec![
                Recorded::CommandsSet(vec!["start".into(), "search".into()]),
                Recorded::PendingDropped
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_broadcast_reaches_every_subscriber() {
        let dir = tempfile::tempdir().unwrap();
        let subscribers = SubscriberSet::load(dir.path().join("users.json")).await;
        for id in [1, 2, 3] {
            subscribers.register(id).await.unwrap();
        }
        let transport = MockTransport::default();
        let delivered = broadcast(&transport, &subscribers, "Back ❤", Duration::from_millis(50)).await;
        assert_eq!(delivered, 3);
        assert_eq!(transport.texts().await, vec!["Back ❤"; 3]);
    }

    #[tokio::test]
    async fn test_broadcast_ignores_failures() {
        let dir = tempfile::tempdir().unwrap();
        let subscribers = SubscriberSet::load(dir.path().join("users.json")).await;
        subscribers.register(1).await.unwrap();
        let transport = MockTransport::default();
        transport.set_fail_sends(true);
        assert_eq!(broadcast(&transport, &subscribers, "hi", Duration::ZERO).await, 0);
        assert!(transport.recorded().await.is_empty());
    }
}
