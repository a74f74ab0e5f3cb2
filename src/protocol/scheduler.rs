use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Delayed command dispatch with duplicate coalescing.
///
/// Pending commands are keyed by their text. A coalesced schedule of a
/// command already pending is dropped, leaving the existing timer
/// untouched; the UI double-firing a popup command therefore sends once.
#[derive(Debug, Clone, Default)]
pub struct CommandScheduler {
    pending: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl CommandScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `text` to be pushed to `sink` after `delay`.
    ///
    /// Returns whether a timer was armed; `false` means the request was
    /// coalesced into an already-pending duplicate.
    pub async fn schedule(
        &self,
        text: &str,
        coalesce: bool,
        delay: Duration,
        sink: mpsc::Sender<String>,
    ) -> bool {
        let mut pending = self.pending.lock().await;
        pending.retain(|_, timer| !timer.is_finished());

        if coalesce && pending.contains_key(text) {
            debug!("coalesced duplicate delayed command: {}", text);
            return false;
        }

        let key = text.to_string();
        let line = format!("{}\n", text);
        let registry = Arc::clone(&self.pending);
        let timer = tokio::spawn({
            let key = key.clone();
            async move {
                tokio::time::sleep(delay).await;
                registry.lock().await.remove(&key);
                if sink.send(line).await.is_err() {
                    // Connection went away while the timer was running
                    debug!("dropped delayed command, writer closed: {}", key);
                }
            }
        });
        pending.insert(key, timer);
        true
    }

    /// Number of timers currently armed
    pub async fn pending_count(&self) -> usize {
        let mut pending = self.pending.lock().await;
        pending.retain(|_, timer| !timer.is_finished());
        pending.len()
    }

    /// Abort every pending timer; used on disconnect
    pub async fn cancel_all(&self) {
        let mut pending = self.pending.lock().await;
        for (text, timer) in pending.drain() {
            debug!("cancelling delayed command: {}", text);
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (mpsc::Sender<String>, mpsc::Receiver<String>) {
        mpsc::channel(16)
    }

    #[tokio::test(start_paused = true)]
    async fn coalesced_duplicates_send_once() {
        let scheduler = CommandScheduler::new();
        let (tx, mut rx) = channel();

        assert!(
            scheduler
                .schedule("kick bob", true, Duration::from_millis(100), tx.clone())
                .await
        );
        assert!(
            !scheduler
                .schedule("kick bob", true, Duration::from_millis(100), tx.clone())
                .await
        );

        assert_eq!(rx.recv().await.as_deref(), Some("kick bob\n"));
        // Let any stray duplicate timer fire before checking
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn uncoalesced_duplicates_send_twice() {
        let scheduler = CommandScheduler::new();
        let (tx, mut rx) = channel();

        scheduler
            .schedule("say hi", false, Duration::from_millis(50), tx.clone())
            .await;
        scheduler
            .schedule("say hi", false, Duration::from_millis(50), tx.clone())
            .await;

        assert_eq!(rx.recv().await.as_deref(), Some("say hi\n"));
        assert_eq!(rx.recv().await.as_deref(), Some("say hi\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_commands_are_independent() {
        let scheduler = CommandScheduler::new();
        let (tx, mut rx) = channel();

        scheduler
            .schedule("kick bob", true, Duration::from_millis(50), tx.clone())
            .await;
        scheduler
            .schedule("kick alice", true, Duration::from_millis(50), tx.clone())
            .await;
        assert_eq!(scheduler.pending_count().await, 2);

        let mut sent = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
        sent.sort();
        assert_eq!(sent, vec!["kick alice\n", "kick bob\n"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_suppresses_pending_sends() {
        let scheduler = CommandScheduler::new();
        let (tx, mut rx) = channel();

        scheduler
            .schedule("kick bob", true, Duration::from_millis(100), tx.clone())
            .await;
        scheduler.cancel_all().await;
        assert_eq!(scheduler.pending_count().await, 0);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn fired_timers_no_longer_coalesce() {
        let scheduler = CommandScheduler::new();
        let (tx, mut rx) = channel();

        scheduler
            .schedule("kick bob", true, Duration::from_millis(20), tx.clone())
            .await;
        assert_eq!(rx.recv().await.as_deref(), Some("kick bob\n"));

        // The first timer is done; the same text must schedule again
        assert!(
            scheduler
                .schedule("kick bob", true, Duration::from_millis(20), tx.clone())
                .await
        );
        assert_eq!(rx.recv().await.as_deref(), Some("kick bob\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn closed_sink_is_tolerated() {
        let scheduler = CommandScheduler::new();
        let (tx, rx) = channel();
        drop(rx);

        scheduler
            .schedule("kick bob", true, Duration::from_millis(10), tx)
            .await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(scheduler.pending_count().await, 0);
    }
}
