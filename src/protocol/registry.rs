use std::sync::RwLock;

use log::warn;

use super::message::{PlayerEvent, PlayerInfo};

/// In-memory table of currently-connected players.
///
/// Written only by the read-loop task; read concurrently by the
/// presentation side. The whole collection sits behind one lock so readers
/// always see a consistent list.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: RwLock<Vec<PlayerInfo>>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a classified player event. Returns whether the list changed.
    pub fn apply(&self, event: &PlayerEvent) -> bool {
        match event {
            PlayerEvent::Joined(player) => {
                let mut players = self.write();
                match players.iter_mut().find(|p| p.name == player.name) {
                    Some(existing) => *existing = player.clone(),
                    None => players.push(player.clone()),
                }
                true
            }
            PlayerEvent::Left { name } => {
                let mut players = self.write();
                let before = players.len();
                // Duplicate leave notifications are normal; absent is a no-op
                players.retain(|p| p.name != *name);
                players.len() != before
            }
            PlayerEvent::Snapshot(list) => {
                *self.write() = list.clone();
                true
            }
            PlayerEvent::Chat { .. } | PlayerEvent::Other => false,
        }
    }

    /// Snapshot copy of the current players, in arrival order
    pub fn players(&self) -> Vec<PlayerInfo> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Drop all players, e.g. on disconnect
    pub fn clear(&self) {
        self.write().clear();
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<PlayerInfo>> {
        self.players.read().unwrap_or_else(|poisoned| {
            warn!("player registry lock poisoned");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<PlayerInfo>> {
        self.players.write().unwrap_or_else(|poisoned| {
            warn!("player registry lock poisoned");
            poisoned.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(name: &str, ip: &str) -> PlayerEvent {
        PlayerEvent::Joined(PlayerInfo::joined(name, ip))
    }

    fn left(name: &str) -> PlayerEvent {
        PlayerEvent::Left {
            name: name.to_string(),
        }
    }

    #[test]
    fn join_inserts_one_player() {
        let registry = PlayerRegistry::new();
        assert!(registry.apply(&joined("Bob", "1.2.3.4")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.players()[0].name, "Bob");
    }

    #[test]
    fn repeated_join_updates_instead_of_duplicating() {
        let registry = PlayerRegistry::new();
        registry.apply(&joined("Bob", "1.2.3.4"));
        registry.apply(&joined("Bob", "5.6.7.8"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.players()[0].ip, "5.6.7.8");
    }

    #[test]
    fn leave_removes_and_absent_leave_is_a_noop() {
        let registry = PlayerRegistry::new();
        registry.apply(&joined("Bob", "1.2.3.4"));
        registry.apply(&joined("Alice", "5.6.7.8"));
        assert!(registry.apply(&left("Bob")));
        assert_eq!(registry.len(), 1);
        assert!(!registry.apply(&left("Bob")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.players()[0].name, "Alice");
    }

    #[test]
    fn join_leave_sequences_never_double_count() {
        let registry = PlayerRegistry::new();
        for _ in 0..3 {
            registry.apply(&joined("Bob", "1.2.3.4"));
        }
        registry.apply(&joined("Alice", "5.6.7.8"));
        assert_eq!(registry.len(), 2);
        registry.apply(&left("Carol"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn snapshot_replaces_everything_and_is_idempotent() {
        let registry = PlayerRegistry::new();
        registry.apply(&joined("Old", "9.9.9.9"));

        let snapshot = PlayerEvent::Snapshot(vec![
            PlayerInfo::joined("Bob", "1.2.3.4"),
            PlayerInfo::joined("Alice", "5.6.7.8"),
        ]);
        registry.apply(&snapshot);
        let first: Vec<String> = registry.players().into_iter().map(|p| p.name).collect();
        assert_eq!(first, vec!["Bob", "Alice"]);

        registry.apply(&snapshot);
        let second: Vec<String> = registry.players().into_iter().map(|p| p.name).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn chat_and_other_do_not_touch_the_list() {
        let registry = PlayerRegistry::new();
        registry.apply(&joined("Bob", "1.2.3.4"));
        assert!(!registry.apply(&PlayerEvent::Chat {
            name: "Bob".to_string(),
            message: "hi".to_string(),
        }));
        assert!(!registry.apply(&PlayerEvent::Other));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn snapshots_are_copies_not_views() {
        let registry = PlayerRegistry::new();
        registry.apply(&joined("Bob", "1.2.3.4"));
        let snapshot = registry.players();
        registry.clear();
        assert_eq!(snapshot.len(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn concurrent_readers_see_consistent_lists() {
        use std::sync::Arc;

        let registry = Arc::new(PlayerRegistry::new());
        let writer = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                for i in 0..200 {
                    registry.apply(&PlayerEvent::Snapshot(vec![
                        PlayerInfo::joined(format!("A{i}"), ""),
                        PlayerInfo::joined(format!("B{i}"), ""),
                    ]));
                }
            })
        };
        for _ in 0..200 {
            let players = registry.players();
            assert!(players.len() == 2 || players.is_empty());
        }
        writer.join().unwrap();
        assert_eq!(registry.len(), 2);
    }
}
