use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slots = HashMap<String, Arc<AsyncMutex<()>>>;

/// One async mutex per chat id, created on demand and dropped when idle.
#[derive(Debug, Default)]
pub struct ChatLocks {
    slots: Mutex<Slots>,
}

impl ChatLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other holder has `chat_id`, then hold it until the guard drops.
    pub async fn lock(&self, chat_id: &str) -> ChatGuard<'_> {
        let slot = self
            .slots()
            .entry(chat_id.to_string())
            .or_default()
            .clone();
        let guard = slot.clone().lock_owned().await;
        ChatGuard {
            locks: self,
            chat_id: chat_id.to_string(),
            slot,
            guard: Some(guard),
        }
    }

    /// Number of chat ids currently held or waited on.
    pub fn active(&self) -> usize {
        self.slots().len()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
pub struct ChatGuard<'a> {
    locks: &'a ChatLocks,
    chat_id: String,
    slot: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ChatGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut slots = self.locks.slots();
        // The map and this guard hold the only references: nobody is waiting.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.chat_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn idle_entries_are_removed() {
        let locks = ChatLocks::new();
        {
            let _a = locks.lock("a").await;
            let _b = locks.lock("b").await;
            assert_eq!(locks.active(), 2);
        }
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn same_chat_waits_for_the_holder() {
        let locks = Arc::new(ChatLocks::new());
        let first = locks.lock("c1").await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock("c1").await;
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(first);
        contender.await.unwrap();
        assert_eq!(locks.active(), 0);
    }
}
