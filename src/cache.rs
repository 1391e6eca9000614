use lru::LruCache;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// A message as remembered for channel context.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedMessage {
    pub message_id: u64,
    pub author_id: u64,
    pub author_name: String,
    pub content: String,
    pub is_bot: bool,
}

/// Recent messages per channel. The least recently active channels are
/// evicted first; each channel keeps only its newest `per_channel` messages.
#[derive(Clone)]
pub struct MessageCache {
    channels: Arc<Mutex<LruCache<u64, VecDeque<CachedMessage>>>>,
    per_channel: usize,
}

impl MessageCache {
    pub fn new(max_channels: usize, per_channel: usize) -> Self {
        let cap = NonZeroUsize::new(max_channels).unwrap_or(NonZeroUsize::MIN);
        Self {
            channels: Arc::new(Mutex::new(LruCache::new(cap))),
            per_channel: per_channel.max(1),
        }
    }

    pub fn insert(&self, channel_id: u64, message: CachedMessage) {
        let Ok(mut channels) = self.channels.lock() else {
            return;
        };
        let history = channels.get_or_insert_mut(channel_id, VecDeque::new);
        if history.iter().any(|m| m.message_id == message.message_id) {
            return;
        }
        history.push_back(message);
        while history.len() > self.per_channel {
            history.pop_front();
        }
    }

    /// Up to `limit` most recent messages, oldest first.
    pub fn get_channel_history(&self, channel_id: u64, limit: usize) -> Vec<CachedMessage> {
        let Ok(mut channels) = self.channels.lock() else {
            return Vec::new();
        };
        match channels.get(&channel_id) {
            Some(history) => {
                let skip = history.len().saturating_sub(limit);
                history.iter().skip(skip).cloned().collect()
            }
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_message(id: u64, content: &str) -> CachedMessage {
        CachedMessage {
            message_id: id,
            author_id: 1,
            author_name: "User".to_string(),
            content: content.to_string(),
            is_bot: false,
        }
    }

    #[test]
    fn test_per_channel_bound() {
        let cache = MessageCache::new(10, 3);
        for i in 1..=5 {
            cache.insert(100, mock_message(i, &format!("Message {}", i)));
        }
        let history = cache.get_channel_history(100, 10);
        let ids: Vec<u64> = history.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![3, 4, 5]);

        let last_two = cache.get_channel_history(100, 2);
        assert_eq!(last_two.iter().map(|m| m.message_id).collect::<Vec<_>>(), vec![4, 5]);
    }

    #[test]
    fn test_duplicate_insert_ignored() {
        let cache = MessageCache::new(10, 5);
        cache.insert(100, mock_message(1, "hello"));
        cache.insert(100, mock_message(1, "hello"));
        assert_eq!(cache.get_channel_history(100, 10).len(), 1);
    }

    #[test]
    fn test_channel_lru_eviction() {
        let cache = MessageCache::new(2, 5);
        cache.insert(1, mock_message(1, "a"));
        cache.insert(2, mock_message(2, "b"));
        // Touch channel 1 so channel 2 becomes least recently used
        assert_eq!(cache.get_channel_history(1, 5).len(), 1);
        cache.insert(3, mock_message(3, "c"));

        assert_eq!(cache.get_channel_history(1, 5).len(), 1);
        assert!(cache.get_channel_history(2, 5).is_empty());
        assert_eq!(cache.get_channel_history(3, 5).len(), 1);
    }
}
