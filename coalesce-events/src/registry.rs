use std::collections::HashMap;
use std::sync::Arc;

use crate::handler::Handler;

pub(crate) type SharedHandler<P> = Arc<dyn Handler<P>>;

pub(crate) struct Subscription<P> {
    pub(crate) token: String,
    pub(crate) handler: SharedHandler<P>,
}

/// Subscribers of one topic, in subscription order.
pub(crate) struct TopicEntry<P> {
    /// Registration order of the topic, used for enumeration and drain order.
    pub(crate) seq: u64,
    pub(crate) subscribers: Vec<Subscription<P>>,
}

/// What happened to an existing subscription on insert.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Inserted {
    New,
    Replaced,
}

/// Topic -> subscribers map. A topic is present iff it has a subscriber.
pub(crate) struct Registry<P> {
    topics: HashMap<String, TopicEntry<P>>,
    next_seq: u64,
}

impl<P> Registry<P> {
    pub(crate) fn new() -> Self {
        Self {
            topics: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Store `handler` under `(topic, token)`. An existing subscription with
    /// the same token keeps its position and gets the new handler.
    pub(crate) fn insert(&mut self, topic: &str, token: String, handler: SharedHandler<P>) -> Inserted {
        let next_seq = &mut self.next_seq;
        let entry = self.topics.entry(topic.to_string()).or_insert_with(|| {
            let seq = *next_seq;
            *next_seq += 1;
            TopicEntry {
                seq,
                subscribers: Vec::new(),
            }
        });

        if let Some(existing) = entry.subscribers.iter_mut().find(|s| s.token == token) {
            existing.handler = handler;
            return Inserted::Replaced;
        }
        entry.subscribers.push(Subscription { token, handler });
        Inserted::New
    }

    /// Remove one subscription, dropping the topic once it is empty.
    pub(crate) fn remove(&mut self, topic: &str, token: &str) -> bool {
        let Some(entry) = self.topics.get_mut(topic) else {
            return false;
        };
        let before = entry.subscribers.len();
        entry.subscribers.retain(|s| s.token != token);
        let removed = entry.subscribers.len() != before;
        if entry.subscribers.is_empty() {
            self.topics.remove(topic);
        }
        removed
    }

    pub(crate) fn remove_topic(&mut self, topic: &str) -> bool {
        self.topics.remove(topic).is_some()
    }

    pub(crate) fn clear(&mut self) {
        self.topics.clear();
    }

    pub(crate) fn get(&self, topic: &str) -> Option<&TopicEntry<P>> {
        self.topics.get(topic)
    }

    pub(crate) fn handler(&self, topic: &str, token: &str) -> Option<SharedHandler<P>> {
        self.topics
            .get(topic)?
            .subscribers
            .iter()
            .find(|s| s.token == token)
            .map(|s| s.handler.clone())
    }

    pub(crate) fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, |e| e.subscribers.len())
    }

    /// Topics in registration order.
    pub(crate) fn active_topics(&self) -> Vec<String> {
        let mut topics: Vec<(&String, u64)> =
            self.topics.iter().map(|(name, entry)| (name, entry.seq)).collect();
        topics.sort_by_key(|(_, seq)| *seq);
        topics.into_iter().map(|(name, _)| name.clone()).collect()
    }
}
