//! Action queue of a combat round: queued, pending (scheduled for a later
//! turn) and already executed actions.

use crate::sim::effects::{Effect, EffectSource};
use crate::sim::item::Item;
use crate::sim::status::Status;
use crate::sim::technique::Technique;
use uuid::Uuid;

/// Who performs an action: a monster, or a trainer using an item.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Actor {
    Monster(Uuid),
    Trainer(usize),
}

impl Actor {
    pub fn monster(self) -> Option<Uuid> {
        match self {
            Actor::Monster(id) => Some(id),
            Actor::Trainer(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ActionMethod {
    Technique(Technique),
    Item(Item),
    Status(Status),
}

impl ActionMethod {
    pub fn slug(&self) -> &str {
        match self {
            ActionMethod::Technique(tech) => &tech.slug,
            ActionMethod::Item(item) => &item.slug,
            ActionMethod::Status(status) => &status.slug,
        }
    }

    pub fn sort(&self) -> &str {
        match self {
            ActionMethod::Technique(tech) => tech.sort.as_str(),
            ActionMethod::Item(item) => &item.sort,
            ActionMethod::Status(status) => &status.sort,
        }
    }

    pub fn effects(&self) -> &[Effect] {
        match self {
            ActionMethod::Technique(tech) => &tech.effects,
            ActionMethod::Item(item) => &item.effects,
            ActionMethod::Status(status) => &status.effects,
        }
    }

    pub fn source(&self) -> EffectSource {
        match self {
            ActionMethod::Technique(_) => EffectSource::Technique,
            ActionMethod::Item(_) => EffectSource::Item,
            ActionMethod::Status(_) => EffectSource::Status,
        }
    }

    pub fn accuracy(&self) -> f64 {
        match self {
            ActionMethod::Technique(tech) => tech.accuracy,
            _ => 1.0,
        }
    }

    pub fn potency(&self) -> f64 {
        match self {
            ActionMethod::Technique(tech) => tech.potency,
            _ => 1.0,
        }
    }

    pub fn technique(&self) -> Option<&Technique> {
        match self {
            ActionMethod::Technique(tech) => Some(tech),
            _ => None,
        }
    }

    pub fn item(&self) -> Option<&Item> {
        match self {
            ActionMethod::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<&Status> {
        match self {
            ActionMethod::Status(status) => Some(status),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnqueuedAction {
    pub user: Actor,
    pub method: ActionMethod,
    pub target: Uuid,
    pub turn: u32,
    pub riddle_reward: Option<u64>,
    /// Released from the pending list rather than chosen this round.
    pub scheduled: bool,
}

impl EnqueuedAction {
    pub fn new(user: Actor, method: ActionMethod, target: Uuid, turn: u32) -> Self {
        Self {
            user,
            method,
            target,
            turn,
            riddle_reward: None,
            scheduled: false,
        }
    }

    pub fn involves(&self, monster: Uuid) -> bool {
        self.target == monster || self.user.monster() == Some(monster)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ActionQueue {
    queue: Vec<EnqueuedAction>,
    pending: Vec<EnqueuedAction>,
    history: Vec<EnqueuedAction>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, action: EnqueuedAction) {
        self.queue.push(action);
    }

    /// Schedule an action for `action.turn` instead of the current round.
    pub fn add_pending(&mut self, action: EnqueuedAction) {
        self.pending.push(action);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn queue(&self) -> &[EnqueuedAction] {
        &self.queue
    }

    pub fn pending(&self) -> &[EnqueuedAction] {
        &self.pending
    }

    pub fn history(&self) -> &[EnqueuedAction] {
        &self.history
    }

    /// Stable sort by `key`: lower keys run first, equal keys keep their
    /// queue order. Keys are computed once per action.
    pub fn sort<F>(&mut self, mut key: F)
    where
        F: FnMut(&EnqueuedAction) -> (usize, i64),
    {
        let mut keyed: Vec<((usize, i64), EnqueuedAction)> = self
            .queue
            .drain(..)
            .map(|action| (key(&action), action))
            .collect();
        keyed.sort_by_key(|(key, _)| *key);
        self.queue = keyed.into_iter().map(|(_, action)| action).collect();
    }

    pub fn pop_next(&mut self) -> Option<EnqueuedAction> {
        if self.queue.is_empty() {
            None
        } else {
            Some(self.queue.remove(0))
        }
    }

    pub fn record(&mut self, action: EnqueuedAction) {
        self.history.push(action);
    }

    /// Drop queued and pending actions whose user or target is `monster`.
    pub fn remove_monster(&mut self, monster: Uuid) -> usize {
        let before = self.queue.len() + self.pending.len();
        self.queue.retain(|action| !action.involves(monster));
        self.pending.retain(|action| !action.involves(monster));
        before - self.queue.len() - self.pending.len()
    }

    /// Move pending actions due by `turn` into the queue, dropping those
    /// `keep` rejects.
    pub fn release_pending<F>(&mut self, turn: u32, mut keep: F) -> usize
    where
        F: FnMut(&EnqueuedAction) -> bool,
    {
        let (due, later): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|action| action.turn <= turn);
        self.pending = later;
        let mut released = 0;
        for action in due.into_iter().filter(|action| keep(action)) {
            self.queue.push(action);
            released += 1;
        }
        released
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.pending.clear();
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::technique::{Range, TechSort};

    fn action(user: u128, target: u128, slug: &str) -> EnqueuedAction {
        let tech = Technique::new(slug, TechSort::Damage, Range::Melee);
        EnqueuedAction::new(
            Actor::Monster(Uuid::from_u128(user)),
            ActionMethod::Technique(tech),
            Uuid::from_u128(target),
            1,
        )
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let mut queue = ActionQueue::new();
        queue.enqueue(action(1, 9, "first"));
        queue.enqueue(action(2, 9, "second"));
        queue.enqueue(action(3, 9, "meta"));
        queue.sort(|action| if action.method.slug() == "meta" { (0, 0) } else { (1, -10) });
        let order: Vec<&str> = queue.queue().iter().map(|a| a.method.slug()).collect();
        assert_eq!(order, vec!["meta", "first", "second"]);
    }

    #[test]
    fn faster_actions_first() {
        let mut queue = ActionQueue::new();
        queue.enqueue(action(1, 9, "slow"));
        queue.enqueue(action(2, 9, "fast"));
        queue.sort(|action| if action.method.slug() == "fast" { (5, -90) } else { (5, -20) });
        assert_eq!(queue.pop_next().map(|a| a.method.slug().to_string()), Some("fast".to_string()));
    }

    #[test]
    fn removing_monster_drops_its_actions() {
        let mut queue = ActionQueue::new();
        queue.enqueue(action(1, 9, "a"));
        queue.enqueue(action(9, 1, "b"));
        queue.enqueue(action(2, 3, "c"));
        assert_eq!(queue.remove_monster(Uuid::from_u128(9)), 2);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn pending_released_when_due() {
        let mut queue = ActionQueue::new();
        let mut later = action(1, 2, "later");
        later.turn = 3;
        queue.add_pending(later);
        assert_eq!(queue.release_pending(2, |_| true), 0);
        assert_eq!(queue.release_pending(3, |_| true), 1);
        assert!(queue.pending().is_empty());
        assert_eq!(queue.len(), 1);
    }
}
