use std::collections::HashSet;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DamageEntry {
    pub attacker: Uuid,
    pub defender: Uuid,
    pub damage: u32,
    pub turn: u32,
}

/// Who hit whom during a battle; used to split experience on defeat.
#[derive(Clone, Debug, Default)]
pub struct DamageTracker {
    entries: Vec<DamageEntry>,
}

impl DamageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, attacker: Uuid, defender: Uuid, damage: u32, turn: u32) {
        self.entries.push(DamageEntry {
            attacker,
            defender,
            damage,
            turn,
        });
    }

    pub fn entries(&self) -> &[DamageEntry] {
        &self.entries
    }

    /// Distinct attackers of `defender`, in the order they first hit.
    pub fn get_attackers(&self, defender: Uuid) -> Vec<Uuid> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|entry| entry.defender == defender)
            .filter(|entry| seen.insert(entry.attacker))
            .map(|entry| entry.attacker)
            .collect()
    }

    pub fn count_hits(&self, attacker: Uuid, defender: Uuid) -> u32 {
        self.entries
            .iter()
            .filter(|entry| entry.attacker == attacker && entry.defender == defender)
            .count() as u32
    }

    pub fn total_damage(&self, attacker: Uuid, defender: Uuid) -> u32 {
        self.entries
            .iter()
            .filter(|entry| entry.attacker == attacker && entry.defender == defender)
            .map(|entry| entry.damage)
            .sum()
    }

    /// Forget every entry involving `monster` on either side.
    pub fn remove_monster(&mut self, monster: Uuid) {
        self.entries
            .retain(|entry| entry.attacker != monster && entry.defender != monster);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attackers_are_distinct_and_ordered() {
        let (a, b, c) = (Uuid::from_u128(1), Uuid::from_u128(2), Uuid::from_u128(3));
        let mut tracker = DamageTracker::new();
        tracker.log(b, c, 5, 1);
        tracker.log(a, c, 3, 1);
        tracker.log(b, c, 4, 2);
        assert_eq!(tracker.get_attackers(c), vec![b, a]);
        assert_eq!(tracker.count_hits(b, c), 2);
        assert_eq!(tracker.total_damage(b, c), 9);
    }

    #[test]
    fn removing_a_monster_drops_both_directions() {
        let (a, b) = (Uuid::from_u128(1), Uuid::from_u128(2));
        let mut tracker = DamageTracker::new();
        tracker.log(a, b, 5, 1);
        tracker.log(b, a, 5, 1);
        tracker.remove_monster(b);
        assert!(tracker.is_empty());
    }
}
