pub mod ai;
pub mod battle;
pub mod condition;
pub mod context;
pub mod damage;
pub mod damage_tracker;
pub mod effects;
pub mod element;
pub mod faint_handler;
pub mod item;
pub mod modifier;
pub mod monster;
pub mod queue;
pub mod stats;
pub mod status;
pub mod switching;
pub mod technique;

pub use monster::Monster;
pub use technique::Technique;

use rand::Rng;
use uuid::Uuid;

/// Random (v4) id drawn from `rng`, so seeded battles stay reproducible.
pub fn new_instance_id<R: Rng + ?Sized>(rng: &mut R) -> Uuid {
    uuid::Builder::from_random_bytes(rng.gen()).into_uuid()
}
