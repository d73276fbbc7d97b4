//! Effect pipeline: the closed set of things a technique, item or status
//! can do, and how their results combine.

mod combat;
mod condition;
mod flow;

use crate::config::CombatConfig;
use crate::db::DataStore;
use crate::error::{CombatError, CombatResult, DataError};
use crate::sim::context::CombatContext;
use crate::sim::damage::StatOp;
use crate::sim::damage_tracker::DamageTracker;
use crate::sim::queue::{ActionMethod, Actor};
use crate::sim::stats::StatType;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which side of an action an effect lands on.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    #[default]
    Target,
    User,
}

/// One stat adjustment carried by a `statchange` effect. `hp` adjusts
/// current HP, never the maximum.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatChange {
    pub stat: StatType,
    pub value: f64,
    #[serde(default)]
    pub max_deviation: u32,
    #[serde(default = "default_op")]
    pub operation: StatOp,
    #[serde(default, rename = "overridetofull")]
    pub override_to_full: bool,
}

fn default_op() -> StatOp {
    StatOp::Add
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EffectSource {
    Technique,
    Item,
    Status,
}

impl EffectSource {
    pub fn as_str(self) -> &'static str {
        match self {
            EffectSource::Technique => "technique",
            EffectSource::Item => "item",
            EffectSource::Status => "status",
        }
    }
}

/// When during a round an effect is evaluated. Techniques and items only
/// act in their perform phase; statuses react to several.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EffectPhase {
    /// Before the host's own action runs.
    PreChecking,
    /// After the host's own action ran.
    PerformTech,
    PerformItem,
    /// The status' own turn.
    PerformStatus,
    /// End-of-action sweep over every monster in play.
    CheckPartyHp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    Damage,
    PowerDamage {
        #[serde(default)]
        objective: Objective,
    },
    Healing {
        #[serde(default)]
        objective: Objective,
    },
    Give {
        status: String,
        #[serde(default)]
        objective: Objective,
    },
    Remove {
        status: String,
        #[serde(default)]
        objective: Objective,
    },
    #[serde(rename = "statchange")]
    StatChange { changes: Vec<StatChange> },
    Buff { stat: StatType, percentage: f64 },
    Experience {
        #[serde(default)]
        amount: Option<u64>,
    },
    Recover { divisor: u32 },
    #[serde(rename = "lifeleech")]
    LifeLeech { divisor: u32 },
    Poisoned { divisor: u32 },
    #[serde(rename = "noddingoff")]
    NoddingOff { chance: f64 },
    Sacrifice { multiplier: f64 },
    /// Strike the same target again `turns` rounds later, with power equal
    /// to `turns`.
    Foresight { turns: u32 },
    Capture,
    Run,
    Forfeit,
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::Damage => "damage",
            Effect::PowerDamage { .. } => "power_damage",
            Effect::Healing { .. } => "healing",
            Effect::Give { .. } => "give",
            Effect::Remove { .. } => "remove",
            Effect::StatChange { .. } => "statchange",
            Effect::Buff { .. } => "buff",
            Effect::Experience { .. } => "experience",
            Effect::Recover { .. } => "recover",
            Effect::LifeLeech { .. } => "lifeleech",
            Effect::Poisoned { .. } => "poisoned",
            Effect::NoddingOff { .. } => "noddingoff",
            Effect::Sacrifice { .. } => "sacrifice",
            Effect::Foresight { .. } => "foresight",
            Effect::Capture => "capture",
            Effect::Run => "run",
            Effect::Forfeit => "forfeit",
        }
    }

    pub fn accepts(&self, source: EffectSource) -> bool {
        use EffectSource::*;
        match self {
            Effect::Damage
            | Effect::PowerDamage { .. }
            | Effect::Healing { .. }
            | Effect::Experience { .. }
            | Effect::Sacrifice { .. }
            | Effect::Foresight { .. }
            | Effect::Run
            | Effect::Forfeit => source == Technique,
            Effect::Give { .. } | Effect::Remove { .. } => source != Status,
            Effect::StatChange { .. }
            | Effect::Recover { .. }
            | Effect::LifeLeech { .. }
            | Effect::Poisoned { .. }
            | Effect::NoddingOff { .. } => source == Status,
            Effect::Buff { .. } | Effect::Capture => source == Item,
        }
    }

    /// Load-time checks for values the formulas cannot handle.
    pub fn validate(&self, table: &str, slug: &str) -> Result<(), DataError> {
        let invalid = |message: &str| DataError::Invalid {
            table: table.to_string(),
            slug: slug.to_string(),
            message: format!("{}: {message}", self.name()),
        };
        match self {
            Effect::Recover { divisor } | Effect::LifeLeech { divisor } | Effect::Poisoned { divisor }
                if *divisor == 0 =>
            {
                Err(invalid("divisor must be > 0"))
            }
            Effect::NoddingOff { chance } if !(0.0..=1.0).contains(chance) => {
                Err(invalid("chance must be within 0..=1"))
            }
            Effect::Sacrifice { multiplier } if !(0.0..=1.0).contains(multiplier) => {
                Err(invalid("multiplier must be within 0..=1"))
            }
            Effect::Foresight { turns } if *turns == 0 => Err(invalid("turns must be > 0")),
            _ => Ok(()),
        }
    }

    /// Run this effect for one `(user, target)` pair.
    pub fn apply(&self, env: &mut EffectEnv<'_>, call: &Invocation<'_>) -> CombatResult<EffectResult> {
        let source = call.method.source();
        if !self.accepts(source) {
            return Err(CombatError::IncompatibleEffect {
                effect: self.name().to_string(),
                method: source.as_str().to_string(),
            });
        }
        match self {
            Effect::Damage => combat::damage(env, call),
            Effect::PowerDamage { objective } => combat::power_damage(env, call, *objective),
            Effect::Healing { objective } => combat::healing(env, call, *objective),
            Effect::Sacrifice { multiplier } => combat::sacrifice(env, call, *multiplier),
            Effect::Give { status, objective } => condition::give(env, call, status, *objective),
            Effect::Remove { status, objective } => condition::remove(env, call, status, *objective),
            Effect::StatChange { changes } => condition::stat_change(env, call, changes),
            Effect::Buff { stat, percentage } => condition::buff(env, call, *stat, *percentage),
            Effect::Recover { divisor } => condition::recover(env, call, *divisor),
            Effect::LifeLeech { divisor } => condition::lifeleech(env, call, *divisor),
            Effect::Poisoned { divisor } => condition::poisoned(env, call, *divisor),
            Effect::NoddingOff { chance } => condition::nodding_off(env, call, *chance),
            Effect::Experience { amount } => flow::experience(env, call, *amount),
            Effect::Foresight { turns } => flow::foresight(call, *turns),
            Effect::Capture => flow::capture(env, call),
            Effect::Run => flow::run(env, call),
            Effect::Forfeit => flow::forfeit(env, call),
        }
    }
}

/// Outcome of one or more effects. Combine with [`EffectResult::merge`].
#[derive(Clone, Debug, PartialEq)]
pub struct EffectResult {
    pub name: String,
    pub success: bool,
    pub damage: u32,
    pub element_multiplier: f64,
    pub should_tackle: bool,
    pub num_shakes: u32,
    pub extras: Vec<String>,
    pub statuses: Vec<String>,
    /// Technique slug that replaces the host's chosen action.
    pub replacement: Option<String>,
    pub escaped: bool,
    pub captured: Option<Uuid>,
    /// Rounds until a delayed copy of the technique strikes.
    pub scheduled_in: Option<u32>,
}

impl EffectResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: false,
            damage: 0,
            element_multiplier: 1.0,
            should_tackle: false,
            num_shakes: 0,
            extras: Vec::new(),
            statuses: Vec::new(),
            replacement: None,
            escaped: false,
            captured: None,
            scheduled_in: None,
        }
    }

    pub fn merge(&mut self, other: EffectResult) {
        self.success |= other.success;
        self.damage = self.damage.saturating_add(other.damage);
        if other.element_multiplier != 1.0 {
            self.element_multiplier = other.element_multiplier;
        }
        self.should_tackle |= other.should_tackle;
        self.num_shakes = self.num_shakes.max(other.num_shakes);
        self.extras.extend(other.extras);
        self.statuses.extend(other.statuses);
        if other.replacement.is_some() {
            self.replacement = other.replacement;
        }
        self.escaped |= other.escaped;
        if other.captured.is_some() {
            self.captured = other.captured;
        }
        if other.scheduled_in.is_some() {
            self.scheduled_in = other.scheduled_in;
        }
    }
}

/// Everything an effect may read or mutate.
pub struct EffectEnv<'a> {
    pub ctx: &'a mut CombatContext,
    pub db: &'a dyn DataStore,
    pub config: &'a CombatConfig,
    pub rng: &'a mut SmallRng,
    pub damage: &'a mut DamageTracker,
    pub turn: u32,
}

/// One evaluation request: who uses what on whom, and when.
pub struct Invocation<'m> {
    pub method: &'m ActionMethod,
    pub user: Actor,
    pub target: Uuid,
    /// The user's accuracy roll for this round.
    pub hit_roll: f64,
    pub phase: EffectPhase,
    /// Experience granted by a riddle that produced this action.
    pub riddle_reward: Option<u64>,
}

impl Invocation<'_> {
    pub fn user_monster(&self) -> Option<Uuid> {
        self.user.monster()
    }

    fn objective(&self, objective: Objective) -> Option<Uuid> {
        match objective {
            Objective::Target => Some(self.target),
            Objective::User => self.user_monster(),
        }
    }

    fn hits(&self) -> bool {
        self.method.accuracy() >= self.hit_roll
    }
}

/// Apply `effects` in order and merge their results.
pub fn apply_effects(
    env: &mut EffectEnv<'_>,
    call: &Invocation<'_>,
    effects: &[Effect],
) -> CombatResult<EffectResult> {
    let mut merged = EffectResult::new(call.method.slug());
    for effect in effects {
        let result = effect.apply(env, call)?;
        merged.merge(result);
    }
    Ok(merged)
}
