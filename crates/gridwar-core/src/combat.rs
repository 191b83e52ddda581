//! Combat resolver: per-attack state machine and damage application.
//!
//! An attack moves through
//!
//! ```text
//! Idle -> OptionSelected -> TargetChosen -> Resolved
//! ```
//!
//! [`CombatResolver::select`] and [`CombatResolver::choose_target`] only
//! validate and record; nothing is spent until [`CombatResolver::resolve`].
//! Any rejection returns the resolver to `Idle` and leaves both units exactly
//! as they were.
//!
//! # Damage split
//!
//! With penetration `p` and shredding `s` (percent):
//!
//! ```text
//! direct       = floor(raw * p / 100)           -> health
//! remaining    = raw - direct
//! armor_damage = floor(remaining * s / 100)     -> armor pool of the hit location
//! blocked      = remaining - armor_damage       -> stopped outright
//! absorbed     = min(armor_damage, armor left)
//! overflow     = floor((armor_damage - absorbed) * 100 / s)  -> health
//! ```
//!
//! so `direct + armor_damage + blocked == raw` for every roll.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::attack::AttackOption;
use crate::error::{ActionError, ActionResult, Resource};
use crate::unit::{Unit, UnitId};
use crate::weapon::Weapon;

/// Where the combat resolver is in the current attack.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttackPhase {
    /// Nothing selected.
    #[default]
    Idle,
    /// An option passed weapon validation.
    OptionSelected,
    /// A target is in range and its hit chance is known.
    TargetChosen,
    /// The last shot has been resolved.
    Resolved,
}

/// Armor zone struck by a hit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HitLocation {
    /// Head armor pool
    Head,
    /// Body armor pool
    Body,
}

/// Breakdown of one damage roll.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DamageReport {
    /// Rolled damage
    pub raw: u32,
    /// Penetrating part, applied to health
    pub direct: u32,
    /// Shredding part, aimed at the armor pool
    pub armor_damage: u32,
    /// Part of `armor_damage` the armor pool soaked up
    pub absorbed: u32,
    /// Non-penetrating, non-shredding remainder
    pub blocked: u32,
    /// Armor damage beyond the pool, converted back to health damage
    pub overflow: u32,
}

impl DamageReport {
    /// Splits `raw` damage against an armor pool holding `armor_left`.
    ///
    /// Percentages above 100 are treated as 100. With zero shredding no armor
    /// damage is dealt, so there is never an overflow to convert.
    #[must_use]
    pub fn split(raw: u32, penetration: u32, shredding: u32, armor_left: u32) -> Self {
        let penetration = u64::from(penetration.min(100));
        let shredding = shredding.min(100);

        let direct = narrow(u64::from(raw) * penetration / 100);
        let remaining = raw - direct;
        let armor_damage = narrow(u64::from(remaining) * u64::from(shredding) / 100);
        let blocked = remaining - armor_damage;
        let absorbed = armor_damage.min(armor_left);
        let overflow = if shredding == 0 {
            0
        } else {
            narrow(u64::from(armor_damage - absorbed) * 100 / u64::from(shredding))
        };

        Self {
            raw,
            direct,
            armor_damage,
            absorbed,
            blocked,
            overflow,
        }
    }

    /// Total health loss: direct plus overflow.
    #[must_use]
    pub const fn health_damage(&self) -> u32 {
        self.direct.saturating_add(self.overflow)
    }
}

/// Results of `a * b / 100` with `a <= u32::MAX` and `b <= 100` always fit.
fn narrow(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Everything that happened in one resolved shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackReport {
    /// Shooter
    pub attacker: UnitId,
    /// Target
    pub target: UnitId,
    /// Option used
    pub option: AttackOption,
    /// Clamped hit chance in percent
    pub hit_chance: f32,
    /// Roll in `[0, 100)`; hits when `roll <= hit_chance`
    pub roll: f32,
    /// Struck location, `None` on a miss
    pub location: Option<HitLocation>,
    /// Damage breakdown, `None` on a miss
    pub damage: Option<DamageReport>,
    /// AP spent on the shot
    pub ap_spent: u32,
    /// Stamina spent on the shot
    pub stamina_spent: u32,
    /// The shot destroyed the target
    pub target_destroyed: bool,
}

impl AttackReport {
    /// The shot connected.
    #[must_use]
    pub const fn is_hit(&self) -> bool {
        self.damage.is_some()
    }
}

/// Stateful resolver for one attack at a time.
///
/// # Example
///
/// ```
/// use gridwar_core::{AttackOption, AttackPhase, Attributes, CombatResolver, Control, Faction, Unit, UnitId, UnitStats, WeaponTemplate};
/// use lattice::GridCoord;
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
///
/// let spawn = |id, faction, x| {
///     let mut unit = Unit::new(
///         "u", faction, Control::Autonomous, GridCoord::new(x, 0),
///         Attributes::default(), UnitStats::default(), WeaponTemplate::pistol().instantiate(),
///     );
///     unit.id = UnitId::new(id);
///     unit
/// };
/// let mut shooter = spawn(1, Faction::Ally, 0);
/// let mut target = spawn(2, Faction::Enemy, 3);
///
/// let mut combat = CombatResolver::new();
/// combat.select(&shooter, AttackOption::AimedShot).unwrap();
/// combat.choose_target(&shooter, &target).unwrap();
///
/// let mut rng = ChaCha8Rng::seed_from_u64(1);
/// let report = combat.resolve(&mut shooter, &mut target, &mut rng).unwrap();
///
/// assert_eq!(report.ap_spent, 3);
/// assert_eq!(shooter.weapon.magazine, 7);
/// assert_eq!(combat.phase(), AttackPhase::OptionSelected);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombatResolver {
    phase: AttackPhase,
    option: Option<AttackOption>,
    target: Option<UnitId>,
    hit_chance: f32,
}

impl CombatResolver {
    /// Creates an idle resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> AttackPhase {
        self.phase
    }

    /// Selected option, if any.
    #[must_use]
    pub const fn option(&self) -> Option<AttackOption> {
        self.option
    }

    /// Chosen target, if any.
    #[must_use]
    pub const fn target(&self) -> Option<UnitId> {
        self.target
    }

    /// Hit chance computed by the last [`CombatResolver::choose_target`].
    #[must_use]
    pub const fn hit_chance(&self) -> Option<f32> {
        match self.phase {
            AttackPhase::TargetChosen => Some(self.hit_chance),
            _ => None,
        }
    }

    /// Drops any selection and returns to `Idle`.
    pub fn cancel(&mut self) {
        *self = Self::default();
    }

    /// Picks an option for `attacker`'s weapon.
    ///
    /// # Errors
    ///
    /// - [`ActionError::WeaponDepleted`] if durability is zero
    /// - [`ActionError::OptionUnavailable`] if the weapon's tags do not offer it
    /// - [`ActionError::InsufficientResources`] if a ranged option finds the
    ///   magazine empty
    ///
    /// On error the resolver is `Idle`.
    pub fn select(&mut self, attacker: &Unit, option: AttackOption) -> ActionResult<()> {
        self.cancel();
        check_weapon(&attacker.weapon, option)?;
        self.phase = AttackPhase::OptionSelected;
        self.option = Some(option);
        debug!(attacker = %attacker.id, %option, "attack option selected");
        Ok(())
    }

    /// Aims the selected option at `target` and returns the clamped hit chance.
    ///
    /// May be called again from `TargetChosen` to switch targets.
    ///
    /// # Errors
    ///
    /// - [`ActionError::AttackNotReady`] if no option is selected
    /// - [`ActionError::UnitDestroyed`] if the target is already down
    /// - [`ActionError::TargetOutOfRange`] if the target is beyond weapon range
    ///
    /// A rejected target leaves the selected option in place.
    pub fn choose_target(&mut self, attacker: &Unit, target: &Unit) -> ActionResult<f32> {
        let option = match (self.phase, self.option) {
            (AttackPhase::OptionSelected | AttackPhase::TargetChosen, Some(option)) => option,
            _ => return Err(ActionError::AttackNotReady { phase: self.phase }),
        };
        if !target.is_active() {
            return Err(ActionError::UnitDestroyed(target.id));
        }

        let distance = attacker.position.world_distance(target.position);
        if distance > attacker.weapon.range {
            return Err(ActionError::TargetOutOfRange {
                distance,
                range: attacker.weapon.range,
            });
        }

        let hit_chance = option.hit_chance(attacker, target, distance);
        self.phase = AttackPhase::TargetChosen;
        self.target = Some(target.id);
        self.hit_chance = hit_chance;
        Ok(hit_chance)
    }

    /// Fires the chosen option at the chosen target.
    ///
    /// Order of effects:
    ///
    /// 1. AP, stamina and weapon state are checked. A shortfall cancels the
    ///    attack with nothing spent.
    /// 2. AP and stamina are deducted; ranged options use a round.
    /// 3. `uniform(0, 100) <= hit_chance` decides the hit.
    /// 4. On a hit: head or body by the target's head weight, a damage roll,
    ///    the split applied to health and armor, and one point of weapon wear.
    /// 5. Health at zero destroys the target.
    ///
    /// Afterwards the resolver stays on the selected option if the attacker
    /// can afford another shot with it, otherwise it goes back to `Idle`.
    ///
    /// # Errors
    ///
    /// - [`ActionError::AttackNotReady`] unless a target for this attack was chosen
    /// - [`ActionError::InsufficientResources`] for missing AP, stamina or ammo
    /// - [`ActionError::WeaponDepleted`] if the weapon broke since selection
    pub fn resolve<R: Rng + ?Sized>(
        &mut self,
        attacker: &mut Unit,
        target: &mut Unit,
        rng: &mut R,
    ) -> ActionResult<AttackReport> {
        let option = match (self.phase, self.option, self.target) {
            (AttackPhase::TargetChosen, Some(option), Some(id)) if id == target.id => option,
            _ => return Err(ActionError::AttackNotReady { phase: self.phase }),
        };

        if let Err(err) = check_costs(attacker, option) {
            debug!(attacker = %attacker.id, error = %err, "attack cancelled");
            self.cancel();
            return Err(err);
        }

        let ap_spent = option.ap_cost();
        let stamina_spent = option.stamina_cost();
        attacker.spend_ap(ap_spent);
        attacker.spend_stamina(stamina_spent);
        if option.uses_ammo() {
            attacker.weapon.consume_round();
        }
        self.phase = AttackPhase::Resolved;

        let hit_chance = self.hit_chance;
        let roll = rng.gen::<f32>() * 100.0;
        let mut report = AttackReport {
            attacker: attacker.id,
            target: target.id,
            option,
            hit_chance,
            roll,
            location: None,
            damage: None,
            ap_spent,
            stamina_spent,
            target_destroyed: false,
        };

        if roll <= hit_chance {
            let location = if rng.gen::<f32>() < target.head_hit_chance {
                HitLocation::Head
            } else {
                HitLocation::Body
            };
            let raw = attacker.weapon.roll_damage(rng);
            let damage = apply_damage(&attacker.weapon, target, location, raw);
            attacker.weapon.wear();

            report.target_destroyed = target.take_health_damage(damage.health_damage());
            report.location = Some(location);
            report.damage = Some(damage);
            debug!(
                attacker = %attacker.id,
                target = %target.id,
                ?location,
                raw,
                health_damage = damage.health_damage(),
                "attack hit"
            );
        } else {
            debug!(attacker = %attacker.id, target = %target.id, roll, hit_chance, "attack missed");
        }

        if report.target_destroyed {
            info!(attacker = %attacker.id, target = %target.id, "unit destroyed");
        }

        if check_costs(attacker, option).is_ok() {
            self.phase = AttackPhase::OptionSelected;
            self.target = None;
        } else {
            self.cancel();
        }
        Ok(report)
    }
}

/// Weapon-side checks shared by selection and resolution.
fn check_weapon(weapon: &Weapon, option: AttackOption) -> ActionResult<()> {
    if weapon.is_broken() {
        return Err(ActionError::WeaponDepleted {
            weapon: weapon.name.clone(),
        });
    }
    if !option.offered_by(weapon) {
        return Err(ActionError::OptionUnavailable {
            option,
            weapon: weapon.name.clone(),
        });
    }
    if option.uses_ammo() && weapon.magazine == 0 {
        return Err(ActionError::insufficient(Resource::Ammo, 1, 0));
    }
    Ok(())
}

/// Full precondition for firing `option` once more.
pub(crate) fn check_costs(attacker: &Unit, option: AttackOption) -> ActionResult<()> {
    check_weapon(&attacker.weapon, option)?;
    if !attacker.ap.can_afford(option.ap_cost()) {
        return Err(ActionError::insufficient(
            Resource::ActionPoints,
            option.ap_cost(),
            attacker.ap.current,
        ));
    }
    if !attacker.stamina.can_afford(option.stamina_cost()) {
        return Err(ActionError::insufficient(
            Resource::Stamina,
            option.stamina_cost(),
            attacker.stamina.current,
        ));
    }
    Ok(())
}

fn apply_damage(weapon: &Weapon, target: &mut Unit, location: HitLocation, raw: u32) -> DamageReport {
    let armor = match location {
        HitLocation::Head => &mut target.head_armor,
        HitLocation::Body => &mut target.body_armor,
    };
    let damage = DamageReport::split(raw, weapon.armor_penetration, weapon.armor_shredding, armor.current);
    armor.drain(damage.absorbed);
    damage
}
