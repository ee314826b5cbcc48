//! The per-partition combat engine.
//!
//! Borrows one map's authoritative state plus the oracle bundle and drives
//! everything that happens on a tick: status scheduling, spell cast state
//! machines, and melee attack sessions, in that fixed order for every
//! entity in ascending id order. The ordering is part of the contract —
//! effect expiry and re-cast interactions must be reproducible.
//!
//! Nothing here blocks or suspends. All waiting is a stored deadline
//! checked against `now`, and all randomness flows through seeds derived
//! from the partition's session seed and a monotonically increasing nonce,
//! so a partition tick is replayable from (state, seed, nonce).

use crate::combat::{
    DamageResult, adjust_experience, check_hit, magic_damage, physical_damage,
};
use crate::config::CombatConfig;
use crate::env::{CombatEnv, SpellDefinition, SpellKind, StatusRider, compute_seed};
use crate::error::CastError;
use crate::events::{DieMode, EffectTarget, Outbox, OutboundEvent, PersistCommand};
use crate::magnitude::Magnitude;
use crate::session::is_engageable;
use crate::spell::{CastPhase, fan_targets, line_targets};
use crate::state::{CombatantState, EntityId, MapState, Position, TimePoint};
use crate::status::{OwnerView, StatusKind, StatusPulse};

// Per-roll seed contexts. Distinct values keep the draws independent.
const CTX_CHANCE: u32 = 1;
const CTX_HIT: u32 = 2;
const CTX_SCAPEGOAT: u32 = 3;
const CTX_DAMAGE: u32 = 4;
const CTX_LUCKY: u32 = 5;

/// Drives combat for one map partition.
pub struct CombatEngine<'a> {
    state: &'a mut MapState,
    env: CombatEnv<'a>,
    outbox: &'a mut Outbox,
    session_seed: u64,
    nonce: u64,
}

impl<'a> CombatEngine<'a> {
    /// `nonce` resumes the roll counter from a previous engine instance on
    /// the same partition; pass 0 for a fresh session.
    pub fn new(
        state: &'a mut MapState,
        env: CombatEnv<'a>,
        outbox: &'a mut Outbox,
        session_seed: u64,
        nonce: u64,
    ) -> Self {
        Self {
            state,
            env,
            outbox,
            session_seed,
            nonce,
        }
    }

    /// Current roll counter, persisted by the partition between ticks.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    fn seed(&mut self, actor: EntityId, context: u32) -> u64 {
        self.nonce += 1;
        compute_seed(self.session_seed, self.nonce, actor.0, context)
    }

    // ========================================================================
    // Tick pass
    // ========================================================================

    /// One deterministic pass: statuses, then spell FSMs, then attack
    /// sessions, each over every entity in id order. Entities inserted
    /// mid-pass are picked up next tick.
    pub fn tick(&mut self, now: TimePoint) {
        let ids = self.state.ids();
        for &id in &ids {
            self.tick_statuses(now, id);
        }
        for &id in &ids {
            self.tick_spell(now, id);
        }
        for &id in &ids {
            self.tick_attack(now, id);
        }
    }

    fn tick_statuses(&mut self, now: TimePoint, id: EntityId) {
        let Some(combatant) = self.state.get(id) else {
            return;
        };
        if combatant.statuses.is_empty() {
            return;
        }
        let owner = OwnerView {
            id,
            life: combatant.resources.life,
            max_life: combatant.resources.max_life,
            alive: combatant.alive,
            position: combatant.position,
        };

        // The registry is taken out for the duration of the pass so the
        // caster-presence closure can read the rest of the map.
        let mut registry = match self.state.get_mut(id) {
            Some(c) => std::mem::take(&mut c.statuses),
            None => return,
        };
        let report = {
            let state = &*self.state;
            let near = |caster: EntityId, range: u16| {
                state
                    .get(caster)
                    .is_some_and(|c| c.alive && c.position.distance(owner.position) <= range)
            };
            registry.tick(now, &owner, &near)
        };

        let flags = registry.flags();
        if let Some(c) = self.state.get_mut(id) {
            c.statuses = registry;
        }

        for kind in &report.expired {
            self.outbox
                .persist(PersistCommand::DeleteStatus { owner: id, kind: *kind });
        }
        if report.flags_changed {
            self.outbox
                .push(OutboundEvent::StatusFlagsChanged { owner: id, flags });
        }

        for pulse in report.pulses {
            match pulse {
                StatusPulse::Damage { caster, amount, .. } => {
                    self.apply_pulse_damage(now, caster, id, amount);
                }
                StatusPulse::StaminaNudge { amount } => {
                    if let Some(c) = self.state.get_mut(id) {
                        let stamina = c.resources.stamina as i64 + amount as i64;
                        c.resources.stamina =
                            stamina.clamp(0, c.resources.max_stamina as i64) as u32;
                    }
                }
                StatusPulse::AuraRecast { spell_id, level } => {
                    self.vortex_pulse(now, id, spell_id, level);
                }
            }
        }
    }

    fn apply_pulse_damage(&mut self, now: TimePoint, caster: EntityId, owner: EntityId, amount: u32) {
        let Some(c) = self.state.get_mut(owner) else {
            return;
        };
        if !c.alive {
            return;
        }
        let lethal = c.resources.take_damage(amount);
        if lethal {
            self.kill(now, caster, owner, amount);
        }
    }

    fn vortex_pulse(&mut self, now: TimePoint, owner: EntityId, spell_id: u16, level: u8) {
        let Some(def) = self.env.spells.spell(spell_id, level).cloned() else {
            return;
        };
        let Some(center) = self.state.get(owner).map(|c| c.position) else {
            return;
        };
        let targets = self.state.in_radius(center, def.range);
        let _ = self.area_payload(now, owner, &def, targets);
    }

    // ========================================================================
    // Spell cast FSM
    // ========================================================================

    /// Validates and starts a cast. On any rejection the caster's mana,
    /// cooldown timer, and FSM state are untouched.
    pub fn begin_cast(
        &mut self,
        now: TimePoint,
        caster_id: EntityId,
        spell_id: u16,
        level: u8,
        target: EntityId,
        ground: Position,
    ) -> Result<(), CastError> {
        // Client-reported levels above the highest known entry clamp down.
        let level = match self.env.spells.max_level(spell_id) {
            Some(max) => level.min(max),
            None => level,
        };
        let def = self
            .env
            .spells
            .spell(spell_id, level)
            .cloned()
            .ok_or(CastError::UnknownSpell { id: spell_id, level })?;
        let map_id = self.state.id;
        let training = self.env.map.is_training(map_id);

        let (cast, resources, ammo, weapon_subtype, transformed, flying, origin) = {
            let c = self
                .state
                .get(caster_id)
                .ok_or(CastError::NoCaster(caster_id))?;
            (
                c.cast,
                c.resources,
                c.ammo,
                c.weapon_subtype,
                c.statuses.has(StatusKind::Transformed),
                c.is_flying(),
                c.position,
            )
        };

        if !cast.ready(now, spell_id) {
            return Err(CastError::Cooldown);
        }
        if let Some(pct) = def.chance_pct {
            if !def.auto_active {
                let seed = self.seed(caster_id, CTX_CHANCE);
                if !self.env.rng.rate(seed, pct) {
                    return Err(CastError::ChanceFailed);
                }
            }
        }
        if self.env.map.forbids_category(map_id, def.kind.category()) {
            return Err(CastError::ForbiddenHere);
        }
        if self.env.map.line_skill_only(map_id) && def.kind != SpellKind::Line {
            return Err(CastError::ForbiddenHere);
        }
        if !training {
            if !resources.can_afford(def.mana_cost, def.stamina_cost) {
                return Err(CastError::Resources);
            }
            if def.uses_ammo && ammo == 0 {
                return Err(CastError::Resources);
            }
        }
        if let Some(required) = def.weapon_subtype {
            if weapon_subtype != required {
                return Err(CastError::WrongWeapon);
            }
        }
        if transformed && def.kind != SpellKind::Transform {
            return Err(CastError::Transformed);
        }
        if flying && self.env.map.no_fly(map_id) {
            return Err(CastError::FlightRules);
        }

        // Self-directed kinds fall back to the caster when no target came in.
        let target = if target.is_none() && self_directed(def.kind) {
            caster_id
        } else {
            target
        };

        let (target, ground) = if target.is_none() {
            if !def.kind.is_ground() {
                return Err(CastError::NoTarget);
            }
            (EntityId::NONE, ground)
        } else {
            let t = self.state.get(target).ok_or(CastError::NoTarget)?;
            let distance = t.position.distance(origin);
            let view = self.env.map.view_range(map_id);
            if distance > view || (t.id != caster_id && distance > def.range) {
                return Err(CastError::NoTarget);
            }
            if !t.alive && !def.target_corpse {
                return Err(CastError::NoTarget);
            }
            // Hostile single-target payloads can never land on an
            // untargetable entity, so they reject up front; area payloads
            // filter per target at launch instead.
            if t.id != caster_id
                && matches!(
                    def.kind,
                    SpellKind::Single | SpellKind::Collide | SpellKind::AttackStatus
                )
            {
                let c = self
                    .state
                    .get(caster_id)
                    .ok_or(CastError::NoCaster(caster_id))?;
                if !self.targetable(c, t) {
                    return Err(CastError::NoTarget);
                }
            }
            (t.id, t.position)
        };

        // Validation passed; from here on we mutate.
        if let Some(c) = self.state.get_mut(caster_id) {
            // A new begin while intoning forcibly aborts the previous cast.
            let _ = c.cast.abort();
            if !training {
                c.resources.spend(def.mana_cost, def.stamina_cost);
                if def.uses_ammo {
                    c.ammo -= 1;
                }
            }
        }
        if !def.weapon_spell && !def.auto_active {
            self.outbox.push(OutboundEvent::CastAttempt {
                caster: caster_id,
                spell_id,
                level,
                target,
                ground,
            });
        }

        if def.intone_ms == 0 {
            if let Some(c) = self.state.get_mut(caster_id) {
                c.cast.spell_id = spell_id;
                c.cast.level = level;
                c.cast.target = target;
                c.cast.ground = ground;
                c.cast.start_cooldown(now, def.effective_cooldown_ms());
            }
            let result = self.launch(now, caster_id, &def, target, ground);
            self.after_launch(now, caster_id, &def, training, result.is_ok());
            result
        } else {
            if let Some(c) = self.state.get_mut(caster_id) {
                c.cast.intone(now, spell_id, level, target, ground, def.intone_ms);
            }
            Ok(())
        }
    }

    /// Post-launch phase selection: auto-repeat (or training-map) casts
    /// enter Delayed, everything else returns to Idle.
    fn after_launch(
        &mut self,
        now: TimePoint,
        caster_id: EntityId,
        def: &SpellDefinition,
        training: bool,
        launched: bool,
    ) {
        let Some(c) = self.state.get_mut(caster_id) else {
            return;
        };
        if launched && (def.auto_repeat || training) {
            c.cast.enter_delay(now, def.delay_ms, true);
        } else {
            c.cast.phase = CastPhase::Idle;
            c.cast.auto_repeat = false;
        }
    }

    fn tick_spell(&mut self, now: TimePoint, id: EntityId) {
        let Some(cast) = self.state.get(id).map(|c| c.cast) else {
            return;
        };
        match cast.phase {
            CastPhase::Idle => {}
            CastPhase::Intoning => {
                if !cast.intone_until.elapsed(now) {
                    return;
                }
                let Some(def) = self.env.spells.spell(cast.spell_id, cast.level).cloned() else {
                    self.abort_cast(id, false);
                    return;
                };
                let training = self.env.map.is_training(self.state.id);
                if let Some(c) = self.state.get_mut(id) {
                    c.cast.start_cooldown(now, def.effective_cooldown_ms());
                }
                let result = self.launch(now, id, &def, cast.target, cast.ground);
                self.after_launch(now, id, &def, training, result.is_ok());
            }
            CastPhase::Delayed => {
                if !cast.delay_until.elapsed(now) {
                    return;
                }
                if !cast.auto_repeat {
                    self.abort_cast(id, false);
                    return;
                }
                // Channeled fire never follows a target that turned into a
                // player (re-login, transform back): force-abort instead.
                let target_is_player = self
                    .state
                    .get(cast.target)
                    .is_some_and(|t| t.kind.is_player());
                if target_is_player {
                    self.abort_cast(id, true);
                    return;
                }
                if self
                    .begin_cast(now, id, cast.spell_id, cast.level, cast.target, cast.ground)
                    .is_err()
                {
                    self.abort_cast(id, false);
                }
            }
        }
    }

    /// Synchronous abort; optionally notifies the owner's client.
    pub fn abort_cast(&mut self, id: EntityId, notify: bool) {
        let Some(c) = self.state.get_mut(id) else {
            return;
        };
        if c.cast.abort() && notify {
            self.outbox.push(OutboundEvent::AbilityAborted { owner: id });
        }
    }

    // ========================================================================
    // Payload dispatch
    // ========================================================================

    fn launch(
        &mut self,
        now: TimePoint,
        caster_id: EntityId,
        def: &SpellDefinition,
        target: EntityId,
        ground: Position,
    ) -> Result<(), CastError> {
        match def.kind {
            SpellKind::Single | SpellKind::Collide => {
                self.single_payload(now, caster_id, def, target, false)
            }
            SpellKind::AttackStatus => self.single_payload(now, caster_id, def, target, true),
            SpellKind::Recruit => self.heal_payload(caster_id, def, target),
            SpellKind::Fan => {
                let origin = self.position_of(caster_id)?;
                let aim = self.aim_point(target, ground);
                let targets = fan_targets(self.state, caster_id, origin, aim, def.range);
                self.area_payload(now, caster_id, def, targets)
            }
            SpellKind::Bomb => {
                let center = self
                    .state
                    .get(target)
                    .map(|t| t.position)
                    .unwrap_or(ground);
                let targets = self.state.in_radius(center, def.range);
                self.area_payload(now, caster_id, def, targets)
            }
            SpellKind::Line => {
                let origin = self.position_of(caster_id)?;
                let aim = self.aim_point(target, ground);
                let targets =
                    line_targets(self.state, self.env.map, caster_id, origin, aim, def.range);
                self.area_payload(now, caster_id, def, targets)
            }
            SpellKind::AttachStatus => self.attach_payload(now, caster_id, def, target),
            SpellKind::DetachStatus => self.detach_payload(def, target),
            SpellKind::DispatchXp => self.dispatch_xp_payload(def, target),
            SpellKind::Transform => self.transform_payload(now, caster_id, def),
            SpellKind::RestoreMana => self.restore_mana_payload(def, target),
            SpellKind::Summon => {
                let template = def
                    .summon_template
                    .ok_or(CastError::PayloadFault("summon spell without template"))?;
                self.outbox.push(OutboundEvent::SummonRequested {
                    owner: caster_id,
                    template,
                });
                Ok(())
            }
            SpellKind::GroundSting => self.ground_sting_payload(now, caster_id, def, ground),
            SpellKind::Vortex => {
                let armed = self
                    .state
                    .get(caster_id)
                    .is_some_and(|c| c.statuses.has(StatusKind::Vortex));
                if armed {
                    self.vortex_pulse(now, caster_id, def.id, def.level);
                    Ok(())
                } else {
                    self.attach_payload(now, caster_id, def, caster_id)
                }
            }
            SpellKind::Dismount => self.dismount_payload(caster_id, target),
            SpellKind::DismountArea => {
                let center = self.position_of(caster_id)?;
                let targets = self.state.in_radius(center, def.range);
                for id in targets {
                    let _ = self.dismount_payload(caster_id, id);
                }
                Ok(())
            }
            SpellKind::MountToggle => self.mount_toggle_payload(now, caster_id, def),
        }
    }

    fn position_of(&self, id: EntityId) -> Result<Position, CastError> {
        self.state
            .get(id)
            .map(|c| c.position)
            .ok_or(CastError::NoCaster(id))
    }

    fn aim_point(&self, target: EntityId, ground: Position) -> Position {
        self.state
            .get(target)
            .map(|t| t.position)
            .unwrap_or(ground)
    }

    /// Single-target damage; with `rider` the spell's status attaches on a
    /// successful hit.
    fn single_payload(
        &mut self,
        now: TimePoint,
        caster_id: EntityId,
        def: &SpellDefinition,
        target_id: EntityId,
        rider: bool,
    ) -> Result<(), CastError> {
        let caster = self
            .state
            .get(caster_id)
            .ok_or(CastError::NoCaster(caster_id))?
            .clone();
        let Some(target) = self.state.get(target_id).cloned() else {
            return Err(CastError::NoTarget);
        };
        if !self.targetable(&caster, &target) {
            return Err(CastError::NoTarget);
        }

        let result = self.spell_damage(&caster, &target, def, caster_id);
        let damage = self.lucky_roll(&caster, caster_id, result.damage);
        let (lethal, life_before) = match self.state.get_mut(target_id) {
            Some(t) => {
                let before = t.resources.life;
                (t.resources.take_damage(damage), before)
            }
            None => return Err(CastError::NoTarget),
        };

        if rider {
            if let Some(r) = def.rider {
                self.attach_status(now, caster_id, target_id, def, r);
            }
        }

        self.outbox.push_effect(
            caster_id,
            Some((def.id, def.level)),
            &[EffectTarget {
                id: target_id,
                damage,
                lethal,
            }],
        );
        self.award_spell_experience(caster_id, target_id, damage, life_before);
        if lethal {
            self.kill(now, caster_id, target_id, damage);
        }
        Ok(())
    }

    /// Shared area apply loop: filter, per-target damage with an
    /// independent lucky roll, experience, kill flow, chunked broadcast.
    fn area_payload(
        &mut self,
        now: TimePoint,
        caster_id: EntityId,
        def: &SpellDefinition,
        candidates: Vec<EntityId>,
    ) -> Result<(), CastError> {
        let caster = self
            .state
            .get(caster_id)
            .ok_or(CastError::NoCaster(caster_id))?
            .clone();
        let mut hits: Vec<EffectTarget> = Vec::new();
        let mut kills: Vec<(EntityId, u32)> = Vec::new();

        for target_id in candidates {
            if target_id == caster_id {
                continue;
            }
            let Some(target) = self.state.get(target_id).cloned() else {
                continue;
            };
            if !self.targetable(&caster, &target) {
                continue;
            }
            let result = self.spell_damage(&caster, &target, def, caster_id);
            let damage = self.lucky_roll(&caster, caster_id, result.damage);

            let (lethal, life_before) = match self.state.get_mut(target_id) {
                Some(t) => {
                    let before = t.resources.life;
                    (t.resources.take_damage(damage), before)
                }
                None => continue,
            };
            hits.push(EffectTarget {
                id: target_id,
                damage,
                lethal,
            });
            self.award_spell_experience(caster_id, target_id, damage, life_before);
            if lethal {
                kills.push((target_id, damage));
            }
        }

        self.outbox
            .push_effect(caster_id, Some((def.id, def.level)), &hits);
        for (victim, damage) in kills {
            self.kill(now, caster_id, victim, damage);
        }
        Ok(())
    }

    fn spell_damage(
        &mut self,
        caster: &CombatantState,
        target: &CombatantState,
        def: &SpellDefinition,
        caster_id: EntityId,
    ) -> DamageResult {
        if def.weapon_spell {
            let seed = self.seed(caster_id, CTX_DAMAGE);
            physical_damage(caster, target, def.power, self.env.rng, seed)
        } else {
            magic_damage(caster, target, def.power)
        }
    }

    fn lucky_roll(&mut self, caster: &CombatantState, caster_id: EntityId, damage: u32) -> u32 {
        if caster.statuses.has(StatusKind::LuckyAura) {
            let seed = self.seed(caster_id, CTX_LUCKY);
            if self.env.rng.coin(seed) {
                return damage.saturating_mul(2);
            }
        }
        damage
    }

    /// Area/single payload target filter: alive, attackable, not a corpse
    /// marker, flight rules, and PK rules between players.
    fn targetable(&self, caster: &CombatantState, target: &CombatantState) -> bool {
        if !target.is_attackable() {
            return false;
        }
        if target.statuses.has(StatusKind::Ghost) || target.statuses.has(StatusKind::CorpseSeal) {
            return false;
        }
        if target.is_flying() && !caster.is_flying() && !caster.is_ranged() {
            return false;
        }
        if caster.kind.is_player() && target.kind.is_player() {
            if self.env.map.pk_disabled(self.state.id) {
                return false;
            }
            if self.env.map.pk_protected(target.map, target.position) {
                return false;
            }
        }
        true
    }

    fn heal_payload(
        &mut self,
        caster_id: EntityId,
        def: &SpellDefinition,
        target_id: EntityId,
    ) -> Result<(), CastError> {
        let Some(t) = self.state.get_mut(target_id) else {
            return Err(CastError::NoTarget);
        };
        if !t.alive {
            return Err(CastError::NoTarget);
        }
        let amount = match def.power {
            Magnitude::Flat(v) => v.max(0) as u32,
            Magnitude::Percent(p) => (t.resources.max_life as u64 * p.max(0) as u64 / 100) as u32,
        };
        t.resources.heal(amount);
        self.outbox.push_effect(
            caster_id,
            Some((def.id, def.level)),
            &[EffectTarget {
                id: target_id,
                damage: 0,
                lethal: false,
            }],
        );
        Ok(())
    }

    fn restore_mana_payload(
        &mut self,
        def: &SpellDefinition,
        target_id: EntityId,
    ) -> Result<(), CastError> {
        let Some(t) = self.state.get_mut(target_id) else {
            return Err(CastError::NoTarget);
        };
        let amount = match def.power {
            Magnitude::Flat(v) => v.max(0) as u32,
            Magnitude::Percent(p) => (t.resources.max_mana as u64 * p.max(0) as u64 / 100) as u32,
        };
        t.resources.restore_mana(amount);
        Ok(())
    }

    /// Zero-damage party buff sharing experience with the target.
    fn dispatch_xp_payload(
        &mut self,
        def: &SpellDefinition,
        target_id: EntityId,
    ) -> Result<(), CastError> {
        let Some(t) = self.state.get_mut(target_id) else {
            return Err(CastError::NoTarget);
        };
        if !t.kind.is_player() || !t.alive {
            return Err(CastError::NoTarget);
        }
        if let Magnitude::Flat(v) = def.power {
            t.experience += v.max(0) as u64;
        }
        Ok(())
    }

    fn attach_payload(
        &mut self,
        now: TimePoint,
        caster_id: EntityId,
        def: &SpellDefinition,
        target_id: EntityId,
    ) -> Result<(), CastError> {
        let rider = def
            .rider
            .ok_or(CastError::PayloadFault("attach spell without rider"))?;
        if !self.state.contains(target_id) {
            return Err(CastError::NoTarget);
        }
        self.attach_status(now, caster_id, target_id, def, rider);
        Ok(())
    }

    fn attach_status(
        &mut self,
        now: TimePoint,
        caster_id: EntityId,
        target_id: EntityId,
        def: &SpellDefinition,
        rider: StatusRider,
    ) {
        let Some(t) = self.state.get_mut(target_id) else {
            return;
        };
        t.statuses.apply(
            now,
            caster_id,
            rider.kind,
            rider.power,
            rider.duration_secs,
            rider.pulses,
            def.level,
            def.id,
        );
        let flags = t.statuses.flags();
        let records = t.statuses.records(target_id, now);
        self.outbox.push(OutboundEvent::StatusFlagsChanged {
            owner: target_id,
            flags,
        });
        if let Some(record) = records.into_iter().find(|r| r.kind == rider.kind) {
            self.outbox.persist(PersistCommand::SaveStatus(record));
        }
    }

    fn detach_payload(
        &mut self,
        def: &SpellDefinition,
        target_id: EntityId,
    ) -> Result<(), CastError> {
        let rider = def
            .rider
            .ok_or(CastError::PayloadFault("detach spell without rider"))?;
        let Some(t) = self.state.get_mut(target_id) else {
            return Err(CastError::NoTarget);
        };
        if t.statuses.remove(rider.kind) {
            let flags = t.statuses.flags();
            self.outbox.push(OutboundEvent::StatusFlagsChanged {
                owner: target_id,
                flags,
            });
            self.outbox.persist(PersistCommand::DeleteStatus {
                owner: target_id,
                kind: rider.kind,
            });
        }
        Ok(())
    }

    fn transform_payload(
        &mut self,
        now: TimePoint,
        caster_id: EntityId,
        def: &SpellDefinition,
    ) -> Result<(), CastError> {
        let duration = def.rider.map(|r| r.duration_secs).unwrap_or(60);
        let power = def.rider.map(|r| r.power).unwrap_or(Magnitude::NONE);
        let Some(c) = self.state.get_mut(caster_id) else {
            return Err(CastError::NoCaster(caster_id));
        };
        c.statuses.apply(
            now,
            caster_id,
            StatusKind::Transformed,
            power,
            duration,
            0,
            def.level,
            def.id,
        );
        let flags = c.statuses.flags();
        self.outbox.push(OutboundEvent::StatusFlagsChanged {
            owner: caster_id,
            flags,
        });
        Ok(())
    }

    fn ground_sting_payload(
        &mut self,
        now: TimePoint,
        caster_id: EntityId,
        def: &SpellDefinition,
        ground: Position,
    ) -> Result<(), CastError> {
        let rider = def
            .rider
            .ok_or(CastError::PayloadFault("ground sting without rider"))?;
        let caster = self
            .state
            .get(caster_id)
            .ok_or(CastError::NoCaster(caster_id))?
            .clone();
        let targets = self.state.in_radius(ground, def.range);
        for target_id in targets {
            if target_id == caster_id {
                continue;
            }
            let targetable = self
                .state
                .get(target_id)
                .is_some_and(|t| self.targetable(&caster, t));
            if targetable {
                self.attach_status(now, caster_id, target_id, def, rider);
            }
        }
        Ok(())
    }

    /// Dismounts `target_id` when the caster's mount outclasses theirs.
    fn dismount_payload(
        &mut self,
        caster_id: EntityId,
        target_id: EntityId,
    ) -> Result<(), CastError> {
        if target_id == caster_id {
            return Ok(());
        }
        let caster_tier = self
            .state
            .get(caster_id)
            .map(|c| c.mount_tier)
            .ok_or(CastError::NoCaster(caster_id))?;
        let Some(t) = self.state.get_mut(target_id) else {
            return Err(CastError::NoTarget);
        };
        if !t.statuses.has(StatusKind::Mounted) || caster_tier < t.mount_tier {
            return Ok(());
        }
        t.statuses.remove(StatusKind::Mounted);
        let flags = t.statuses.flags();
        self.outbox.push(OutboundEvent::StatusFlagsChanged {
            owner: target_id,
            flags,
        });
        Ok(())
    }

    fn mount_toggle_payload(
        &mut self,
        now: TimePoint,
        caster_id: EntityId,
        def: &SpellDefinition,
    ) -> Result<(), CastError> {
        let Some(c) = self.state.get_mut(caster_id) else {
            return Err(CastError::NoCaster(caster_id));
        };
        if c.statuses.has(StatusKind::Mounted) {
            c.statuses.remove(StatusKind::Mounted);
        } else {
            // Mounted persists until toggled off; one day is effectively that.
            c.statuses.apply(
                now,
                caster_id,
                StatusKind::Mounted,
                Magnitude::NONE,
                24 * 60 * 60,
                0,
                def.level,
                def.id,
            );
        }
        let flags = c.statuses.flags();
        self.outbox.push(OutboundEvent::StatusFlagsChanged {
            owner: caster_id,
            flags,
        });
        Ok(())
    }

    // ========================================================================
    // Melee attack flow
    // ========================================================================

    /// Records a target on the attacker's session without validating it.
    pub fn begin_target(&mut self, attacker: EntityId, target: EntityId) {
        if let Some(c) = self.state.get_mut(attacker) {
            c.session.begin_target(target);
        }
    }

    fn tick_attack(&mut self, now: TimePoint, id: EntityId) {
        let due = match self.state.get_mut(id) {
            Some(c) if c.alive && c.session.is_engaged() => {
                let interval = c.stats.attack_interval_ms.max(1);
                c.session.next_attack(now, interval)
            }
            _ => false,
        };
        if due {
            self.execute_attack(now, id);
        }
    }

    /// One melee swing. Invalid targets fail silently and disengage the
    /// session; the cadence gate has already fired by the time we get here.
    pub fn execute_attack(&mut self, now: TimePoint, attacker_id: EntityId) {
        let Some(attacker) = self.state.get(attacker_id).cloned() else {
            return;
        };
        let target_id = attacker.session.target;
        let Some(target) = self.state.get(target_id).cloned() else {
            self.disengage(attacker_id);
            return;
        };
        if !is_engageable(&attacker, &target, self.env.map, self.env.events)
            || target.statuses.has(StatusKind::Ghost)
            || target.statuses.has(StatusKind::CorpseSeal)
        {
            self.disengage(attacker_id);
            return;
        }

        // A swing interrupts whatever the attacker was casting.
        self.abort_cast(attacker_id, false);

        let training = self.env.map.is_training(self.state.id);
        if attacker.is_ranged() && !training {
            if attacker.ammo == 0 {
                self.disengage(attacker_id);
                return;
            }
            if let Some(c) = self.state.get_mut(attacker_id) {
                c.ammo -= 1;
            }
        }

        self.env.events.before_attack(attacker_id, target_id);
        if self.env.events.auto_skill(attacker_id, target_id) {
            // A proc skill replaced the plain swing.
            return;
        }

        let hit_seed = self.seed(attacker_id, CTX_HIT);
        if !check_hit(&attacker, &target, self.env.rng, hit_seed) {
            self.outbox.push_effect(
                attacker_id,
                None,
                &[EffectTarget {
                    id: target_id,
                    damage: 0,
                    lethal: false,
                }],
            );
            self.disengage(attacker_id);
            return;
        }

        if let Some(c) = self.state.get_mut(attacker_id) {
            c.durability = c.durability.saturating_sub(1);
        }

        // Scapegoat: the target may turn the swing back before it lands.
        if target.scapegoat_chance > 0 {
            let seed = self.seed(attacker_id, CTX_SCAPEGOAT);
            if self.env.rng.rate(seed, target.scapegoat_chance as u32) {
                self.outbox.push_effect(
                    target_id,
                    None,
                    &[EffectTarget {
                        id: attacker_id,
                        damage: 0,
                        lethal: false,
                    }],
                );
                return;
            }
        }

        let damage_seed = self.seed(attacker_id, CTX_DAMAGE);
        let result = physical_damage(&attacker, &target, Magnitude::NONE, self.env.rng, damage_seed);
        let damage = self.lucky_roll(&attacker, attacker_id, result.damage);

        if attacker.statuses.has(StatusKind::FatalStrike) && !target.is_guard() {
            let from = attacker.position;
            let to = from.behind(target.position);
            if self.env.map.is_passable(self.state.id, to) {
                if let Some(c) = self.state.get_mut(attacker_id) {
                    c.position = to;
                }
                self.outbox.push(OutboundEvent::FatalStrikeJump {
                    attacker: attacker_id,
                    from,
                    to,
                });
            }
        }

        let (lethal, life_before) = match self.state.get_mut(target_id) {
            Some(t) => {
                let before = t.resources.life;
                (t.resources.take_damage(damage), before)
            }
            None => return,
        };
        self.outbox.push_effect(
            attacker_id,
            None,
            &[EffectTarget {
                id: target_id,
                damage,
                lethal,
            }],
        );
        self.env.events.on_hit(attacker_id, target_id, damage);

        // Crime tracking: striking an innocent player marks the attacker.
        if attacker.kind.is_player() && target.kind.is_player() && target.notoriety == 0 {
            if let Some(c) = self.state.get_mut(attacker_id) {
                c.notoriety += 1;
            }
        }

        if attacker.kind.is_player() && target.kind.qualifies_for_experience() {
            let gained = damage.min(life_before) as u64;
            if let Some(c) = self.state.get_mut(attacker_id) {
                c.weapon_skill_exp += gained;
                c.experience +=
                    adjust_experience(gained, attacker.stats.level, target.stats.level);
            }
        }

        if lethal {
            self.kill(now, attacker_id, target_id, damage);
            self.disengage(attacker_id);
        }
    }

    fn disengage(&mut self, id: EntityId) {
        if let Some(c) = self.state.get_mut(id) {
            c.session.clear();
        }
    }

    fn award_spell_experience(
        &mut self,
        caster_id: EntityId,
        target_id: EntityId,
        damage: u32,
        life_before: u32,
    ) {
        let qualifies = match (self.state.get(caster_id), self.state.get(target_id)) {
            (Some(c), Some(t)) if c.kind.is_player() && t.kind.qualifies_for_experience() => {
                Some((c.stats.level, t.stats.level))
            }
            _ => None,
        };
        if let Some((caster_level, target_level)) = qualifies {
            let gained = damage.min(life_before) as u64;
            if let Some(c) = self.state.get_mut(caster_id) {
                c.experience += adjust_experience(gained, caster_level, target_level);
            }
        }
    }

    // ========================================================================
    // Kill flow
    // ========================================================================

    fn kill(&mut self, now: TimePoint, killer_id: EntityId, victim_id: EntityId, damage: u32) {
        let Some(v) = self.state.get_mut(victim_id) else {
            return;
        };
        if !v.alive {
            return;
        }
        v.alive = false;
        v.resources.life = 0;
        v.session.clear();
        let _ = v.cast.abort();

        let mode = if damage > v.resources.max_life / CombatConfig::OVERKILL_DIVISOR {
            DieMode::Overkill
        } else {
            DieMode::Normal
        };
        let victim_kind = v.kind;
        let victim_level = v.stats.level;
        let victim_max_life = v.resources.max_life;
        let death_action = v.death_action;

        if victim_kind.is_player() {
            v.statuses.apply(
                now,
                EntityId::NONE,
                StatusKind::Ghost,
                Magnitude::NONE,
                0,
                0,
                1,
                0,
            );
            let flags = v.statuses.flags();
            self.outbox.push(OutboundEvent::StatusFlagsChanged {
                owner: victim_id,
                flags,
            });
        }

        self.outbox.push(OutboundEvent::Death {
            victim: victim_id,
            killer: killer_id,
            mode,
        });

        if death_action != 0 && (victim_kind.is_monster() || victim_kind.is_npc()) {
            // Scripted rewards; the result only matters to the script side.
            let _ = self
                .env
                .script
                .execute_action(death_action, killer_id, victim_id);
        }

        let killer_bonus = match self.state.get(killer_id) {
            Some(k) if k.kind.is_player() && victim_kind.qualifies_for_experience() => {
                Some(k.stats.level)
            }
            _ => None,
        };
        if let Some(killer_level) = killer_bonus {
            let base = (victim_max_life / 10).max(1) as u64;
            let bonus = adjust_experience(base, killer_level, victim_level);
            if let Some(k) = self.state.get_mut(killer_id) {
                k.experience += bonus;
            }
        }
    }
}

/// Kinds that implicitly target the caster when no target id is supplied.
fn self_directed(kind: SpellKind) -> bool {
    matches!(
        kind,
        SpellKind::Transform
            | SpellKind::MountToggle
            | SpellKind::Vortex
            | SpellKind::Recruit
            | SpellKind::RestoreMana
            | SpellKind::DispatchXp
            | SpellKind::DismountArea
            | SpellKind::Summon
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{FixedRng, NullEvents, NullScript, OpenFieldMap, SpellOracle};
    use crate::state::{MapId, ResourceMeter, RoleKind};

    struct TestSpells {
        spells: Vec<SpellDefinition>,
    }

    impl SpellOracle for TestSpells {
        fn spell(&self, id: u16, level: u8) -> Option<&SpellDefinition> {
            self.spells.iter().find(|s| s.id == id && s.level == level)
        }

        fn max_level(&self, id: u16) -> Option<u8> {
            self.spells.iter().filter(|s| s.id == id).map(|s| s.level).max()
        }
    }

    fn spell(id: u16, kind: SpellKind, power: Magnitude, intone_ms: u32) -> SpellDefinition {
        SpellDefinition {
            id,
            level: 1,
            kind,
            power,
            intone_ms,
            delay_ms: 500,
            cooldown_ms: 1_000,
            range: 8,
            mana_cost: 10,
            stamina_cost: 0,
            uses_ammo: false,
            weapon_subtype: None,
            auto_active: false,
            chance_pct: None,
            weapon_spell: false,
            target_corpse: false,
            auto_repeat: false,
            rider: None,
            summon_template: None,
        }
    }

    fn mage(id: u32, magic_attack: u32) -> CombatantState {
        let mut c = CombatantState {
            id: EntityId(id),
            kind: RoleKind::Player,
            map: MapId(1),
            position: Position::new(10, 10),
            alive: true,
            resources: ResourceMeter::full(1_000, 100, 100),
            ..Default::default()
        };
        c.stats.magic_attack = magic_attack;
        c.stats.level = 50;
        c
    }

    fn monster(id: u32, life: u32, x: u16, y: u16) -> CombatantState {
        let mut c = CombatantState {
            id: EntityId(id),
            kind: RoleKind::Monster,
            map: MapId(1),
            position: Position::new(x, y),
            alive: true,
            resources: ResourceMeter::full(life, 0, 0),
            ..Default::default()
        };
        c.stats.level = 50;
        c
    }

    struct Fixture {
        map: OpenFieldMap,
        spells: TestSpells,
        rng: FixedRng,
        script: NullScript,
        events: NullEvents,
        state: MapState,
        outbox: Outbox,
    }

    impl Fixture {
        fn new(spells: Vec<SpellDefinition>) -> Self {
            Self {
                map: OpenFieldMap::new(),
                spells: TestSpells { spells },
                rng: FixedRng(0),
                script: NullScript,
                events: NullEvents,
                state: MapState::new(MapId(1)),
                outbox: Outbox::new(),
            }
        }

        fn engine(&mut self) -> CombatEngine<'_> {
            let env = CombatEnv::new(
                &self.map,
                &self.spells,
                &self.rng,
                &self.script,
                &self.events,
            );
            CombatEngine::new(&mut self.state, env, &mut self.outbox, 42, 0)
        }
    }

    #[test]
    fn insufficient_mana_leaves_caster_untouched() {
        let mut fx = Fixture::new(vec![spell(1000, SpellKind::Single, Magnitude::Flat(0), 0)]);
        let mut caster = mage(1, 100);
        caster.resources.mana = 5;
        fx.state.insert(caster);
        fx.state.insert(monster(2, 500, 12, 10));

        let before = {
            let c = fx.state.get(EntityId(1)).unwrap();
            (c.resources, c.cast)
        };
        let err = fx
            .engine()
            .begin_cast(TimePoint(0), EntityId(1), 1000, 1, EntityId(2), Position::default())
            .unwrap_err();
        assert_eq!(err, CastError::Resources);

        let after = {
            let c = fx.state.get(EntityId(1)).unwrap();
            (c.resources, c.cast)
        };
        assert_eq!(before, after);
        assert!(fx.outbox.is_empty());
    }

    #[test]
    fn hostile_cast_at_untargetable_target_leaves_caster_untouched() {
        let mut fx = Fixture::new(vec![spell(1000, SpellKind::Single, Magnitude::Flat(0), 0)]);
        fx.state.insert(mage(1, 100));
        let mut scenery = monster(2, 500, 12, 10);
        scenery.kind = RoleKind::StaticNpc;
        fx.state.insert(scenery);
        let mut sealed = monster(3, 500, 12, 11);
        sealed.statuses.apply(
            TimePoint::ZERO,
            EntityId::NONE,
            StatusKind::Ghost,
            Magnitude::Flat(0),
            1,
            0,
            1,
            0,
        );
        fx.state.insert(sealed);

        let before = {
            let c = fx.state.get(EntityId(1)).unwrap();
            (c.resources, c.cast)
        };
        for target in [EntityId(2), EntityId(3)] {
            let err = fx
                .engine()
                .begin_cast(TimePoint(0), EntityId(1), 1000, 1, target, Position::default())
                .unwrap_err();
            assert_eq!(err, CastError::NoTarget);
        }

        let after = {
            let c = fx.state.get(EntityId(1)).unwrap();
            (c.resources, c.cast)
        };
        assert_eq!(before, after, "rejected casts must not spend anything");
        assert!(fx.outbox.is_empty());
        assert_eq!(fx.state.get(EntityId(3)).unwrap().resources.life, 500);
    }

    #[test]
    fn intoned_cast_launches_at_the_deadline() {
        let mut fx = Fixture::new(vec![spell(1000, SpellKind::Single, Magnitude::Flat(0), 900)]);
        fx.state.insert(mage(1, 300));
        fx.state.insert(monster(2, 5_000, 12, 10));

        fx.engine()
            .begin_cast(TimePoint(0), EntityId(1), 1000, 1, EntityId(2), Position::default())
            .unwrap();
        {
            let c = fx.state.get(EntityId(1)).unwrap();
            assert_eq!(c.cast.phase, CastPhase::Intoning);
            assert_eq!(c.resources.mana, 90);
        }

        fx.engine().tick(TimePoint(500));
        assert_eq!(fx.state.get(EntityId(1)).unwrap().cast.phase, CastPhase::Intoning);
        assert_eq!(fx.state.get(EntityId(2)).unwrap().resources.life, 5_000);

        fx.engine().tick(TimePoint(900));
        assert_eq!(fx.state.get(EntityId(1)).unwrap().cast.phase, CastPhase::Idle);
        // Magic attack 300, no defense: 300 damage landed.
        assert_eq!(fx.state.get(EntityId(2)).unwrap().resources.life, 4_700);
        let events = fx.outbox.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            OutboundEvent::MagicEffect { caster, .. } if *caster == EntityId(1)
        )));
    }

    #[test]
    fn relaunch_is_gated_by_the_cooldown() {
        let mut fx = Fixture::new(vec![spell(1000, SpellKind::Single, Magnitude::Flat(0), 0)]);
        fx.state.insert(mage(1, 100));
        fx.state.insert(monster(2, 5_000, 12, 10));

        fx.engine()
            .begin_cast(TimePoint(0), EntityId(1), 1000, 1, EntityId(2), Position::default())
            .unwrap();
        // Level 1 shaves 10% off the 1000ms base.
        let err = fx
            .engine()
            .begin_cast(TimePoint(500), EntityId(1), 1000, 1, EntityId(2), Position::default())
            .unwrap_err();
        assert_eq!(err, CastError::Cooldown);
        fx.engine()
            .begin_cast(TimePoint(900), EntityId(1), 1000, 1, EntityId(2), Position::default())
            .unwrap();
    }

    #[test]
    fn overreported_spell_level_clamps_to_the_highest_known() {
        let mut fx = Fixture::new(vec![spell(1000, SpellKind::Single, Magnitude::Flat(0), 0)]);
        fx.state.insert(mage(1, 300));
        fx.state.insert(monster(2, 5_000, 12, 10));

        // Level 9 is not in the catalog; the cast runs at the known level 1.
        fx.engine()
            .begin_cast(TimePoint(0), EntityId(1), 1000, 9, EntityId(2), Position::default())
            .unwrap();
        assert_eq!(fx.state.get(EntityId(1)).unwrap().cast.level, 1);
        assert_eq!(fx.state.get(EntityId(2)).unwrap().resources.life, 4_700);
    }

    #[test]
    fn bomb_hits_everyone_in_radius_and_kills_award_overkill() {
        let mut fx = Fixture::new(vec![spell(1001, SpellKind::Bomb, Magnitude::Flat(0), 0)]);
        let mut caster = mage(1, 500);
        // A +25 battle-power lead lands in the 100%-cap / 30%-floor
        // disdain row, so the 500 hit goes through uncapped on the small
        // monster and gets floored up on the big one.
        caster.stats.battle_power = 25;
        fx.state.insert(caster);
        fx.state.insert(monster(2, 90, 12, 10));
        fx.state.insert(monster(3, 5_000, 13, 10));
        fx.state.insert(monster(4, 90, 30, 30)); // out of radius

        fx.engine()
            .begin_cast(TimePoint(0), EntityId(1), 1001, 1, EntityId(2), Position::default())
            .unwrap();

        // 500 capped at 100% of the 90 max life: lethal.
        assert!(!fx.state.get(EntityId(2)).unwrap().alive);
        // Floored at 30% of 5000.
        assert_eq!(fx.state.get(EntityId(3)).unwrap().resources.life, 3_500);
        assert_eq!(fx.state.get(EntityId(4)).unwrap().resources.life, 90);

        let events = fx.outbox.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            OutboundEvent::Death { victim, mode, .. }
                if *victim == EntityId(2) && *mode == DieMode::Overkill
        )));
    }

    #[test]
    fn melee_session_swings_on_the_cadence_and_kills() {
        let mut fx = Fixture::new(vec![]);
        let mut bruiser = mage(1, 0);
        bruiser.stats.min_attack = 200;
        bruiser.stats.max_attack = 200;
        bruiser.stats.accuracy = 200;
        bruiser.stats.attack_interval_ms = 1_000;
        bruiser.stats.attack_range = 3;
        fx.state.insert(bruiser);
        fx.state.insert(monster(2, 250, 12, 10));

        fx.engine().begin_target(EntityId(1), EntityId(2));
        fx.engine().tick(TimePoint(0));
        let life_after_first = fx.state.get(EntityId(2)).unwrap().resources.life;
        assert!(life_after_first < 250);

        // Same second: the cadence gate holds the next swing.
        fx.engine().tick(TimePoint(400));
        assert_eq!(fx.state.get(EntityId(2)).unwrap().resources.life, life_after_first);

        fx.engine().tick(TimePoint(1_000));
        fx.engine().tick(TimePoint(2_000));
        let victim = fx.state.get(EntityId(2)).unwrap();
        assert!(!victim.alive);
        // Kill disengages the session.
        assert!(!fx.state.get(EntityId(1)).unwrap().session.is_engaged());
    }

    #[test]
    fn attached_poison_pulses_through_engine_ticks() {
        let mut fx = Fixture::new(vec![{
            let mut s = spell(1002, SpellKind::AttachStatus, Magnitude::Flat(0), 0);
            s.rider = Some(StatusRider {
                kind: StatusKind::Poison,
                power: Magnitude::Flat(30),
                duration_secs: 0,
                pulses: 2,
            });
            s
        }]);
        fx.state.insert(mage(1, 100));
        fx.state.insert(monster(2, 1_000, 12, 10));

        fx.engine()
            .begin_cast(TimePoint(0), EntityId(1), 1002, 1, EntityId(2), Position::default())
            .unwrap();
        assert!(fx.state.get(EntityId(2)).unwrap().statuses.has(StatusKind::Poison));

        fx.engine().tick(TimePoint(2_000));
        assert_eq!(fx.state.get(EntityId(2)).unwrap().resources.life, 970);
        fx.engine().tick(TimePoint(4_000));
        assert_eq!(fx.state.get(EntityId(2)).unwrap().resources.life, 940);
        // Two pulses spent: the instance is gone by the next pass.
        fx.engine().tick(TimePoint(6_000));
        assert!(!fx.state.get(EntityId(2)).unwrap().statuses.has(StatusKind::Poison));
    }

    #[test]
    fn final_pulse_kill_credits_the_status_caster() {
        let mut fx = Fixture::new(vec![]);
        fx.state.insert(mage(9, 0));
        let mut victim = monster(2, 400, 12, 10);
        // One lethal burn pulse; the instance expires on the same pass
        // that kills, and the death must still credit entity 9.
        victim.statuses.apply(
            TimePoint::ZERO,
            EntityId(9),
            StatusKind::LifeBurn,
            Magnitude::Percent(100),
            0,
            1,
            1,
            0,
        );
        fx.state.insert(victim);

        fx.engine().tick(TimePoint(2_000));

        assert!(!fx.state.get(EntityId(2)).unwrap().alive);
        let events = fx.outbox.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            OutboundEvent::Death { victim, killer, .. }
                if *victim == EntityId(2) && *killer == EntityId(9)
        )));
    }

    #[test]
    fn statuses_tick_before_spells_and_attacks() {
        // A one-pulse life burn and a zero-intone cast resolved in the same
        // pass: the status payload's damage must land before the spell's.
        let mut fx = Fixture::new(vec![spell(1000, SpellKind::Single, Magnitude::Flat(0), 900)]);
        fx.state.insert(mage(1, 100));
        let mut victim = monster(2, 1_000, 12, 10);
        victim.statuses.apply(
            TimePoint::ZERO,
            EntityId(1),
            StatusKind::LifeBurn,
            Magnitude::Percent(50),
            0,
            1,
            1,
            0,
        );
        fx.state.insert(victim);

        fx.engine()
            .begin_cast(TimePoint(0), EntityId(1), 1000, 1, EntityId(2), Position::default())
            .unwrap();
        fx.engine().tick(TimePoint(2_000));
        // Burn halved current life (1000 -> 500) before the spell's 100 hit.
        assert_eq!(fx.state.get(EntityId(2)).unwrap().resources.life, 400);
    }
}
