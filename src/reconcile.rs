//! Snapshot reconciliation.
//!
//! The [`Reconciler`] is the only stateful piece of the pipeline. It keeps
//! the last-known value of every live entity and, for each incoming
//! [`Snapshot`], reports which entities were created, updated or removed,
//! along with the notable [`Transition`]s between the old and new values.
//!
//! Tracked entries live in an arena (`Vec<Option<Tracked>>`) addressed
//! through an `id -> slot` index. Freed slots are reused.
//!
//! Staleness is orthogonal to the create/update/remove lifecycle. An entity
//! is stale when it is a stopped container, or when it has been inactive for
//! longer than `stale_after` since its activity watermark. The watermark
//! moves whenever `active` flips or a tmux session's activity counter
//! changes.

use crate::models::{ProcessEntity, Snapshot, TmuxSession};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Default inactivity period before an entity goes stale.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(30);

/// A notable change between two observations of the same entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Container went from stopped to running
    Started,
    /// Container went from running to stopped
    Stopped,
    /// Container health changed to healthy
    HealthRecovered,
    /// Container health changed to unhealthy
    HealthDegraded,
    /// `active` went from false to true
    Activated,
    WentStale,
    /// Left the stale state
    Recovered,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Started => "started",
            Transition::Stopped => "stopped",
            Transition::HealthRecovered => "health_recovered",
            Transition::HealthDegraded => "health_degraded",
            Transition::Activated => "activated",
            Transition::WentStale => "went_stale",
            Transition::Recovered => "recovered",
        }
    }
}

/// One lifecycle operation produced by [`Reconciler::reconcile`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Change {
    Create {
        entity: ProcessEntity,
        /// Initial staleness (stopped containers start stale)
        stale: bool,
    },
    /// Emitted for every entity still present, changed or not.
    Update {
        previous: ProcessEntity,
        current: ProcessEntity,
        transitions: Vec<Transition>,
    },
    Remove {
        entity: ProcessEntity,
    },
}

impl Change {
    pub fn id(&self) -> &str {
        match self {
            Change::Create { entity, .. } | Change::Remove { entity } => entity.id(),
            Change::Update { current, .. } => current.id(),
        }
    }

    pub fn entity(&self) -> &ProcessEntity {
        match self {
            Change::Create { entity, .. } | Change::Remove { entity } => entity,
            Change::Update { current, .. } => current,
        }
    }

    pub fn transitions(&self) -> &[Transition] {
        match self {
            Change::Update { transitions, .. } => transitions,
            Change::Create { .. } | Change::Remove { .. } => &[],
        }
    }

    pub fn has(&self, transition: Transition) -> bool {
        self.transitions().contains(&transition)
    }
}

/// A staleness flip found by [`Reconciler::tick`] between snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StalenessChange {
    pub id: String,
    pub transition: Transition,
}

/// Tuning for the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerOptions {
    /// Inactivity period before an entity goes stale
    pub stale_after: Duration,
    /// Extra polls an entity may be missing before it is removed.
    /// Zero removes on the first missing poll.
    pub remove_grace_polls: u32,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            stale_after: DEFAULT_STALE_AFTER,
            remove_grace_polls: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct Tracked {
    entity: ProcessEntity,
    last_activity: Instant,
    stale: bool,
    missed_polls: u32,
}

/// Maps a stream of snapshots onto persistent entities.
#[derive(Debug, Default)]
pub struct Reconciler {
    slots: Vec<Option<Tracked>>,
    index: HashMap<String, usize>,
    free: Vec<usize>,
    options: ReconcilerOptions,
}

impl Reconciler {
    pub fn new(options: ReconcilerOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&ProcessEntity> {
        self.tracked(id).map(|t| &t.entity)
    }

    /// Whether a live entity is currently stale.
    pub fn is_stale(&self, id: &str) -> Option<bool> {
        self.tracked(id).map(|t| t.stale)
    }

    /// Ids of all live entities, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.index.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// The live session a pane belongs to, if that session is known.
    ///
    /// Panes can outlive their session for a poll when the two listings race;
    /// that case yields `None`.
    pub fn parent_session(&self, pane_id: &str) -> Option<&TmuxSession> {
        let ProcessEntity::TmuxPane(pane) = self.get(pane_id)? else {
            return None;
        };
        match self.get(&TmuxSession::id_for(&pane.session_name))? {
            ProcessEntity::TmuxSession(session) => Some(session),
            _ => None,
        }
    }

    /// Apply one snapshot and return the resulting changes.
    ///
    /// Creates and updates come first, in snapshot order, followed by
    /// removals.
    pub fn reconcile(&mut self, snapshot: &Snapshot, now: Instant) -> Vec<Change> {
        let mut changes = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for entity in snapshot.entities() {
            if !seen.insert(entity.id().to_string()) {
                tracing::warn!(id = entity.id(), "duplicate id in snapshot, ignoring");
                continue;
            }

            let slot = self.index.get(entity.id()).copied();
            match slot.and_then(|slot| self.slots.get_mut(slot)?.as_mut()) {
                None => changes.push(self.create(entity, now)),
                Some(tracked) => {
                    changes.push(update(tracked, entity, now, self.options.stale_after));
                }
            }
        }

        let mut missing: Vec<(usize, String)> = self
            .index
            .iter()
            .filter(|(id, _)| !seen.contains(*id))
            .map(|(id, slot)| (*slot, id.clone()))
            .collect();
        missing.sort_unstable();

        for (slot, id) in missing {
            let Some(tracked) = self.slots.get_mut(slot).and_then(Option::as_mut) else {
                continue;
            };
            tracked.missed_polls += 1;
            if tracked.missed_polls > self.options.remove_grace_polls {
                if let Some(tracked) = self.release(&id) {
                    changes.push(Change::Remove {
                        entity: tracked.entity,
                    });
                }
            } else {
                tracing::debug!(id = %id, missed = tracked.missed_polls, "entity missing, holding");
            }
        }

        changes
    }

    /// Re-evaluate staleness against the clock without a new snapshot.
    ///
    /// Each flip is reported once.
    pub fn tick(&mut self, now: Instant) -> Vec<StalenessChange> {
        let stale_after = self.options.stale_after;
        let mut flips = Vec::new();

        for tracked in self.slots.iter_mut().flatten() {
            let stale = is_stale(&tracked.entity, tracked.last_activity, now, stale_after);
            if stale != tracked.stale {
                tracked.stale = stale;
                flips.push(StalenessChange {
                    id: tracked.entity.id().to_string(),
                    transition: if stale {
                        Transition::WentStale
                    } else {
                        Transition::Recovered
                    },
                });
            }
        }

        flips
    }

    fn tracked(&self, id: &str) -> Option<&Tracked> {
        let slot = *self.index.get(id)?;
        self.slots.get(slot)?.as_ref()
    }

    fn create(&mut self, entity: ProcessEntity, now: Instant) -> Change {
        let stale = entity.is_stopped_container();
        let tracked = Tracked {
            entity: entity.clone(),
            last_activity: now,
            stale,
            missed_polls: 0,
        };

        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(tracked);
                slot
            }
            None => {
                self.slots.push(Some(tracked));
                self.slots.len() - 1
            }
        };
        self.index.insert(entity.id().to_string(), slot);

        Change::Create { entity, stale }
    }

    fn release(&mut self, id: &str) -> Option<Tracked> {
        let slot = self.index.remove(id)?;
        let tracked = self.slots.get_mut(slot)?.take();
        self.free.push(slot);
        tracked
    }
}

fn update(
    tracked: &mut Tracked,
    entity: ProcessEntity,
    now: Instant,
    stale_after: Duration,
) -> Change {
    let mut transitions = classify(&tracked.entity, &entity);

    if tracked.entity.is_active() != entity.is_active()
        || tracked.entity.activity_marker() != entity.activity_marker()
    {
        tracked.last_activity = now;
    }
    tracked.missed_polls = 0;

    let previous = std::mem::replace(&mut tracked.entity, entity.clone());

    let stale = is_stale(&entity, tracked.last_activity, now, stale_after);
    if stale != tracked.stale {
        tracked.stale = stale;
        transitions.push(if stale {
            Transition::WentStale
        } else {
            Transition::Recovered
        });
    }

    Change::Update {
        previous,
        current: entity,
        transitions,
    }
}

/// Field-level transitions between two observations of one entity.
fn classify(previous: &ProcessEntity, current: &ProcessEntity) -> Vec<Transition> {
    use crate::models::Health;

    let mut transitions = Vec::new();

    if let (ProcessEntity::DockerContainer(old), ProcessEntity::DockerContainer(new)) =
        (previous, current)
    {
        match (old.running, new.running) {
            (false, true) => transitions.push(Transition::Started),
            (true, false) => transitions.push(Transition::Stopped),
            _ => {}
        }

        if old.health != new.health {
            match new.health {
                Health::Healthy => transitions.push(Transition::HealthRecovered),
                Health::Unhealthy => transitions.push(Transition::HealthDegraded),
                Health::None | Health::Unknown => {}
            }
        }
    }

    if !previous.is_active() && current.is_active() {
        transitions.push(Transition::Activated);
    }

    transitions
}

fn is_stale(
    entity: &ProcessEntity,
    last_activity: Instant,
    now: Instant,
    stale_after: Duration,
) -> bool {
    if entity.is_stopped_container() {
        return true;
    }
    !entity.is_active() && now.saturating_duration_since(last_activity) > stale_after
}
