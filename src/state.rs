/// Notification deduplication and persisted monitor state.
///
/// The state file survives restarts and remembers the last alert level, when
/// we last notified, which advisory numbers we have seen per storm and which
/// NWS alerts were already acted upon. [`decide`] is pure: it takes the state
/// by value and hands back the updated copy, and the caller writes it back
/// through [`StateStore::save`].
///
/// # Clock injection
/// `decide` takes `now` instead of calling `Utc::now()`, so cooldown behaviour
/// is deterministic in tests.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::targets;
use crate::model::{AlertLevel, SignalContext};

/// A lock file older than this many minutes is assumed to belong to a
/// crashed run.
pub const STALE_LOCK_AFTER_MINUTES: i64 = 10;

/// Advisory numbers and alert ids not seen for this many days are forgotten.
pub const SEEN_RETENTION_DAYS: i64 = 30;

// ---------------------------------------------------------------------------
// Persisted state
// ---------------------------------------------------------------------------

/// Durable record of what the monitor has already seen and said.
///
/// Unknown fields in the file are ignored and missing ones take their
/// defaults, so older and newer versions can share a state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    /// `None` until the first evaluation.
    pub last_alert_level: Option<AlertLevel>,
    pub last_notified_at: Option<DateTime<Utc>>,
    /// Last advisory number seen, keyed by storm id.
    pub cone_advisories: BTreeMap<String, String>,
    pub processed_alert_ids: BTreeSet<String>,
    /// Last cycle each storm id appeared in, for pruning `cone_advisories`.
    pub advisory_seen_at: BTreeMap<String, DateTime<Utc>>,
    /// Last cycle each alert id appeared in, for pruning `processed_alert_ids`.
    pub alert_seen_at: BTreeMap<String, DateTime<Utc>>,
}

impl PersistedState {
    /// Drops storms and alert ids not seen within [`SEEN_RETENTION_DAYS`].
    ///
    /// Entries with no timestamp (files written before timestamps were kept)
    /// are stamped with `now` and age out from there.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::days(SEEN_RETENTION_DAYS);

        for storm_id in self.cone_advisories.keys() {
            self.advisory_seen_at.entry(storm_id.clone()).or_insert(now);
        }
        self.advisory_seen_at
            .retain(|id, seen| *seen >= cutoff && self.cone_advisories.contains_key(id));
        let advisory_seen_at = &self.advisory_seen_at;
        self.cone_advisories.retain(|id, _| advisory_seen_at.contains_key(id));

        for alert_id in &self.processed_alert_ids {
            self.alert_seen_at.entry(alert_id.clone()).or_insert(now);
        }
        self.alert_seen_at
            .retain(|id, seen| *seen >= cutoff && self.processed_alert_ids.contains(id));
        let alert_seen_at = &self.alert_seen_at;
        self.processed_alert_ids.retain(|id| alert_seen_at.contains_key(id));
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Why a notification was allowed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyReason {
    /// Level went up, or this is the first evaluation.
    Escalation,
    /// A storm in scope has an advisory number we have not seen.
    NewAdvisory,
    /// An NWS alert id we have not processed.
    NewAlert,
    /// Dropped to all-clear from a higher level.
    ThreatPassed,
    /// Nothing new, but the cooldown has elapsed.
    CooldownElapsed,
}

impl std::fmt::Display for NotifyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyReason::Escalation => write!(f, "escalation"),
            NotifyReason::NewAdvisory => write!(f, "new advisory"),
            NotifyReason::NewAlert => write!(f, "new NWS alert"),
            NotifyReason::ThreatPassed => write!(f, "threat passed"),
            NotifyReason::CooldownElapsed => write!(f, "cooldown elapsed"),
        }
    }
}

/// Outcome of one [`decide`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub notify: bool,
    /// Set exactly when `notify` is true.
    pub reason: Option<NotifyReason>,
    pub state: PersistedState,
}

/// Decides whether `new_level` warrants a notification and returns the
/// updated state.
///
/// Cooldown only suppresses repeats of an unchanged situation. Escalations,
/// new advisories, new NWS alerts and the first drop to all-clear always
/// notify no matter how recently we last did.
pub fn decide(
    new_level: AlertLevel,
    context: &SignalContext,
    mut state: PersistedState,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> Decision {
    let previous = state.last_alert_level;

    let escalated = previous.is_none_or(|prev| new_level > prev);
    let new_advisory = context
        .advisories
        .iter()
        .any(|(storm_id, advisory)| state.cone_advisories.get(storm_id) != Some(advisory));
    let new_alert = context
        .alert_ids
        .iter()
        .any(|id| !state.processed_alert_ids.contains(id));
    let threat_passed =
        new_level == AlertLevel::AllClear && previous.is_some_and(|prev| prev > AlertLevel::AllClear);
    let cooldown_elapsed = cooldown <= Duration::zero()
        || state
            .last_notified_at
            .is_none_or(|last| now.signed_duration_since(last) >= cooldown);

    let reason = if escalated {
        Some(NotifyReason::Escalation)
    } else if new_advisory {
        Some(NotifyReason::NewAdvisory)
    } else if new_alert {
        Some(NotifyReason::NewAlert)
    } else if threat_passed {
        Some(NotifyReason::ThreatPassed)
    } else if cooldown_elapsed {
        Some(NotifyReason::CooldownElapsed)
    } else {
        None
    };

    state.last_alert_level = Some(new_level);
    for (storm_id, advisory) in &context.advisories {
        state.cone_advisories.insert(storm_id.clone(), advisory.clone());
        state.advisory_seen_at.insert(storm_id.clone(), now);
    }
    for alert_id in &context.alert_ids {
        state.processed_alert_ids.insert(alert_id.clone());
        state.alert_seen_at.insert(alert_id.clone(), now);
    }
    state.prune(now);

    let notify = reason.is_some();
    if notify {
        state.last_notified_at = Some(now);
    }

    Decision { notify, reason, state }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state file I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("state file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("state file {0} is locked by another run")]
    Locked(PathBuf),
}

impl StateError {
    fn io(path: &Path, source: io::Error) -> Self {
        StateError::Io { path: path.to_path_buf(), source }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Reads and writes [`PersistedState`] at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    /// Loads state, surfacing every failure. A missing file is not a failure:
    /// it means we have never run.
    pub fn try_load(&self) -> Result<PersistedState, StateError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(PersistedState::default()),
            Err(e) => return Err(StateError::io(&self.path, e)),
        };
        if text.trim().is_empty() {
            return Ok(PersistedState::default());
        }
        serde_json::from_str(&text).map_err(|source| StateError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Loads state, falling back to a fresh record on any failure. Fresh state
    /// means we notify more often, never less.
    pub fn load(&self) -> PersistedState {
        match self.try_load() {
            Ok(state) => state,
            Err(e) => {
                log::warn!(target: targets::STATE, "{}; continuing with fresh state", e);
                PersistedState::default()
            }
        }
    }

    /// Writes state atomically: temp file, fsync, rename over the target.
    pub fn save(&self, state: &PersistedState) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StateError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(state).map_err(|source| StateError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.sibling(".tmp");
        let write_tmp = || -> io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()
        };
        write_tmp().map_err(|e| StateError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| StateError::io(&self.path, e))?;

        log::debug!(target: targets::STATE, "Saved state to {}", self.path.display());
        Ok(())
    }

    /// Resets the file to fresh state.
    pub fn clear(&self) -> Result<(), StateError> {
        self.save(&PersistedState::default())
    }

    /// Takes the exclusive lock guarding a read-decide-write sequence.
    ///
    /// Fails with [`StateError::Locked`] if another live run holds it. Locks
    /// older than [`STALE_LOCK_AFTER_MINUTES`] are broken.
    pub fn lock(&self) -> Result<StateLock, StateError> {
        let lock_path = self.sibling(".lock");
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StateError::io(parent, e))?;
        }

        for attempt in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(&lock_path) {
                Ok(mut file) => {
                    // Holder pid, for whoever finds a stuck lock. The lock
                    // itself is already held, so a failed write is not fatal.
                    if let Err(e) = writeln!(file, "{}", std::process::id()) {
                        log::warn!(
                            target: targets::STATE,
                            "Could not write pid to lock {}: {}",
                            lock_path.display(),
                            e
                        );
                    }
                    return Ok(StateLock { path: lock_path });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempt == 0 => {
                    if !lock_is_stale(&lock_path) {
                        return Err(StateError::Locked(self.path.clone()));
                    }
                    log::warn!(
                        target: targets::STATE,
                        "Breaking stale lock {}",
                        lock_path.display()
                    );
                    match fs::remove_file(&lock_path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                        Err(e) => return Err(StateError::io(&lock_path, e)),
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    return Err(StateError::Locked(self.path.clone()));
                }
                Err(e) => return Err(StateError::io(&lock_path, e)),
            }
        }
        Err(StateError::Locked(self.path.clone()))
    }
}

fn lock_is_stale(lock_path: &Path) -> bool {
    let modified = match fs::metadata(lock_path).and_then(|m| m.modified()) {
        Ok(modified) => DateTime::<Utc>::from(modified),
        // Vanished between the failed create and now: retry.
        Err(_) => return true,
    };
    Utc::now().signed_duration_since(modified) > Duration::minutes(STALE_LOCK_AFTER_MINUTES)
}

/// Exclusive hold on a state file. Released on drop.
#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!(
                target: targets::STATE,
                "Failed to release lock {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
