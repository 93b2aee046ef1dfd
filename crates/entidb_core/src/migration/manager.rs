//! Migration orchestration: version-graph pathfinding, execution, backup
//! and restore, and log-ring bookkeeping.

use super::log::{decode_ring, encode_ring, MigrationDirection, MigrationLogEntry, MigrationOutcome};
use super::strategy::MigrationStrategy;
use super::version::{self, Version};
use crate::config::MigrationConfig;
use crate::entity::{is_reserved_id, MIGRATION_HISTORY_ID, SCHEMA_VERSION_ID};
use crate::error::{CoreError, CoreResult};
use entidb_codec::Value;
use entidb_storage::StoragePort;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

/// Outcome of a completed [`MigrationManager::migrate_to`] run.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    /// The version migration started from.
    pub from: String,
    /// The version migration ended at.
    pub to: String,
    /// Names of the strategies applied, in order.
    pub steps_applied: Vec<String>,
}

/// Coordinates a set of [`MigrationStrategy`] edges over a [`StoragePort`].
pub struct MigrationManager {
    config: MigrationConfig,
    strategies: Vec<Box<dyn MigrationStrategy>>,
}

impl MigrationManager {
    /// Creates a manager with the given configuration and no strategies
    /// registered yet.
    #[must_use]
    pub fn new(config: MigrationConfig) -> Self {
        Self { config, strategies: Vec::new() }
    }

    /// Registers a strategy as an edge in the version graph.
    pub fn register(&mut self, strategy: Box<dyn MigrationStrategy>) {
        self.strategies.push(strategy);
    }

    /// Reads the schema version recorded in `storage`, initializing it to
    /// `self.config.current_version` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::migration_init_failed`] if the stored record
    /// isn't a string, or a storage error.
    pub fn current_version(&self, storage: &dyn StoragePort) -> CoreResult<String> {
        match storage.get(SCHEMA_VERSION_ID)? {
            Some(Value::Text(version)) => Ok(version),
            Some(_) => Err(CoreError::migration_init_failed("schema version record is not a string")),
            None => {
                let initial = self.config.current_version.clone();
                storage.upsert(SCHEMA_VERSION_ID, Value::Text(initial.clone()))?;
                Ok(initial)
            }
        }
    }

    /// Finds a path of strategies from `from` to `to`, walking `fromVersion`
    /// ascending (via `migrate_up`) when upgrading, or `toVersion`
    /// descending (via `migrate_down`) when downgrading — the same
    /// registered strategies serve both directions.
    fn path_to(&self, from: &str, to: &str) -> CoreResult<(MigrationDirection, Vec<&dyn MigrationStrategy>)> {
        if from == to {
            return Ok((MigrationDirection::Up, Vec::new()));
        }
        let direction = match version::compare(from, to) {
            Ordering::Less => MigrationDirection::Up,
            _ => MigrationDirection::Down,
        };

        let mut edges: HashMap<&str, Vec<&dyn MigrationStrategy>> = HashMap::new();
        for strategy in &self.strategies {
            let key = match direction {
                MigrationDirection::Up => strategy.from_version(),
                MigrationDirection::Down => strategy.to_version(),
            };
            edges.entry(key).or_default().push(strategy.as_ref());
        }

        let mut queue = VecDeque::from([from.to_string()]);
        let mut came_from: HashMap<String, (&dyn MigrationStrategy, String)> = HashMap::new();
        let mut visited = HashSet::new();
        visited.insert(from.to_string());

        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut path = Vec::new();
                let mut node = to.to_string();
                while node != from {
                    let (strategy, prev) = &came_from[&node];
                    path.push(*strategy);
                    node = prev.clone();
                }
                path.reverse();
                return Ok((direction, path));
            }
            for strategy in edges.get(current.as_str()).into_iter().flatten() {
                let next = match direction {
                    MigrationDirection::Up => strategy.to_version().to_string(),
                    MigrationDirection::Down => strategy.from_version().to_string(),
                };
                if visited.insert(next.clone()) {
                    came_from.insert(next.clone(), (*strategy, current.clone()));
                    queue.push_back(next);
                }
            }
        }
        Err(CoreError::migration_no_path(from, to))
    }

    /// Runs a minimal validator over every non-reserved entity: the id must
    /// be non-empty and the stored value must be map-shaped.
    fn validate_entities(storage: &dyn StoragePort) -> CoreResult<usize> {
        let mut count = 0;
        for (id, attrs) in storage.get_all()? {
            if is_reserved_id(&id) {
                continue;
            }
            if id.is_empty() {
                return Err(CoreError::migration_step_failed("entity has an empty id"));
            }
            if attrs.as_map().is_none() {
                return Err(CoreError::migration_step_failed(format!("entity {id} is not map-shaped")));
            }
            count += 1;
        }
        Ok(count)
    }

    fn count_non_reserved(storage: &dyn StoragePort) -> CoreResult<usize> {
        Ok(storage.get_all()?.into_iter().filter(|(id, _)| !is_reserved_id(id)).count())
    }

    fn now_millis() -> i64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
    }

    fn append_log(&self, storage: &dyn StoragePort, entry: MigrationLogEntry) -> CoreResult<()> {
        let mut entries = storage.get(MIGRATION_HISTORY_ID)?.map(|v| decode_ring(&v)).unwrap_or_default();
        entries.push(entry);
        let value = encode_ring(&entries, self.config.max_log_entries);
        storage.upsert(MIGRATION_HISTORY_ID, value)?;
        Ok(())
    }

    /// Migrates `storage` from its current recorded version to `target`,
    /// walking the path in whichever direction `target` lies in.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::migration_no_path`] if no sequence of
    /// registered strategies connects the two versions,
    /// [`CoreError::migration_step_failed`] if a strategy's transform or
    /// post-step validation fails, or [`CoreError::migration_rollback_failed`]
    /// if a failed step's restore-from-backup also fails.
    pub fn migrate_to(&self, storage: &dyn StoragePort, target: &str) -> CoreResult<MigrationReport> {
        Version::parse(target)?;
        let from = self.current_version(storage)?;
        let (direction, path) = self.path_to(&from, target)?;

        let backup = if self.config.create_backup_before_migration {
            Some(storage.get_all()?)
        } else {
            None
        };

        let mut applied = Vec::new();
        for strategy in &path {
            let started_at = Self::now_millis();
            let step_from = strategy.from_version().to_string();
            let step_to = strategy.to_version().to_string();
            let (log_from, log_to) = match direction {
                MigrationDirection::Up => (step_from, step_to),
                MigrationDirection::Down => (step_to, step_from),
            };

            let outcome = match direction {
                MigrationDirection::Up => strategy.migrate_up(storage),
                MigrationDirection::Down => strategy.migrate_down(storage),
            }
            .and_then(|()| {
                if self.config.validate_after_each_step {
                    Self::validate_entities(storage)
                } else {
                    Self::count_non_reserved(storage)
                }
            });

            match outcome {
                Ok(entities_affected) => {
                    self.append_log(
                        storage,
                        MigrationLogEntry {
                            from: log_from,
                            to: log_to,
                            strategy: strategy.name().to_string(),
                            direction,
                            outcome: MigrationOutcome::Success,
                            timestamp_millis: started_at,
                            duration_millis: (Self::now_millis() - started_at).max(0) as u64,
                            entities_affected,
                            error: None,
                            metadata: None,
                        },
                    )?;
                    applied.push(strategy.name().to_string());
                }
                Err(err) => {
                    let restored = match &backup {
                        Some(snapshot) => {
                            storage.delete_all().map_err(|e| {
                                CoreError::migration_rollback_failed(format!("delete_all during restore: {e}"))
                            })?;
                            storage.insert_many(snapshot.clone()).map_err(|e| {
                                CoreError::migration_rollback_failed(format!("insert_many during restore: {e}"))
                            })?;
                            true
                        }
                        None => false,
                    };
                    self.append_log(
                        storage,
                        MigrationLogEntry {
                            from: log_from,
                            to: log_to,
                            strategy: strategy.name().to_string(),
                            direction,
                            outcome: if restored { MigrationOutcome::RolledBack } else { MigrationOutcome::Failed },
                            timestamp_millis: started_at,
                            duration_millis: (Self::now_millis() - started_at).max(0) as u64,
                            entities_affected: 0,
                            error: Some(err.to_string()),
                            metadata: None,
                        },
                    )?;
                    return Err(CoreError::migration_step_failed(format!(
                        "strategy {} ({} -> {}) failed: {err}",
                        strategy.name(),
                        strategy.from_version(),
                        strategy.to_version()
                    )));
                }
            }
        }

        storage.upsert(SCHEMA_VERSION_ID, Value::Text(target.to_string()))?;
        Ok(MigrationReport { from, to: target.to_string(), steps_applied: applied })
    }
}
