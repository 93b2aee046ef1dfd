//! Configuration structs for collections and migrations.

/// Configuration for a [`crate::Collection`].
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    /// Whether writes should additionally maintain a version counter per
    /// entity (reserved for future optimistic-locking support at this layer;
    /// collections do not yet expose it, but the flag is threaded through so
    /// callers can opt in without a breaking change).
    pub enable_versioning: bool,

    /// Whether to emit `tracing::debug!` events for every CRUD operation.
    pub enable_debug_logging: bool,

    /// Capacity of the per-entity lock LRU cache.
    pub max_cached_locks: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            enable_versioning: false,
            enable_debug_logging: false,
            max_cached_locks: 10_000,
        }
    }
}

impl CollectionConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to maintain a version counter per entity.
    #[must_use]
    pub const fn enable_versioning(mut self, value: bool) -> Self {
        self.enable_versioning = value;
        self
    }

    /// Sets whether to emit debug-level tracing events for CRUD operations.
    #[must_use]
    pub const fn enable_debug_logging(mut self, value: bool) -> Self {
        self.enable_debug_logging = value;
        self
    }

    /// Sets the lock cache capacity. Rejected at construction time if zero
    /// (see [`CollectionConfig::validate`]).
    #[must_use]
    pub const fn max_cached_locks(mut self, value: usize) -> Self {
        self.max_cached_locks = value;
        self
    }

    /// Validates this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_cached_locks` is zero.
    pub fn validate(&self) -> Result<(), crate::error::CoreError> {
        if self.max_cached_locks == 0 {
            return Err(crate::error::CoreError::invalid_argument(
                "max_cached_locks must be positive",
            ));
        }
        Ok(())
    }
}

/// Configuration for a [`crate::migration::MigrationManager`].
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// The version the database should be migrated to.
    pub current_version: String,

    /// Whether to run pending migrations automatically on initialization.
    pub auto_migrate: bool,

    /// Whether to snapshot the store before running a migration.
    pub create_backup_before_migration: bool,

    /// Maximum number of entries kept in the migration log ring.
    pub max_log_entries: usize,

    /// Whether to validate each entity after every migration step.
    pub validate_after_each_step: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            current_version: "0.0.0".to_string(),
            auto_migrate: true,
            create_backup_before_migration: true,
            max_log_entries: 100,
            validate_after_each_step: true,
        }
    }
}

impl MigrationConfig {
    /// Creates a new configuration targeting `version`.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            current_version: version.into(),
            ..Self::default()
        }
    }

    /// Sets whether to auto-migrate on initialization.
    #[must_use]
    pub const fn auto_migrate(mut self, value: bool) -> Self {
        self.auto_migrate = value;
        self
    }

    /// Sets whether to back up before migrating.
    #[must_use]
    pub const fn create_backup_before_migration(mut self, value: bool) -> Self {
        self.create_backup_before_migration = value;
        self
    }

    /// Sets the log ring capacity.
    #[must_use]
    pub const fn max_log_entries(mut self, value: usize) -> Self {
        self.max_log_entries = value;
        self
    }

    /// Sets whether to validate after each migration step.
    #[must_use]
    pub const fn validate_after_each_step(mut self, value: bool) -> Self {
        self.validate_after_each_step = value;
        self
    }

    /// Validates this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_log_entries` is zero.
    pub fn validate(&self) -> Result<(), crate::error::CoreError> {
        if self.max_log_entries == 0 {
            return Err(crate::error::CoreError::invalid_argument(
                "max_log_entries must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_collection_config() {
        let config = CollectionConfig::default();
        assert!(!config.enable_versioning);
        assert_eq!(config.max_cached_locks, 10_000);
    }

    #[test]
    fn collection_config_builder() {
        let config = CollectionConfig::new()
            .enable_debug_logging(true)
            .max_cached_locks(16);
        assert!(config.enable_debug_logging);
        assert_eq!(config.max_cached_locks, 16);
    }

    #[test]
    fn collection_config_rejects_zero_locks() {
        let config = CollectionConfig::new().max_cached_locks(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn migration_config_defaults() {
        let config = MigrationConfig::default();
        assert_eq!(config.current_version, "0.0.0");
        assert!(config.auto_migrate);
        assert_eq!(config.max_log_entries, 100);
    }

    #[test]
    fn migration_config_rejects_zero_log_size() {
        let config = MigrationConfig::new("1.0.0").max_log_entries(0);
        assert!(config.validate().is_err());
    }
}
