//! The migration history ring, persisted under the reserved
//! `__migration_history__` id.

use entidb_codec::Value;

/// Direction a migration step moved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Walking `fromVersion` ascending via `migrate_up`.
    Up,
    /// Walking `toVersion` descending via `migrate_down`.
    Down,
}

impl MigrationDirection {
    fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    fn from_str(text: &str) -> Self {
        match text {
            "down" => Self::Down,
            _ => Self::Up,
        }
    }
}

/// What happened when a migration step was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The transform (and validation, if enabled) completed.
    Success,
    /// The transform failed and no backup was available to restore.
    Failed,
    /// The step was never attempted.
    Skipped,
    /// The transform failed and storage was restored from the
    /// pre-migration backup.
    RolledBack,
}

impl MigrationOutcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::RolledBack => "rolled-back",
        }
    }

    fn from_str(text: &str) -> Self {
        match text {
            "failed" => Self::Failed,
            "skipped" => Self::Skipped,
            "rolled-back" => Self::RolledBack,
            _ => Self::Success,
        }
    }
}

/// One completed or failed migration step.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationLogEntry {
    /// Version migrated from.
    pub from: String,
    /// Version migrated to.
    pub to: String,
    /// The strategy's name.
    pub strategy: String,
    /// Direction this step moved in.
    pub direction: MigrationDirection,
    /// What happened.
    pub outcome: MigrationOutcome,
    /// Milliseconds since the Unix epoch when the step started.
    pub timestamp_millis: i64,
    /// How long the step took, in milliseconds.
    pub duration_millis: u64,
    /// Number of non-reserved entities present immediately after the step.
    pub entities_affected: usize,
    /// Error description, present whenever `outcome` isn't `Success`.
    pub error: Option<String>,
    /// Free-form metadata a strategy or caller wants attached to the entry.
    pub metadata: Option<Value>,
}

impl MigrationLogEntry {
    fn to_value(&self) -> Value {
        Value::map(vec![
            (Value::Text("from".into()), Value::Text(self.from.clone())),
            (Value::Text("to".into()), Value::Text(self.to.clone())),
            (Value::Text("strategy".into()), Value::Text(self.strategy.clone())),
            (Value::Text("direction".into()), Value::Text(self.direction.as_str().to_string())),
            (Value::Text("outcome".into()), Value::Text(self.outcome.as_str().to_string())),
            (Value::Text("timestamp_millis".into()), Value::Integer(self.timestamp_millis)),
            (Value::Text("duration_millis".into()), Value::Integer(self.duration_millis as i64)),
            (Value::Text("entities_affected".into()), Value::Integer(self.entities_affected as i64)),
            (Value::Text("error".into()), self.error.clone().map(Value::Text).unwrap_or(Value::Null)),
            (Value::Text("metadata".into()), self.metadata.clone().unwrap_or(Value::Null)),
        ])
    }

    fn from_value(value: &Value) -> Option<Self> {
        let entries = value.as_map()?;
        let field = |name: &str| entries.iter().find(|(k, _)| k.as_text() == Some(name)).map(|(_, v)| v);
        let get_text = |name: &str| field(name).and_then(Value::as_text).map(str::to_string);

        let direction = field("direction")
            .and_then(Value::as_text)
            .map(MigrationDirection::from_str)
            .unwrap_or(MigrationDirection::Up);
        let outcome = field("outcome")
            .and_then(Value::as_text)
            .map(MigrationOutcome::from_str)
            .unwrap_or(MigrationOutcome::Success);
        let timestamp_millis = field("timestamp_millis").and_then(Value::as_integer).unwrap_or(0);
        let duration_millis = field("duration_millis").and_then(Value::as_integer).unwrap_or(0).max(0) as u64;
        let entities_affected = field("entities_affected").and_then(Value::as_integer).unwrap_or(0).max(0) as usize;
        let error = get_text("error");
        let metadata = field("metadata").filter(|v| !matches!(v, Value::Null)).cloned();

        Some(Self {
            from: get_text("from")?,
            to: get_text("to")?,
            strategy: get_text("strategy")?,
            direction,
            outcome,
            timestamp_millis,
            duration_millis,
            entities_affected,
            error,
            metadata,
        })
    }
}

/// Decodes the log ring from its stored representation.
#[must_use]
pub fn decode_ring(value: &Value) -> Vec<MigrationLogEntry> {
    match value {
        Value::Array(items) => items.iter().filter_map(MigrationLogEntry::from_value).collect(),
        _ => Vec::new(),
    }
}

/// Encodes the log ring, keeping only the most recent `max_entries`.
#[must_use]
pub fn encode_ring(entries: &[MigrationLogEntry], max_entries: usize) -> Value {
    let start = entries.len().saturating_sub(max_entries);
    Value::Array(entries[start..].iter().map(MigrationLogEntry::to_value).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(from: &str, to: &str) -> MigrationLogEntry {
        MigrationLogEntry {
            from: from.to_string(),
            to: to.to_string(),
            strategy: "test".to_string(),
            direction: MigrationDirection::Up,
            outcome: MigrationOutcome::Success,
            timestamp_millis: 0,
            duration_millis: 5,
            entities_affected: 3,
            error: None,
            metadata: None,
        }
    }

    #[test]
    fn roundtrips_through_value() {
        let entries = vec![entry("1.0.0", "1.1.0"), entry("1.1.0", "2.0.0")];
        let value = encode_ring(&entries, 10);
        assert_eq!(decode_ring(&value), entries);
    }

    #[test]
    fn bounds_ring_to_max_entries() {
        let entries: Vec<_> = (0..5).map(|i| entry(&i.to_string(), &(i + 1).to_string())).collect();
        let value = encode_ring(&entries, 2);
        let decoded = decode_ring(&value);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].from, "3");
        assert_eq!(decoded[1].from, "4");
    }

    #[test]
    fn decode_of_non_array_is_empty() {
        assert!(decode_ring(&Value::Null).is_empty());
    }

    #[test]
    fn roundtrips_failure_with_error_and_direction() {
        let mut failed = entry("2.0.0", "1.0.0");
        failed.direction = MigrationDirection::Down;
        failed.outcome = MigrationOutcome::RolledBack;
        failed.error = Some("boom".to_string());

        let value = encode_ring(&[failed.clone()], 10);
        let decoded = decode_ring(&value);
        assert_eq!(decoded, vec![failed]);
        assert_eq!(decoded[0].direction, MigrationDirection::Down);
        assert_eq!(decoded[0].outcome, MigrationOutcome::RolledBack);
        assert_eq!(decoded[0].error.as_deref(), Some("boom"));
    }
}
