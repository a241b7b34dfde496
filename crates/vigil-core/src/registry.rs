//! Target registry — the static set of monitored targets.
//!
//! Built once from an `id:label,id:label,…` string and never structurally
//! modified afterwards. Only each target's `failure_count` changes.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::types::{MonitoredTarget, TargetId};

const ENTRY_SEPARATOR: char = ',';
const FIELD_SEPARATOR: char = ':';

/// Ordered, duplicate-free collection of monitored targets.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    targets: Vec<MonitoredTarget>,
}

impl Registry {
    /// Parse a target list.
    ///
    /// An entry is accepted only if it splits into exactly two non-empty
    /// fields. Malformed or duplicate entries are dropped so that one bad
    /// entry never stops the rest from being monitored.
    pub fn parse(input: &str) -> Self {
        let mut seen = HashSet::new();
        let mut targets = Vec::new();

        for entry in input.split(ENTRY_SEPARATOR) {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }

            let Some((id, label)) = parse_entry(entry) else {
                warn!(%entry, "ignoring malformed target entry");
                continue;
            };

            if !seen.insert(id.to_string()) {
                warn!(target_id = %id, "ignoring duplicate target entry");
                continue;
            }

            targets.push(MonitoredTarget::new(id, label));
        }

        debug!(count = targets.len(), "target registry built");
        Self { targets }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MonitoredTarget> {
        self.targets.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut MonitoredTarget> {
        self.targets.iter_mut()
    }

    pub fn get(&self, target_id: &TargetId) -> Option<&MonitoredTarget> {
        self.targets.iter().find(|t| &t.target_id == target_id)
    }
}

fn parse_entry(entry: &str) -> Option<(&str, &str)> {
    let mut fields = entry.split(FIELD_SEPARATOR).map(str::trim);
    let id = fields.next()?;
    let label = fields.next()?;
    if fields.next().is_some() || id.is_empty() || label.is_empty() {
        return None;
    }
    Some((id, label))
}
