//! Deduplicator (spec §4.9): coalesces near-duplicate events within a time
//! tolerance, keyed by `(event_kind, event_action)`, preserving provenance.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::model::Event;
use crate::value::Value;

/// A key a retained event attribute's conflicting values are recorded under,
/// bounded per spec §9's Design Note ("bound growth... cap at 100 conflicts
/// per key").
const CONFLICT_CAP: usize = 100;

/// How to resolve attribute-value conflicts when merging a duplicate into
/// its retained event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Keep the retained event's attribute value; drop the incoming one.
    KeepOriginal,
    /// Keep the retained value, but append `{original, new, timestamp}` to
    /// a bounded `_conflict_<k>` list.
    LogConflict,
}

/// Dedup run parameters (spec §4.9).
#[derive(Debug, Clone)]
pub struct DedupOptions {
    pub tolerance_ms: i64,
    pub conflict_policy: ConflictPolicy,
    pub exclude_actions: Vec<String>,
}

impl Default for DedupOptions {
    fn default() -> Self {
        Self {
            tolerance_ms: 100,
            conflict_policy: ConflictPolicy::KeepOriginal,
            exclude_actions: Vec::new(),
        }
    }
}

/// Run the deduplicator over `events` (possibly unsorted), returning the
/// filtered/merged list in retained-event order.
#[must_use]
pub fn dedup(events: Vec<Event>, options: &DedupOptions) -> Vec<Event> {
    let mut sorted = events;
    sorted.sort_by_key(|e| if e.timestamp == 0 { 0 } else { e.timestamp });

    let mut retained: Vec<Event> = Vec::new();
    let mut retained_index: HashMap<(String, String), usize> = HashMap::new();

    for event in sorted {
        if options.exclude_actions.contains(&event.event_action) || event.timestamp == 0 {
            retained.push(event);
            continue;
        }

        let key = (event.event_kind.clone(), event.event_action.clone());
        if let Some(&index) = retained_index.get(&key) {
            let gap = (retained[index].timestamp - event.timestamp).abs();
            if gap <= options.tolerance_ms {
                merge_into(&mut retained[index], event, options.conflict_policy);
                continue;
            }
        }

        retained_index.insert(key, retained.len());
        retained.push(event);
    }

    retained
}

/// Merge `incoming` into `target`, appending provenance and resolving
/// attribute conflicts (spec §4.9 step 3).
fn merge_into(target: &mut Event, incoming: Event, policy: ConflictPolicy) {
    target.raw_data_ids.extend(incoming.raw_data_ids);
    target.file_ids.extend(incoming.file_ids);
    target.extra_timestamps.push(incoming.timestamp);

    for (key, value) in incoming.attributes {
        match target.attributes.get(&key) {
            None => {
                target.attributes.insert(key, value);
            }
            Some(existing) if *existing == value => {}
            Some(existing) => {
                if policy == ConflictPolicy::LogConflict {
                    record_conflict(target, &key, existing.clone(), value, incoming.timestamp);
                }
            }
        }
    }

    target.deduplicated = true;
}

fn record_conflict(target: &mut Event, key: &str, original: Value, new: Value, timestamp: i64) {
    let conflict_key = format!("_conflict_{key}");
    let entry = target
        .attributes
        .entry(conflict_key)
        .or_insert_with(|| Value::List(Vec::new()));

    let Value::List(list) = entry else {
        return;
    };
    if list.len() >= CONFLICT_CAP {
        return;
    }

    #[allow(clippy::cast_precision_loss)]
    let timestamp_value = Value::Number(timestamp as f64);

    let mut record = IndexMap::new();
    record.insert("original".to_string(), original);
    record.insert("new".to_string(), new);
    record.insert("timestamp".to_string(), timestamp_value);
    list.push(Value::Mapping(record));
}
