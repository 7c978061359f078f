use serde_json::Value;

use crate::types::*;

/// Collects `(path, old, new)` for every leaf that differs. Array elements are keyed by index.
pub(crate) fn diff_json(
    previous: &Value,
    current: &Value,
    path_prefix: &str,
    changes: &mut Vec<(String, Value, Value)>,
) {
    let join = |key: &str| {
        if path_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{path_prefix}.{key}")
        }
    };
    match (previous, current) {
        (Value::Object(prev_map), Value::Object(curr_map)) => {
            for (key, curr_val) in curr_map {
                let path = join(key);
                match prev_map.get(key) {
                    Some(prev_val) => diff_json(prev_val, curr_val, &path, changes),
                    None => changes.push((path, Value::Null, curr_val.clone())),
                }
            }
            for (key, prev_val) in prev_map {
                if !curr_map.contains_key(key) {
                    changes.push((join(key), prev_val.clone(), Value::Null));
                }
            }
        }
        (Value::Array(prev_arr), Value::Array(curr_arr)) => {
            for (idx, curr_val) in curr_arr.iter().enumerate() {
                let path = join(&idx.to_string());
                match prev_arr.get(idx) {
                    Some(prev_val) => diff_json(prev_val, curr_val, &path, changes),
                    None => changes.push((path, Value::Null, curr_val.clone())),
                }
            }
            for (idx, prev_val) in prev_arr.iter().enumerate().skip(curr_arr.len()) {
                changes.push((join(&idx.to_string()), prev_val.clone(), Value::Null));
            }
        }
        (prev, curr) if prev != curr => {
            changes.push((path_prefix.to_string(), prev.clone(), curr.clone()));
        }
        _ => {}
    }
}

/// Typed events between two published snapshots. With no previous snapshot every
/// thermostat is reported as added and nothing else.
pub(crate) fn diff_snapshots(previous: Option<&Snapshot>, current: &Snapshot) -> Vec<Event> {
    let mut events = Vec::new();

    let Some(previous) = previous else {
        events.extend(current.thermostats().iter().map(|t| Event::ThermostatAdded {
            code: t.code.clone(),
            name: t.name.clone(),
        }));
        return events;
    };

    for curr in current.thermostats() {
        let Some(prev) = previous.get(&curr.code) else {
            events.push(Event::ThermostatAdded {
                code: curr.code.clone(),
                name: curr.name.clone(),
            });
            continue;
        };

        if prev.current_temperature != curr.current_temperature {
            events.push(Event::CurrentTemperatureChanged {
                code: curr.code.clone(),
                name: curr.name.clone(),
                temperature: curr.current_temperature,
            });
        }
        if prev.target_temperature != curr.target_temperature {
            events.push(Event::TargetTemperatureChanged {
                code: curr.code.clone(),
                name: curr.name.clone(),
                temperature: curr.target_temperature,
            });
        }
        let mode = curr.hvac_mode();
        if prev.hvac_mode() != mode {
            events.push(Event::HvacModeChanged {
                code: curr.code.clone(),
                name: curr.name.clone(),
                mode,
            });
        }
    }

    for prev in previous.thermostats() {
        if current.get(&prev.code).is_none() {
            events.push(Event::ThermostatRemoved {
                code: prev.code.clone(),
                name: prev.name.clone(),
            });
        }
    }

    events
}
