//! Test-script injection into a request node

use crate::tree::node::{Event, RequestNode};
use chrono::{DateTime, Utc};

/// Trigger name of the event that holds test scripts
pub const TEST_EVENT: &str = "test";

/// Prefix the generated script with a timestamped header comment
pub fn wrap_generated_script(script: &str, generated_at: DateTime<Utc>) -> String {
    format!(
        "// AI-Generated Test ({} UTC)\n{}\n",
        generated_at.format("%H:%M:%S"),
        script.trim_end()
    )
}

/// Return a copy of `node` with `script` placed first in its "test" event.
///
/// Existing script lines are kept after the new one; every field outside the
/// event list is copied unchanged.
pub fn inject_test_script(
    node: &RequestNode,
    script: &str,
    generated_at: DateTime<Utc>,
) -> RequestNode {
    let mut patched = node.clone();
    let events = patched.events.get_or_insert_with(Vec::new);

    let index = match events.iter().position(|e| e.listen == TEST_EVENT) {
        Some(index) => index,
        None => {
            events.push(Event::new(TEST_EVENT));
            events.len() - 1
        }
    };

    events[index]
        .script
        .exec
        .insert(0, wrap_generated_script(script, generated_at));
    patched
}
