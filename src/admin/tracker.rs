//! In-flight admin actions keyed by entity id

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Approve,
    Reject,
}

impl fmt::Display for AdminAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminAction::Approve => write!(f, "approve"),
            AdminAction::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Debug, Default)]
pub struct ActionTracker {
    in_flight: Mutex<HashMap<String, AdminAction>>,
}

impl ActionTracker {
    /// Mark `id` busy. None if it already is.
    pub fn begin(&self, id: &str, action: AdminAction) -> Option<ActionGuard<'_>> {
        let mut in_flight = self.in_flight.lock().ok()?;
        if in_flight.contains_key(id) {
            return None;
        }
        in_flight.insert(id.to_string(), action);
        Some(ActionGuard {
            tracker: self,
            id: id.to_string(),
        })
    }

    /// Action currently running for `id`
    pub fn current(&self, id: &str) -> Option<AdminAction> {
        self.in_flight.lock().ok()?.get(id).copied()
    }
}

/// Clears the entry when the action ends, however it ends
pub struct ActionGuard<'a> {
    tracker: &'a ActionTracker,
    id: String,
}

impl Drop for ActionGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.tracker.in_flight.lock() {
            in_flight.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_clears_on_drop() {
        let tracker = ActionTracker::default();
        {
            let _guard = tracker.begin("w1", AdminAction::Approve).unwrap();
            assert_eq!(tracker.current("w1"), Some(AdminAction::Approve));
            assert!(tracker.begin("w1", AdminAction::Reject).is_none());
        }
        assert_eq!(tracker.current("w1"), None);
    }
}
