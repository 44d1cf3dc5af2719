//! Advisory response/resolution timelines per category.
//!
//! Pure lookup, no state. The timeline is surfaced to citizens so they know
//! what to expect; nothing here rejects writes.

use serde::{Deserialize, Serialize};

/// Severity tier used for timeline display. Distinct from `IssuePriority`:
/// this is a property of the category, not of a single issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelinePriority {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for TimelinePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    pub priority: TimelinePriority,
    pub response_hours: u32,
    pub resolution_hours: u32,
}

/// Expected handling timeline for a category. Unknown categories get the
/// medium 120h/336h default.
pub fn timeline_for(category: &str) -> Timeline {
    use TimelinePriority::*;

    let (priority, response_hours, resolution_hours) = match category {
        "Public Safety" => (Critical, 6, 24),
        "Water Leak" => (Critical, 24, 48),
        "Drainage Problems" => (Critical, 24, 48),
        "Road Repair" => (High, 72, 336),
        "Garbage Collection" => (High, 72, 240),
        "Street Light Issue" => (Medium, 120, 336),
        "Traffic Signal" => (Medium, 120, 336),
        "Parking Violation" => (Low, 168, 504),
        "Noise Complaint" => (Low, 168, 504),
        _ => (Medium, 120, 336),
    };

    Timeline {
        priority,
        response_hours,
        resolution_hours,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_water_leak_timeline() {
        let t = timeline_for("Water Leak");
        assert_eq!(t.priority, TimelinePriority::Critical);
        assert_eq!(t.response_hours, 24);
        assert_eq!(t.resolution_hours, 48);
    }

    #[test]
    fn test_public_safety_is_fastest() {
        let t = timeline_for("Public Safety");
        assert_eq!(t.priority, TimelinePriority::Critical);
        assert_eq!(t.response_hours, 6);
        assert_eq!(t.resolution_hours, 24);
    }

    #[test]
    fn test_unknown_category_defaults_to_medium() {
        let t = timeline_for("Stray Cattle");
        assert_eq!(t.priority, TimelinePriority::Medium);
        assert_eq!(t.response_hours, 120);
        assert_eq!(t.resolution_hours, 336);
        assert_eq!(timeline_for("Others"), t);
    }

    #[test]
    fn test_lookup_is_deterministic() {
        assert_eq!(timeline_for("Road Repair"), timeline_for("Road Repair"));
    }
}
