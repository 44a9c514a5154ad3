//! Fixed mission tables.

/// One canned investigative question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mission {
    pub id: &'static str,
    pub query: &'static str,
    pub risk_weight: u32,
}

const fn mission(id: &'static str, query: &'static str, risk_weight: u32) -> Mission {
    Mission {
        id,
        query,
        risk_weight,
    }
}

pub const DEFAULT_DOMAIN: &str = "general";

const SECURITY: &[Mission] = &[
    mission("failed_logins", "Show recent failed logins", 3),
    mission("flagged_transactions", "List flagged transactions", 4),
];

const RISK: &[Mission] = &[
    mission("high_value_transactions", "List high value transactions", 3),
    mission("failed_logins", "Show recent failed logins", 3),
];

const OPERATIONS: &[Mission] = &[
    mission("recent_logins", "Show recent logins", 1),
    mission("recent_transactions", "List transactions", 1),
];

const COMPLIANCE: &[Mission] = &[
    mission("all_users", "List all users", 1),
    mission("recent_logins", "Show recent logins", 1),
];

const GENERAL: &[Mission] = &[
    mission("all_users", "List users", 1),
    mission("recent_transactions", "List transactions", 1),
];

/// Missions for `domain`, in run order. Unknown domains get the general list.
pub fn missions_for(domain: &str) -> &'static [Mission] {
    match domain {
        "security" => SECURITY,
        "risk" => RISK,
        "operations" => OPERATIONS,
        "compliance" => COMPLIANCE,
        _ => GENERAL,
    }
}

/// A mission whose risk reaches this triggers its deep-dive.
pub const DEEP_DIVE_THRESHOLD: u32 = 6;

const DEEP_DIVES: &[(&str, &str)] = &[
    ("failed_logins", "Show failed logins by user_id"),
    ("flagged_transactions", "List flagged transactions by user_id"),
    ("high_value_transactions", "List transactions by user_id"),
];

pub fn deep_dive_for(mission_id: &str) -> Option<&'static str> {
    DEEP_DIVES
        .iter()
        .find(|(id, _)| *id == mission_id)
        .map(|(_, query)| *query)
}

/// Rows beyond this many add no further risk.
pub const MAX_RISK_ROWS: usize = 10;

pub fn mission_risk(row_count: usize, risk_weight: u32) -> u32 {
    // Bounded by MAX_RISK_ROWS, so the cast cannot truncate.
    row_count.min(MAX_RISK_ROWS) as u32 * risk_weight
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_domain_has_two_missions() {
        for domain in ["security", "risk", "operations", "compliance", "general"] {
            assert_eq!(missions_for(domain).len(), 2, "{domain}");
        }
    }

    #[test]
    fn unknown_domain_uses_general() {
        assert_eq!(missions_for("unknown_xyz"), missions_for(DEFAULT_DOMAIN));
        assert_eq!(missions_for("Security"), missions_for(DEFAULT_DOMAIN));
    }

    #[test]
    fn risk_caps_row_count() {
        assert_eq!(mission_risk(0, 4), 0);
        assert_eq!(mission_risk(2, 3), 6);
        assert_eq!(mission_risk(500, 3), 30);
    }

    #[test]
    fn deep_dives_exist_only_for_risky_missions() {
        assert_eq!(deep_dive_for("failed_logins"), Some("Show failed logins by user_id"));
        assert_eq!(deep_dive_for("all_users"), None);
    }
}
