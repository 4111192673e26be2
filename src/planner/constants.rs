/// Uses per reset cycle for a meal created without one.
pub const DEFAULT_MAX_OCCURRENCE: u32 = 1;

/// Reset cycle length in days.
pub const DEFAULT_TIME_RESET_DAYS: u32 = 7;

/// Cooldown after each use, in days.
pub const DEFAULT_SHORTTERM_ADJ_DAYS: u32 = 3;

/// Longest reset cycle or cooldown accepted, in days (about a century).
pub const MAX_RULE_DAYS: u32 = 36_500;

/// Slots in a plan created without an explicit size.
pub const DEFAULT_PLAN_SIZE: usize = 7;

/// Attempts at load-build-save before a version conflict is surfaced.
pub const DEFAULT_MAX_SAVE_ATTEMPTS: u32 = 3;

// ─────────────────────────────────────────────────────────────────────────────
// Interactive lookup
// ─────────────────────────────────────────────────────────────────────────────

/// Minimum Jaro-Winkler similarity for a fuzzy meal-name match.
pub const FUZZY_MATCH_THRESHOLD: f64 = 0.7;

/// Fuzzy matches offered in the selection prompt.
pub const MAX_FUZZY_SUGGESTIONS: usize = 5;
