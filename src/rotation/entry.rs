use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::{PlanError, Result};
use crate::models::{InventoryEntry, RotationRules};
use crate::rotation::availability::is_eligible;

/// Observable state of an inventory entry at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryState {
    Available,
    /// Uses remain but the cooldown has not elapsed.
    Cooling,
    /// No uses left until the next reset.
    Exhausted,
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntryState::Available => "available",
            EntryState::Cooling => "cooling",
            EntryState::Exhausted => "exhausted",
        };
        f.pad(label)
    }
}

/// Classify an entry. Exhaustion takes precedence over cooling.
pub fn state_of(entry: &InventoryEntry, now: DateTime<Utc>) -> EntryState {
    if entry.remaining_uses == 0 {
        EntryState::Exhausted
    } else if now < entry.next_use_date {
        EntryState::Cooling
    } else {
        EntryState::Available
    }
}

/// `at + by`, or a configuration error when the date leaves chrono's range.
fn shift(at: DateTime<Utc>, by: Duration) -> Result<DateTime<Utc>> {
    at.checked_add_signed(by).ok_or_else(|| {
        PlanError::InvalidConfiguration(format!("date {at} plus {by} is out of range"))
    })
}

/// Restore the allowance if the reset date has been reached.
///
/// The reset date advances by whole cycles until it lies after `now`, so an
/// inventory left idle for several cycles lands on the same grid it would
/// have followed had it been visited every cycle. Returns whether a reset
/// happened.
pub fn reset_if_due(
    entry: &mut InventoryEntry,
    rules: &RotationRules,
    now: DateTime<Utc>,
) -> Result<bool> {
    if now < entry.next_reset_date {
        return Ok(false);
    }
    rules.validate()?;

    let cycle_secs = rules.cycle().num_seconds();
    let elapsed_secs = (now - entry.next_reset_date).num_seconds();
    let cycles = elapsed_secs / cycle_secs + 1;

    entry.next_reset_date = shift(entry.next_reset_date, Duration::seconds(cycles * cycle_secs))?;
    entry.remaining_uses = rules.max_occurrence;
    if entry.next_use_date < now {
        entry.next_use_date = now;
    }

    debug!(
        meal = %entry.meal,
        cycles,
        remaining_uses = entry.remaining_uses,
        next_reset = %entry.next_reset_date,
        "allowance reset"
    );
    Ok(true)
}

/// Cap the allowance at the configured maximum.
///
/// Needed when a meal's `maxOccurance` is edited down between resets.
pub fn clamp_allowance(entry: &mut InventoryEntry, rules: &RotationRules) {
    if entry.remaining_uses > rules.max_occurrence {
        entry.remaining_uses = rules.max_occurrence;
    }
}

/// Use the entry once: one fewer remaining use, cooldown starts at `now`.
pub fn consume(entry: &mut InventoryEntry, rules: &RotationRules, now: DateTime<Utc>) -> Result<()> {
    if !is_eligible(entry, now) {
        return Err(PlanError::InvalidStateTransition {
            meal: entry.meal,
            state: state_of(entry, now),
        });
    }

    rules.validate()?;

    entry.next_use_date = shift(now, rules.cooldown())?;
    entry.remaining_uses -= 1;

    debug!(
        meal = %entry.meal,
        remaining_uses = entry.remaining_uses,
        next_use = %entry.next_use_date,
        "entry consumed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 6, 9, 30, 0).unwrap()
    }

    fn rules(max_occurrence: u32, time_reset: u32, shortterm_adj: u32) -> RotationRules {
        RotationRules {
            max_occurrence,
            time_reset,
            shortterm_adj,
        }
    }

    fn entry(remaining: u32, next_use: DateTime<Utc>, next_reset: DateTime<Utc>) -> InventoryEntry {
        InventoryEntry {
            meal: Uuid::new_v4(),
            remaining_uses: remaining,
            next_reset_date: next_reset,
            next_use_date: next_use,
            rules: None,
        }
    }

    #[test]
    fn test_state_of() {
        let later = now() + Duration::days(1);
        assert_eq!(state_of(&entry(1, now(), later), now()), EntryState::Available);
        assert_eq!(state_of(&entry(1, later, later), now()), EntryState::Cooling);
        assert_eq!(state_of(&entry(0, later, later), now()), EntryState::Exhausted);
        assert_eq!(state_of(&entry(0, now(), later), now()), EntryState::Exhausted);
    }

    #[test]
    fn test_consume_sets_cooldown() {
        let mut e = entry(2, now() - Duration::days(1), now() + Duration::days(5));
        let reset_before = e.next_reset_date;

        consume(&mut e, &rules(3, 7, 3), now()).unwrap();

        assert_eq!(e.remaining_uses, 1);
        assert_eq!(e.next_use_date, now() + Duration::days(3));
        assert_eq!(e.next_reset_date, reset_before);
        assert_eq!(state_of(&e, now()), EntryState::Cooling);
    }

    #[test]
    fn test_consume_exhausted_fails() {
        let mut e = entry(0, now(), now() + Duration::days(5));
        let err = consume(&mut e, &rules(3, 7, 3), now()).unwrap_err();
        assert!(matches!(
            err,
            PlanError::InvalidStateTransition {
                state: EntryState::Exhausted,
                ..
            }
        ));
        assert_eq!(e.remaining_uses, 0);
    }

    #[test]
    fn test_consume_cooling_fails_without_mutation() {
        let mut e = entry(2, now() + Duration::hours(2), now() + Duration::days(5));
        let before = e.clone();
        let err = consume(&mut e, &rules(3, 7, 3), now()).unwrap_err();
        assert!(matches!(
            err,
            PlanError::InvalidStateTransition {
                state: EntryState::Cooling,
                ..
            }
        ));
        assert_eq!(e, before);
    }

    #[test]
    fn test_reset_not_due_is_noop() {
        let mut e = entry(0, now() + Duration::days(1), now() + Duration::seconds(1));
        let before = e.clone();
        assert!(!reset_if_due(&mut e, &rules(5, 7, 3), now()).unwrap());
        assert_eq!(e, before);
    }

    #[test]
    fn test_reset_advances_one_cycle() {
        let mut e = entry(0, now() - Duration::days(2), now() - Duration::days(1));
        assert!(reset_if_due(&mut e, &rules(5, 7, 3), now()).unwrap());

        assert_eq!(e.remaining_uses, 5);
        assert_eq!(e.next_reset_date, now() + Duration::days(6));
        assert_eq!(e.next_use_date, now());
    }

    #[test]
    fn test_reset_exactly_at_boundary() {
        let mut e = entry(0, now(), now());
        assert!(reset_if_due(&mut e, &rules(2, 7, 1), now()).unwrap());
        assert_eq!(e.next_reset_date, now() + Duration::days(7));
    }

    #[test]
    fn test_reset_replays_elapsed_cycles() {
        // Idle for 3 cycles and 2 days.
        let start = now() - Duration::days(23);
        let mut e = entry(0, start, start);
        assert!(reset_if_due(&mut e, &rules(4, 7, 2), now()).unwrap());

        assert_eq!(e.next_reset_date, start + Duration::days(28));
        assert!(e.next_reset_date > now());
        assert_eq!(e.remaining_uses, 4);
    }

    #[test]
    fn test_reset_keeps_future_cooldown() {
        let cooling_until = now() + Duration::days(2);
        let mut e = entry(1, cooling_until, now() - Duration::hours(1));
        reset_if_due(&mut e, &rules(3, 7, 3), now()).unwrap();
        assert_eq!(e.next_use_date, cooling_until);
        assert_eq!(e.remaining_uses, 3);
    }

    #[test]
    fn test_reset_rejects_zero_cycle() {
        let mut e = entry(0, now(), now());
        assert!(matches!(
            reset_if_due(&mut e, &rules(1, 0, 0), now()),
            Err(PlanError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_oversized_rules_rejected_without_panic() {
        let huge = rules(1, 100_000_000, 100_000_000);

        let mut due = entry(0, now(), now() - Duration::days(1));
        assert!(matches!(
            reset_if_due(&mut due, &huge, now()),
            Err(PlanError::InvalidConfiguration(_))
        ));

        let mut ready = entry(1, now(), now() + Duration::days(1));
        let before = ready.clone();
        assert!(matches!(
            consume(&mut ready, &huge, now()),
            Err(PlanError::InvalidConfiguration(_))
        ));
        assert_eq!(ready, before);
    }

    #[test]
    fn test_date_overflow_is_an_error() {
        let mut e = entry(1, DateTime::<Utc>::MAX_UTC, DateTime::<Utc>::MAX_UTC);
        assert!(matches!(
            consume(&mut e, &rules(1, 7, 3), DateTime::<Utc>::MAX_UTC),
            Err(PlanError::InvalidConfiguration(_))
        ));
        assert_eq!(e.remaining_uses, 1);
    }

    #[test]
    fn test_clamp_allowance() {
        let mut e = entry(5, now(), now() + Duration::days(1));
        clamp_allowance(&mut e, &rules(2, 7, 1));
        assert_eq!(e.remaining_uses, 2);

        clamp_allowance(&mut e, &rules(4, 7, 1));
        assert_eq!(e.remaining_uses, 2);
    }
}
