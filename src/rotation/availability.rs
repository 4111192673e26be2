use chrono::{DateTime, Utc};

use crate::models::InventoryEntry;

/// Whether an entry may be selected at `now`.
///
/// True iff allowance remains and the cooldown has elapsed. Does not apply
/// a due reset; callers evaluate the post-reset view.
#[inline]
pub fn is_eligible(entry: &InventoryEntry, now: DateTime<Utc>) -> bool {
    entry.remaining_uses > 0 && now >= entry.next_use_date
}
