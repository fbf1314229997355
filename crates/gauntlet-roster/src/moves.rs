//! Moveset rules.
//!
//! A moveset always holds 1 to 4 distinct moves. Learning is a substitution
//! (or an append into a free slot), never a removal, so a valid moveset
//! stays valid.

use gauntlet_types::MAX_MOVES;

/// Check that `moves` holds 1 to 4 distinct, non-empty names.
///
/// Returns a description of the first problem found.
pub fn validate_moveset(moves: &[String]) -> Result<(), String> {
    if moves.is_empty() {
        return Err(String::from("moveset is empty"));
    }
    if moves.len() > MAX_MOVES {
        return Err(format!(
            "moveset has {} moves, at most {MAX_MOVES} allowed",
            moves.len()
        ));
    }
    for (i, name) in moves.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(String::from("moveset contains a blank move name"));
        }
        if moves.iter().skip(i.saturating_add(1)).any(|other| other == name) {
            return Err(format!("move {name} appears more than once"));
        }
    }
    Ok(())
}

/// Convert a 1-based slot into a 0-based index, or `None` if the slot is
/// outside `1..=4`.
pub fn slot_index(slot: u8) -> Option<usize> {
    let slot = usize::from(slot);
    if (1..=MAX_MOVES).contains(&slot) {
        slot.checked_sub(1)
    } else {
        None
    }
}

/// Write `move_name` into `index`.
///
/// Overwrites the existing move at `index` and returns it. When the
/// moveset is shorter than `index + 1` the move is appended instead and
/// `None` is returned. The caller has already rejected duplicates and
/// out-of-range indices.
pub fn write_slot(moves: &mut Vec<String>, index: usize, move_name: &str) -> Option<String> {
    if let Some(existing) = moves.get_mut(index) {
        Some(core::mem::replace(existing, move_name.to_owned()))
    } else {
        moves.push(move_name.to_owned());
        None
    }
}
