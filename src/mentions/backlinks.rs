//! Bidirectional link discovery by scanning card bodies.
//!
//! There is no persistent index: every query scans the full card set. The
//! card being edited is scanned from its live buffer rather than the stored
//! body, so links show up before autosave catches up.

use crate::models::{Card, CardId};

use super::token::{outgoing_ids, references};

/// Cards referenced by `current_text`, resolved against `all_cards`,
/// excluding `card_id` itself. Dangling IDs are dropped.
pub fn outgoing<'a>(card_id: CardId, all_cards: &'a [Card], current_text: &str) -> Vec<&'a Card> {
    outgoing_ids(current_text)
        .into_iter()
        .filter(|id| *id != card_id)
        .filter_map(|id| all_cards.iter().find(|c| c.id == id))
        .collect()
}

/// Other cards whose stored body mentions `card_id`, in `all_cards` order.
pub fn incoming(card_id: CardId, all_cards: &[Card]) -> Vec<&Card> {
    all_cards
        .iter()
        .filter(|c| c.id != card_id && references(&c.content, card_id))
        .collect()
}

/// Outgoing then incoming, de-duplicated, first occurrence wins.
pub fn linked<'a>(card_id: CardId, all_cards: &'a [Card], current_text: &str) -> Vec<&'a Card> {
    let mut result: Vec<&Card> = Vec::new();
    let candidates = outgoing(card_id, all_cards, current_text)
        .into_iter()
        .chain(incoming(card_id, all_cards));
    for card in candidates {
        if !result.iter().any(|c| c.id == card.id) {
            result.push(card);
        }
    }
    result
}
