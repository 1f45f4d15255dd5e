//! Splice-and-renumber planner for sibling orders.

use crate::model::outline::SiblingSlot;

/// New order for one sibling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderChange<Id> {
    pub id: Id,
    pub order: i64,
}

/// Result of positioning one entity among its siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlan<Id> {
    /// Final sibling sequence; position `i` holds order `i + 1`.
    pub sequence: Vec<Id>,
    /// Siblings whose stored order differs from their final order.
    pub changes: Vec<OrderChange<Id>>,
    /// Zero-based index the positioned entity landed at after clamping.
    pub position: usize,
}

impl<Id> OrderPlan<Id> {
    /// Whether persisting this plan requires no writes.
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Positions `positioned` at `target_index` among `siblings` and renumbers.
///
/// `siblings` may be in any order; they are stably sorted by their current
/// order first, so equal orders keep their listed relative order.
/// `positioned` may or may not be one of `siblings`. When it is not, it is
/// treated as new and always appears in `changes`.
///
/// `target_index` is clamped into `[0, len]`, where `len` excludes the
/// positioned entity.
pub fn plan_position<Id>(siblings: &[SiblingSlot<Id>], positioned: &Id, target_index: i64) -> OrderPlan<Id>
where
    Id: Clone + PartialEq,
{
    let mut sorted: Vec<&SiblingSlot<Id>> = siblings.iter().collect();
    sorted.sort_by_key(|slot| slot.order);

    let current_order = sorted
        .iter()
        .find(|slot| slot.id == *positioned)
        .map(|slot| slot.order);
    let mut sequence: Vec<(Id, Option<i64>)> = sorted
        .into_iter()
        .filter(|slot| slot.id != *positioned)
        .map(|slot| (slot.id.clone(), Some(slot.order)))
        .collect();

    let position = clamp_index(target_index, sequence.len());
    sequence.insert(position, (positioned.clone(), current_order));

    let mut changes = Vec::new();
    for (index, (id, current)) in sequence.iter().enumerate() {
        let order = index as i64 + 1;
        if *current != Some(order) {
            changes.push(OrderChange {
                id: id.clone(),
                order,
            });
        }
    }

    OrderPlan {
        sequence: sequence.into_iter().map(|(id, _)| id).collect(),
        changes,
        position,
    }
}

/// Orders for swapping two siblings' positions.
///
/// Returns `None` when either id is not among `siblings`. Orders are
/// exchanged as stored; no renumbering happens.
pub fn plan_swap<Id>(siblings: &[SiblingSlot<Id>], first: &Id, second: &Id) -> Option<Vec<OrderChange<Id>>>
where
    Id: Clone + PartialEq,
{
    let first_order = siblings.iter().find(|slot| slot.id == *first)?.order;
    let second_order = siblings.iter().find(|slot| slot.id == *second)?.order;
    if first_order == second_order {
        return Some(Vec::new());
    }
    Some(vec![
        OrderChange {
            id: first.clone(),
            order: second_order,
        },
        OrderChange {
            id: second.clone(),
            order: first_order,
        },
    ])
}

/// Next order for a child appended under a parent: `max + 1`, or 1.
pub fn next_order<Id>(siblings: &[SiblingSlot<Id>]) -> i64 {
    siblings.iter().map(|slot| slot.order).max().map_or(1, |max| max.max(0) + 1)
}

fn clamp_index(target_index: i64, len: usize) -> usize {
    target_index.clamp(0, len as i64) as usize
}
