use crate::core::filters::FilterTable;
use crate::core::models::ids::VariableId;
use crate::core::models::subset::Subset;
use std::sync::Arc;
use tracing::trace;

/// Orders the variables of `subset` so that strongly filtered ones come first.
///
/// Starting from nothing, repeatedly appends the variable whose addition maximizes the
/// summed filter strength of `(ordered + candidate)` with `ordered` excluded. Ties keep the
/// first candidate in canonical order.
pub fn greedy_order(tables: &[Arc<dyn FilterTable>], subset: &Subset) -> Vec<VariableId> {
    let mut order: Vec<VariableId> = Vec::with_capacity(subset.len());
    let mut remaining: Vec<VariableId> = subset.iter().collect();
    let mut ordered = Subset::empty();

    while !remaining.is_empty() {
        let excluded: Vec<Subset> = if ordered.is_empty() {
            Vec::new()
        } else {
            vec![ordered.clone()]
        };

        let mut best = 0;
        let mut best_strength = f64::NEG_INFINITY;
        for (i, &candidate) in remaining.iter().enumerate() {
            let extended = ordered.union(&Subset::singleton(candidate));
            let strength: f64 = tables
                .iter()
                .map(|t| t.strength(&extended, &excluded))
                .sum();
            if strength > best_strength {
                best = i;
                best_strength = strength;
            }
        }

        let chosen = remaining.remove(best);
        trace!(variable = ?chosen, strength = best_strength, "Ordered variable");
        ordered = ordered.union(&Subset::singleton(chosen));
        order.push(chosen);
    }
    order
}
