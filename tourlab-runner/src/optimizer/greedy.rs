//! Deterministic greedy roster selection, used when the MILP cannot be trusted.
//!
//! Riders are visited by adjusted points (descending, ties by `RiderId`). A
//! rider is accepted only if the roster can still be completed within budget:
//! the cheapest completion that respects club caps and outstanding club
//! minimums is reserved at every step. Whatever slots remain after the pass
//! are filled with that cheapest completion.

use super::{CandidatePool, OptimizerConfig, BUDGET_EPSILON};

struct Partial {
    taken: Vec<bool>,
    per_club: Vec<usize>,
    chosen: Vec<usize>,
    cost: f64,
}

impl Partial {
    fn push(&mut self, pool: &CandidatePool<'_>, i: usize) {
        self.taken[i] = true;
        self.per_club[pool.candidates[i].club] += 1;
        self.chosen.push(i);
        self.cost += pool.candidates[i].price;
    }

    fn pop(&mut self, pool: &CandidatePool<'_>) {
        if let Some(i) = self.chosen.pop() {
            self.taken[i] = false;
            self.per_club[pool.candidates[i].club] -= 1;
            self.cost -= pool.candidates[i].price;
        }
    }
}

/// Cheapest set of `needed` further riders that keeps every club within its
/// cap and satisfies the club minimums. `None` if no such set exists.
fn cheapest_completion(
    pool: &CandidatePool<'_>,
    by_price: &[usize],
    partial: &Partial,
    needed: usize,
    config: &OptimizerConfig,
) -> Option<(Vec<usize>, f64)> {
    let mut taken = partial.taken.clone();
    let mut per_club = partial.per_club.clone();
    let mut picks = Vec::with_capacity(needed);
    let mut cost = 0.0;

    for &(club, min) in &pool.club_minimums {
        let short = min.saturating_sub(per_club[club]);
        for _ in 0..short {
            let &i = by_price
                .iter()
                .find(|&&i| !taken[i] && pool.candidates[i].club == club)?;
            taken[i] = true;
            per_club[club] += 1;
            picks.push(i);
            cost += pool.candidates[i].price;
        }
    }
    if picks.len() > needed {
        return None;
    }

    for &i in by_price {
        if picks.len() == needed {
            break;
        }
        let club = pool.candidates[i].club;
        if taken[i] || per_club[club] >= config.max_per_club {
            continue;
        }
        taken[i] = true;
        per_club[club] += 1;
        picks.push(i);
        cost += pool.candidates[i].price;
    }
    (picks.len() == needed).then_some((picks, cost))
}

/// Candidate indices of a full roster, or `None` if none fits.
pub(crate) fn select(pool: &CandidatePool<'_>, config: &OptimizerConfig) -> Option<Vec<usize>> {
    let n = pool.len();
    let mut by_price: Vec<usize> = (0..n).collect();
    by_price.sort_by(|&a, &b| {
        pool.candidates[a]
            .price
            .total_cmp(&pool.candidates[b].price)
            .then(a.cmp(&b))
    });
    let mut by_value: Vec<usize> = (0..n).collect();
    by_value.sort_by(|&a, &b| {
        pool.candidates[b]
            .adjusted
            .total_cmp(&pool.candidates[a].adjusted)
            .then(a.cmp(&b))
    });

    let mut partial = Partial {
        taken: vec![false; n],
        per_club: vec![0; pool.clubs.len()],
        chosen: Vec::with_capacity(config.team_size),
        cost: 0.0,
    };
    let (_, floor) = cheapest_completion(pool, &by_price, &partial, config.team_size, config)?;
    if floor > config.budget + BUDGET_EPSILON {
        return None;
    }

    for &i in &by_value {
        if partial.chosen.len() == config.team_size {
            break;
        }
        if pool.candidates[i].price + partial.cost > config.budget + BUDGET_EPSILON
            || partial.per_club[pool.candidates[i].club] >= config.max_per_club
        {
            continue;
        }
        partial.push(pool, i);
        let needed = config.team_size - partial.chosen.len();
        let fits = cheapest_completion(pool, &by_price, &partial, needed, config)
            .is_some_and(|(_, rest)| partial.cost + rest <= config.budget + BUDGET_EPSILON);
        if !fits {
            partial.pop(pool);
        }
    }

    let needed = config.team_size - partial.chosen.len();
    let (rest, _) = cheapest_completion(pool, &by_price, &partial, needed, config)?;
    let mut chosen = partial.chosen;
    chosen.extend(rest);
    chosen.sort_unstable();
    Some(chosen)
}
