//! Gift assignment drawing.
//!
//! A draw shuffles the members with an unbiased Fisher-Yates shuffle and links
//! each member to the next one in shuffled order, wrapping around at the end.
//! The result is a single cycle covering every member, so nobody draws
//! themselves.

use std::collections::{HashMap, HashSet};

use common::MemberId;
use rand::Rng;
use rand::seq::SliceRandom;

use super::Match;

/// Smallest group for which a draw is meaningful.
///
/// With two members the only possible assignment is a mutual pair, which
/// tells both members who their giver is.
pub const MIN_MEMBERS_FOR_MATCHING: usize = 3;

/// Draws a single gift cycle over `members` using the supplied random source.
///
/// Returns one match per member. Fewer than two members cannot form a cycle
/// without a self-assignment, so an empty list is returned for them.
pub fn assign_cycle<R: Rng + ?Sized>(members: &[MemberId], rng: &mut R) -> Vec<Match> {
    if members.len() < 2 {
        return Vec::new();
    }

    let mut order = members.to_vec();
    order.shuffle(rng);

    let n = order.len();
    (0..n)
        .map(|i| Match::new(order[i].clone(), order[(i + 1) % n].clone()))
        .collect()
}

/// Returns true if `matches` forms exactly one cycle over `members` with no
/// fixed points.
pub fn is_single_cycle(members: &[MemberId], matches: &[Match]) -> bool {
    let n = members.len();
    if n < 2 || matches.len() != n {
        return false;
    }

    let member_set: HashSet<&MemberId> = members.iter().collect();
    if member_set.len() != n {
        return false;
    }

    let mut next: HashMap<&MemberId, &MemberId> = HashMap::with_capacity(n);
    let mut receivers: HashSet<&MemberId> = HashSet::with_capacity(n);
    for m in matches {
        if m.giver == m.receiver
            || !member_set.contains(&m.giver)
            || !member_set.contains(&m.receiver)
            || next.insert(&m.giver, &m.receiver).is_some()
            || !receivers.insert(&m.receiver)
        {
            return false;
        }
    }

    // Walk from the first member; a single cycle returns after exactly n steps.
    let start = &members[0];
    let mut current = start;
    for step in 1..=n {
        current = match next.get(current) {
            Some(receiver) => receiver,
            None => return false,
        };
        if current == start {
            return step == n;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn members(n: usize) -> Vec<MemberId> {
        (1..=n).map(|i| MemberId::new(format!("u{i}"))).collect()
    }

    #[test]
    fn test_cycle_covers_every_member_once() {
        for n in MIN_MEMBERS_FOR_MATCHING..=12 {
            for seed in 0..25 {
                let ids = members(n);
                let mut rng = StdRng::seed_from_u64(seed);
                let matches = assign_cycle(&ids, &mut rng);

                assert_eq!(matches.len(), n);
                assert!(matches.iter().all(|m| m.giver != m.receiver));
                for id in &ids {
                    assert_eq!(matches.iter().filter(|m| &m.giver == id).count(), 1);
                    assert_eq!(matches.iter().filter(|m| &m.receiver == id).count(), 1);
                }
                assert!(is_single_cycle(&ids, &matches), "n={n} seed={seed}");
            }
        }
    }

    #[test]
    fn test_same_seed_gives_same_draw() {
        let ids = members(6);
        let first = assign_cycle(&ids, &mut StdRng::seed_from_u64(42));
        let second = assign_cycle(&ids, &mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn test_draws_vary_across_seeds() {
        let ids = members(5);
        let draws: HashSet<Vec<Match>> = (0..30)
            .map(|seed| assign_cycle(&ids, &mut StdRng::seed_from_u64(seed)))
            .collect();
        assert!(draws.len() > 1);
    }

    #[test]
    fn test_too_few_members_gives_no_matches() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(assign_cycle(&[], &mut rng).is_empty());
        assert!(assign_cycle(&members(1), &mut rng).is_empty());
    }

    #[test]
    fn test_two_disjoint_cycles_rejected() {
        let ids = members(4);
        let matches = vec![
            Match::new(ids[0].clone(), ids[1].clone()),
            Match::new(ids[1].clone(), ids[0].clone()),
            Match::new(ids[2].clone(), ids[3].clone()),
            Match::new(ids[3].clone(), ids[2].clone()),
        ];
        assert!(!is_single_cycle(&ids, &matches));
    }

    #[test]
    fn test_duplicate_receiver_rejected() {
        let ids = members(3);
        let matches = vec![
            Match::new(ids[0].clone(), ids[1].clone()),
            Match::new(ids[1].clone(), ids[2].clone()),
            Match::new(ids[2].clone(), ids[1].clone()),
        ];
        assert!(!is_single_cycle(&ids, &matches));
    }

    #[test]
    fn test_unknown_member_rejected() {
        let ids = members(3);
        let matches = vec![
            Match::new(ids[0].clone(), ids[1].clone()),
            Match::new(ids[1].clone(), MemberId::new("stranger")),
            Match::new(ids[2].clone(), ids[0].clone()),
        ];
        assert!(!is_single_cycle(&ids, &matches));
    }

    #[test]
    fn test_missing_match_rejected() {
        let ids = members(3);
        let matches = vec![
            Match::new(ids[0].clone(), ids[1].clone()),
            Match::new(ids[1].clone(), ids[2].clone()),
        ];
        assert!(!is_single_cycle(&ids, &matches));
    }
}
