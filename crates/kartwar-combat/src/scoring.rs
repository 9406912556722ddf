use std::cmp::Ordering;

use kartwar_core::game_trait::PlayerId;

use crate::kart::KartStats;

/// Free-for-all scoring: score = number of kills.
pub fn ffa_score(stats: &KartStats) -> i32 {
    stats.kills as i32
}

/// Orders standings: more kills, then more damage dealt, then fewer deaths.
pub fn compare_standings(a: &KartStats, b: &KartStats) -> Ordering {
    b.kills
        .cmp(&a.kills)
        .then_with(|| b.damage_dealt.total_cmp(&a.damage_dealt))
        .then_with(|| a.deaths.cmp(&b.deaths))
}

/// Rank drivers best-first. Ties keep their input order.
pub fn rank(entries: &[(PlayerId, KartStats)]) -> Vec<PlayerId> {
    let mut sorted: Vec<&(PlayerId, KartStats)> = entries.iter().collect();
    sorted.sort_by(|a, b| compare_standings(&a.1, &b.1));
    sorted.into_iter().map(|(id, _)| *id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(kills: u32, deaths: u32, damage_dealt: f32) -> KartStats {
        KartStats {
            kills,
            deaths,
            damage_dealt,
        }
    }

    #[test]
    fn ffa_scoring() {
        assert_eq!(ffa_score(&stats(0, 3, 40.0)), 0);
        assert_eq!(ffa_score(&stats(5, 0, 500.0)), 5);
    }

    #[test]
    fn kills_rank_first() {
        let order = rank(&[(1, stats(1, 0, 900.0)), (2, stats(3, 5, 10.0))]);
        assert_eq!(order, vec![2, 1]);
    }

    #[test]
    fn damage_breaks_kill_ties() {
        let order = rank(&[(1, stats(2, 0, 200.0)), (2, stats(2, 0, 350.0))]);
        assert_eq!(order, vec![2, 1]);
    }

    #[test]
    fn fewer_deaths_break_remaining_ties() {
        let order = rank(&[
            (1, stats(2, 4, 200.0)),
            (2, stats(2, 1, 200.0)),
            (3, stats(2, 4, 200.0)),
        ]);
        assert_eq!(order, vec![2, 1, 3]);
    }
}
