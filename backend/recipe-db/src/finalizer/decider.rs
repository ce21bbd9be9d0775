//! Ranked-choice winner selection for a single event

use crate::models::MealPlanOption;
use std::collections::{BTreeMap, HashMap};

/// The option an event settles on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionWinner {
    pub option_id: String,
    /// More than one option could have won and the id order picked this one
    pub tiebroken: bool,
}

/// Picks an event's winning option from its votes
///
/// `None` means no option can be chosen yet.
pub trait OptionDecider: Send + Sync {
    fn decide(&self, options: &[MealPlanOption]) -> Option<OptionWinner>;
}

/// Schulze method over the ranks voters gave each option
///
/// A lower rank is preferred. An option a voter left unranked trails
/// every option they did rank. Abstentions are ignored. When several
/// options share the top spot the lexicographically smallest id wins and
/// the result is marked tiebroken.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchulzeDecider;

impl OptionDecider for SchulzeDecider {
    fn decide(&self, options: &[MealPlanOption]) -> Option<OptionWinner> {
        let mut ballots: HashMap<&str, BTreeMap<&str, i32>> = HashMap::new();
        let mut candidates: Vec<&str> = Vec::new();

        for option in options {
            let mut has_vote = false;
            for vote in option.votes.iter().filter(|v| !v.abstain) {
                has_vote = true;
                ballots
                    .entry(vote.by_user.as_str())
                    .or_default()
                    .insert(option.id.as_str(), vote.rank);
            }
            if has_vote {
                candidates.push(option.id.as_str());
            }
        }

        // id order doubles as the tie-break order
        candidates.sort_unstable();
        candidates.dedup();

        match candidates.len() {
            0 => return None,
            1 => {
                return Some(OptionWinner {
                    option_id: candidates[0].to_string(),
                    tiebroken: false,
                })
            }
            _ => {}
        }

        let n = candidates.len();
        let preferences = pairwise_preferences(&candidates, ballots.values());
        let strengths = strongest_paths(&preferences);

        let winners: Vec<usize> = (0..n)
            .filter(|&i| (0..n).all(|j| i == j || strengths[i][j] >= strengths[j][i]))
            .collect();

        let first = *winners.first()?;
        Some(OptionWinner {
            option_id: candidates[first].to_string(),
            tiebroken: winners.len() > 1,
        })
    }
}

/// `d[i][j]`: voters preferring candidate `i` over candidate `j`
fn pairwise_preferences<'a, I>(candidates: &[&str], ballots: I) -> Vec<Vec<u32>>
where
    I: Iterator<Item = &'a BTreeMap<&'a str, i32>>,
{
    let n = candidates.len();
    let mut d = vec![vec![0u32; n]; n];

    for ballot in ballots {
        for (i, a) in candidates.iter().enumerate() {
            let Some(rank_a) = ballot.get(a) else {
                continue;
            };
            for (j, b) in candidates.iter().enumerate() {
                if i == j {
                    continue;
                }
                let prefers = match ballot.get(b) {
                    Some(rank_b) => rank_a < rank_b,
                    None => true,
                };
                if prefers {
                    d[i][j] += 1;
                }
            }
        }
    }

    d
}

fn strongest_paths(d: &[Vec<u32>]) -> Vec<Vec<u32>> {
    let n = d.len();
    let mut p = vec![vec![0u32; n]; n];

    for i in 0..n {
        for j in 0..n {
            if i != j && d[i][j] > d[j][i] {
                p[i][j] = d[i][j];
            }
        }
    }

    for k in 0..n {
        for i in 0..n {
            if i == k {
                continue;
            }
            for j in 0..n {
                if j == i || j == k {
                    continue;
                }
                p[i][j] = p[i][j].max(p[i][k].min(p[k][j]));
            }
        }
    }

    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MealPlanOptionVote;
    use chrono::Utc;

    fn vote(user: &str, option: &str, rank: i32, abstain: bool) -> MealPlanOptionVote {
        MealPlanOptionVote {
            id: format!("{user}-{option}"),
            rank,
            abstain,
            notes: String::new(),
            by_user: user.into(),
            belongs_to_meal_plan_option: option.into(),
            created_at: Utc::now(),
            last_updated_at: None,
            archived_at: None,
        }
    }

    fn option(id: &str, votes: Vec<MealPlanOptionVote>) -> MealPlanOption {
        MealPlanOption {
            id: id.into(),
            assigned_cook: None,
            assigned_dishwasher: None,
            chosen: false,
            tiebroken: false,
            meal_scale: 1.0,
            meal_id: "meal".into(),
            notes: String::new(),
            belongs_to_meal_plan_event: "event".into(),
            created_at: Utc::now(),
            last_updated_at: None,
            archived_at: None,
            votes,
        }
    }

    #[test]
    fn no_votes_means_no_winner() {
        let options = vec![option("a", vec![]), option("b", vec![])];
        assert_eq!(SchulzeDecider.decide(&options), None);
    }

    #[test]
    fn abstentions_do_not_make_candidates() {
        let options = vec![
            option("a", vec![vote("u1", "a", 0, true)]),
            option("b", vec![vote("u1", "b", 1, false)]),
        ];
        assert_eq!(
            SchulzeDecider.decide(&options),
            Some(OptionWinner {
                option_id: "b".into(),
                tiebroken: false
            })
        );
    }

    #[test]
    fn split_first_choices_tie_break_to_smallest_id() {
        let options = vec![
            option("opt2", vec![vote("u2", "opt2", 1, false)]),
            option("opt1", vec![vote("u1", "opt1", 1, false)]),
        ];
        assert_eq!(
            SchulzeDecider.decide(&options),
            Some(OptionWinner {
                option_id: "opt1".into(),
                tiebroken: true
            })
        );
    }

    #[test]
    fn majority_preference_wins_outright() {
        // u1: b > a, u2: b > a, u3: a > b
        let options = vec![
            option(
                "a",
                vec![
                    vote("u1", "a", 2, false),
                    vote("u2", "a", 2, false),
                    vote("u3", "a", 1, false),
                ],
            ),
            option(
                "b",
                vec![
                    vote("u1", "b", 1, false),
                    vote("u2", "b", 1, false),
                    vote("u3", "b", 2, false),
                ],
            ),
        ];
        assert_eq!(
            SchulzeDecider.decide(&options),
            Some(OptionWinner {
                option_id: "b".into(),
                tiebroken: false
            })
        );
    }

    #[test]
    fn condorcet_cycle_resolves_by_path_strength() {
        // 5 voters a>b>c, 4 voters b>c>a, 2 voters c>a>b
        // d[a][b]=7, d[b][c]=9, d[c][a]=6; a's paths are strongest
        let mut a = Vec::new();
        let mut b = Vec::new();
        let mut c = Vec::new();
        let mut cast = |prefix: &str, count: usize, ranks: [i32; 3]| {
            for n in 0..count {
                let user = format!("{prefix}{n}");
                a.push(vote(&user, "a", ranks[0], false));
                b.push(vote(&user, "b", ranks[1], false));
                c.push(vote(&user, "c", ranks[2], false));
            }
        };
        cast("x", 5, [1, 2, 3]);
        cast("y", 4, [3, 1, 2]);
        cast("z", 2, [2, 3, 1]);

        let options = vec![option("a", a), option("b", b), option("c", c)];
        assert_eq!(
            SchulzeDecider.decide(&options),
            Some(OptionWinner {
                option_id: "a".into(),
                tiebroken: false
            })
        );
    }
}
