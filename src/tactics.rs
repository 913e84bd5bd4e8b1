// Kiss-of-death / kiss-of-murder classifiers
//
// Single-turn adjacency analysis for one snake's candidate move. Every
// comparison between tactical outcomes goes through the `Ord` impls below,
// where `Greater` always means "preferable for the moving snake".

use std::cmp::Ordering;

use crate::board2d::Board2d;
use crate::simple_profiler::ProfileGuard;
use crate::simulator::hazard_intensity;
use crate::state::SimState;
use crate::types::{Coord, Direction};

/// Threat posed to the mover by other snakes' possible next heads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KissOfDeathState {
    /// The move dies regardless of what anybody else does
    Suicide,
    /// A longer snake has nowhere else to go: solitary death
    Certain,
    /// An equal-length snake has nowhere else to go: both die
    CertainMutual,
    /// Three or more snakes could take the cell
    Possible3To1,
    /// A longer snake could take the cell, or the tail we enter may not move
    Possible,
    /// Only equal-length snakes could take the cell
    PossibleMutual,
    NoThreat,
}

impl KissOfDeathState {
    fn rank(self) -> u8 {
        match self {
            KissOfDeathState::Suicide => 0,
            KissOfDeathState::Certain => 1,
            KissOfDeathState::CertainMutual => 2,
            KissOfDeathState::Possible3To1 => 3,
            KissOfDeathState::Possible => 4,
            KissOfDeathState::PossibleMutual => 5,
            KissOfDeathState::NoThreat => 6,
        }
    }

    pub fn is_certain_death(self) -> bool {
        matches!(
            self,
            KissOfDeathState::Suicide | KissOfDeathState::Certain | KissOfDeathState::CertainMutual
        )
    }
}

impl Ord for KissOfDeathState {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for KissOfDeathState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KissOfDeath {
    pub state: KissOfDeathState,
    /// Snakes that could legally enter the same cell next turn
    pub attackers: u8,
    /// Some attacker has no better alternative, or winning the game hinges on it
    pub likely: bool,
    /// Preference among unconditional deaths: entering our own neck is the
    /// worst, then walls, then bodies, then a body cell an opponent may also
    /// head into (a chance to take it along).
    pub fallback: u8,
}

impl KissOfDeath {
    pub const NONE: KissOfDeath = KissOfDeath {
        state: KissOfDeathState::NoThreat,
        attackers: 0,
        likely: false,
        fallback: 0,
    };
}

impl Ord for KissOfDeath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.state
            .cmp(&other.state)
            .then(self.fallback.cmp(&other.fallback))
            .then(other.likely.cmp(&self.likely))
            .then(other.attackers.cmp(&self.attackers))
    }
}

impl PartialOrd for KissOfDeath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Opportunity to eliminate a shorter snake next turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KissOfMurderState {
    NoTarget,
    /// The victim may come; if it does not, we are left with fewer than two exits
    PossibleUnsafe,
    /// The victim may come; missing leaves us with room to move on
    PossibleSafe,
    /// The victim has no other safe move
    Certain,
}

impl KissOfMurderState {
    fn rank(self) -> u8 {
        match self {
            KissOfMurderState::NoTarget => 0,
            KissOfMurderState::PossibleUnsafe => 1,
            KissOfMurderState::PossibleSafe => 2,
            KissOfMurderState::Certain => 3,
        }
    }
}

impl Ord for KissOfMurderState {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for KissOfMurderState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KissOfMurder {
    pub state: KissOfMurderState,
    pub victims: u8,
}

impl KissOfMurder {
    pub const NONE: KissOfMurder = KissOfMurder {
        state: KissOfMurderState::NoTarget,
        victims: 0,
    };
}

impl Ord for KissOfMurder {
    fn cmp(&self, other: &Self) -> Ordering {
        self.state
            .cmp(&other.state)
            .then(self.victims.cmp(&other.victims))
    }
}

impl PartialOrd for KissOfMurder {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Both classifications for one candidate move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TacticalStates {
    pub death: KissOfDeath,
    pub murder: KissOfMurder,
}

impl TacticalStates {
    pub const NEUTRAL: TacticalStates = TacticalStates {
        death: KissOfDeath::NONE,
        murder: KissOfMurder::NONE,
    };
}

impl Ord for TacticalStates {
    /// Survival first, then the kill
    fn cmp(&self, other: &Self) -> Ordering {
        self.death
            .cmp(&other.death)
            .then(self.murder.cmp(&other.murder))
    }
}

impl PartialOrd for TacticalStates {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Per-position tactical analyser. Computes every live snake's safe next
/// cells once and answers classification queries against them.
pub struct Tactics<'a> {
    state: &'a SimState,
    board: &'a Board2d,
    safe_dests: Vec<Vec<Coord>>,
}

impl<'a> Tactics<'a> {
    pub fn new(state: &'a SimState, board: &'a Board2d) -> Self {
        let _guard = ProfileGuard::new("tactics");
        let safe_dests = (0..state.snakes.len())
            .map(|i| {
                if state.snakes[i].is_alive() {
                    safe_moves(state, board, i)
                        .into_iter()
                        .filter_map(|d| board.normalize(d.apply(&state.snakes[i].head())))
                        .collect()
                } else {
                    Vec::new()
                }
            })
            .collect();
        Tactics {
            state,
            board,
            safe_dests,
        }
    }

    pub fn safe_destinations(&self, idx: usize) -> &[Coord] {
        &self.safe_dests[idx]
    }

    fn is_rival(&self, me: usize, other: usize) -> bool {
        let (a, b) = (&self.state.snakes[me], &self.state.snakes[other]);
        other != me
            && b.is_alive()
            && !(self.state.rules.allow_squad_collisions && a.is_teammate(b))
    }

    /// Classifies moving snake `idx` in `dir`
    pub fn classify(&self, idx: usize, dir: Direction) -> TacticalStates {
        let snake = &self.state.snakes[idx];
        let head = snake.head();
        let my_len = snake.len();

        let dest = match self.board.normalize(dir.apply(&head)) {
            Some(d) => d,
            None => {
                return TacticalStates {
                    death: suicide(1),
                    murder: KissOfMurder::NONE,
                }
            }
        };

        if snake.neck() == Some(dest) {
            return TacticalStates {
                death: suicide(0),
                murder: KissOfMurder::NONE,
            };
        }

        let contenders: Vec<usize> = (0..self.state.snakes.len())
            .filter(|&j| self.is_rival(idx, j) && self.safe_dests[j].contains(&dest))
            .collect();

        if !self.safe_dests[idx].contains(&dest) {
            // Dead on arrival. Prefer dying where a rival no longer than us
            // might also arrive and be taken along.
            let takes_one = contenders
                .iter()
                .any(|&j| self.state.snakes[j].len() <= my_len);
            return TacticalStates {
                death: suicide(if takes_one { 3 } else { 2 }),
                murder: KissOfMurder::NONE,
            };
        }

        TacticalStates {
            death: self.kiss_of_death(idx, dest, &contenders),
            murder: self.kiss_of_murder(idx, dest, &contenders),
        }
    }

    fn kiss_of_death(&self, idx: usize, dest: Coord, contenders: &[usize]) -> KissOfDeath {
        let my_len = self.state.snakes[idx].len();
        let attackers: Vec<usize> = contenders
            .iter()
            .copied()
            .filter(|&j| self.state.snakes[j].len() >= my_len)
            .collect();

        if attackers.is_empty() {
            // Entering a tail whose owner might eat this turn
            if self.tail_may_stay(idx, dest) {
                return KissOfDeath {
                    state: KissOfDeathState::Possible,
                    attackers: 1,
                    likely: false,
                    fallback: 0,
                };
            }
            return KissOfDeath::NONE;
        }

        let forced = |j: usize| self.safe_dests[j].len() == 1;
        let longer_forced = attackers
            .iter()
            .any(|&j| forced(j) && self.state.snakes[j].len() > my_len);
        let any_forced = attackers.iter().any(|&j| forced(j));
        let any_longer = attackers
            .iter()
            .any(|&j| self.state.snakes[j].len() > my_len);

        let state = if longer_forced {
            KissOfDeathState::Certain
        } else if any_forced {
            KissOfDeathState::CertainMutual
        } else if attackers.len() >= 3 {
            KissOfDeathState::Possible3To1
        } else if any_longer {
            KissOfDeathState::Possible
        } else {
            KissOfDeathState::PossibleMutual
        };

        // In a duel a longer attacker wins the game by taking the cell
        let duel_win = self.state.live_count() == 2 && any_longer;

        KissOfDeath {
            state,
            attackers: attackers.len() as u8,
            likely: any_forced || duel_win,
            fallback: 0,
        }
    }

    fn kiss_of_murder(&self, idx: usize, dest: Coord, contenders: &[usize]) -> KissOfMurder {
        let my_len = self.state.snakes[idx].len();
        let victims: Vec<usize> = contenders
            .iter()
            .copied()
            .filter(|&j| self.state.snakes[j].len() < my_len)
            .collect();

        if victims.is_empty() {
            return KissOfMurder::NONE;
        }

        let certain = victims.iter().any(|&j| self.safe_dests[j].len() == 1);
        let state = if certain {
            KissOfMurderState::Certain
        } else if self.exits_after(dest) >= 2 {
            KissOfMurderState::PossibleSafe
        } else {
            KissOfMurderState::PossibleUnsafe
        };

        KissOfMurder {
            state,
            victims: victims.len() as u8,
        }
    }

    /// Cells reachable from `dest` on the move after next
    fn exits_after(&self, dest: Coord) -> usize {
        self.board
            .neighbors(dest)
            .filter(|&(_, n)| self.board.get(n).map_or(false, |cell| cell.is_free_after(2)))
            .count()
    }

    fn tail_may_stay(&self, idx: usize, dest: Coord) -> bool {
        let cell = match self.board.get(dest) {
            Some(cell) => cell,
            None => return false,
        };
        match cell.snake {
            Some(owner) if owner as usize != idx && cell.is_vacating_tail() => self.safe_dests
                [owner as usize]
                .iter()
                .any(|&c| self.board.has_food(c)),
            _ => false,
        }
    }

    /// Classifies every direction for snake `idx`, best first
    pub fn ranked_moves(&self, idx: usize) -> Vec<(Direction, TacticalStates)> {
        let mut moves: Vec<(Direction, TacticalStates)> = Direction::all()
            .iter()
            .map(|&d| (d, self.classify(idx, d)))
            .collect();
        // Stable sort keeps Direction::all() order among equals
        moves.sort_by(|a, b| b.1.cmp(&a.1));
        moves
    }

    /// Moves worth searching: everything that is not an unconditional death.
    /// When nothing survives, the single best way to die.
    pub fn candidate_moves(&self, idx: usize) -> Vec<(Direction, TacticalStates)> {
        let ranked = self.ranked_moves(idx);
        let alive: Vec<(Direction, TacticalStates)> = ranked
            .iter()
            .copied()
            .filter(|(_, t)| t.death.state != KissOfDeathState::Suicide)
            .collect();
        if alive.is_empty() {
            ranked.into_iter().take(1).collect()
        } else {
            alive
        }
    }
}

fn suicide(fallback: u8) -> KissOfDeath {
    KissOfDeath {
        state: KissOfDeathState::Suicide,
        attackers: 0,
        likely: true,
        fallback,
    }
}

/// Directions that are not unconditional death for snake `idx`: stays on the
/// board, avoids the neck and any body segment still present next turn, and
/// does not starve on arrival.
pub fn safe_moves(state: &SimState, board: &Board2d, idx: usize) -> Vec<Direction> {
    let _guard = ProfileGuard::new("move_gen");
    let snake = &state.snakes[idx];
    if !snake.is_alive() || snake.is_empty() {
        return Vec::new();
    }
    let head = snake.head();
    let neck = snake.neck();

    Direction::all()
        .iter()
        .copied()
        .filter(|dir| {
            let dest = match board.normalize(dir.apply(&head)) {
                Some(d) => d,
                None => return false,
            };
            if Some(dest) == neck || board.is_lethal_next_turn(dest) {
                return false;
            }
            if state.rules.constrictor || board.has_food(dest) {
                return true;
            }
            let damage = hazard_intensity(state, dest) as i32 * state.rules.hazard_damage_per_turn;
            snake.health - 1 - damage > 0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rules;
    use crate::state::Snake;

    fn c(x: i32, y: i32) -> Coord {
        Coord::new(x, y)
    }

    fn snake(body: &[(i32, i32)]) -> Snake {
        Snake::new(body.iter().map(|&(x, y)| c(x, y)).collect(), 90)
    }

    fn state(snakes: Vec<Snake>, food: Vec<Coord>) -> SimState {
        SimState::new(11, 11, snakes, food, vec![], Rules::default())
    }

    #[test]
    fn test_total_order_of_death_states() {
        use KissOfDeathState::*;
        let ordered = [Suicide, Certain, CertainMutual, Possible3To1, Possible, PossibleMutual, NoThreat];
        for w in ordered.windows(2) {
            assert!(w[0] < w[1], "{:?} should rank below {:?}", w[0], w[1]);
        }
    }

    #[test]
    fn test_mutual_death_beats_solitary_death() {
        let mutual = KissOfDeath {
            state: KissOfDeathState::CertainMutual,
            attackers: 1,
            likely: true,
            fallback: 0,
        };
        let solitary = KissOfDeath {
            state: KissOfDeathState::Certain,
            attackers: 1,
            likely: true,
            fallback: 0,
        };
        assert!(mutual > solitary);
        assert!(KissOfDeath::NONE > mutual);
    }

    #[test]
    fn test_only_neck_is_suicide_for_lone_snake() {
        let s = state(vec![snake(&[(2, 0), (1, 0), (0, 0)])], vec![]);
        let board = Board2d::new(&s);
        let tactics = Tactics::new(&s, &board);
        assert_eq!(
            tactics.classify(0, Direction::Left).death.state,
            KissOfDeathState::Suicide
        );
        // Down leaves the board from y=0
        assert_eq!(
            tactics.classify(0, Direction::Down).death.state,
            KissOfDeathState::Suicide
        );
        assert_eq!(tactics.classify(0, Direction::Up).death, KissOfDeath::NONE);
        assert_eq!(tactics.classify(0, Direction::Right).death, KissOfDeath::NONE);
        // Neck ranks below the wall
        assert!(tactics.classify(0, Direction::Left).death < tactics.classify(0, Direction::Down).death);
    }

    #[test]
    fn test_possible_kiss_from_longer_snake() {
        // Their head at (6,6) is diagonal to (5,5), so it cannot contest it
        let s = state(
            vec![
                snake(&[(4, 5), (3, 5), (2, 5)]),
                snake(&[(6, 6), (7, 6), (8, 6), (9, 6)]),
            ],
            vec![],
        );
        let board = Board2d::new(&s);
        let tactics = Tactics::new(&s, &board);
        let right = tactics.classify(0, Direction::Right);
        assert_eq!(right.death, KissOfDeath::NONE);

        let s = state(
            vec![
                snake(&[(4, 5), (3, 5), (2, 5)]),
                snake(&[(5, 6), (6, 6), (7, 6), (8, 6)]),
            ],
            vec![],
        );
        let board = Board2d::new(&s);
        let tactics = Tactics::new(&s, &board);
        let right = tactics.classify(0, Direction::Right);
        assert_eq!(right.death.state, KissOfDeathState::Possible);
        assert_eq!(right.death.attackers, 1);
        assert!(right.death.likely, "a longer attacker in a duel wins by taking the cell");
        let up = tactics.classify(0, Direction::Up);
        assert_eq!(up.death.state, KissOfDeathState::Possible);
        let down = tactics.classify(0, Direction::Down);
        assert_eq!(down.death, KissOfDeath::NONE);
    }

    #[test]
    fn test_certain_kiss_when_attacker_is_cornered() {
        // Longer snake in the corner whose only exit is (1,0)
        let s = state(
            vec![
                snake(&[(2, 1), (3, 1), (4, 1)]),
                snake(&[(0, 0), (0, 1), (0, 2), (0, 3)]),
            ],
            vec![],
        );
        let board = Board2d::new(&s);
        let tactics = Tactics::new(&s, &board);
        assert_eq!(tactics.safe_destinations(1), &[c(1, 0)]);
        let left = tactics.classify(0, Direction::Left);
        assert_eq!(left.death, KissOfDeath::NONE);
        let down = tactics.classify(0, Direction::Down);
        assert_eq!(down.death, KissOfDeath::NONE);

        let s = state(
            vec![
                snake(&[(1, 1), (2, 1), (3, 1)]),
                snake(&[(0, 0), (0, 1), (0, 2), (0, 3)]),
            ],
            vec![],
        );
        let board = Board2d::new(&s);
        let tactics = Tactics::new(&s, &board);
        let down = tactics.classify(0, Direction::Down);
        assert_eq!(down.death.state, KissOfDeathState::Certain);
    }

    #[test]
    fn test_certain_murder_of_cornered_shorter_snake() {
        let s = state(
            vec![
                snake(&[(1, 1), (2, 1), (3, 1), (4, 1)]),
                snake(&[(0, 0), (0, 1), (0, 2)]),
            ],
            vec![],
        );
        let board = Board2d::new(&s);
        let tactics = Tactics::new(&s, &board);
        let down = tactics.classify(0, Direction::Down);
        assert_eq!(down.death, KissOfDeath::NONE);
        assert_eq!(down.murder.state, KissOfMurderState::Certain);
        assert_eq!(tactics.ranked_moves(0)[0].0, Direction::Down);
    }

    #[test]
    fn test_tail_of_possibly_eating_snake_is_risky() {
        // Their tail at (5,4); their head next to food at (7,7).
        let s = state(
            vec![
                snake(&[(5, 3), (5, 2), (5, 1)]),
                snake(&[(7, 6), (6, 6), (6, 5), (5, 5), (5, 4)]),
            ],
            vec![c(7, 7)],
        );
        let board = Board2d::new(&s);
        let tactics = Tactics::new(&s, &board);
        let up = tactics.classify(0, Direction::Up);
        assert_eq!(up.death.state, KissOfDeathState::Possible);
        assert!(!up.death.likely);
    }

    #[test]
    fn test_candidate_moves_falls_back_to_single_best_death() {
        // Boxed in at the top wall by its own body and a rival
        let s = state(
            vec![
                snake(&[(5, 10), (5, 9), (4, 9), (4, 10), (3, 10)]),
                snake(&[(6, 10), (6, 9), (6, 8)]),
            ],
            vec![],
        );
        let board = Board2d::new(&s);
        let tactics = Tactics::new(&s, &board);
        let cands = tactics.candidate_moves(0);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].1.death.state, KissOfDeathState::Suicide);
        assert_ne!(cands[0].0, Direction::Down, "never the neck while alternatives exist");
        assert_ne!(cands[0].0, Direction::Up, "the wall ranks below a body");
    }

    #[test]
    fn test_safe_moves_avoid_starving_hazard() {
        let mut lone = snake(&[(2, 0), (1, 0), (0, 0)]);
        lone.health = 10;
        let s = SimState::new(11, 11, vec![lone], vec![], vec![c(2, 1)], Rules::default());
        let board = Board2d::new(&s);
        assert_eq!(safe_moves(&s, &board, 0), vec![Direction::Right]);
    }
}
