// Spatial index
//
// Dense width x height grid built in one pass over snakes, food and hazards.
// Derived from a SimState and never the source of truth.

use crate::simple_profiler::ProfileGuard;
use crate::state::SimState;
use crate::types::{Coord, Direction};

/// Which part of a snake occupies a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Head,
    Body,
    Tail,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardCell {
    /// Index of the snake occupying this cell
    pub snake: Option<u8>,
    pub segment: Option<Segment>,
    /// Moves until the occupant's body clears this cell, assuming it does not
    /// grow. Zero for unoccupied cells.
    pub vacates_in: u16,
    /// Number of body segments stacked on this cell
    pub stacked: u8,
    pub food: bool,
    /// Number of overlapping hazard layers
    pub hazard: u8,
}

impl BoardCell {
    pub fn is_head(&self) -> bool {
        self.segment == Some(Segment::Head)
    }

    /// A single tail segment that leaves the cell next turn
    pub fn is_vacating_tail(&self) -> bool {
        self.segment == Some(Segment::Tail) && self.vacates_in <= 1
    }

    /// Free to enter after `turns` moves, assuming nobody grows
    pub fn is_free_after(&self, turns: u16) -> bool {
        self.snake.is_none() || self.vacates_in <= turns
    }
}

#[derive(Debug, Clone)]
pub struct Board2d {
    width: i32,
    height: i32,
    wrapped: bool,
    cells: Vec<BoardCell>,
}

impl Board2d {
    pub fn new(state: &SimState) -> Self {
        let _guard = ProfileGuard::new("board_build");
        let mut board = Board2d {
            width: state.width,
            height: state.height,
            wrapped: state.rules.wrapped,
            cells: vec![BoardCell::default(); state.width as usize * state.height as usize],
        };

        let max_stack = state.rules.max_hazard_stack;
        for &h in &state.hazards {
            if let Some(i) = board.index(h) {
                let cell = &mut board.cells[i];
                cell.hazard = cell.hazard.saturating_add(1).min(max_stack);
            }
        }

        for &f in &state.food {
            if let Some(i) = board.index(f) {
                board.cells[i].food = true;
            }
        }

        for (snake_idx, snake) in state.snakes.iter().enumerate() {
            if !snake.is_alive() {
                continue;
            }
            let len = snake.body.len();
            for (seg_idx, &c) in snake.body.iter().enumerate() {
                let i = match board.index(c) {
                    Some(i) => i,
                    None => continue,
                };
                let cell = &mut board.cells[i];
                // Constrictor snakes never shed their tail
                let vacates = if state.rules.constrictor {
                    u16::MAX
                } else {
                    (len - seg_idx) as u16
                };
                let segment = if seg_idx == 0 {
                    Segment::Head
                } else if seg_idx == len - 1 {
                    Segment::Tail
                } else {
                    Segment::Body
                };

                if cell.snake == Some(snake_idx as u8) {
                    // A repeated segment of the same snake (stacked tail or
                    // spawn stack): the earlier segment keeps its role.
                    cell.stacked = cell.stacked.saturating_add(1);
                    cell.vacates_in = cell.vacates_in.max(vacates);
                    if segment == Segment::Tail && cell.segment != Some(Segment::Head) {
                        cell.segment = Some(Segment::Tail);
                    }
                    continue;
                }

                // Heads are the only segments that can overlap another
                // snake's segment, and only in an already-resolved position
                // with squad collisions allowed. Keep the first occupant.
                if cell.snake.is_some() {
                    continue;
                }
                cell.snake = Some(snake_idx as u8);
                cell.segment = Some(segment);
                cell.vacates_in = vacates;
                cell.stacked = 1;
            }
        }

        board
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Maps a coordinate onto the board, wrapping on wrapped rulesets.
    /// `None` means the coordinate is outside the board (a wall).
    pub fn normalize(&self, c: Coord) -> Option<Coord> {
        if self.wrapped {
            Some(Coord {
                x: c.x.rem_euclid(self.width),
                y: c.y.rem_euclid(self.height),
            })
        } else if c.x < 0 || c.y < 0 || c.x >= self.width || c.y >= self.height {
            None
        } else {
            Some(c)
        }
    }

    pub fn index(&self, c: Coord) -> Option<usize> {
        self.normalize(c)
            .map(|c| (c.y * self.width + c.x) as usize)
    }

    pub fn coord_of(&self, index: usize) -> Coord {
        Coord {
            x: index as i32 % self.width,
            y: index as i32 / self.width,
        }
    }

    /// Point query. Callers must treat `None` as a wall.
    pub fn get(&self, c: Coord) -> Option<&BoardCell> {
        self.index(c).map(|i| &self.cells[i])
    }

    pub fn cell_at(&self, index: usize) -> &BoardCell {
        &self.cells[index]
    }

    /// On-board neighbours of a cell, paired with the direction leading there
    pub fn neighbors(&self, c: Coord) -> impl Iterator<Item = (Direction, Coord)> + '_ {
        IntoIterator::into_iter(Direction::all())
            .filter_map(move |d| self.normalize(d.apply(&c)).map(|n| (d, n)))
    }

    pub fn hazard_at(&self, c: Coord) -> u8 {
        self.get(c).map(|cell| cell.hazard).unwrap_or(0)
    }

    pub fn has_food(&self, c: Coord) -> bool {
        self.get(c).map(|cell| cell.food).unwrap_or(false)
    }

    /// Would a head entering `c` next turn die no matter what anybody else
    /// does? Walls and body segments that are still there next turn qualify;
    /// a vacating tail does not, even though its owner might eat.
    pub fn is_lethal_next_turn(&self, c: Coord) -> bool {
        match self.get(c) {
            None => true,
            Some(cell) => !cell.is_free_after(1),
        }
    }

    /// A safe cell on the edge of the safe area: not itself hazardous but
    /// touching a hazard or a wall. These are the first cells a shrinking
    /// hazard schedule swallows.
    pub fn is_hazard_frontier(&self, c: Coord) -> bool {
        if self.hazard_at(c) > 0 {
            return false;
        }
        Direction::all()
            .iter()
            .any(|d| match self.get(d.apply(&c)) {
                None => true,
                Some(cell) => cell.hazard > 0,
            })
    }
}
