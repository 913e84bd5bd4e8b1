// Typed view of the ruleset configuration surface
//
// The simulator only consumes these flags. Anything the server omits falls
// back to standard-mode behaviour.

use crate::types::Game;

pub const MAX_HEALTH: i32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rules {
    pub wrapped: bool,
    /// Snakes grow every turn and never lose health
    pub constrictor: bool,
    pub hazard_damage_per_turn: i32,
    pub food_spawn_chance: u32,
    pub minimum_food: u32,
    /// Turns between royale hazard expansions, 0 when the map never shrinks
    pub shrink_every_n_turns: u32,
    pub allow_squad_collisions: bool,
    pub shared_elimination: bool,
    pub max_hazard_stack: u8,
}

impl Default for Rules {
    fn default() -> Self {
        Rules {
            wrapped: false,
            constrictor: false,
            hazard_damage_per_turn: 14,
            food_spawn_chance: 15,
            minimum_food: 1,
            shrink_every_n_turns: 0,
            allow_squad_collisions: false,
            shared_elimination: false,
            max_hazard_stack: 4,
        }
    }
}

impl Rules {
    /// Builds the rules from the game metadata. Ruleset names and map names
    /// both select variants, since some servers only report one of them.
    pub fn from_game(game: &Game, max_hazard_stack: u8) -> Self {
        let name = game.ruleset.name.to_lowercase();
        let map = game.map.to_lowercase();
        let settings = &game.ruleset.settings;

        let wrapped = name == "wrapped" || map.contains("wrapped");
        let constrictor = name == "constrictor" || name == "wrapped-constrictor";
        let squad = name == "squad";

        let shrink_every_n_turns = if name == "royale" || map == "royale" {
            settings.royale.shrink_every_n_turns
        } else {
            0
        };

        Rules {
            wrapped,
            constrictor,
            hazard_damage_per_turn: settings.hazard_damage_per_turn.max(0),
            food_spawn_chance: settings.food_spawn_chance.min(100),
            minimum_food: settings.minimum_food,
            shrink_every_n_turns,
            allow_squad_collisions: squad && settings.squad.allow_body_collisions,
            shared_elimination: squad && settings.squad.shared_elimination,
            max_hazard_stack: max_hazard_stack.max(1),
        }
    }
}
