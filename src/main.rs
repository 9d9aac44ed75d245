//! Improbability entry point
//!
//! On the web the host engine owns rendering and physics and drives the
//! simulation through [`wasm_game::WasmGame`]. Natively this runs a headless
//! scripted playthrough and logs what happens.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use wasm_bindgen::prelude::*;

    use improbability::consts::*;
    use improbability::sim::{Contact, GameState, TickInput, tick};
    use improbability::{Settings, Tuning};

    /// Simulation handle owned by the JS host
    #[wasm_bindgen]
    pub struct WasmGame {
        state: GameState,
        accumulator: f64,
        last_time: Option<f64>,
        input: TickInput,
    }

    #[wasm_bindgen]
    impl WasmGame {
        #[wasm_bindgen(constructor)]
        pub fn new(seed: u64, tuning_json: Option<String>) -> Result<WasmGame, JsValue> {
            let tuning = match tuning_json {
                Some(json) => {
                    Tuning::from_json(&json).map_err(|e| JsValue::from_str(&e.to_string()))?
                }
                None => Tuning::default(),
            };
            let mut state = GameState::with_config(seed, tuning, &Settings::load());
            improbability::sim::generate_level(&mut state);
            Ok(Self {
                state,
                accumulator: 0.0,
                last_time: None,
                input: TickInput::default(),
            })
        }

        /// Advance by wall-clock time using fixed steps
        pub fn frame(&mut self, time_ms: f64, player_x: f32, player_y: f32) {
            let elapsed = self.last_time.map(|t| time_ms - t).unwrap_or(0.0);
            self.last_time = Some(time_ms);
            self.accumulator += elapsed.max(0.0);
            self.input.player_pos = Some(glam::Vec2::new(player_x, player_y));

            let mut steps = 0;
            while self.accumulator >= SIM_DT_MS as f64 && steps < MAX_SUBSTEPS {
                tick(&mut self.state, &self.input, SIM_DT_MS);
                // Contacts and toggles apply to the first substep only
                self.input.contacts.clear();
                self.input.actor_positions.clear();
                self.input.pause = false;
                self.accumulator -= SIM_DT_MS as f64;
                steps += 1;
            }
            // Drop the backlog after a long stall
            if steps == MAX_SUBSTEPS {
                self.accumulator = 0.0;
            }
        }

        pub fn set_actor_position(&mut self, id: u32, x: f32, y: f32) {
            self.input.actor_positions.push((id, glam::Vec2::new(x, y)));
        }

        /// Queue an overlap reported by the host physics
        pub fn report_contact(&mut self, kind: &str, id: u32, amount: u32) {
            let contact = match kind {
                "enemy_touch" => Contact::EnemyTouch { enemy: id },
                "enemy_hit" => Contact::EnemyHit { enemy: id, amount },
                "poetry" => Contact::Poetry { projectile: id },
                "hazard" => Contact::Hazard { hazard: id },
                "hazard_landed" => Contact::HazardLanded { hazard: id },
                "towel" => Contact::Towel { collectible: id },
                other => {
                    log::warn!("Unknown contact kind: {}", other);
                    return;
                }
            };
            self.input.contacts.push(contact);
        }

        pub fn toggle_pause(&mut self) {
            self.input.pause = true;
        }

        /// Pending events as a JSON array
        pub fn drain_events(&mut self) -> Result<String, JsValue> {
            let events = self.state.drain_events();
            serde_json::to_string(&events).map_err(|e| JsValue::from_str(&e.to_string()))
        }

        pub fn gravity(&self) -> f32 {
            self.state.modifiers.gravity(GRAVITY)
        }

        pub fn time_scale(&self) -> f32 {
            self.state.modifiers.time_scale()
        }

        pub fn colors_inverted(&self) -> bool {
            self.state.modifiers.colors_inverted()
        }

        pub fn score(&self) -> u32 {
            self.state.score
        }

        pub fn player_health(&self) -> u32 {
            self.state.player().map(|p| p.health).unwrap_or(0)
        }

        /// Cancel scene timers before the host switches scenes
        pub fn teardown(&mut self) {
            self.state.teardown();
        }
    }

    pub fn init() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialized".into());
        }
        log::info!("Improbability starting...");
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::init();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Improbability (native) starting...");

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);
    let tuning = improbability::Tuning::load_or_default("tuning.json");
    let settings = improbability::Settings::load();

    let summary = headless::run(seed, tuning, &settings, 120_000);
    println!(
        "seed {}: {:?} after {} ms, score {}, towels {}, health {}, {} improbable events",
        seed,
        summary.phase,
        summary.elapsed,
        summary.score,
        summary.towels,
        summary.health,
        summary.effects
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Scripted playthrough standing in for the host engine
#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use glam::Vec2;
    use improbability::consts::*;
    use improbability::sim::{
        Contact, GameEvent, GamePhase, GameState, TickInput, TransientKind, generate_level, tick,
    };
    use improbability::{Millis, Settings, Tuning};

    const WALK_SPEED: f32 = 160.0;
    const REACH: f32 = 20.0;

    pub struct Summary {
        pub phase: GamePhase,
        pub elapsed: Millis,
        pub score: u32,
        pub towels: u32,
        pub health: u32,
        pub effects: u64,
    }

    pub fn run(seed: u64, tuning: Tuning, settings: &Settings, limit: Millis) -> Summary {
        let mut state = GameState::with_config(seed, tuning, settings);
        generate_level(&mut state);

        while state.now < limit && state.phase == GamePhase::Playing {
            let input = script_input(&state);
            tick(&mut state, &input, SIM_DT_MS);
            for event in state.drain_events() {
                log_event(&event);
            }
        }

        Summary {
            phase: state.phase,
            elapsed: state.now,
            score: state.score,
            towels: state.towels,
            health: state.player().map(|p| p.health).unwrap_or(0),
            effects: state.drive.applied,
        }
    }

    /// Walk toward the nearest towel and report whatever is in reach
    fn script_input(state: &GameState) -> TickInput {
        let Some(player) = state.living_player_pos() else {
            return TickInput::default();
        };
        let mut contacts = Vec::new();

        let target = state
            .collectibles
            .iter()
            .min_by(|a, b| a.pos.distance(player).total_cmp(&b.pos.distance(player)));
        let step = WALK_SPEED * SIM_DT_MS as f32 / 1000.0;
        let pos = match target {
            Some(towel) if towel.pos.distance(player) <= REACH => {
                contacts.push(Contact::Towel { collectible: towel.id });
                player
            }
            Some(towel) => player + (towel.pos - player).normalize_or_zero() * step,
            None => player,
        };

        for enemy in state.actors.iter().filter(|a| !a.is_player() && !a.is_dead()) {
            if enemy.pos.distance(pos) <= REACH {
                contacts.push(Contact::EnemyTouch { enemy: enemy.id });
            }
        }
        for t in &state.transients {
            if t.pos.distance(pos) > REACH {
                continue;
            }
            match t.kind {
                TransientKind::Poetry { .. } => contacts.push(Contact::Poetry { projectile: t.id }),
                TransientKind::FlowerPot => contacts.push(Contact::Hazard { hazard: t.id }),
                TransientKind::Whale | TransientKind::Petunias => {}
            }
        }

        TickInput {
            player_pos: Some(pos.clamp(Vec2::ZERO, Vec2::new(WORLD_WIDTH, WORLD_HEIGHT))),
            contacts,
            ..Default::default()
        }
    }

    fn log_event(event: &GameEvent) {
        match event {
            GameEvent::Message(text) => log::info!("[message] {}", text.replace('\n', " ")),
            GameEvent::Quote(text) => log::info!("[quote] {}", text),
            GameEvent::PoetryLine { text, .. } => log::info!("[poetry] {}", text),
            GameEvent::EffectStarted(effect) => log::info!("[effect] {} started", effect.name()),
            GameEvent::EffectEnded(effect) => log::info!("[effect] {} ended", effect.name()),
            GameEvent::DamageFlash { actor, amount, health } => {
                log::info!("[damage] actor {} took {} ({} left)", actor, amount, health)
            }
            GameEvent::Victory | GameEvent::GameOver | GameEvent::MilestoneReached => {
                log::info!("[game] {:?}", event)
            }
            other => log::debug!("{:?}", other),
        }
    }
}
