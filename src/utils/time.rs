use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
enum Clock {
    Wall { last_update: Instant },
    Manual,
}

/// Millisecond clock driving model playback.
///
/// Keeps two timelines: the frame timeline always runs, the game timeline
/// stops while the game is paused. Instances choose one through
/// `ModelInstance::set_timer`.
#[derive(Debug, Clone)]
pub struct GameTimer {
    clock: Clock,
    frame_time: Duration,
    game_time: Duration,
    game_paused: bool,
    /// Time since last tick
    pub delta: Duration,
    /// Total number of ticks
    pub frame_count: u64,
}

impl Default for GameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl GameTimer {
    /// Creates a timer that follows the wall clock on every [`tick`](Self::tick).
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Clock::Wall {
                last_update: Instant::now(),
            },
            frame_time: Duration::ZERO,
            game_time: Duration::ZERO,
            game_paused: false,
            delta: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Creates a timer that only moves through [`advance`](Self::advance).
    #[must_use]
    pub fn manual() -> Self {
        Self {
            clock: Clock::Manual,
            ..Self::new()
        }
    }

    /// Samples the wall clock. Does nothing for a manual timer.
    pub fn tick(&mut self) {
        if let Clock::Wall { last_update } = &mut self.clock {
            let now = Instant::now();
            let delta = now - *last_update;
            *last_update = now;
            self.step(delta);
        }
    }

    /// Moves both timelines forward by `delta`.
    pub fn advance(&mut self, delta: Duration) {
        self.step(delta);
    }

    fn step(&mut self, delta: Duration) {
        self.delta = delta;
        self.frame_time += delta;
        if !self.game_paused {
            self.game_time += delta;
        }
        self.frame_count += 1;
    }

    pub fn set_game_paused(&mut self, paused: bool) {
        self.game_paused = paused;
    }

    #[must_use]
    pub fn is_game_paused(&self) -> bool {
        self.game_paused
    }

    /// Game timeline in milliseconds.
    #[must_use]
    pub fn game_tick(&self) -> u32 {
        self.game_time.as_millis() as u32
    }

    /// Frame timeline in milliseconds.
    #[must_use]
    pub fn frame_tick(&self) -> u32 {
        self.frame_time.as_millis() as u32
    }

    #[must_use]
    pub fn dt_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }
}
