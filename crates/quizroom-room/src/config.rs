//! Match configuration and scoring constants.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings shared by every room a store creates.
///
/// Deserializes with `#[serde(default)]`, so a config file only needs the
/// fields it wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Question-bank category every match draws from.
    pub category: String,

    /// Questions drawn per match. Fewer are used if the category is
    /// smaller than this.
    pub questions_per_game: usize,

    /// Seconds a question stays open.
    pub time_limit_secs: u64,

    /// Points for any correct answer.
    pub base_points: u32,

    /// Extra points for answering instantly; scales linearly down to zero
    /// at the time limit.
    pub time_bonus_max: u32,

    /// Pause between `gameStarted` and the first question, so clients can
    /// render a transition.
    pub start_delay_ms: u64,

    /// How long a question's results stay on screen.
    pub results_delay_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            category: "general".to_string(),
            questions_per_game: 5,
            time_limit_secs: 30,
            base_points: 100,
            time_bonus_max: 50,
            start_delay_ms: 3_000,
            results_delay_ms: 5_000,
        }
    }
}

impl GameConfig {
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn results_delay(&self) -> Duration {
        Duration::from_millis(self.results_delay_ms)
    }

    /// Points for a correct answer submitted with `time_remaining` seconds
    /// left on the clock:
    ///
    /// ```text
    /// base_points + floor(time_remaining / time_limit * time_bonus_max)
    /// ```
    ///
    /// `time_remaining` is clamped to `0..=time_limit` first.
    pub fn award(&self, time_remaining: f64) -> u32 {
        if self.time_limit_secs == 0 || !time_remaining.is_finite() {
            return self.base_points;
        }
        let limit = self.time_limit_secs as f64;
        let remaining = time_remaining.clamp(0.0, limit);
        // Multiply before dividing: integral inputs then floor exactly.
        let bonus = (remaining * f64::from(self.time_bonus_max) / limit).floor() as u32;
        self.base_points + bonus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scoring(limit: u64, base: u32, bonus: u32) -> GameConfig {
        GameConfig {
            time_limit_secs: limit,
            base_points: base,
            time_bonus_max: bonus,
            ..GameConfig::default()
        }
    }

    #[test]
    fn test_award_floors_time_bonus() {
        // 100 + floor(25 / 30 * 50) = 100 + floor(41.67)
        assert_eq!(scoring(30, 100, 50).award(25.0), 141);
    }

    #[test]
    fn test_award_full_time_gives_full_bonus() {
        assert_eq!(scoring(30, 100, 50).award(30.0), 150);
    }

    #[test]
    fn test_award_clamps_out_of_range_time() {
        let config = scoring(30, 100, 50);
        assert_eq!(config.award(90.0), 150);
        assert_eq!(config.award(-4.0), 100);
    }

    #[test]
    fn test_award_fractional_time() {
        // floor(12.5 * 50 / 30) = floor(20.83)
        assert_eq!(scoring(30, 100, 50).award(12.5), 120);
    }

    #[test]
    fn test_award_zero_time_limit_gives_base_only() {
        assert_eq!(scoring(0, 100, 50).award(10.0), 100);
    }

    #[test]
    fn test_game_config_default() {
        let config = GameConfig::default();
        assert_eq!(config.questions_per_game, 5);
        assert_eq!(config.time_limit(), Duration::from_secs(30));
        assert_eq!(config.start_delay(), Duration::from_secs(3));
        assert_eq!(config.results_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_game_config_partial_json_keeps_defaults() {
        let config: GameConfig =
            serde_json::from_str(r#"{"time_limit_secs": 10, "category": "science"}"#).unwrap();
        assert_eq!(config.time_limit_secs, 10);
        assert_eq!(config.category, "science");
        assert_eq!(config.base_points, 100);
    }
}
