/// Gameplay tuning for ability resolution.

#[derive(Debug, Clone, Copy)]
pub struct CombatTuning {
    /// Divisor applied to hidden strength for the additive damage bonus.
    pub strength_damage_divisor: i64,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            strength_damage_divisor: 10,
        }
    }
}
