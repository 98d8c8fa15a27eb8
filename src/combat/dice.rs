//! Dice rolling for initiative
//!
//! Rolls are generic over the RNG so callers can seed them in tests.

use rand::Rng;

/// Sides on the initiative die
pub const INITIATIVE_DIE: u32 = 20;

/// Roll initiative: one d20 plus the bonus, saturating at the i32 bounds
pub fn roll_initiative<R: Rng + ?Sized>(rng: &mut R, bonus: i32) -> i32 {
    let die = rng.random_range(1..=INITIATIVE_DIE) as i32;
    die.saturating_add(bonus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_initiative_bounds() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let result = roll_initiative(&mut rng, 3);
            assert!(result >= 4, "Roll {} below minimum 4", result);
            assert!(result <= 23, "Roll {} above maximum 23", result);
        }
    }

    #[test]
    fn test_negative_bonus() {
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..200 {
            let result = roll_initiative(&mut rng, -2);
            assert!((-1..=18).contains(&result));
        }
    }

    #[test]
    fn test_extreme_bonus_saturates() {
        let mut rng = StdRng::seed_from_u64(5);

        for _ in 0..50 {
            assert_eq!(roll_initiative(&mut rng, i32::MAX), i32::MAX);
            let low = roll_initiative(&mut rng, i32::MIN);
            assert!((i32::MIN + 1..=i32::MIN + 20).contains(&low));
        }
    }

    #[test]
    fn test_seeded_rolls_repeat() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);

        for _ in 0..20 {
            assert_eq!(roll_initiative(&mut a, 1), roll_initiative(&mut b, 1));
        }
    }
}
