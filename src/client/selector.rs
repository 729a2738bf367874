use rand_core::RngCore;
use rand_distr::{Distribution, Uniform};

/// Uniform draw in [1, 100]
pub fn draw_percentage(rng: &mut impl RngCore) -> u8 {
    Uniform::new_inclusive(1u8, 100).sample(rng)
}

/// Index of the first pattern whose cumulative percentage reaches `draw`.
/// `None` when the percentages sum below `draw`.
pub fn select_with_draw(percentages: impl IntoIterator<Item = u8>, draw: u8) -> Option<usize> {
    let mut cumulated = 0u32;
    for (index, percentage) in percentages.into_iter().enumerate() {
        cumulated += u32::from(percentage);
        if cumulated >= u32::from(draw) {
            return Some(index);
        }
    }
    None
}

/// Choose the pattern of the next Interest according to the traffic percentages
pub fn select_pattern(
    percentages: impl IntoIterator<Item = u8>,
    rng: &mut impl RngCore,
) -> Option<usize> {
    select_with_draw(percentages, draw_percentage(rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn cumulative_selection() {
        assert_eq!(select_with_draw([30, 70], 1), Some(0));
        assert_eq!(select_with_draw([30, 70], 30), Some(0));
        assert_eq!(select_with_draw([30, 70], 31), Some(1));
        assert_eq!(select_with_draw([30, 70], 100), Some(1));
        assert_eq!(select_with_draw([20, 20], 41), None);
        assert_eq!(select_with_draw([0, 100], 1), Some(1));
        assert_eq!(select_with_draw([0u8; 0], 1), None);
    }

    #[test]
    fn full_percentage_always_selected() {
        let mut rng = Pcg32::seed_from_u64(0);
        for _ in 0..1000 {
            assert_eq!(select_pattern([100], &mut rng), Some(0));
        }
    }

    #[test]
    fn draws_stay_in_range() {
        let mut rng = Pcg32::seed_from_u64(5);
        for _ in 0..1000 {
            let d = draw_percentage(&mut rng);
            assert!((1..=100).contains(&d));
        }
    }

    #[test]
    fn split_converges() {
        let mut rng = Pcg32::seed_from_u64(1234);
        let mut counts = [0u32; 2];
        for _ in 0..10_000 {
            if let Some(i) = select_pattern([40, 60], &mut rng) {
                counts[i] += 1;
            }
        }
        assert_eq!(counts[0] + counts[1], 10_000);
        assert!((3_700..4_300).contains(&counts[0]), "{counts:?}");
    }
}
