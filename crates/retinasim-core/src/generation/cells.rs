//! Retinal cell generation

use rand::Rng;

use crate::components::*;
use crate::config::CellShare;

/// Number of cells a share yields out of `total`. Truncates toward zero, so
/// shares that do not divide evenly produce fewer cells than requested.
pub fn cells_for_share(total: u32, proportion: f64) -> u32 {
    (total as f64 * proportion).floor() as u32
}

/// Generate cells type by type in the order of `shares`.
///
/// Ids are sequential across types. Each cell gets a uniform position in
/// `bounds` (x, y, z drawn in that order), full health and is alive.
pub fn generate_cells(
    bounds: &BoundingBox,
    total: u32,
    shares: &[CellShare],
    rng: &mut impl Rng,
) -> Vec<Cell> {
    let expected = shares
        .iter()
        .map(|share| cells_for_share(total, share.proportion) as usize)
        .fold(0usize, usize::saturating_add);
    let mut cells = Vec::with_capacity(expected.min(u32::MAX as usize));

    let mut next_id = 0u32;
    for share in shares {
        for _ in 0..cells_for_share(total, share.proportion) {
            let position = bounds.random_point(rng);
            cells.push(Cell::new(next_id, share.cell_type, position));
            // Ids are u32; stop once the id space is used up
            match next_id.checked_add(1) {
                Some(id) => next_id = id,
                None => return cells,
            }
        }
    }

    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn shares() -> Vec<CellShare> {
        vec![
            CellShare::new(CellType::Photoreceptor, 0.5),
            CellShare::new(CellType::Glial, 0.5),
        ]
    }

    #[test]
    fn test_generate_cells() {
        let mut rng = StdRng::seed_from_u64(1);
        let bounds = BoundingBox::from_size(10.0, 20.0, 5.0);

        let cells = generate_cells(&bounds, 100, &shares(), &mut rng);

        assert_eq!(cells.len(), 100);
        for (idx, cell) in cells.iter().enumerate() {
            assert_eq!(cell.id as usize, idx);
            assert!(bounds.contains(&cell.position));
            assert!(cell.alive);
        }
        // Types appear in declared order
        assert_eq!(cells[0].cell_type, CellType::Photoreceptor);
        assert_eq!(cells[49].cell_type, CellType::Photoreceptor);
        assert_eq!(cells[50].cell_type, CellType::Glial);
    }

    #[test]
    fn test_floor_truncation() {
        assert_eq!(cells_for_share(10, 0.33), 3);
        assert_eq!(cells_for_share(0, 0.5), 0);

        let mut rng = StdRng::seed_from_u64(1);
        let thirds = vec![
            CellShare::new(CellType::Bipolar, 1.0 / 3.0),
            CellShare::new(CellType::Ganglion, 1.0 / 3.0),
            CellShare::new(CellType::Glial, 1.0 / 3.0),
        ];
        let cells = generate_cells(&BoundingBox::from_size(1.0, 1.0, 1.0), 10, &thirds, &mut rng);
        assert_eq!(cells.len(), 9);
    }

    #[test]
    fn test_oversubscribed_shares_keep_sequential_ids() {
        // Unvalidated shares summing past 1.0 still produce unique ids
        let mut rng = StdRng::seed_from_u64(3);
        let doubled = vec![
            CellShare::new(CellType::Bipolar, 1.0),
            CellShare::new(CellType::Glial, 1.0),
        ];
        let cells = generate_cells(&BoundingBox::from_size(1.0, 1.0, 1.0), 50, &doubled, &mut rng);
        assert_eq!(cells.len(), 100);
        assert!(cells.iter().enumerate().all(|(i, c)| c.id as usize == i));
    }
}
