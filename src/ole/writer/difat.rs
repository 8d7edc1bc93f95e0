//! DIFAT (Double Indirect FAT) generation
//!
//! The header holds the first 109 FAT sector IDs. Any further IDs go into
//! DIFAT sectors, each ending with a pointer to the next DIFAT sector.

use super::super::consts::*;

#[derive(Debug)]
pub struct DifatBuilder {
    /// FAT sector IDs beyond the first 109
    fat_sector_ids: Vec<u32>,
    sector_size: usize,
}

impl DifatBuilder {
    pub fn new(sector_size: usize) -> Self {
        Self {
            fat_sector_ids: Vec::new(),
            sector_size,
        }
    }

    /// Take the complete FAT sector list; the header keeps the first 109
    pub fn set_fat_sectors(&mut self, fat_sectors: &[u32]) {
        self.fat_sector_ids = fat_sectors
            .get(HEADER_DIFAT_ENTRIES..)
            .map(<[u32]>::to_vec)
            .unwrap_or_default();
    }

    fn ids_per_sector(&self) -> usize {
        (self.sector_size / 4) - 1
    }

    pub fn sector_count(&self) -> u32 {
        self.fat_sector_ids.len().div_ceil(self.ids_per_sector()) as u32
    }

    /// Serialize the DIFAT chain starting at `first_difat_sector`
    pub fn generate_difat_sectors(&self, first_difat_sector: u32) -> Vec<Vec<u8>> {
        let count = self.sector_count();
        let next_pointer_offset = self.sector_size - 4;

        self.fat_sector_ids
            .chunks(self.ids_per_sector())
            .enumerate()
            .map(|(idx, ids)| {
                let mut sector_data = vec![0xFFu8; self.sector_size];
                for (i, &id) in ids.iter().enumerate() {
                    sector_data[i * 4..i * 4 + 4].copy_from_slice(&id.to_le_bytes());
                }
                let next = if (idx as u32) + 1 < count {
                    first_difat_sector + idx as u32 + 1
                } else {
                    ENDOFCHAIN
                };
                sector_data[next_pointer_offset..].copy_from_slice(&next.to_le_bytes());
                sector_data
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn next_pointer(sector: &[u8]) -> u32 {
        u32::from_le_bytes(sector[sector.len() - 4..].try_into().unwrap())
    }

    #[test]
    fn test_no_difat_needed() {
        let mut difat = DifatBuilder::new(512);
        difat.set_fat_sectors(&[1, 2, 3]);
        assert_eq!(difat.sector_count(), 0);
        assert!(difat.generate_difat_sectors(10).is_empty());
    }

    #[test]
    fn test_single_difat_sector() {
        let mut difat = DifatBuilder::new(512);
        // 150 FAT sectors: 109 in the header, 41 in one DIFAT sector
        difat.set_fat_sectors(&(0..150).collect::<Vec<u32>>());

        let sectors = difat.generate_difat_sectors(200);
        assert_eq!(sectors.len(), 1);
        assert_eq!(&sectors[0][0..4], &109u32.to_le_bytes());
        assert_eq!(next_pointer(&sectors[0]), ENDOFCHAIN);
    }

    #[test]
    fn test_chained_difat_sectors() {
        let mut difat = DifatBuilder::new(512);
        // 141 overflow IDs need 127 + 14
        difat.set_fat_sectors(&(0..250).collect::<Vec<u32>>());

        let sectors = difat.generate_difat_sectors(300);
        assert_eq!(sectors.len(), 2);
        assert_eq!(next_pointer(&sectors[0]), 301);
        assert_eq!(next_pointer(&sectors[1]), ENDOFCHAIN);
    }
}
