//! FAT (File Allocation Table) generation
//!
//! The FAT maps sector numbers to the next sector in a chain:
//! - Regular sectors use positive chain values
//! - FAT sectors are marked with FATSECT (0xFFFFFFFD)
//! - DIFAT sectors are marked with DIFSECT (0xFFFFFFFC)
//! - End of chain is marked with ENDOFCHAIN (0xFFFFFFFE)
//! - Free sectors are marked with FREESECT (0xFFFFFFFF)

use super::super::consts::*;

/// Sequential sector allocator that records every chain in a FAT
#[derive(Debug)]
pub struct FatBuilder {
    fat: Vec<u32>,
    next_sector: u32,
    sector_size: usize,
}

impl FatBuilder {
    /// # Panics
    ///
    /// Panics if `sector_size` is not 512 or 4096.
    pub fn new(sector_size: usize) -> Self {
        assert!(
            sector_size == SECTOR_SIZE_V3 || sector_size == SECTOR_SIZE_V4,
            "Sector size must be 512 or 4096"
        );

        Self {
            fat: Vec::new(),
            next_sector: 0,
            sector_size,
        }
    }

    /// Allocate a contiguous chain large enough for `size` bytes
    ///
    /// Returns the first sector, or ENDOFCHAIN when `size` is zero.
    pub fn allocate_chain(&mut self, size: usize) -> u32 {
        if size == 0 {
            return ENDOFCHAIN;
        }

        let num_sectors = size.div_ceil(self.sector_size) as u32;
        let start_sector = self.next_sector;
        let end_sector = start_sector + num_sectors;
        self.fat.resize(end_sector as usize, FREESECT);

        for sector in start_sector..end_sector {
            self.fat[sector as usize] = if sector + 1 < end_sector {
                sector + 1
            } else {
                ENDOFCHAIN
            };
        }

        self.next_sector = end_sector;
        start_sector
    }

    /// Reserve `count` sectors marked with `marker` (FATSECT or DIFSECT)
    pub fn allocate_special(&mut self, count: u32, marker: u32) -> u32 {
        if count == 0 {
            return ENDOFCHAIN;
        }

        let start = self.next_sector;
        let end = start + count;
        self.fat.resize(end as usize, FREESECT);
        self.fat[start as usize..end as usize].fill(marker);

        self.next_sector = end;
        start
    }

    #[cfg(test)]
    pub fn fat(&self) -> &[u32] {
        &self.fat
    }

    /// Number of sectors allocated so far
    pub fn total_sectors(&self) -> u32 {
        self.next_sector
    }

    /// Serialize the FAT into sector-sized blocks, padded with FREESECT
    pub fn generate_fat_sectors(&self) -> Vec<Vec<u8>> {
        let entries_per_sector = self.sector_size / 4;

        self.fat
            .chunks(entries_per_sector)
            .map(|entries| {
                let mut sector_data = vec![0xFFu8; self.sector_size];
                for (i, &value) in entries.iter().enumerate() {
                    sector_data[i * 4..i * 4 + 4].copy_from_slice(&value.to_le_bytes());
                }
                sector_data
            })
            .collect()
    }

    /// Check every chain for loops and dangling references
    ///
    /// Each sector may be the successor of at most one other sector, and
    /// every chain sector must be reachable from a chain head.
    pub fn validate(&self) -> Result<(), String> {
        let len = self.fat.len();
        let mut referenced = vec![false; len];

        for (sector, &next) in self.fat.iter().enumerate() {
            if next > MAXREGSECT {
                continue;
            }
            if next as usize >= len {
                return Err(format!("Invalid next sector {} at sector {}", next, sector));
            }
            if referenced[next as usize] {
                return Err(format!("Sector {} is referenced more than once", next));
            }
            referenced[next as usize] = true;
        }

        let in_chain = |value: u32| value <= MAXREGSECT || value == ENDOFCHAIN;
        let mut reached = vec![false; len];
        for head in (0..len).filter(|&s| !referenced[s] && in_chain(self.fat[s])) {
            let mut current = head;
            loop {
                reached[current] = true;
                match self.fat[current] {
                    next if next <= MAXREGSECT => current = next as usize,
                    _ => break,
                }
            }
        }

        match (0..len).find(|&s| in_chain(self.fat[s]) && !reached[s]) {
            Some(sector) => Err(format!("Circular reference detected at sector {}", sector)),
            None => Ok(()),
        }
    }
}
