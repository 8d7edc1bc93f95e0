//! MiniFAT generation
//!
//! Streams below the mini stream cutoff are packed into 64-byte mini sectors
//! inside the mini stream, which is itself stored in regular sectors and
//! referenced from the root entry.

use super::super::consts::*;

/// Mini sector allocator for small streams
#[derive(Debug)]
pub struct MiniFatBuilder {
    minifat: Vec<u32>,
    mini_sector_size: usize,
    /// Concatenated small streams, each padded to a mini sector boundary
    ministream_data: Vec<u8>,
}

impl MiniFatBuilder {
    pub fn new(mini_sector_size: usize) -> Self {
        Self {
            minifat: Vec::new(),
            mini_sector_size,
            ministream_data: Vec::new(),
        }
    }

    /// Append `data` to the mini stream and chain its mini sectors
    ///
    /// Returns the first mini sector, or ENDOFCHAIN for empty data.
    pub fn allocate_mini_chain(&mut self, data: &[u8]) -> u32 {
        if data.is_empty() {
            return ENDOFCHAIN;
        }

        let num_mini_sectors = data.len().div_ceil(self.mini_sector_size) as u32;
        let start = self.minifat.len() as u32;
        let end = start + num_mini_sectors;

        self.minifat.extend((start..end).map(|sector| {
            if sector + 1 < end {
                sector + 1
            } else {
                ENDOFCHAIN
            }
        }));

        let offset = self.ministream_data.len();
        self.ministream_data
            .resize(offset + num_mini_sectors as usize * self.mini_sector_size, 0);
        self.ministream_data[offset..offset + data.len()].copy_from_slice(data);

        start
    }

    pub fn ministream_data(&self) -> &[u8] {
        &self.ministream_data
    }

    pub fn ministream_size(&self) -> u64 {
        self.ministream_data.len() as u64
    }

    /// Serialize the MiniFAT into regular sectors, padded with FREESECT
    pub fn generate_minifat_sectors(&self, sector_size: usize) -> Vec<Vec<u8>> {
        self.minifat
            .chunks(sector_size / 4)
            .map(|entries| {
                let mut sector_data = vec![0xFFu8; sector_size];
                for (i, &value) in entries.iter().enumerate() {
                    sector_data[i * 4..i * 4 + 4].copy_from_slice(&value.to_le_bytes());
                }
                sector_data
            })
            .collect()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.minifat.is_empty()
    }

    #[cfg(test)]
    pub fn minifat(&self) -> &[u32] {
        &self.minifat
    }
}
