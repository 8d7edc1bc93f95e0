//! Header generation
//!
//! Produces the first block of the file: magic bytes, version, sector
//! geometry, and the locations of the directory, MiniFAT, DIFAT and the
//! first 109 FAT sectors.

use super::super::consts::*;

pub struct HeaderBuilder {
    sector_size: usize,
    first_dir_sector: u32,
    /// csectDir; must stay 0 for 512-byte sectors
    num_dir_sectors: u32,
    first_minifat_sector: u32,
    num_minifat_sectors: u32,
    first_difat_sector: u32,
    num_difat_sectors: u32,
    fat_sectors: Vec<u32>,
}

impl HeaderBuilder {
    pub fn new(sector_size: usize) -> Self {
        Self {
            sector_size,
            first_dir_sector: ENDOFCHAIN,
            num_dir_sectors: 0,
            first_minifat_sector: ENDOFCHAIN,
            num_minifat_sectors: 0,
            first_difat_sector: ENDOFCHAIN,
            num_difat_sectors: 0,
            fat_sectors: Vec::new(),
        }
    }

    pub fn set_directory(&mut self, first_sector: u32, num_sectors: u32) {
        self.first_dir_sector = first_sector;
        self.num_dir_sectors = if self.sector_size == SECTOR_SIZE_V3 {
            0
        } else {
            num_sectors
        };
    }

    pub fn set_minifat(&mut self, first_sector: u32, num_sectors: u32) {
        self.first_minifat_sector = first_sector;
        self.num_minifat_sectors = num_sectors;
    }

    pub fn set_difat(&mut self, first_sector: u32, num_sectors: u32) {
        self.first_difat_sector = first_sector;
        self.num_difat_sectors = num_sectors;
    }

    pub fn set_fat_sectors(&mut self, sectors: &[u32]) {
        self.fat_sectors = sectors.to_vec();
    }

    /// Generate the header block
    ///
    /// The header structure is 512 bytes; with 4096-byte sectors the rest of
    /// the first block is zero-filled.
    pub fn generate(&self) -> Vec<u8> {
        let mut header = vec![0u8; self.sector_size];
        let (dll_version, sector_shift) = if self.sector_size == SECTOR_SIZE_V3 {
            (3u16, 9u16)
        } else {
            (4u16, 12u16)
        };

        header[0..8].copy_from_slice(MAGIC);
        // header[8..24]: CLSID, always zero
        header[24..26].copy_from_slice(&0x003Eu16.to_le_bytes());
        header[26..28].copy_from_slice(&dll_version.to_le_bytes());
        header[28..30].copy_from_slice(&0xFFFEu16.to_le_bytes());
        header[30..32].copy_from_slice(&sector_shift.to_le_bytes());
        header[32..34].copy_from_slice(&6u16.to_le_bytes());
        // header[34..40]: reserved
        header[40..44].copy_from_slice(&self.num_dir_sectors.to_le_bytes());
        header[44..48].copy_from_slice(&(self.fat_sectors.len() as u32).to_le_bytes());
        header[48..52].copy_from_slice(&self.first_dir_sector.to_le_bytes());
        // header[52..56]: transaction signature
        header[56..60].copy_from_slice(&MINI_STREAM_CUTOFF.to_le_bytes());
        header[60..64].copy_from_slice(&self.first_minifat_sector.to_le_bytes());
        header[64..68].copy_from_slice(&self.num_minifat_sectors.to_le_bytes());
        header[68..72].copy_from_slice(&self.first_difat_sector.to_le_bytes());
        header[72..76].copy_from_slice(&self.num_difat_sectors.to_le_bytes());

        for slot in 0..HEADER_DIFAT_ENTRIES {
            let value = self.fat_sectors.get(slot).copied().unwrap_or(FREESECT);
            let offset = 76 + slot * 4;
            header[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }

        header
    }
}
