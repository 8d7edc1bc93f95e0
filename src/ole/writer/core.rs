//! Compound file writer
//!
//! Changes are accumulated in memory and the container is produced in one
//! pass by [`OleWriter::write_to`].
//!
//! # Stream Allocation vs Directory Ordering
//!
//! 1. **Allocation order** follows the order streams were added: large
//!    streams are laid out first, in insertion order, then the mini stream.
//! 2. **Directory order** is independent of that: each storage's entries are
//!    sorted by name length, then name, and linked into a search tree.
//!
//! # Example
//!
//! ```rust
//! use hwpfill::ole::OleWriter;
//!
//! let mut writer = OleWriter::new();
//! writer.create_stream(&["FileHeader"], b"HWP Document File")?;
//! writer.create_stream(&["BodyText", "Section0"], b"...")?;
//! let bytes = writer.to_bytes()?;
//! assert!(hwpfill::ole::is_ole_file(&bytes));
//! # Ok::<(), hwpfill::ole::OleError>(())
//! ```
use super::super::consts::*;
use super::super::file::OleError;
use super::difat::DifatBuilder;
use super::directory::DirectoryBuilder;
use super::fat::FatBuilder;
use super::header::HeaderBuilder;
use super::minifat::MiniFatBuilder;
use std::io::{Cursor, Seek, SeekFrom, Write};

pub struct OleWriter {
    /// Sector size (512 or 4096 bytes)
    sector_size: usize,
    root_clsid: [u8; 16],
    /// Stream data in insertion order
    streams: Vec<(Vec<String>, Vec<u8>)>,
    /// Storages declared explicitly, so that empty ones survive
    storages: Vec<Vec<String>>,
}

impl OleWriter {
    /// Create a writer with 512-byte sectors
    pub fn new() -> Self {
        Self::with_sector_size(SECTOR_SIZE_V3)
    }

    /// # Panics
    ///
    /// Panics if `sector_size` is not 512 or 4096
    pub fn with_sector_size(sector_size: usize) -> Self {
        assert!(
            sector_size == SECTOR_SIZE_V3 || sector_size == SECTOR_SIZE_V4,
            "Sector size must be 512 or 4096"
        );

        OleWriter {
            sector_size,
            root_clsid: [0; 16],
            streams: Vec::new(),
            storages: Vec::new(),
        }
    }

    /// Set the CLSID of the root entry
    pub fn set_root_clsid(&mut self, clsid: [u8; 16]) {
        self.root_clsid = clsid;
    }

    /// Create a stream at `path`, replacing any stream already there
    pub fn create_stream(&mut self, path: &[&str], data: &[u8]) -> Result<(), OleError> {
        let owned_path = owned(path)?;

        if let Some(existing) = self.streams.iter_mut().find(|(p, _)| *p == owned_path) {
            existing.1 = data.to_vec();
        } else {
            self.streams.push((owned_path, data.to_vec()));
        }

        Ok(())
    }

    /// Create a storage at `path`; parent storages are created as needed
    pub fn create_storage(&mut self, path: &[&str]) -> Result<(), OleError> {
        let owned_path = owned(path)?;
        if !self.storages.contains(&owned_path) {
            self.storages.push(owned_path);
        }
        Ok(())
    }

    /// Write the complete container to `writer`
    ///
    /// Layout, in sector order: large streams, mini stream, directory,
    /// MiniFAT, DIFAT, FAT. The FAT and DIFAT sizes depend on the total
    /// sector count including themselves, so they are solved iteratively.
    pub fn write_to<W: Write + Seek>(&self, writer: &mut W) -> Result<(), OleError> {
        let mut fat = FatBuilder::new(self.sector_size);
        let mut minifat = MiniFatBuilder::new(MINI_SECTOR_SIZE);

        let (small, large): (Vec<_>, Vec<_>) = self
            .streams
            .iter()
            .partition(|(_, data)| data.len() < MINI_STREAM_CUTOFF as usize);

        let large_streams: Vec<(u32, &(Vec<String>, Vec<u8>))> = large
            .into_iter()
            .map(|stream| (fat.allocate_chain(stream.1.len()), stream))
            .collect();
        let small_streams: Vec<(u32, &(Vec<String>, Vec<u8>))> = small
            .into_iter()
            .map(|stream| (minifat.allocate_mini_chain(&stream.1), stream))
            .collect();

        let ministream_start = fat.allocate_chain(minifat.ministream_data().len());

        let mut directory = DirectoryBuilder::new(ministream_start, minifat.ministream_size());
        directory.set_root_clsid(self.root_clsid);
        for storage_path in &self.storages {
            directory.add_storage_path(storage_path);
        }
        for (start, (path, data)) in large_streams.iter().chain(small_streams.iter()) {
            directory.add_stream_path(path, *start, data.len() as u64);
        }

        let dir_stream = directory.generate_directory_stream();
        let dir_sector_count = dir_stream.len().div_ceil(self.sector_size) as u32;
        let dir_start_sector = fat.allocate_chain(dir_stream.len());

        let minifat_sectors = minifat.generate_minifat_sectors(self.sector_size);
        let num_minifat_sectors = minifat_sectors.len() as u32;
        let minifat_start_sector = fat.allocate_chain(minifat_sectors.len() * self.sector_size);

        let entries_per_fat_sector = self.sector_size as u32 / 4;
        let ids_per_difat_sector = entries_per_fat_sector - 1;
        let n_used = fat.total_sectors();
        let mut n_fat: u32 = 0;
        let mut n_difat: u32 = 0;
        loop {
            let new_n_fat = (n_used + n_fat + n_difat).div_ceil(entries_per_fat_sector);
            let new_n_difat = new_n_fat
                .saturating_sub(HEADER_DIFAT_ENTRIES as u32)
                .div_ceil(ids_per_difat_sector);
            if new_n_fat == n_fat && new_n_difat == n_difat {
                break;
            }
            n_fat = new_n_fat;
            n_difat = new_n_difat;
        }

        let difat_start_sector = fat.allocate_special(n_difat, DIFSECT);
        let fat_start_sector = fat.allocate_special(n_fat, FATSECT);
        fat.validate()
            .map_err(|e| OleError::InvalidData(format!("FAT validation failed: {}", e)))?;
        let fat_sectors = fat.generate_fat_sectors();

        let fat_sector_ids: Vec<u32> = (fat_start_sector..fat_start_sector + n_fat).collect();
        let mut difat = DifatBuilder::new(self.sector_size);
        difat.set_fat_sectors(&fat_sector_ids);
        let difat_sectors = difat.generate_difat_sectors(difat_start_sector);

        let mut header = HeaderBuilder::new(self.sector_size);
        header.set_directory(dir_start_sector, dir_sector_count);
        header.set_minifat(minifat_start_sector, num_minifat_sectors);
        header.set_fat_sectors(&fat_sector_ids);
        if !difat_sectors.is_empty() {
            header.set_difat(difat_start_sector, difat_sectors.len() as u32);
        }

        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(&header.generate())?;

        for (start, (_, data)) in &large_streams {
            self.write_run(writer, *start, data)?;
        }
        self.write_run(writer, ministream_start, minifat.ministream_data())?;
        self.write_run(writer, dir_start_sector, &dir_stream)?;
        self.write_run(writer, minifat_start_sector, &minifat_sectors.concat())?;
        self.write_run(writer, difat_start_sector, &difat_sectors.concat())?;
        self.write_run(writer, fat_start_sector, &fat_sectors.concat())?;

        writer.flush()?;
        Ok(())
    }

    /// Write the container into a fresh buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>, OleError> {
        let mut buffer = Cursor::new(Vec::new());
        self.write_to(&mut buffer)?;
        Ok(buffer.into_inner())
    }

    /// Write `data` into consecutive sectors starting at `start`, zero-padded
    /// to a sector boundary
    fn write_run<W: Write + Seek>(&self, writer: &mut W, start: u32, data: &[u8]) -> Result<(), OleError> {
        if start == ENDOFCHAIN || data.is_empty() {
            return Ok(());
        }

        let position = (start as u64 + 1) * self.sector_size as u64;
        writer.seek(SeekFrom::Start(position))?;
        writer.write_all(data)?;

        let padding = data.len().next_multiple_of(self.sector_size) - data.len();
        writer.write_all(&vec![0u8; padding])?;
        Ok(())
    }
}

impl Default for OleWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn owned(path: &[&str]) -> Result<Vec<String>, OleError> {
    if path.is_empty() || path.iter().any(|part| part.is_empty()) {
        return Err(OleError::InvalidData("Empty path".to_string()));
    }
    if let Some(long) = path.iter().find(|part| part.encode_utf16().count() > 31) {
        return Err(OleError::InvalidData(format!(
            "Entry name '{}' exceeds 31 characters",
            long
        )));
    }
    Ok(path.iter().map(|s| s.to_string()).collect())
}
