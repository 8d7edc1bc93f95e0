use super::consts::*;
use std::io::{self, Read, Seek, SeekFrom};
use tracing::debug;
use zerocopy::{FromBytes, LE, U16, U32, U64};
use zerocopy_derive::FromBytes as DeriveFromBytes;

/// Raw compound file header (512 bytes)
///
/// Every multi-byte field is little-endian. The first 109 FAT sector IDs are
/// stored inline; further ones live in DIFAT sectors.
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
#[allow(dead_code)]
struct RawHeader {
    magic: [u8; 8],
    clsid: [u8; 16],
    minor_version: U16<LE>,
    dll_version: U16<LE>,
    byte_order: U16<LE>,
    sector_shift: U16<LE>,
    mini_sector_shift: U16<LE>,
    reserved: [u8; 6],
    num_dir_sectors: U32<LE>,
    num_fat_sectors: U32<LE>,
    first_dir_sector: U32<LE>,
    transaction_signature: U32<LE>,
    mini_stream_cutoff: U32<LE>,
    first_minifat_sector: U32<LE>,
    num_minifat_sectors: U32<LE>,
    first_difat_sector: U32<LE>,
    num_difat_sectors: U32<LE>,
    difat: [U32<LE>; HEADER_DIFAT_ENTRIES],
}

/// Raw directory entry structure (128 bytes)
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
#[allow(dead_code)]
struct RawDirectoryEntry {
    /// Entry name in UTF-16LE (64 bytes, null-padded)
    name: [u8; 64],
    /// Length of name in bytes (including null terminator)
    name_len: U16<LE>,
    /// Entry type (1 = storage, 2 = stream, 5 = root)
    entry_type: u8,
    /// Node color (0 = red, 1 = black)
    node_color: u8,
    sid_left: U32<LE>,
    sid_right: U32<LE>,
    sid_child: U32<LE>,
    clsid: [u8; 16],
    state_bits: U32<LE>,
    creation_time: U64<LE>,
    modified_time: U64<LE>,
    start_sector: U32<LE>,
    stream_size: U64<LE>,
}

/// Compound file reader
///
/// Holds the allocation tables and the directory in memory and reads stream
/// data from the underlying reader on demand.
#[derive(Debug)]
pub struct OleFile<R: Read + Seek> {
    reader: R,
    file_size: u64,
    /// Sector size (512 or 4096 bytes)
    sector_size: usize,
    mini_sector_size: usize,
    mini_stream_cutoff: u32,
    /// File Allocation Table - maps sector to next sector in chain
    fat: Vec<u32>,
    /// Mini FAT - for streams smaller than cutoff size
    minifat: Vec<u32>,
    /// All reachable directory entries indexed by SID
    dir_entries: Vec<Option<DirectoryEntry>>,
    /// Mini stream data (loaded on demand)
    ministream: Option<Vec<u8>>,
}

/// A stream or storage in the directory
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// Storage ID (index in directory)
    pub sid: u32,
    /// Entry name (UTF-16 decoded)
    pub name: String,
    /// Entry type (stream, storage, root)
    pub entry_type: u8,
    /// Raw CLSID bytes
    pub clsid: [u8; 16],
    /// First sector of the stream
    pub start_sector: u32,
    /// Size of the stream in bytes
    pub size: u64,
    /// Whether this stream is in MiniFAT
    pub is_minifat: bool,
    /// Child SIDs in directory order (storages and root only)
    pub children: Vec<u32>,
}

impl DirectoryEntry {
    pub fn is_stream(&self) -> bool {
        self.entry_type == STGTY_STREAM
    }

    pub fn is_storage(&self) -> bool {
        self.entry_type == STGTY_STORAGE || self.entry_type == STGTY_ROOT
    }
}

/// Error types for compound file parsing and writing
#[derive(Debug)]
pub enum OleError {
    Io(io::Error),
    InvalidFormat(String),
    InvalidData(String),
    NotOleFile,
    CorruptedFile(String),
    StreamNotFound(String),
}

impl From<io::Error> for OleError {
    fn from(err: io::Error) -> Self {
        OleError::Io(err)
    }
}

impl std::fmt::Display for OleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OleError::Io(e) => write!(f, "IO error: {}", e),
            OleError::InvalidFormat(s) => write!(f, "Invalid format: {}", s),
            OleError::InvalidData(s) => write!(f, "Invalid data: {}", s),
            OleError::NotOleFile => write!(f, "Not a compound file"),
            OleError::CorruptedFile(s) => write!(f, "Corrupted file: {}", s),
            OleError::StreamNotFound(s) => write!(f, "Stream not found: {}", s),
        }
    }
}

impl std::error::Error for OleError {}

impl<R: Read + Seek> OleFile<R> {
    /// Open and parse a compound file from a reader
    ///
    /// Validates the signature and header, then loads the FAT, the directory
    /// tree and the MiniFAT. Stream contents are not read.
    pub fn open(mut reader: R) -> Result<Self, OleError> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        if file_size < MINIMAL_OLEFILE_SIZE as u64 {
            return Err(OleError::NotOleFile);
        }

        let mut header_bytes = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header_bytes)?;
        let header = RawHeader::read_from_bytes(&header_bytes[..])
            .map_err(|_| OleError::InvalidFormat("Failed to parse header".to_string()))?;

        if &header.magic != MAGIC {
            return Err(OleError::NotOleFile);
        }
        if header.byte_order.get() != 0xFFFE {
            return Err(OleError::InvalidFormat("Invalid byte order".to_string()));
        }

        let sector_size = match header.sector_shift.get() {
            9 => SECTOR_SIZE_V3,
            12 => SECTOR_SIZE_V4,
            other => {
                return Err(OleError::InvalidFormat(format!(
                    "Unsupported sector shift {}",
                    other
                )));
            },
        };
        let dll_version = header.dll_version.get();
        if (dll_version == 3 && sector_size != SECTOR_SIZE_V3)
            || (dll_version == 4 && sector_size != SECTOR_SIZE_V4)
        {
            return Err(OleError::InvalidFormat("Sector size mismatch".to_string()));
        }
        if header.mini_sector_shift.get() != 6 {
            return Err(OleError::InvalidFormat(format!(
                "Unsupported mini sector shift {}",
                header.mini_sector_shift.get()
            )));
        }

        let mut ole = OleFile {
            reader,
            file_size,
            sector_size,
            mini_sector_size: MINI_SECTOR_SIZE,
            mini_stream_cutoff: header.mini_stream_cutoff.get(),
            fat: Vec::new(),
            minifat: Vec::new(),
            dir_entries: Vec::new(),
            ministream: None,
        };

        ole.load_fat(&header)?;
        ole.load_directory(header.first_dir_sector.get())?;
        if header.num_minifat_sectors.get() > 0 {
            ole.load_minifat(header.first_minifat_sector.get())?;
        }

        debug!(
            sector_size,
            fat_entries = ole.fat.len(),
            minifat_entries = ole.minifat.len(),
            "opened compound file"
        );
        Ok(ole)
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn sector_size(&self) -> usize {
        self.sector_size
    }

    /// CLSID of the root storage
    pub fn root_clsid(&self) -> [u8; 16] {
        self.root().map(|r| r.clsid).unwrap_or([0; 16])
    }

    /// Load the File Allocation Table (FAT)
    ///
    /// The first 109 FAT sector indexes come from the header, the rest from
    /// the DIFAT chain.
    fn load_fat(&mut self, header: &RawHeader) -> Result<(), OleError> {
        let mut fat_sectors: Vec<u32> = header
            .difat
            .iter()
            .map(|v| v.get())
            .take_while(|&s| s != FREESECT && s != ENDOFCHAIN)
            .collect();

        let num_difat_sectors = header.num_difat_sectors.get();
        if num_difat_sectors > 0 {
            let mut difat_sector = header.first_difat_sector.get();
            // Last u32 of each DIFAT sector points at the next one
            let entries_per_sector = (self.sector_size / 4) - 1;

            for _ in 0..num_difat_sectors {
                if difat_sector == ENDOFCHAIN || difat_sector == FREESECT {
                    break;
                }
                let sector_data = self.read_sector(difat_sector)?;
                let ids = read_u32_table(&sector_data);

                fat_sectors.extend(
                    ids[..entries_per_sector]
                        .iter()
                        .copied()
                        .take_while(|&s| s != FREESECT && s != ENDOFCHAIN),
                );
                difat_sector = ids[entries_per_sector];
            }
        }

        let entries_per_sector = self.sector_size / 4;
        self.fat.reserve(fat_sectors.len() * entries_per_sector);
        for &sector_id in &fat_sectors {
            let sector_data = self.read_sector(sector_id)?;
            self.fat.extend(read_u32_table(&sector_data));
        }

        Ok(())
    }

    /// Load the Mini FAT (for small streams)
    fn load_minifat(&mut self, first_minifat_sector: u32) -> Result<(), OleError> {
        let minifat_data = self.read_stream_from_fat(first_minifat_sector)?;
        self.minifat = read_u32_table(&minifat_data);
        Ok(())
    }

    /// Load directory entries and link every storage to its children
    ///
    /// Siblings form a binary tree per storage; an in-order walk gives the
    /// directory order. A SID reached twice means the tree is cyclic or
    /// shared, which is rejected.
    fn load_directory(&mut self, first_dir_sector: u32) -> Result<(), OleError> {
        let dir_data = self.read_stream_from_fat(first_dir_sector)?;
        let num_entries = dir_data.len() / DIRENTRY_SIZE;
        if num_entries == 0 {
            return Err(OleError::CorruptedFile("Empty directory".to_string()));
        }
        self.dir_entries = vec![None; num_entries];

        let root = self.parse_directory_entry(&dir_data, 0)?;
        if root.entry_type != STGTY_ROOT {
            return Err(OleError::CorruptedFile(
                "First directory entry is not the root".to_string(),
            ));
        }
        let root_child = child_sid_of(&dir_data, 0);
        self.dir_entries[0] = Some(root);

        let mut visited = vec![false; num_entries];
        visited[0] = true;
        // Storages whose children still need linking: (storage sid, child tree root)
        let mut pending = vec![(0u32, root_child)];

        while let Some((parent, tree_root)) = pending.pop() {
            let children = self.walk_siblings(tree_root, &dir_data, &mut visited)?;
            for &sid in &children {
                let entry = self.parse_directory_entry(&dir_data, sid)?;
                if entry.entry_type == STGTY_STORAGE {
                    pending.push((sid, child_sid_of(&dir_data, sid)));
                }
                self.dir_entries[sid as usize] = Some(entry);
            }
            if let Some(Some(storage)) = self.dir_entries.get_mut(parent as usize) {
                storage.children = children;
            }
        }

        Ok(())
    }

    /// In-order walk of one storage's sibling tree
    fn walk_siblings(
        &self,
        tree_root: u32,
        dir_data: &[u8],
        visited: &mut [bool],
    ) -> Result<Vec<u32>, OleError> {
        let mut ordered = Vec::new();
        let mut stack = Vec::new();
        let mut current = tree_root;

        loop {
            while current != NOSTREAM {
                let idx = current as usize;
                if idx >= visited.len() {
                    return Err(OleError::CorruptedFile(format!(
                        "Invalid directory entry index {}",
                        current
                    )));
                }
                if visited[idx] {
                    return Err(OleError::CorruptedFile(format!(
                        "Directory entry {} is referenced more than once",
                        current
                    )));
                }
                visited[idx] = true;
                stack.push(current);
                current = left_sid_of(dir_data, current);
            }

            let Some(sid) = stack.pop() else {
                break;
            };
            ordered.push(sid);
            current = right_sid_of(dir_data, sid);
        }

        Ok(ordered)
    }

    /// Parse a single directory entry by SID
    fn parse_directory_entry(&self, dir_data: &[u8], sid: u32) -> Result<DirectoryEntry, OleError> {
        let offset = sid as usize * DIRENTRY_SIZE;
        let raw = dir_data
            .get(offset..offset + DIRENTRY_SIZE)
            .and_then(|bytes| RawDirectoryEntry::read_from_bytes(bytes).ok())
            .ok_or_else(|| {
                OleError::CorruptedFile(format!("Failed to parse directory entry {}", sid))
            })?;

        let name_len = raw.name_len.get() as usize;
        let name = decode_entry_name(&raw.name[0..name_len.saturating_sub(2).min(64)]);

        // 512-byte sector files only use the low 32 bits
        let size = if self.sector_size == SECTOR_SIZE_V3 {
            raw.stream_size.get() & 0xFFFFFFFF
        } else {
            raw.stream_size.get()
        };

        let is_minifat = raw.entry_type == STGTY_STREAM && size < self.mini_stream_cutoff as u64;

        Ok(DirectoryEntry {
            sid,
            name,
            entry_type: raw.entry_type,
            clsid: raw.clsid,
            start_sector: raw.start_sector.get(),
            size,
            is_minifat,
            children: Vec::new(),
        })
    }

    /// Read a single sector from the file
    ///
    /// A final sector cut short by the end of the file is zero-filled.
    fn read_sector(&mut self, sector_id: u32) -> Result<Vec<u8>, OleError> {
        if sector_id > MAXREGSECT {
            return Err(OleError::CorruptedFile(format!(
                "Special sector id {:#x} used as data",
                sector_id
            )));
        }
        // Sector position in file: (sector_id + 1) * sector_size
        let position = ((sector_id as u64) + 1) * (self.sector_size as u64);
        if position >= self.file_size {
            return Err(OleError::CorruptedFile(format!(
                "Sector {} lies beyond the end of the file",
                sector_id
            )));
        }
        self.reader.seek(SeekFrom::Start(position))?;

        let available = (self.file_size - position).min(self.sector_size as u64) as usize;
        let mut buffer = vec![0u8; self.sector_size];
        self.reader.read_exact(&mut buffer[..available])?;
        Ok(buffer)
    }

    /// Read a stream by following the FAT chain
    fn read_stream_from_fat(&mut self, start_sector: u32) -> Result<Vec<u8>, OleError> {
        let mut data = Vec::new();
        let mut sector = start_sector;
        let mut remaining = self.fat.len();

        while sector != ENDOFCHAIN {
            if sector as usize >= self.fat.len() {
                return Err(OleError::CorruptedFile(format!(
                    "Invalid sector index {} in FAT",
                    sector
                )));
            }
            if remaining == 0 {
                return Err(OleError::CorruptedFile("Cyclic FAT chain".to_string()));
            }
            remaining -= 1;

            let sector_data = self.read_sector(sector)?;
            data.extend_from_slice(&sector_data);
            sector = self.fat[sector as usize];
        }

        Ok(data)
    }

    /// Read a stream by following the MiniFAT chain
    fn read_stream_from_minifat(&mut self, start_sector: u32, size: u64) -> Result<Vec<u8>, OleError> {
        let ministream = match self.ministream.take() {
            Some(ministream) => ministream,
            None => {
                let root = self
                    .root()
                    .ok_or_else(|| OleError::CorruptedFile("No root entry".to_string()))?;
                let (start, root_size) = (root.start_sector, root.size);
                let mut data = self.read_stream_from_fat(start)?;
                data.truncate(root_size as usize);
                data
            },
        };

        let result = self.collect_mini_chain(&ministream, start_sector, size);
        self.ministream = Some(ministream);
        result
    }

    fn collect_mini_chain(&self, ministream: &[u8], start_sector: u32, size: u64) -> Result<Vec<u8>, OleError> {
        // The entry size is untrusted; a chain cannot hold more than the MiniFAT maps
        let limit = self.minifat.len() * self.mini_sector_size;
        let mut data = Vec::with_capacity((size as usize).min(limit));
        let mut sector = start_sector;
        let mut remaining = self.minifat.len();

        while sector != ENDOFCHAIN {
            if sector as usize >= self.minifat.len() {
                return Err(OleError::CorruptedFile(format!(
                    "Invalid sector index {} in MiniFAT",
                    sector
                )));
            }
            if remaining == 0 {
                return Err(OleError::CorruptedFile("Cyclic MiniFAT chain".to_string()));
            }
            remaining -= 1;

            let position = (sector as usize) * self.mini_sector_size;
            let chunk = ministream
                .get(position..position + self.mini_sector_size)
                .ok_or_else(|| OleError::CorruptedFile("Mini sector out of bounds".to_string()))?;
            data.extend_from_slice(chunk);

            sector = self.minifat[sector as usize];
        }

        data.truncate(size as usize);
        Ok(data)
    }

    fn root(&self) -> Option<&DirectoryEntry> {
        self.dir_entries.first().and_then(Option::as_ref)
    }

    fn entry(&self, sid: u32) -> Option<&DirectoryEntry> {
        self.dir_entries.get(sid as usize).and_then(Option::as_ref)
    }

    /// List all streams as path components, in directory order
    pub fn list_streams(&self) -> Vec<Vec<String>> {
        self.stream_entries().into_iter().map(|(path, _)| path).collect()
    }

    /// List all storages (excluding the root) as path components
    pub fn list_storages(&self) -> Vec<Vec<String>> {
        let mut storages = Vec::new();
        self.walk(0, &mut Vec::new(), &mut |path: &[String], entry: &DirectoryEntry| {
            if entry.entry_type == STGTY_STORAGE {
                storages.push(path.to_vec());
            }
        });
        storages
    }

    fn stream_entries(&self) -> Vec<(Vec<String>, u32)> {
        let mut streams = Vec::new();
        self.walk(0, &mut Vec::new(), &mut |path: &[String], entry: &DirectoryEntry| {
            if entry.is_stream() {
                streams.push((path.to_vec(), entry.sid));
            }
        });
        streams
    }

    /// Depth-first walk below `sid`, calling `visit` for every descendant
    fn walk<F>(&self, sid: u32, path: &mut Vec<String>, visit: &mut F)
    where
        F: FnMut(&[String], &DirectoryEntry),
    {
        let Some(storage) = self.entry(sid) else {
            return;
        };
        for &child_sid in &storage.children {
            let Some(child) = self.entry(child_sid) else {
                continue;
            };
            path.push(child.name.clone());
            visit(path, child);
            if child.is_storage() {
                self.walk(child_sid, path, visit);
            }
            path.pop();
        }
    }

    /// Iterate over every stream, reading each one only when it is reached
    pub fn streams(&mut self) -> Streams<'_, R> {
        let pending = self.stream_entries().into_iter();
        Streams { ole: self, pending }
    }

    /// Open a stream by path and return its contents
    pub fn open_stream(&mut self, path: &[&str]) -> Result<Vec<u8>, OleError> {
        let entry = self.find_entry(path)?;
        if !entry.is_stream() {
            return Err(OleError::InvalidFormat(format!(
                "{} is not a stream",
                path.join("/")
            )));
        }
        self.read_entry(entry.start_sector, entry.size, entry.is_minifat)
    }

    fn read_entry(&mut self, start_sector: u32, size: u64, is_minifat: bool) -> Result<Vec<u8>, OleError> {
        if size == 0 {
            return Ok(Vec::new());
        }
        if is_minifat {
            self.read_stream_from_minifat(start_sector, size)
        } else {
            let mut data = self.read_stream_from_fat(start_sector)?;
            if (data.len() as u64) < size {
                return Err(OleError::CorruptedFile(format!(
                    "Stream chain holds {} bytes but the directory records {}",
                    data.len(),
                    size
                )));
            }
            data.truncate(size as usize);
            Ok(data)
        }
    }

    /// Find a directory entry by path (names compare case-insensitively)
    fn find_entry(&self, path: &[&str]) -> Result<DirectoryEntry, OleError> {
        let mut current = self
            .root()
            .ok_or_else(|| OleError::CorruptedFile("No root entry".to_string()))?;

        for &name in path {
            current = current
                .children
                .iter()
                .filter_map(|&sid| self.entry(sid))
                .find(|child| child.name.to_lowercase() == name.to_lowercase())
                .ok_or_else(|| OleError::StreamNotFound(path.join("/")))?;
        }

        Ok(current.clone())
    }

    /// Check if a stream or storage exists
    pub fn exists(&self, path: &[&str]) -> bool {
        self.find_entry(path).is_ok()
    }
}

/// Lazy iterator over `(path, bytes)` pairs returned by [`OleFile::streams`]
pub struct Streams<'a, R: Read + Seek> {
    ole: &'a mut OleFile<R>,
    pending: std::vec::IntoIter<(Vec<String>, u32)>,
}

impl<R: Read + Seek> Iterator for Streams<'_, R> {
    type Item = Result<(Vec<String>, Vec<u8>), OleError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (path, sid) = self.pending.next()?;
        let Some(entry) = self.ole.entry(sid) else {
            return Some(Err(OleError::StreamNotFound(path.join("/"))));
        };
        let (start, size, is_minifat) = (entry.start_sector, entry.size, entry.is_minifat);
        Some(self.ole.read_entry(start, size, is_minifat).map(|data| (path, data)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.pending.size_hint()
    }
}

fn read_u32_table(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| U32::<LE>::read_from_bytes(chunk).map(|v| v.get()).unwrap_or(FREESECT))
        .collect()
}

fn dir_u32(dir_data: &[u8], sid: u32, field_offset: usize) -> u32 {
    let offset = sid as usize * DIRENTRY_SIZE + field_offset;
    dir_data
        .get(offset..offset + 4)
        .and_then(|bytes| U32::<LE>::read_from_bytes(bytes).ok())
        .map(|v| v.get())
        .unwrap_or(NOSTREAM)
}

fn left_sid_of(dir_data: &[u8], sid: u32) -> u32 {
    dir_u32(dir_data, sid, 68)
}

fn right_sid_of(dir_data: &[u8], sid: u32) -> u32 {
    dir_u32(dir_data, sid, 72)
}

fn child_sid_of(dir_data: &[u8], sid: u32) -> u32 {
    dir_u32(dir_data, sid, 76)
}

/// Decode a UTF-16LE entry name
fn decode_entry_name(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| U16::<LE>::read_from_bytes(chunk).map(|v| v.get()).unwrap_or(0))
        .collect();

    String::from_utf16_lossy(&units).trim_end_matches('\0').to_string()
}

/// Check if a buffer is a compound file by its magic bytes
pub fn is_ole_file(data: &[u8]) -> bool {
    data.len() >= MINIMAL_OLEFILE_SIZE && &data[0..8] == MAGIC
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::OleWriter;
    use std::io::Cursor;

    fn sample_file() -> Vec<u8> {
        let mut writer = OleWriter::new();
        writer.create_stream(&["FileHeader"], &[0x11; 256]).unwrap();
        writer.create_stream(&["BodyText", "Section0"], &[0x22; 5000]).unwrap();
        writer.create_stream(&["BodyText", "Section1"], b"short").unwrap();
        let mut buffer = Cursor::new(Vec::new());
        writer.write_to(&mut buffer).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_rejects_missing_signature() {
        let mut data = sample_file();
        data[0] = 0x00;
        let result = OleFile::open(Cursor::new(data));
        assert!(matches!(result, Err(OleError::NotOleFile)));
    }

    #[test]
    fn test_rejects_short_input() {
        let result = OleFile::open(Cursor::new(MAGIC.to_vec()));
        assert!(matches!(result, Err(OleError::NotOleFile)));
    }

    #[test]
    fn test_rejects_bad_byte_order() {
        let mut data = sample_file();
        data[28] = 0x00;
        let result = OleFile::open(Cursor::new(data));
        assert!(matches!(result, Err(OleError::InvalidFormat(_))));
    }

    #[test]
    fn test_lists_nested_streams() {
        let ole = OleFile::open(Cursor::new(sample_file())).unwrap();
        let streams = ole.list_streams();
        assert!(streams.contains(&vec!["FileHeader".to_string()]));
        assert!(streams.contains(&vec!["BodyText".to_string(), "Section0".to_string()]));
        assert!(streams.contains(&vec!["BodyText".to_string(), "Section1".to_string()]));
        assert_eq!(ole.list_storages(), vec![vec!["BodyText".to_string()]]);
    }

    #[test]
    fn test_lazy_stream_iteration() {
        let mut ole = OleFile::open(Cursor::new(sample_file())).unwrap();
        let collected: Vec<_> = ole.streams().collect::<Result<_, _>>().unwrap();
        assert_eq!(collected.len(), 3);
        let section0 = collected
            .iter()
            .find(|(path, _)| path.join("/") == "BodyText/Section0")
            .unwrap();
        assert_eq!(section0.1.len(), 5000);
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let mut ole = OleFile::open(Cursor::new(sample_file())).unwrap();
        assert_eq!(ole.open_stream(&["bodytext", "section1"]).unwrap(), b"short");
        assert!(ole.exists(&["BODYTEXT"]));
        assert!(matches!(
            ole.open_stream(&["BodyText", "Section9"]),
            Err(OleError::StreamNotFound(_))
        ));
    }

    #[test]
    fn test_cyclic_fat_chain_is_reported() {
        let mut data = sample_file();
        // First FAT sector id from the header, then point sector 0 at itself
        let fat_sector = u32::from_le_bytes(data[76..80].try_into().unwrap()) as usize;
        let fat_offset = (fat_sector + 1) * 512;
        data[fat_offset..fat_offset + 4].copy_from_slice(&0u32.to_le_bytes());

        let opened = OleFile::open(Cursor::new(data));
        let failed = match opened {
            Err(OleError::CorruptedFile(_)) => true,
            Ok(mut ole) => ole
                .streams()
                .any(|item| matches!(item, Err(OleError::CorruptedFile(_)))),
            Err(_) => false,
        };
        assert!(failed);
    }

    #[test]
    fn test_truncated_file_is_corrupted() {
        let data = sample_file();
        let truncated = data[..data.len() / 2].to_vec();
        let result = OleFile::open(Cursor::new(truncated));
        assert!(matches!(result, Err(OleError::CorruptedFile(_))));
    }

    #[test]
    fn test_chain_past_end_of_file_is_corrupted() {
        let mut data = sample_file();
        // Point the first link of Section0's chain at a sector past the end
        let fat_sector = u32::from_le_bytes(data[76..80].try_into().unwrap()) as usize;
        let fat_offset = (fat_sector + 1) * 512;
        let beyond = (data.len() / 512 + 4) as u32;
        data[fat_offset..fat_offset + 4].copy_from_slice(&beyond.to_le_bytes());

        let mut ole = OleFile::open(Cursor::new(data)).unwrap();
        let result = ole.open_stream(&["BodyText", "Section0"]);
        assert!(matches!(result, Err(OleError::CorruptedFile(_))));
    }

    #[test]
    fn test_oversized_mini_stream_entry_is_bounded() {
        let mut data = sample_file();
        data[56..60].copy_from_slice(&u32::MAX.to_le_bytes());

        let name: Vec<u8> = "Section1".encode_utf16().flat_map(u16::to_le_bytes).collect();
        let entry = data
            .windows(name.len())
            .position(|window| window == name.as_slice())
            .unwrap();
        data[entry + 120..entry + 124].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());

        let mut ole = OleFile::open(Cursor::new(data)).unwrap();
        let stream = ole.open_stream(&["BodyText", "Section1"]).unwrap();
        assert!(stream.len() <= MINI_SECTOR_SIZE);
        assert!(stream.starts_with(b"short"));
    }

    #[test]
    fn test_is_ole_file() {
        assert!(is_ole_file(&sample_file()));
        assert!(!is_ole_file(b"HWP Document File"));
    }
}
