//! Directory tree generation
//!
//! Entries of each storage are sorted the way Office sorts them (shorter
//! names first, then case-insensitive by name) and linked into a binary
//! search tree rooted at the midpoint: earlier entries hang off the left,
//! later entries off the right.

use super::super::consts::*;
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct DirectoryEntryBuilder {
    pub name: String,
    pub entry_type: u8,
    pub start_sector: u32,
    pub size: u64,
    pub sid_left: u32,
    pub sid_right: u32,
    pub sid_child: u32,
    pub clsid: [u8; 16],
}

impl DirectoryEntryBuilder {
    fn new(name: String, entry_type: u8, start_sector: u32, size: u64) -> Self {
        Self {
            name,
            entry_type,
            start_sector,
            size,
            sid_left: NOSTREAM,
            sid_right: NOSTREAM,
            sid_child: NOSTREAM,
            clsid: [0; 16],
        }
    }

    pub fn root(start_sector: u32, size: u64) -> Self {
        Self::new("Root Entry".to_string(), STGTY_ROOT, start_sector, size)
    }

    pub fn stream(name: String, start_sector: u32, size: u64) -> Self {
        Self::new(name, STGTY_STREAM, start_sector, size)
    }

    pub fn storage(name: String) -> Self {
        Self::new(name, STGTY_STORAGE, 0, 0)
    }

    /// Serialize to the 128-byte on-disk layout
    pub fn to_bytes(&self) -> [u8; DIRENTRY_SIZE] {
        let mut data = [0u8; DIRENTRY_SIZE];

        // Name: at most 31 UTF-16 units plus the terminator
        let utf16: Vec<u16> = self.name.encode_utf16().take(31).collect();
        for (i, unit) in utf16.iter().enumerate() {
            data[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        }
        let name_len_bytes = ((utf16.len() + 1) * 2) as u16;
        data[64..66].copy_from_slice(&name_len_bytes.to_le_bytes());

        data[66] = self.entry_type;
        // Every node black
        data[67] = 1;
        data[68..72].copy_from_slice(&self.sid_left.to_le_bytes());
        data[72..76].copy_from_slice(&self.sid_right.to_le_bytes());
        data[76..80].copy_from_slice(&self.sid_child.to_le_bytes());
        data[80..96].copy_from_slice(&self.clsid);
        // State bits and timestamps stay zero
        data[116..120].copy_from_slice(&self.start_sector.to_le_bytes());
        data[120..128].copy_from_slice(&self.size.to_le_bytes());

        data
    }
}

/// Builds the directory stream; an entry's index is its SID
pub struct DirectoryBuilder {
    entries: Vec<DirectoryEntryBuilder>,
    /// Storage path -> SID, the root being the empty path
    path_to_sid: HashMap<Vec<String>, u32>,
    children: HashMap<u32, Vec<u32>>,
}

impl DirectoryBuilder {
    pub fn new(ministream_start: u32, ministream_size: u64) -> Self {
        Self {
            entries: vec![DirectoryEntryBuilder::root(ministream_start, ministream_size)],
            path_to_sid: HashMap::from([(Vec::new(), 0)]),
            children: HashMap::from([(0, Vec::new())]),
        }
    }

    pub fn set_root_clsid(&mut self, clsid: [u8; 16]) {
        self.entries[0].clsid = clsid;
    }

    /// Ensure every storage along `path` exists and return the SID of the last
    pub fn add_storage_path(&mut self, path: &[String]) -> u32 {
        let mut parent_sid = 0u32;

        for depth in 1..=path.len() {
            let current_path = &path[..depth];
            if let Some(&sid) = self.path_to_sid.get(current_path) {
                parent_sid = sid;
                continue;
            }

            let sid = self.entries.len() as u32;
            self.entries
                .push(DirectoryEntryBuilder::storage(path[depth - 1].clone()));
            self.path_to_sid.insert(current_path.to_vec(), sid);
            self.children.entry(parent_sid).or_default().push(sid);
            self.children.entry(sid).or_default();
            parent_sid = sid;
        }

        parent_sid
    }

    /// Add a stream; missing parent storages are created
    pub fn add_stream_path(&mut self, full_path: &[String], start_sector: u32, size: u64) -> u32 {
        let Some((name, parents)) = full_path.split_last() else {
            return NOSTREAM;
        };
        let parent_sid = self.add_storage_path(parents);

        let sid = self.entries.len() as u32;
        self.entries
            .push(DirectoryEntryBuilder::stream(name.clone(), start_sector, size));
        self.children.entry(parent_sid).or_default().push(sid);
        sid
    }

    /// Link every storage's children and serialize all entries in SID order
    pub fn generate_directory_stream(&mut self) -> Vec<u8> {
        for (&parent_sid, child_sids) in &self.children {
            link_children(parent_sid, child_sids, &mut self.entries);
        }

        let mut data = Vec::with_capacity(self.entries.len() * DIRENTRY_SIZE);
        for entry in &self.entries {
            data.extend_from_slice(&entry.to_bytes());
        }
        data
    }

    #[cfg(test)]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

fn compare_names(name1: &str, name2: &str) -> Ordering {
    let len1 = name1.encode_utf16().count();
    let len2 = name2.encode_utf16().count();
    len1.cmp(&len2)
        .then_with(|| name1.to_uppercase().cmp(&name2.to_uppercase()))
}

fn link_children(parent_sid: u32, child_sids: &[u32], entries: &mut [DirectoryEntryBuilder]) {
    if child_sids.is_empty() {
        entries[parent_sid as usize].sid_child = NOSTREAM;
        return;
    }

    let mut sorted = child_sids.to_vec();
    sorted.sort_by(|&a, &b| compare_names(&entries[a as usize].name, &entries[b as usize].name));

    let midpoint = sorted.len() / 2;
    entries[parent_sid as usize].sid_child = sorted[midpoint];

    for (i, &sid) in sorted.iter().enumerate() {
        let entry = &mut entries[sid as usize];
        entry.sid_left = NOSTREAM;
        entry.sid_right = NOSTREAM;
        // Left of the midpoint each entry points down to its predecessor,
        // right of it each entry points down to its successor
        if i <= midpoint && i > 0 {
            entry.sid_left = sorted[i - 1];
        }
        if i >= midpoint && i + 1 < sorted.len() {
            entry.sid_right = sorted[i + 1];
        }
    }
}
