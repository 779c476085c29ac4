use std::convert::TryFrom;

use crate::error::{Error, Result};
use crate::itsp::Itsp;
use crate::reader::ByteReader;
use crate::unit::Unit;

const PMGL_SIGNATURE: &[u8; 4] = b"PMGL";
const PMGI_SIGNATURE: &[u8; 4] = b"PMGI";

/// One parsed directory listing (PMGL) chunk: its units plus the index of
/// the next chunk in the PMGL chain, if any.
struct PmglBlock {
    units: Vec<Unit>,
    next: Option<u32>,
}

/// One parsed directory index (PMGI) chunk: boundary `(name, child_block)`
/// pairs, sorted ascending by name.
struct PmgiBlock {
    entries: Vec<(String, u32)>,
}

enum Block {
    Leaf(PmglBlock),
    Index(PmgiBlock),
}

/// The directory index (spec.md §3 "Directory block", §4.C): every PMGL/PMGI
/// chunk decoded up front, plus the `Itsp` metadata describing how to walk
/// them.
pub struct Directory {
    blocks: Vec<Block>,
    first_pmgl_block: u32,
    index_root: Option<u32>,
}

impl Directory {
    /// Parses every chunk in the directory. `dir_offset` is `itsf.dir_offset`
    /// (the absolute offset of the ITSP header); chunks follow immediately
    /// after it.
    pub fn parse(data: &[u8], dir_offset: u64, itsp: &Itsp) -> Result<Directory> {
        let chunks_base = dir_offset + u64::from(itsp.length);
        let mut blocks = Vec::with_capacity(itsp.num_blocks as usize);
        for i in 0..itsp.num_blocks {
            let block_offset = chunks_base + u64::from(i) * u64::from(itsp.dir_block_length);
            let start = usize::try_from(block_offset).map_err(|_| Error::OutOfRange)?;
            let end = start
                .checked_add(itsp.dir_block_length as usize)
                .ok_or(Error::OutOfRange)?;
            if end > data.len() {
                return Err(Error::Truncated);
            }
            let chunk = &data[start..end];
            blocks.push(parse_block(chunk)?);
        }
        Ok(Directory {
            blocks,
            first_pmgl_block: itsp.first_pmgl_block,
            index_root: itsp.index_root,
        })
    }

    /// Every unit in the archive, in on-disk order (spec.md §4.C
    /// `enumerate`).
    pub fn enumerate(&self) -> Vec<Unit> {
        let mut out = Vec::new();
        let mut cur = Some(self.first_pmgl_block);
        while let Some(idx) = cur {
            let leaf = match self.blocks.get(idx as usize) {
                Some(Block::Leaf(l)) => l,
                _ => break,
            };
            out.extend(leaf.units.iter().cloned());
            cur = leaf.next;
        }
        out
    }

    /// Every non-internal unit (spec.md §4.C `content_files`): excludes `/`,
    /// `/#...`, and `/$...` entries.
    pub fn content_files(&self) -> Vec<Unit> {
        self.enumerate()
            .into_iter()
            .filter(|u| !u.is_internal())
            .collect()
    }

    /// Resolves an exact unit name, descending through the PMGI index when
    /// present (`index_depth == 2`) before scanning the leaf chunk it
    /// selects.
    pub fn resolve(&self, name: &str) -> Option<Unit> {
        let key = name_key(name);
        let leaf_idx = match self.index_root {
            Some(root) => self.descend_to_leaf(root, &key)?,
            None => self.first_pmgl_block,
        };
        let leaf = match self.blocks.get(leaf_idx as usize)? {
            Block::Leaf(l) => l,
            Block::Index(_) => return None,
        };
        leaf.units
            .iter()
            .find(|u| name_key(&u.name) == key)
            .cloned()
    }

    /// Walks the PMGI tree from `root`, choosing at each level the child
    /// whose boundary name is the greatest one `<= name` (spec.md §4.C /
    /// original_source's `("/", 0)`, `("/infobar.jpg", 1)` tie-break
    /// example), until a PMGL leaf index is reached. `key` is already
    /// normalized via [`name_key`].
    fn descend_to_leaf(&self, root: u32, key: &str) -> Option<u32> {
        let mut cur = root;
        loop {
            match self.blocks.get(cur as usize)? {
                Block::Leaf(_) => return Some(cur),
                Block::Index(idx) => {
                    cur = choose_child(&idx.entries, key)?;
                }
            }
        }
    }
}

/// Normalizes a unit name for comparison (spec.md §9 "Name comparison"):
/// ASCII letters are lowercased, bytes `>= 0x80` are left as-is (no Unicode
/// case folding), and a missing leading `/` is added so `resolve` accepts
/// names with or without one.
fn name_key(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    if lower.starts_with('/') {
        lower
    } else {
        format!("/{}", lower)
    }
}

fn choose_child(entries: &[(String, u32)], target_key: &str) -> Option<u32> {
    let mut best = entries.first()?.1;
    for (name, block) in entries {
        if name_key(name).as_str() <= target_key {
            best = *block;
        } else {
            break;
        }
    }
    Some(best)
}

fn parse_block(chunk: &[u8]) -> Result<Block> {
    if chunk.len() >= 4 && &chunk[0..4] == PMGL_SIGNATURE {
        Ok(Block::Leaf(parse_pmgl(chunk)?))
    } else if chunk.len() >= 4 && &chunk[0..4] == PMGI_SIGNATURE {
        Ok(Block::Index(parse_pmgi(chunk)?))
    } else {
        Err(Error::Format(format!(
            "directory chunk has neither PMGL nor PMGI signature: {:?}",
            chunk.get(0..4)
        )))
    }
}

fn entry_count(chunk: &[u8]) -> Result<u16> {
    if chunk.len() < 2 {
        return Err(Error::Truncated);
    }
    let tail = &chunk[chunk.len() - 2..];
    Ok(u16::from_le_bytes([tail[0], tail[1]]))
}

fn read_name(r: &mut ByteReader) -> Result<String> {
    let len = r.read_encint()? as usize;
    let bytes = r.read_exact(len)?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

fn parse_pmgl(chunk: &[u8]) -> Result<PmglBlock> {
    let mut r = ByteReader::new(chunk);
    let sig = r.read_exact(4)?;
    debug_assert_eq!(sig, PMGL_SIGNATURE);
    let _free_space = r.read_u32_le()?;
    let _unknown = r.read_u32_le()?;
    let prev = r.read_i32_le()?;
    let next = r.read_i32_le()?;
    let _ = prev;

    let count = entry_count(chunk)?;
    let mut units = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = read_name(&mut r)?;
        let section = r.read_encint()?;
        if section > u32::MAX as u64 {
            return Err(Error::Corrupt("unit section out of range".into()));
        }
        let offset = r.read_encint()?;
        let length = r.read_encint()?;
        units.push(Unit {
            name,
            section: section as u32,
            offset,
            length,
        });
    }

    Ok(PmglBlock {
        units,
        next: if next < 0 { None } else { Some(next as u32) },
    })
}

fn parse_pmgi(chunk: &[u8]) -> Result<PmgiBlock> {
    let mut r = ByteReader::new(chunk);
    let sig = r.read_exact(4)?;
    debug_assert_eq!(sig, PMGI_SIGNATURE);
    let _free_space = r.read_u32_le()?;

    let count = entry_count(chunk)?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = read_name(&mut r)?;
        let block = r.read_encint()?;
        if block > u32::MAX as u64 {
            return Err(Error::Corrupt("PMGI child block number out of range".into()));
        }
        entries.push((name, block as u32));
    }
    Ok(PmgiBlock { entries })
}
