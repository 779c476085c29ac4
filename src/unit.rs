/// A directory entry: the name, storage section, and location of one unit
/// inside the archive (spec.md §3 "Unit descriptor").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub name: String,
    /// 0 = uncompressed ("Uncompressed"), 1 = compressed
    /// ("MSCompressed"). Any other value is rejected when the entry is
    /// parsed, since the format only ever defines these two sections.
    pub section: u32,
    /// Offset of this unit's data within its section, not the file.
    pub offset: u64,
    pub length: u64,
}

impl Unit {
    pub fn is_compressed(&self) -> bool {
        self.section == 1
    }

    /// Internal metadata units (`/`, `/#...`, `/$...`) that `content_files`
    /// excludes (spec.md §4.C).
    pub fn is_internal(&self) -> bool {
        self.name == "/" || self.name.starts_with("/#") || self.name.starts_with("/$")
    }
}
