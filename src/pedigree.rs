use crate::encoding::{self, EncodingChoice};
use crate::error::Result;
use std::collections::HashMap;
use std::path::Path;

/// Parent id used by PED files for an unknown father or mother
pub const UNKNOWN_PARENT: &str = "0";

/// One record of a PED file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PedigreeEntry {
    pub family_id: String,
    pub sample_id: String,
    pub father_id: String,
    pub mother_id: String,
    pub sex: String,
    pub phenotype: String,
}

impl PedigreeEntry {
    /// Parse a PED line. Comment lines and lines with fewer than six
    /// whitespace-separated fields yield `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        if line.starts_with('#') {
            return None;
        }
        let mut fields = line.split_whitespace();
        let mut next = || fields.next().map(str::to_string);
        Some(PedigreeEntry {
            family_id: next()?,
            sample_id: next()?,
            father_id: next()?,
            mother_id: next()?,
            sex: next()?,
            phenotype: next()?,
        })
    }
}

/// Proband and parents of a family, taken from its first PED record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trio {
    pub proband: String,
    pub father: Option<String>,
    pub mother: Option<String>,
}

impl Trio {
    fn from_entry(entry: &PedigreeEntry) -> Self {
        Trio {
            proband: entry.sample_id.clone(),
            father: known_parent(&entry.father_id),
            mother: known_parent(&entry.mother_id),
        }
    }
}

fn known_parent(id: &str) -> Option<String> {
    if id == UNKNOWN_PARENT {
        None
    } else {
        Some(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Family {
    id: String,
    /// Sample, father and mother ids of every record, in file order.
    /// Unknown-parent sentinels and duplicates are kept as-is.
    members: Vec<String>,
    trio: Trio,
}

impl Family {
    fn new(entry: &PedigreeEntry) -> Self {
        Self {
            id: entry.family_id.clone(),
            members: Vec::new(),
            trio: Trio::from_entry(entry),
        }
    }

    fn push(&mut self, entry: PedigreeEntry) {
        self.members.push(entry.sample_id);
        self.members.push(entry.father_id);
        self.members.push(entry.mother_id);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn trio(&self) -> &Trio {
        &self.trio
    }
}

/// Families of a PED file, in order of first appearance
#[derive(Debug, Clone, Default)]
pub struct Pedigree {
    families: Vec<Family>,
    index: HashMap<String, usize>,
}

impl Pedigree {
    /// Load a PED file, decoding it according to `encoding`
    pub fn load<P: AsRef<Path>>(path: P, encoding: EncodingChoice) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading pedigree from {}", path.display());

        let (text, _) = encoding::read_text_file(path, encoding)?;
        let pedigree = Self::parse(&text);

        log::info!("Loaded {} families from PED file", pedigree.n_families());
        Ok(pedigree)
    }

    /// Parse decoded PED text
    pub fn parse(text: &str) -> Self {
        let mut pedigree = Pedigree::default();
        for (line_num, line) in text.lines().enumerate() {
            match PedigreeEntry::parse_line(line) {
                Some(entry) => pedigree.add(entry),
                None => log::trace!("Skipping PED line {}", line_num + 1),
            }
        }
        pedigree
    }

    fn add(&mut self, entry: PedigreeEntry) {
        let idx = match self.index.get(&entry.family_id).copied() {
            Some(idx) => idx,
            None => {
                self.families.push(Family::new(&entry));
                let idx = self.families.len() - 1;
                self.index.insert(entry.family_id.clone(), idx);
                idx
            }
        };
        self.families[idx].push(entry);
    }

    pub fn families(&self) -> &[Family] {
        &self.families
    }

    pub fn family(&self, id: &str) -> Option<&Family> {
        self.index.get(id).map(|&idx| &self.families[idx])
    }

    pub fn n_families(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}
