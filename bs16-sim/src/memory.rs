use std::collections::BTreeMap;

/// Sparse 64K-word main memory. Cells never written read as zero.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Memory {
    cells: BTreeMap<u16, u16>
}
impl Memory {
    pub fn new() -> Self {
        Memory {
            cells: BTreeMap::new()
        }
    }

    pub fn read(&self, address: u16) -> u16 {
        self.cells.get(&address).copied().unwrap_or(0)
    }

    pub fn write(&mut self, address: u16, value: u16) {
        self.cells.insert(address, value);
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Replaces the whole contents of the memory.
    pub fn load<I>(&mut self, cells: I)
    where
        I: IntoIterator<Item = (u16, u16)>
    {
        self.cells = cells.into_iter().collect();
    }

    pub fn cells(&self) -> &BTreeMap<u16, u16> {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
