//! The top-level compilation unit: every function the frontend produced,
//! the contract's data sections, named constants, and the shared memory
//! allocator they all place locations through.

use crate::entity::PrimaryMap;
use crate::ir::memloc::MemLocKind;
use crate::ir::{FuncId, Function, Label, MemLocId, Word};
use crate::memalloc::MemAllocator;

#[derive(Clone, Debug)]
pub struct DataSection {
    pub name: Label,
    pub items: Vec<DataItem>,
}

#[derive(Clone, Debug)]
pub enum DataItem {
    Bytes(Vec<u8>),
    /// A reference to another label (e.g. a function's runtime offset),
    /// resolved by the assembler once final code layout is known.
    LabelRef(Label),
}

/// Constructor/runtime split information the frontend hands over when the
/// unit being compiled is a deploy transaction rather than a bare runtime
/// blob.
#[derive(Clone, Debug)]
pub struct DeployInfo {
    pub data_sections: Vec<(Label, Vec<DataItem>)>,
}

#[derive(Clone, Debug)]
pub struct Context {
    functions: PrimaryMap<FuncId, Function>,
    entry_function: Option<FuncId>,
    pub data_sections: Vec<DataSection>,
    pub constants: Vec<(String, Word)>,
    pub mem_allocator: MemAllocator,
    /// The abstract location of the deploy-code region, if this context
    /// represents a deploy transaction.
    pub deploy_mem: Option<MemLocId>,
    pub free_var1: MemLocId,
    pub free_var2: MemLocId,
    mem_locs: PrimaryMap<MemLocId, MemLocKind>,
}

impl Context {
    pub fn new() -> Self {
        let mut mem_locs = PrimaryMap::new();
        let free_var1 = mem_locs.push(MemLocKind::FreeVar1);
        let free_var2 = mem_locs.push(MemLocKind::FreeVar2);
        Context {
            functions: PrimaryMap::new(),
            entry_function: None,
            data_sections: Vec::new(),
            constants: Vec::new(),
            mem_allocator: MemAllocator::new(),
            deploy_mem: None,
            free_var1,
            free_var2,
            mem_locs,
        }
    }

    pub fn add_function(&mut self, function: Function) -> FuncId {
        let is_entry = function.is_entry;
        let id = self.functions.push(function);
        if is_entry {
            self.entry_function = Some(id);
        }
        id
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id]
    }

    pub fn function_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.functions[id]
    }

    pub fn functions(&self) -> impl Iterator<Item = (FuncId, &Function)> {
        self.functions.iter()
    }

    pub fn functions_mut(&mut self) -> impl Iterator<Item = (FuncId, &mut Function)> {
        self.functions.iter_mut()
    }

    pub fn function_ids(&self) -> impl Iterator<Item = FuncId> + '_ {
        self.functions.keys()
    }

    pub fn entry_function(&self) -> Option<FuncId> {
        self.entry_function
    }

    pub fn set_entry_function(&mut self, id: FuncId) {
        self.functions[id].is_entry = true;
        self.entry_function = Some(id);
    }

    /// A function and the shared memory allocator, borrowed disjointly.
    /// Needed by passes like [`crate::passes::concretize_memloc`] that place
    /// one function's abstract locations against the [`Context`]-wide
    /// allocator without wanting the rest of [`Context`] borrowed mutably.
    pub fn function_and_allocator_mut(&mut self, id: FuncId) -> (&mut Function, &mut MemAllocator) {
        (&mut self.functions[id], &mut self.mem_allocator)
    }

    pub fn function_by_name(&self, name: &Label) -> Option<FuncId> {
        self.functions.iter().find(|(_, f)| &f.name == name).map(|(id, _)| id)
    }

    pub fn append_data_section(&mut self, name: Label) {
        self.data_sections.push(DataSection { name, items: Vec::new() });
    }

    pub fn append_data_item(&mut self, item: DataItem) {
        self.data_sections
            .last_mut()
            .expect("append_data_item called with no open data section")
            .items
            .push(item);
    }

    pub fn add_constant(&mut self, name: impl Into<String>, value: Word) {
        self.constants.push((name.into(), value));
    }

    pub fn new_mem_loc(&mut self, kind: MemLocKind) -> MemLocId {
        self.mem_locs.push(kind)
    }

    pub fn mem_loc_kind(&self, id: MemLocId) -> MemLocKind {
        self.mem_locs[id]
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}
