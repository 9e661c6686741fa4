#![allow(dead_code)]

use frpc_printers::{LayoutConfig, MemoryImage};
use memory_reader::Pointer;

const HEAP_BASE: usize = 0x10_0000;
const VTABLE_BASE: usize = 0x40_0000;
const DTOR_BASE: usize = 0x50_0000;

const CLASSES: [&str; 10] = [
    "Int_t",
    "String_t",
    "Bool_t",
    "Double_t",
    "Binary_t",
    "DateTime_t",
    "Null_t",
    "Struct_t",
    "Array_t",
    "Pool_t",
];

pub const LIBRARY: &str = "/usr/lib/libfastrpc.so.8";

/// Lays out FastRPC values in memory the way libstdc++ and the FRPC
/// library would, for use as a `MemoryImage`.
pub struct FrpcBuilder {
    heap: Vec<u8>,
    layout: LayoutConfig,
    heap_objfile: Option<String>,
    vtable_symbols: bool,
    dtor_symbols: bool,
}

impl FrpcBuilder {
    pub fn new() -> Self {
        Self {
            heap: Vec::new(),
            layout: LayoutConfig::default(),
            heap_objfile: None,
            vtable_symbols: true,
            dtor_symbols: false,
        }
    }

    /// Report the heap as belonging to the given object file.
    pub fn heap_objfile(mut self, objfile: &str) -> Self {
        self.heap_objfile = Some(objfile.to_string());
        self
    }

    /// Name only the destructors, as in a binary whose vtable symbols
    /// were stripped.
    pub fn destructor_symbols_only(mut self) -> Self {
        self.vtable_symbols = false;
        self.dtor_symbols = true;
        self
    }

    pub fn alloc(&mut self, size: usize) -> Pointer {
        let offset = self.heap.len().next_multiple_of(16);
        self.heap.resize(offset + size.max(1), 0);
        Pointer::new(HEAP_BASE + offset)
    }

    pub fn write_bytes(&mut self, ptr: Pointer, bytes: &[u8]) {
        let offset = ptr.as_usize() - HEAP_BASE;
        self.heap[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn write_usize(&mut self, ptr: Pointer, value: usize) {
        self.write_bytes(ptr, &value.to_le_bytes());
    }

    pub fn write_ptr(&mut self, ptr: Pointer, value: Pointer) {
        self.write_usize(ptr, value.as_usize());
    }

    pub fn read_ptr(&self, ptr: Pointer) -> Pointer {
        let offset = ptr.as_usize() - HEAP_BASE;
        let bytes: [u8; 8] = self.heap[offset..offset + 8].try_into().unwrap();
        Pointer::new(usize::from_le_bytes(bytes))
    }

    fn class_index(class: &str) -> usize {
        CLASSES
            .iter()
            .position(|name| *name == class)
            .unwrap_or_else(|| panic!("Unknown class {class}"))
    }

    /// The address stored in an object's vptr, two slots into the
    /// vtable object as in the Itanium ABI.
    pub fn vptr(class: &str) -> Pointer {
        Pointer::new(VTABLE_BASE + Self::class_index(class) * 0x40 + 16)
    }

    pub fn write_std_string(&mut self, at: Pointer, value: &[u8]) {
        let string = self.layout.string.clone();
        let data = if value.len() < 16 {
            at + 16
        } else {
            self.alloc(value.len() + 1)
        };
        self.write_ptr(at + string.data_ptr, data);
        self.write_usize(at + string.length, value.len());
        self.write_bytes(data, value);
    }

    fn object(&mut self, class: &str, size: usize) -> Pointer {
        let ptr = self.alloc(size);
        let vptr_offset = self.layout.frpc.vptr;
        self.write_ptr(ptr + vptr_offset, Self::vptr(class));
        ptr
    }

    pub fn int(&mut self, value: i64) -> Pointer {
        let ptr = self.object("Int_t", 16);
        self.write_bytes(ptr + self.layout.frpc.primitive_value, &value.to_le_bytes());
        ptr
    }

    pub fn boolean(&mut self, value: bool) -> Pointer {
        let ptr = self.object("Bool_t", 16);
        self.write_bytes(ptr + self.layout.frpc.primitive_value, &[value as u8]);
        ptr
    }

    pub fn double(&mut self, value: f64) -> Pointer {
        let ptr = self.object("Double_t", 16);
        self.write_bytes(ptr + self.layout.frpc.primitive_value, &value.to_le_bytes());
        ptr
    }

    pub fn string(&mut self, value: &str) -> Pointer {
        let ptr = self.object("String_t", 40);
        self.write_std_string(ptr + self.layout.frpc.primitive_value, value.as_bytes());
        ptr
    }

    pub fn binary(&mut self, value: &[u8]) -> Pointer {
        let ptr = self.object("Binary_t", 40);
        self.write_std_string(ptr + self.layout.frpc.primitive_value, value);
        ptr
    }

    pub fn null(&mut self) -> Pointer {
        self.object("Null_t", 8)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn datetime(
        &mut self,
        year: i16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        sec: u8,
        time_zone: i8,
    ) -> Pointer {
        let ptr = self.object("DateTime_t", 32);
        let layout = self.layout.frpc.datetime.clone();
        self.write_bytes(ptr + layout.year, &year.to_le_bytes());
        self.write_bytes(ptr + layout.month, &[month]);
        self.write_bytes(ptr + layout.day, &[day]);
        self.write_bytes(ptr + layout.hour, &[hour]);
        self.write_bytes(ptr + layout.minute, &[minute]);
        self.write_bytes(ptr + layout.sec, &[sec]);
        self.write_bytes(ptr + layout.time_zone, &time_zone.to_le_bytes());
        ptr
    }

    fn write_vector(&mut self, at: Pointer, elements: &[Pointer], capacity: usize) {
        let vector = self.layout.vector.clone();
        if capacity == 0 {
            return;
        }
        let storage = self.alloc(capacity * 8);
        for (i, element) in elements.iter().enumerate() {
            self.write_ptr(storage + i * 8, *element);
        }
        self.write_ptr(at + vector.start, storage);
        self.write_ptr(at + vector.finish, storage + elements.len() * 8);
        self.write_ptr(at + vector.end_of_storage, storage + capacity * 8);
    }

    pub fn array(&mut self, elements: &[Pointer]) -> Pointer {
        self.array_with_capacity(elements, elements.len().next_power_of_two())
    }

    pub fn array_with_capacity(&mut self, elements: &[Pointer], capacity: usize) -> Pointer {
        let ptr = self.object("Array_t", 32);
        let at = ptr + self.layout.frpc.array_data;
        self.write_vector(at, elements, capacity);
        ptr
    }

    pub fn pool(&mut self, elements: &[Pointer]) -> Pointer {
        let ptr = self.object("Pool_t", 32);
        let at = ptr + self.layout.frpc.pool_storage;
        self.write_vector(at, elements, elements.len());
        ptr
    }

    /// A `Struct_t` whose map holds `entries`.  Entries are stored in
    /// key order regardless of the order given, as `std::map` would.
    pub fn structure(&mut self, entries: &[(&str, Pointer)]) -> Pointer {
        let mut entries = entries.to_vec();
        entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
        entries.dedup_by(|a, b| a.0 == b.0);

        let ptr = self.object("Struct_t", 56);
        let tree = self.layout.rb_tree.clone();
        let tree_location = ptr + self.layout.frpc.struct_data;
        let header = tree_location + tree.header;

        let nodes: Vec<Pointer> = entries
            .iter()
            .map(|(key, value)| {
                let node = self.alloc(tree.value + 40);
                let pair = node + tree.value;
                let frpc = self.layout.frpc.clone();
                self.write_std_string(pair + frpc.pair_first, key.as_bytes());
                self.write_ptr(pair + frpc.pair_second, *value);
                node
            })
            .collect();

        if nodes.is_empty() {
            self.write_ptr(header + tree.left, header);
            self.write_ptr(header + tree.right, header);
        } else {
            let root = self.link_subtree(&nodes, header);
            self.write_ptr(header + tree.parent, root);
            self.write_ptr(header + tree.left, nodes[0]);
            self.write_ptr(header + tree.right, *nodes.last().unwrap());
        }
        self.write_usize(tree_location + tree.node_count, nodes.len());

        ptr
    }

    fn link_subtree(&mut self, nodes: &[Pointer], parent: Pointer) -> Pointer {
        let tree = self.layout.rb_tree.clone();
        let mid = nodes.len() / 2;
        let node = nodes[mid];
        self.write_ptr(node + tree.parent, parent);

        let (left, right) = (&nodes[..mid], &nodes[mid + 1..]);
        if !left.is_empty() {
            let child = self.link_subtree(left, node);
            self.write_ptr(node + tree.left, child);
        }
        if !right.is_empty() {
            let child = self.link_subtree(right, node);
            self.write_ptr(node + tree.right, child);
        }
        node
    }

    /// The nodes of a struct's tree, in key order.
    pub fn struct_nodes(&self, structure: Pointer) -> Vec<Pointer> {
        let tree = &self.layout.rb_tree;
        let header = structure + self.layout.frpc.struct_data + tree.header;
        let mut nodes = Vec::new();
        let mut stack = Vec::new();
        let mut node = self.read_ptr(header + tree.parent);
        while !node.is_null() || !stack.is_empty() {
            while !node.is_null() {
                stack.push(node);
                node = self.read_ptr(node + tree.left);
            }
            let top = stack.pop().unwrap();
            nodes.push(top);
            node = self.read_ptr(top + tree.right);
        }
        nodes
    }

    pub fn finish(self) -> MemoryImage {
        let mut image = MemoryImage::new();
        image.add_segment(
            Pointer::new(HEAP_BASE),
            self.heap,
            self.heap_objfile.as_deref(),
        );

        let mut vtables = vec![0u8; CLASSES.len() * 0x40];
        for i in 0..CLASSES.len() {
            let slot = i * 0x40 + 16;
            vtables[slot..slot + 8].copy_from_slice(&(DTOR_BASE + i * 0x10).to_le_bytes());
        }
        image.add_segment(Pointer::new(VTABLE_BASE), vtables, Some(LIBRARY));
        image.add_segment(
            Pointer::new(DTOR_BASE),
            vec![0xc3; CLASSES.len() * 0x10],
            Some(LIBRARY),
        );

        for (i, class) in CLASSES.iter().enumerate() {
            if self.vtable_symbols {
                let start = Pointer::new(VTABLE_BASE + i * 0x40);
                image.add_symbol(
                    format!("_ZTVN4FRPC{}{}E", class.len(), class),
                    start..start + 0x40,
                );
            }
            if self.dtor_symbols {
                let start = Pointer::new(DTOR_BASE + i * 0x10);
                image.add_symbol(
                    format!("_ZN4FRPC{}{}D1Ev", class.len(), class),
                    start..start + 0x10,
                );
            }
        }

        image
    }
}
