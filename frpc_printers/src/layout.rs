use serde::{Deserialize, Serialize};

/// Byte offsets of the fields the formatters read.
///
/// Defaults describe libstdc++ with the C++11 ABI on x86_64.  They can
/// be overridden from the user config when inspecting a process built
/// against a different standard library.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub string: StringLayout,
    pub vector: VectorLayout,
    pub rb_tree: RbTreeLayout,
    pub frpc: FrpcLayout,
}

/// `std::string`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringLayout {
    pub data_ptr: usize,
    pub length: usize,
    pub size: usize,
}

/// `std::vector<T>`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorLayout {
    pub start: usize,
    pub finish: usize,
    pub end_of_storage: usize,
}

/// `std::_Rb_tree`, the implementation of `std::map`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RbTreeLayout {
    /// Offset of the header node within the tree.  The header is the
    /// sentinel: its parent is the root, its left and right are the
    /// leftmost and rightmost nodes.
    pub header: usize,
    pub node_count: usize,

    /// Offsets within `_Rb_tree_node_base`.
    pub parent: usize,
    pub left: usize,
    pub right: usize,

    /// Offset of the stored `std::pair` within a node.
    pub value: usize,
}

/// FastRPC value types.  Every `FRPC::Value_t` starts with a vtable
/// pointer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrpcLayout {
    pub vptr: usize,

    /// `value` member of `Int_t`, `Bool_t`, `Double_t`, `String_t` and
    /// `Binary_t`.
    pub primitive_value: usize,

    /// `structData`, a `std::map<std::string, Value_t*>`.
    pub struct_data: usize,

    /// Within a map node's `std::pair<const std::string, Value_t*>`.
    pub pair_first: usize,
    pub pair_second: usize,

    /// `arrayData`, a `std::vector<Value_t*>`.
    pub array_data: usize,

    /// `pointerStorage` of `Pool_t`, a `std::vector<Value_t*>`.
    pub pool_storage: usize,

    pub datetime: DateTimeLayout,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateTimeLayout {
    pub year: usize,
    pub month: usize,
    pub day: usize,
    pub hour: usize,
    pub minute: usize,
    pub sec: usize,
    pub week_day: usize,
    pub unix_time: usize,
    pub time_zone: usize,
}

impl Default for StringLayout {
    fn default() -> Self {
        Self {
            data_ptr: 0,
            length: 8,
            size: 32,
        }
    }
}

impl Default for VectorLayout {
    fn default() -> Self {
        Self {
            start: 0,
            finish: 8,
            end_of_storage: 16,
        }
    }
}

impl Default for RbTreeLayout {
    fn default() -> Self {
        Self {
            header: 8,
            node_count: 40,
            parent: 8,
            left: 16,
            right: 24,
            value: 32,
        }
    }
}

impl Default for FrpcLayout {
    fn default() -> Self {
        Self {
            vptr: 0,
            primitive_value: 8,
            struct_data: 8,
            pair_first: 0,
            pair_second: 32,
            array_data: 8,
            pool_storage: 8,
            datetime: DateTimeLayout::default(),
        }
    }
}

impl Default for DateTimeLayout {
    fn default() -> Self {
        Self {
            year: 8,
            month: 10,
            day: 11,
            hour: 12,
            minute: 13,
            sec: 14,
            week_day: 15,
            unix_time: 16,
            time_zone: 24,
        }
    }
}
