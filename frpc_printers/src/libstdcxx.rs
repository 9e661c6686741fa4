//! Readers for the libstdc++ containers backing FastRPC values.

use memory_reader::Pointer;

use crate::{Error, Inspect, RbTreeLayout, StringLayout, VectorLayout};

/// Read the contents of a `std::string`.
pub fn read_std_string(
    inspect: &dyn Inspect,
    location: Pointer,
    layout: &StringLayout,
    limit: usize,
) -> Result<Vec<u8>, Error> {
    let data = inspect.read_pointer(location.try_add(layout.data_ptr)?)?;
    let length = inspect.read_usize(location.try_add(layout.length)?)?;

    if length > limit {
        return Err(Error::StringTooLong {
            location,
            length,
            limit,
        });
    }
    if length == 0 {
        return Ok(Vec::new());
    }

    let bytes = inspect.read_bytes(data..data.try_add(length)?)?;
    Ok(bytes.take())
}

/// A `std::vector<T*>`, as the three pointers libstdc++ stores.
#[derive(Clone, Copy, Debug)]
pub struct PointerVector {
    location: Pointer,
    start: Pointer,
    finish: Pointer,
    end_of_storage: Pointer,
}

impl PointerVector {
    pub fn read(
        inspect: &dyn Inspect,
        location: Pointer,
        layout: &VectorLayout,
    ) -> Result<Self, Error> {
        Ok(Self {
            location,
            start: inspect.read_pointer(location.try_add(layout.start)?)?,
            finish: inspect.read_pointer(location.try_add(layout.finish)?)?,
            end_of_storage: inspect
                .read_pointer(location.try_add(layout.end_of_storage)?)?,
        })
    }

    /// Check that the three pointers describe a possible vector
    /// holding at most `max_len` elements.
    pub fn validate(&self, type_name: &str, max_len: usize) -> Result<(), Error> {
        let mismatch = |reason: String| Error::LayoutMismatch {
            type_name: type_name.to_string(),
            location: self.location,
            reason,
        };

        if self.start.is_null() {
            return if self.finish.is_null() && self.end_of_storage.is_null() {
                Ok(())
            } else {
                Err(mismatch(format!(
                    "null storage with finish {} and end of storage {}",
                    self.finish, self.end_of_storage
                )))
            };
        }

        if !(self.start <= self.finish && self.finish <= self.end_of_storage) {
            return Err(mismatch(format!(
                "storage pointers out of order ({}, {}, {})",
                self.start, self.finish, self.end_of_storage
            )));
        }
        if !self.start.is_aligned(Pointer::SIZE)
            || (self.finish - self.start) % Pointer::SIZE != 0
            || (self.end_of_storage - self.start) % Pointer::SIZE != 0
        {
            return Err(mismatch(
                "storage is not a whole number of pointers".to_string(),
            ));
        }
        if self.len() > max_len {
            return Err(mismatch(format!(
                "length {} exceeds the limit of {max_len}",
                self.len()
            )));
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.finish
            .checked_offset_from(self.start)
            .unwrap_or(0)
            / Pointer::SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.end_of_storage
            .checked_offset_from(self.start)
            .unwrap_or(0)
            / Pointer::SIZE
    }

    pub fn element_location(&self, index: usize) -> Pointer {
        self.start + index * Pointer::SIZE
    }
}

/// The header of a `std::_Rb_tree`.
#[derive(Clone, Copy, Debug)]
pub struct RbTree {
    header: Pointer,
    root: Pointer,
    leftmost: Pointer,
    rightmost: Pointer,
    node_count: usize,
}

impl RbTree {
    pub fn read(
        inspect: &dyn Inspect,
        location: Pointer,
        layout: &RbTreeLayout,
    ) -> Result<Self, Error> {
        let header = location.try_add(layout.header)?;
        Ok(Self {
            header,
            root: inspect.read_pointer(header.try_add(layout.parent)?)?,
            leftmost: inspect.read_pointer(header.try_add(layout.left)?)?,
            rightmost: inspect.read_pointer(header.try_add(layout.right)?)?,
            node_count: inspect
                .read_usize(location.try_add(layout.node_count)?)?,
        })
    }

    /// A null root is an empty tree, whether the map is genuinely
    /// empty or not yet constructed.
    pub fn is_empty(&self) -> bool {
        self.root.is_null()
    }

    pub fn header(&self) -> Pointer {
        self.header
    }

    /// The element count the container itself records.  Only used as
    /// a cross-check, since it may disagree with the linkage in a
    /// corrupted tree.
    pub fn recorded_count(&self) -> usize {
        self.node_count
    }

    pub fn validate(
        &self,
        inspect: &dyn Inspect,
        layout: &RbTreeLayout,
        type_name: &str,
    ) -> Result<(), Error> {
        if self.is_empty() {
            return Ok(());
        }

        let mismatch = |reason: String| Error::LayoutMismatch {
            type_name: type_name.to_string(),
            location: self.header,
            reason,
        };

        if self.leftmost.is_null() || self.rightmost.is_null() {
            return Err(mismatch(format!(
                "root {} is set, but leftmost {} or rightmost {} is null",
                self.root, self.leftmost, self.rightmost
            )));
        }

        let root_parent = inspect.read_pointer(self.root.try_add(layout.parent)?)?;
        if root_parent != self.header {
            return Err(mismatch(format!(
                "root {} has parent {}, expected the header",
                self.root, root_parent
            )));
        }

        Ok(())
    }

    /// In-order traversal of the nodes, ending when the walk returns
    /// to the header, or after `max_steps` pointer reads.
    pub fn iter<'a>(
        &self,
        inspect: &'a dyn Inspect,
        layout: &'a RbTreeLayout,
        max_steps: usize,
    ) -> RbTreeIter<'a> {
        RbTreeIter {
            inspect,
            layout,
            header: self.header,
            next: if self.is_empty() {
                self.header
            } else {
                self.leftmost
            },
            remaining_steps: max_steps,
            max_steps,
            pending_error: None,
            done: false,
        }
    }
}

/// Yields the address of each node.  After an error has been yielded,
/// the iterator is exhausted.
pub struct RbTreeIter<'a> {
    inspect: &'a dyn Inspect,
    layout: &'a RbTreeLayout,
    header: Pointer,
    next: Pointer,
    remaining_steps: usize,
    max_steps: usize,
    pending_error: Option<Error>,
    done: bool,
}

impl RbTreeIter<'_> {
    fn read_link(&mut self, node: Pointer, offset: usize) -> Result<Pointer, Error> {
        if self.remaining_steps == 0 {
            return Err(Error::TraversalLimitReached(self.header, self.max_steps));
        }
        self.remaining_steps -= 1;
        Ok(self.inspect.read_pointer(node.try_add(offset)?)?)
    }

    /// `_Rb_tree_increment`
    fn successor(&mut self, mut node: Pointer) -> Result<Pointer, Error> {
        let (left, right, parent) =
            (self.layout.left, self.layout.right, self.layout.parent);

        let right_child = self.read_link(node, right)?;
        if !right_child.is_null() {
            node = right_child;
            loop {
                let left_child = self.read_link(node, left)?;
                if left_child.is_null() {
                    return Ok(node);
                }
                node = left_child;
            }
        }

        let mut parent_node = self.read_link(node, parent)?;
        while node == self.read_link(parent_node, right)? {
            node = parent_node;
            parent_node = self.read_link(parent_node, parent)?;
        }
        if self.read_link(node, right)? != parent_node {
            node = parent_node;
        }
        Ok(node)
    }
}

impl Iterator for RbTreeIter<'_> {
    type Item = Result<Pointer, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(err) = self.pending_error.take() {
            self.done = true;
            return Some(Err(err));
        }
        if self.next == self.header || self.next.is_null() {
            self.done = true;
            return None;
        }

        let current = self.next;
        match self.successor(current) {
            Ok(next) => self.next = next,
            Err(err) => self.pending_error = Some(err),
        }
        Some(Ok(current))
    }
}
