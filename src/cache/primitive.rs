//! De-duplication of render primitives.
//!
//! Two draw calls that reference the same vertex buffer, index buffer and
//! topology must share a single backend render primitive. The factory keeps
//! one reference-counted entry per distinct triple and only asks the driver
//! to create or destroy an object on the first acquisition and last release.
//!
//! Entries are reachable two ways: an ordered map keyed by content serves
//! [`RenderPrimitiveFactory::create`], and a side map keyed by the backend
//! handle serves [`RenderPrimitiveFactory::destroy`].

use std::collections::{BTreeMap, HashMap};

use crate::backend::{
    Driver, IndexBufferHandle, PrimitiveType, RenderPrimitiveHandle, VertexBufferHandle,
};
use crate::error::BackendResult;

/// Content key of a render primitive. Ordered by vertex buffer, then index
/// buffer, then topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrimitiveKey {
    pub vbh: VertexBufferHandle,
    pub ibh: IndexBufferHandle,
    pub primitive_type: PrimitiveType,
}

#[derive(Debug)]
struct Entry {
    handle: RenderPrimitiveHandle,
    refs: u32,
}

/// Reference-counted cache of backend render primitives.
#[derive(Debug, Default)]
pub struct RenderPrimitiveFactory {
    entries: BTreeMap<PrimitiveKey, Entry>,
    by_handle: HashMap<RenderPrimitiveHandle, PrimitiveKey>,
}

impl RenderPrimitiveFactory {
    /// Create an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the render primitive for `(vbh, ibh, primitive_type)`.
    ///
    /// Returns the existing handle with its reference count bumped if the
    /// triple is already known, otherwise creates a new backend object with a
    /// reference count of one. A driver failure leaves the factory untouched.
    pub fn create(
        &mut self,
        driver: &dyn Driver,
        vbh: VertexBufferHandle,
        ibh: IndexBufferHandle,
        primitive_type: PrimitiveType,
    ) -> BackendResult<RenderPrimitiveHandle> {
        let key = PrimitiveKey {
            vbh,
            ibh,
            primitive_type,
        };

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.refs += 1;
            return Ok(entry.handle);
        }

        let handle = driver.create_render_primitive(vbh, ibh, primitive_type)?;
        log::debug!(
            "RenderPrimitiveFactory: new primitive {:?} for {:?}",
            handle,
            key
        );
        self.entries.insert(key, Entry { handle, refs: 1 });
        self.by_handle.insert(handle, key);
        Ok(handle)
    }

    /// Release one reference to `handle`, destroying the backend object when
    /// the last reference goes away.
    ///
    /// # Panics
    ///
    /// Panics if `handle` was not produced by this factory or was already
    /// fully released.
    pub fn destroy(&mut self, driver: &dyn Driver, handle: RenderPrimitiveHandle) {
        let key = *self
            .by_handle
            .get(&handle)
            .unwrap_or_else(|| panic!("destroying unknown render primitive {handle:?}"));

        let entry = self
            .entries
            .get_mut(&key)
            .expect("render primitive side map out of sync");
        entry.refs -= 1;
        if entry.refs > 0 {
            return;
        }

        self.entries.remove(&key);
        self.by_handle.remove(&handle);
        driver.destroy_render_primitive(handle);
    }

    /// Check that every `create` was balanced by a `destroy`.
    ///
    /// # Panics
    ///
    /// Panics if any primitive is still referenced.
    pub fn terminate(&mut self, _driver: &dyn Driver) {
        assert!(
            self.entries.is_empty(),
            "RenderPrimitiveFactory terminated with {} live primitives",
            self.entries.len()
        );
        assert!(self.by_handle.is_empty());
    }

    /// Number of distinct live primitives.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current reference count of `handle`, if it is alive.
    pub fn ref_count(&self, handle: RenderPrimitiveHandle) -> Option<u32> {
        let key = self.by_handle.get(&handle)?;
        self.entries.get(key).map(|entry| entry.refs)
    }
}
