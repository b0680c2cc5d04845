//! Pipeline layout cache.
//!
//! Creating a pipeline layout is comparatively expensive on every backend, and
//! many programs share the same descriptor set layouts and push-constant
//! shape. The cache maps that shape to a single backend layout object.
//!
//! The key compares structurally, field by field, so logically identical
//! layouts always land on the same entry regardless of how the inputs were
//! built. Every lookup stamps the entry with a monotonically increasing
//! counter; entries are only destroyed by [`PipelineLayoutCache::terminate`].

use std::collections::HashMap;

use crate::backend::{
    DescriptorSetLayoutHandle, Driver, PipelineLayoutHandle, ProgramReflection,
    PushConstantRange, ShaderStage, MAX_DESCRIPTOR_SET_COUNT, MAX_SHADER_STAGES,
};
use crate::error::BackendResult;

/// Descriptor set layouts of a pipeline, one optional layout per set index.
pub type DescriptorSetLayouts = [Option<DescriptorSetLayoutHandle>; MAX_DESCRIPTOR_SET_COUNT];

/// One push-constant range as recorded in a [`PipelineLayoutKey`].
///
/// Unused slots hold the default value: an empty stage mask and zero size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PushConstantKey {
    pub stages: ShaderStage,
    pub size: u32,
    pub offset: u32,
}

/// Structural key of a pipeline layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PipelineLayoutKey {
    pub set_layouts: DescriptorSetLayouts,
    pub push_constants: [PushConstantKey; MAX_SHADER_STAGES],
}

impl PipelineLayoutKey {
    /// Build the key for `set_layouts` combined with the push constants
    /// declared by `program`.
    ///
    /// # Panics
    ///
    /// Ranges with an empty stage mask are not visible to any shader and are
    /// left out, so they never split otherwise identical layouts.
    ///
    /// # Panics
    ///
    /// Panics if the program declares more push-constant ranges than there
    /// are shader stages.
    pub fn new(set_layouts: &DescriptorSetLayouts, program: &dyn ProgramReflection) -> Self {
        let ranges = program.push_constant_ranges();
        let used = || ranges.iter().filter(|range| !range.stages.is_empty());
        let count = used().count();
        assert!(
            count <= MAX_SHADER_STAGES,
            "program declares {} push constant ranges, at most {} are supported",
            count,
            MAX_SHADER_STAGES
        );

        let mut key = Self {
            set_layouts: *set_layouts,
            ..Default::default()
        };
        for (slot, range) in key.push_constants.iter_mut().zip(used()) {
            *slot = PushConstantKey {
                stages: range.stages,
                size: range.size,
                offset: range.offset,
            };
        }
        key
    }

    /// Push-constant ranges in use, in declaration order.
    pub fn push_constant_ranges(&self) -> impl Iterator<Item = PushConstantRange> + '_ {
        self.push_constants
            .iter()
            .filter(|pc| !pc.stages.is_empty())
            .map(|pc| PushConstantRange {
                stages: pc.stages,
                size: pc.size,
                offset: pc.offset,
            })
    }
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    handle: PipelineLayoutHandle,
    last_used: u64,
}

/// Cache of backend pipeline layouts.
#[derive(Debug, Default)]
pub struct PipelineLayoutCache {
    entries: HashMap<PipelineLayoutKey, CacheEntry>,
    timestamp: u64,
}

impl PipelineLayoutCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the pipeline layout for `set_layouts` and the push constants of
    /// `program`, creating it on first use.
    pub fn get_layout(
        &mut self,
        driver: &dyn Driver,
        set_layouts: &DescriptorSetLayouts,
        program: &dyn ProgramReflection,
    ) -> BackendResult<PipelineLayoutHandle> {
        let key = PipelineLayoutKey::new(set_layouts, program);
        self.timestamp += 1;
        let now = self.timestamp;

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.last_used = now;
            return Ok(entry.handle);
        }

        let ranges: Vec<PushConstantRange> = key.push_constant_ranges().collect();
        let handle = driver.create_pipeline_layout(&key.set_layouts, &ranges)?;
        log::debug!(
            "PipelineLayoutCache: created layout {:?} ({} entries)",
            handle,
            self.entries.len() + 1
        );
        self.entries.insert(
            key,
            CacheEntry {
                handle,
                last_used: now,
            },
        );
        Ok(handle)
    }

    /// Destroy every cached layout. Must run before the driver goes away.
    pub fn terminate(&mut self, driver: &dyn Driver) {
        log::debug!(
            "PipelineLayoutCache: destroying {} layouts",
            self.entries.len()
        );
        for (_, entry) in self.entries.drain() {
            driver.destroy_pipeline_layout(entry.handle);
        }
    }

    /// Timestamp of the last lookup that hit or created `key`.
    pub fn last_used(&self, key: &PipelineLayoutKey) -> Option<u64> {
        self.entries.get(key).map(|entry| entry.last_used)
    }

    /// Value of the lookup counter; advances on every `get_layout` call.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Number of cached layouts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyDriver, ObjectKind};

    struct TestProgram {
        ranges: Vec<PushConstantRange>,
    }

    impl ProgramReflection for TestProgram {
        fn push_constant_ranges(&self) -> &[PushConstantRange] {
            &self.ranges
        }
    }

    fn sets(ids: &[u32]) -> DescriptorSetLayouts {
        let mut layouts = DescriptorSetLayouts::default();
        for (slot, &id) in layouts.iter_mut().zip(ids) {
            *slot = Some(DescriptorSetLayoutHandle::new(id));
        }
        layouts
    }

    fn vertex_program(size: u32) -> TestProgram {
        TestProgram {
            ranges: vec![PushConstantRange::new(ShaderStage::VERTEX, size)],
        }
    }

    #[test]
    fn test_identical_inputs_share_layout() {
        let driver = DummyDriver::new();
        let mut cache = PipelineLayoutCache::new();
        let layouts = sets(&[1, 2]);
        let program = vertex_program(16);

        let a = cache.get_layout(&driver, &layouts, &program).unwrap();
        let b = cache.get_layout(&driver, &layouts, &program).unwrap();

        assert_eq!(a, b);
        assert_eq!(cache.len(), 1);
        assert_eq!(driver.stats().created(ObjectKind::PipelineLayout), 1);
    }

    #[test]
    fn test_last_used_strictly_increases() {
        let driver = DummyDriver::new();
        let mut cache = PipelineLayoutCache::new();
        let layouts = sets(&[1]);
        let program = vertex_program(16);
        let key = PipelineLayoutKey::new(&layouts, &program);

        cache.get_layout(&driver, &layouts, &program).unwrap();
        let first = cache.last_used(&key).unwrap();

        // A lookup of a different key still advances the clock.
        cache
            .get_layout(&driver, &sets(&[7]), &program)
            .unwrap();
        assert_eq!(cache.last_used(&key), Some(first));

        cache.get_layout(&driver, &layouts, &program).unwrap();
        let second = cache.last_used(&key).unwrap();
        assert!(second > first);
        assert_eq!(second, cache.timestamp());
    }

    #[test]
    fn test_push_constants_distinguish_layouts() {
        let driver = DummyDriver::new();
        let mut cache = PipelineLayoutCache::new();
        let layouts = sets(&[1]);

        let small = cache
            .get_layout(&driver, &layouts, &vertex_program(16))
            .unwrap();
        let large = cache
            .get_layout(&driver, &layouts, &vertex_program(64))
            .unwrap();
        let fragment = cache
            .get_layout(
                &driver,
                &layouts,
                &TestProgram {
                    ranges: vec![PushConstantRange::new(ShaderStage::FRAGMENT, 16)],
                },
            )
            .unwrap();

        assert_ne!(small, large);
        assert_ne!(small, fragment);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_nonzero_offset_is_part_of_key() {
        let layouts = sets(&[1]);
        let zero = vertex_program(16);
        let shifted = TestProgram {
            ranges: vec![PushConstantRange {
                stages: ShaderStage::VERTEX,
                size: 16,
                offset: 16,
            }],
        };
        assert_ne!(
            PipelineLayoutKey::new(&layouts, &zero),
            PipelineLayoutKey::new(&layouts, &shifted)
        );
    }

    #[test]
    fn test_key_ignores_how_unused_slots_were_built() {
        let explicit = [Some(DescriptorSetLayoutHandle::new(3)), None, None, None];
        let program = TestProgram { ranges: Vec::new() };
        assert_eq!(
            PipelineLayoutKey::new(&explicit, &program),
            PipelineLayoutKey::new(&sets(&[3]), &program)
        );
    }

    #[test]
    fn test_empty_stage_range_is_ignored() {
        let driver = DummyDriver::new();
        let mut cache = PipelineLayoutCache::new();
        let layouts = sets(&[1]);
        let bare = TestProgram { ranges: Vec::new() };
        let stageless = TestProgram {
            ranges: vec![PushConstantRange::new(ShaderStage::empty(), 16)],
        };

        let first = cache.get_layout(&driver, &layouts, &bare).unwrap();
        let second = cache.get_layout(&driver, &layouts, &stageless).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            PipelineLayoutKey::new(&layouts, &bare),
            PipelineLayoutKey::new(&layouts, &stageless)
        );
        assert_eq!(driver.stats().created(ObjectKind::PipelineLayout), 1);
    }

    #[test]
    fn test_terminate_destroys_everything() {
        let driver = DummyDriver::new();
        let mut cache = PipelineLayoutCache::new();
        let program = vertex_program(16);
        cache.get_layout(&driver, &sets(&[1]), &program).unwrap();
        cache.get_layout(&driver, &sets(&[2]), &program).unwrap();

        cache.terminate(&driver);
        assert!(cache.is_empty());
        assert_eq!(driver.live(ObjectKind::PipelineLayout), 0);

        // Repopulating after terminate creates fresh objects.
        cache.get_layout(&driver, &sets(&[1]), &program).unwrap();
        assert_eq!(driver.stats().created(ObjectKind::PipelineLayout), 3);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    #[should_panic(expected = "push constant ranges")]
    fn test_too_many_push_constant_ranges_panics() {
        let program = TestProgram {
            ranges: vec![PushConstantRange::new(ShaderStage::VERTEX, 4); MAX_SHADER_STAGES + 1],
        };
        PipelineLayoutKey::new(&sets(&[1]), &program);
    }
}
