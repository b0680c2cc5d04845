//! Frame graph
//!
//! A frame graph describes one frame as passes that read and write virtual
//! resources. Building it records the dependencies in a [`DependencyGraph`];
//! compiling culls every pass whose output never reaches a presented
//! resource or a pass with side effects. Executing it turns the surviving
//! virtual resources into backend objects right before their first use and
//! hands them back to the [`ResourceAllocator`] right after their last use.
//!
//! # Example
//!
//! ```
//! use framegraph::backend::{DummyDriver, TextureDescriptor};
//! use framegraph::graph::FrameGraph;
//! use framegraph::resources::ResourceAllocator;
//!
//! let driver = DummyDriver::new();
//! let mut allocator = ResourceAllocator::default();
//! let mut graph = FrameGraph::new();
//!
//! let color = graph.create_texture("color", TextureDescriptor::default());
//! graph
//!     .add_pass("draw", |builder| { builder.write(color); }, |_resources| {})
//!     .unwrap();
//! graph.present(color);
//!
//! graph.compile().unwrap();
//! graph.execute(&mut allocator, &driver).unwrap();
//! ```

mod dependency;

pub use dependency::{DependencyGraph, Edge, EdgeId, NodeId};

use std::fmt;

use crate::backend::{
    BufferDescriptor, BufferHandle, BufferUsage, Driver, TextureDescriptor, TextureHandle,
    TextureUsage,
};
use crate::error::FrameGraphError;
use crate::resources::{Buffer, ResourceAllocator, Texture};

/// Handle to a virtual resource of a [`FrameGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle(u32);

impl ResourceHandle {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a pass of a [`FrameGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassHandle(u32);

impl PassHandle {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy)]
enum VirtualResource {
    Texture(TextureDescriptor),
    Buffer(BufferDescriptor, BufferUsage),
}

#[derive(Debug)]
enum PhysicalResource {
    Texture(Texture),
    Buffer(Buffer),
}

#[derive(Debug)]
struct ResourceEntry {
    name: String,
    kind: VirtualResource,
    node: NodeId,
}

type ExecuteFn<'a> = Box<dyn FnOnce(&PassResources<'_>) + 'a>;

struct PassEntry<'a> {
    name: String,
    node: NodeId,
    reads: Vec<ResourceHandle>,
    writes: Vec<ResourceHandle>,
    execute: Option<ExecuteFn<'a>>,
}

impl fmt::Debug for PassEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassEntry")
            .field("name", &self.name)
            .field("node", &self.node)
            .field("reads", &self.reads)
            .field("writes", &self.writes)
            .finish_non_exhaustive()
    }
}

/// Records the resource accesses of a pass during setup.
#[derive(Debug, Default)]
pub struct PassBuilder {
    reads: Vec<ResourceHandle>,
    writes: Vec<ResourceHandle>,
    side_effect: bool,
}

impl PassBuilder {
    /// Declare that the pass reads `resource`.
    pub fn read(&mut self, resource: ResourceHandle) -> ResourceHandle {
        if !self.reads.contains(&resource) {
            self.reads.push(resource);
        }
        resource
    }

    /// Declare that the pass writes `resource`.
    pub fn write(&mut self, resource: ResourceHandle) -> ResourceHandle {
        if !self.writes.contains(&resource) {
            self.writes.push(resource);
        }
        resource
    }

    /// Keep the pass even if nothing consumes its output.
    pub fn side_effect(&mut self) {
        self.side_effect = true;
    }
}

/// Backend objects visible to a pass while it executes.
#[derive(Debug)]
pub struct PassResources<'r> {
    physical: &'r [Option<PhysicalResource>],
}

impl PassResources<'_> {
    /// Backend texture of `resource`, if it is a live texture.
    pub fn texture(&self, resource: ResourceHandle) -> Option<TextureHandle> {
        match self.physical.get(resource.index())? {
            Some(PhysicalResource::Texture(texture)) => Some(texture.handle),
            _ => None,
        }
    }

    /// Backend buffer of `resource`, if it is a live buffer.
    pub fn buffer(&self, resource: ResourceHandle) -> Option<BufferHandle> {
        match self.physical.get(resource.index())? {
            Some(PhysicalResource::Buffer(buffer)) => Some(buffer.handle),
            _ => None,
        }
    }
}

/// Execution plan produced by [`FrameGraph::compile`].
#[derive(Debug, Default)]
struct Schedule {
    /// Surviving passes in declaration order.
    order: Vec<PassHandle>,
    /// Resources to devirtualize before each scheduled pass.
    devirtualize: Vec<Vec<ResourceHandle>>,
    /// Resources to release after each scheduled pass.
    release: Vec<Vec<ResourceHandle>>,
}

/// Per-frame graph of passes and virtual resources.
#[derive(Debug, Default)]
pub struct FrameGraph<'a> {
    graph: DependencyGraph,
    resources: Vec<ResourceEntry>,
    passes: Vec<PassEntry<'a>>,
    schedule: Option<Schedule>,
}

impl<'a> FrameGraph<'a> {
    /// Create an empty frame graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a virtual texture.
    pub fn create_texture(&mut self, name: &str, desc: TextureDescriptor) -> ResourceHandle {
        self.add_resource(name, VirtualResource::Texture(desc))
    }

    /// Declare a virtual buffer.
    pub fn create_buffer(
        &mut self,
        name: &str,
        desc: BufferDescriptor,
        usage: BufferUsage,
    ) -> ResourceHandle {
        self.add_resource(name, VirtualResource::Buffer(desc, usage))
    }

    /// Add a pass.
    ///
    /// `setup` runs immediately and declares the resources the pass reads
    /// and writes. `execute` runs during [`execute`](Self::execute) if the
    /// pass survives culling.
    pub fn add_pass<S, E>(
        &mut self,
        name: &str,
        setup: S,
        execute: E,
    ) -> Result<PassHandle, FrameGraphError>
    where
        S: FnOnce(&mut PassBuilder),
        E: FnOnce(&PassResources<'_>) + 'a,
    {
        let mut builder = PassBuilder::default();
        setup(&mut builder);

        if let Some(unknown) = builder
            .reads
            .iter()
            .chain(&builder.writes)
            .find(|resource| resource.index() >= self.resources.len())
        {
            return Err(FrameGraphError::UnknownResource {
                pass: name.to_string(),
                resource: unknown.0,
            });
        }

        let node = self.graph.add_node(name);
        for resource in &builder.reads {
            self.graph.link(self.resources[resource.index()].node, node);
        }
        for resource in &builder.writes {
            self.graph.link(node, self.resources[resource.index()].node);
        }
        if builder.side_effect {
            self.graph.make_target(node);
        }

        let handle = PassHandle(self.passes.len() as u32);
        self.passes.push(PassEntry {
            name: name.to_string(),
            node,
            reads: builder.reads,
            writes: builder.writes,
            execute: Some(Box::new(execute)),
        });
        Ok(handle)
    }

    /// Mark `resource` as a frame output. Its writers are never culled.
    ///
    /// # Panics
    ///
    /// Panics if `resource` was not declared on this graph, or if the graph
    /// was already compiled since the last [`clear`](Self::clear).
    pub fn present(&mut self, resource: ResourceHandle) {
        let entry = self.resources.get(resource.index()).unwrap_or_else(|| {
            panic!(
                "presenting unknown resource {resource:?} ({} declared)",
                self.resources.len()
            )
        });
        self.graph.make_target(entry.node);
    }

    /// Cull unused passes and plan resource lifetimes.
    ///
    /// # Errors
    ///
    /// Returns [`FrameGraphError::CyclicDependency`] for a cyclic graph and
    /// [`FrameGraphError::ResourceNeverWritten`] when a surviving pass reads a
    /// resource no earlier surviving pass wrote. On error the graph is left
    /// uncompiled and can still be extended.
    ///
    /// # Panics
    ///
    /// Panics if the graph was already compiled since the last
    /// [`clear`](Self::clear).
    pub fn compile(&mut self) -> Result<(), FrameGraphError> {
        if !self.graph.is_acyclic() {
            return Err(FrameGraphError::CyclicDependency);
        }
        self.graph.cull();

        match self.plan() {
            Ok(schedule) => {
                log::debug!(
                    "FrameGraph: {} of {} passes scheduled",
                    schedule.order.len(),
                    self.passes.len()
                );
                self.schedule = Some(schedule);
                Ok(())
            }
            Err(err) => {
                self.graph.reset_cull();
                Err(err)
            }
        }
    }

    /// Order surviving passes and find each resource's first and last use.
    fn plan(&self) -> Result<Schedule, FrameGraphError> {
        let mut schedule = Schedule::default();
        let mut first_use: Vec<Option<usize>> = vec![None; self.resources.len()];
        let mut last_use: Vec<Option<usize>> = vec![None; self.resources.len()];
        let mut written = vec![false; self.resources.len()];

        for (index, pass) in self.passes.iter().enumerate() {
            if self.graph.is_culled(pass.node) {
                continue;
            }
            let position = schedule.order.len();
            schedule.order.push(PassHandle(index as u32));

            for resource in &pass.reads {
                if !written[resource.index()] {
                    return Err(FrameGraphError::ResourceNeverWritten(
                        self.resources[resource.index()].name.clone(),
                    ));
                }
            }
            for resource in pass.reads.iter().chain(&pass.writes) {
                first_use[resource.index()].get_or_insert(position);
                last_use[resource.index()] = Some(position);
            }
            for resource in &pass.writes {
                written[resource.index()] = true;
            }
        }

        schedule.devirtualize = vec![Vec::new(); schedule.order.len()];
        schedule.release = vec![Vec::new(); schedule.order.len()];
        for index in 0..self.resources.len() {
            let handle = ResourceHandle(index as u32);
            if let (Some(first), Some(last)) = (first_use[index], last_use[index]) {
                schedule.devirtualize[first].push(handle);
                schedule.release[last].push(handle);
            }
        }

        Ok(schedule)
    }

    /// Run every surviving pass.
    ///
    /// On a backend failure every resource created so far is handed back to
    /// the allocator before the error is returned.
    pub fn execute(
        &mut self,
        allocator: &mut ResourceAllocator,
        driver: &dyn Driver,
    ) -> Result<(), FrameGraphError> {
        let schedule = self.schedule.take().ok_or(FrameGraphError::NotCompiled)?;
        let mut physical: Vec<Option<PhysicalResource>> =
            std::iter::repeat_with(|| None).take(self.resources.len()).collect();

        allocator.begin_frame();
        let result = self.run_passes(&schedule, &mut physical, allocator, driver);

        for resource in physical.iter_mut().filter_map(Option::take) {
            Self::release(allocator, driver, resource);
        }
        allocator.end_frame(driver);
        result
    }

    fn run_passes(
        &mut self,
        schedule: &Schedule,
        physical: &mut [Option<PhysicalResource>],
        allocator: &mut ResourceAllocator,
        driver: &dyn Driver,
    ) -> Result<(), FrameGraphError> {
        for (position, pass) in schedule.order.iter().enumerate() {
            for &resource in &schedule.devirtualize[position] {
                let entry = &self.resources[resource.index()];
                let created = match entry.kind {
                    VirtualResource::Texture(desc) => PhysicalResource::Texture(
                        allocator.create::<Texture>(
                            driver,
                            &entry.name,
                            &desc,
                            TextureUsage::empty(),
                        )?,
                    ),
                    VirtualResource::Buffer(desc, usage) => PhysicalResource::Buffer(
                        allocator.create::<Buffer>(driver, &entry.name, &desc, usage)?,
                    ),
                };
                physical[resource.index()] = Some(created);
            }

            let entry = &mut self.passes[pass.index()];
            if let Some(execute) = entry.execute.take() {
                log::trace!("FrameGraph: executing pass '{}'", entry.name);
                execute(&PassResources {
                    physical: &*physical,
                });
            }

            for &resource in &schedule.release[position] {
                if let Some(resource) = physical[resource.index()].take() {
                    Self::release(allocator, driver, resource);
                }
            }
        }
        Ok(())
    }

    fn release(allocator: &mut ResourceAllocator, driver: &dyn Driver, resource: PhysicalResource) {
        match resource {
            PhysicalResource::Texture(texture) => allocator.destroy(driver, texture),
            PhysicalResource::Buffer(buffer) => allocator.destroy(driver, buffer),
        }
    }

    /// Whether `pass` was culled. Always `false` before compiling.
    pub fn is_pass_culled(&self, pass: PassHandle) -> bool {
        self.graph.is_culled(self.passes[pass.index()].node)
    }

    /// Name given to `pass` in [`add_pass`](Self::add_pass).
    pub fn pass_name(&self, pass: PassHandle) -> &str {
        &self.passes[pass.index()].name
    }

    /// Number of declared passes, culled ones included.
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Number of declared virtual resources.
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Underlying dependency graph, for inspection and debugging.
    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Drop every pass and resource so the graph can be rebuilt.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.resources.clear();
        self.passes.clear();
        self.schedule = None;
    }

    fn add_resource(&mut self, name: &str, kind: VirtualResource) -> ResourceHandle {
        let node = self.graph.add_node(name);
        let handle = ResourceHandle(self.resources.len() as u32);
        self.resources.push(ResourceEntry {
            name: name.to_string(),
            kind,
            node,
        });
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyDriver, ObjectKind, TextureFormat};
    use crate::error::BackendError;
    use std::cell::RefCell;

    fn hdr() -> TextureDescriptor {
        TextureDescriptor::new_2d(
            64,
            64,
            TextureFormat::Rgba16Float,
            TextureUsage::COLOR_ATTACHMENT,
        )
    }

    #[test]
    fn test_unused_pass_is_culled() {
        let driver = DummyDriver::new();
        let mut allocator = ResourceAllocator::default();
        let log = RefCell::new(Vec::new());
        let mut graph = FrameGraph::new();

        let color = graph.create_texture("color", hdr());
        let debug = graph.create_texture("debug", hdr());
        let draw = graph
            .add_pass("draw", |b| { b.write(color); }, |_| log.borrow_mut().push("draw"))
            .unwrap();
        let overlay = graph
            .add_pass("overlay", |b| { b.write(debug); }, |_| log.borrow_mut().push("overlay"))
            .unwrap();
        graph.present(color);

        assert!(!graph.is_pass_culled(overlay));
        graph.compile().unwrap();
        assert!(!graph.is_pass_culled(draw));
        assert!(graph.is_pass_culled(overlay));

        graph.execute(&mut allocator, &driver).unwrap();
        assert_eq!(*log.borrow(), vec!["draw"]);
        assert_eq!(driver.stats().created(ObjectKind::Texture), 1);
    }

    #[test]
    fn test_side_effect_pass_survives() {
        let mut graph = FrameGraph::new();
        let readback =
            graph.create_buffer("readback", BufferDescriptor::new(64), BufferUsage::COPY_DST);
        let pass = graph
            .add_pass(
                "copy",
                |b| {
                    b.write(readback);
                    b.side_effect();
                },
                |_| {},
            )
            .unwrap();

        graph.compile().unwrap();
        assert!(!graph.is_pass_culled(pass));
        assert_eq!(graph.pass_name(pass), "copy");
    }

    #[test]
    fn test_resources_live_between_first_and_last_use() {
        let driver = DummyDriver::new();
        let mut allocator = ResourceAllocator::default();
        let seen = RefCell::new(Vec::new());
        let record = &seen;
        let mut graph = FrameGraph::new();

        let gbuffer = graph.create_texture("gbuffer", hdr());
        let lit = graph.create_texture("lit", hdr());

        graph
            .add_pass(
                "geometry",
                |b| {
                    b.write(gbuffer);
                },
                move |res| {
                    record
                        .borrow_mut()
                        .push((res.texture(gbuffer), res.texture(lit)));
                },
            )
            .unwrap();
        graph
            .add_pass(
                "lighting",
                |b| {
                    b.read(gbuffer);
                    b.write(lit);
                },
                move |res| {
                    record
                        .borrow_mut()
                        .push((res.texture(gbuffer), res.texture(lit)));
                },
            )
            .unwrap();
        graph.present(lit);

        graph.compile().unwrap();
        graph.execute(&mut allocator, &driver).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].0.is_some());
        assert!(seen[0].1.is_none());
        assert!(seen[1].0.is_some());
        assert!(seen[1].1.is_some());
        assert_ne!(seen[1].0, seen[1].1);

        // Everything went back to the texture cache.
        assert_eq!(allocator.texture_cache().in_use(), 0);
        assert_eq!(allocator.texture_cache().len(), 2);
    }

    #[test]
    fn test_buffer_is_visible_as_buffer_only() {
        let driver = DummyDriver::new();
        let mut allocator = ResourceAllocator::default();
        let seen = RefCell::new(None);
        let record = &seen;
        let mut graph = FrameGraph::new();

        let params = graph.create_buffer("params", BufferDescriptor::new(256), BufferUsage::UNIFORM);
        graph
            .add_pass(
                "upload",
                |b| {
                    b.write(params);
                    b.side_effect();
                },
                move |res| {
                    *record.borrow_mut() = Some((res.buffer(params), res.texture(params)));
                },
            )
            .unwrap();

        graph.compile().unwrap();
        graph.execute(&mut allocator, &driver).unwrap();

        let (buffer, texture) = seen.borrow().expect("pass did not run");
        assert!(buffer.is_some());
        assert!(texture.is_none());
        assert_eq!(driver.live(ObjectKind::Buffer), 0);
    }

    #[test]
    fn test_read_before_write_is_rejected() {
        let mut graph = FrameGraph::new();
        let shadow = graph.create_texture("shadow", hdr());
        let color = graph.create_texture("color", hdr());
        graph
            .add_pass(
                "lighting",
                |b| {
                    b.read(shadow);
                    b.write(color);
                },
                |_| {},
            )
            .unwrap();
        graph.present(color);

        assert_eq!(
            graph.compile(),
            Err(FrameGraphError::ResourceNeverWritten("shadow".to_string()))
        );
    }

    #[test]
    fn test_failed_compile_leaves_graph_editable() {
        let driver = DummyDriver::new();
        let mut allocator = ResourceAllocator::default();
        let mut graph = FrameGraph::new();
        let shadow = graph.create_texture("shadow", hdr());
        let color = graph.create_texture("color", hdr());
        let lighting = graph
            .add_pass(
                "lighting",
                |b| {
                    b.read(shadow);
                    b.write(color);
                },
                |_| {},
            )
            .unwrap();
        graph.present(color);
        assert!(graph.compile().is_err());
        assert!(!graph.dependency_graph().is_culled_graph());
        assert!(!graph.is_pass_culled(lighting));

        let late = graph
            .add_pass(
                "shadow",
                |b| {
                    b.write(shadow);
                    b.side_effect();
                },
                |_| {},
            )
            .unwrap();
        let debug = graph.create_texture("debug", hdr());
        graph
            .add_pass("debug", |b| { b.write(debug); }, |_| {})
            .unwrap();
        graph.present(debug);

        // The writer is declared after the reader, so the frame stays invalid.
        assert_eq!(
            graph.compile(),
            Err(FrameGraphError::ResourceNeverWritten("shadow".to_string()))
        );
        assert!(!graph.is_pass_culled(late));
        assert_eq!(
            graph.execute(&mut allocator, &driver),
            Err(FrameGraphError::NotCompiled)
        );
    }

    #[test]
    #[should_panic(expected = "presenting unknown resource")]
    fn test_present_foreign_resource_panics() {
        let mut other = FrameGraph::new();
        other.create_texture("a", hdr());
        let foreign = other.create_texture("b", hdr());

        let mut graph = FrameGraph::new();
        graph.create_texture("only", hdr());
        graph.present(foreign);
    }

    #[test]
    fn test_read_write_same_resource_is_cyclic() {
        let mut graph = FrameGraph::new();
        let accum = graph.create_texture("accum", hdr());
        graph
            .add_pass(
                "accumulate",
                |b| {
                    b.read(accum);
                    b.write(accum);
                },
                |_| {},
            )
            .unwrap();

        assert_eq!(graph.compile(), Err(FrameGraphError::CyclicDependency));
    }

    #[test]
    fn test_unknown_resource_is_rejected() {
        let mut graph = FrameGraph::new();
        let result = graph.add_pass(
            "bad",
            |b| {
                b.read(ResourceHandle(3));
            },
            |_| {},
        );
        assert_eq!(
            result,
            Err(FrameGraphError::UnknownResource {
                pass: "bad".to_string(),
                resource: 3
            })
        );
        assert_eq!(graph.pass_count(), 0);
        assert_eq!(graph.dependency_graph().node_count(), 0);
    }

    #[test]
    fn test_execute_requires_compile() {
        let driver = DummyDriver::new();
        let mut allocator = ResourceAllocator::default();
        let mut graph = FrameGraph::new();
        assert_eq!(
            graph.execute(&mut allocator, &driver),
            Err(FrameGraphError::NotCompiled)
        );
    }

    #[test]
    fn test_backend_failure_releases_created_resources() {
        let driver = DummyDriver::new();
        let mut allocator = ResourceAllocator::default();
        let mut graph = FrameGraph::new();

        let depth = graph.create_texture("depth", hdr());
        let visibility =
            graph.create_buffer("visibility", BufferDescriptor::new(16), BufferUsage::STORAGE);
        graph
            .add_pass(
                "prepass",
                |b| {
                    b.write(depth);
                },
                |_| driver.fail_next_allocation(BackendError::OutOfMemory),
            )
            .unwrap();
        graph
            .add_pass(
                "cull",
                |b| {
                    b.read(depth);
                    b.write(visibility);
                },
                |_| panic!("pass must not run after a failed allocation"),
            )
            .unwrap();
        graph.present(visibility);
        graph.compile().unwrap();

        let result = graph.execute(&mut allocator, &driver);
        assert_eq!(
            result,
            Err(FrameGraphError::Backend(BackendError::OutOfMemory))
        );
        assert_eq!(allocator.texture_cache().in_use(), 0);
        assert_eq!(driver.live(ObjectKind::Buffer), 0);
    }

    #[test]
    #[should_panic(expected = "called twice")]
    fn test_compile_twice_panics() {
        let mut graph = FrameGraph::new();
        graph.create_texture("t", hdr());
        graph.compile().unwrap();
        let _ = graph.compile();
    }

    #[test]
    fn test_clear_allows_rebuild() {
        let mut graph = FrameGraph::new();
        let color = graph.create_texture("color", hdr());
        graph
            .add_pass("draw", |b| { b.write(color); }, |_| {})
            .unwrap();
        graph.present(color);
        graph.compile().unwrap();

        graph.clear();
        assert_eq!(graph.pass_count(), 0);
        assert_eq!(graph.resource_count(), 0);

        let color = graph.create_texture("color", hdr());
        let draw = graph
            .add_pass("draw", |b| { b.write(color); }, |_| {})
            .unwrap();
        graph.present(color);
        graph.compile().unwrap();
        assert!(!graph.is_pass_culled(draw));
    }
}
