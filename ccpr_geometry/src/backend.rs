// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The contract with the rendering backend that uploads and draws instances.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};
use peniko::kurbo::{Point, Rect};

use crate::instance::Instances;
use crate::pass::InstanceLayout;
use crate::{Config, RenderPass};

/// A rendering backend able to draw coverage processor passes.
pub trait Backend {
    /// Handle to an instance buffer on the device.
    type Buffer;

    /// Returns `false` if the device cannot run `pass`, in which case it is skipped.
    fn supports_pass(&self, pass: RenderPass) -> bool {
        let _ = pass;
        true
    }

    /// Uploads instance records.
    ///
    /// Returns `None` if the buffer could not be allocated.
    fn create_instance_buffer(&mut self, bytes: &[u8]) -> Option<Self::Buffer>;

    fn submit_draw(&mut self, draw: DrawCall<Self::Buffer>);
}

/// A range of instances in a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mesh<B> {
    pub buffer: B,
    pub instance_count: u32,
    pub base_instance: u32,
}

/// Everything the backend needs to draw one pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCall<B> {
    pub pass: RenderPass,
    /// The radius by which the coverage processor expands each primitive.
    pub bloat: f64,
    pub mesh: Mesh<B>,
    /// The area the draw can touch, including bloat.
    pub bounds: Rect,
}

/// What [`draw_instances`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawOutcome {
    Submitted { instance_count: u32 },
    /// The backend does not support the pass.
    Unsupported,
    /// There were no instances to draw.
    Empty,
    /// The instance buffer could not be allocated, so nothing was drawn.
    AllocationFailed,
}

/// Uploads the records `pass` draws and submits them as a single mesh.
///
/// Unsupported passes and empty instance lists are skipped without allocating. A failed
/// allocation skips the draw.
pub fn draw_instances<B: Backend + ?Sized>(
    backend: &mut B,
    pass: RenderPass,
    instances: &Instances,
    config: &Config,
) -> DrawOutcome {
    if !backend.supports_pass(pass) {
        debug!("Skipping {pass}, not supported by the backend");
        return DrawOutcome::Unsupported;
    }
    let count = instances.count(pass);
    if count == 0 {
        return DrawOutcome::Empty;
    }
    let Ok(instance_count) = u32::try_from(count) else {
        warn!("Too many instances for {pass}: {count}");
        return DrawOutcome::AllocationFailed;
    };
    let bytes = instances.bytes(pass);
    let Some(buffer) = backend.create_instance_buffer(bytes) else {
        warn!(
            "Failed to allocate {} bytes of instances for {pass}, skipping draw",
            bytes.len()
        );
        return DrawOutcome::AllocationFailed;
    };
    let bloat = config.bloat.max(0.0);
    let bounds = instance_bounds(pass, instances).inflate(bloat, bloat);
    backend.submit_draw(DrawCall {
        pass,
        bloat,
        mesh: Mesh {
            buffer,
            instance_count,
            base_instance: 0,
        },
        bounds,
    });
    DrawOutcome::Submitted { instance_count }
}

fn instance_bounds(pass: RenderPass, instances: &Instances) -> Rect {
    match pass.layout() {
        InstanceLayout::Triangle => {
            bounding_box(instances.triangles.iter().flat_map(|t| t.points()))
        }
        InstanceLayout::Cubic => bounding_box(instances.cubics.iter().flat_map(|c| c.points())),
    }
}

fn bounding_box(points: impl IntoIterator<Item = Point>) -> Rect {
    let mut points = points.into_iter();
    let Some(first) = points.next() else {
        return Rect::ZERO;
    };
    points.fold(Rect::from_points(first, first), |bounds, p| bounds.union_pt(p))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceId(pub NonZeroU64);

impl ResourceId {
    pub fn next() -> Self {
        // We initialize with 1 so that the conversion below succeeds
        static ID_COUNTER: AtomicU64 = AtomicU64::new(1);
        let id = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(id).unwrap_or(NonZeroU64::MIN))
    }
}

/// Proxy used as a handle to a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferProxy {
    pub size: u64,
    pub id: ResourceId,
    pub name: &'static str,
}

impl BufferProxy {
    pub fn new(size: u64, name: &'static str) -> Self {
        Self {
            size,
            id: ResourceId::next(),
            name,
        }
    }
}

/// Single command inside a [`Recording`].
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Commands the data to be uploaded to the given buffer.
    Upload(BufferProxy, Vec<u8>),
    Draw(DrawCall<BufferProxy>),
}

/// A [`Backend`] that records uploads and draws as a list of [`Command`]s.
///
/// It can be limited to a byte budget, past which allocations fail, and told that some
/// passes are unsupported. Tests and tooling use it in place of a device.
#[derive(Clone, Debug, Default)]
pub struct Recording {
    pub commands: Vec<Command>,
    budget: Option<u64>,
    allocated: u64,
    unsupported: Vec<RenderPass>,
}

impl Recording {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every allocation that would take the uploaded total past `bytes`.
    pub fn with_budget(mut self, bytes: u64) -> Self {
        self.budget = Some(bytes);
        self
    }

    pub fn with_unsupported(mut self, passes: impl IntoIterator<Item = RenderPass>) -> Self {
        self.unsupported.extend(passes);
        self
    }

    /// Appends a [`Command`] to the back of the [`Recording`].
    pub fn push(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    /// Commands to upload the given data to a new buffer with the given name.
    /// Returns a [`BufferProxy`] to the buffer.
    pub fn upload(&mut self, name: &'static str, data: impl Into<Vec<u8>>) -> BufferProxy {
        let data = data.into();
        let buf_proxy = BufferProxy::new(data.len() as u64, name);
        self.allocated += buf_proxy.size;
        self.push(Command::Upload(buf_proxy, data));
        buf_proxy
    }

    /// The draws recorded so far.
    pub fn draws(&self) -> impl Iterator<Item = &DrawCall<BufferProxy>> + '_ {
        self.commands.iter().filter_map(|cmd| match cmd {
            Command::Draw(draw) => Some(draw),
            Command::Upload(..) => None,
        })
    }

    /// Total bytes uploaded so far.
    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    /// Forgets the recorded commands and resets the allocated total.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.allocated = 0;
    }
}

impl Backend for Recording {
    type Buffer = BufferProxy;

    fn supports_pass(&self, pass: RenderPass) -> bool {
        !self.unsupported.contains(&pass)
    }

    fn create_instance_buffer(&mut self, bytes: &[u8]) -> Option<BufferProxy> {
        let size = bytes.len() as u64;
        if let Some(budget) = self.budget {
            if self.allocated.saturating_add(size) > budget {
                return None;
            }
        }
        Some(self.upload("instances", bytes))
    }

    fn submit_draw(&mut self, draw: DrawCall<BufferProxy>) {
        self.push(Command::Draw(draw));
    }
}
