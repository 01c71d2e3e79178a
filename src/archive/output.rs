use std::collections::HashSet;

use serde::Serialize;

use super::{RefKind, VERSION_FIELD};
use crate::config::ArchiveConfig;
use crate::error::{GraphcodeError, Result};
use crate::factory::{SENTINEL, validate_class_name};
use crate::field::{ArchiveEnum, Field, ReferenceField};
use crate::graph::{Handle, ObjectGraph};
use crate::nvp::{NameValue, NvpFlags};
use crate::object::ArchiveFields;
use crate::registry::{NULL_ID, WriteRegistry};
use crate::stream::OutStream;

/// The write side of an archive session.
///
/// Binds one [`OutStream`], the [`ObjectGraph`] that reference fields point
/// into, and a fresh [`WriteRegistry`]. Every object reached through a
/// reference field is written in full the first time and as a back-reference
/// (`"oID"`, id) afterwards.
pub struct OutputArchive<'a> {
    stream: &'a mut dyn OutStream,
    graph: &'a ObjectGraph,
    registry: WriteRegistry,
    config: ArchiveConfig,
    cut: HashSet<Handle>,
}

impl<'a> OutputArchive<'a> {
    /// Opens a session with the default [`ArchiveConfig`].
    pub fn new(stream: &'a mut dyn OutStream, graph: &'a ObjectGraph) -> Self {
        Self::with_config(stream, graph, ArchiveConfig::default())
    }

    /// Opens a session with explicit options.
    pub fn with_config(
        stream: &'a mut dyn OutStream,
        graph: &'a ObjectGraph,
        config: ArchiveConfig,
    ) -> Self {
        tracing::debug!(objects = graph.len(), ?config, "opening output archive");
        Self {
            stream,
            graph,
            registry: WriteRegistry::new(),
            config,
            cut: HashSet::new(),
        }
    }

    /// The options of this session.
    pub fn config(&self) -> ArchiveConfig {
        self.config
    }

    /// The graph reference fields are resolved against.
    pub fn graph(&self) -> &'a ObjectGraph {
        self.graph
    }

    /// Direct access to the primitive stream, for custom [`Field`] impls.
    pub fn stream(&mut self) -> &mut dyn OutStream {
        &mut *self.stream
    }

    /// Writes every later reference to `handle` as the null reference.
    pub fn cut_pointer(&mut self, handle: Handle) {
        self.cut.insert(handle);
    }

    /// Number of object ids assigned so far.
    pub fn objects_written(&self) -> u64 {
        self.registry.objects_registered()
    }

    /// Writes a value field.
    pub fn write<T: Field + ?Sized>(&mut self, nv: NameValue<'_, &T>) -> Result<()> {
        let (name, _, value) = nv.into_parts();
        value.write_field(self, name)
    }

    /// Writes an enum as its `i32` projection.
    pub fn write_enum<E: ArchiveEnum>(&mut self, nv: NameValue<'_, &E>) -> Result<()> {
        self.stream.write_i32(nv.value().to_i32())
    }

    /// Writes a per-type version tag. No-op when versions are disabled.
    pub fn write_version(&mut self, version: i32) -> Result<()> {
        if !self.config.use_versions {
            return Ok(());
        }
        self.write(NameValue::new(VERSION_FIELD, &version))
    }

    /// Writes any serde value as a length-prefixed bincode blob.
    pub fn write_serde<T: Serialize + ?Sized>(&mut self, nv: NameValue<'_, &T>) -> Result<()> {
        let bytes = bincode::serde::encode_to_vec(nv.value(), bincode::config::standard())?;
        self.stream.write_bytes(&bytes)
    }

    /// Opens an array of `count` elements: writes the length prefix.
    pub fn begin_array(&mut self, _name: &str, count: usize, _element_class: &str) -> Result<()> {
        self.stream.write_u64(count as u64)
    }

    /// Separator hook between two elements. Writes nothing in binary.
    pub fn between_array_elements(&mut self, _count: usize, _element_class: &str) -> Result<()> {
        Ok(())
    }

    /// Closes an array. Writes nothing in binary.
    pub fn end_array(&mut self, _count: usize, _element_class: &str) -> Result<()> {
        Ok(())
    }

    /// Writes an embedded object through its own field writer.
    ///
    /// With [`NvpFlags::TRACK_OBJECT`] the object consumes an object id first,
    /// exactly as the reader will. Embedded values are always written in
    /// full and never become the target of a back-reference.
    pub fn write_object<O: ArchiveFields + ?Sized>(&mut self, nv: NameValue<'_, &O>) -> Result<()> {
        let (_, flags, object) = nv.into_parts();
        if flags.contains(NvpFlags::TRACK_OBJECT) {
            self.registry.register_embedded();
        }
        object.write_fields(self)
    }

    /// Writes a polymorphic reference: class name, constructor args and
    /// fields for a new object, `("oID", id)` for one already written.
    pub fn write_polymorphic_ref<R: ReferenceField + ?Sized>(
        &mut self,
        nv: NameValue<'_, &R>,
    ) -> Result<()> {
        let (name, _, reference) = nv.into_parts();
        reference.write_reference(self, name, RefKind::Polymorphic)
    }

    /// Writes a statically typed reference: like
    /// [`write_polymorphic_ref`](Self::write_polymorphic_ref) with an empty
    /// class name.
    pub fn write_ref<R: ReferenceField + ?Sized>(&mut self, nv: NameValue<'_, &R>) -> Result<()> {
        let (name, _, reference) = nv.into_parts();
        reference.write_reference(self, name, RefKind::Static)
    }

    /// Flushes the stream and closes the session.
    ///
    /// Returns the number of object ids assigned.
    pub fn finish(self) -> Result<u64> {
        self.stream.flush()?;
        let objects = self.registry.objects_registered();
        tracing::debug!(objects, "closed output archive");
        Ok(objects)
    }

    /// Writes one envelope for `target`.
    pub(crate) fn write_envelope(&mut self, target: Option<Handle>, kind: RefKind) -> Result<()> {
        let target =
            target.filter(|handle| !self.config.cut_all_pointers && !self.cut.contains(handle));
        let Some(handle) = target else {
            return self.write_back_reference(NULL_ID);
        };

        // Register before recursing: a cycle back to this object must find it.
        let (already_inserted, id) = self.registry.register_on_write(handle);
        if already_inserted {
            tracing::trace!(id, %handle, "writing back-reference");
            return self.write_back_reference(id);
        }

        let graph = self.graph;
        let object = graph.get(handle)?;
        let class_name = match kind {
            RefKind::Polymorphic => {
                let class_name = object.class_name();
                validate_class_name(class_name)
                    .map_err(|reason| GraphcodeError::construction(class_name, reason))?;
                class_name
            }
            RefKind::Static => "",
        };
        tracing::trace!(id, %handle, class = object.class_name(), ?kind, "writing new object");

        self.stream.write_str(class_name)?;
        object.write_constructor_args(self)?;
        object.write_fields(self)
    }

    fn write_back_reference(&mut self, id: u64) -> Result<()> {
        self.stream.write_str(SENTINEL)?;
        self.stream.write_u64(id)
    }
}

impl std::fmt::Debug for OutputArchive<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputArchive")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("cut", &self.cut)
            .finish_non_exhaustive()
    }
}
