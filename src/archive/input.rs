use serde::de::DeserializeOwned;

use super::VERSION_FIELD;
use crate::config::ArchiveConfig;
use crate::error::{GraphcodeError, Result};
use crate::factory::{ClassFactory, Constructor, SENTINEL, construct_boxed};
use crate::field::{ArchiveEnum, Field, ReferenceField};
use crate::graph::{Handle, ObjectGraph};
use crate::nvp::{NameValue, NvpFlags};
use crate::object::{ArchiveFields, Constructible};
use crate::registry::ReadRegistry;
use crate::stream::InStream;

/// The read side of an archive session, mirroring [`OutputArchive`](crate::OutputArchive).
///
/// Objects rebuilt from reference fields are inserted into the bound
/// [`ObjectGraph`] and registered at the next sequential id before their
/// fields are read, so back-references met further down resolve to them.
pub struct InputArchive<'a> {
    stream: &'a mut dyn InStream,
    factory: &'a ClassFactory,
    graph: &'a mut ObjectGraph,
    registry: ReadRegistry,
    config: ArchiveConfig,
}

impl<'a> InputArchive<'a> {
    /// Opens a session with the default [`ArchiveConfig`].
    pub fn new(
        stream: &'a mut dyn InStream,
        factory: &'a ClassFactory,
        graph: &'a mut ObjectGraph,
    ) -> Self {
        Self::with_config(stream, factory, graph, ArchiveConfig::default())
    }

    /// Opens a session with explicit options. `config.use_versions` must match
    /// the writer's.
    pub fn with_config(
        stream: &'a mut dyn InStream,
        factory: &'a ClassFactory,
        graph: &'a mut ObjectGraph,
        config: ArchiveConfig,
    ) -> Self {
        tracing::debug!(classes = factory.len(), ?config, "opening input archive");
        Self {
            stream,
            factory,
            graph,
            registry: ReadRegistry::new(),
            config,
        }
    }

    /// The options of this session.
    pub fn config(&self) -> ArchiveConfig {
        self.config
    }

    /// The graph rebuilt objects are inserted into.
    pub fn graph(&self) -> &ObjectGraph {
        &*self.graph
    }

    /// Direct access to the primitive stream, for custom [`Field`] impls.
    pub fn stream(&mut self) -> &mut dyn InStream {
        &mut *self.stream
    }

    /// Number of object ids registered so far.
    pub fn objects_read(&self) -> u64 {
        self.registry.objects_registered()
    }

    /// Reads a value field in place.
    pub fn read<T: Field + ?Sized>(&mut self, nv: NameValue<'_, &mut T>) -> Result<()> {
        let (name, _, value) = nv.into_parts();
        value.read_field(self, name)
    }

    /// Reads an enum from its `i32` projection.
    ///
    /// # Errors
    /// Returns [`GraphcodeError::Format`] if no variant has the stored value.
    pub fn read_enum<E: ArchiveEnum>(&mut self, nv: NameValue<'_, &mut E>) -> Result<()> {
        let (name, _, value) = nv.into_parts();
        let raw = self.stream.read_i32()?;
        *value = E::from_i32(raw).ok_or_else(|| {
            GraphcodeError::Format(format!("field '{name}': {raw} is not a valid enum value"))
        })?;
        Ok(())
    }

    /// Reads a per-type version tag. Returns 0 when versions are disabled.
    pub fn read_version(&mut self) -> Result<i32> {
        let mut version = 0;
        if self.config.use_versions {
            self.read(NameValue::new(VERSION_FIELD, &mut version))?;
        }
        Ok(version)
    }

    /// Reads a serde value written by
    /// [`OutputArchive::write_serde`](crate::OutputArchive::write_serde).
    pub fn read_serde<T: DeserializeOwned>(&mut self, nv: NameValue<'_, &mut T>) -> Result<()> {
        let (_, _, value) = nv.into_parts();
        let bytes = self.stream.read_bytes()?;
        let (decoded, _) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
        *value = decoded;
        Ok(())
    }

    /// Opens an array and returns its element count. The caller sizes its
    /// container before requesting elements.
    pub fn begin_array(&mut self, name: &str) -> Result<usize> {
        let count = self.stream.read_u64()?;
        usize::try_from(count).map_err(|_| {
            GraphcodeError::Format(format!("array '{name}': length {count} does not fit in usize"))
        })
    }

    /// Separator hook between two elements. Reads nothing in binary.
    pub fn between_array_elements(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    /// Closes an array. Reads nothing in binary.
    pub fn end_array(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    /// Reads an embedded object through its own field reader.
    ///
    /// With [`NvpFlags::TRACK_OBJECT`] the object consumes the next id before
    /// its fields are read. A back-reference to that id is a
    /// [`GraphcodeError::Format`] error.
    pub fn read_object<O: ArchiveFields + ?Sized>(&mut self, nv: NameValue<'_, &mut O>) -> Result<()> {
        let (_, flags, object) = nv.into_parts();
        if flags.contains(NvpFlags::TRACK_OBJECT) {
            self.registry.register_embedded();
        }
        object.read_fields(self)
    }

    /// Reads a polymorphic reference. New objects are created through the
    /// [`ClassFactory`] from the class name on the wire.
    ///
    /// # Errors
    /// - [`GraphcodeError::Construction`] if the class is not registered.
    /// - [`GraphcodeError::DanglingReference`] for an unknown back-reference id.
    pub fn read_polymorphic_ref<R: ReferenceField + ?Sized>(
        &mut self,
        nv: NameValue<'_, &mut R>,
    ) -> Result<()> {
        let (name, _, reference) = nv.into_parts();
        reference.read_reference(self, name, None)
    }

    /// Reads a statically typed reference. New objects are always built
    /// through `T`'s constructor, whatever class name the envelope carries.
    pub fn read_ref<T: Constructible, R: ReferenceField + ?Sized>(
        &mut self,
        nv: NameValue<'_, &mut R>,
    ) -> Result<()> {
        let (name, _, reference) = nv.into_parts();
        reference.read_reference(self, name, Some(construct_boxed::<T>))
    }

    /// Closes the session.
    ///
    /// Returns the number of object ids registered.
    pub fn finish(self) -> u64 {
        let objects = self.registry.objects_registered();
        tracing::debug!(objects, graph = self.graph.len(), "closed input archive");
        objects
    }

    /// Reads one envelope: a back-reference or a new object.
    pub(crate) fn read_envelope(&mut self, constructor: Option<Constructor>) -> Result<Option<Handle>> {
        let token = self.stream.read_string()?;
        if token == SENTINEL {
            let id = self.stream.read_u64()?;
            tracing::trace!(id, "resolving back-reference");
            return self.registry.resolve_on_read(id);
        }

        let constructor = match constructor {
            Some(constructor) => constructor,
            None => self.factory.constructor(&token).ok_or_else(|| {
                tracing::warn!(class = %token, "class is not registered in the factory");
                GraphcodeError::construction(&token, "class is not registered in the factory")
            })?,
        };

        // The writer numbered this object before its constructor arguments,
        // so the id is taken before they are read.
        let id = self.registry.reserve();
        let object = constructor(self)?;
        let class = object.class_name();
        let handle = self.graph.insert_boxed(object);
        self.registry.fill(id, handle)?;
        tracing::trace!(id, %handle, class, "reading new object");

        self.populate(handle)?;
        Ok(Some(handle))
    }

    fn populate(&mut self, handle: Handle) -> Result<()> {
        let mut object = self.graph.take(handle)?;
        let result = object.read_fields(self);
        self.graph.restore(handle, object)?;
        result
    }
}

impl std::fmt::Debug for InputArchive<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputArchive")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("graph", &self.graph.len())
            .finish_non_exhaustive()
    }
}
