use std::fs::File;
use std::io::{self, BufWriter, Cursor, Read, Write};
use std::path::Path;

use memmap2::Mmap;
use rayon::prelude::*;

use crate::archive::{InputArchive, OutputArchive};
use crate::config::ArchiveConfig;
use crate::error::{GraphcodeError, Result};
use crate::factory::ClassFactory;
use crate::graph::{Handle, ObjectGraph};
use crate::nvp::nvp;
use crate::stream::{BinaryInStream, BinaryOutStream};

/// Name of the entry-point field of every archive.
const ROOT_FIELD: &str = "root";

/// A graph rebuilt from an archive, with its entry point.
#[derive(Debug)]
pub struct Restored {
    /// Every object read from the archive.
    pub graph: ObjectGraph,
    /// The entry point the archive was written from.
    pub root: Handle,
}

/// The main entry point for saving and loading whole object graphs.
///
/// Each call runs one archive session: the root is written as a polymorphic
/// reference, so everything reachable from it follows, once per object.
#[derive(Debug)]
pub struct Graphcode;

impl Graphcode {
    /// Serializes the graph reachable from `root` into a byte vector.
    pub fn to_bytes(graph: &ObjectGraph, root: Handle) -> Result<Vec<u8>> {
        Self::to_bytes_with(graph, root, ArchiveConfig::default())
    }

    /// Serializes with explicit options.
    pub fn to_bytes_with(graph: &ObjectGraph, root: Handle, config: ArchiveConfig) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        Self::write_to_writer(&mut buffer, graph, root, config)?;
        Ok(buffer)
    }

    /// Serializes into any writer. Returns the number of objects written.
    pub fn write_to_writer<W: Write>(
        writer: W,
        graph: &ObjectGraph,
        root: Handle,
        config: ArchiveConfig,
    ) -> Result<u64> {
        let mut stream = BinaryOutStream::new(writer);
        let mut archive = OutputArchive::with_config(&mut stream, graph, config);
        archive.write_polymorphic_ref(nvp(ROOT_FIELD, &root))?;
        archive.finish()
    }

    /// Rebuilds a graph from bytes produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8], factory: &ClassFactory) -> Result<Restored> {
        Self::from_bytes_with(bytes, factory, ArchiveConfig::default())
    }

    /// Rebuilds with explicit options.
    pub fn from_bytes_with(
        bytes: &[u8],
        factory: &ClassFactory,
        config: ArchiveConfig,
    ) -> Result<Restored> {
        Self::read_from_reader(Cursor::new(bytes), factory, config)
    }

    /// Rebuilds a graph from any reader.
    pub fn read_from_reader<R: Read>(
        reader: R,
        factory: &ClassFactory,
        config: ArchiveConfig,
    ) -> Result<Restored> {
        let mut stream = BinaryInStream::new(reader);
        let mut graph = ObjectGraph::new();
        let mut root = None;

        let mut archive = InputArchive::with_config(&mut stream, factory, &mut graph, config);
        archive.read_polymorphic_ref(nvp(ROOT_FIELD, &mut root))?;
        archive.finish();

        let root = root.ok_or_else(|| GraphcodeError::Format("archive root is null".into()))?;
        Ok(Restored { graph, root })
    }

    /// Saves the graph reachable from `root` to a file.
    pub fn save<P: AsRef<Path>>(path: P, graph: &ObjectGraph, root: Handle) -> Result<()> {
        Self::save_with(path, graph, root, ArchiveConfig::default())
    }

    /// Saves with explicit options.
    pub fn save_with<P: AsRef<Path>>(
        path: P,
        graph: &ObjectGraph,
        root: Handle,
        config: ArchiveConfig,
    ) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let objects = Self::write_to_writer(BufWriter::new(file), graph, root, config)?;
        tracing::debug!(path = %path.display(), objects, "saved archive");
        Ok(())
    }

    /// Loads a file written by [`save`](Self::save).
    pub fn load<P: AsRef<Path>>(path: P, factory: &ClassFactory) -> Result<Restored> {
        Self::load_with(path, factory, ArchiveConfig::default())
    }

    /// Loads with explicit options. The file is memory-mapped.
    pub fn load_with<P: AsRef<Path>>(
        path: P,
        factory: &ClassFactory,
        config: ArchiveConfig,
    ) -> Result<Restored> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "archive file is empty").into());
        }

        // Safety: the map is read-only and dropped before returning. Concurrent
        // modification of the file by another process is not guarded against.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };

        Self::from_bytes_with(&mmap, factory, config)
    }

    /// Loads several independent archives in parallel, sharing one factory.
    ///
    /// Results come back in the order of `paths`; one failure does not stop
    /// the other sessions.
    pub fn load_many<P: AsRef<Path> + Sync>(
        paths: &[P],
        factory: &ClassFactory,
    ) -> Vec<Result<Restored>> {
        paths
            .par_iter()
            .map(|path| Self::load(path, factory))
            .collect()
    }
}
