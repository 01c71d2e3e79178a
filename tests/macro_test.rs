#![allow(missing_docs)]

use graphcode::{
    ArchiveEnum, ArchiveFields, Archivable, BinaryInStream, BinaryOutStream, ClassFactory,
    Graphcode, GraphcodeError, Handle, InputArchive, ObjectGraph, OutputArchive, Result, nvp,
};
use std::io::Cursor;

#[derive(ArchiveEnum, Default, Debug, Clone, Copy, PartialEq)]
enum Mode {
    #[default]
    Idle,
    Running = 5,
    Stopped = -2,
}

#[derive(Archivable, Default, Debug, PartialEq)]
#[archive(embedded)]
struct Frame {
    x: f64,
    y: f64,
}

#[derive(Archivable, Default, Debug)]
#[archive(class = "macro::Marker")]
struct Marker {
    id: u16,
}

#[derive(Archivable, Default, Debug)]
#[archive(class = "macro::Body", version = 2)]
struct Body {
    #[archive(name = "body_name")]
    name: String,
    mode: Mode,
    history: Vec<Mode>,
    #[archive(object, track)]
    frame: Frame,
    #[archive(polymorphic)]
    markers: Vec<Handle>,
    initial: char,
    active: bool,
}

/// No class attribute: the type name is the class name.
#[derive(Archivable, Default, Debug)]
struct Plain {
    #[archive(ctor)]
    seed: i64,
    #[archive(ctor)]
    label: String,
    counter: usize,
}

fn factory() -> ClassFactory {
    let mut factory = ClassFactory::new();
    factory.register::<Marker>().expect("register Marker");
    factory.register::<Body>().expect("register Body");
    factory.register::<Plain>().expect("register Plain");
    factory
}

#[test]
fn test_enum_projection() {
    assert_eq!(Mode::Idle.to_i32(), 0);
    assert_eq!(Mode::Running.to_i32(), 5);
    assert_eq!(Mode::Stopped.to_i32(), -2);
    assert_eq!(Mode::from_i32(-2), Some(Mode::Stopped));
    assert_eq!(Mode::from_i32(1), None);
}

#[test]
fn test_derived_struct_round_trip() -> Result<()> {
    let mut graph = ObjectGraph::new();
    let marker = graph.insert(Marker { id: 11 });
    let root = graph.insert(Body {
        name: "pendulum".into(),
        mode: Mode::Running,
        history: vec![Mode::Idle, Mode::Stopped, Mode::Running],
        frame: Frame { x: 1.0, y: -4.5 },
        markers: vec![marker, marker],
        initial: 'ψ',
        active: true,
    });

    let mut buffer = Vec::new();
    // Body, its tracked frame, then the marker.
    let objects = Graphcode::write_to_writer(&mut buffer, &graph, root, Default::default())?;
    assert_eq!(objects, 3);

    let restored = Graphcode::from_bytes(&buffer, &factory())?;
    let body = restored.graph.get_as::<Body>(restored.root)?;
    assert_eq!(body.name, "pendulum");
    assert_eq!(body.mode, Mode::Running);
    assert_eq!(body.history, vec![Mode::Idle, Mode::Stopped, Mode::Running]);
    assert_eq!(body.frame, Frame { x: 1.0, y: -4.5 });
    assert_eq!(body.initial, 'ψ');
    assert!(body.active);

    assert_eq!(body.markers.len(), 2);
    assert_eq!(body.markers[0], body.markers[1]);
    assert_eq!(restored.graph.get_as::<Marker>(body.markers[0])?.id, 11);
    assert_eq!(restored.graph.len(), 2);
    Ok(())
}

#[test]
fn test_default_class_name_and_ctor_fields() -> Result<()> {
    let mut graph = ObjectGraph::new();
    let root = graph.insert(Plain {
        seed: -9,
        label: "ctor".into(),
        counter: 4,
    });
    assert_eq!(graph.get(root)?.class_name(), "Plain");

    let restored = Graphcode::from_bytes(&Graphcode::to_bytes(&graph, root)?, &factory())?;
    let plain = restored.graph.get_as::<Plain>(restored.root)?;
    assert_eq!(plain.seed, -9);
    assert_eq!(plain.label, "ctor");
    assert_eq!(plain.counter, 4);
    Ok(())
}

#[test]
fn test_embedded_derive_only_writes_fields() -> Result<()> {
    let graph = ObjectGraph::new();
    let frame = Frame { x: 2.0, y: 3.0 };

    let mut stream = BinaryOutStream::new(Vec::new());
    let mut out = OutputArchive::new(&mut stream, &graph);
    frame.write_fields(&mut out)?;
    out.finish()?;
    assert_eq!(stream.bytes_written(), 16);
    Ok(())
}

#[test]
fn test_invalid_enum_value() -> Result<()> {
    let graph = ObjectGraph::new();
    let mut stream = BinaryOutStream::new(Vec::new());
    let mut out = OutputArchive::new(&mut stream, &graph);
    out.write(nvp("mode", &7i32))?;
    out.finish()?;

    let factory = ClassFactory::new();
    let mut restored = ObjectGraph::new();
    let mut input_stream = BinaryInStream::new(Cursor::new(stream.into_inner()));
    let mut input = InputArchive::new(&mut input_stream, &factory, &mut restored);
    let mut mode = Mode::Idle;
    let result = input.read(nvp("mode", &mut mode));
    assert!(matches!(result, Err(GraphcodeError::Format(_))));
    assert_eq!(mode, Mode::Idle);
    Ok(())
}
