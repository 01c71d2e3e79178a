//! Name-keyed registry of constructors for polymorphic reads.
//!
//! Populate a [`ClassFactory`] once at start-up and pass it by reference to
//! every input archive. After population it is only read, and it is
//! `Send + Sync`, so parallel input sessions can share one factory.

use std::collections::HashMap;

use crate::archive::InputArchive;
use crate::error::{GraphcodeError, Result};
use crate::object::{Archivable, Constructible};

/// The token that marks a back-reference on the wire.
///
/// It lives in the class-name namespace, so it can never be registered.
pub const SENTINEL: &str = "oID";

/// Builds a fresh instance, consuming any constructor arguments from the archive.
pub type Constructor = fn(&mut InputArchive<'_>) -> Result<Box<dyn Archivable>>;

/// Registry mapping class names to constructors.
#[derive(Debug, Default, Clone)]
pub struct ClassFactory {
    constructors: HashMap<String, Constructor>,
}

impl ClassFactory {
    /// Creates an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under [`Constructible::CLASS_NAME`].
    ///
    /// # Errors
    /// Returns [`GraphcodeError::Registration`] if the name is reserved or taken.
    pub fn register<T: Constructible>(&mut self) -> Result<()> {
        self.register_with(T::CLASS_NAME, construct_boxed::<T>)
    }

    /// Registers an explicit constructor under `class_name`.
    pub fn register_with(&mut self, class_name: &str, constructor: Constructor) -> Result<()> {
        validate_class_name(class_name).map_err(GraphcodeError::Registration)?;
        if self.constructors.contains_key(class_name) {
            return Err(GraphcodeError::Registration(format!(
                "class '{class_name}' is already registered"
            )));
        }
        self.constructors.insert(class_name.to_owned(), constructor);
        Ok(())
    }

    /// Returns the constructor registered under `class_name`.
    pub fn constructor(&self, class_name: &str) -> Option<Constructor> {
        self.constructors.get(class_name).copied()
    }

    /// Creates an instance of `class_name`, reading its constructor arguments
    /// from `ar`.
    ///
    /// # Errors
    /// Returns [`GraphcodeError::Construction`] for unregistered names, or
    /// whatever the constructor itself reports.
    pub fn create(&self, class_name: &str, ar: &mut InputArchive<'_>) -> Result<Box<dyn Archivable>> {
        let constructor = self.constructor(class_name).ok_or_else(|| {
            GraphcodeError::construction(class_name, "class is not registered in the factory")
        })?;
        constructor(ar)
    }

    /// Returns true if `class_name` is registered.
    pub fn contains(&self, class_name: &str) -> bool {
        self.constructors.contains_key(class_name)
    }

    /// Returns the registered class names, in no particular order.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Returns the number of registered classes.
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Returns true if no class is registered.
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

/// Checks that a class name can appear in a polymorphic envelope.
///
/// The empty string marks statically typed objects and [`SENTINEL`] marks
/// back-references, so neither can name a class.
pub(crate) fn validate_class_name(class_name: &str) -> std::result::Result<(), String> {
    if class_name.is_empty() {
        return Err("the empty class name is reserved for statically typed references".into());
    }
    if class_name == SENTINEL {
        return Err(format!("'{SENTINEL}' is reserved for back-references"));
    }
    Ok(())
}

pub(crate) fn construct_boxed<T: Constructible>(ar: &mut InputArchive<'_>) -> Result<Box<dyn Archivable>> {
    Ok(Box::new(T::construct(ar)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::OutputArchive;
    use crate::graph::ObjectGraph;
    use crate::object::ArchiveFields;
    use crate::stream::BinaryInStream;

    #[derive(Debug, Default)]
    struct Probe;

    impl ArchiveFields for Probe {
        fn write_fields(&self, _ar: &mut OutputArchive<'_>) -> Result<()> {
            Ok(())
        }
        fn read_fields(&mut self, _ar: &mut InputArchive<'_>) -> Result<()> {
            Ok(())
        }
    }

    impl Archivable for Probe {
        fn class_name(&self) -> &'static str {
            Self::CLASS_NAME
        }
    }

    impl Constructible for Probe {
        const CLASS_NAME: &'static str = "test::Probe";
        fn construct(_ar: &mut InputArchive<'_>) -> Result<Self> {
            Ok(Self)
        }
    }

    #[test]
    fn registers_by_class_name() -> Result<()> {
        let mut factory = ClassFactory::new();
        factory.register::<Probe>()?;
        assert!(factory.contains("test::Probe"));
        assert!(factory.constructor("test::Probe").is_some());
        assert_eq!(factory.class_names().collect::<Vec<_>>(), vec!["test::Probe"]);
        assert_eq!(factory.len(), 1);
        Ok(())
    }

    #[test]
    fn rejects_duplicates() -> Result<()> {
        let mut factory = ClassFactory::new();
        factory.register::<Probe>()?;
        assert!(matches!(
            factory.register::<Probe>(),
            Err(GraphcodeError::Registration(_))
        ));
        Ok(())
    }

    #[test]
    fn rejects_reserved_names() {
        let mut factory = ClassFactory::new();
        assert!(matches!(
            factory.register_with(SENTINEL, construct_boxed::<Probe>),
            Err(GraphcodeError::Registration(_))
        ));
        assert!(matches!(
            factory.register_with("", construct_boxed::<Probe>),
            Err(GraphcodeError::Registration(_))
        ));
        assert!(factory.is_empty());
    }

    #[test]
    fn creates_registered_classes_only() -> Result<()> {
        let mut factory = ClassFactory::new();
        factory.register::<Probe>()?;

        let mut stream = BinaryInStream::new(std::io::empty());
        let mut graph = ObjectGraph::new();
        let mut ar = InputArchive::new(&mut stream, &factory, &mut graph);

        let object = factory.create("test::Probe", &mut ar)?;
        assert_eq!(object.class_name(), "test::Probe");
        assert!(matches!(
            factory.create("test::Missing", &mut ar),
            Err(GraphcodeError::Construction { .. })
        ));
        Ok(())
    }
}
