//! Process-wide processor registry.
//!
//! Concrete processor types are registered once at startup (each
//! collaborator crate ships a `register()` routine; the core's own
//! builtins go through [`register_builtins`]). Registration validates the
//! id pattern and rejects collisions between distinct types; looking up by
//! id and enumerating by capability are read-only thereafter.
//!
//! The registry holds *descriptors*, not instances. Types that can be
//! built without arguments also register a factory so pipelines can be
//! assembled from textual descriptions (CLI chains, presets); types
//! needing constructor arguments (file decoders, encoders) register
//! without one and are constructed directly in code.

use std::sync::{LazyLock, RwLock};

use crate::array::ArrayDecoder;
use crate::error::{Error, Result};
use crate::processor::{Capability, SharedProcessor};

/// Metadata describing one registered processor type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorDescriptor {
    /// The processor id (`^[a-z][_a-z0-9]*$`).
    pub id: &'static str,
    /// Rust type name, used in collision diagnostics.
    pub type_name: &'static str,
    /// The role the type fulfills.
    pub capability: Capability,
    /// One-line description.
    pub description: &'static str,
}

/// Factory for default-constructible processor types.
pub type ProcessorFactory = fn() -> SharedProcessor;

/// A registration: descriptor plus optional factory.
#[derive(Debug, Clone, Copy)]
pub struct RegistryEntry {
    /// The type's metadata.
    pub descriptor: ProcessorDescriptor,
    /// Builds a fresh instance, when the type needs no arguments.
    pub factory: Option<ProcessorFactory>,
}

/// Mapping from processor id to registered type.
///
/// Normally used through the module-level functions backed by the shared
/// process-wide instance; constructible standalone so collision semantics
/// stay testable in isolation.
#[derive(Debug, Default)]
pub struct ProcessorRegistry {
    entries: Vec<RegistryEntry>,
}

impl ProcessorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a processor type.
    ///
    /// Fails with [`Error::MalformedId`] when the id violates the naming
    /// pattern and with [`Error::DuplicateId`] when a *different* type
    /// already holds the id. Re-registering the same type is a no-op, so
    /// startup routines may run more than once.
    pub fn register(&mut self, entry: RegistryEntry) -> Result<()> {
        let id = entry.descriptor.id;
        if !is_valid_id(id) {
            return Err(Error::malformed_id(entry.descriptor.type_name, id));
        }
        if let Some(existing) = self.entries.iter().find(|e| e.descriptor.id == id) {
            if existing.descriptor.type_name == entry.descriptor.type_name {
                return Ok(());
            }
            return Err(Error::duplicate_id(
                id,
                existing.descriptor.type_name,
                entry.descriptor.type_name,
            ));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Look up a descriptor by id.
    pub fn get(&self, id: &str) -> Result<ProcessorDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| e.descriptor)
            .ok_or_else(|| Error::not_found(id))
    }

    /// Instantiate a registered type by id.
    ///
    /// Fails with [`Error::NotFound`] for unknown ids and with
    /// [`Error::UnsupportedOperation`] for types that need constructor
    /// arguments.
    pub fn create(&self, id: &str) -> Result<SharedProcessor> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .ok_or_else(|| Error::not_found(id))?;
        match entry.factory {
            Some(factory) => Ok(factory()),
            None => Err(Error::unsupported_operation(
                id,
                "type requires constructor arguments and cannot be built from the registry",
            )),
        }
    }

    /// Descriptors of every registered type matching a capability, sorted
    /// by id.
    ///
    /// `capability: None` returns everything. With `recurse` the match
    /// includes specializations (a `ValueAnalyzer` answers for
    /// `Analyzer`); without it only exact capability matches.
    pub fn all(&self, capability: Option<Capability>, recurse: bool) -> Vec<ProcessorDescriptor> {
        let mut found: Vec<ProcessorDescriptor> = self
            .entries
            .iter()
            .map(|e| e.descriptor)
            .filter(|d| match capability {
                None => true,
                Some(wanted) if recurse => d.capability.is_a(wanted),
                Some(wanted) => d.capability == wanted,
            })
            .collect();
        found.sort_by_key(|d| d.id);
        found
    }

    /// Whether an id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.descriptor.id == id)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub(crate) fn is_valid_id(id: &str) -> bool {
    let mut chars = id.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

static REGISTRY: LazyLock<RwLock<ProcessorRegistry>> =
    LazyLock::new(|| RwLock::new(ProcessorRegistry::new()));

/// Register a processor type in the process-wide registry.
pub fn register(entry: RegistryEntry) -> Result<()> {
    REGISTRY
        .write()
        .expect("processor registry lock poisoned")
        .register(entry)
}

/// Look up a descriptor in the process-wide registry.
pub fn get(id: &str) -> Result<ProcessorDescriptor> {
    REGISTRY
        .read()
        .expect("processor registry lock poisoned")
        .get(id)
}

/// Instantiate a registered type from the process-wide registry.
pub fn create(id: &str) -> Result<SharedProcessor> {
    REGISTRY
        .read()
        .expect("processor registry lock poisoned")
        .create(id)
}

/// Enumerate process-wide registrations by capability (see
/// [`ProcessorRegistry::all`]).
pub fn all(capability: Option<Capability>, recurse: bool) -> Vec<ProcessorDescriptor> {
    REGISTRY
        .read()
        .expect("processor registry lock poisoned")
        .all(capability, recurse)
}

/// Register the core's own processor types (the in-memory
/// [`ArrayDecoder`]).
pub fn register_builtins() -> Result<()> {
    register(RegistryEntry {
        descriptor: ProcessorDescriptor {
            id: ArrayDecoder::ID,
            type_name: "ArrayDecoder",
            capability: Capability::Decoder,
            description: "Source backed by an in-memory sample array",
        },
        factory: None,
    })
}
