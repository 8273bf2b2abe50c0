//! Table of execution-plan node factories, keyed by node name.
//!
//! The bridge does not run plans. The table only records which node kinds
//! exist and checks how many inputs each accepts, so that a plan assembled by
//! the host can be validated before it is handed to an engine.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;
use tracing::debug;

/// Node kinds known to the default registry.
#[derive(Clone, Copy, Debug, Display, EnumIter, EnumString, Eq, Hash, PartialEq)]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    Source,
    Fetch,
    Filter,
    OrderBy,
    PivotLonger,
    Project,
    Union,
    Aggregate,
    Sink,
    #[strum(serialize = "hashjoin")]
    HashJoin,
    #[strum(serialize = "asofjoin")]
    AsofJoin,
    SortedMerge,
}

/// Number of inputs a node accepts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    #[must_use]
    pub fn accepts(self, num_inputs: usize) -> bool {
        match self {
            Self::Exactly(n) => num_inputs == n,
            Self::AtLeast(n) => num_inputs >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "exactly {}", n),
            Self::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

impl NodeKind {
    #[must_use]
    pub fn arity(self) -> Arity {
        match self {
            Self::Source => Arity::Exactly(0),
            Self::Fetch
            | Self::Filter
            | Self::OrderBy
            | Self::PivotLonger
            | Self::Project
            | Self::Aggregate
            | Self::Sink => Arity::Exactly(1),
            Self::HashJoin => Arity::Exactly(2),
            Self::AsofJoin => Arity::AtLeast(2),
            Self::Union | Self::SortedMerge => Arity::AtLeast(1),
        }
    }
}

/// A validated description of one plan node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeDeclaration {
    pub kind: NodeKind,
    pub num_inputs: usize,
    pub options: Value,
}

pub type ExecFactory = fn(usize, Value) -> Result<NodeDeclaration, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("factory {0:?} is already registered")]
    AlreadyRegistered(String),
    #[error("no factory named {0:?}")]
    NotFound(String),
    #[error("{kind} node takes {expected} inputs, got {actual}")]
    InvalidInputs {
        kind: NodeKind,
        expected: Arity,
        actual: usize,
    },
}

/// Maps node names to the factories that declare them.
#[derive(Debug, Default)]
pub struct ExecFactoryRegistry {
    factories: HashMap<String, ExecFactory>,
}

impl ExecFactoryRegistry {
    /// # Errors
    ///
    /// Returns an error if a factory is already registered under `name`.
    pub fn add_factory(
        &mut self,
        name: impl Into<String>,
        factory: ExecFactory,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if no factory is registered under `name`.
    pub fn get_factory(&self, name: &str) -> Result<ExecFactory, RegistryError> {
        self.factories
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Looks up `name` and calls its factory.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is unknown or the factory rejects its inputs.
    pub fn declare(
        &self,
        name: &str,
        num_inputs: usize,
        options: Value,
    ) -> Result<NodeDeclaration, RegistryError> {
        let factory = self.get_factory(name)?;
        factory(num_inputs, options)
    }

    /// Returns the registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

fn declare_node(
    kind: NodeKind,
    num_inputs: usize,
    options: Value,
) -> Result<NodeDeclaration, RegistryError> {
    let expected = kind.arity();
    if !expected.accepts(num_inputs) {
        return Err(RegistryError::InvalidInputs {
            kind,
            expected,
            actual: num_inputs,
        });
    }
    Ok(NodeDeclaration {
        kind,
        num_inputs,
        options,
    })
}

macro_rules! register_node {
    ($(#[$doc:meta])* $fn_name:ident, $kind:expr) => {
        $(#[$doc])*
        ///
        /// # Errors
        ///
        /// Returns an error if the name is already taken in `registry`.
        pub fn $fn_name(registry: &mut ExecFactoryRegistry) -> Result<(), RegistryError> {
            registry.add_factory($kind.to_string(), |num_inputs, options| {
                declare_node($kind, num_inputs, options)
            })
        }
    };
}

register_node!(
    /// Registers the `source` node, which takes no inputs.
    register_source_node,
    NodeKind::Source
);
register_node!(register_fetch_node, NodeKind::Fetch);
register_node!(register_filter_node, NodeKind::Filter);
register_node!(register_order_by_node, NodeKind::OrderBy);
register_node!(register_pivot_longer_node, NodeKind::PivotLonger);
register_node!(register_project_node, NodeKind::Project);
register_node!(
    /// Registers the `union` node, which takes one or more inputs.
    register_union_node,
    NodeKind::Union
);
register_node!(register_aggregate_node, NodeKind::Aggregate);
register_node!(register_sink_node, NodeKind::Sink);
register_node!(register_hash_join_node, NodeKind::HashJoin);
register_node!(
    /// Registers the `asofjoin` node, which takes a left input and one or
    /// more right inputs.
    register_asof_join_node,
    NodeKind::AsofJoin
);
register_node!(register_sorted_merge_node, NodeKind::SortedMerge);

type Registrar = fn(&mut ExecFactoryRegistry) -> Result<(), RegistryError>;

const REGISTRARS: [Registrar; 12] = [
    register_source_node,
    register_fetch_node,
    register_filter_node,
    register_order_by_node,
    register_pivot_longer_node,
    register_project_node,
    register_union_node,
    register_aggregate_node,
    register_sink_node,
    register_hash_join_node,
    register_asof_join_node,
    register_sorted_merge_node,
];

/// Returns the process-wide registry holding every built-in node factory.
///
/// The table is filled on first use and never changes afterwards.
pub fn default_exec_factory_registry() -> &'static ExecFactoryRegistry {
    static DEFAULT: OnceLock<ExecFactoryRegistry> = OnceLock::new();
    DEFAULT.get_or_init(|| {
        let mut registry = ExecFactoryRegistry::default();
        for register in REGISTRARS {
            let result = register(&mut registry);
            debug_assert!(result.is_ok(), "built-in node names are distinct");
        }
        debug!(factories = registry.len(), "initialized node factory registry");
        registry
    })
}
