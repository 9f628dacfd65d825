//! Connections between ports inside a graph.

use crate::dataflow::port::PortRef;
use std::fmt;

/// An edge from a source port to a destination port.
///
/// A source is a graph input or a child output; a destination is a child
/// input or a graph output. Connections are owned by their graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    pub source: PortRef,
    pub destination: PortRef,
}

impl Connection {
    pub fn new(source: PortRef, destination: PortRef) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Connect the conventional output of `from` to the conventional input
    /// of `to`.
    pub fn between(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(PortRef::output_of(from), PortRef::input_of(to))
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}
