//! Port descriptors for the processor system.
//!
//! Each processor declares its ports (inputs/outputs) once, at construction.
//! Graphs use these to validate their connections.

use std::borrow::Cow;
use std::fmt;

/// Conventional name of a single input port.
pub const INPUT: &str = "Input";

/// Conventional name of a single output port.
pub const OUTPUT: &str = "Output";

/// Whether a port is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    Input,
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => write!(f, "input"),
            PortDirection::Output => write!(f, "output"),
        }
    }
}

/// Descriptor for one of a processor's ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    pub name: Cow<'static, str>,
    pub direction: PortDirection,
    /// Inputs only: whether the processor can run without this input wired.
    pub connection_required: bool,
}

impl PortDescriptor {
    /// A required input port.
    pub fn input(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Input,
            connection_required: true,
        }
    }

    /// An input port that may be left unconnected.
    pub fn optional_input(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Input,
            connection_required: false,
        }
    }

    pub fn output(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Output,
            connection_required: false,
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }
}

/// Names a port of a processor inside a graph: `(processor name, port name)`.
///
/// When the processor name is the enclosing graph's own name, the endpoint
/// refers to one of the graph's ports: an input when used as a connection
/// source, an output when used as a destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortRef {
    pub processor: String,
    pub port: String,
}

impl PortRef {
    pub fn new(processor: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            processor: processor.into(),
            port: port.into(),
        }
    }

    /// The conventional single input port of `processor`.
    pub fn input_of(processor: impl Into<String>) -> Self {
        Self::new(processor, INPUT)
    }

    /// The conventional single output port of `processor`.
    pub fn output_of(processor: impl Into<String>) -> Self {
        Self::new(processor, OUTPUT)
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "processor \"{}\" port \"{}\"", self.processor, self.port)
    }
}
