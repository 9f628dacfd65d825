//! Connection derivation for linear graphs.
//!
//! A linear graph is a chain: graph input (if any) → first processor →
//! second processor → … → last processor → graph output (if any). The graph
//! and every processor may have at most one input and one output port.

use crate::dataflow::connection::Connection;
use crate::dataflow::error::{DataflowError, DataflowResult};
use crate::dataflow::port::PortRef;
use crate::dataflow::processor::{Processor, ProcessorCore};

/// Derive the connections of a chain from processor order.
///
/// An empty processor list yields no connections.
pub(crate) fn chain_connections<T>(
    graph: &ProcessorCore,
    processors: &[Box<dyn Processor<T>>],
) -> DataflowResult<Vec<Connection>> {
    let fail = |message: String| {
        Err(DataflowError::topology(
            graph.path(),
            format!("cannot create linear connections: {}", message),
        ))
    };

    let (Some(first), Some(last)) = (processors.first(), processors.last()) else {
        return Ok(Vec::new());
    };

    if graph.input_ports().len() > 1 {
        return fail("graph has more than one input port".to_string());
    }
    if graph.output_ports().len() > 1 {
        return fail("graph has more than one output port".to_string());
    }
    for p in processors {
        if p.input_ports().len() > 1 {
            return fail(format!("processor \"{}\" has more than one input port", p.name()));
        }
        if p.output_ports().len() > 1 {
            return fail(format!("processor \"{}\" has more than one output port", p.name()));
        }
    }

    let mut connections = Vec::with_capacity(processors.len() + 1);

    match (graph.input_ports().first(), first.input_ports().first()) {
        (None, None) => {}
        (None, Some(_)) => {
            return fail(format!(
                "graph has no input ports but first processor \"{}\" has one",
                first.name()
            ));
        }
        (Some(_), None) => {
            return fail(format!(
                "graph has one input port but first processor \"{}\" has none",
                first.name()
            ));
        }
        (Some(graph_input), Some(input)) => connections.push(Connection::new(
            PortRef::new(graph.name(), graph_input.name()),
            PortRef::new(first.name(), input.name()),
        )),
    }

    for pair in processors.windows(2) {
        let (source, destination) = (&pair[0], &pair[1]);
        let Some(output) = source.output_ports().first() else {
            return fail(format!("processor \"{}\" has no output ports", source.name()));
        };
        let Some(input) = destination.input_ports().first() else {
            return fail(format!("processor \"{}\" has no input ports", destination.name()));
        };
        connections.push(Connection::new(
            PortRef::new(source.name(), output.name()),
            PortRef::new(destination.name(), input.name()),
        ));
    }

    match (last.output_ports().first(), graph.output_ports().first()) {
        (None, None) => {}
        (Some(_), None) => {
            return fail(format!(
                "graph has no output ports but last processor \"{}\" has one",
                last.name()
            ));
        }
        (None, Some(_)) => {
            return fail(format!(
                "graph has one output port but last processor \"{}\" has none",
                last.name()
            ));
        }
        (Some(output), Some(graph_output)) => connections.push(Connection::new(
            PortRef::new(last.name(), output.name()),
            PortRef::new(graph.name(), graph_output.name()),
        )),
    }

    Ok(connections)
}
