//! Processor graphs: composite processors built from child processors.
//!
//! A graph owns an ordered list of children and a set of internal
//! connections. Its lifecycle methods delegate to the children:
//!
//! 1. `connect` walks the children in order, feeding each the settings of
//!    whatever feeds its inputs, then derives the graph's output settings.
//! 2. `start` starts the children in reverse order, so a consumer is running
//!    before anything that feeds it.
//! 3. `process` walks the children in order, routing data from sources to
//!    destinations, and finishes once every child has finished.
//!
//! Child order is an authoring contract: a child must come after every child
//! that produces one of its inputs. The order is checked when the graph is
//! built but never rearranged.

use crate::dataflow::connection::Connection;
use crate::dataflow::data::{Data, DataMap, PortSettings, Settings};
use crate::dataflow::error::{DataflowError, DataflowResult};
use crate::dataflow::linear;
use crate::dataflow::path::ProcessorPath;
use crate::dataflow::port::{PortDescriptor, PortRef};
use crate::dataflow::processor::{Processor, ProcessorCore};
use std::collections::{BTreeSet, HashMap, HashSet};

/// What a graph does when one of its children fails during `process`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Return the error to the caller.
    #[default]
    Propagate,
    /// Log the error and return no output for this call. Children after the
    /// failing one are skipped until the next call.
    LogAndContinue,
}

/// A processor within a graph: the graph itself or one of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Node {
    Graph,
    Child(usize),
}

/// A resolved port inside a graph. Whether `Node::Graph` denotes an input or
/// an output follows from the role: sources are graph inputs, destinations
/// are graph outputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct Endpoint {
    node: Node,
    port: String,
}

impl Endpoint {
    fn graph(port: &str) -> Self {
        Self {
            node: Node::Graph,
            port: port.to_string(),
        }
    }

    fn child(index: usize, port: &str) -> Self {
        Self {
            node: Node::Child(index),
            port: port.to_string(),
        }
    }
}

/// A processor composed of child processors.
pub struct Graph<T> {
    core: ProcessorCore,
    processors: Vec<Box<dyn Processor<T>>>,
    connections: Vec<Connection>,
    by_name: HashMap<String, usize>,
    /// Destination → source.
    sources: HashMap<Endpoint, Endpoint>,
    /// Connected input ports of each child, in port declaration order.
    child_destinations: Vec<Vec<String>>,
    unfinished: BTreeSet<usize>,
    error_policy: ErrorPolicy,
}

impl<T: Clone + Send + 'static> Graph<T> {
    pub fn builder(name: impl Into<String>) -> GraphBuilder<T> {
        GraphBuilder::new(name)
    }

    fn new(
        core: ProcessorCore,
        mut processors: Vec<Box<dyn Processor<T>>>,
        connections: Vec<Connection>,
        error_policy: ErrorPolicy,
    ) -> DataflowResult<Self> {
        check_processors(&core, &processors)?;

        for processor in processors.iter_mut() {
            processor.attach(core.path());
        }

        let by_name: HashMap<String, usize> = processors
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name().to_string(), i))
            .collect();

        let mut graph = Self {
            core,
            processors,
            connections: Vec::new(),
            by_name,
            sources: HashMap::new(),
            child_destinations: Vec::new(),
            unfinished: BTreeSet::new(),
            error_policy,
        };

        graph.sources = graph.check_connections(&connections)?;
        graph.child_destinations = graph
            .processors
            .iter()
            .enumerate()
            .map(|(i, p)| {
                p.input_ports()
                    .iter()
                    .filter(|port| graph.sources.contains_key(&Endpoint::child(i, port.name())))
                    .map(|port| port.name().to_string())
                    .collect()
            })
            .collect();
        graph.connections = connections;

        tracing::debug!(
            processor = %graph.core.path(),
            processors = graph.processors.len(),
            connections = graph.connections.len(),
            "graph built"
        );

        Ok(graph)
    }

    // ── Accessors ──

    pub fn processors(&self) -> impl Iterator<Item = &dyn Processor<T>> {
        self.processors.iter().map(|p| p.as_ref())
    }

    pub fn processor(&self, name: &str) -> Option<&dyn Processor<T>> {
        self.by_name.get(name).map(|&i| self.processors[i].as_ref())
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    /// Number of children that have not yet finished. Only meaningful once
    /// the graph has started.
    pub fn unfinished_count(&self) -> usize {
        self.unfinished.len()
    }

    // ── Topology validation ──

    fn resolve_source(&self, port: &PortRef) -> Option<Endpoint> {
        if port.processor == self.core.name() {
            self.core.input_port(&port.port)?;
            Some(Endpoint::graph(&port.port))
        } else {
            let &index = self.by_name.get(&port.processor)?;
            self.processors[index]
                .core()
                .output_port(&port.port)?;
            Some(Endpoint::child(index, &port.port))
        }
    }

    fn resolve_destination(&self, port: &PortRef) -> Option<Endpoint> {
        if port.processor == self.core.name() {
            self.core.output_port(&port.port)?;
            Some(Endpoint::graph(&port.port))
        } else {
            let &index = self.by_name.get(&port.processor)?;
            self.processors[index]
                .core()
                .input_port(&port.port)?;
            Some(Endpoint::child(index, &port.port))
        }
    }

    fn check_connections(
        &self,
        connections: &[Connection],
    ) -> DataflowResult<HashMap<Endpoint, Endpoint>> {
        let path = self.core.path();
        let mut sources = HashMap::new();

        for c in connections {
            let source = self.resolve_source(&c.source).ok_or_else(|| {
                DataflowError::topology(path, format!("unrecognized connection source {}", c.source))
            })?;

            let destination = self.resolve_destination(&c.destination).ok_or_else(|| {
                DataflowError::topology(
                    path,
                    format!("unrecognized connection destination {}", c.destination),
                )
            })?;

            match (source.node, destination.node) {
                (Node::Graph, Node::Graph) => {
                    return Err(DataflowError::topology(
                        path,
                        format!(
                            "direct connection from graph input port \"{}\" to graph output \
                             port \"{}\" is not supported",
                            source.port, destination.port
                        ),
                    ));
                }
                (Node::Child(s), Node::Child(d)) if s == d => {
                    return Err(DataflowError::topology(
                        path,
                        format!(
                            "connection from processor \"{}\" output port \"{}\" to input port \
                             \"{}\" of the same processor",
                            c.source.processor, source.port, destination.port
                        ),
                    ));
                }
                (Node::Child(s), Node::Child(d)) if s > d => {
                    return Err(DataflowError::topology(
                        path,
                        format!(
                            "processor \"{}\" precedes processor \"{}\", which produces one of \
                             its inputs; processors must be listed so that producers come \
                             before consumers",
                            c.destination.processor, c.source.processor
                        ),
                    ));
                }
                _ => {}
            }

            if sources.contains_key(&destination) {
                return Err(DataflowError::topology(
                    path,
                    format!(
                        "connection destination {} is specified in more than one connection",
                        c.destination
                    ),
                ));
            }

            sources.insert(destination, source);
        }

        let mut unconnected: Vec<String> = Vec::new();
        for port in self.core.output_ports() {
            if !sources.contains_key(&Endpoint::graph(port.name())) {
                unconnected.push(PortRef::new(self.core.name(), port.name()).to_string());
            }
        }
        for (i, processor) in self.processors.iter().enumerate() {
            for port in processor.input_ports().iter().filter(|p| p.connection_required) {
                if !sources.contains_key(&Endpoint::child(i, port.name())) {
                    unconnected.push(PortRef::new(processor.name(), port.name()).to_string());
                }
            }
        }
        if !unconnected.is_empty() {
            return Err(DataflowError::topology(
                path,
                format!(
                    "required connection destinations {{{}}} are unconnected; all processor \
                     input ports that require input and all graph output ports must be connected",
                    unconnected.join(", ")
                ),
            ));
        }

        Ok(sources)
    }

    // ── Routing ──

    fn run_children(&mut self, input: DataMap<T>) -> DataflowResult<DataMap<T>> {
        let mut source_data: HashMap<Endpoint, Data<T>> = input
            .into_iter()
            .map(|(port, data)| (Endpoint::graph(&port), data))
            .collect();

        for (i, processor) in self.processors.iter_mut().enumerate() {
            if processor.is_finished() {
                // A finished child keeps reporting finished, empty outputs.
                for port in processor.output_ports() {
                    source_data.insert(Endpoint::child(i, port.name()), Data::end());
                }
                continue;
            }

            let mut child_input = DataMap::new();
            for port in &self.child_destinations[i] {
                let source = self.sources.get(&Endpoint::child(i, port));
                if let Some(data) = source.and_then(|s| source_data.get(s)) {
                    child_input.insert(port.clone(), data.clone());
                }
            }

            let output = processor.process(child_input)?;
            for (port, data) in output {
                source_data.insert(Endpoint::child(i, &port), data);
            }

            if processor.is_finished() {
                self.unfinished.remove(&i);
            }
        }

        if self.unfinished.is_empty() {
            self.core.finish();
        }

        let mut output = DataMap::new();
        for port in self.core.output_ports() {
            let source = self.sources.get(&Endpoint::graph(port.name()));
            if let Some(data) = source.and_then(|s| source_data.remove(s)) {
                output.insert(port.name().to_string(), data);
            }
        }
        Ok(output)
    }

    /// Connect the children in order and derive the graph's output settings.
    fn connect_children(&mut self, input_settings: &PortSettings) -> DataflowResult<PortSettings> {
        let mut source_settings: HashMap<Endpoint, Settings> = input_settings
            .iter()
            .map(|(port, settings)| (Endpoint::graph(port), settings.clone()))
            .collect();

        for (i, processor) in self.processors.iter_mut().enumerate() {
            let mut child_settings = PortSettings::new();
            for port in &self.child_destinations[i] {
                let source = self.sources.get(&Endpoint::child(i, port));
                if let Some(settings) = source.and_then(|s| source_settings.get(s)) {
                    child_settings.insert(port.clone(), settings.clone());
                }
            }

            processor.connect(child_settings)?;

            for port in processor.output_ports() {
                if let Some(settings) = processor.output_settings(port.name()) {
                    source_settings.insert(Endpoint::child(i, port.name()), settings.clone());
                }
            }
        }

        let mut output_settings = PortSettings::new();
        for port in self.core.output_ports() {
            let source = self.sources.get(&Endpoint::graph(port.name()));
            let settings = source
                .and_then(|s| source_settings.get(s))
                .cloned()
                .ok_or_else(|| {
                    DataflowError::validation(
                        self.core.path(),
                        format!(
                            "no settings reach graph output port \"{}\"; its source is fed by \
                             an unconnected graph input",
                            port.name()
                        ),
                    )
                })?;
            output_settings.insert(port.name().to_string(), settings);
        }
        Ok(output_settings)
    }
}

impl<T: Clone + Send + 'static> Processor<T> for Graph<T> {
    fn core(&self) -> &ProcessorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ProcessorCore {
        &mut self.core
    }

    fn attach(&mut self, parent: &ProcessorPath) {
        let path = self.core.path().reparent(parent);
        self.core.set_path(path);
        for processor in self.processors.iter_mut() {
            processor.attach(self.core.path());
        }
    }

    fn connect_outputs(&mut self, input_settings: &PortSettings) -> DataflowResult<PortSettings> {
        let result = self.connect_children(input_settings);
        if result.is_err() {
            for processor in self.processors.iter_mut() {
                processor.disconnect();
            }
        }
        result
    }

    fn disconnect(&mut self) {
        self.core.disconnect();
        for processor in self.processors.iter_mut() {
            processor.disconnect();
        }
    }

    fn on_start(&mut self) -> DataflowResult<()> {
        for processor in self.processors.iter_mut().rev() {
            processor.start()?;
        }
        self.unfinished = (0..self.processors.len()).collect();
        Ok(())
    }

    fn process_data(&mut self, input: DataMap<T>) -> DataflowResult<DataMap<T>> {
        match self.error_policy {
            ErrorPolicy::Propagate => self.run_children(input),
            ErrorPolicy::LogAndContinue => match self.run_children(input) {
                Ok(output) => Ok(output),
                Err(e) => {
                    tracing::warn!(
                        processor = %self.core.path(),
                        error = %e,
                        "Processor raised error; continuing with next call"
                    );
                    Ok(DataMap::new())
                }
            },
        }
    }
}

fn check_processors<T>(
    core: &ProcessorCore,
    processors: &[Box<dyn Processor<T>>],
) -> DataflowResult<()> {
    let mut names = HashSet::new();

    for p in processors {
        let name = p.name();

        if name == core.name() {
            return Err(DataflowError::topology(
                core.path(),
                format!(
                    "processor \"{}\" has the same name as its graph; the names of a graph \
                     and its processors must all be unique",
                    name
                ),
            ));
        }

        if !names.insert(name.to_string()) {
            return Err(DataflowError::topology(
                core.path(),
                format!(
                    "two processors have the same name \"{}\"; the names of a graph and its \
                     processors must all be unique",
                    name
                ),
            ));
        }
    }

    Ok(())
}

// ==================== Builder ====================

/// Assembles a [`Graph`] from ports, children and connections.
///
/// ```ignore
/// let graph = Graph::builder("Affine Transformer")
///     .input(PortDescriptor::input(INPUT))
///     .output(PortDescriptor::output(OUTPUT))
///     .processor(scaler)
///     .processor(offsetter)
///     .build_linear()?;
/// ```
pub struct GraphBuilder<T> {
    name: String,
    inputs: Vec<PortDescriptor>,
    outputs: Vec<PortDescriptor>,
    processors: Vec<Box<dyn Processor<T>>>,
    connections: Vec<Connection>,
    error_policy: ErrorPolicy,
}

impl<T: Clone + Send + 'static> GraphBuilder<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            processors: Vec::new(),
            connections: Vec::new(),
            error_policy: ErrorPolicy::default(),
        }
    }

    pub fn input(mut self, port: PortDescriptor) -> Self {
        self.inputs.push(port);
        self
    }

    pub fn output(mut self, port: PortDescriptor) -> Self {
        self.outputs.push(port);
        self
    }

    /// Append a child. Children run in the order they are added.
    pub fn processor(self, processor: impl Processor<T> + 'static) -> Self {
        self.boxed_processor(Box::new(processor))
    }

    pub fn boxed_processor(mut self, processor: Box<dyn Processor<T>>) -> Self {
        self.processors.push(processor);
        self
    }

    pub fn processors(mut self, processors: impl IntoIterator<Item = Box<dyn Processor<T>>>) -> Self {
        self.processors.extend(processors);
        self
    }

    pub fn connect(mut self, source: PortRef, destination: PortRef) -> Self {
        self.connections.push(Connection::new(source, destination));
        self
    }

    pub fn connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Build with the explicitly declared connections.
    pub fn build(self) -> DataflowResult<Graph<T>> {
        let core = ProcessorCore::new(self.name, self.inputs, self.outputs);
        Graph::new(core, self.processors, self.connections, self.error_policy)
    }

    /// Build a linear graph, deriving the connections from child order.
    pub fn build_linear(self) -> DataflowResult<Graph<T>> {
        let core = ProcessorCore::new(self.name, self.inputs, self.outputs);
        if !self.connections.is_empty() {
            return Err(DataflowError::topology(
                core.path(),
                "connections of a linear graph are derived from its processor order and \
                 cannot be declared explicitly",
            ));
        }
        let connections = linear::chain_connections(&core, &self.processors)?;
        Graph::new(core, self.processors, connections, self.error_policy)
    }
}
