//! Processor abstraction and lifecycle.
//!
//! Every processor moves through four states, strictly forward:
//!
//! ```text
//! Unconnected ──connect──► Connected ──start──► Running ──process…──► Finished
//! ```
//!
//! - **`connect`** negotiates stream metadata: it receives settings for the
//!   processor's connected inputs and fixes the settings of all of its outputs.
//! - **`start`** acquires resources.
//! - **`process`** exchanges one chunk per port, repeatedly, until the processor
//!   decides it is finished.
//!
//! The lifecycle methods are provided by the [`Processor`] trait and do all
//! call-discipline checking. Implementations customize behaviour through the
//! hooks [`Processor::connect_outputs`], [`Processor::on_start`] and
//! [`Processor::process_data`], and keep their bookkeeping in a
//! [`ProcessorCore`].

use crate::dataflow::data::{Data, DataMap, PortSettings, Settings};
use crate::dataflow::error::{DataflowError, DataflowResult};
use crate::dataflow::path::ProcessorPath;
use crate::dataflow::port::PortDescriptor;
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle state of a processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProcessorState {
    Unconnected,
    Connected,
    Running,
    Finished,
}

impl fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessorState::Unconnected => "unconnected",
            ProcessorState::Connected => "connected",
            ProcessorState::Running => "running",
            ProcessorState::Finished => "finished",
        };
        write!(f, "{}", name)
    }
}

/// Lifecycle operation, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Connect,
    Start,
    Process,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Connect => "connect",
            Operation::Start => "start",
            Operation::Process => "process with",
        };
        write!(f, "{}", name)
    }
}

/// Identity, ports, state and per-port bookkeeping shared by all processors.
#[derive(Debug, Clone)]
pub struct ProcessorCore {
    path: ProcessorPath,
    inputs: Vec<PortDescriptor>,
    outputs: Vec<PortDescriptor>,
    state: ProcessorState,
    /// Settings of connected inputs only. Set by `connect`.
    input_settings: PortSettings,
    /// Settings of every output, connected or not. Set by `connect`.
    output_settings: PortSettings,
    /// Finished flag per connected input.
    input_finished: BTreeMap<String, bool>,
    /// Finished flag per output.
    output_finished: BTreeMap<String, bool>,
}

impl ProcessorCore {
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<PortDescriptor>,
        outputs: Vec<PortDescriptor>,
    ) -> Self {
        debug_assert!(inputs.iter().all(PortDescriptor::is_input));
        debug_assert!(outputs.iter().all(|p| !p.is_input()));
        Self {
            path: ProcessorPath::root(name),
            inputs,
            outputs,
            state: ProcessorState::Unconnected,
            input_settings: PortSettings::new(),
            output_settings: PortSettings::new(),
            input_finished: BTreeMap::new(),
            output_finished: BTreeMap::new(),
        }
    }

    // ── Identity ──

    pub fn name(&self) -> &str {
        self.path.name()
    }

    pub fn path(&self) -> &ProcessorPath {
        &self.path
    }

    pub fn set_path(&mut self, path: ProcessorPath) {
        self.path = path;
    }

    // ── Ports ──

    pub fn input_ports(&self) -> &[PortDescriptor] {
        &self.inputs
    }

    pub fn output_ports(&self) -> &[PortDescriptor] {
        &self.outputs
    }

    pub fn input_port(&self, name: &str) -> Option<&PortDescriptor> {
        self.inputs.iter().find(|p| p.name() == name)
    }

    pub fn output_port(&self, name: &str) -> Option<&PortDescriptor> {
        self.outputs.iter().find(|p| p.name() == name)
    }

    // ── State ──

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == ProcessorState::Finished
    }

    /// Transition a running processor to `Finished`. Has no effect in any
    /// other state.
    pub fn finish(&mut self) {
        if self.state == ProcessorState::Running {
            self.state = ProcessorState::Finished;
            tracing::debug!(processor = %self.path, "finished");
        }
    }

    /// Return to a state recorded before a failed `process` call.
    pub(crate) fn restore_state(&mut self, state: ProcessorState) {
        self.state = state;
    }

    /// Return a connected processor to `Unconnected`, discarding its
    /// settings. Has no effect in any other state.
    pub(crate) fn disconnect(&mut self) {
        if self.state == ProcessorState::Connected {
            self.state = ProcessorState::Unconnected;
            self.input_settings.clear();
            self.output_settings.clear();
            self.input_finished.clear();
            self.output_finished.clear();
            tracing::debug!(processor = %self.path, "disconnected");
        }
    }

    // ── Settings ──

    pub fn input_settings(&self, port: &str) -> Option<&Settings> {
        self.input_settings.get(port)
    }

    pub fn output_settings(&self, port: &str) -> Option<&Settings> {
        self.output_settings.get(port)
    }

    pub fn all_output_settings(&self) -> &PortSettings {
        &self.output_settings
    }

    /// Empty settings for every output port.
    pub fn empty_output_settings(&self) -> PortSettings {
        self.outputs
            .iter()
            .map(|p| (p.name().to_string(), Settings::new()))
            .collect()
    }

    /// Whether a connected input has reported the end of its stream.
    pub fn is_input_finished(&self, port: &str) -> bool {
        self.input_finished.get(port).copied().unwrap_or(false)
    }

    /// Whether every connected input has reported the end of its stream.
    pub fn all_inputs_finished(&self) -> bool {
        self.input_finished.values().all(|&f| f)
    }

    // ── Call discipline ──

    pub(crate) fn check_state(
        &self,
        operation: Operation,
        required: ProcessorState,
    ) -> DataflowResult<()> {
        if self.state != required {
            return Err(DataflowError::State {
                path: self.path.clone(),
                operation,
                state: self.state,
                required,
            });
        }
        Ok(())
    }

    pub(crate) fn check_input_settings(&self, input_settings: &PortSettings) -> DataflowResult<()> {
        for name in input_settings.keys() {
            if self.input_port(name).is_none() {
                return Err(DataflowError::validation(
                    &self.path,
                    format!("unrecognized input port name \"{}\" in input settings", name),
                ));
            }
        }

        for port in self.inputs.iter().filter(|p| p.connection_required) {
            if !input_settings.contains_key(port.name()) {
                return Err(DataflowError::validation(
                    &self.path,
                    format!(
                        "input settings not specified for port \"{}\", for which \
                         connection is required",
                        port.name()
                    ),
                ));
            }
        }

        Ok(())
    }

    pub(crate) fn complete_connect(
        &mut self,
        input_settings: PortSettings,
        output_settings: PortSettings,
    ) -> DataflowResult<()> {
        for name in output_settings.keys() {
            if self.output_port(name).is_none() {
                return Err(DataflowError::validation(
                    &self.path,
                    format!("output settings computed for unknown output port \"{}\"", name),
                ));
            }
        }
        for port in &self.outputs {
            if !output_settings.contains_key(port.name()) {
                return Err(DataflowError::validation(
                    &self.path,
                    format!("no output settings computed for output port \"{}\"", port.name()),
                ));
            }
        }

        self.input_finished = input_settings.keys().map(|k| (k.clone(), false)).collect();
        self.output_finished = self
            .outputs
            .iter()
            .map(|p| (p.name().to_string(), false))
            .collect();
        self.input_settings = input_settings;
        self.output_settings = output_settings;
        self.state = ProcessorState::Connected;

        tracing::debug!(processor = %self.path, "connected");
        Ok(())
    }

    pub(crate) fn complete_start(&mut self) {
        self.state = ProcessorState::Running;
        tracing::debug!(processor = %self.path, "started");
    }

    /// Validate input data against the finished flags and record newly
    /// finished inputs.
    pub(crate) fn accept_input<T>(&mut self, input: &DataMap<T>) -> DataflowResult<()> {
        for (name, data) in input {
            let Some(&finished) = self.input_finished.get(name) else {
                return Err(DataflowError::validation(
                    &self.path,
                    format!("input data received for unconnected or unknown port \"{}\"", name),
                ));
            };

            if finished {
                if !data.is_empty() {
                    return Err(DataflowError::validation(
                        &self.path,
                        format!("input items received for port \"{}\" after input finished", name),
                    ));
                }
                if !data.finished {
                    return Err(DataflowError::validation(
                        &self.path,
                        format!(
                            "input data for port \"{}\" indicate that input is not finished, \
                             but previous input data indicated that it was",
                            name
                        ),
                    ));
                }
            }
        }

        for (name, data) in input {
            if data.finished {
                self.input_finished.insert(name.clone(), true);
            }
        }

        Ok(())
    }

    /// Validate output data against the processor's ports and the output
    /// finished flags, and record newly finished outputs.
    pub(crate) fn accept_output<T>(&mut self, output: &DataMap<T>) -> DataflowResult<()> {
        for (name, data) in output {
            let Some(&finished) = self.output_finished.get(name) else {
                return Err(DataflowError::validation(
                    &self.path,
                    format!("output data produced for unknown port \"{}\"", name),
                ));
            };

            if finished && (!data.is_empty() || !data.finished) {
                return Err(DataflowError::validation(
                    &self.path,
                    format!("output data produced for port \"{}\" after output finished", name),
                ));
            }
        }

        for (name, data) in output {
            if data.finished {
                self.output_finished.insert(name.clone(), true);
            }
        }

        Ok(())
    }
}

/// A unit of computation with named input/output ports and a four-state
/// lifecycle.
///
/// Implement [`core`](Processor::core), [`core_mut`](Processor::core_mut) and
/// [`process_data`](Processor::process_data); override
/// [`connect_outputs`](Processor::connect_outputs) to propagate or derive
/// stream settings and [`on_start`](Processor::on_start) to acquire resources.
/// Call `self.core_mut().finish()` from `process_data` once processing is
/// complete; at the latest, this must happen in the first call in which every
/// input is finished and there is no more output to emit.
pub trait Processor<T>: Send {
    fn core(&self) -> &ProcessorCore;

    fn core_mut(&mut self) -> &mut ProcessorCore;

    /// Compute the settings of every output port from this processor's
    /// configuration and the settings of its connected inputs.
    ///
    /// The default gives every output empty settings.
    fn connect_outputs(&mut self, input_settings: &PortSettings) -> DataflowResult<PortSettings> {
        let _ = input_settings;
        Ok(self.core().empty_output_settings())
    }

    /// Acquire resources before processing begins.
    fn on_start(&mut self) -> DataflowResult<()> {
        Ok(())
    }

    /// Process one round of input data. Only called while running, with input
    /// that has already been validated.
    fn process_data(&mut self, input: DataMap<T>) -> DataflowResult<DataMap<T>>;

    /// Undo a completed `connect`, so that the processor can be connected
    /// again. Graphs call this on their children when connecting a later
    /// child fails.
    fn disconnect(&mut self) {
        self.core_mut().disconnect();
    }

    /// Place this processor under the graph at `parent`.
    fn attach(&mut self, parent: &ProcessorPath) {
        let path = self.core().path().reparent(parent);
        self.core_mut().set_path(path);
    }

    // ── Accessors ──

    fn name(&self) -> &str {
        self.core().name()
    }

    fn path(&self) -> &ProcessorPath {
        self.core().path()
    }

    fn state(&self) -> ProcessorState {
        self.core().state()
    }

    fn is_finished(&self) -> bool {
        self.core().is_finished()
    }

    fn input_ports(&self) -> &[PortDescriptor] {
        self.core().input_ports()
    }

    fn output_ports(&self) -> &[PortDescriptor] {
        self.core().output_ports()
    }

    fn output_settings(&self, port: &str) -> Option<&Settings> {
        self.core().output_settings(port)
    }

    // ── Lifecycle ──

    /// Fix input and output stream settings. `input_settings` has an entry
    /// for every input port that will receive data.
    fn connect(&mut self, input_settings: PortSettings) -> DataflowResult<()> {
        self.core()
            .check_state(Operation::Connect, ProcessorState::Unconnected)?;
        self.core().check_input_settings(&input_settings)?;
        let output_settings = self.connect_outputs(&input_settings)?;
        self.core_mut()
            .complete_connect(input_settings, output_settings)
    }

    fn start(&mut self) -> DataflowResult<()> {
        self.core()
            .check_state(Operation::Start, ProcessorState::Connected)?;
        self.on_start()?;
        self.core_mut().complete_start();
        Ok(())
    }

    /// Process input data and return output data, keyed by port name.
    ///
    /// A call that fails leaves the processor in the state it was in before
    /// the call, even if `process_data` finished it.
    fn process(&mut self, input: DataMap<T>) -> DataflowResult<DataMap<T>> {
        self.core()
            .check_state(Operation::Process, ProcessorState::Running)?;
        self.core_mut().accept_input(&input)?;
        let result = self.process_data(input).and_then(|output| {
            self.core_mut().accept_output(&output)?;
            Ok(output)
        });
        if result.is_err() {
            self.core_mut().restore_state(ProcessorState::Running);
        }
        result
    }
}

/// Build a single-entry data map.
pub fn data_map<T>(port: impl Into<String>, data: Data<T>) -> DataMap<T> {
    let mut map = DataMap::new();
    map.insert(port.into(), data);
    map
}

/// Build a single-entry port settings map.
pub fn port_settings(port: impl Into<String>, settings: Settings) -> PortSettings {
    let mut map = PortSettings::new();
    map.insert(port.into(), settings);
    map
}
