//! Processor-graph dataflow engine.
//!
//! Data flows in batches through processors connected port to port. A graph
//! is itself a processor, so graphs nest.
//!
//! # Architecture
//!
//! ```text
//! [Source] ──► [Transform] ──► [Transform] ──► [Sink]
//!                   └──────────────────────────► [Sink]
//! ```
//!
//! # Design
//!
//! - **Four-state lifecycle**: `connect` → `start` → `process`… → finished,
//!   enforced by the provided methods of [`Processor`].
//! - **Fixed child order**: a graph runs its children in construction order
//!   on every call; there is no scheduler and no threading.
//! - **Fan-out, no fan-in**: a source port may feed many destinations, a
//!   destination is fed by exactly one source.
//! - **Paths, not back-pointers**: a child knows its place in the hierarchy
//!   only through its [`ProcessorPath`].

pub mod connection;
pub mod data;
pub mod error;
pub mod graph;
mod linear;
pub mod path;
pub mod port;
pub mod processor;
pub mod shapes;

pub use connection::Connection;
pub use data::{Data, DataMap, PortSettings, SettingValue, Settings};
pub use error::{BoxError, DataflowError, DataflowResult};
pub use graph::{ErrorPolicy, Graph, GraphBuilder};
pub use path::ProcessorPath;
pub use port::{PortDescriptor, PortDirection, PortRef, INPUT, OUTPUT};
pub use processor::{data_map, port_settings, Operation, Processor, ProcessorCore, ProcessorState};
pub use shapes::{
    ItemMap, ItemSink, ItemSource, ItemTransform, Itemwise, OneToOne, Sink, SinkProcessor, Source,
    SourceProcessor, StageResult, Transform, TransformProcessor,
};
