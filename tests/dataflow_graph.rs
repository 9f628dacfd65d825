//! Integration tests for graph construction and execution

mod common;

use clipflow::dataflow::{
    data_map, port_settings, Connection, Data, DataMap, DataflowError, DataflowResult,
    ErrorPolicy, Graph, ItemMap, PortDescriptor, PortRef, PortSettings, Processor, ProcessorCore,
    ProcessorState, Settings, SettingValue, StageResult, TransformProcessor, INPUT, OUTPUT,
};
use common::processors::{
    affine_transformer, collecting_sink, offsetter, range_source, scaler, CollectingSink,
};
use common::run_to_completion;
use proptest::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn chain(start: i64, end: i64, chunk: usize, scale: i64, offset: i64) -> Graph<i64> {
    Graph::builder("Chain")
        .output(PortDescriptor::output(OUTPUT))
        .processor(range_source("Source", start, end, chunk))
        .processor(scaler("Scale", scale))
        .processor(offsetter("Offset", offset))
        .build_linear()
        .unwrap()
}

fn running(mut graph: Graph<i64>) -> Graph<i64> {
    graph.connect(PortSettings::new()).unwrap();
    graph.start().unwrap();
    graph
}

#[test]
fn test_linear_chain_in_three_calls() {
    let mut graph = running(chain(0, 5, 2, 2, 1));

    let mut batches = Vec::new();
    while !graph.is_finished() {
        let mut output = graph.process(DataMap::new()).unwrap();
        let data = output.remove(OUTPUT).unwrap();
        batches.push((data.items, data.finished));
        assert!(batches.len() <= 3);
    }

    assert_eq!(
        batches,
        vec![
            (vec![1, 3], false),
            (vec![5, 7], false),
            (vec![9], true),
        ]
    );
    assert_eq!(graph.state(), ProcessorState::Finished);
    assert_eq!(graph.unfinished_count(), 0);
}

#[test]
fn test_process_after_finished_fails() {
    let mut graph = running(chain(0, 1, 4, 1, 0));
    run_to_completion(&mut graph, 5);

    let err = graph.process(DataMap::new()).unwrap_err();
    assert!(err.is_state_error());
}

#[test]
fn test_settings_flow_through_chain() {
    let mut graph = chain(0, 5, 2, 3, 4);
    graph.connect(PortSettings::new()).unwrap();

    let settings = graph.output_settings(OUTPUT).unwrap();
    assert_eq!(settings.get("count"), Some(&SettingValue::Int(5)));
    assert_eq!(settings.get("scale"), Some(&SettingValue::Int(3)));
    assert_eq!(settings.get("offset"), Some(&SettingValue::Int(4)));
}

#[test]
fn test_nested_graph() {
    let (sink, collected) = collecting_sink("Sink");
    let mut graph = running(
        Graph::builder("Outer")
            .processor(range_source("Source", 0, 4, 3))
            .processor(affine_transformer("Affine", 10, -1).unwrap())
            .processor(sink)
            .build_linear()
            .unwrap(),
    );

    let affine = graph.processor("Affine").unwrap();
    assert_eq!(affine.path().to_string(), "Outer/Affine");

    let (_, calls) = run_to_completion(&mut graph, 5);
    assert_eq!(calls, 2);
    assert_eq!(collected.items(), vec![-1, 9, 19, 29]);
    assert_eq!(collected.last_flags(), 1);
}

#[test]
fn test_standalone_transformer_graph() {
    let mut affine = affine_transformer("Affine", 2, 3).unwrap();
    affine
        .connect(port_settings(INPUT, Settings::new().with("count", 3i64)))
        .unwrap();
    affine.start().unwrap();

    let mut output = affine
        .process(data_map(INPUT, Data::new(vec![1, 2], false)))
        .unwrap();
    assert_eq!(output.remove(OUTPUT).unwrap().items, vec![5, 7]);
    assert!(!affine.is_finished());

    let mut output = affine
        .process(data_map(INPUT, Data::new(vec![10], true)))
        .unwrap();
    let data = output.remove(OUTPUT).unwrap();
    assert_eq!(data.items, vec![23]);
    assert!(data.finished);
    assert!(affine.is_finished());
}

#[test]
fn test_fan_out_and_early_finisher() {
    let (short_sink, short) = collecting_sink("Short Sink");
    let (long_sink, long) = collecting_sink("Long Sink");
    let (copy_sink, copy) = collecting_sink("Copy Sink");

    let mut graph = running(
        Graph::builder("Fan Out")
            .processor(range_source("Short", 0, 2, 2))
            .processor(range_source("Long", 100, 106, 2))
            .processor(short_sink)
            .processor(long_sink)
            .processor(copy_sink)
            .connection(Connection::between("Short", "Short Sink"))
            .connection(Connection::between("Long", "Long Sink"))
            .connection(Connection::between("Long", "Copy Sink"))
            .build()
            .unwrap(),
    );

    graph.process(DataMap::new()).unwrap();
    assert!(graph.processor("Short").unwrap().is_finished());
    assert!(graph.processor("Short Sink").unwrap().is_finished());
    assert!(!graph.is_finished());
    assert_eq!(graph.unfinished_count(), 3);

    let (_, calls) = run_to_completion(&mut graph, 5);
    assert_eq!(calls, 2);
    assert_eq!(short.items(), vec![0, 1]);
    assert_eq!(long.items(), vec![100, 101, 102, 103, 104, 105]);
    assert_eq!(copy.items(), long.items());
    assert_eq!(short.last_flags(), 1);
}

// ==================== Topology errors ====================

fn topology_message(result: Result<Graph<i64>, DataflowError>) -> String {
    match result {
        Err(e @ DataflowError::Topology { .. }) => e.to_string(),
        Err(e) => panic!("expected a topology error, got {}", e),
        Ok(_) => panic!("expected a topology error"),
    }
}

#[test]
fn test_unknown_connection_source() {
    let (sink, _) = collecting_sink("Sink");
    let message = topology_message(
        Graph::builder("G")
            .processor(sink)
            .connect(PortRef::output_of("Nowhere"), PortRef::input_of("Sink"))
            .build(),
    );
    assert!(message.contains("unrecognized connection source"));
}

#[test]
fn test_destination_fed_twice() {
    let (sink, _) = collecting_sink("Sink");
    let message = topology_message(
        Graph::builder("G")
            .processor(range_source("A", 0, 1, 1))
            .processor(range_source("B", 0, 1, 1))
            .processor(sink)
            .connection(Connection::between("A", "Sink"))
            .connection(Connection::between("B", "Sink"))
            .build(),
    );
    assert!(message.contains("more than one connection"));
}

#[test]
fn test_required_input_unconnected() {
    let (sink, _) = collecting_sink("Sink");
    let message = topology_message(
        Graph::builder("G")
            .processor(range_source("A", 0, 1, 1))
            .processor(sink)
            .build(),
    );
    assert!(message.contains("\"Sink\" port \"Input\""));
    assert!(message.contains("are unconnected"));
}

#[test]
fn test_consumer_listed_before_producer() {
    let (sink, _) = collecting_sink("Sink");
    let message = topology_message(
        Graph::builder("G")
            .processor(sink)
            .processor(range_source("A", 0, 1, 1))
            .connection(Connection::between("A", "Sink"))
            .build(),
    );
    assert!(message.contains("precedes"));
}

#[test]
fn test_duplicate_processor_names() {
    let message = topology_message(
        Graph::builder("G")
            .input(PortDescriptor::input(INPUT))
            .output(PortDescriptor::output(OUTPUT))
            .processor(scaler("Twice", 1))
            .processor(scaler("Twice", 2))
            .build_linear(),
    );
    assert!(message.contains("same name"));
}

#[test]
fn test_linear_graph_rejects_branching_processor() {
    let (sink, _) = collecting_sink("Sink");
    let message = topology_message(
        Graph::builder("G")
            .processor(range_source("A", 0, 1, 1))
            .processor(sink)
            .processor(scaler("After Sink", 1))
            .build_linear(),
    );
    assert!(message.contains("cannot create linear connections"));
}

// ==================== Error policy ====================

struct FailOn(i64);

impl ItemMap for FailOn {
    type Item = i64;

    fn map_item(&mut self, item: i64, _: bool) -> StageResult<i64> {
        if item == self.0 {
            return Err(format!("cannot handle {}", item).into());
        }
        Ok(item)
    }
}

/// Source 0..10 in pairs, through a transform that fails on the call carrying
/// item 3, into a collecting sink.
fn failing_graph(policy: ErrorPolicy) -> (Graph<i64>, CollectingSink) {
    let (sink, collected) = collecting_sink("Sink");
    let graph = Graph::builder("Failing")
        .processor(range_source("Source", 0, 10, 2))
        .processor(TransformProcessor::one_to_one("Picky", FailOn(3)))
        .processor(sink)
        .error_policy(policy)
        .build_linear()
        .unwrap();
    (graph, collected)
}

#[test]
fn test_processing_error_propagates() {
    let (graph, collected) = failing_graph(ErrorPolicy::Propagate);
    let mut graph = running(graph);
    graph.process(DataMap::new()).unwrap();

    match graph.process(DataMap::new()).unwrap_err() {
        DataflowError::Processing { path, source } => {
            assert_eq!(path.to_string(), "Failing/Picky");
            assert_eq!(source.to_string(), "cannot handle 3");
        }
        e => panic!("expected a processing error, got {}", e),
    }
    assert_eq!(collected.items(), vec![0, 1]);
}

#[test]
fn test_processing_error_logged_and_skipped() {
    let (graph, collected) = failing_graph(ErrorPolicy::LogAndContinue);
    let mut graph = running(graph);

    graph.process(DataMap::new()).unwrap();
    assert_eq!(collected.items(), vec![0, 1]);

    // The second call carries items 2 and 3 and fails inside "Picky".
    let output = graph.process(DataMap::new()).unwrap();
    assert!(output.is_empty());
    assert_eq!(collected.items(), vec![0, 1]);
    assert_eq!(graph.state(), ProcessorState::Running);
    assert_eq!(
        graph.processor("Picky").unwrap().state(),
        ProcessorState::Running
    );

    let (_, calls) = run_to_completion(&mut graph, 10);
    assert_eq!(calls, 3);
    assert_eq!(graph.state(), ProcessorState::Finished);
    assert_eq!(collected.items(), vec![0, 1, 4, 5, 6, 7, 8, 9]);
    assert_eq!(collected.last_flags(), 1);
}

// ==================== Connect failures ====================

/// Passes its input through, but rejects its input settings until opened.
struct Gate {
    core: ProcessorCore,
    open: Arc<AtomicBool>,
}

impl Gate {
    fn new(name: &str, open: Arc<AtomicBool>) -> Self {
        Self {
            core: ProcessorCore::new(
                name,
                vec![PortDescriptor::input(INPUT)],
                vec![PortDescriptor::output(OUTPUT)],
            ),
            open,
        }
    }
}

impl Processor<i64> for Gate {
    fn core(&self) -> &ProcessorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ProcessorCore {
        &mut self.core
    }

    fn connect_outputs(&mut self, input: &PortSettings) -> DataflowResult<PortSettings> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(DataflowError::validation(self.core.path(), "gate is closed"));
        }
        Ok(port_settings(OUTPUT, input[INPUT].clone()))
    }

    fn process_data(&mut self, mut input: DataMap<i64>) -> DataflowResult<DataMap<i64>> {
        let data = input.remove(INPUT).unwrap_or_default();
        if data.finished {
            self.core.finish();
        }
        Ok(data_map(OUTPUT, data))
    }
}

#[test]
fn test_failed_connect_can_be_retried() {
    let open = Arc::new(AtomicBool::new(false));
    let (sink, collected) = collecting_sink("Sink");
    let mut graph = Graph::builder("Gated")
        .processor(range_source("Source", 0, 3, 3))
        .processor(Gate::new("Gate", open.clone()))
        .processor(sink)
        .build_linear()
        .unwrap();

    let err = graph.connect(PortSettings::new()).unwrap_err();
    assert!(err.is_validation_error());
    assert_eq!(graph.state(), ProcessorState::Unconnected);
    for name in ["Source", "Gate", "Sink"] {
        assert_eq!(
            graph.processor(name).unwrap().state(),
            ProcessorState::Unconnected,
            "{}",
            name
        );
    }

    // Retrying reports the same rejection rather than a state error.
    let err = graph.connect(PortSettings::new()).unwrap_err();
    assert!(err.is_validation_error());
    assert!(!err.is_state_error());
    assert_eq!(graph.state(), ProcessorState::Unconnected);

    open.store(true, Ordering::SeqCst);
    graph.connect(PortSettings::new()).unwrap();
    graph.start().unwrap();
    run_to_completion(&mut graph, 5);
    assert_eq!(collected.items(), vec![0, 1, 2]);
}

#[test]
fn test_failed_connect_resets_nested_graph() {
    let open = Arc::new(AtomicBool::new(false));
    let inner = Graph::builder("Inner")
        .input(PortDescriptor::input(INPUT))
        .output(PortDescriptor::output(OUTPUT))
        .processor(scaler("Scale", 2))
        .processor(offsetter("Offset", 1))
        .build_linear()
        .unwrap();
    let (sink, _) = collecting_sink("Sink");
    let mut graph = Graph::builder("Outer")
        .processor(range_source("Source", 0, 3, 3))
        .processor(inner)
        .processor(Gate::new("Gate", open.clone()))
        .processor(sink)
        .build_linear()
        .unwrap();

    assert!(graph.connect(PortSettings::new()).unwrap_err().is_validation_error());
    let inner = graph.processor("Inner").unwrap();
    assert_eq!(inner.state(), ProcessorState::Unconnected);
    assert!(inner.output_settings(OUTPUT).is_none());

    open.store(true, Ordering::SeqCst);
    graph.connect(PortSettings::new()).unwrap();
    assert_eq!(graph.processor("Inner").unwrap().state(), ProcessorState::Connected);
}

// ==================== Properties ====================

proptest! {
    #[test]
    fn prop_linear_chain_matches_map(
        len in 0i64..40,
        chunk in 1usize..8,
        scale in -5i64..5,
        offset in -50i64..50,
    ) {
        let mut graph = running(chain(0, len, chunk, scale, offset));
        let (items, calls) = run_to_completion(&mut graph, 100);

        let expected: Vec<i64> = (0..len).map(|x| x * scale + offset).collect();
        prop_assert_eq!(items, expected);

        let expected_calls = (len as usize).div_ceil(chunk).max(1);
        prop_assert_eq!(calls, expected_calls);
    }

    #[test]
    fn prop_connect_is_deterministic(scale in -5i64..5, offset in -5i64..5) {
        let mut first = chain(0, 3, 1, scale, offset);
        let mut second = chain(0, 3, 1, scale, offset);
        first.connect(PortSettings::new()).unwrap();
        second.connect(PortSettings::new()).unwrap();
        prop_assert_eq!(first.output_settings(OUTPUT), second.output_settings(OUTPUT));
        prop_assert_eq!(first.connections(), second.connections());
    }
}
