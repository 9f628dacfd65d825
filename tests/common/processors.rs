//! Small integer processors for exercising graphs

use clipflow::dataflow::{
    Data, DataflowResult, Graph, ItemMap, ItemSink, Itemwise, OneToOne, PortDescriptor, Settings,
    SinkProcessor, Source, SourceProcessor, StageResult, TransformProcessor, INPUT, OUTPUT,
};
use std::sync::{Arc, Mutex};

/// Emits `start..end` in chunks of at most `chunk` items.
pub struct RangeSource {
    next: i64,
    end: i64,
    chunk: usize,
}

impl RangeSource {
    pub fn new(start: i64, end: i64, chunk: usize) -> Self {
        Self { next: start, end, chunk }
    }
}

impl Source for RangeSource {
    type Item = i64;

    fn output_settings(&self) -> Settings {
        Settings::new().with("count", (self.end - self.next).max(0))
    }

    fn produce(&mut self) -> StageResult<Data<i64>> {
        let stop = self.end.min(self.next + self.chunk as i64);
        let items: Vec<i64> = (self.next..stop).collect();
        self.next = stop;
        Ok(Data::new(items, self.next >= self.end))
    }
}

pub fn range_source(name: &str, start: i64, end: i64, chunk: usize) -> SourceProcessor<RangeSource> {
    SourceProcessor::new(name, RangeSource::new(start, end, chunk))
}

/// Multiplies each item by a factor.
pub struct Scaler(pub i64);

impl ItemMap for Scaler {
    type Item = i64;

    fn output_settings(&self, input: &Settings) -> Settings {
        input.clone().with("scale", self.0)
    }

    fn map_item(&mut self, item: i64, _: bool) -> StageResult<i64> {
        Ok(item * self.0)
    }
}

/// Adds an offset to each item.
pub struct Offsetter(pub i64);

impl ItemMap for Offsetter {
    type Item = i64;

    fn output_settings(&self, input: &Settings) -> Settings {
        input.clone().with("offset", self.0)
    }

    fn map_item(&mut self, item: i64, _: bool) -> StageResult<i64> {
        Ok(item + self.0)
    }
}

pub fn scaler(name: &str, factor: i64) -> TransformProcessor<OneToOne<Scaler>> {
    TransformProcessor::one_to_one(name, Scaler(factor))
}

pub fn offsetter(name: &str, offset: i64) -> TransformProcessor<OneToOne<Offsetter>> {
    TransformProcessor::one_to_one(name, Offsetter(offset))
}

/// Records every item it consumes, and how many times it saw the last item.
#[derive(Clone, Default)]
pub struct CollectingSink {
    items: Arc<Mutex<Vec<i64>>>,
    last_flags: Arc<Mutex<usize>>,
}

impl CollectingSink {
    pub fn items(&self) -> Vec<i64> {
        self.items.lock().unwrap().clone()
    }

    pub fn last_flags(&self) -> usize {
        *self.last_flags.lock().unwrap()
    }
}

impl ItemSink for CollectingSink {
    type Item = i64;

    fn consume_item(&mut self, item: i64, last: bool) -> StageResult<()> {
        self.items.lock().unwrap().push(item);
        if last {
            *self.last_flags.lock().unwrap() += 1;
        }
        Ok(())
    }
}

/// `item * scale + offset`, as a linear graph with one input and one output.
pub fn affine_transformer(name: &str, scale: i64, offset: i64) -> DataflowResult<Graph<i64>> {
    Graph::builder(name)
        .input(PortDescriptor::input(INPUT))
        .output(PortDescriptor::output(OUTPUT))
        .processor(scaler("Scaler", scale))
        .processor(offsetter("Offsetter", offset))
        .build_linear()
}

pub fn collecting_sink(name: &str) -> (SinkProcessor<Itemwise<CollectingSink>>, CollectingSink) {
    let sink = CollectingSink::default();
    (SinkProcessor::itemwise(name, sink.clone()), sink)
}
