//! Single-port convenience shapes.
//!
//! Most concrete processors have one of three shapes:
//!
//! | Shape     | Inputs  | Outputs  | Stage trait   | Processor             |
//! |-----------|---------|----------|---------------|-----------------------|
//! | source    | -       | `Output` | [`Source`]    | [`SourceProcessor`]   |
//! | sink      | `Input` | -        | [`Sink`]      | [`SinkProcessor`]     |
//! | transform | `Input` | `Output` | [`Transform`] | [`TransformProcessor`]|
//!
//! A stage only implements the computation; the processor wrapper supplies
//! the ports, lifecycle bookkeeping and error attribution. The [`Itemwise`]
//! and [`OneToOne`] adapters turn per-item stages into batch stages.

use crate::dataflow::data::{Data, DataMap, PortSettings, Settings};
use crate::dataflow::error::{BoxError, DataflowError, DataflowResult};
use crate::dataflow::port::{PortDescriptor, INPUT, OUTPUT};
use crate::dataflow::processor::{data_map, port_settings, Processor, ProcessorCore};

/// Result of a stage's own logic. Errors are attributed to the wrapping
/// processor's path.
pub type StageResult<T> = std::result::Result<T, BoxError>;

// ==================== Stage traits ====================

/// Produces a batch of items per call.
pub trait Source: Send {
    type Item;

    fn output_settings(&self) -> Settings {
        Settings::new()
    }

    fn on_start(&mut self) -> StageResult<()> {
        Ok(())
    }

    /// Produce the next batch. A finished batch ends the stream and the
    /// processor.
    fn produce(&mut self) -> StageResult<Data<Self::Item>>;
}

/// Consumes a batch of items per call.
pub trait Sink: Send {
    type Item;

    fn on_start(&mut self) -> StageResult<()> {
        Ok(())
    }

    fn consume(&mut self, items: Vec<Self::Item>, finished: bool) -> StageResult<()>;
}

/// Turns a batch of input items into a batch of output items.
pub trait Transform: Send {
    type Item;

    /// Output settings derived from the input settings. Passes them through
    /// by default.
    fn output_settings(&self, input: &Settings) -> Settings {
        input.clone()
    }

    fn on_start(&mut self) -> StageResult<()> {
        Ok(())
    }

    fn transform(
        &mut self,
        items: Vec<Self::Item>,
        finished: bool,
    ) -> StageResult<Vec<Self::Item>>;
}

/// Produces at most one item per call.
pub trait ItemSource: Send {
    type Item;

    fn output_settings(&self) -> Settings {
        Settings::new()
    }

    fn on_start(&mut self) -> StageResult<()> {
        Ok(())
    }

    /// The next item, if any, and whether the stream has ended.
    fn next_item(&mut self) -> StageResult<(Option<Self::Item>, bool)>;
}

/// Consumes one item at a time.
pub trait ItemSink: Send {
    type Item;

    fn on_start(&mut self) -> StageResult<()> {
        Ok(())
    }

    /// `last` is true only for the final item of the whole stream.
    fn consume_item(&mut self, item: Self::Item, last: bool) -> StageResult<()>;
}

/// Transforms one item at a time, keeping or dropping it.
pub trait ItemTransform: Send {
    type Item;

    fn output_settings(&self, input: &Settings) -> Settings {
        input.clone()
    }

    fn on_start(&mut self) -> StageResult<()> {
        Ok(())
    }

    /// `last` is true only for the final item of the whole stream.
    fn transform_item(&mut self, item: Self::Item, last: bool) -> StageResult<Option<Self::Item>>;
}

/// Maps each item to exactly one output item.
pub trait ItemMap: Send {
    type Item;

    fn output_settings(&self, input: &Settings) -> Settings {
        input.clone()
    }

    fn on_start(&mut self) -> StageResult<()> {
        Ok(())
    }

    /// `last` is true only for the final item of the whole stream.
    fn map_item(&mut self, item: Self::Item, last: bool) -> StageResult<Self::Item>;
}

// ==================== Adapters ====================

/// Adapts an item-at-a-time stage to a batch stage.
#[derive(Debug, Clone, Default)]
pub struct Itemwise<S>(pub S);

/// Adapts an [`ItemMap`] to a one-to-one [`Transform`].
#[derive(Debug, Clone, Default)]
pub struct OneToOne<S>(pub S);

/// Pair each item with whether it is the last item of the stream.
fn with_last_flags<T>(items: Vec<T>, finished: bool) -> impl Iterator<Item = (T, bool)> {
    let count = items.len();
    items
        .into_iter()
        .enumerate()
        .map(move |(i, item)| (item, finished && i + 1 == count))
}

impl<S: ItemSource> Source for Itemwise<S> {
    type Item = S::Item;

    fn output_settings(&self) -> Settings {
        self.0.output_settings()
    }

    fn on_start(&mut self) -> StageResult<()> {
        self.0.on_start()
    }

    fn produce(&mut self) -> StageResult<Data<S::Item>> {
        let (item, finished) = self.0.next_item()?;
        Ok(Data::new(item.into_iter().collect(), finished))
    }
}

impl<S: ItemSink> Sink for Itemwise<S> {
    type Item = S::Item;

    fn on_start(&mut self) -> StageResult<()> {
        self.0.on_start()
    }

    fn consume(&mut self, items: Vec<S::Item>, finished: bool) -> StageResult<()> {
        for (item, last) in with_last_flags(items, finished) {
            self.0.consume_item(item, last)?;
        }
        Ok(())
    }
}

impl<S: ItemTransform> Transform for Itemwise<S> {
    type Item = S::Item;

    fn output_settings(&self, input: &Settings) -> Settings {
        self.0.output_settings(input)
    }

    fn on_start(&mut self) -> StageResult<()> {
        self.0.on_start()
    }

    fn transform(&mut self, items: Vec<S::Item>, finished: bool) -> StageResult<Vec<S::Item>> {
        let mut output = Vec::with_capacity(items.len());
        for (item, last) in with_last_flags(items, finished) {
            output.extend(self.0.transform_item(item, last)?);
        }
        Ok(output)
    }
}

impl<S: ItemMap> Transform for OneToOne<S> {
    type Item = S::Item;

    fn output_settings(&self, input: &Settings) -> Settings {
        self.0.output_settings(input)
    }

    fn on_start(&mut self) -> StageResult<()> {
        self.0.on_start()
    }

    fn transform(&mut self, items: Vec<S::Item>, finished: bool) -> StageResult<Vec<S::Item>> {
        with_last_flags(items, finished)
            .map(|(item, last)| self.0.map_item(item, last))
            .collect()
    }
}

// ==================== Processors ====================

/// A processor with no inputs and one `Output` port, driven by a [`Source`].
pub struct SourceProcessor<S> {
    core: ProcessorCore,
    stage: S,
}

impl<S> SourceProcessor<S> {
    pub fn new(name: impl Into<String>, stage: S) -> Self {
        Self {
            core: ProcessorCore::new(name, vec![], vec![PortDescriptor::output(OUTPUT)]),
            stage,
        }
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut S {
        &mut self.stage
    }
}

impl<S> SourceProcessor<Itemwise<S>> {
    pub fn itemwise(name: impl Into<String>, stage: S) -> Self {
        Self::new(name, Itemwise(stage))
    }
}

impl<S: Source> Processor<S::Item> for SourceProcessor<S> {
    fn core(&self) -> &ProcessorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ProcessorCore {
        &mut self.core
    }

    fn connect_outputs(&mut self, _: &PortSettings) -> DataflowResult<PortSettings> {
        Ok(port_settings(OUTPUT, self.stage.output_settings()))
    }

    fn on_start(&mut self) -> DataflowResult<()> {
        let path = self.core.path();
        self.stage
            .on_start()
            .map_err(|e| DataflowError::processing(path, e))
    }

    fn process_data(&mut self, _: DataMap<S::Item>) -> DataflowResult<DataMap<S::Item>> {
        let path = self.core.path();
        let data = self
            .stage
            .produce()
            .map_err(|e| DataflowError::processing(path, e))?;
        if data.finished {
            self.core.finish();
        }
        Ok(data_map(OUTPUT, data))
    }
}

/// A processor with one `Input` port and no outputs, driven by a [`Sink`].
pub struct SinkProcessor<S> {
    core: ProcessorCore,
    stage: S,
}

impl<S> SinkProcessor<S> {
    pub fn new(name: impl Into<String>, stage: S) -> Self {
        Self {
            core: ProcessorCore::new(name, vec![PortDescriptor::input(INPUT)], vec![]),
            stage,
        }
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut S {
        &mut self.stage
    }
}

impl<S> SinkProcessor<Itemwise<S>> {
    pub fn itemwise(name: impl Into<String>, stage: S) -> Self {
        Self::new(name, Itemwise(stage))
    }
}

impl<S: Sink> Processor<S::Item> for SinkProcessor<S> {
    fn core(&self) -> &ProcessorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ProcessorCore {
        &mut self.core
    }

    fn on_start(&mut self) -> DataflowResult<()> {
        let path = self.core.path();
        self.stage
            .on_start()
            .map_err(|e| DataflowError::processing(path, e))
    }

    fn process_data(
        &mut self,
        mut input: DataMap<S::Item>,
    ) -> DataflowResult<DataMap<S::Item>> {
        let Some(data) = input.remove(INPUT) else {
            return Ok(DataMap::new());
        };
        let finished = data.finished;
        let path = self.core.path();
        self.stage
            .consume(data.items, finished)
            .map_err(|e| DataflowError::processing(path, e))?;
        if finished {
            self.core.finish();
        }
        Ok(DataMap::new())
    }
}

/// A processor with one `Input` and one `Output` port, driven by a
/// [`Transform`]. Produces nothing when it receives nothing.
pub struct TransformProcessor<S> {
    core: ProcessorCore,
    stage: S,
}

impl<S> TransformProcessor<S> {
    pub fn new(name: impl Into<String>, stage: S) -> Self {
        Self {
            core: ProcessorCore::new(
                name,
                vec![PortDescriptor::input(INPUT)],
                vec![PortDescriptor::output(OUTPUT)],
            ),
            stage,
        }
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut S {
        &mut self.stage
    }
}

impl<S> TransformProcessor<Itemwise<S>> {
    pub fn itemwise(name: impl Into<String>, stage: S) -> Self {
        Self::new(name, Itemwise(stage))
    }
}

impl<S> TransformProcessor<OneToOne<S>> {
    pub fn one_to_one(name: impl Into<String>, stage: S) -> Self {
        Self::new(name, OneToOne(stage))
    }
}

impl<S: Transform> Processor<S::Item> for TransformProcessor<S> {
    fn core(&self) -> &ProcessorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ProcessorCore {
        &mut self.core
    }

    fn connect_outputs(&mut self, input_settings: &PortSettings) -> DataflowResult<PortSettings> {
        let input = input_settings.get(INPUT).cloned().unwrap_or_default();
        Ok(port_settings(OUTPUT, self.stage.output_settings(&input)))
    }

    fn on_start(&mut self) -> DataflowResult<()> {
        let path = self.core.path();
        self.stage
            .on_start()
            .map_err(|e| DataflowError::processing(path, e))
    }

    fn process_data(
        &mut self,
        mut input: DataMap<S::Item>,
    ) -> DataflowResult<DataMap<S::Item>> {
        let Some(data) = input.remove(INPUT) else {
            return Ok(DataMap::new());
        };
        let finished = data.finished;
        let path = self.core.path();
        let items = self
            .stage
            .transform(data.items, finished)
            .map_err(|e| DataflowError::processing(path, e))?;
        if finished {
            self.core.finish();
        }
        Ok(data_map(OUTPUT, Data::new(items, finished)))
    }
}
