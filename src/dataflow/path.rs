//! Hierarchical identity for processors.
//!
//! A processor's path is its name prefixed by the names of the graphs that
//! enclose it, e.g. `Archiver/Alamo/Dick/Clip Creator`. The path is a plain
//! label: a child never holds a reference to its parent graph, so the path is
//! only used for diagnostics and log messages.

use std::fmt;

/// Separator between path segments in the display form.
pub const PATH_SEPARATOR: char = '/';

/// Hierarchical processor label.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ProcessorPath {
    segments: Vec<String>,
}

impl ProcessorPath {
    /// Path of a top-level processor.
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Path of a processor named `name` inside the processor at `self`.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self { segments }
    }

    /// Re-root this path under `parent`, keeping only the last segment.
    pub fn reparent(&self, parent: &ProcessorPath) -> Self {
        parent.child(self.name())
    }

    /// The processor's own name (last segment).
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// Path of the enclosing graph, if any.
    pub fn parent(&self) -> Option<ProcessorPath> {
        if self.segments.len() <= 1 {
            None
        } else {
            Some(Self {
                segments: self.segments[..self.segments.len() - 1].to_vec(),
            })
        }
    }

    /// Nesting depth (1 for a top-level processor).
    #[inline]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }
}

impl fmt::Display for ProcessorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", PATH_SEPARATOR)?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ProcessorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessorPath({})", self)
    }
}
