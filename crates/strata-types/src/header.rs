use crate::bounds::Bounds;

/// Metadata from the header of a map data file.
///
/// A parser fills one `Header` per decode run and hands it to the reader
/// through a one-shot result. After that it is only read, so the type
/// itself carries no synchronization.
///
/// ```text
/// ┌──────────────────────────────┬─────────┬───────────────────────────────────┐
/// │ Field                        │ Default │ Meaning                           │
/// ├──────────────────────────────┼─────────┼───────────────────────────────────┤
/// │ bounds                       │ undef.  │ Bounding box declared by the file │
/// │ generator                    │ ""      │ Program that wrote the file       │
/// │ has_multiple_object_versions │ false   │ History or change data            │
/// │ pbf_has_dense_nodes          │ false   │ PBF nodes use the dense encoding  │
/// └──────────────────────────────┴─────────┴───────────────────────────────────┘
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    bounds: Bounds,
    generator: String,
    /// True for history and change files, where the same object can
    /// appear in several versions.
    has_multiple_object_versions: bool,
    /// Only meaningful for PBF input.
    pbf_has_dense_nodes: bool,
}

impl Header {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    #[must_use]
    pub fn with_generator(mut self, generator: impl Into<String>) -> Self {
        self.generator = generator.into();
        self
    }

    #[must_use]
    pub fn with_multiple_object_versions(mut self, value: bool) -> Self {
        self.has_multiple_object_versions = value;
        self
    }

    #[must_use]
    pub fn with_pbf_dense_nodes(mut self, value: bool) -> Self {
        self.pbf_has_dense_nodes = value;
        self
    }

    #[must_use]
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Mutable access, e.g. to [`Bounds::extend`] while parsing.
    pub fn bounds_mut(&mut self) -> &mut Bounds {
        &mut self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }

    #[must_use]
    pub fn generator(&self) -> &str {
        &self.generator
    }

    pub fn set_generator(&mut self, generator: impl Into<String>) {
        self.generator = generator.into();
    }

    #[must_use]
    pub fn has_multiple_object_versions(&self) -> bool {
        self.has_multiple_object_versions
    }

    pub fn set_multiple_object_versions(&mut self, value: bool) {
        self.has_multiple_object_versions = value;
    }

    #[must_use]
    pub fn pbf_has_dense_nodes(&self) -> bool {
        self.pbf_has_dense_nodes
    }

    pub fn set_pbf_dense_nodes(&mut self, value: bool) {
        self.pbf_has_dense_nodes = value;
    }
}
