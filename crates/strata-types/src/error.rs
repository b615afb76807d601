/// Errors raised while building type-level values from text.
///
/// ```text
/// ┌───────────────┬───────────────────────────────────────────────┐
/// │ Variant       │ Cause                                         │
/// ├───────────────┼───────────────────────────────────────────────┤
/// │ UnknownFormat │ A format name did not match any `FileFormat`  │
/// └───────────────┴───────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("unknown file format: {0:?}")]
    UnknownFormat(String),
}
