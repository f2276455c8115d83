//! Fill modes

/// Fill mode determines what the target shows before the first step and
/// after the last one.
///
/// The two questions are independent:
///
/// | mode        | `from` applied during the delay | `initial` restored at the end |
/// |-------------|---------------------------------|-------------------------------|
/// | `None`      | no                              | yes                           |
/// | `Forwards`  | yes                             | yes                           |
/// | `Backwards` | no                              | no                            |
/// | `Both`      | yes                             | no                            |
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FillMode {
    /// Not applied before start, restored to the original value after the end
    None,
    /// Applied before start, restored to the original value after the end
    Forwards,
    /// Not applied before start, holds the final value after the end
    #[default]
    Backwards,
    /// Applied before start and holds the final value after the end
    Both,
}

impl FillMode {
    /// Whether `from` is written eagerly while the initial delay runs
    pub fn applies_before_start(self) -> bool {
        matches!(self, FillMode::Forwards | FillMode::Both)
    }

    /// Whether the sampled `initial` value is written back on natural completion
    pub fn restores_after_end(self) -> bool {
        matches!(self, FillMode::Forwards | FillMode::None)
    }
}
