//! Shared state record contract
//!
//! A workflow threads one record through the graph. Units never replace
//! it; they return a patch naming only the fields they changed, and the
//! scheduler folds that patch into the authoritative copy.

/// A record that can be progressively extended by patches
///
/// Implementations should be a fixed schema of optional fields so that
/// "not yet available" is a typed absence rather than a lookup failure.
pub trait WorkflowState: Clone + Send + Sync + 'static {
    /// Diff produced by a unit. `Default` must be the empty diff.
    type Patch: Default + Send + 'static;

    /// Fold a patch into the record.
    ///
    /// Fields absent from the patch must be left untouched; fields are
    /// never removed.
    fn apply(&mut self, patch: Self::Patch);

    /// Names of the fields a patch sets
    fn written_fields(_patch: &Self::Patch) -> Vec<&'static str> {
        Vec::new()
    }
}
