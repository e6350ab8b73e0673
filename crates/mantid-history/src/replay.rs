//! Re-execution seam
//!
//! A recorded [`AlgorithmHistory`](crate::AlgorithmHistory) can be turned
//! back into a runnable algorithm. The algorithm framework lives outside this
//! crate, so it plugs in through these two traits.

/// An algorithm instance that accepts string property values
pub trait ReplayableAlgorithm: Send {
    /// Algorithm name
    fn name(&self) -> &str;

    /// Algorithm version
    fn version(&self) -> i32;

    /// Set a property from its string form
    ///
    /// # Errors
    /// A human-readable reason when the value is refused
    fn set_property_value(&mut self, name: &str, value: &str) -> Result<(), String>;
}

/// Creates initialised algorithm instances by name and version
#[cfg_attr(test, mockall::automock)]
pub trait AlgorithmFactory: Send + Sync {
    /// Create `name` at `version`, or `None` if it is not registered
    fn create(&self, name: &str, version: i32) -> Option<Box<dyn ReplayableAlgorithm>>;
}
