/// Configuration types implement this instead of [`std::default::Default`]
/// so that the chosen defaults are an explicit, documented decision.
pub trait ConfigType {
    fn default() -> Self;
}
