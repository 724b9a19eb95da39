/// Lifecycle of a cache
///
/// `Latent → Started → Closed`; closing a latent cache skips `Started`.
/// There is no way back from `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CacheState {
    #[default]
    Latent,
    Started,
    Closed,
}

impl CacheState {
    pub fn is_closed(&self) -> bool {
        matches!(self, CacheState::Closed)
    }
}
