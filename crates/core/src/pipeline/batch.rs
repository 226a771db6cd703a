use crate::config::DEFAULT_BATCH_SIZE;
use crate::domain::profile::{ClientProfile, ClientRecord};
use crate::pipeline::profile::load_profile;
use crate::source::ClientDataSource;
use std::fmt;
use std::num::NonZeroUsize;

/// Maximum number of clients per generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSize(NonZeroUsize);

impl BatchSize {
    pub fn new(size: usize) -> anyhow::Result<Self> {
        NonZeroUsize::new(size)
            .map(Self)
            .ok_or_else(|| anyhow::anyhow!("batch size must be > 0 (got {size})"))
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        Self(NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN))
    }
}

impl fmt::Display for BatchSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Position of a batch within the client list. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSpan {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

impl BatchSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Profiles of one batch, in client-list order.
#[derive(Debug, Clone)]
pub struct Batch {
    pub span: BatchSpan,
    pub profiles: Vec<ClientProfile>,
}

/// Lazily slices `items` into consecutive groups of at most `size`, in order. The last group is
/// short when the length is not a multiple of `size`.
pub fn partition<T>(items: &[T], size: BatchSize) -> impl Iterator<Item = (BatchSpan, &[T])> + '_ {
    let size = size.get();
    items.chunks(size).enumerate().map(move |(index, chunk)| {
        let start = index * size;
        (
            BatchSpan {
                index,
                start,
                end: start + chunk.len(),
            },
            chunk,
        )
    })
}

/// Builds the profiles of one slice of clients.
pub fn build_batch(
    source: &dyn ClientDataSource,
    span: BatchSpan,
    clients: &[ClientRecord],
) -> Batch {
    let profiles = clients
        .iter()
        .map(|client| load_profile(source, client))
        .collect();
    Batch { span, profiles }
}

/// Partitions `clients` and builds each batch's profiles on demand.
pub fn batches<'a>(
    source: &'a dyn ClientDataSource,
    clients: &'a [ClientRecord],
    size: BatchSize,
) -> impl Iterator<Item = Batch> + 'a {
    partition(clients, size).map(move |(span, chunk)| build_batch(source, span, chunk))
}
