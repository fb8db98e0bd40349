//! Apply progress bands.
//!
//! The apply is divided into five 20% bands; per-resource progress
//! interpolates linearly inside a band. Memory reports at the start of
//! the tools band and the online eval config at the end of the
//! evaluators band.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Band {
    Tools,
    Policies,
    Runtimes,
    A2a,
    Evaluators,
}

impl Band {
    fn start(self) -> u32 {
        match self {
            Self::Tools => 0,
            Self::Policies => 20,
            Self::Runtimes => 40,
            Self::A2a => 60,
            Self::Evaluators => 80,
        }
    }
}

/// Percentage for the `index`-th of `total` resources in a band.
pub(crate) fn percent(band: Band, index: usize, total: usize) -> u32 {
    let total = total.max(1);
    let index = index.min(total);
    band.start() + (20 * index / total) as u32
}

/// The progress message contract: verb, kind, name, and a percentage
/// ending in `%`.
pub(crate) fn message(verb: &str, kind: &str, name: &str, pct: u32) -> String {
    format!("{verb} {kind}: {name} ({pct}%)")
}
