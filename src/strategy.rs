use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::{IntMap, LockedMap, ShardedMap, SyncMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Locked,
    Sharded,
    Sync,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Locked, Strategy::Sharded, Strategy::Sync];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Locked => "locked",
            Strategy::Sharded => "sharded",
            Strategy::Sync => "sync",
        }
    }

    pub fn build(self) -> Arc<dyn IntMap> {
        match self {
            Strategy::Locked => Arc::new(LockedMap::new()),
            Strategy::Sharded => Arc::new(ShardedMap::new()),
            Strategy::Sync => Arc::new(SyncMap::new()),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown strategy `{0}`, expected one of: locked, sharded, sync")]
pub struct ParseStrategyError(String);

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .iter()
            .copied()
            .find(|strategy| strategy.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseStrategyError(s.to_owned()))
    }
}
