use std::fmt;

use serde::{
    Deserialize, Deserializer,
    de::{self, Visitor},
};

/// Where the block watcher starts when nothing has been processed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitialStartBlock {
    /// A fixed block height.
    Absolute(u64),
    /// A number of blocks behind the chain tip, given as a negative number.
    Offset(i64),
    /// The chain tip.
    #[default]
    Latest,
}

impl InitialStartBlock {
    /// Resolves the first height to process given the current chain tip.
    ///
    /// Offsets reaching before genesis start at height 0.
    pub fn resolve(&self, current_height: u64) -> u64 {
        match self {
            InitialStartBlock::Absolute(height) => *height,
            InitialStartBlock::Offset(offset) => {
                current_height.saturating_sub(offset.unsigned_abs())
            }
            InitialStartBlock::Latest => current_height,
        }
    }
}

impl<'de> Deserialize<'de> for InitialStartBlock {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StartBlockVisitor;

        impl Visitor<'_> for StartBlockVisitor {
            type Value = InitialStartBlock;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a block height, a negative offset, or the string 'latest'")
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(match u64::try_from(value) {
                    Ok(height) => InitialStartBlock::Absolute(height),
                    Err(_) => InitialStartBlock::Offset(value),
                })
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(InitialStartBlock::Absolute(value))
            }

            // Environment overrides arrive as strings.
            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let value = value.trim();
                if value.eq_ignore_ascii_case("latest") {
                    return Ok(InitialStartBlock::Latest);
                }
                value
                    .parse::<i64>()
                    .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(value), &self))
                    .and_then(|number| self.visit_i64(number))
            }
        }

        deserializer.deserialize_any(StartBlockVisitor)
    }
}
