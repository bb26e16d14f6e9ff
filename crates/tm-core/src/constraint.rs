//! Constraint name allocation.
//!
//! Postgres silently truncates identifiers longer than 63 bytes, which makes
//! two long constraint names collide after truncation. The namer shortens
//! long names deterministically and keeps them unique within a batch.

use crate::config::NamingConfig;
use crate::error::{CoreError, CoreResult};
use crate::naming::shorten_with_digest;
use std::collections::HashSet;

/// Hands out bounded, unique constraint names for one migration batch.
#[derive(Debug, Clone)]
pub struct ConstraintNamer {
    limit: usize,
    max_attempts: u32,
    used: HashSet<String>,
}

impl ConstraintNamer {
    pub fn new(limit: usize, max_attempts: u32) -> Self {
        Self {
            limit,
            max_attempts: max_attempts.max(1),
            used: HashSet::new(),
        }
    }

    pub fn from_config(config: &NamingConfig) -> Self {
        Self::new(config.max_identifier_bytes, config.max_name_attempts)
    }

    /// Derive a name for `base` that fits the limit and was not handed out before.
    ///
    /// A base that already fits and is unused comes back verbatim. Otherwise
    /// the base is truncated and suffixed with a digest of itself, and on
    /// collision with a digest of `base` plus a retry counter.
    pub fn unique_name(&mut self, base: &str) -> CoreResult<String> {
        if base.len() <= self.limit && self.used.insert(base.to_string()) {
            return Ok(base.to_string());
        }

        for attempt in 0..self.max_attempts {
            let seed = if attempt == 0 {
                base.to_string()
            } else {
                format!("{}{}", base, attempt)
            };
            let candidate = shorten_with_digest(base, &seed, self.limit);
            if self.used.insert(candidate.clone()) {
                if attempt > 0 {
                    log::debug!("Constraint name '{}' collided {} time(s)", base, attempt);
                }
                return Ok(candidate);
            }
        }

        Err(CoreError::ConstraintNameExhausted {
            base: base.to_string(),
            attempts: self.max_attempts,
        })
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.used.contains(name)
    }
}
