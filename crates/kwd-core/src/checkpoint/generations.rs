//! Ordered, append-only list of tag generations with a per-tag capacity.

use thiserror::Error;

/// Members a single account label may hold.
pub const DEFAULT_TAG_CAPACITY: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("at least one tag generation is required")]
    Empty,
    #[error("tag generation `{0}` is listed twice")]
    Duplicate(String),
    #[error("tag generation names must not be blank")]
    Blank,
    #[error("all {count} tag generation(s) are full ({capacity} members each); append a new generation")]
    Exhausted { count: usize, capacity: usize },
}

/// Completion tag generations, oldest first.
///
/// Membership in any generation counts as processed. New completions go to
/// [`TagGenerations::current_writable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagGenerations {
    names: Vec<String>,
    capacity: usize,
}

impl TagGenerations {
    pub fn new(names: Vec<String>, capacity: usize) -> Result<Self, GenerationError> {
        if names.is_empty() {
            return Err(GenerationError::Empty);
        }
        for (i, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(GenerationError::Blank);
            }
            if names[..i].contains(name) {
                return Err(GenerationError::Duplicate(name.clone()));
            }
        }
        Ok(Self {
            names,
            capacity: capacity.max(1),
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest generation; also names the per-account campaign tag.
    pub fn first(&self) -> &str {
        &self.names[0]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Index of the generation new completions are written to, given the
    /// current member count of each generation (same order as `names`).
    ///
    /// That is the oldest generation with room left; full generations are
    /// never written again.
    pub fn current_writable(&self, member_counts: &[usize]) -> Result<usize, GenerationError> {
        (0..self.names.len())
            .find(|&i| member_counts.get(i).copied().unwrap_or(0) < self.capacity)
            .ok_or(GenerationError::Exhausted {
                count: self.names.len(),
                capacity: self.capacity,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gens(names: &[&str], capacity: usize) -> TagGenerations {
        TagGenerations::new(names.iter().map(|s| s.to_string()).collect(), capacity).unwrap()
    }

    #[test]
    fn rejects_invalid_lists() {
        assert_eq!(TagGenerations::new(vec![], 10), Err(GenerationError::Empty));
        assert_eq!(
            TagGenerations::new(vec!["a".into(), "a".into()], 10),
            Err(GenerationError::Duplicate("a".into()))
        );
        assert_eq!(
            TagGenerations::new(vec![" ".into()], 10),
            Err(GenerationError::Blank)
        );
    }

    #[test]
    fn writable_generation_rolls_over_when_full() {
        let g = gens(&["__PROCESSED__", "__PROCESSED-1K__"], 3);
        assert_eq!(g.current_writable(&[0, 0]), Ok(0));
        assert_eq!(g.current_writable(&[2, 0]), Ok(0));
        assert_eq!(g.current_writable(&[3, 0]), Ok(1));
        assert_eq!(g.current_writable(&[3]), Ok(1));
        assert_eq!(
            g.current_writable(&[3, 3]),
            Err(GenerationError::Exhausted {
                count: 2,
                capacity: 3
            })
        );
    }
}
