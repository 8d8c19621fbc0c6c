use spatter_common::{Result, SpatterError};

use crate::generators;
use crate::pattern::Pattern;

/// Repetitions used when a delta is set but no count is given.
pub const DEFAULT_DELTA_COUNT: usize = 1024;

/// Expands a pattern specification into a concrete [`Pattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternCompiler {
    delta: usize,
    count: Option<usize>,
}

impl Default for PatternCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternCompiler {
    /// No delta, count unset.
    pub fn new() -> Self {
        Self { delta: 0, count: None }
    }

    /// Offset added to every index of repetition `j`, multiplied by `j`.
    pub fn with_delta(mut self, delta: usize) -> Self {
        self.delta = delta;
        self
    }

    /// Number of times the base sequence is repeated.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn delta(&self) -> usize {
        self.delta
    }

    /// Effective repetition count: the explicit count if one was given,
    /// otherwise [`DEFAULT_DELTA_COUNT`] with a non-zero delta and 1 without.
    pub fn count(&self) -> usize {
        match self.count {
            Some(count) => count,
            None if self.delta > 0 => DEFAULT_DELTA_COUNT,
            None => 1,
        }
    }

    /// Compile `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`SpatterError::Configuration`] for an unknown generator, a
    /// malformed or empty field, an empty explicit list, or a zero count;
    /// [`SpatterError::Allocation`] when the expanded index list cannot be
    /// held in memory.
    pub fn compile(&self, spec: &str) -> Result<Pattern> {
        let spec = spec.trim();
        let base = match spec.split_once(':') {
            Some((name, fields)) => compile_generator(name, fields)?,
            None => parse_list(spec, "pattern index")?,
        };
        let count = self.count();
        let indices = generators::repeat_with_delta(&base, self.delta, count)?;
        log::debug!(
            "compiled pattern '{spec}' (delta={}, count={count}) to {} indices",
            self.delta,
            indices.len()
        );
        Pattern::from_indices(indices)
    }
}

fn compile_generator(name: &str, fields: &str) -> Result<Vec<usize>> {
    let fields: Vec<&str> = fields.split(':').collect();
    match name.trim().to_ascii_uppercase().as_str() {
        "MS1" => {
            let [len, locations, gaps] = fields[..] else {
                return Err(SpatterError::config(format!(
                    "MS1 expects MS1:<len>:<locations>:<gaps>, got {} field(s)",
                    fields.len()
                )));
            };
            generators::mostly_stride_one(
                parse_field(len, "MS1 length")?,
                &parse_list(locations, "MS1 gap location")?,
                &parse_list(gaps, "MS1 gap")?,
            )
        }
        "UNIFORM" => {
            let [len, stride] = fields[..] else {
                return Err(SpatterError::config(format!(
                    "UNIFORM expects UNIFORM:<len>:<stride>, got {} field(s)",
                    fields.len()
                )));
            };
            generators::uniform(parse_field(len, "UNIFORM length")?, parse_field(stride, "UNIFORM stride")?)
        }
        other => Err(SpatterError::config(format!("unknown pattern generator '{other}'"))),
    }
}

fn parse_field(field: &str, what: &str) -> Result<usize> {
    let field = field.trim();
    if field.is_empty() {
        return Err(SpatterError::config(format!("missing {what}")));
    }
    field
        .parse::<usize>()
        .map_err(|e| SpatterError::config(format!("invalid {what} '{field}': {e}")))
}

fn parse_list(list: &str, what: &str) -> Result<Vec<usize>> {
    if list.trim().is_empty() {
        return Err(SpatterError::config(format!("empty {what} list")));
    }
    list.split(',').map(|field| parse_field(field, what)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_list() {
        let p = PatternCompiler::new().compile("0,1,2,3").unwrap();
        assert_eq!(p.as_slice(), &[0, 1, 2, 3]);
    }

    #[test]
    fn explicit_list_tolerates_whitespace() {
        let p = PatternCompiler::new().compile(" 4, 0 ,9 ").unwrap();
        assert_eq!(p.as_slice(), &[4, 0, 9]);
    }

    #[test]
    fn explicit_single_index() {
        assert_eq!(PatternCompiler::new().compile("7").unwrap().as_slice(), &[7]);
    }

    #[test]
    fn empty_explicit_list_is_config_error() {
        for spec in ["", "   "] {
            let err = PatternCompiler::new().compile(spec).unwrap_err();
            assert!(err.is_configuration(), "{spec:?}: {err}");
        }
    }

    #[test]
    fn malformed_entries_are_rejected() {
        for spec in ["1,,2", "1,-2", "a,b", "1.5", "3,"] {
            assert!(PatternCompiler::new().compile(spec).is_err(), "{spec:?}");
        }
    }

    #[test]
    fn ms1_reference_outputs() {
        let c = PatternCompiler::new();
        assert_eq!(c.compile("MS1:8:4:32").unwrap().as_slice(), &[0, 1, 2, 3, 35, 36, 37, 38]);
        assert_eq!(c.compile("MS1:8:2,3:20").unwrap().as_slice(), &[0, 1, 21, 41, 42, 43, 44, 45]);
        assert_eq!(
            c.compile("MS1:8:2,3:20,22").unwrap().as_slice(),
            &[0, 1, 21, 43, 44, 45, 46, 47]
        );
    }

    #[test]
    fn generator_name_is_case_insensitive() {
        let c = PatternCompiler::new();
        assert_eq!(c.compile("ms1:4:2:16").unwrap(), c.compile("MS1:4:2:16").unwrap());
        assert_eq!(c.compile("uniform:3:2").unwrap().as_slice(), &[0, 2, 4]);
    }

    #[test]
    fn ms1_wrong_field_count() {
        let c = PatternCompiler::new();
        assert!(c.compile("MS1:8").is_err());
        assert!(c.compile("MS1:8:4").is_err());
        assert!(c.compile("MS1:8:4:32:1").is_err());
        assert!(c.compile("MS1:8::32").is_err());
    }

    #[test]
    fn unknown_generator() {
        let err = PatternCompiler::new().compile("LAPLACIAN:2:2:100").unwrap_err();
        assert!(err.to_string().contains("unknown pattern generator"));
    }

    #[test]
    fn stride_zero_is_preserved() {
        let p = PatternCompiler::new().compile("UNIFORM:4:0").unwrap();
        assert_eq!(p.as_slice(), &[0, 0, 0, 0]);
        assert_eq!(p.sparse_len(), 1);
    }

    #[test]
    fn delta_and_count_repeat_the_base() {
        let p = PatternCompiler::new().with_delta(8).with_count(2).compile("MS1:4:2:16").unwrap();
        assert_eq!(p.as_slice(), &[0, 1, 17, 18, 8, 9, 25, 26]);
    }

    #[test]
    fn delta_without_count_uses_default_repetitions() {
        let base = PatternCompiler::new().compile("MS1:8:4:32").unwrap();
        let c = PatternCompiler::new().with_delta(4);
        assert_eq!(c.count(), DEFAULT_DELTA_COUNT);
        let p = c.compile("MS1:8:4:32").unwrap();
        assert_eq!(p.len(), 8 * DEFAULT_DELTA_COUNT);
        assert_eq!(&p.as_slice()[..8], base.as_slice());
        assert_eq!(&p.as_slice()[8..16], &[4, 5, 6, 7, 39, 40, 41, 42]);
        assert_eq!(p.max_index(), 38 + 4 * (DEFAULT_DELTA_COUNT - 1));
    }

    #[test]
    fn explicit_count_wins_over_delta_default() {
        let c = PatternCompiler::new().with_delta(64).with_count(1);
        assert_eq!(c.compile("MS1:8:4:32").unwrap(), PatternCompiler::new().compile("MS1:8:4:32").unwrap());
        assert_eq!(PatternCompiler::new().count(), 1);
    }

    #[test]
    fn largest_index_is_config_error() {
        let err = PatternCompiler::new().compile("18446744073709551615").unwrap_err();
        assert!(err.is_configuration(), "{err}");
    }

    #[test]
    fn unallocatable_generator_is_allocation_error() {
        let err = PatternCompiler::new().compile("MS1:4611686018427387904:1:1").unwrap_err();
        assert!(matches!(err, SpatterError::Allocation { .. }), "{err}");
        let err = PatternCompiler::new().with_count(usize::MAX / 4).compile("0,1").unwrap_err();
        assert!(matches!(err, SpatterError::Allocation { .. }), "{err}");
    }

    #[test]
    fn zero_count_is_rejected() {
        assert!(PatternCompiler::new().with_count(0).compile("0,1").is_err());
    }
}
