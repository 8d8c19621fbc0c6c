//! Pattern generators.
//!
//! Each generator takes already-parsed numeric fields and produces the base
//! index sequence. All arithmetic is checked; an index that does not fit in
//! `usize` is a configuration error rather than a wrapped value.

use spatter_common::{Result, SpatterError};

/// Reserve room for `len` indices, reporting failure instead of aborting.
fn index_buffer(len: usize) -> Result<Vec<usize>> {
    let mut out = Vec::new();
    out.try_reserve_exact(len).map_err(|e| SpatterError::Allocation {
        buffer: "pattern",
        bytes: len.saturating_mul(std::mem::size_of::<usize>()),
        reason: e.to_string(),
    })?;
    Ok(out)
}

/// "Mostly stride-1": unit-stride run broken by gaps at given positions.
///
/// `p[0] = 0`; for `i >= 1`, `p[i] = p[i-1] + gap` if `i` is a break
/// location and `p[i-1] + 1` otherwise. `gaps` holds either one value used at
/// every location or exactly one value per location, paired in order.
pub(crate) fn mostly_stride_one(len: usize, locations: &[usize], gaps: &[usize]) -> Result<Vec<usize>> {
    if len == 0 {
        return Err(SpatterError::config("MS1 length must be at least 1"));
    }
    if locations.is_empty() {
        return Err(SpatterError::config("MS1 requires at least one gap location"));
    }
    if gaps.len() != 1 && gaps.len() != locations.len() {
        return Err(SpatterError::config(format!(
            "MS1 expects 1 gap or one gap per location ({}), got {}",
            locations.len(),
            gaps.len()
        )));
    }

    // (location, gap), sorted by location.
    let mut breaks: Vec<(usize, usize)> = locations
        .iter()
        .enumerate()
        .map(|(n, &loc)| (loc, if gaps.len() == 1 { gaps[0] } else { gaps[n] }))
        .collect();
    breaks.sort_unstable_by_key(|&(loc, _)| loc);
    for pair in breaks.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(SpatterError::config(format!("MS1 gap location {} given twice", pair[0].0)));
        }
    }
    if let Some(&(loc, _)) = breaks.iter().find(|&&(loc, _)| loc == 0 || loc >= len) {
        return Err(SpatterError::config(format!("MS1 gap location {loc} out of range 1..{len}")));
    }

    let mut out = index_buffer(len)?;
    let mut next = breaks.iter().peekable();
    let mut cur = 0usize;
    out.push(cur);
    for i in 1..len {
        let step = match next.next_if(|&&(loc, _)| loc == i) {
            Some(&(_, gap)) => gap,
            None => 1,
        };
        cur = cur
            .checked_add(step)
            .ok_or_else(|| SpatterError::config("MS1 pattern index overflows usize"))?;
        out.push(cur);
    }
    Ok(out)
}

/// `p[i] = i * stride`. A stride of zero is legal and yields a single
/// repeated index.
pub(crate) fn uniform(len: usize, stride: usize) -> Result<Vec<usize>> {
    if len == 0 {
        return Err(SpatterError::config("UNIFORM length must be at least 1"));
    }
    if (len - 1).checked_mul(stride).is_none() {
        return Err(SpatterError::config("UNIFORM pattern index overflows usize"));
    }
    let mut out = index_buffer(len)?;
    out.extend((0..len).map(|i| i * stride));
    Ok(out)
}

/// Repeat `base` `count` times, shifting repetition `j` by `j * delta`.
pub(crate) fn repeat_with_delta(base: &[usize], delta: usize, count: usize) -> Result<Vec<usize>> {
    if count == 0 {
        return Err(SpatterError::config("pattern count must be at least 1"));
    }
    let total = base
        .len()
        .checked_mul(count)
        .ok_or_else(|| SpatterError::config("pattern length overflows usize"))?;
    let mut out = index_buffer(total)?;
    for j in 0..count {
        let offset = j
            .checked_mul(delta)
            .ok_or_else(|| SpatterError::config("pattern delta offset overflows usize"))?;
        for &idx in base {
            out.push(
                idx.checked_add(offset)
                    .ok_or_else(|| SpatterError::config("pattern index overflows usize"))?,
            );
        }
    }
    Ok(out)
}
