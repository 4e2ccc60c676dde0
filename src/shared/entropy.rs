//! Shared pieces of the rANS coder: precision constants, frequency-table
//! normalization and the cumulative/slot tables both sides derive from a
//! serialized table.

/// Probability precision of the coder. Frequencies are normalized so they
/// sum to `1 << RANS_PRECISION`.
pub(crate) const RANS_PRECISION: u32 = 12;

pub(crate) const RANS_PRECISION_TOTAL: u32 = 1 << RANS_PRECISION;

/// Lower bound of the coder state interval.
pub(crate) const L_RANS_BASE: u64 = (RANS_PRECISION_TOTAL as u64) << 2;

/// One entry of a normalized frequency table.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RansSymbol {
    pub freq: u32,
    pub cum: u32,
}

/// Scales raw symbol counts so they sum to exactly `1 << RANS_PRECISION`,
/// keeping every occurring symbol at a nonzero frequency. Returns `None`
/// when no symbol occurs at all.
pub(crate) fn normalize_frequencies(counts: &[u64]) -> Option<Vec<u32>> {
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return None;
    }
    let target = RANS_PRECISION_TOTAL as u64;
    let mut freqs: Vec<u32> = counts
        .iter()
        .map(|&c| {
            if c == 0 {
                0
            } else {
                ((c * target / total).max(1)) as u32
            }
        })
        .collect();

    let mut sum: u64 = freqs.iter().map(|&f| f as u64).sum();
    while sum > target {
        // Shave the surplus off the most frequent symbols; clamped entries
        // keep at least one slot.
        let i = largest_entry(&freqs);
        let take = (sum - target).min((freqs[i] - 1) as u64);
        debug_assert!(take > 0);
        freqs[i] -= take as u32;
        sum -= take;
    }
    if sum < target {
        let i = largest_entry(&freqs);
        freqs[i] += (target - sum) as u32;
    }
    Some(freqs)
}

fn largest_entry(freqs: &[u32]) -> usize {
    let mut best = 0;
    for (i, &f) in freqs.iter().enumerate() {
        if f > freqs[best] {
            best = i;
        }
    }
    best
}

/// Builds the per-symbol records and the slot-to-symbol lookup used for
/// decoding. Fails when the table does not sum to the precision total.
pub(crate) fn rans_build_tables(freqs: &[u32]) -> Option<(Vec<RansSymbol>, Vec<u16>)> {
    let mut symbols = Vec::with_capacity(freqs.len());
    let mut cum = 0_u32;
    for &freq in freqs {
        symbols.push(RansSymbol { freq, cum });
        cum = cum.checked_add(freq)?;
        if cum > RANS_PRECISION_TOTAL {
            return None;
        }
    }
    if cum != RANS_PRECISION_TOTAL {
        return None;
    }
    let mut slots = vec![0_u16; RANS_PRECISION_TOTAL as usize];
    for (sym, record) in symbols.iter().enumerate() {
        for slot in record.cum..record.cum + record.freq {
            slots[slot as usize] = sym as u16;
        }
    }
    Some((symbols, slots))
}
