//! Regions: the unit of parallel work.
//!
//! A [`Region`] is a reference-sequence name taken from an alignment header, plus
//! its rank in the canonical ordering. The rank is what dispatch and merging sort
//! on; the name is what the extraction tool is asked for and what scratch files are
//! named after.
//!
//! The canonical ordering is a natural ordering in which runs of digits compare
//! numerically, so `chr2` sorts before `chr10` regardless of header order.

use std::cmp::Ordering;
use std::fmt;

/// A named partition of the reference, with its canonical rank.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region {
    name: String,
    rank: usize,
}

impl Region {
    /// Creates a region with an explicit rank.
    #[must_use]
    pub fn new(name: impl Into<String>, rank: usize) -> Self {
        Self { name: name.into(), rank }
    }

    /// The region identifier as it appears in the alignment header.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position of this region in the canonical ordering.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Filename stem used for every scratch file and artifact of this region.
    ///
    /// Characters other than ASCII alphanumerics, `.`, `-` and `_` are replaced by
    /// `_`, leading dots are dropped, and the rank is always appended. Ranks are
    /// unique within a run, so stems are too, and no stem can equal a fixed
    /// workspace directory name such as `calls`.
    #[must_use]
    pub fn file_stem(&self) -> String {
        let is_safe = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_');
        let cleaned: String =
            self.name.chars().map(|c| if is_safe(c) { c } else { '_' }).collect();
        format!("{}_{}", cleaned.trim_start_matches('.'), self.rank)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Ord for Region {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank.cmp(&other.rank).then_with(|| natural_compare(&self.name, &other.name))
    }
}

impl PartialOrd for Region {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sorts region names into canonical order and assigns ranks.
///
/// Duplicate names are collapsed; the result is the same for any permutation of
/// the input.
#[must_use]
pub fn canonical_regions<I, S>(names: I) -> Vec<Region>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
    names.sort_by(|a, b| natural_compare(a, b));
    names.dedup();
    names.into_iter().enumerate().map(|(rank, name)| Region::new(name, rank)).collect()
}

/// Natural string comparison that handles numeric runs.
///
/// Compares strings such that "chr1" < "chr2" < "chr10". Numeric runs that are
/// numerically equal but spelled differently ("chr01" vs "chr1") fall back to a
/// byte comparison so the ordering stays total.
#[must_use]
pub fn natural_compare(a: &str, b: &str) -> Ordering {
    let (a_bytes, b_bytes) = (a.as_bytes(), b.as_bytes());
    let mut i = 0;
    let mut j = 0;

    while i < a_bytes.len() && j < b_bytes.len() {
        match (a_bytes[i].is_ascii_digit(), b_bytes[j].is_ascii_digit()) {
            (true, true) => {
                let (a_num, a_len) = parse_number(&a_bytes[i..]);
                let (b_num, b_len) = parse_number(&b_bytes[j..]);
                match a_num.cmp(&b_num) {
                    Ordering::Equal => {
                        i += a_len;
                        j += b_len;
                    }
                    ord => return ord,
                }
            }
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => match a_bytes[i].cmp(&b_bytes[j]) {
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
                ord => return ord,
            },
        }
    }

    (a_bytes.len() - i).cmp(&(b_bytes.len() - j)).then_with(|| a_bytes.cmp(b_bytes))
}

/// Parse a numeric run from the start of a byte slice.
/// Returns (number, bytes consumed).
fn parse_number(bytes: &[u8]) -> (u64, usize) {
    let mut num: u64 = 0;
    let mut i = 0;

    while i < bytes.len() && bytes[i].is_ascii_digit() {
        num = num.saturating_mul(10).saturating_add(u64::from(bytes[i] - b'0'));
        i += 1;
    }

    (num, i)
}
