use std::fmt;
use std::future::Future;

use rand::Rng;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{CoreError, CoreResult};

/// Retry budget for unique-name allocation.
pub const ALLOC_ATTEMPTS: u32 = 50;

pub const LEFT_WORDS: &[&str] = &[
    "quiet", "brave", "sleepy", "sturdy", "gentle", "rapid", "mellow", "bold",
    "dusty", "shiny", "cosmic", "frosty", "lucky", "merry", "nimble", "proud",
    "rustic", "silent", "tidy", "vivid", "wandering", "witty", "zealous", "calm",
];

pub const CENTER_WORDS: &[&str] = &[
    "amber", "azure", "coral", "crimson", "emerald", "golden", "indigo", "ivory",
    "jade", "lilac", "maroon", "navy", "ochre", "olive", "pearl", "plum",
    "rose", "ruby", "sable", "scarlet", "silver", "teal", "umber", "violet",
];

pub const RIGHT_WORDS: &[&str] = &[
    "badger", "bison", "crane", "dingo", "falcon", "gecko", "heron", "ibex",
    "jackal", "koala", "lemur", "marmot", "newt", "otter", "panther", "quail",
    "raven", "stoat", "tapir", "urchin", "vole", "walrus", "wombat", "lynx",
];

/// Human-memorable rule identifier: three indices into the fixed word lists.
///
/// Canonical text form is `left-center-right`; that string is what gets
/// persisted and what users type back in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RuleName {
    pub left: usize,
    pub center: usize,
    pub right: usize,
}

impl RuleName {
    pub fn canonical(&self) -> String {
        format!(
            "{}-{}-{}",
            LEFT_WORDS[self.left], CENTER_WORDS[self.center], RIGHT_WORDS[self.right]
        )
    }

    /// Deterministic accent color (24-bit RGB) for this rule's provenance
    /// footer.
    pub fn accent_color(&self) -> u32 {
        hash_color(&self.canonical())
    }
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl Serialize for RuleName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical())
    }
}

impl<'de> Deserialize<'de> for RuleName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let resolved = resolve(&s).map_err(D::Error::custom)?;
        if !resolved.exact {
            return Err(D::Error::custom("not a canonical rule name"));
        }
        Ok(resolved.name)
    }
}

/// Uniform index source, injectable so allocation is testable without a real
/// RNG.
pub trait IndexSampler: Send {
    fn sample(&mut self, len: usize) -> usize;
}

/// Production sampler over the thread RNG.
#[derive(Default)]
pub struct RandSampler;

impl IndexSampler for RandSampler {
    fn sample(&mut self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Sample names until `exists` reports a free one, up to [`ALLOC_ATTEMPTS`].
///
/// The existence check is the store's uniqueness check; check-then-insert is
/// best effort (see the schema's unique index for the backstop).
pub async fn allocate<S, F, Fut>(sampler: &mut S, exists: F) -> CoreResult<RuleName>
where
    S: IndexSampler + ?Sized,
    F: Fn(RuleName) -> Fut,
    Fut: Future<Output = CoreResult<bool>>,
{
    for _ in 0..ALLOC_ATTEMPTS {
        let name = RuleName {
            left: sampler.sample(LEFT_WORDS.len()),
            center: sampler.sample(CENTER_WORDS.len()),
            right: sampler.sample(RIGHT_WORDS.len()),
        };
        if !exists(name).await? {
            return Ok(name);
        }
    }
    Err(CoreError::NameExhausted { attempts: ALLOC_ATTEMPTS })
}

/// Result of resolving user-typed text back into word-list indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub name: RuleName,
    /// All three parts matched their word exactly. When false the caller must
    /// show the corrected canonical form before acting on it.
    pub exact: bool,
}

/// Fuzzy-resolve a typed identifier: each part independently matches the
/// closest word in its list.
pub fn resolve(text: &str) -> CoreResult<Resolved> {
    let parts: Vec<&str> = text
        .split(|c: char| c == '-' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 3 {
        return Err(CoreError::Validation {
            field: "name",
            reason: "expected three words",
        });
    }

    let (left, le) = best_match(parts[0], LEFT_WORDS);
    let (center, ce) = best_match(parts[1], CENTER_WORDS);
    let (right, re) = best_match(parts[2], RIGHT_WORDS);

    Ok(Resolved {
        name: RuleName { left, center, right },
        exact: le && ce && re,
    })
}

fn best_match(part: &str, words: &[&str]) -> (usize, bool) {
    let part = part.to_ascii_lowercase();
    let mut best = 0usize;
    let mut best_dist = usize::MAX;
    for (i, w) in words.iter().enumerate() {
        let d = edit_distance(&part, w);
        if d < best_dist {
            best = i;
            best_dist = d;
        }
    }
    (best, best_dist == 0)
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let sub = prev[j] + usize::from(ca != cb);
            cur[j + 1] = sub.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Color for a merged (multi-rule) provenance footer; never collides with any
/// contributing rule's own accent color so merged provenance stays visually
/// distinct.
pub fn merged_color(names: &[RuleName]) -> u32 {
    let joined: Vec<String> = names.iter().map(RuleName::canonical).collect();
    let mut color = hash_color(&joined.join("+"));
    while names.iter().any(|n| n.accent_color() == color) {
        color = (color.wrapping_mul(31).wrapping_add(0x9e3779)) & 0xFF_FF_FF;
    }
    color
}

fn hash_color(s: &str) -> u32 {
    // FNV-1a folded to 24 bits.
    let mut h: u64 = 0xcbf29ce484222325;
    for b in s.bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    ((h ^ (h >> 24) ^ (h >> 48)) & 0xFF_FF_FF) as u32
}
