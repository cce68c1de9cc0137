//! Model chart colors
//!
//! A model gets a color lazily the first time one is asked for, and keeps it
//! forever. New colors are drawn at random and rejected when perceptually
//! close to an existing one, up to a bounded number of attempts.

use rand::Rng;

/// Default minimum redmean distance between assigned colors
pub const DEFAULT_MIN_DISTANCE: f64 = 90.0;

/// Default number of random candidates tried
pub const DEFAULT_MAX_ATTEMPTS: u32 = 50;

/// Color assignment parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorPolicy {
    /// Minimum distance to every existing color
    pub min_distance: f64,
    /// Candidates tried before accepting the last one
    pub max_attempts: u32,
}

impl Default for ColorPolicy {
    fn default() -> Self {
        Self {
            min_distance: DEFAULT_MIN_DISTANCE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Parse `#rrggbb`
#[must_use]
pub fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Format as `#rrggbb`
#[must_use]
pub fn to_hex((r, g, b): (u8, u8, u8)) -> String {
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

/// "Redmean" weighted RGB distance, a cheap perceptual approximation
#[must_use]
pub fn redmean_distance(a: (u8, u8, u8), b: (u8, u8, u8)) -> f64 {
    let mean_r = (f64::from(a.0) + f64::from(b.0)) / 2.0;
    let dr = f64::from(a.0) - f64::from(b.0);
    let dg = f64::from(a.1) - f64::from(b.1);
    let db = f64::from(a.2) - f64::from(b.2);
    ((2.0 + mean_r / 256.0) * dr * dr + 4.0 * dg * dg + (2.0 + (255.0 - mean_r) / 256.0) * db * db)
        .sqrt()
}

/// Pick a color far enough from `existing`, best effort
pub fn assign_color<'a, R: Rng + ?Sized>(
    existing: impl IntoIterator<Item = &'a str>,
    policy: &ColorPolicy,
    rng: &mut R,
) -> String {
    let taken: Vec<(u8, u8, u8)> = existing.into_iter().filter_map(parse_hex).collect();

    let attempts = policy.max_attempts.max(1);
    let mut candidate = random_color(rng);
    for _ in 1..attempts {
        if taken
            .iter()
            .all(|color| redmean_distance(*color, candidate) >= policy.min_distance)
        {
            break;
        }
        candidate = random_color(rng);
    }
    to_hex(candidate)
}

// mid-range channels keep colors readable on light and dark backgrounds
fn random_color<R: Rng + ?Sized>(rng: &mut R) -> (u8, u8, u8) {
    (
        rng.gen_range(40..=215),
        rng.gen_range(40..=215),
        rng.gen_range(40..=215),
    )
}
