//! Compatibility and best-match resolution.
//!
//! Resolution of a target configuration against a set of candidates runs in
//! two phases:
//!
//! ```text
//! candidates ──► is_match_for(target) ──► compatible set
//!                                              │
//!            for each axis in precedence order ▼
//!   target specifies axis?  yes: best-scoring specified value survives
//!                           no:  unqualified candidates survive (if any)
//!                                              │
//!                                              ▼
//!                                first survivor (insertion order)
//! ```
//!
//! Scoring is per axis: range axes prefer the highest value not exceeding the
//! target, density prefers an exact match, then the highest density not
//! exceeding the target, then the highest available, with `anydpi` above all
//! and `nodpi` below all. Locale prefers a matching region over a bare
//! language.

use super::folder::FolderConfiguration;
use super::qualifier::{Density, Qualifier, QualifierKind};

/// Anything that carries a folder configuration and can take part in
/// best-match resolution.
pub trait Configurable {
    fn configuration(&self) -> &FolderConfiguration;
}

impl Configurable for FolderConfiguration {
    fn configuration(&self) -> &FolderConfiguration {
        self
    }
}

impl<T: Configurable + ?Sized> Configurable for &T {
    fn configuration(&self) -> &FolderConfiguration {
        (**self).configuration()
    }
}

impl<T: Configurable + ?Sized> Configurable for std::sync::Arc<T> {
    fn configuration(&self) -> &FolderConfiguration {
        (**self).configuration()
    }
}

/// Density assumed for a target whose density is `nodpi` or `anydpi`.
const FALLBACK_TARGET_DPI: u32 = 160;

impl Qualifier {
    /// Whether this candidate value is usable for the target value on the
    /// same axis.
    pub fn is_match_for(&self, target: &Qualifier) -> bool {
        match (self, target) {
            (Qualifier::Locale(c), Qualifier::Locale(t)) => {
                c.language == t.language
                    && c.region.as_ref().map_or(true, |r| t.region.as_ref() == Some(r))
                    && c.script.as_ref().map_or(true, |s| t.script.as_ref() == Some(s))
            }
            (Qualifier::Density(_), Qualifier::Density(_)) => true,
            (Qualifier::SmallestScreenWidth(c), Qualifier::SmallestScreenWidth(t))
            | (Qualifier::ScreenWidth(c), Qualifier::ScreenWidth(t))
            | (Qualifier::ScreenHeight(c), Qualifier::ScreenHeight(t))
            | (Qualifier::Version(c), Qualifier::Version(t)) => c <= t,
            (Qualifier::ScreenSize(c), Qualifier::ScreenSize(t)) => c <= t,
            (c, t) => c == t,
        }
    }

    /// Score of this candidate value for the target value; higher is better.
    fn match_score(&self, target: &Qualifier) -> (i64, i64) {
        match (self, target) {
            (Qualifier::Locale(c), Qualifier::Locale(t)) => {
                let region = c.region.is_some() && c.region == t.region;
                let script = c.script.is_some() && c.script == t.script;
                ((region as i64) * 2 + script as i64, 0)
            }
            (Qualifier::Density(c), Qualifier::Density(t)) => density_score(*c, *t),
            (Qualifier::SmallestScreenWidth(c), _)
            | (Qualifier::ScreenWidth(c), _)
            | (Qualifier::ScreenHeight(c), _)
            | (Qualifier::Version(c), _) => (*c as i64, 0),
            (Qualifier::ScreenSize(c), _) => (*c as i64, 0),
            _ => (0, 0),
        }
    }
}

/// Density preference tiers: anydpi, exact, highest below, highest above,
/// nodpi.
fn density_score(candidate: Density, target: Density) -> (i64, i64) {
    let target_dpi = target.dpi().unwrap_or(FALLBACK_TARGET_DPI);
    match candidate {
        Density::AnyDpi => (4, 0),
        Density::Dpi(dpi) if dpi == target_dpi => (3, 0),
        Density::Dpi(dpi) if dpi < target_dpi => (2, dpi as i64),
        Density::Dpi(dpi) => (1, dpi as i64),
        Density::NoDpi => (0, 0),
    }
}

impl FolderConfiguration {
    /// Whether every axis this configuration specifies is compatible with the
    /// target. Axes the target leaves unspecified are compatible.
    pub fn is_match_for(&self, target: &FolderConfiguration) -> bool {
        QualifierKind::ALL.iter().all(|kind| {
            match (self.qualifier(*kind), target.qualifier(*kind)) {
                (Some(candidate), Some(wanted)) => candidate.is_match_for(wanted),
                _ => true,
            }
        })
    }

    /// Pick the candidate best matching this (target) configuration.
    ///
    /// Returns `None` when no candidate is compatible. When several
    /// candidates remain equivalent after every axis, the earliest one wins.
    pub fn find_matching<'a, T: Configurable>(&self, candidates: &'a [T]) -> Option<&'a T> {
        let mut remaining: Vec<&'a T> = candidates
            .iter()
            .filter(|c| c.configuration().is_match_for(self))
            .collect();

        for kind in QualifierKind::ALL {
            if remaining.len() <= 1 {
                break;
            }
            match self.qualifier(kind) {
                Some(wanted) => {
                    let best = remaining
                        .iter()
                        .filter_map(|c| c.configuration().qualifier(kind))
                        .map(|q| q.match_score(wanted))
                        .max();
                    if let Some(best) = best {
                        remaining.retain(|c| {
                            c.configuration()
                                .qualifier(kind)
                                .is_some_and(|q| q.match_score(wanted) == best)
                        });
                    }
                }
                None => {
                    let has_unqualified = remaining
                        .iter()
                        .any(|c| c.configuration().qualifier(kind).is_none());
                    if has_unqualified {
                        remaining.retain(|c| c.configuration().qualifier(kind).is_none());
                    } else {
                        // Everyone is qualified on an axis the target does not
                        // care about: keep the most general value.
                        let least = remaining
                            .iter()
                            .filter_map(|c| c.configuration().qualifier(kind))
                            .min()
                            .cloned();
                        remaining.retain(|c| c.configuration().qualifier(kind) == least.as_ref());
                    }
                }
            }
        }

        remaining.first().copied()
    }
}
