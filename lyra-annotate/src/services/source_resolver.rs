//! Source resolution: find plain lines and synced lyrics for a title/artist
//!
//! Lookup failures of any kind (network, timeout, malformed response) mean "no match".
//! Resolution never fails the request.

use lyra_common::lrc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::lrclib_client::{Candidate, CatalogError, LyricCatalog};
use super::musicbrainz_client::CatalogProbe;

/// What the catalog contributed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Discovered plain lines (only when the caller supplied none)
    pub lines: Option<Vec<String>>,
    /// Synced lyrics of the winning candidate
    pub synced_lyrics: Option<String>,
}

/// Why a candidate won, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    ExactTitleWithSynced,
    PartialTitleWithSynced,
    AnyWithSynced,
    FirstCandidate,
}

/// Pick the best candidate for `title`
pub fn rank<'a>(title: &str, candidates: &'a [Candidate]) -> Option<(&'a Candidate, MatchTier)> {
    let wanted = normalize_title(title);

    let exact = candidates
        .iter()
        .find(|c| c.has_synced_lyrics() && normalize_title(&c.name) == wanted);
    if let Some(candidate) = exact {
        return Some((candidate, MatchTier::ExactTitleWithSynced));
    }

    let partial = candidates.iter().find(|c| {
        let name = normalize_title(&c.name);
        c.has_synced_lyrics()
            && !name.is_empty()
            && !wanted.is_empty()
            && (name.contains(&wanted) || wanted.contains(&name))
    });
    if let Some(candidate) = partial {
        return Some((candidate, MatchTier::PartialTitleWithSynced));
    }

    if let Some(candidate) = candidates.iter().find(|c| c.has_synced_lyrics()) {
        return Some((candidate, MatchTier::AnyWithSynced));
    }

    candidates.first().map(|c| (c, MatchTier::FirstCandidate))
}

fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Plain lines of a candidate, derived from its synced lyrics when no plain text exists
pub fn candidate_lines(candidate: &Candidate) -> Option<Vec<String>> {
    let lines: Vec<String> = match (&candidate.plain_lyrics, &candidate.synced_lyrics) {
        (Some(plain), _) => plain.lines().map(|l| l.trim_end().to_string()).collect(),
        (None, Some(synced)) => lrc::plain_lines(synced),
        (None, None) => return None,
    };

    if lines.iter().any(|l| !l.trim().is_empty()) {
        Some(lines)
    } else {
        None
    }
}

/// Catalog-backed resolver
pub struct SourceResolver {
    catalog: Arc<dyn LyricCatalog>,
    probe: Option<Arc<dyn CatalogProbe>>,
    timeout: Duration,
}

impl SourceResolver {
    pub fn new(catalog: Arc<dyn LyricCatalog>, timeout: Duration) -> Self {
        Self {
            catalog,
            probe: None,
            timeout,
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn CatalogProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Resolve lyrics for `title`/`artist`
    ///
    /// `caller_has_lines` suppresses discovered plain lines; synced lyrics are returned regardless.
    pub async fn resolve(
        &self,
        title: Option<&str>,
        artist: Option<&str>,
        caller_has_lines: bool,
    ) -> Resolution {
        let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) else {
            debug!("No title supplied, skipping catalog lookup");
            return Resolution::default();
        };
        let artist = artist.map(str::trim).filter(|a| !a.is_empty());

        self.spawn_probe(title, artist);

        let mut candidates = Vec::new();
        if let Some(artist) = artist {
            candidates = self.search(&format!("{title} {artist}")).await;
        }
        if candidates.is_empty() {
            candidates = self.search(title).await;
        }

        let Some((winner, tier)) = rank(title, &candidates) else {
            info!(title = %title, "No catalog match");
            return Resolution::default();
        };

        info!(
            title = %title,
            candidate_id = %winner.id,
            candidate_title = %winner.name,
            tier = ?tier,
            has_synced = winner.has_synced_lyrics(),
            "Catalog match selected"
        );

        Resolution {
            lines: if caller_has_lines {
                None
            } else {
                candidate_lines(winner)
            },
            synced_lyrics: winner.synced_lyrics.clone(),
        }
    }

    /// Time-bounded search; every failure becomes an empty result
    async fn search(&self, query: &str) -> Vec<Candidate> {
        let result = match tokio::time::timeout(self.timeout, self.catalog.search(query)).await {
            Ok(result) => result,
            Err(_) => Err(CatalogError::Timeout(self.timeout)),
        };

        match result {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(
                    catalog = self.catalog.name(),
                    query = %query,
                    error = %e,
                    "Catalog lookup failed, treating as no match"
                );
                Vec::new()
            }
        }
    }

    /// Fire the diagnostic probe without waiting for it
    fn spawn_probe(&self, title: &str, artist: Option<&str>) {
        let Some(probe) = self.probe.clone() else {
            return;
        };
        let title = title.to_string();
        let artist = artist.map(str::to_string);
        let timeout = self.timeout;

        tokio::spawn(async move {
            let lookup = probe.count_matches(&title, artist.as_deref());
            match tokio::time::timeout(timeout, lookup).await {
                Ok(Ok(count)) => info!(
                    probe = probe.name(),
                    title = %title,
                    matches = count,
                    "Secondary catalog probe"
                ),
                Ok(Err(e)) => debug!(probe = probe.name(), error = %e, "Secondary catalog probe failed"),
                Err(_) => debug!(probe = probe.name(), "Secondary catalog probe timed out"),
            }
        });
    }
}
