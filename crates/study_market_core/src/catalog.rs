//! crates/study_market_core/src/catalog.rs
//!
//! The notes filter/sort pipeline, plus the filter options and headline stats
//! derived from the same in-memory note collection.
//!
//! Every function here borrows the full collection and returns a new,
//! fully materialized list; the source is never mutated.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::domain::Note;

//=========================================================================================
// Price range
//=========================================================================================

/// A price band parsed from `"min-max"` (closed) or `"min"` / `"min+"` (open-ended).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceRange {
    Between { min: f64, max: f64 },
    AtLeast(f64),
}

impl PriceRange {
    pub fn contains(&self, price: f64) -> bool {
        match *self {
            PriceRange::Between { min, max } => price >= min && price <= max,
            PriceRange::AtLeast(min) => price >= min,
        }
    }
}

impl FromStr for PriceRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().trim_end_matches('+').splitn(2, '-');
        let min = parts
            .next()
            .and_then(|m| m.trim().parse::<f64>().ok())
            .filter(|m| m.is_finite())
            .ok_or_else(|| format!("invalid price range '{}'", s))?;
        // A missing, zero or unreadable upper bound leaves the band open.
        let max = parts
            .next()
            .and_then(|m| m.trim().parse::<f64>().ok())
            .filter(|m| m.is_finite() && *m != 0.0);

        Ok(match max {
            Some(max) => PriceRange::Between { min, max },
            None => PriceRange::AtLeast(min),
        })
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceRange::Between { min, max } => write!(f, "{}-{}", min, max),
            PriceRange::AtLeast(min) => write!(f, "{}+", min),
        }
    }
}

//=========================================================================================
// Sort key
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    PriceLow,
    PriceHigh,
    Rating,
    Downloads,
}

impl SortKey {
    /// Reads a sort parameter. Unknown values sort newest first.
    pub fn from_param(value: &str) -> Self {
        match value {
            "oldest" => SortKey::Oldest,
            "price-low" => SortKey::PriceLow,
            "price-high" => SortKey::PriceHigh,
            "rating" => SortKey::Rating,
            "downloads" => SortKey::Downloads,
            _ => SortKey::Newest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::Oldest => "oldest",
            SortKey::PriceLow => "price-low",
            SortKey::PriceHigh => "price-high",
            SortKey::Rating => "rating",
            SortKey::Downloads => "downloads",
        }
    }
}

/// Sorts notes in place. The sort is stable, so ties keep their input order.
pub fn sort_notes(notes: &mut [Note], key: SortKey) {
    match key {
        SortKey::Newest => notes.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::Oldest => notes.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortKey::PriceLow => notes.sort_by(|a, b| a.price.total_cmp(&b.price)),
        SortKey::PriceHigh => notes.sort_by(|a, b| b.price.total_cmp(&a.price)),
        SortKey::Rating => {
            notes.sort_by(|a, b| rating_of(b).total_cmp(&rating_of(a)))
        }
        SortKey::Downloads => notes.sort_by(|a, b| b.downloads_count.cmp(&a.downloads_count)),
    }
}

fn rating_of(note: &Note) -> f64 {
    note.rating.unwrap_or(0.0)
}

//=========================================================================================
// Filters
//=========================================================================================

/// The filter and sort configuration applied to the marketplace listing.
/// `None` (or an empty search) disables the corresponding filter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NoteFilters {
    pub search: String,
    pub university: Option<String>,
    pub subject: Option<String>,
    pub price_range: Option<PriceRange>,
    pub min_rating: Option<f64>,
    pub sort: SortKey,
}

impl NoteFilters {
    /// True when the note passes every active filter.
    pub fn matches(&self, note: &Note) -> bool {
        self.matches_search(note)
            && self.university.as_ref().map_or(true, |u| &note.university == u)
            && self.subject.as_ref().map_or(true, |s| &note.subject == s)
            && self.price_range.map_or(true, |range| range.contains(note.price))
            && self.min_rating.map_or(true, |min| rating_of(note) >= min)
    }

    fn matches_search(&self, note: &Note) -> bool {
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        let hit = |field: &str| field.to_lowercase().contains(&needle);

        hit(&note.title)
            || note.description.as_deref().map_or(false, hit)
            || hit(&note.subject)
            || note.professor_name.as_deref().map_or(false, hit)
            || hit(&note.university)
    }

    /// Applies the filters without sorting, preserving input order.
    pub fn filter(&self, notes: &[Note]) -> Vec<Note> {
        notes.iter().filter(|n| self.matches(n)).cloned().collect()
    }

    /// Filters, then sorts by the configured key.
    pub fn apply(&self, notes: &[Note]) -> Vec<Note> {
        let mut filtered = self.filter(notes);
        sort_notes(&mut filtered, self.sort);
        filtered
    }

    /// Human readable labels for the active filters, in display order.
    pub fn active_filters(&self) -> Vec<String> {
        let mut labels = Vec::new();
        if !self.search.is_empty() {
            labels.push(format!("Search: \"{}\"", self.search));
        }
        if let Some(university) = &self.university {
            labels.push(format!("University: {}", university));
        }
        if let Some(subject) = &self.subject {
            labels.push(format!("Subject: {}", subject));
        }
        if let Some(range) = &self.price_range {
            labels.push(format!("Price: ₹{}", range));
        }
        if let Some(rating) = self.min_rating {
            labels.push(format!("Rating: {}+ stars", rating));
        }
        labels
    }

    /// Resets every filter and the sort key.
    pub fn clear(&mut self) {
        *self = NoteFilters::default();
    }
}

//=========================================================================================
// Filter options & stats
//=========================================================================================

/// Distinct values offered in the university and subject dropdowns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterOptions {
    pub universities: Vec<String>,
    pub subjects: Vec<String>,
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

/// Collects distinct universities and subjects in first-seen order.
pub fn filter_options(notes: &[Note]) -> FilterOptions {
    FilterOptions {
        universities: distinct(notes.iter().map(|n| n.university.as_str())),
        subjects: distinct(notes.iter().map(|n| n.subject.as_str())),
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarketplaceStats {
    pub total_notes: usize,
    pub total_sellers: usize,
    pub average_rating: f64,
    pub total_downloads: i64,
}

/// Headline numbers for the marketplace header. An empty set averages to 0.
pub fn marketplace_stats(notes: &[Note]) -> MarketplaceStats {
    let total_notes = notes.len();
    let total_sellers = notes.iter().map(|n| n.seller_id).collect::<HashSet<_>>().len();
    let average_rating = if total_notes == 0 {
        0.0
    } else {
        notes.iter().map(rating_of).sum::<f64>() / total_notes as f64
    };
    let total_downloads = notes.iter().map(|n| n.downloads_count as i64).sum();

    MarketplaceStats {
        total_notes,
        total_sellers,
        average_rating,
        total_downloads,
    }
}
