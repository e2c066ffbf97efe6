// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::model::{GridLayoutData, SavedBundle, SearchPatternData, TabLayoutData};
use crate::sort::SortKey;

/// The three kinds of named bundles the backend stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    Layout,
    SearchPattern,
    TabLayout,
}

impl BundleKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Layout => "layout",
            Self::SearchPattern => "search pattern",
            Self::TabLayout => "tab layout",
        }
    }
}

/// Contents of a bundle of any kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundlePayload {
    Layout(GridLayoutData),
    SearchPattern(SearchPatternData),
    TabLayout(TabLayoutData),
}

impl BundlePayload {
    pub const fn kind(&self) -> BundleKind {
        match self {
            Self::Layout(_) => BundleKind::Layout,
            Self::SearchPattern(_) => BundleKind::SearchPattern,
            Self::TabLayout(_) => BundleKind::TabLayout,
        }
    }
}

/// Picks the one default to honour. Several flagged defaults resolve to the
/// most recently updated, ties to the higher id.
pub fn resolve_default<T>(bundles: &[SavedBundle<T>]) -> Option<&SavedBundle<T>> {
    let flagged: Vec<&SavedBundle<T>> = bundles.iter().filter(|bundle| bundle.is_default).collect();
    if flagged.len() > 1 {
        log::warn!(
            "{} bundles are flagged default; using the most recently updated",
            flagged.len()
        );
    }
    flagged
        .into_iter()
        .max_by_key(|bundle| (SortKey::parse(&bundle.updated_at), bundle.id))
}

pub fn find_by_name<'a, T>(bundles: &'a [SavedBundle<T>], name: &str) -> Option<&'a SavedBundle<T>> {
    let name = name.trim();
    bundles.iter().find(|bundle| bundle.name.trim() == name)
}

pub fn validate_bundle_name(kind: BundleKind, name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        bail!("{} name is empty -- type a name before saving", kind.as_str());
    }
    Ok(trimmed.to_owned())
}
