//! Sector/asset catalog and the cascading selection it drives

use crate::error::{AnalystError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// One sector and its ordered symbols
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorEntry {
    pub name: String,
    pub symbols: Vec<String>,
}

/// Static mapping from sector name to an ordered list of symbols
///
/// Invariants, checked on construction: at least one sector, sector names
/// are unique, every sector lists at least one symbol, and each symbol
/// belongs to exactly one sector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SectorCatalog {
    sectors: Vec<SectorEntry>,
}

const BUILTIN: &[(&str, &[&str])] = &[
    (
        "Technology",
        &["AAPL", "MSFT", "NVDA", "GOOGL", "META", "AMD", "CRM", "ADBE", "CSCO", "INTC", "ORCL", "IBM"],
    ),
    (
        "Healthcare",
        &["LLY", "UNH", "JNJ", "MRK", "ABBV", "PFE", "TMO", "ABT", "AMGN", "BMY", "CVS", "GILD"],
    ),
    (
        "Finance",
        &["JPM", "V", "MA", "BAC", "WFC", "GS", "MS", "AXP", "C", "BLK", "SCHW", "PGR"],
    ),
    (
        "Consumer Discretionary",
        &["AMZN", "TSLA", "HD", "MCD", "NKE", "SBUX", "LOW", "BKNG", "TJX", "TGT", "F", "MAR"],
    ),
];

impl SectorCatalog {
    /// Build a catalog, rejecting entries that break its invariants
    pub fn new(sectors: Vec<SectorEntry>) -> Result<Self> {
        if sectors.is_empty() {
            return Err(AnalystError::ConfigError(
                "catalog must contain at least one sector".to_string(),
            ));
        }

        let mut names = HashSet::new();
        let mut seen = HashSet::new();
        for entry in &sectors {
            if entry.name.trim().is_empty() {
                return Err(AnalystError::ConfigError("sector name must not be empty".to_string()));
            }
            if !names.insert(entry.name.as_str()) {
                return Err(AnalystError::ConfigError(format!(
                    "sector '{}' is defined twice",
                    entry.name
                )));
            }
            if entry.symbols.is_empty() {
                return Err(AnalystError::ConfigError(format!(
                    "sector '{}' has no symbols",
                    entry.name
                )));
            }
            for symbol in &entry.symbols {
                if symbol.trim().is_empty() {
                    return Err(AnalystError::ConfigError(format!(
                        "sector '{}' contains an empty symbol",
                        entry.name
                    )));
                }
                if !seen.insert(symbol.as_str()) {
                    return Err(AnalystError::ConfigError(format!(
                        "symbol '{symbol}' appears more than once in the catalog"
                    )));
                }
            }
        }

        Ok(Self { sectors })
    }

    /// The four sectors the dashboard ships with
    pub fn builtin() -> Self {
        Self {
            sectors: BUILTIN
                .iter()
                .map(|(name, symbols)| SectorEntry {
                    name: (*name).to_string(),
                    symbols: symbols.iter().map(|s| (*s).to_string()).collect(),
                })
                .collect(),
        }
    }

    /// Parse a catalog from JSON: `[{"name": "...", "symbols": ["..."]}]`
    pub fn from_json(json: &str) -> Result<Self> {
        let sectors: Vec<SectorEntry> = serde_json::from_str(json)
            .map_err(|e| AnalystError::ConfigError(format!("invalid catalog JSON: {e}")))?;
        Self::new(sectors)
    }

    /// Load a catalog file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AnalystError::ConfigError(format!("cannot read catalog {}: {e}", path.display()))
        })?;
        let catalog = Self::from_json(&raw)?;
        debug!(path = %path.display(), sectors = catalog.sectors.len(), "Loaded catalog");
        Ok(catalog)
    }

    /// Sector names in catalog order
    pub fn list_sectors(&self) -> Vec<&str> {
        self.sectors.iter().map(|e| e.name.as_str()).collect()
    }

    /// Symbols of a sector, in catalog order
    pub fn symbols_for(&self, sector: &str) -> Result<&[String]> {
        self.entry(sector).map(|e| e.symbols.as_slice())
    }

    /// First symbol of a sector
    pub fn default_symbol(&self, sector: &str) -> Result<&str> {
        let symbols = self.symbols_for(sector)?;
        symbols
            .first()
            .map(String::as_str)
            .ok_or_else(|| AnalystError::InvalidSector(sector.to_string()))
    }

    /// Selection on the first sector and its default symbol
    pub fn initial_selection(&self) -> AssetSelection {
        let entry = &self.sectors[0];
        AssetSelection {
            sector: entry.name.clone(),
            symbol: entry.symbols[0].clone(),
        }
    }

    /// Select a sector and its default symbol
    pub fn select(&self, sector: &str) -> Result<AssetSelection> {
        Ok(AssetSelection {
            sector: sector.to_string(),
            symbol: self.default_symbol(sector)?.to_string(),
        })
    }

    /// All entries
    pub fn entries(&self) -> &[SectorEntry] {
        &self.sectors
    }

    fn entry(&self, sector: &str) -> Result<&SectorEntry> {
        self.sectors
            .iter()
            .find(|e| e.name == sector)
            .ok_or_else(|| AnalystError::InvalidSector(sector.to_string()))
    }
}

impl Default for SectorCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// The currently selected (sector, symbol) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSelection {
    sector: String,
    symbol: String,
}

impl AssetSelection {
    /// Selected sector
    pub fn sector(&self) -> &str {
        &self.sector
    }

    /// Selected symbol
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Switch sector; the symbol always resets to that sector's default
    pub fn change_sector(&mut self, catalog: &SectorCatalog, sector: &str) -> Result<()> {
        let symbol = catalog.default_symbol(sector)?.to_string();
        debug!(from = %self.sector, to = sector, %symbol, "Sector changed");
        self.sector = sector.to_string();
        self.symbol = symbol;
        Ok(())
    }

    /// Switch symbol within the current sector
    pub fn change_symbol(&mut self, catalog: &SectorCatalog, symbol: &str) -> Result<()> {
        let wanted = symbol.trim();
        let listed = catalog
            .symbols_for(&self.sector)?
            .iter()
            .find(|s| s.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AnalystError::InvalidSymbol {
                sector: self.sector.clone(),
                symbol: symbol.to_string(),
            })?;
        self.symbol = listed.clone();
        Ok(())
    }
}
