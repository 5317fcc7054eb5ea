//! Universe configuration: the basket of symbols to analyse.
//!
//! Stored as a TOML table of `"exchange:ticker" = "Display Name"` pairs.
//! The built-in default is a cross-sector basket of large US-listed names.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::SymbolTable;

/// The basket of symbols for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub symbols: BTreeMap<String, String>,
}

impl Universe {
    /// Load a universe from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("read universe file: {e}"))?;
        Self::from_toml(&content)
    }

    /// Parse a universe from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        let universe: Self =
            toml::from_str(content).map_err(|e| format!("parse universe TOML: {e}"))?;
        if universe.symbols.is_empty() {
            return Err("universe has no symbols".into());
        }
        Ok(universe)
    }

    /// Symbols in canonical order.
    pub fn table(&self) -> SymbolTable {
        SymbolTable::from_pairs(self.symbols.iter().map(|(id, name)| (id.clone(), name.clone())))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// The default cross-sector US equity basket.
    pub fn default_us() -> Self {
        let pairs = [
            ("NYSE:TOT", "Total"),
            ("NYSE:XOM", "Exxon"),
            ("NYSE:CVX", "Chevron"),
            ("NYSE:COP", "ConocoPhillips"),
            ("NYSE:VLO", "Valero Energy"),
            ("NASDAQ:MSFT", "Microsoft"),
            ("NYSE:IBM", "IBM"),
            ("NYSE:TWX", "Time Warner"),
            ("NASDAQ:CMCSA", "Comcast"),
            ("NYSE:CVC", "Cablevision"),
            ("NYSE:HPQ", "HP"),
            ("NYSE:TM", "Toyota"),
            ("NYSE:CAJ", "Canon"),
            ("NYSE:SNE", "Sony"),
            ("NYSE:F", "Ford"),
            ("NYSE:HMC", "Honda"),
            ("NYSE:NAV", "Navistar"),
            ("NYSE:NOC", "Northrop Grumman"),
            ("NYSE:BA", "Boeing"),
            ("NYSE:KO", "Coca Cola"),
            ("NYSE:MMM", "3M"),
            ("NYSE:MCD", "McDonald's"),
            ("NYSE:PEP", "Pepsi"),
            ("NYSE:K", "Kellogg"),
            ("NYSE:UN", "Unilever"),
            ("NYSE:PG", "Procter Gamble"),
            ("NYSE:CL", "Colgate-Palmolive"),
            ("NYSE:GE", "General Electrics"),
            ("NYSE:WFC", "Wells Fargo"),
            ("NYSE:JPM", "JPMorgan Chase"),
            ("NYSE:AIG", "AIG"),
            ("NYSE:AXP", "American express"),
            ("NYSE:BAC", "Bank of America"),
            ("NYSE:GS", "Goldman Sachs"),
            ("NYSE:SAP", "SAP"),
            ("NYSE:XRX", "Xerox"),
            ("NYSE:WMT", "Wal-Mart"),
            ("NYSE:HD", "Home Depot"),
            ("NYSE:GSK", "GlaxoSmithKline"),
            ("NYSE:PFE", "Pfizer"),
            ("NYSE:SNY", "Sanofi-Aventis"),
            ("NYSE:NVS", "Novartis"),
            ("NYSE:KMB", "Kimberly-Clark"),
            ("NYSE:R", "Ryder"),
            ("NYSE:GD", "General Dynamics"),
            ("NYSE:RTN", "Raytheon"),
            ("NYSE:CVS", "CVS"),
            ("NYSE:CAT", "Caterpillar"),
            ("NYSE:DD", "DuPont de Nemours"),
        ];

        Self {
            symbols: pairs
                .into_iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect(),
        }
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::default_us()
    }
}
