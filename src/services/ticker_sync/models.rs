// File: src/services/ticker_sync/models.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    Etf,
    Other,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Equity => "equity",
            AssetClass::Etf => "etf",
            AssetClass::Other => "other",
        }
    }

    /// Maps the loose vocabulary providers use onto the three stored classes.
    pub fn from_provider(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("equity" | "stock" | "common stock" | "cs" | "ads" | "adr") => AssetClass::Equity,
            Some("etf" | "etp" | "fund" | "etn") => AssetClass::Etf,
            // SEC style catalogs list operating companies only
            None | Some("") => AssetClass::Equity,
            Some(_) => AssetClass::Other,
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equity" => Ok(AssetClass::Equity),
            "etf" => Ok(AssetClass::Etf),
            "other" => Ok(AssetClass::Other),
            other => Err(format!("unknown asset class '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentStatus {
    Active,
    Delisted,
}

impl InstrumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentStatus::Active => "active",
            InstrumentStatus::Delisted => "delisted",
        }
    }

    /// `None` means the provider used a status word we do not recognise.
    pub fn from_provider(raw: Option<&str>) -> Option<Self> {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            None | Some("") => Some(InstrumentStatus::Active),
            // A halt or suspension is temporary; the listing stays
            Some("active" | "trading" | "listed" | "halted" | "suspended") => {
                Some(InstrumentStatus::Active)
            }
            Some("delisted" | "inactive") => Some(InstrumentStatus::Delisted),
            Some(_) => None,
        }
    }
}

impl fmt::Display for InstrumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstrumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(InstrumentStatus::Active),
            "delisted" => Ok(InstrumentStatus::Delisted),
            other => Err(format!("unknown instrument status '{}'", other)),
        }
    }
}

/// (symbol, exchange). Ordering is lexicographic on symbol then exchange,
/// which fixes the order changes are written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NaturalKey {
    pub symbol: String,
    pub exchange: String,
}

impl NaturalKey {
    pub fn new(symbol: &str, exchange: &str) -> Self {
        Self {
            symbol: normalize_code(symbol),
            exchange: normalize_code(exchange),
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.exchange, self.symbol)
    }
}

pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// One row of the `stocks` reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub symbol: String,
    pub exchange: String,
    pub display_name: String,
    pub asset_class: AssetClass,
    pub status: InstrumentStatus,
}

impl InstrumentRecord {
    /// The key exactly as stored, which is what addresses the row.
    pub fn key(&self) -> NaturalKey {
        NaturalKey {
            symbol: self.symbol.clone(),
            exchange: self.exchange.clone(),
        }
    }

    /// The key as compared: trimmed and upper-cased.
    pub fn normalized_key(&self) -> NaturalKey {
        NaturalKey::new(&self.symbol, &self.exchange)
    }

    /// True when any field other than the natural key differs.
    pub fn mutable_fields_differ(&self, other: &InstrumentRecord) -> bool {
        self.display_name != other.display_name
            || self.asset_class != other.asset_class
            || self.status != other.status
    }

    pub fn retired(&self) -> InstrumentRecord {
        InstrumentRecord {
            status: InstrumentStatus::Delisted,
            ..self.clone()
        }
    }
}

/// Entry as handed over by a provider, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawInstrument {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default, alias = "title")]
    pub name: Option<String>,
    #[serde(default, alias = "type")]
    pub asset_class: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl RawInstrument {
    pub fn symbol_text(&self) -> &str {
        self.symbol.as_deref().unwrap_or_default()
    }

    /// Reads one provider entry without failing its page. An entry with
    /// mistyped fields keeps only its symbol, when that is a string, and is
    /// left for the normalizer to reject.
    pub fn from_value(value: serde_json::Value) -> Self {
        let symbol = value
            .get("symbol")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);

        match serde_json::from_value::<RawInstrument>(value) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Unreadable catalog entry (symbol {:?}): {}", symbol, e);
                RawInstrument {
                    symbol,
                    ..Default::default()
                }
            }
        }
    }
}

/// A page of provider entries. `has_more == false` ends the sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentPage {
    pub entries: Vec<RawInstrument>,
    pub has_more: bool,
}

/// What a run must do for one natural key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Insert(InstrumentRecord),
    Update {
        before: InstrumentRecord,
        after: InstrumentRecord,
    },
    Unchanged(NaturalKey),
    Retire(InstrumentRecord),
}

impl Change {
    /// Normalized key of the instrument the change is about.
    pub fn key(&self) -> NaturalKey {
        match self {
            Change::Insert(record) => record.normalized_key(),
            Change::Update { after, .. } => after.normalized_key(),
            Change::Unchanged(key) => key.clone(),
            Change::Retire(record) => record.normalized_key(),
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, Change::Unchanged(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueReason {
    DuplicateKey,
    InvalidRecord,
}

impl fmt::Display for IssueReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueReason::DuplicateKey => write!(f, "duplicate_key"),
            IssueReason::InvalidRecord => write!(f, "invalid_record"),
        }
    }
}

/// Non-fatal data-quality finding recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncIssue {
    pub symbol: String,
    pub reason: IssueReason,
}

/// Per-run summary. Built fresh for every run and only reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub retired: usize,
    pub unchanged: usize,
    pub errors: Vec<SyncIssue>,
}

impl SyncOutcome {
    pub fn from_changes(changes: &[Change], errors: Vec<SyncIssue>) -> Self {
        let mut outcome = SyncOutcome {
            errors,
            ..Default::default()
        };
        for change in changes {
            match change {
                Change::Insert(_) => outcome.inserted += 1,
                Change::Update { .. } => outcome.updated += 1,
                Change::Unchanged(_) => outcome.unchanged += 1,
                Change::Retire(_) => outcome.retired += 1,
            }
        }
        outcome
    }

    pub fn writes(&self) -> usize {
        self.inserted + self.updated + self.retired
    }
}
