// src/types.rs

//! Shared identifiers and domain enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of intermediate product consumed by the pipeline.
///
/// Declaration order is also the order in which product types are batched,
/// merged and listed in the execution manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProductType {
    #[serde(rename = "ndvi")]
    Ndvi,
    #[serde(rename = "amp")]
    Amplitude,
    #[serde(rename = "cohe")]
    Coherence,
}

impl ProductType {
    pub const ALL: [ProductType; 3] = [
        ProductType::Ndvi,
        ProductType::Amplitude,
        ProductType::Coherence,
    ];

    /// Short tag used in file names and tool arguments.
    pub fn tag(self) -> &'static str {
        match self {
            ProductType::Ndvi => "ndvi",
            ProductType::Amplitude => "amp",
            ProductType::Coherence => "cohe",
        }
    }

    /// Upper-case tag used in merged file names.
    pub fn file_tag(self) -> &'static str {
        match self {
            ProductType::Ndvi => "NDVI",
            ProductType::Amplitude => "AMP",
            ProductType::Coherence => "COHE",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ProductType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ndvi" => Ok(ProductType::Ndvi),
            "amp" | "amplitude" => Ok(ProductType::Amplitude),
            "cohe" | "coherence" => Ok(ProductType::Coherence),
            other => Err(format!(
                "invalid product type: {other} (expected \"ndvi\", \"amp\" or \"cohe\")"
            )),
        }
    }
}

/// Agricultural practice category with its own analysis parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Practice {
    #[serde(rename = "CC")]
    CatchCrop,
    #[serde(rename = "FL")]
    Fallow,
    #[serde(rename = "NFC")]
    NitrogenFixingCrop,
    #[serde(rename = "NA")]
    NoApplication,
}

impl Practice {
    pub const ALL: [Practice; 4] = [
        Practice::CatchCrop,
        Practice::Fallow,
        Practice::NitrogenFixingCrop,
        Practice::NoApplication,
    ];

    /// Code used in configuration files, tool arguments and output names.
    pub fn code(self) -> &'static str {
        match self {
            Practice::CatchCrop => "CC",
            Practice::Fallow => "FL",
            Practice::NitrogenFixingCrop => "NFC",
            Practice::NoApplication => "NA",
        }
    }
}

impl fmt::Display for Practice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Practice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CC" => Ok(Practice::CatchCrop),
            "FL" => Ok(Practice::Fallow),
            "NFC" => Ok(Practice::NitrogenFixingCrop),
            "NA" => Ok(Practice::NoApplication),
            other => Err(format!(
                "invalid practice: {other} (expected one of CC, FL, NFC, NA)"
            )),
        }
    }
}

/// Identifier of a job, assigned by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a monitoring site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(pub u32);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a task inside its job's task arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub usize);

impl TaskId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a step inside the job's global step list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub usize);
