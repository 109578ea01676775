use crate::errors::ConfigError;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use std::io::Read;
use std::str::FromStr;
use strum::{EnumString, IntoStaticStr};

/// Key holding the estimate service API key, which is never offered to templates.
const API_KEY_CODE: &str = "api";

/// Reads the scenario-specific and shared sources and merges them into one parameter set.
///
/// Keys in the shared (utility) source overwrite same-named keys in the scenario source.
pub fn ingest_parameters(
    scenario: impl Read,
    utility: impl Read,
) -> Result<Parameters, ConfigError> {
    let mut merged = read_source("scenario", scenario)?;
    merged.extend(read_source("utility", utility)?);

    Parameters::from_merged(merged)
}

fn read_source(
    source_name: &str,
    mut source: impl Read,
) -> Result<IndexMap<String, Value>, ConfigError> {
    let mut text = String::new();
    source
        .read_to_string(&mut text)
        .map_err(|e| ConfigError::Parse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;

    json5::from_str(&text).map_err(|e| ConfigError::Parse {
        source_name: source_name.to_string(),
        message: e.to_string(),
    })
}

#[derive(Clone, Debug, Deserialize)]
pub struct Parameters {
    #[serde(rename = "RS")]
    pub roof_area: f64,
    #[serde(rename = "ASR")]
    pub available_space_ratio: f64,
    #[serde(rename = "EC")]
    pub electricity_cost: f64,
    #[serde(rename = "PPW")]
    pub cost_per_watt: f64,
    #[serde(rename = "ITCR")]
    pub tax_credit_rate: f64,
    #[serde(rename = "ZIP", deserialize_with = "deserialize_code")]
    pub zip: String,
    #[serde(rename = "ST")]
    pub site_type: SiteType,
    #[serde(rename = "AMVPA")]
    pub incentive_rate_pa: Option<f64>,
    #[serde(rename = "AMVNJ")]
    pub incentive_rate_nj: Option<f64>,
    #[serde(rename = "api")]
    pub api_key: String,
    #[serde(rename = "AR", deserialize_with = "deserialize_code")]
    pub report_id: String,
    /// Every merged source value except the API key, in source order, for filling templates.
    #[serde(skip)]
    pub source_fields: IndexMap<String, Value>,
}

impl Parameters {
    pub(crate) fn from_merged(merged: IndexMap<String, Value>) -> Result<Self, ConfigError> {
        // checked up front so that an unknown selector is reported by name rather than as a
        // generic deserialisation failure
        if let Some(site_type) = merged.get("ST") {
            let recognised = site_type
                .as_str()
                .is_some_and(|code| SiteType::from_str(code).is_ok());
            if !recognised {
                return Err(ConfigError::UnknownSiteType(match site_type {
                    Value::String(code) => code.clone(),
                    other => other.to_string(),
                }));
            }
        }

        let mut parameters: Parameters = serde_json::from_value(Value::Object(
            merged.clone().into_iter().collect::<Map<String, Value>>(),
        ))?;

        parameters.source_fields = merged;
        parameters.source_fields.shift_remove(API_KEY_CODE);

        // fail at load time rather than part way through the run
        parameters.incentive_rate()?;

        Ok(parameters)
    }

    /// The per-credit incentive value (AMV) for the configured region.
    pub fn incentive_rate(&self) -> Result<f64, ConfigError> {
        let rate = match self.site_type {
            SiteType::Pa => self.incentive_rate_pa,
            SiteType::Nj => self.incentive_rate_nj,
        };

        rate.ok_or_else(|| ConfigError::MissingIncentiveRate {
            field: self.site_type.incentive_rate_code(),
            site_type: self.site_type.to_string(),
        })
    }
}

/// Accepts identifiers such as ZIP codes and report numbers written either as strings or as
/// numbers.
fn deserialize_code<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(code) => Ok(code),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number code, got {other}"
        ))),
    }
}

#[derive(Clone, Copy, Debug, Deserialize, EnumString, Eq, IntoStaticStr, PartialEq)]
pub enum SiteType {
    #[serde(rename = "PA")]
    #[strum(serialize = "PA")]
    Pa,
    #[serde(rename = "NJ")]
    #[strum(serialize = "NJ")]
    Nj,
}

impl SiteType {
    pub fn template_name(&self) -> &'static str {
        match self {
            SiteType::Pa => "Install an Array of Solar Panels - PA.md",
            SiteType::Nj => "Install an Array of Solar Panels - NJ.md",
        }
    }

    pub fn incentive_rate_code(&self) -> &'static str {
        match self {
            SiteType::Pa => "AMVPA",
            SiteType::Nj => "AMVNJ",
        }
    }
}

impl Display for SiteType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", <&'static str>::from(self))
    }
}
