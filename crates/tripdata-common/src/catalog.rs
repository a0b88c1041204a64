//! Source catalog for NYC taxi trip files
//!
//! Static mapping from (provider, taxi type) to URL templates. A
//! [`Source`] resolves a (taxi type, year, month, provider) tuple to a
//! concrete download URL and file name by pure template substitution.
//!
//! # Providers
//!
//! - [`Provider::Tlc`]: official TLC CloudFront CDN (Parquet, up-to-date)
//! - [`Provider::Dtc`]: DataTalksClub GitHub mirror (CSV.GZ, frozen
//!   snapshots matching the course exercises)

use crate::error::{Result, TripdataError};
use serde::{Deserialize, Serialize};

const TLC_BASE_URL: &str = "https://d37ci6vzurychx.cloudfront.net/trip-data";
const DTC_BASE_URL: &str = "https://github.com/DataTalksClub/nyc-tlc-data/releases/download";

/// Years with published trip files
pub const VALID_YEARS: std::ops::RangeInclusive<u16> = 2019..=2024;

/// Taxi fleet type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxiType {
    Green,
    Yellow,
    Fhv,
    Fhvhv,
}

impl TaxiType {
    pub const ALL: [TaxiType; 4] = [
        TaxiType::Green,
        TaxiType::Yellow,
        TaxiType::Fhv,
        TaxiType::Fhvhv,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxiType::Green => "green",
            TaxiType::Yellow => "yellow",
            TaxiType::Fhv => "fhv",
            TaxiType::Fhvhv => "fhvhv",
        }
    }
}

impl std::str::FromStr for TaxiType {
    type Err = TripdataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "green" => Ok(TaxiType::Green),
            "yellow" => Ok(TaxiType::Yellow),
            "fhv" => Ok(TaxiType::Fhv),
            "fhvhv" => Ok(TaxiType::Fhvhv),
            other => Err(TripdataError::invalid_input(
                "taxi type",
                other,
                "green, yellow, fhv, fhvhv",
            )),
        }
    }
}

impl std::fmt::Display for TaxiType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Upstream source of trip files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Official TLC CloudFront CDN (Parquet)
    Tlc,
    /// DataTalksClub GitHub mirror (CSV.GZ)
    Dtc,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Tlc => "tlc",
            Provider::Dtc => "dtc",
        }
    }

    /// File format published by this provider
    pub fn file_format(&self) -> FileFormat {
        match self {
            Provider::Tlc => FileFormat::Parquet,
            Provider::Dtc => FileFormat::CsvGz,
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = TripdataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "tlc" => Ok(Provider::Tlc),
            "dtc" => Ok(Provider::Dtc),
            other => Err(TripdataError::invalid_input("source", other, "tlc, dtc")),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// File format of a remote trip file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Parquet,
    CsvGz,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Parquet => "parquet",
            FileFormat::CsvGz => "csv.gz",
        }
    }
}

/// Remote source descriptor for one monthly trip file
///
/// URL and file name are deterministic pure functions of the fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub provider: Provider,
    pub taxi_type: TaxiType,
    pub year: u16,
    pub month: u8,
}

impl Source {
    pub fn new(provider: Provider, taxi_type: TaxiType, year: u16, month: u8) -> Self {
        Self {
            provider,
            taxi_type,
            year,
            month,
        }
    }

    /// Download URL for this source
    pub fn url(&self) -> String {
        match self.provider {
            Provider::Tlc => format!(
                "{}/{}_tripdata_{:04}-{:02}.parquet",
                TLC_BASE_URL, self.taxi_type, self.year, self.month
            ),
            Provider::Dtc => format!(
                "{}/{}/{}_tripdata_{:04}-{:02}.csv.gz",
                DTC_BASE_URL, self.taxi_type, self.taxi_type, self.year, self.month
            ),
        }
    }

    /// Local and remote file name: `{taxi_type}_tripdata_{year}-{month}.{ext}`
    pub fn file_name(&self) -> String {
        format!(
            "{}_tripdata_{:04}-{:02}.{}",
            self.taxi_type,
            self.year,
            self.month,
            self.provider.file_format().extension()
        )
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

/// Parse a comma-separated taxi type list, validating every value
pub fn parse_taxi_types(raw: &str) -> Result<Vec<TaxiType>> {
    let mut types = Vec::new();
    let mut bad = Vec::new();

    for part in raw.split(',') {
        match part.parse::<TaxiType>() {
            Ok(t) => types.push(t),
            Err(_) => bad.push(part.trim().to_string()),
        }
    }

    if !bad.is_empty() {
        return Err(TripdataError::invalid_input(
            "taxi type",
            bad.join(", "),
            "green, yellow, fhv, fhvhv",
        ));
    }

    Ok(types)
}

/// Parse a comma-separated year list, validating against [`VALID_YEARS`]
pub fn parse_years(raw: &str) -> Result<Vec<u16>> {
    let valid = format!("{}-{}", VALID_YEARS.start(), VALID_YEARS.end());
    let mut years = Vec::new();
    let mut bad = Vec::new();

    for part in raw.split(',') {
        match part.trim().parse::<u16>() {
            Ok(y) if VALID_YEARS.contains(&y) => years.push(y),
            _ => bad.push(part.trim().to_string()),
        }
    }

    if !bad.is_empty() {
        return Err(TripdataError::invalid_input(
            "years",
            bad.join(", "),
            valid,
        ));
    }

    Ok(years)
}

/// Parse a comma-separated month list (1-12), or `all` for the full year
pub fn parse_months(raw: &str) -> Result<Vec<u8>> {
    if raw.trim().eq_ignore_ascii_case("all") {
        return Ok((1..=12).collect());
    }

    let mut months = Vec::new();
    let mut bad = Vec::new();

    for part in raw.split(',') {
        match part.trim().parse::<u8>() {
            Ok(m) if (1..=12).contains(&m) => months.push(m),
            _ => bad.push(part.trim().to_string()),
        }
    }

    if !bad.is_empty() {
        return Err(TripdataError::invalid_input(
            "months",
            bad.join(", "),
            "1-12 or 'all'",
        ));
    }

    Ok(months)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tlc_url() {
        let source = Source::new(Provider::Tlc, TaxiType::Yellow, 2024, 1);
        assert_eq!(
            source.url(),
            "https://d37ci6vzurychx.cloudfront.net/trip-data/yellow_tripdata_2024-01.parquet"
        );
    }

    #[test]
    fn test_dtc_url() {
        let source = Source::new(Provider::Dtc, TaxiType::Green, 2019, 12);
        assert_eq!(
            source.url(),
            "https://github.com/DataTalksClub/nyc-tlc-data/releases/download/green/green_tripdata_2019-12.csv.gz"
        );
    }

    #[test]
    fn test_file_name_follows_provider_format() {
        let parquet = Source::new(Provider::Tlc, TaxiType::Fhv, 2021, 3);
        assert_eq!(parquet.file_name(), "fhv_tripdata_2021-03.parquet");

        let csv = Source::new(Provider::Dtc, TaxiType::Fhvhv, 2020, 11);
        assert_eq!(csv.file_name(), "fhvhv_tripdata_2020-11.csv.gz");
    }

    #[test]
    fn test_url_is_deterministic() {
        let a = Source::new(Provider::Tlc, TaxiType::Green, 2022, 7);
        let b = Source::new(Provider::Tlc, TaxiType::Green, 2022, 7);
        assert_eq!(a.url(), b.url());
        assert_eq!(a.file_name(), b.file_name());
    }

    #[test]
    fn test_parse_taxi_types() {
        let types = parse_taxi_types("green, yellow").unwrap();
        assert_eq!(types, vec![TaxiType::Green, TaxiType::Yellow]);
    }

    #[test]
    fn test_parse_taxi_types_rejects_unknown() {
        let err = parse_taxi_types("green,pink").unwrap_err();
        assert!(err.to_string().contains("pink"));
    }

    #[test]
    fn test_parse_years() {
        assert_eq!(parse_years("2019,2024").unwrap(), vec![2019, 2024]);
        assert!(parse_years("2018").is_err());
        assert!(parse_years("banana").is_err());
    }

    #[test]
    fn test_parse_months_all_expands_to_twelve() {
        let months = parse_months("all").unwrap();
        assert_eq!(months, (1..=12).collect::<Vec<u8>>());
    }

    #[test]
    fn test_parse_months_validates_range() {
        assert_eq!(parse_months("1, 2,12").unwrap(), vec![1, 2, 12]);
        assert!(parse_months("0").is_err());
        assert!(parse_months("13").is_err());
    }
}
