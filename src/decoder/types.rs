use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Barcode encoding standard a payload was printed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbology {
    Ean13,
    Ean8,
    UpcA,
    UpcE,
    Code128,
    Code39,
    QrCode,
    DataMatrix,
    Unknown,
}

impl Symbology {
    /// Linear symbologies printed on retail packaging
    pub fn is_retail(&self) -> bool {
        matches!(
            self,
            Symbology::Ean13
                | Symbology::Ean8
                | Symbology::UpcA
                | Symbology::UpcE
                | Symbology::Code128
                | Symbology::Code39
        )
    }

    pub fn is_two_dimensional(&self) -> bool {
        matches!(self, Symbology::QrCode | Symbology::DataMatrix)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Symbology::Ean13 => "ean_13",
            Symbology::Ean8 => "ean_8",
            Symbology::UpcA => "upc_a",
            Symbology::UpcE => "upc_e",
            Symbology::Code128 => "code_128",
            Symbology::Code39 => "code_39",
            Symbology::QrCode => "qr_code",
            Symbology::DataMatrix => "data_matrix",
            Symbology::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Symbology {
    type Err = String;

    /// Accepts the names different engines use (`ean_13`, `EAN-13`, `ean13`, ...)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "ean13" => Ok(Symbology::Ean13),
            "ean8" => Ok(Symbology::Ean8),
            "upca" => Ok(Symbology::UpcA),
            "upce" => Ok(Symbology::UpcE),
            "code128" => Ok(Symbology::Code128),
            "code39" => Ok(Symbology::Code39),
            "qr" | "qrcode" => Ok(Symbology::QrCode),
            "datamatrix" => Ok(Symbology::DataMatrix),
            "unknown" => Ok(Symbology::Unknown),
            _ => Err(format!("unknown symbology '{}'", s)),
        }
    }
}

/// One successful decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCode {
    pub payload: String,
    pub symbology: Option<Symbology>,
    /// Engine that produced the result
    pub engine: &'static str,
}

impl DecodedCode {
    pub fn new(payload: impl Into<String>, symbology: Option<Symbology>, engine: &'static str) -> Self {
        Self {
            payload: payload.into(),
            symbology,
            engine,
        }
    }
}

/// What the user is pointing the camera at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    Retail,
    Marking,
    Qr,
}

impl ScanMode {
    /// Symbologies engines are restricted to in this mode
    pub fn symbologies(&self) -> &'static [Symbology] {
        match self {
            ScanMode::Retail => &[
                Symbology::Ean13,
                Symbology::Ean8,
                Symbology::UpcA,
                Symbology::UpcE,
                Symbology::Code128,
                Symbology::Code39,
            ],
            ScanMode::Marking => &[Symbology::DataMatrix],
            ScanMode::Qr => &[Symbology::QrCode],
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::Retail => write!(f, "retail"),
            ScanMode::Marking => write!(f, "marking"),
            ScanMode::Qr => write!(f, "qr"),
        }
    }
}

impl FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "retail" | "barcode" => Ok(ScanMode::Retail),
            "marking" | "datamatrix" => Ok(ScanMode::Marking),
            "qr" => Ok(ScanMode::Qr),
            other => Err(format!("unknown scan mode '{}'", other)),
        }
    }
}
