use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// What the upstream is asked to look up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Mobile,
    Aadhaar,
}

impl LookupKind {
    // value of the `type` form field sent upstream
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupKind::Mobile => "mobile",
            LookupKind::Aadhaar => "aadhaar",
        }
    }

    pub fn digits(&self) -> usize {
        match self {
            LookupKind::Mobile => 10,
            LookupKind::Aadhaar => 12,
        }
    }

    // name of the query string parameter on our side
    pub fn param(&self) -> &'static str {
        match self {
            LookupKind::Mobile => "number",
            LookupKind::Aadhaar => "aadhar",
        }
    }

    pub fn example(&self) -> &'static str {
        match self {
            LookupKind::Mobile => "9876543210",
            LookupKind::Aadhaar => "123456789012",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            LookupKind::Mobile => "/num",
            LookupKind::Aadhaar => "/aadhar",
        }
    }

    pub fn invalid_label(&self) -> &'static str {
        match self {
            LookupKind::Mobile => "Invalid phone number",
            LookupKind::Aadhaar => "Invalid Aadhaar number",
        }
    }
}

// Form body posted to the upstream lookup endpoint
#[derive(Debug, Serialize)]
pub struct UpstreamLookupForm<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub query: &'a str,
}

/// Flattened record returned to clients on a successful lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LookupRecord {
    pub name: String,
    pub father_name: String,
    pub address: String,
    pub mobile: String,
    pub aadhaar: String,
    pub email: String,
    pub timestamp: String,
    pub status: String,
    pub source: String,
    // dob, gender, pincode, state, district when the upstream has them
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
