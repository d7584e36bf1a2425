use serde::{Deserialize, Serialize};

/// A spreadsheet cell value carried through reconciliation without coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Renders the cell as an identifier token. Whole numbers drop their
    /// fractional part so `12345.0` reads as `12345`.
    pub fn to_token(&self) -> String {
        match self {
            CellValue::Text(value) => value.clone(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            CellValue::Number(n) => format!("{n}"),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentRow {
    /// One-based sheet row the values came from, when read from a workbook.
    pub source_row: Option<usize>,
    pub hall_ticket: Option<String>,
    pub name: Option<CellValue>,
    pub college: Option<CellValue>,
    pub course: Option<CellValue>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkRow {
    pub source_row: Option<usize>,
    pub hall_ticket: Option<String>,
    pub subject_code: Option<CellValue>,
    pub subject_name: Option<CellValue>,
    pub external_marks: Option<CellValue>,
    pub external_flag: Option<CellValue>,
    pub internal_marks: Option<CellValue>,
    pub internal_flag: Option<CellValue>,
    pub result: Option<CellValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flag {
    #[serde(rename = "P")]
    Pass,
    #[serde(rename = "F")]
    Fail,
}

impl Flag {
    /// Maps a raw flag cell to a [`Flag`].
    ///
    /// The token is trimmed and upper-cased, then `P`/`PASS` map to `Pass`
    /// and `F`/`FAIL` map to `Fail`. Every other input, including a blank or
    /// missing cell and non-text cells, maps to `Fail`.
    pub fn derive(raw: Option<&CellValue>) -> Self {
        let token = raw
            .and_then(CellValue::as_str)
            .map(|value| value.trim().to_uppercase())
            .unwrap_or_default();

        match token.as_str() {
            "P" | "PASS" => Flag::Pass,
            "F" | "FAIL" => Flag::Fail,
            _ => Flag::Fail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectMark {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_code: Option<CellValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<CellValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_marks: Option<CellValue>,
    pub external_flag: Flag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_marks: Option<CellValue>,
    pub internal_flag: Flag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CellValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub hall_ticket: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<CellValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub college: Option<CellValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<CellValue>,
    pub marks: Vec<SubjectMark>,
}
