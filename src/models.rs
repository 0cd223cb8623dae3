use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use sqlx::FromRow;

use crate::LabRagError;
use crate::Result;

/// One blood-test result row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Report {
    pub id: i64,
    /// Subject (patient) name
    pub name: String,
    pub test_name: String,
    pub result: f64,
    pub unit: String,
    /// Free text such as "70-99"; never parsed
    pub ref_range: String,
    /// Free text such as "High", "Low", "Normal"
    pub flag: String,
    pub timestamp: DateTime<Utc>,
}

impl Report {
    /// True when the flag marks the result as something other than normal
    #[must_use]
    pub fn is_flagged(&self) -> bool {
        is_flag_abnormal(&self.flag)
    }
}

/// A flag is abnormal unless it is blank or "Normal" (any case)
#[must_use]
pub fn is_flag_abnormal(flag: &str) -> bool {
    let flag = flag.trim();
    !flag.is_empty() && !flag.eq_ignore_ascii_case("normal")
}

/// Fields accepted when creating a report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReport {
    pub name: String,
    pub test_name: String,
    pub result: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub ref_range: String,
    #[serde(default)]
    pub flag: String,
    /// Explicit collection time; the store assigns NOW() when absent
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewReport {
    /// Reject input that must never reach the store
    pub fn validate(&self) -> Result<()> {
        require_text("name", &self.name)?;
        require_text("test_name", &self.test_name)?;
        require_finite(self.result)?;
        Ok(())
    }

    /// Trim surrounding whitespace from every text field
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.test_name = self.test_name.trim().to_string();
        self.unit = self.unit.trim().to_string();
        self.ref_range = self.ref_range.trim().to_string();
        self.flag = self.flag.trim().to_string();
        self
    }
}

/// Selective update keyed by report id; `None` leaves a column unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub test_name: Option<String>,
    #[serde(default)]
    pub result: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub ref_range: Option<String>,
    #[serde(default)]
    pub flag: Option<String>,
}

impl ReportUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.test_name.is_none()
            && self.result.is_none()
            && self.unit.is_none()
            && self.ref_range.is_none()
            && self.flag.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(LabRagError::InvalidInput(
                "update must change at least one field".to_string(),
            ));
        }
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        if let Some(test_name) = &self.test_name {
            require_text("test_name", test_name)?;
        }
        if let Some(result) = self.result {
            require_finite(result)?;
        }
        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LabRagError::InvalidInput(format!("{field} is required")));
    }
    Ok(())
}

fn require_finite(value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(LabRagError::InvalidInput(format!(
            "result must be a finite number, got {value}"
        )));
    }
    Ok(())
}

/// Aggregate counts over the report table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReportStats {
    pub total_reports: i64,
    pub distinct_subjects: i64,
    pub flagged_reports: i64,
    pub latest_timestamp: Option<DateTime<Utc>>,
}
