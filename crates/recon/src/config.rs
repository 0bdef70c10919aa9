use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    pub name: String,
    /// Epoch for every age/tenure computation in a run.
    #[serde(default = "default_reference_date")]
    pub reference_date: NaiveDate,
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
    #[serde(default)]
    pub missing_values: MissingPolicy,
    #[serde(default)]
    pub schemas: SchemasConfig,
    #[serde(default)]
    pub derived: DerivedConfig,
    #[serde(default)]
    pub membership: MembershipConfig,
    pub fields: Vec<FieldMapping>,
}

fn default_reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// What to do with identity keys that occur more than once in one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Pass duplicates through; the join yields every combination.
    #[default]
    Keep,
    /// Keep only the first row per key.
    First,
    /// Abort the run.
    Reject,
}

/// How two missing values compare in the field differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Missing on both sides is not a difference.
    #[default]
    Equal,
    /// Missing on both sides is reported as a difference.
    Differ,
}

// ---------------------------------------------------------------------------
// Schemas
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    Local,
    National,
}

impl std::fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::National => write!(f, "national"),
        }
    }
}

impl std::str::FromStr for SchemaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "national" => Ok(Self::National),
            other => Err(format!("unknown schema '{other}' (expected 'local' or 'national')")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    pub label: String,
    /// Compute the membership category for this registry.
    #[serde(default)]
    pub derive_membership: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemasConfig {
    pub local: SchemaConfig,
    pub national: SchemaConfig,
}

impl Default for SchemasConfig {
    fn default() -> Self {
        Self {
            local: SchemaConfig {
                label: "单机".into(),
                derive_membership: true,
            },
            national: SchemaConfig {
                label: "全国".into(),
                derive_membership: false,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Derived columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DerivedConfig {
    pub sequence: String,
    pub tenure: String,
    pub age: String,
    /// Character offset of the `YYYYMMDD` birth date inside the identity key.
    pub birth_offset: usize,
}

impl Default for DerivedConfig {
    fn default() -> Self {
        Self {
            sequence: "序号".into(),
            tenure: "党龄".into(),
            age: "年龄".into(),
            birth_offset: 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRule {
    /// Probationary when the join date falls in the reference date's year.
    #[default]
    ReferenceYear,
    /// Probationary when the join date's text starts with the reference year.
    YearPrefix,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MembershipConfig {
    pub rule: MembershipRule,
    pub probationary: String,
    pub full: String,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            rule: MembershipRule::ReferenceYear,
            probationary: "预备党员".into(),
            full: "正式党员".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Field mapping
// ---------------------------------------------------------------------------

/// Preprocessing role a mapped field plays besides (optionally) being compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    Identity,
    Name,
    JoinDate,
    Membership,
}

impl std::fmt::Display for FieldRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identity => write!(f, "identity"),
            Self::Name => write!(f, "name"),
            Self::JoinDate => write!(f, "join_date"),
            Self::Membership => write!(f, "membership"),
        }
    }
}

/// One semantic attribute and its column name in each schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldMapping {
    pub attribute: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub local: String,
    /// Defaults to the local column name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national: Option<String>,
    #[serde(default = "default_true")]
    pub compare: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<FieldRole>,
}

fn default_true() -> bool {
    true
}

impl FieldMapping {
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.attribute)
    }

    pub fn column(&self, schema: SchemaKind) -> &str {
        match schema {
            SchemaKind::Local => &self.local,
            SchemaKind::National => self.national.as_deref().unwrap_or(&self.local),
        }
    }
}

// (attribute, label, local column, national column, compare, role)
type FieldRow = (&'static str, &'static str, &'static str, &'static str, bool, Option<FieldRole>);

/// Built-in attribute table. Mirrors `default.recon.toml`.
const DEFAULT_FIELDS: &[FieldRow] = &[
    ("identity", "身份证号", "身份证号", "身份证号码", false, Some(FieldRole::Identity)),
    ("name", "姓名", "姓名", "姓名", true, Some(FieldRole::Name)),
    ("gender", "性别", "性别", "性别", true, None),
    ("ethnicity", "民族", "民族", "民族", true, None),
    ("birth_date", "出生日期", "出生日期", "出生日期", true, None),
    ("education", "学历", "学历", "学历", true, None),
    ("join_date", "入党时间", "入党时间", "入党日期", true, Some(FieldRole::JoinDate)),
    ("position", "个人身份", "个人身份", "工作岗位", true, None),
    ("membership", "人员类别", "人员类别", "人员类别", true, Some(FieldRole::Membership)),
];

impl Default for ReconConfig {
    fn default() -> Self {
        let fields = DEFAULT_FIELDS
            .iter()
            .map(|&(attribute, label, local, national, compare, role)| FieldMapping {
                attribute: attribute.into(),
                label: Some(label.into()),
                local: local.into(),
                national: (national != local).then(|| national.to_string()),
                compare,
                role,
            })
            .collect();

        Self {
            name: "roster".into(),
            reference_date: default_reference_date(),
            duplicates: DuplicatePolicy::default(),
            missing_values: MissingPolicy::default(),
            schemas: SchemasConfig::default(),
            derived: DerivedConfig::default(),
            membership: MembershipConfig::default(),
            fields,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ReconError> {
        toml::to_string_pretty(self).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = date;
        self
    }

    pub fn schema(&self, kind: SchemaKind) -> &SchemaConfig {
        match kind {
            SchemaKind::Local => &self.schemas.local,
            SchemaKind::National => &self.schemas.national,
        }
    }

    pub fn role_field(&self, role: FieldRole) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.role == Some(role))
    }

    /// Identity column name for `schema`.
    pub fn identity_column(&self, schema: SchemaKind) -> Result<&str, ReconError> {
        self.role_field(FieldRole::Identity)
            .map(|f| f.column(schema))
            .ok_or_else(|| ReconError::ConfigValidation("no field has role = \"identity\"".into()))
    }

    pub fn compared_fields(&self) -> impl Iterator<Item = &FieldMapping> {
        self.fields.iter().filter(|f| f.compare)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let invalid = |msg: String| Err(ReconError::ConfigValidation(msg));

        if self.fields.is_empty() {
            return invalid("at least one [[fields]] entry is required".into());
        }

        let mut attributes = HashSet::new();
        for field in &self.fields {
            if field.attribute.trim().is_empty() {
                return invalid("field attribute names must not be empty".into());
            }
            if !attributes.insert(field.attribute.as_str()) {
                return invalid(format!("duplicate attribute '{}'", field.attribute));
            }
            for schema in [SchemaKind::Local, SchemaKind::National] {
                if field.column(schema).trim().is_empty() {
                    return invalid(format!(
                        "attribute '{}': empty {schema} column name",
                        field.attribute
                    ));
                }
            }
        }

        for role in [FieldRole::Identity, FieldRole::Name, FieldRole::JoinDate, FieldRole::Membership] {
            let count = self.fields.iter().filter(|f| f.role == Some(role)).count();
            if count > 1 {
                return invalid(format!("role '{role}' is assigned to {count} fields"));
            }
        }

        match self.role_field(FieldRole::Identity) {
            None => return invalid("exactly one field must have role = \"identity\"".into()),
            Some(identity) if identity.compare => {
                return invalid(format!(
                    "identity attribute '{}' is the join key and cannot be compared",
                    identity.attribute
                ));
            }
            Some(_) => {}
        }

        let d = &self.derived;
        let derived = [d.sequence.as_str(), d.tenure.as_str(), d.age.as_str()];
        if derived.iter().any(|c| c.trim().is_empty()) {
            return invalid("derived column names must not be empty".into());
        }
        let unique: HashSet<&str> = derived.iter().copied().collect();
        if unique.len() != derived.len() {
            return invalid("derived column names must be distinct".into());
        }
        if let Some(identity) = self.role_field(FieldRole::Identity) {
            for schema in [SchemaKind::Local, SchemaKind::National] {
                if unique.contains(identity.column(schema)) {
                    return invalid(format!(
                        "derived column would overwrite the {schema} identity column '{}'",
                        identity.column(schema)
                    ));
                }
            }
        }

        let m = &self.membership;
        if m.probationary.is_empty() || m.full.is_empty() || m.probationary == m.full {
            return invalid("membership labels must be non-empty and distinct".into());
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
