//! Compliance aggregation and statistics.
//!
//! Every per-group statistic is one pass of [`group_compliance`] configured
//! by a [`GroupSpec`]. All functions are pure and total: an empty record set
//! yields empty groups and a zeroed global summary.

use crate::models::{
    is_technique, GlobalCompliance, GroupCompliance, ObservationRecord, TechniqueCount,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Record field used as the grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    Sector,
    Shift,
    PersonnelRole,
    Moment,
    Action,
}

impl GroupField {
    fn key<'a>(&self, record: &'a ObservationRecord) -> Option<&'a str> {
        match self {
            GroupField::Sector => record.sector.as_deref(),
            GroupField::Shift => record.shift.as_deref(),
            GroupField::PersonnelRole => record.personnel_role.as_deref(),
            GroupField::Moment => record.moment.as_deref(),
            GroupField::Action => record.action.as_deref(),
        }
    }
}

/// Which group keys are dropped from the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFilter {
    KeepAll,
    ExcludeNull,
    ExcludeNullOrEmpty,
}

impl KeyFilter {
    fn keeps(&self, key: Option<&str>) -> bool {
        match self {
            KeyFilter::KeepAll => true,
            KeyFilter::ExcludeNull => key.is_some(),
            KeyFilter::ExcludeNullOrEmpty => matches!(key, Some(k) if !k.is_empty()),
        }
    }
}

/// Configuration of one grouped compliance statistic.
///
/// Percentages always go through [`ratio_percent`], so an empty group
/// reports 0 rather than NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSpec {
    pub field: GroupField,
    pub key_filter: KeyFilter,
}

impl GroupSpec {
    pub const SECTOR: GroupSpec = GroupSpec {
        field: GroupField::Sector,
        key_filter: KeyFilter::KeepAll,
    };
    pub const PROFESSIONAL_ROLE: GroupSpec = GroupSpec {
        field: GroupField::PersonnelRole,
        key_filter: KeyFilter::KeepAll,
    };
    pub const MOMENT: GroupSpec = GroupSpec {
        field: GroupField::Moment,
        key_filter: KeyFilter::ExcludeNull,
    };
    pub const SHIFT: GroupSpec = GroupSpec {
        field: GroupField::Shift,
        key_filter: KeyFilter::ExcludeNullOrEmpty,
    };
}

/// Compliance rule used by the hospital-wide summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalPredicate {
    /// Same rule as every grouped statistic.
    #[default]
    Consistent,
    /// Any non-null action counts, including the none-sentinel.
    ActionPresent,
}

impl GlobalPredicate {
    fn matches(&self, record: &ObservationRecord) -> bool {
        match self {
            GlobalPredicate::Consistent => record.is_compliant(),
            GlobalPredicate::ActionPresent => record.action.is_some(),
        }
    }
}

#[derive(Default)]
struct Tally {
    total: usize,
    compliant: usize,
}

/// `part / whole * 100`, or 0 when `whole` is 0.
pub fn ratio_percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Round to two decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Count records per key, keeping keys in first-encounter order.
fn tally_by<'a, I>(records: I, field: GroupField) -> Vec<(Option<&'a str>, Tally)>
where
    I: IntoIterator<Item = &'a ObservationRecord>,
{
    let mut index: HashMap<Option<&'a str>, usize> = HashMap::new();
    let mut tallies: Vec<(Option<&'a str>, Tally)> = Vec::new();

    for record in records {
        let key = field.key(record);
        let slot = *index.entry(key).or_insert_with(|| {
            tallies.push((key, Tally::default()));
            tallies.len() - 1
        });

        let tally = &mut tallies[slot].1;
        tally.total += 1;
        if record.is_compliant() {
            tally.compliant += 1;
        }
    }

    tallies
}

fn compliance_groups<'a, I>(records: I, spec: &GroupSpec) -> Vec<GroupCompliance>
where
    I: IntoIterator<Item = &'a ObservationRecord>,
{
    let mut groups: Vec<GroupCompliance> = tally_by(records, spec.field)
        .into_iter()
        .filter(|(key, _)| spec.key_filter.keeps(*key))
        .map(|(key, tally)| GroupCompliance {
            key: key.map(String::from),
            total: tally.total,
            compliant: tally.compliant,
            percentage: ratio_percent(tally.compliant, tally.total),
        })
        .collect();

    // sort_by is stable, so equal percentages keep encounter order
    groups.sort_by(|a, b| {
        b.percentage
            .partial_cmp(&a.percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    groups
}

/// Group records by a field and compute per-group compliance.
pub fn group_compliance(records: &[ObservationRecord], spec: &GroupSpec) -> Vec<GroupCompliance> {
    compliance_groups(records, spec)
}

/// Hospital-wide compliance summary.
pub fn global_compliance(
    records: &[ObservationRecord],
    predicate: GlobalPredicate,
) -> GlobalCompliance {
    let total = records.len();
    let compliant = records.iter().filter(|r| predicate.matches(r)).count();

    GlobalCompliance {
        total,
        compliant,
        percentage: round2(ratio_percent(compliant, total)),
    }
}

pub fn compliance_by_sector(records: &[ObservationRecord]) -> Vec<GroupCompliance> {
    group_compliance(records, &GroupSpec::SECTOR)
}

pub fn compliance_by_professional_role(records: &[ObservationRecord]) -> Vec<GroupCompliance> {
    group_compliance(records, &GroupSpec::PROFESSIONAL_ROLE)
}

/// Null moments are left out.
pub fn compliance_by_moment(records: &[ObservationRecord]) -> Vec<GroupCompliance> {
    group_compliance(records, &GroupSpec::MOMENT)
}

/// Null and empty shifts are left out.
pub fn compliance_by_shift(records: &[ObservationRecord]) -> Vec<GroupCompliance> {
    group_compliance(records, &GroupSpec::SHIFT)
}

/// Role breakdown restricted to a single sector.
pub fn sector_role_breakdown(records: &[ObservationRecord], sector: &str) -> Vec<GroupCompliance> {
    let in_sector = records
        .iter()
        .filter(|r| r.sector.as_deref() == Some(sector));
    compliance_groups(in_sector, &GroupSpec::PROFESSIONAL_ROLE)
}

/// How often each hygiene technique was used, most used first.
pub fn technique_usage(records: &[ObservationRecord]) -> Vec<TechniqueCount> {
    let mut usage: Vec<TechniqueCount> = tally_by(records, GroupField::Action)
        .into_iter()
        .filter_map(|(key, tally)| match key {
            Some(technique) if is_technique(key) => Some(TechniqueCount {
                technique: technique.to_string(),
                count: tally.total,
            }),
            _ => None,
        })
        .collect();

    usage.sort_by_key(|t| std::cmp::Reverse(t.count));
    usage
}

/// Every statistic the dashboard shows, computed from one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub global: GlobalCompliance,
    pub by_sector: Vec<GroupCompliance>,
    pub by_role: Vec<GroupCompliance>,
    pub by_moment: Vec<GroupCompliance>,
    pub by_shift: Vec<GroupCompliance>,
    pub techniques: Vec<TechniqueCount>,
}

impl StatsSnapshot {
    pub fn compute(records: &[ObservationRecord], predicate: GlobalPredicate) -> Self {
        Self {
            global: global_compliance(records, predicate),
            by_sector: compliance_by_sector(records),
            by_role: compliance_by_professional_role(records),
            by_moment: compliance_by_moment(records),
            by_shift: compliance_by_shift(records),
            techniques: technique_usage(records),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NONE_SENTINEL;

    fn obs(sector: Option<&str>, action: Option<&str>) -> ObservationRecord {
        ObservationRecord {
            sector: sector.map(String::from),
            action: action.map(String::from),
            ..Default::default()
        }
    }

    fn with_shift(shift: Option<&str>, action: Option<&str>) -> ObservationRecord {
        ObservationRecord {
            shift: shift.map(String::from),
            action: action.map(String::from),
            ..Default::default()
        }
    }

    fn with_moment(moment: Option<&str>, action: Option<&str>) -> ObservationRecord {
        ObservationRecord {
            moment: moment.map(String::from),
            action: action.map(String::from),
            ..Default::default()
        }
    }

    fn assert_descending(groups: &[GroupCompliance]) {
        for pair in groups.windows(2) {
            assert!(pair[0].percentage >= pair[1].percentage);
        }
    }

    #[test]
    fn test_compliance_by_sector() {
        let records = vec![
            obs(Some("ER"), Some(NONE_SENTINEL)),
            obs(Some("ICU"), Some("alcohol")),
            obs(Some("ICU"), None),
        ];

        let groups = compliance_by_sector(&records);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key.as_deref(), Some("ICU"));
        assert_eq!(groups[0].total, 2);
        assert_eq!(groups[0].compliant, 1);
        assert_eq!(groups[0].percentage, 50.0);
        assert_eq!(groups[1].key.as_deref(), Some("ER"));
        assert_eq!(groups[1].total, 1);
        assert_eq!(groups[1].compliant, 0);
        assert_eq!(groups[1].percentage, 0.0);
    }

    #[test]
    fn test_sector_keeps_null_group() {
        let records = vec![obs(None, Some("alcohol")), obs(Some("ICU"), None)];

        let groups = compliance_by_sector(&records);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, None);
        assert_eq!(groups[0].percentage, 100.0);
    }

    #[test]
    fn test_empty_records() {
        let records: Vec<ObservationRecord> = Vec::new();

        let global = global_compliance(&records, GlobalPredicate::Consistent);
        assert_eq!(global, GlobalCompliance::default());
        assert_eq!(global.percentage, 0.0);

        assert!(compliance_by_sector(&records).is_empty());
        assert!(compliance_by_professional_role(&records).is_empty());
        assert!(compliance_by_moment(&records).is_empty());
        assert!(compliance_by_shift(&records).is_empty());
        assert!(technique_usage(&records).is_empty());
        assert!(sector_role_breakdown(&records, "ICU").is_empty());
    }

    #[test]
    fn test_global_compliance_rounds_to_two_decimals() {
        let records = vec![
            obs(None, Some("alcohol")),
            obs(None, None),
            obs(None, None),
        ];

        let global = global_compliance(&records, GlobalPredicate::Consistent);

        assert_eq!(global.total, 3);
        assert_eq!(global.compliant, 1);
        assert_eq!(global.percentage, 33.33);
    }

    #[test]
    fn test_global_predicates_differ_on_sentinel() {
        let records = vec![
            obs(None, Some("alcohol")),
            obs(None, Some(NONE_SENTINEL)),
            obs(None, None),
            obs(None, None),
        ];

        let consistent = global_compliance(&records, GlobalPredicate::Consistent);
        assert_eq!(consistent.compliant, 1);
        assert_eq!(consistent.percentage, 25.0);

        let legacy = global_compliance(&records, GlobalPredicate::ActionPresent);
        assert_eq!(legacy.total, 4);
        assert_eq!(legacy.compliant, 2);
        assert_eq!(legacy.percentage, 50.0);
    }

    #[test]
    fn test_compliance_by_moment_excludes_null_only() {
        let records = vec![
            with_moment(None, Some("alcohol")),
            with_moment(Some(""), None),
            with_moment(Some("Antes del contacto"), Some("alcohol")),
            with_moment(Some("Despues del contacto"), None),
        ];

        let groups = compliance_by_moment(&records);

        assert_eq!(groups.len(), 3);
        assert!(groups.iter().all(|g| g.key.is_some()));
        assert_eq!(groups[0].key.as_deref(), Some("Antes del contacto"));
        assert!(groups.iter().any(|g| g.key.as_deref() == Some("")));
        assert_descending(&groups);
    }

    #[test]
    fn test_compliance_by_shift_excludes_null_and_empty() {
        let records = vec![
            with_shift(None, Some("alcohol")),
            with_shift(Some(""), Some("alcohol")),
            with_shift(Some("Noche"), None),
            with_shift(Some("Mañana"), Some("Lavado")),
            with_shift(Some("Mañana"), Some(NONE_SENTINEL)),
        ];

        let groups = compliance_by_shift(&records);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key.as_deref(), Some("Mañana"));
        assert_eq!(groups[0].percentage, 50.0);
        assert_eq!(groups[1].key.as_deref(), Some("Noche"));
        assert_eq!(groups[1].percentage, 0.0);
    }

    #[test]
    fn test_professional_role_ties_keep_encounter_order() {
        let role = |r: &str, action: Option<&str>| ObservationRecord {
            personnel_role: Some(r.to_string()),
            action: action.map(String::from),
            ..Default::default()
        };
        let records = vec![
            role("Enfermeria", None),
            role("Medico", Some("alcohol")),
            role("Kinesiologia", None),
            role("Medico", None),
            role("Enfermeria", Some("alcohol")),
        ];

        let groups = compliance_by_professional_role(&records);

        let keys: Vec<_> = groups.iter().map(|g| g.label()).collect();
        assert_eq!(keys, vec!["Enfermeria", "Medico", "Kinesiologia"]);
        assert_descending(&groups);
        for group in &groups {
            assert!(group.compliant <= group.total);
        }
    }

    #[test]
    fn test_technique_usage() {
        let records: Vec<_> = [
            Some("alcohol"),
            Some("alcohol"),
            Some(NONE_SENTINEL),
            None,
            Some("soap"),
            Some(""),
        ]
        .into_iter()
        .map(|a| obs(None, a))
        .collect();

        let usage = technique_usage(&records);

        assert_eq!(
            usage,
            vec![
                TechniqueCount {
                    technique: "alcohol".to_string(),
                    count: 2
                },
                TechniqueCount {
                    technique: "soap".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_sector_role_breakdown() {
        let record = |sector: &str, role: &str, action: Option<&str>| ObservationRecord {
            sector: Some(sector.to_string()),
            personnel_role: Some(role.to_string()),
            action: action.map(String::from),
            ..Default::default()
        };
        let records = vec![
            record("GUARDIA", "Medico", None),
            record("GUARDIA", "Enfermeria", Some("alcohol")),
            record("UTI ADULTO", "Medico", Some("alcohol")),
            record("GUARDIA", "Medico", Some("Lavado")),
        ];

        let groups = sector_role_breakdown(&records, "GUARDIA");

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key.as_deref(), Some("Enfermeria"));
        assert_eq!(groups[0].percentage, 100.0);
        assert_eq!(groups[1].key.as_deref(), Some("Medico"));
        assert_eq!(groups[1].total, 2);
        assert_eq!(groups[1].percentage, 50.0);

        assert!(sector_role_breakdown(&records, "guardia").is_empty());
    }

    #[test]
    fn test_ratio_percent_guards_zero() {
        assert_eq!(ratio_percent(0, 0), 0.0);
        assert_eq!(ratio_percent(1, 4), 25.0);
    }

    #[test]
    fn test_stats_snapshot() {
        let records = vec![
            obs(Some("ICU"), Some("alcohol")),
            obs(Some("ER"), None),
        ];

        let stats = StatsSnapshot::compute(&records, GlobalPredicate::Consistent);

        assert_eq!(stats.global.total, 2);
        assert_eq!(stats.by_sector.len(), 2);
        assert_eq!(stats.by_role.len(), 1);
        assert!(stats.by_moment.is_empty());
        assert!(stats.by_shift.is_empty());
        assert_eq!(stats.techniques.len(), 1);
    }
}
