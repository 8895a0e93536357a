//! Markdown and JSON report generation.
//!
//! This module renders every dashboard statistic as one document, for
//! sharing outside the dashboard.

use crate::analysis::StatsSnapshot;
use crate::models::{GlobalCompliance, GroupCompliance, TechniqueCount};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Metadata about the report.
#[derive(Debug, Clone)]
pub struct ReportMetadata {
    /// When the statistics were computed.
    pub generated_at: DateTime<Utc>,
    /// Where the records came from.
    pub source: String,
    /// Number of records read.
    pub record_count: usize,
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(metadata: &ReportMetadata, stats: &StatsSnapshot) -> String {
    let mut output = String::new();

    output.push_str("# Hand-Hygiene Compliance Report\n\n");
    output.push_str(&generate_metadata_section(metadata));
    output.push_str(&generate_global_section(&stats.global));
    output.push_str(&generate_group_section("By Sector", "Sector", &stats.by_sector));
    output.push_str(&generate_group_section(
        "By Professional Role",
        "Role",
        &stats.by_role,
    ));
    output.push_str(&generate_group_section("By WHO Moment", "Moment", &stats.by_moment));
    output.push_str(&generate_group_section("By Shift", "Shift", &stats.by_shift));
    output.push_str(&generate_technique_section(&stats.techniques));
    output.push_str("---\n\n*Report generated by hygiene-dash*\n");

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!("- **Observations:** {}\n\n", metadata.record_count));

    section
}

fn generate_global_section(global: &GlobalCompliance) -> String {
    let mut section = String::new();

    section.push_str("## Global Compliance\n\n");
    section.push_str("| Observations | Actions Performed | Compliance |\n");
    section.push_str("|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | **{:.2}%** |\n\n",
        global.total, global.compliant, global.percentage
    ));

    section
}

/// Generate a ranked table for one slice.
fn generate_group_section(title: &str, key_header: &str, groups: &[GroupCompliance]) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", title));

    if groups.is_empty() {
        section.push_str("No observations.\n\n");
        return section;
    }

    section.push_str(&format!(
        "| {} | Observations | Correct Actions | Compliance |\n",
        key_header
    ));
    section.push_str("|:---|:---:|:---:|:---:|\n");

    for group in groups {
        section.push_str(&format!(
            "| {} | {} | {} | {:.2}% |\n",
            group.label(),
            group.total,
            group.compliant,
            group.percentage
        ));
    }
    section.push('\n');

    section
}

fn generate_technique_section(techniques: &[TechniqueCount]) -> String {
    let mut section = String::new();

    section.push_str("## Techniques Used\n\n");

    if techniques.is_empty() {
        section.push_str("No hygiene actions recorded.\n\n");
        return section;
    }

    section.push_str("| Technique | Count |\n");
    section.push_str("|:---|:---:|\n");
    for technique in techniques {
        section.push_str(&format!("| {} | {} |\n", technique.technique, technique.count));
    }
    section.push('\n');

    section
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(rename = "generadoEn")]
    generated_at: DateTime<Utc>,
    #[serde(rename = "origen")]
    source: &'a str,
    #[serde(rename = "globalCompliance")]
    global: &'a GlobalCompliance,
    #[serde(rename = "statsSector")]
    by_sector: Value,
    #[serde(rename = "statsProfessional")]
    by_role: Value,
    #[serde(rename = "statsMoment")]
    by_moment: Value,
    #[serde(rename = "statsShift")]
    by_shift: Value,
    #[serde(rename = "statsTechniques")]
    techniques: &'a [TechniqueCount],
}

fn groups_value(groups: &[GroupCompliance], key_name: &str) -> Value {
    Value::Array(groups.iter().map(|g| g.to_json(key_name)).collect())
}

/// Generate a JSON report with the same shapes the API returns.
pub fn generate_json_report(metadata: &ReportMetadata, stats: &StatsSnapshot) -> Result<String> {
    let report = JsonReport {
        generated_at: metadata.generated_at,
        source: &metadata.source,
        global: &stats.global,
        by_sector: groups_value(&stats.by_sector, "sector"),
        by_role: groups_value(&stats.by_role, "rol"),
        by_moment: groups_value(&stats.by_moment, "momento"),
        by_shift: groups_value(&stats.by_shift, "turno"),
        techniques: &stats.techniques,
    };

    serde_json::to_string_pretty(&report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::GlobalPredicate;
    use crate::models::ObservationRecord;

    fn create_test_stats() -> StatsSnapshot {
        let records = vec![
            ObservationRecord {
                sector: Some("GUARDIA".to_string()),
                personnel_role: Some("Medico".to_string()),
                shift: Some("Noche".to_string()),
                moment: Some("Antes del contacto".to_string()),
                action: Some("Alcohol".to_string()),
                ..Default::default()
            },
            ObservationRecord {
                sector: Some("UTI ADULTO".to_string()),
                ..Default::default()
            },
        ];
        StatsSnapshot::compute(&records, GlobalPredicate::Consistent)
    }

    fn create_test_metadata() -> ReportMetadata {
        ReportMetadata {
            generated_at: Utc::now(),
            source: "json file observaciones_higiene.json".to_string(),
            record_count: 2,
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_metadata(), &create_test_stats());

        assert!(markdown.contains("# Hand-Hygiene Compliance Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Global Compliance"));
        assert!(markdown.contains("| GUARDIA | 1 | 1 | 100.00% |"));
        assert!(markdown.contains("| UTI ADULTO | 1 | 0 | 0.00% |"));
        assert!(markdown.contains("| Alcohol | 1 |"));
    }

    #[test]
    fn test_null_group_label() {
        let section = generate_group_section(
            "By Shift",
            "Shift",
            &[GroupCompliance {
                key: None,
                total: 1,
                compliant: 0,
                percentage: 0.0,
            }],
        );
        assert!(section.contains("(sin dato)"));
    }

    #[test]
    fn test_empty_sections() {
        let stats = StatsSnapshot::compute(&[], GlobalPredicate::Consistent);
        let markdown = generate_markdown_report(&create_test_metadata(), &stats);

        assert!(markdown.contains("No observations."));
        assert!(markdown.contains("No hygiene actions recorded."));
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_metadata(), &create_test_stats()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["globalCompliance"]["totalObservaciones"], 2);
        assert_eq!(value["statsSector"][0]["sector"], "GUARDIA");
        assert_eq!(value["statsProfessional"][0]["rol"], "Medico");
        assert_eq!(value["statsTechniques"][0]["tecnica"], "Alcohol");
    }
}
