//! Rule-based descriptions and conservation recommendations for a reserve.

use serde::{Deserialize, Serialize};

use crate::reserve::Reserve;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityBands {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

/// Three-level density estimate derived from reserve attributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensitySummary {
    /// Vegetation index, 0..1.
    pub ndvi: DensityBands,
    /// Prey per sq km.
    pub prey: DensityBands,
    /// Predators per 100 sq km.
    pub predator: DensityBands,
}

impl DensitySummary {
    pub fn from_reserve(reserve: &Reserve) -> Self {
        let td = reserve.tiger_density_or_default();
        let base_prey = (reserve.area_factor() * 10.0).clamp(20.0, 50.0);
        Self {
            ndvi: DensityBands {
                high: (td / 50.0).clamp(0.6, 0.8),
                medium: (td / 70.0).clamp(0.4, 0.6),
                low: (td / 100.0).clamp(0.2, 0.4),
            },
            prey: DensityBands {
                high: (base_prey * 1.2).clamp(40.0, 60.0),
                medium: base_prey.clamp(20.0, 40.0),
                low: (base_prey * 0.8).clamp(10.0, 20.0),
            },
            predator: DensityBands {
                high: (td * 1.2).clamp(20.0, 40.0),
                medium: td.clamp(10.0, 20.0),
                low: (td * 0.8).clamp(5.0, 10.0),
            },
        }
    }

    /// Formatted rows: vegetation as a percentage, densities to one decimal.
    pub fn display_rows(&self) -> [DisplayRow; 3] {
        let percent = |value: f64| format!("{:.1}%", value * 100.0);
        let plain = |value: f64| format!("{value:.1}");
        [
            DisplayRow::new("NDVI Distribution", &self.ndvi, percent),
            DisplayRow::new("Prey Density (per sq km)", &self.prey, plain),
            DisplayRow::new("Predator Density (per 100 sq km)", &self.predator, plain),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    pub title: &'static str,
    pub high: String,
    pub medium: String,
    pub low: String,
}

impl DisplayRow {
    fn new(title: &'static str, bands: &DensityBands, format: impl Fn(f64) -> String) -> Self {
        Self {
            title,
            high: format(bands.high),
            medium: format(bands.medium),
            low: format(bands.low),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReserveInsights {
    pub description: String,
    pub status: String,
    pub notes: Vec<String>,
}

impl ReserveInsights {
    pub fn for_reserve(reserve: &Reserve) -> Self {
        let density_text = reserve
            .tiger_density
            .map(|td| td.to_string())
            .unwrap_or_else(|| "Undetermined".to_string());
        let ratio = reserve.core_to_buffer_ratio();

        let mut notes = Vec::new();
        if let Some(td) = reserve.tiger_density {
            if td > 30.0 {
                notes.push(
                    "High tiger density suggests excellent prey base and habitat management."
                        .to_string(),
                );
            } else if td < 10.0 {
                notes.push(
                    "Lower tiger density indicates potential for habitat improvement and anti-poaching measures."
                        .to_string(),
                );
            }
        }
        if ratio > 1.5 {
            notes.push(
                "Large core area relative to buffer zone may provide better protection for tigers."
                    .to_string(),
            );
        } else if ratio < 0.5 {
            notes.push(
                "Small core area relative to buffer zone may increase human-wildlife conflict."
                    .to_string(),
            );
        }
        if reserve.total_area > 2_000.0 {
            notes.push(
                "Large reserve area supports greater biodiversity and ecosystem resilience."
                    .to_string(),
            );
        }
        notes.push(reserve.notes.clone());

        Self {
            description: format!(
                "{} Tiger Reserve is located in {} with a total area of {} sq km.",
                reserve.name, reserve.region, reserve.total_area
            ),
            status: format!(
                "Tiger density: {} per 100 sq km. Core area: {} sq km. Buffer zone: {} sq km.",
                density_text, reserve.core_area, reserve.buffer_area
            ),
            notes,
        }
    }
}

/// Declaration order is sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub text: &'static str,
}

struct Rule {
    priority: Priority,
    text: &'static str,
    applies: fn(&Reserve, &DensitySummary) -> bool,
}

fn mentions_connectivity(reserve: &Reserve) -> bool {
    reserve.notes.contains("contiguous") || reserve.notes.contains("connects")
}

const RULES: &[Rule] = &[
    Rule {
        priority: Priority::High,
        text: "Implement habitat restoration programs to improve vegetation cover",
        applies: |_, summary| summary.ndvi.low < 0.4,
    },
    Rule {
        priority: Priority::High,
        text: "Expand core area to provide better protection for tiger populations",
        applies: |reserve, _| reserve.core_area < 500.0,
    },
    Rule {
        priority: Priority::High,
        text: "Enhance prey base through habitat improvement and water management",
        applies: |_, summary| summary.prey.low < 15.0,
    },
    Rule {
        priority: Priority::Medium,
        text: "Monitor and manage prey population dynamics",
        applies: |_, summary| summary.prey.medium < 25.0,
    },
    Rule {
        priority: Priority::High,
        text: "Strengthen anti-poaching measures and habitat protection",
        applies: |reserve, _| reserve.tiger_density_or_default() < 10.0,
    },
    Rule {
        priority: Priority::Medium,
        text: "Consider translocation to maintain optimal tiger density",
        applies: |reserve, _| reserve.tiger_density_or_default() > 40.0,
    },
    Rule {
        priority: Priority::High,
        text: "Improve buffer zone management to reduce human-wildlife conflict",
        applies: |reserve, _| reserve.core_to_buffer_ratio() < 0.5,
    },
    Rule {
        priority: Priority::Medium,
        text: "Expand buffer zone to provide better habitat connectivity",
        applies: |reserve, _| reserve.buffer_area < 300.0,
    },
    Rule {
        priority: Priority::Medium,
        text: "Maintain and enhance corridor connectivity with neighboring reserves",
        applies: |reserve, _| mentions_connectivity(reserve),
    },
    Rule {
        priority: Priority::Low,
        text: "Implement zone-based management for better resource allocation",
        applies: |reserve, _| reserve.total_area > 2_000.0,
    },
    Rule {
        priority: Priority::Medium,
        text: "Focus on habitat quality improvement within limited area",
        applies: |reserve, _| reserve.total_area < 1_000.0,
    },
];

/// Every matching rule, high priority first; ties keep rule order.
pub fn recommendations(reserve: &Reserve, summary: &DensitySummary) -> Vec<Recommendation> {
    let mut out: Vec<Recommendation> = RULES
        .iter()
        .filter(|rule| (rule.applies)(reserve, summary))
        .map(|rule| Recommendation {
            priority: rule.priority,
            text: rule.text,
        })
        .collect();
    out.sort_by_key(|rec| rec.priority);
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightReport {
    pub reserve: String,
    pub insights: ReserveInsights,
    pub summary: DensitySummary,
    pub display: [DisplayRow; 3],
    pub recommendations: Vec<Recommendation>,
}

impl InsightReport {
    pub fn for_reserve(reserve: &Reserve) -> Self {
        let summary = DensitySummary::from_reserve(reserve);
        Self {
            reserve: reserve.name.clone(),
            insights: ReserveInsights::for_reserve(reserve),
            recommendations: recommendations(reserve, &summary),
            display: summary.display_rows(),
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reserve(total: f64, core: f64, buffer: f64, density: Option<f64>, notes: &str) -> Reserve {
        Reserve {
            id: 7,
            name: "Nagarhole".into(),
            region: "Karnataka".into(),
            total_area: total,
            core_area: core,
            buffer_area: buffer,
            tiger_density: density,
            lat_min: 11.8,
            lat_max: 12.3,
            lon_min: 76.0,
            lon_max: 76.4,
            notes: notes.into(),
            image: None,
        }
    }

    #[test]
    fn summary_bands_follow_clamps() {
        let summary = DensitySummary::from_reserve(&reserve(2585.0, 800.0, 300.0, Some(38.0), ""));
        assert_eq!(summary.ndvi.high, 0.76);
        assert_eq!(summary.ndvi.medium, 38.0 / 70.0);
        assert_eq!(summary.ndvi.low, 0.38);
        assert!((summary.prey.medium - 25.85).abs() < 1e-9);
        assert!((summary.prey.high - 40.0).abs() < 1e-9);
        assert_eq!(summary.prey.low, 20.0);
        assert_eq!(summary.predator.high, 40.0);
        assert_eq!(summary.predator.medium, 20.0);
        assert_eq!(summary.predator.low, 10.0);
    }

    #[test]
    fn absent_density_reads_undetermined_but_computes_with_default() {
        let subject = reserve(1200.0, 700.0, 500.0, None, "Dry deciduous forest.");
        let insights = ReserveInsights::for_reserve(&subject);
        assert_eq!(
            insights.status,
            "Tiger density: Undetermined per 100 sq km. Core area: 700 sq km. Buffer zone: 500 sq km."
        );
        assert_eq!(insights.notes, vec!["Dry deciduous forest.".to_string()]);
        let summary = DensitySummary::from_reserve(&subject);
        assert_eq!(summary.predator.medium, 10.0);
    }

    #[test]
    fn notes_are_appended_in_rule_order_with_free_text_last() {
        let subject = reserve(2600.0, 2000.0, 300.0, Some(35.0), "Part of the Nilgiri landscape.");
        let insights = ReserveInsights::for_reserve(&subject);
        assert_eq!(
            insights.description,
            "Nagarhole Tiger Reserve is located in Karnataka with a total area of 2600 sq km."
        );
        assert_eq!(insights.notes.len(), 4);
        assert!(insights.notes[0].starts_with("High tiger density"));
        assert!(insights.notes[1].starts_with("Large core area"));
        assert!(insights.notes[2].starts_with("Large reserve area"));
        assert_eq!(insights.notes[3], "Part of the Nilgiri landscape.");
    }

    #[test]
    fn zero_buffer_does_not_divide_by_zero() {
        let subject = reserve(800.0, 400.0, 0.0, Some(5.0), "");
        let insights = ReserveInsights::for_reserve(&subject);
        assert!(insights.notes[1].starts_with("Large core area"));
        let recs = recommendations(&subject, &DensitySummary::from_reserve(&subject));
        assert!(recs
            .iter()
            .all(|r| r.text != "Improve buffer zone management to reduce human-wildlife conflict"));
    }

    #[test]
    fn recommendations_are_stably_sorted_by_priority() {
        let subject = reserve(
            900.0,
            300.0,
            700.0,
            Some(5.0),
            "Forest corridor connects to Wayanad.",
        );
        let summary = DensitySummary::from_reserve(&subject);
        let recs = recommendations(&subject, &summary);
        let texts: Vec<&str> = recs.iter().map(|r| r.text).collect();
        assert_eq!(
            texts,
            vec![
                "Implement habitat restoration programs to improve vegetation cover",
                "Expand core area to provide better protection for tiger populations",
                "Strengthen anti-poaching measures and habitat protection",
                "Improve buffer zone management to reduce human-wildlife conflict",
                "Monitor and manage prey population dynamics",
                "Maintain and enhance corridor connectivity with neighboring reserves",
                "Focus on habitat quality improvement within limited area",
            ]
        );
        assert!(recs.windows(2).all(|pair| pair[0].priority <= pair[1].priority));
    }

    #[test]
    fn large_dense_reserve_gets_low_priority_zoning_last() {
        let subject = reserve(2585.0, 800.0, 300.0, Some(45.0), "contiguous with Bandipur");
        let report = InsightReport::for_reserve(&subject);
        let last = report.recommendations.last().expect("has recommendations");
        assert_eq!(last.priority, Priority::Low);
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.text.starts_with("Consider translocation")));
    }

    #[test]
    fn report_carries_formatted_rows() {
        let report = InsightReport::for_reserve(&reserve(2585.0, 800.0, 300.0, Some(38.0), ""));
        assert_eq!(report.display[0].title, "NDVI Distribution");
        assert_eq!(report.display[0].high, "76.0%");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["display"][2]["medium"], "20.0");
    }

    #[test]
    fn display_rows_format_percentages() {
        let summary = DensitySummary::from_reserve(&reserve(2585.0, 800.0, 300.0, Some(38.0), ""));
        let rows = summary.display_rows();
        assert_eq!(rows[0].high, "76.0%");
        assert_eq!(rows[1].high, "40.0");
        assert_eq!(rows[2].low, "10.0");
    }
}
