//! Weighted-average calculator over one period of a registration year.
//!
//! Module names coming from the period report, the exam grades and the CC
//! grades are matched by [`normalize`]d display name only. The upstream has
//! no shared identifier between these sources.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::academic::{CcGrade, ExamGrade, PeriodReport, SubjectCoefficient};

/// Where the mark of a module came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MarkSource {
    Override,
    ExamGrade,
    PeriodAverage,
    CcGrade,
    Default,
}

/// One row of the calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleEntry {
    pub id: String,
    pub name: String,
    /// `0` means the coefficient is unknown and `custom_coefficient` applies.
    pub coefficient: f64,
    pub mark: String,
    pub custom_coefficient: String,
    /// `-1` for modules recovered from CC grades.
    pub ue_index: i64,
    pub mc_index: i64,
    pub moyenne_generale: Option<f64>,
    pub source: MarkSource,
}

impl ModuleEntry {
    pub fn effective_coefficient(&self) -> f64 {
        if self.coefficient == 0.0 {
            parse_mark(&self.custom_coefficient).unwrap_or(0.0)
        } else {
            self.coefficient
        }
    }

    pub fn is_coefficient_editable(&self) -> bool {
        self.coefficient == 0.0
    }
}

/// Everything fetched for one registration year.
#[derive(Debug, Clone, Default)]
pub struct YearRecords {
    pub year: String,
    pub reports: Vec<PeriodReport>,
    pub exam_grades: Vec<ExamGrade>,
    pub cc_grades: Vec<CcGrade>,
    pub subjects: Vec<SubjectCoefficient>,
}

/// User-entered marks and coefficients keyed by module id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CalculatorRequest {
    #[validate(range(max = 32, message = "Period index is out of range"))]
    pub period: usize,
    #[schema(value_type = Object)]
    pub marks: BTreeMap<String, Value>,
    #[schema(value_type = Object)]
    pub coefficients: BTreeMap<String, Value>,
    /// Replace every mark with the period average where one exists.
    pub fill_existing: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub marks: BTreeMap<String, String>,
    pub coefficients: BTreeMap<String, String>,
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl From<&CalculatorRequest> for Overrides {
    fn from(request: &CalculatorRequest) -> Self {
        let convert = |map: &BTreeMap<String, Value>| {
            map.iter()
                .map(|(id, value)| (id.clone(), value_to_text(value)))
                .collect()
        };
        Self {
            marks: convert(&request.marks),
            coefficients: convert(&request.coefficients),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorResult {
    pub average: f64,
    pub total_modules: usize,
    pub validated_modules: usize,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorResponse {
    pub card_id: String,
    pub year: String,
    pub period: usize,
    pub period_count: usize,
    pub period_label: Option<String>,
    pub modules: Vec<ModuleEntry>,
    pub result: CalculatorResult,
}

pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Parses a mark typed by a student. Accepts a comma as decimal separator.
///
/// The whole input must be a number: `"12,5"` is 12.5 and `"12abc"` is not a
/// mark. The web calculator reads both leniently as 12, so a mark it accepts
/// may be rejected here.
pub fn parse_mark(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn format_number(value: f64) -> String {
    value.to_string()
}

fn find_exam_grade<'a>(name: &str, grades: &'a [ExamGrade]) -> Option<&'a ExamGrade> {
    let name = normalize(name);
    grades.iter().find(|grade| {
        grade
            .label_candidates()
            .iter()
            .flatten()
            .any(|candidate| normalize(candidate) == name)
    })
}

/// Coefficient of the first exam grade whose labels match `name`, if positive.
pub fn exam_coefficient(name: &str, grades: &[ExamGrade]) -> Option<f64> {
    find_exam_grade(name, grades)
        .and_then(|grade| grade.rattachement_mc_coefficient)
        .filter(|coefficient| *coefficient > 0.0)
}

/// Exam mark of the first exam grade whose labels match `name`.
pub fn exam_mark(name: &str, grades: &[ExamGrade]) -> Option<f64> {
    find_exam_grade(name, grades).and_then(|grade| grade.note_examen)
}

/// Builds the module rows for period `period` of `records`.
///
/// Report modules come first in UE order. CC grades then add the modules
/// the report does not list, provided the subject catalog knows them.
pub fn build_modules(records: &YearRecords, period: usize, overrides: &Overrides) -> Vec<ModuleEntry> {
    let year = &records.year;
    let mut modules = Vec::new();
    let mut processed: HashSet<String> = HashSet::new();

    if let Some(report) = records.reports.get(period) {
        for (ue_index, ue) in report.bilan_ues.iter().enumerate() {
            for (mc_index, mc) in ue.bilan_mcs.iter().enumerate() {
                let id = format!("{year}-{period}-{ue_index}-{mc_index}");
                processed.insert(normalize(&mc.mc_libelle_fr));

                let coefficient = match mc.coefficient {
                    Some(c) if c != 0.0 => c,
                    other => exam_coefficient(&mc.mc_libelle_fr, &records.exam_grades)
                        .unwrap_or(other.unwrap_or(0.0)),
                };

                let (mark, source) = if let Some(mark) = overrides.marks.get(&id) {
                    (mark.clone(), MarkSource::Override)
                } else if let Some(mark) = exam_mark(&mc.mc_libelle_fr, &records.exam_grades) {
                    (format_number(mark), MarkSource::ExamGrade)
                } else if let Some(mark) = mc.moyenne_generale {
                    (format_number(mark), MarkSource::PeriodAverage)
                } else {
                    ("0".to_string(), MarkSource::Default)
                };

                modules.push(ModuleEntry {
                    custom_coefficient: overrides.coefficients.get(&id).cloned().unwrap_or_default(),
                    id,
                    name: mc.mc_libelle_fr.clone(),
                    coefficient,
                    mark,
                    ue_index: ue_index as i64,
                    mc_index: mc_index as i64,
                    moyenne_generale: mc.moyenne_generale,
                    source,
                });
            }
        }
    }

    for (index, cc) in records.cc_grades.iter().enumerate() {
        let Some(label) = cc.ap_libelle_fr.as_deref() else {
            continue;
        };
        let name = normalize(label);
        if processed.contains(&name) {
            continue;
        }
        let known = records.subjects.iter().any(|subject| {
            subject
                .mc_libelle_fr
                .as_deref()
                .is_some_and(|fr| normalize(fr) == name)
        });
        if !known {
            continue;
        }

        let id = format!("cc-module-{year}-{index}");
        let coefficient = exam_coefficient(label, &records.exam_grades).unwrap_or(1.0);
        let (mark, source) = if let Some(mark) = overrides.marks.get(&id) {
            (mark.clone(), MarkSource::Override)
        } else if let Some(note) = cc.note {
            (format_number(note), MarkSource::CcGrade)
        } else {
            ("0".to_string(), MarkSource::Default)
        };

        modules.push(ModuleEntry {
            custom_coefficient: overrides.coefficients.get(&id).cloned().unwrap_or_default(),
            id,
            name: label.to_string(),
            coefficient,
            mark,
            ue_index: -1,
            mc_index: -1,
            moyenne_generale: None,
            source,
        });
        processed.insert(name);
    }

    modules
}

/// Overwrites each mark with the module's period average where it has one.
pub fn fill_with_existing_marks(modules: &mut [ModuleEntry]) {
    for module in modules.iter_mut() {
        if let Some(average) = module.moyenne_generale {
            module.mark = format_number(average);
            module.source = MarkSource::PeriodAverage;
        }
    }
}

/// Weighted average over the modules with a valid mark and a positive
/// effective coefficient.
pub fn compute_result(modules: &[ModuleEntry]) -> CalculatorResult {
    let mut weighted = 0.0;
    let mut coefficients = 0.0;
    let mut validated_modules = 0;

    for module in modules {
        let coefficient = module.effective_coefficient();
        let Some(mark) = parse_mark(&module.mark) else {
            continue;
        };
        if !(0.0..=20.0).contains(&mark) || coefficient <= 0.0 {
            continue;
        }
        weighted += mark * coefficient;
        coefficients += coefficient;
        if mark >= 10.0 {
            validated_modules += 1;
        }
    }

    let average = if coefficients > 0.0 {
        weighted / coefficients
    } else {
        0.0
    };

    CalculatorResult {
        average,
        total_modules: modules.len(),
        validated_modules,
        passed: average >= 10.0,
    }
}
