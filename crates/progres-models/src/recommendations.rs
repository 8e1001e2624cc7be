//! Study-path recommendation DTOs and the academic structure catalog.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use validator::Validate;

use crate::academic::Registration;

pub const SYSTEM_PROMPT: &str = r#"You are an expert academic advisor for the Algerian university system (LMD format).
Your role is to analyze student academic performance and recommend the best majors/specialities.

You will receive:
1. Student's current academic information (field, major, level, grades)
2. Available options for the next academic level
3. Optional: Student's preferences and career interests

Based on this information, provide personalized recommendations with:
- Match scores (0-100) based on the student's strengths
- Clear reasoning for each recommendation
- Key subjects they'll study
- Potential career outcomes

Always respond in valid JSON format matching this structure:
{
  "recommendations": [
    {
      "code": "option_code",
      "name": "French name",
      "nameAr": "Arabic name",
      "type": "major|speciality|master",
      "matchScore": 85,
      "reasoning": "Explanation of why this option suits the student",
      "keySubjects": ["subject1", "subject2"],
      "careerOutcomes": ["career1", "career2"],
      "furtherOptions": ["future_option_code"]
    }
  ],
  "summary": "Overall analysis summary in 2-3 sentences"
}

Prioritize options where the student has shown strong performance in related subjects.
Be encouraging but realistic. Give honest assessments."#;

pub const NO_EXAM_DATA: &str = "No detailed exam data available";

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct RecommendationRequest {
    #[validate(length(max = 500, message = "careerPreference is too long"))]
    #[schema(example = "software development")]
    pub career_preference: Option<String>,
    #[validate(length(max = 20, message = "Too many preferred subjects"))]
    pub preferred_subjects: Vec<String>,
    pub university_code: Option<String>,
    #[validate(length(max = 2000, message = "additionalContext is too long"))]
    pub additional_context: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStatus {
    pub university: Option<String>,
    pub university_ar: Option<String>,
    pub field: Option<String>,
    pub field_ar: Option<String>,
    pub major: Option<String>,
    pub major_ar: Option<String>,
    pub speciality: Option<String>,
    pub speciality_ar: Option<String>,
    pub level: Option<String>,
    pub level_ar: Option<String>,
    pub current_average: Option<f64>,
    pub academic_year: Option<String>,
}

fn first_present(candidates: &[&Option<String>]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|value| value.as_deref())
        .find(|value| !value.trim().is_empty())
        .map(str::to_string)
}

impl CurrentStatus {
    pub fn from_registration(registration: &Registration) -> Self {
        Self {
            university: None,
            university_ar: None,
            field: first_present(&[&registration.ll_filiere, &registration.of_ll_filiere]),
            field_ar: first_present(&[
                &registration.ll_filiere_arabe,
                &registration.of_ll_filiere_arabe,
            ]),
            major: first_present(&[&registration.of_ll_filiere]),
            major_ar: first_present(&[&registration.of_ll_filiere_arabe]),
            speciality: first_present(&[&registration.of_ll_specialite]),
            speciality_ar: first_present(&[&registration.of_ll_specialite_arabe]),
            level: first_present(&[&registration.ref_libelle_niveau]),
            level_ar: first_present(&[&registration.ref_libelle_niveau_arabe]),
            current_average: registration.last_moyenne,
            academic_year: first_present(&[&registration.annee_academique_code]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Recommendation {
    pub code: String,
    pub name: String,
    pub name_ar: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub match_score: i64,
    pub reasoning: String,
    pub key_subjects: Vec<String>,
    pub career_outcomes: Vec<String>,
    pub further_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub current_status: CurrentStatus,
    pub recommendations: Vec<Recommendation>,
    pub summary: String,
    pub model: String,
}

/// One university of the academic structure catalog.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct University {
    pub name: String,
    pub name_ar: String,
    pub fields: Vec<Value>,
}

/// Catalog of universities and the options each field opens, keyed by
/// [`normalize_university_name`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcademicStructure {
    #[serde(default)]
    pub universities: Map<String, Value>,
}

/// Lowercases, strips French accents, keeps `[a-z0-9]` and whitespace, then
/// joins words with `_`.
pub fn normalize_university_name(name: &str) -> Option<String> {
    let folded: String = name
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'è' | 'é' | 'ê' | 'ë' => 'e',
            'ì' | 'í' | 'î' | 'ï' => 'i',
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
            'ù' | 'ú' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();

    let key = folded.split_whitespace().collect::<Vec<_>>().join("_");
    if key.is_empty() { None } else { Some(key) }
}

impl AcademicStructure {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn university(&self, key: &str) -> Option<University> {
        self.universities
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    fn first(&self) -> Option<(String, University)> {
        let (key, value) = self.universities.iter().next()?;
        let university = serde_json::from_value(value.clone()).ok()?;
        Some((key.clone(), university))
    }

    fn lookup(&self, name: &str) -> Option<(String, University)> {
        let key = normalize_university_name(name)?;
        if let Some(university) = self.university(&key) {
            return Some((key, university));
        }
        self.universities
            .keys()
            .find(|candidate| candidate.contains(&key) || key.contains(candidate.as_str()))
            .and_then(|candidate| Some((candidate.clone(), self.university(candidate)?)))
    }

    /// Picks the university for a student.
    ///
    /// `code` is tried first, as a catalog key and then as a name, then the
    /// registration's institution name. Without a match the first university
    /// of the catalog is used.
    pub fn select_university(
        &self,
        code: Option<&str>,
        institution: Option<&str>,
    ) -> Option<(String, University)> {
        code.map(str::trim)
            .filter(|code| !code.is_empty())
            .and_then(|code| {
                self.university(code)
                    .map(|university| (code.to_string(), university))
                    .or_else(|| self.lookup(code))
            })
            .or_else(|| institution.and_then(|name| self.lookup(name)))
            .or_else(|| self.first())
    }
}

impl University {
    /// Levels of the first field whose name prefix occurs in `current_field`,
    /// or every field when none matches.
    pub fn available_options(&self, current_field: Option<&str>) -> Value {
        let current = current_field.map(str::to_lowercase);
        if let Some(current) = current.as_deref() {
            for field in &self.fields {
                let name = field
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_lowercase();
                let prefix: String = name.chars().take(3).collect();
                if current.contains(&prefix) {
                    return field.get("levels").cloned().unwrap_or(Value::Null);
                }
            }
        }
        Value::Array(self.fields.clone())
    }
}

pub fn build_user_prompt(
    status: &CurrentStatus,
    available_options: &Value,
    exam_data: &str,
    request: &RecommendationRequest,
) -> String {
    let show = |value: &Option<String>| value.clone().unwrap_or_else(|| "null".to_string());
    let mut prompt = String::new();

    prompt.push_str("## Student's Current Academic Status\n");
    prompt.push_str(&format!("- Field: {}\n", show(&status.field)));
    prompt.push_str(&format!("- Level: {}\n", show(&status.level)));
    if let Some(major) = &status.major {
        prompt.push_str(&format!("- Major: {major}\n"));
    }
    if let Some(speciality) = &status.speciality {
        prompt.push_str(&format!("- Speciality: {speciality}\n"));
    }
    if let Some(average) = status.current_average {
        prompt.push_str(&format!("- Current Average: {average}/20\n"));
    }
    prompt.push_str(&format!("- Academic Year: {}\n\n", show(&status.academic_year)));

    prompt.push_str("## Available Options for Next Level\n");
    let options = serde_json::to_string_pretty(available_options).unwrap_or_default();
    prompt.push_str(&options);
    prompt.push_str("\n\n");

    prompt.push_str("## Exam Data and Grades\n");
    prompt.push_str(exam_data);
    prompt.push_str("\n\n");

    if let Some(preference) = &request.career_preference {
        prompt.push_str(&format!("## Student's Career Preference\n{preference}\n\n"));
    }
    if !request.preferred_subjects.is_empty() {
        prompt.push_str(&format!(
            "## Preferred Subjects\n{}\n\n",
            request.preferred_subjects.join(", ")
        ));
    }
    if let Some(context) = &request.additional_context {
        prompt.push_str(&format!("## Additional Context\n{context}\n\n"));
    }

    prompt.push_str(
        "Based on this information, provide 3-5 personalized recommendations for the student's next academic step.",
    );
    prompt
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelAnswer {
    recommendations: Vec<Value>,
    summary: Option<String>,
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn text(value: &Value, key: &str, default: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => default.to_string(),
        Some(other) => other.to_string(),
    }
}

fn recommendation_from_value(value: &Value) -> Recommendation {
    let match_score = match value.get("matchScore") {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .unwrap_or(0);

    Recommendation {
        code: text(value, "code", ""),
        name: text(value, "name", ""),
        name_ar: text(value, "nameAr", ""),
        kind: text(value, "type", "speciality"),
        match_score,
        reasoning: text(value, "reasoning", ""),
        key_subjects: string_list(value.get("keySubjects")),
        career_outcomes: string_list(value.get("careerOutcomes")),
        further_options: string_list(value.get("furtherOptions")),
    }
}

/// Sorts by match score descending, then by name ignoring case.
pub fn sort_recommendations(recommendations: &mut [Recommendation]) {
    recommendations.sort_by(|a, b| {
        b.match_score
            .cmp(&a.match_score)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

/// Parses the model's JSON answer into a response.
pub fn parse_model_answer(
    content: &str,
    current_status: CurrentStatus,
    model: &str,
) -> Result<RecommendationResponse, serde_json::Error> {
    let answer: ModelAnswer = serde_json::from_str(content)?;
    let mut recommendations: Vec<Recommendation> = answer
        .recommendations
        .iter()
        .map(recommendation_from_value)
        .collect();
    sort_recommendations(&mut recommendations);

    Ok(RecommendationResponse {
        current_status,
        recommendations,
        summary: answer.summary.unwrap_or_default(),
        model: model.to_string(),
    })
}
