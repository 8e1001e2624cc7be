//! Academic record DTOs as served by the PROGRES API.
//!
//! The upstream owns these shapes. Every field except the identifiers is
//! optional and numbers are parsed leniently, since the same value may come
//! back as a number, a string or `null`.

use progres_core::serde::{deserialize_lenient_f64, deserialize_lenient_i64, deserialize_null_default};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One yearly registration ("dia") of a student.
///
/// Its `id` is the card id used by the grade endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Registration {
    #[serde(deserialize_with = "deserialize_lenient_i64")]
    pub id: Option<i64>,
    pub uuid: Option<String>,
    pub annee_academique_code: Option<String>,
    #[serde(deserialize_with = "deserialize_lenient_i64")]
    pub ouverture_offre_formation_id: Option<i64>,
    #[serde(deserialize_with = "deserialize_lenient_i64")]
    pub niveau_id: Option<i64>,
    pub numero_inscription: Option<String>,
    pub ll_etablissement_latin: Option<String>,
    pub ll_etablissement_arabe: Option<String>,
    pub ll_filiere: Option<String>,
    pub ll_filiere_arabe: Option<String>,
    pub of_ll_filiere: Option<String>,
    pub of_ll_filiere_arabe: Option<String>,
    pub of_ll_specialite: Option<String>,
    pub of_ll_specialite_arabe: Option<String>,
    pub ref_libelle_niveau: Option<String>,
    pub ref_libelle_niveau_arabe: Option<String>,
    #[serde(deserialize_with = "deserialize_lenient_f64")]
    pub last_moyenne: Option<f64>,
}

impl Registration {
    pub fn card_id(&self) -> Option<String> {
        self.id.map(|id| id.to_string())
    }

    pub fn year_code(&self) -> String {
        self.annee_academique_code.clone().unwrap_or_default()
    }
}

/// A module ("matière constitutive") line of a period report.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleReport {
    #[serde(deserialize_with = "deserialize_null_default")]
    pub mc_libelle_fr: String,
    #[serde(deserialize_with = "deserialize_lenient_f64")]
    pub coefficient: Option<f64>,
    #[serde(deserialize_with = "deserialize_lenient_f64")]
    pub moyenne_generale: Option<f64>,
}

/// A teaching unit ("UE") of a period report.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct TeachingUnitReport {
    pub ue_libelle_fr: Option<String>,
    #[serde(deserialize_with = "deserialize_null_default")]
    pub bilan_mcs: Vec<ModuleReport>,
}

/// End-of-period report ("bilan") for one semester.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PeriodReport {
    pub periode_libelle_fr: Option<String>,
    pub niveau_libelle_long_lt: Option<String>,
    #[serde(deserialize_with = "deserialize_null_default")]
    pub bilan_ues: Vec<TeachingUnitReport>,
}

/// Average of one period report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub period: Option<String>,
    pub level: Option<String>,
    pub module_count: usize,
    pub average: f64,
    pub passed: bool,
}

impl PeriodReport {
    pub fn modules(&self) -> impl Iterator<Item = &ModuleReport> {
        self.bilan_ues.iter().flat_map(|ue| ue.bilan_mcs.iter())
    }

    /// `Σ(moyenneGenerale × coefficient) / Σ coefficient`, rounded to two
    /// decimals. Missing values count as zero; no coefficients gives 0.
    pub fn average(&self) -> f64 {
        let (weighted, coefficients) =
            self.modules().fold((0.0_f64, 0.0_f64), |(weighted, total), mc| {
                let coefficient = mc.coefficient.unwrap_or(0.0);
                let mark = mc.moyenne_generale.unwrap_or(0.0);
                (weighted + mark * coefficient, total + coefficient)
            });

        if coefficients > 0.0 {
            (weighted / coefficients * 100.0).round() / 100.0
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> PeriodSummary {
        let average = self.average();
        PeriodSummary {
            period: self.periode_libelle_fr.clone(),
            level: self.niveau_libelle_long_lt.clone(),
            module_count: self.modules().count(),
            average,
            passed: average >= 10.0,
        }
    }
}

/// A final exam grade.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ExamGrade {
    #[serde(deserialize_with = "deserialize_lenient_i64")]
    pub id: Option<i64>,
    pub code_matiere: Option<String>,
    pub libelle_matiere: Option<String>,
    pub libelle_matiere_arabe: Option<String>,
    pub mc_libelle_fr: Option<String>,
    pub mc_libelle_ar: Option<String>,
    pub rattachement_mc_mc_libelle_fr: Option<String>,
    pub rattachement_mc_mc_libelle_ar: Option<String>,
    #[serde(deserialize_with = "deserialize_lenient_f64")]
    pub note_examen: Option<f64>,
    #[serde(deserialize_with = "deserialize_lenient_f64")]
    pub rattachement_mc_coefficient: Option<f64>,
    #[serde(deserialize_with = "deserialize_lenient_f64")]
    pub rattachement_mc_credit: Option<f64>,
}

impl ExamGrade {
    /// Every display name the module may be known by, Arabic first.
    pub fn label_candidates(&self) -> [Option<&str>; 6] {
        [
            self.libelle_matiere_arabe.as_deref(),
            self.mc_libelle_ar.as_deref(),
            self.rattachement_mc_mc_libelle_ar.as_deref(),
            self.libelle_matiere.as_deref(),
            self.mc_libelle_fr.as_deref(),
            self.rattachement_mc_mc_libelle_fr.as_deref(),
        ]
    }
}

/// A continuous-assessment (CC / TD / TP) grade.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CcGrade {
    #[serde(deserialize_with = "deserialize_lenient_i64")]
    pub id: Option<i64>,
    pub observation: Option<String>,
    #[serde(deserialize_with = "deserialize_lenient_f64")]
    pub note: Option<f64>,
    pub ap_code_matiere: Option<String>,
    pub ap_libelle_fr: Option<String>,
    pub ap_libelle_ar: Option<String>,
}

/// A subject of the training offer with its coefficients.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SubjectCoefficient {
    #[serde(deserialize_with = "deserialize_lenient_i64")]
    pub id: Option<i64>,
    pub mc_libelle_fr: Option<String>,
    pub mc_libelle_ar: Option<String>,
    pub periode_libelle_fr: Option<String>,
    pub periode_libelle_ar: Option<String>,
    #[serde(deserialize_with = "deserialize_lenient_f64")]
    pub coefficient_examen: Option<f64>,
    #[serde(deserialize_with = "deserialize_lenient_f64")]
    pub coefficient_controle_continu: Option<f64>,
    #[serde(deserialize_with = "deserialize_lenient_f64")]
    pub coefficient_controle_intermediaire: Option<f64>,
}

/// Digital student card for one registration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentCard {
    pub card_id: String,
    pub academic_year: Option<String>,
    pub registration_number: Option<String>,
    pub institution: Option<String>,
    pub institution_ar: Option<String>,
    pub field: Option<String>,
    pub field_ar: Option<String>,
    pub speciality: Option<String>,
    pub level: Option<String>,
    pub level_ar: Option<String>,
    /// Public URL encoded in the card's QR code.
    pub verification_url: String,
}

impl StudentCard {
    pub fn from_registration(registration: &Registration, card_id: &str, check_url: &str) -> Self {
        Self {
            card_id: card_id.to_string(),
            academic_year: registration.annee_academique_code.clone(),
            registration_number: registration.numero_inscription.clone(),
            institution: registration.ll_etablissement_latin.clone(),
            institution_ar: registration.ll_etablissement_arabe.clone(),
            field: registration
                .ll_filiere
                .clone()
                .or_else(|| registration.of_ll_filiere.clone()),
            field_ar: registration
                .ll_filiere_arabe
                .clone()
                .or_else(|| registration.of_ll_filiere_arabe.clone()),
            speciality: registration.of_ll_specialite.clone(),
            level: registration.ref_libelle_niveau.clone(),
            level_ar: registration.ref_libelle_niveau_arabe.clone(),
            verification_url: format!("{}/{}", check_url.trim_end_matches('/'), card_id),
        }
    }
}
